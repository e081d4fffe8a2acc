// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resource descriptors and the categories they are grouped in.

use std::fmt;
use std::str::FromStr;

use crate::flatten::{flattened_uniform, FlattenedUniform};
use crate::layout::{emit_layout, PadTo, StructLayout, UNIFORM_BLOCK_PADDING};
use crate::{Error, ShaderStage, Type};

/// The kinds of resources a program binds, plus vertex attributes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Category {
    UniformBlock,
    StorageBuffer,
    Texture,
    Sampler,
    StorageImage,
    TextureSampler,
    VertexAttr,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UniformBlock => "uniform block",
            Self::StorageBuffer => "storage buffer",
            Self::Texture => "texture",
            Self::Sampler => "sampler",
            Self::StorageImage => "storage image",
            Self::TextureSampler => "texture-sampler pair",
            Self::VertexAttr => "vertex attribute",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binding numbers in each target convention.
///
/// Every field starts out unset and is filled in by the slot allocator for
/// the resource categories that use it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NativeSlots {
    pub hlsl_register_b: Option<u32>,
    pub hlsl_register_t: Option<u32>,
    pub hlsl_register_u: Option<u32>,
    pub hlsl_register_s: Option<u32>,
    pub msl_buffer: Option<u32>,
    pub msl_texture: Option<u32>,
    pub msl_sampler: Option<u32>,
    pub wgsl_group0_binding: Option<u32>,
    pub wgsl_group1_binding: Option<u32>,
    pub glsl_binding: Option<u32>,
}

/// Common view of the descriptors that are merged and allocated.
pub trait Resource: Clone {
    const CATEGORY: Category;

    fn name(&self) -> &str;
    fn stage(&self) -> ShaderStage;
    /// The binding the shader itself declares, local to its stage.
    fn stage_slot(&self) -> u32;
    fn canonical_slot(&self) -> Option<u32>;
    fn set_canonical_slot(&mut self, slot: u32);
    fn native(&self) -> &NativeSlots;
    /// Same stage and structure. Slots and instance names are ignored.
    ///
    /// Native slots are allocated per stage, so a name shared by two stages
    /// is never the same resource.
    fn same_shape(&self, other: &Self) -> bool;
}

macro_rules! impl_resource {
    ($ty:ty, $category:expr, |$a:ident, $b:ident| $same:expr) => {
        impl Resource for $ty {
            const CATEGORY: Category = $category;

            fn name(&self) -> &str {
                &self.name
            }

            fn stage(&self) -> ShaderStage {
                self.stage
            }

            fn stage_slot(&self) -> u32 {
                self.slot
            }

            fn canonical_slot(&self) -> Option<u32> {
                self.canonical_slot
            }

            fn set_canonical_slot(&mut self, slot: u32) {
                self.canonical_slot = Some(slot);
            }

            fn native(&self) -> &NativeSlots {
                &self.native
            }

            fn same_shape(&self, other: &Self) -> bool {
                let ($a, $b) = (self, other);
                $a.stage == $b.stage && $same
            }
        }
    };
}

/// A block of uniforms, identified by its struct type name.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UniformBlock {
    pub stage: ShaderStage,
    pub slot: u32,
    pub canonical_slot: Option<u32>,
    pub name: String,
    /// Instance name in the shader source, if any.
    pub inst_name: String,
    /// Whether GL backends see this block as a plain vec4 array.
    pub flattened: bool,
    pub struct_info: Type,
    pub native: NativeSlots,
}

impl_resource!(UniformBlock, Category::UniformBlock, |a, b| {
    a.flattened == b.flattened && a.struct_info == b.struct_info
});

impl UniformBlock {
    /// Members and padding up to the next multiple of 16 bytes.
    pub fn layout(&self) -> StructLayout<'_> {
        emit_layout(&self.struct_info, UNIFORM_BLOCK_PADDING)
    }

    /// The vec4 array GL backends bind for a flattened block.
    pub fn flattened_uniform(&self) -> Option<FlattenedUniform> {
        self.flattened
            .then(|| flattened_uniform(&self.name, &self.struct_info))
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StorageBuffer {
    pub stage: ShaderStage,
    pub slot: u32,
    pub canonical_slot: Option<u32>,
    pub name: String,
    pub inst_name: String,
    pub readonly: bool,
    pub struct_info: Type,
    pub native: NativeSlots,
}

impl_resource!(StorageBuffer, Category::StorageBuffer, |a, b| {
    a.readonly == b.readonly && a.struct_info == b.struct_info
});

impl StorageBuffer {
    /// Members and padding up to the size the backend declares.
    pub fn layout(&self) -> StructLayout<'_> {
        emit_layout(&self.struct_info, PadTo::Size(self.struct_info.size))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ImageType {
    Dim2,
    Cube,
    Dim3,
    Array,
}

impl ImageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dim2 => "2d",
            Self::Cube => "cube",
            Self::Dim3 => "3d",
            Self::Array => "array",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ImageSampleType {
    Float,
    Sint,
    Uint,
    Depth,
    UnfilterableFloat,
}

impl ImageSampleType {
    pub const ALL: [Self; 5] = [
        Self::Float,
        Self::Sint,
        Self::Uint,
        Self::Depth,
        Self::UnfilterableFloat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Sint => "sint",
            Self::Uint => "uint",
            Self::Depth => "depth",
            Self::UnfilterableFloat => "unfilterable_float",
        }
    }
}

impl FromStr for ImageSampleType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownTag {
                kind: "image sample type",
                value: s.to_owned(),
            })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SamplerType {
    Filtering,
    Comparison,
    NonFiltering,
}

impl SamplerType {
    pub const ALL: [Self; 3] = [Self::Filtering, Self::Comparison, Self::NonFiltering];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Filtering => "filtering",
            Self::Comparison => "comparison",
            Self::NonFiltering => "nonfiltering",
        }
    }
}

impl FromStr for SamplerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownTag {
                kind: "sampler type",
                value: s.to_owned(),
            })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum StoragePixelFormat {
    Rgba8,
    Rgba8Sn,
    Rgba8Ui,
    Rgba8Si,
    Rgba16Ui,
    Rgba16Si,
    Rgba16F,
    R32Ui,
    R32Si,
    R32F,
    Rg32Ui,
    Rg32Si,
    Rg32F,
    Rgba32Ui,
    Rgba32Si,
    Rgba32F,
}

impl StoragePixelFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rgba8 => "RGBA8",
            Self::Rgba8Sn => "RGBA8SN",
            Self::Rgba8Ui => "RGBA8UI",
            Self::Rgba8Si => "RGBA8SI",
            Self::Rgba16Ui => "RGBA16UI",
            Self::Rgba16Si => "RGBA16SI",
            Self::Rgba16F => "RGBA16F",
            Self::R32Ui => "R32UI",
            Self::R32Si => "R32SI",
            Self::R32F => "R32F",
            Self::Rg32Ui => "RG32UI",
            Self::Rg32Si => "RG32SI",
            Self::Rg32F => "RG32F",
            Self::Rgba32Ui => "RGBA32UI",
            Self::Rgba32Si => "RGBA32SI",
            Self::Rgba32F => "RGBA32F",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Texture {
    pub stage: ShaderStage,
    pub slot: u32,
    pub canonical_slot: Option<u32>,
    pub name: String,
    pub image_type: ImageType,
    pub sample_type: ImageSampleType,
    pub multisampled: bool,
    pub native: NativeSlots,
}

impl_resource!(Texture, Category::Texture, |a, b| {
    a.image_type == b.image_type
        && a.sample_type == b.sample_type
        && a.multisampled == b.multisampled
});

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Sampler {
    pub stage: ShaderStage,
    pub slot: u32,
    pub canonical_slot: Option<u32>,
    pub name: String,
    pub sampler_type: SamplerType,
    pub native: NativeSlots,
}

impl_resource!(Sampler, Category::Sampler, |a, b| {
    a.sampler_type == b.sampler_type
});

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StorageImage {
    pub stage: ShaderStage,
    pub slot: u32,
    pub canonical_slot: Option<u32>,
    pub name: String,
    pub image_type: ImageType,
    pub format: StoragePixelFormat,
    pub native: NativeSlots,
}

impl_resource!(StorageImage, Category::StorageImage, |a, b| {
    a.image_type == b.image_type && a.format == b.format
});

/// A texture and sampler used together, as GL-style backends bind them.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TextureSampler {
    pub stage: ShaderStage,
    pub slot: u32,
    pub canonical_slot: Option<u32>,
    pub name: String,
    pub texture_name: String,
    pub sampler_name: String,
    /// Only `glsl_binding` is used.
    pub native: NativeSlots,
}

impl_resource!(TextureSampler, Category::TextureSampler, |a, b| {
    a.texture_name == b.texture_name && a.sampler_name == b.sampler_name
});

#[cfg(test)]
mod tests {
    use super::*;

    fn texture(name: &str, stage: ShaderStage, sample_type: ImageSampleType) -> Texture {
        Texture {
            stage,
            slot: 0,
            canonical_slot: None,
            name: name.into(),
            image_type: ImageType::Dim2,
            sample_type,
            multisampled: false,
            native: NativeSlots::default(),
        }
    }

    #[test]
    fn shape_ignores_slots() {
        let a = texture("tex", ShaderStage::Fragment, ImageSampleType::Float);
        let mut b = texture("tex", ShaderStage::Fragment, ImageSampleType::Float);
        b.slot = 3;
        b.canonical_slot = Some(1);
        assert!(a.same_shape(&b));
        let c = texture("tex", ShaderStage::Fragment, ImageSampleType::Depth);
        assert!(!a.same_shape(&c));
    }

    #[test]
    fn shape_includes_stage() {
        let vs = texture("tex", ShaderStage::Vertex, ImageSampleType::Float);
        let fs = texture("tex", ShaderStage::Fragment, ImageSampleType::Float);
        assert!(!vs.same_shape(&fs));
    }

    #[test]
    fn type_tags_parse() {
        assert_eq!(
            "unfilterable_float".parse::<ImageSampleType>().unwrap(),
            ImageSampleType::UnfilterableFloat
        );
        assert_eq!(
            "nonfiltering".parse::<SamplerType>().unwrap(),
            SamplerType::NonFiltering
        );
        assert!(matches!(
            "linear".parse::<SamplerType>(),
            Err(Error::UnknownTag { value, .. }) if value == "linear"
        ));
    }
}
