// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-stage reflection built from a compiler's [`ShaderInterface`].

use crate::error::Result;
use crate::flatten::can_flatten;
use crate::interface::{BaseKind, ImageDim, ShaderInterface, TypeHandle};
use crate::{
    Bindings, Error, ImageSampleType, ImageType, NativeSlots, Sampler, SamplerType, ScalarKind,
    ShaderStage, Slang, Snippet, StorageBuffer, StorageImage, Texture, TextureSampler, Type,
    UniformBlock,
};

pub const MAX_ATTRS: usize = 16;

/// Semantic name under which HLSL sees every stage input and output.
pub const ATTR_SEMANTIC: &str = "TEXCOORD";

/// A stage input or output at one location.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StageAttr {
    pub slot: u32,
    pub name: String,
    pub sem_name: String,
    pub sem_index: u32,
    pub ty: Type,
}

impl StageAttr {
    /// Whether a vertex output can feed this fragment input.
    pub fn links_to(&self, other: &Self) -> bool {
        self.name == other.name
            && self.sem_name == other.sem_name
            && self.sem_index == other.sem_index
    }

    /// Equality used when merging vertex attributes across programs.
    pub fn same_as(&self, other: &Self) -> bool {
        self.slot == other.slot && self.links_to(other)
    }
}

/// Stage inputs or outputs, indexed by location.
pub type StageAttrs = [Option<StageAttr>; MAX_ATTRS];

/// What one snippet exposes once compiled for one shading language.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StageReflection {
    pub snippet: String,
    pub stage: ShaderStage,
    /// Entry point name in the target language.
    pub entry_point: String,
    pub workgroup_size: [u32; 3],
    pub inputs: StageAttrs,
    pub outputs: StageAttrs,
    pub bindings: Bindings,
}

impl StageReflection {
    /// Converts a compiler interface into the binding model.
    ///
    /// Resources the compiler reports without a binding are numbered in
    /// declaration order within their category.
    pub fn parse(interface: &ShaderInterface, snippet: &Snippet, slang: Slang) -> Result<Self> {
        let adapter = Adapter {
            interface,
            snippet,
        };
        let stage = snippet.stage;
        let reflection = Self {
            snippet: snippet.name.clone(),
            stage,
            entry_point: slang.entry_point(&interface.entry_point),
            workgroup_size: interface.workgroup_size,
            inputs: adapter.attrs(&interface.inputs)?,
            outputs: adapter.attrs(&interface.outputs)?,
            bindings: Bindings {
                uniform_blocks: adapter.uniform_blocks(slang)?,
                storage_buffers: adapter.storage_buffers()?,
                textures: adapter.textures()?,
                samplers: adapter.samplers(),
                storage_images: adapter.storage_images()?,
                texture_samplers: adapter.texture_samplers(),
            },
        };
        log::debug!(
            "reflected {} snippet '{}' for {slang}: {} uniform blocks, {} storage buffers, {} textures, {} samplers, {} storage images",
            stage,
            snippet.name,
            reflection.bindings.uniform_blocks.len(),
            reflection.bindings.storage_buffers.len(),
            reflection.bindings.textures.len(),
            reflection.bindings.samplers.len(),
            reflection.bindings.storage_images.len(),
        );
        Ok(reflection)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &StageAttr> {
        self.inputs.iter().flatten()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &StageAttr> {
        self.outputs.iter().flatten()
    }
}

struct Adapter<'a> {
    interface: &'a ShaderInterface,
    snippet: &'a Snippet,
}

impl Adapter<'_> {
    fn unsupported(&self, name: &str, reason: &'static str) -> Error {
        Error::UnsupportedShape {
            snippet: self.snippet.name.clone(),
            name: name.to_owned(),
            reason,
        }
    }

    fn attrs(&self, vars: &[crate::interface::InterfaceVar]) -> Result<StageAttrs> {
        let mut attrs: StageAttrs = std::array::from_fn(|_| None);
        for var in vars {
            let Some(entry) = attrs.get_mut(var.location as usize) else {
                return Err(Error::Capacity {
                    category: crate::Category::VertexAttr,
                    name: var.name.clone(),
                    limit: MAX_ATTRS as u32,
                    convention: None,
                });
            };
            let ty = self.convert(var.ty, &var.name, 0)?;
            if ty.is_struct() {
                return Err(self.unsupported(&var.name, "stage attributes can't be structs"));
            }
            *entry = Some(StageAttr {
                slot: var.location,
                name: var.name.clone(),
                sem_name: ATTR_SEMANTIC.to_owned(),
                sem_index: var.location,
                ty,
            });
        }
        Ok(attrs)
    }

    fn uniform_blocks(&self, slang: Slang) -> Result<Vec<UniformBlock>> {
        let mut blocks = Vec::with_capacity(self.interface.uniform_buffers.len());
        for (index, var) in self.interface.uniform_buffers.iter().enumerate() {
            let struct_info = self.convert(var.ty, &var.name, 0)?;
            if !struct_info.is_struct() {
                return Err(self.unsupported(&var.name, "uniform block is not a struct"));
            }
            if contains_bool(&struct_info) {
                return Err(self.unsupported(&var.name, "uniform blocks can't contain bools"));
            }
            blocks.push(UniformBlock {
                stage: self.snippet.stage,
                slot: var.binding.unwrap_or(index as u32),
                canonical_slot: None,
                name: var.name.clone(),
                inst_name: instance_name(var),
                flattened: slang.is_glsl() && can_flatten(&struct_info),
                struct_info,
                native: NativeSlots::default(),
            });
        }
        Ok(blocks)
    }

    fn storage_buffers(&self) -> Result<Vec<StorageBuffer>> {
        let mut buffers = Vec::with_capacity(self.interface.storage_buffers.len());
        for (index, var) in self.interface.storage_buffers.iter().enumerate() {
            let mut struct_info = self.convert(var.ty, &var.name, 0)?;
            if !struct_info.is_struct() {
                return Err(self.unsupported(&var.name, "storage buffer is not a struct"));
            }
            // Account for one element of a trailing runtime-sized array.
            let end = struct_info
                .members()
                .iter()
                .map(|m| m.offset + m.footprint())
                .max()
                .unwrap_or(0);
            struct_info.size = struct_info.size.max(end);
            buffers.push(StorageBuffer {
                stage: self.snippet.stage,
                slot: var.binding.unwrap_or(index as u32),
                canonical_slot: None,
                name: var.name.clone(),
                inst_name: instance_name(var),
                readonly: var.readonly,
                struct_info,
                native: NativeSlots::default(),
            });
        }
        Ok(buffers)
    }

    fn textures(&self) -> Result<Vec<Texture>> {
        let mut textures = Vec::with_capacity(self.interface.images.len());
        for (index, var) in self.interface.images.iter().enumerate() {
            let reflected = if var.is_depth {
                ImageSampleType::Depth
            } else {
                match var.sampled_kind {
                    BaseKind::Float => ImageSampleType::Float,
                    BaseKind::Int => ImageSampleType::Sint,
                    BaseKind::UInt => ImageSampleType::Uint,
                    _ => return Err(self.unsupported(&var.name, "unsupported texture sample type")),
                }
            };
            let sample_type = match self.snippet.image_sample_type_tags.get(&var.name) {
                Some(tagged) => *tagged,
                None => reflected,
            };
            textures.push(Texture {
                stage: self.snippet.stage,
                slot: var.binding.unwrap_or(index as u32),
                canonical_slot: None,
                name: var.name.clone(),
                image_type: self.image_type(&var.name, var.dim, var.arrayed)?,
                sample_type,
                multisampled: var.multisampled,
                native: NativeSlots::default(),
            });
        }
        Ok(textures)
    }

    fn samplers(&self) -> Vec<Sampler> {
        self.interface
            .samplers
            .iter()
            .enumerate()
            .map(|(index, var)| {
                let reflected = if var.is_comparison {
                    SamplerType::Comparison
                } else {
                    SamplerType::Filtering
                };
                Sampler {
                    stage: self.snippet.stage,
                    slot: var.binding.unwrap_or(index as u32),
                    canonical_slot: None,
                    name: var.name.clone(),
                    sampler_type: self
                        .snippet
                        .sampler_type_tags
                        .get(&var.name)
                        .copied()
                        .unwrap_or(reflected),
                    native: NativeSlots::default(),
                }
            })
            .collect()
    }

    fn storage_images(&self) -> Result<Vec<StorageImage>> {
        let mut images = Vec::with_capacity(self.interface.storage_images.len());
        for (index, var) in self.interface.storage_images.iter().enumerate() {
            let Some(format) = var.format else {
                return Err(self.unsupported(&var.name, "storage image without a pixel format"));
            };
            images.push(StorageImage {
                stage: self.snippet.stage,
                slot: var.binding.unwrap_or(index as u32),
                canonical_slot: None,
                name: var.name.clone(),
                image_type: self.image_type(&var.name, var.dim, var.arrayed)?,
                format,
                native: NativeSlots::default(),
            });
        }
        Ok(images)
    }

    fn texture_samplers(&self) -> Vec<TextureSampler> {
        self.interface
            .combined_image_samplers
            .iter()
            .enumerate()
            .map(|(index, var)| TextureSampler {
                stage: self.snippet.stage,
                slot: var.binding.unwrap_or(index as u32),
                canonical_slot: None,
                name: var.name.clone(),
                texture_name: var.image.clone(),
                sampler_name: var.sampler.clone(),
                native: NativeSlots::default(),
            })
            .collect()
    }

    fn image_type(&self, name: &str, dim: ImageDim, arrayed: bool) -> Result<ImageType> {
        match (dim, arrayed) {
            (ImageDim::D2, false) => Ok(ImageType::Dim2),
            (ImageDim::D2, true) => Ok(ImageType::Array),
            (ImageDim::Cube, false) => Ok(ImageType::Cube),
            (ImageDim::D3, false) => Ok(ImageType::Dim3),
            _ => Err(self.unsupported(name, "unsupported image dimension")),
        }
    }

    /// Converts a compiler type into the layout model, recursing into struct members.
    fn convert(&self, handle: TypeHandle, name: &str, offset: u32) -> Result<Type> {
        let Some(desc) = self.interface.type_desc(handle) else {
            return Err(self.unsupported(name, "dangling type handle"));
        };
        if desc.array.len() > 1 {
            return Err(self.unsupported(name, "multi-dimensional arrays are not supported"));
        }
        let mut ty = match desc.kind {
            BaseKind::Bool | BaseKind::Int | BaseKind::UInt | BaseKind::Float => {
                let kind = match desc.kind {
                    BaseKind::Bool => ScalarKind::Bool,
                    BaseKind::Int => ScalarKind::Int,
                    BaseKind::UInt => ScalarKind::UInt,
                    _ => ScalarKind::Float,
                };
                if !(1..=4).contains(&desc.vecsize) {
                    return Err(self.unsupported(name, "vector arity must be between 1 and 4"));
                }
                if desc.columns > 1 {
                    if kind != ScalarKind::Float {
                        return Err(self.unsupported(name, "only float matrices are supported"));
                    }
                    if desc.columns > 4 || desc.vecsize < 2 {
                        return Err(self.unsupported(name, "unsupported matrix dimensions"));
                    }
                    let mut ty = Type::matrix(name, desc.columns, desc.vecsize);
                    if desc.matrix_stride != 0 {
                        ty.matrix_stride = desc.matrix_stride;
                    }
                    ty
                } else {
                    Type::vector(name, kind, desc.vecsize)
                }
            }
            BaseKind::Struct => {
                let members = desc
                    .members
                    .iter()
                    .map(|m| self.convert(m.ty, &m.name, m.offset))
                    .collect::<Result<Vec<_>>>()?;
                Type::structure(name, desc.name.clone(), members, desc.size)
            }
            BaseKind::Half => {
                return Err(self.unsupported(name, "half-precision types are not supported"));
            }
            BaseKind::Image | BaseKind::Sampler | BaseKind::Unknown => {
                return Err(self.unsupported(name, "unsupported member type"));
            }
        };
        ty.size = desc.size;
        ty.offset = offset;
        if let Some(&count) = desc.array.first() {
            ty = ty.with_array(count, desc.array_stride);
        }
        Ok(ty)
    }
}

fn instance_name(var: &crate::interface::BufferVar) -> String {
    var.inst_name
        .clone()
        .unwrap_or_else(|| format!("_{}", var.name))
}

fn contains_bool(ty: &Type) -> bool {
    match &ty.shape {
        crate::Shape::Vector { kind, .. } => *kind == ScalarKind::Bool,
        crate::Shape::Matrix { .. } => false,
        crate::Shape::Struct { members, .. } => members.iter().any(contains_bool),
    }
}

/// The stages of one program, with their resources merged.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ProgramReflection {
    pub name: String,
    pub line: u32,
    /// Indexed by [`ShaderStage`].
    pub stages: [Option<StageReflection>; 3],
    pub bindings: Bindings,
}

impl ProgramReflection {
    pub fn stage(&self, stage: ShaderStage) -> Option<&StageReflection> {
        self.stages[stage.index()].as_ref()
    }

    pub fn vs(&self) -> Option<&StageReflection> {
        self.stage(ShaderStage::Vertex)
    }

    pub fn fs(&self) -> Option<&StageReflection> {
        self.stage(ShaderStage::Fragment)
    }

    pub fn cs(&self) -> Option<&StageReflection> {
        self.stage(ShaderStage::Compute)
    }

    pub fn is_compute(&self) -> bool {
        self.cs().is_some()
    }

    /// Reflected stages in stage order.
    pub fn iter_stages(&self) -> impl Iterator<Item = &StageReflection> {
        self.stages.iter().flatten()
    }
}
