// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Native binding numbers for each target convention.
//!
//! Slots are allocated per stage from counters that start at a fixed base,
//! walking each category in canonical slot order:
//!
//! - HLSL: `b` registers for uniform blocks; `t` registers for textures and
//!   then read-only storage buffers; `u` registers for read/write storage
//!   buffers and then storage images; `s` registers for samplers.
//! - Metal: `buffer` indices for uniform blocks and then storage buffers;
//!   `texture` indices for textures and then storage images; `sampler`
//!   indices for samplers.
//! - WGSL: uniform blocks in group 0, starting at [`WGSL_FS_GROUP0_BASE`] in
//!   the fragment stage. Everything else in group 1 from a single counter,
//!   starting at [`WGSL_FS_GROUP1_BASE`] in the fragment stage.
//! - GLSL: storage buffers and storage images bind at their canonical slot.
//!   Texture-sampler pairs count from 0 in the vertex and compute stages and
//!   from [`GLSL_FS_TEXTURE_SAMPLER_BASE`] in the fragment stage.

use static_assertions::const_assert;

use crate::error::Result;
use crate::{
    Bindings, Category, Convention, NativeSlots, Resource, ShaderStage, MAX_SAMPLERS,
    MAX_STORAGE_BUFFERS, MAX_STORAGE_IMAGES, MAX_TEXTURES, MAX_TEXTURE_SAMPLERS,
    MAX_UNIFORM_BLOCKS,
};

/// First group 0 binding of the fragment stage in WGSL.
pub const WGSL_FS_GROUP0_BASE: u32 = MAX_UNIFORM_BLOCKS as u32;
/// First group 1 binding of the fragment stage in WGSL.
pub const WGSL_FS_GROUP1_BASE: u32 = 64;
/// Group 1 bindings available to a single stage in WGSL.
pub const WGSL_GROUP1_STAGE_RANGE: usize = WGSL_FS_GROUP1_BASE as usize;

/// First texture-sampler pair binding of the fragment stage in GLSL.
pub const GLSL_FS_TEXTURE_SAMPLER_BASE: u32 = MAX_TEXTURE_SAMPLERS as u32;

pub const HLSL_MAX_REGISTER_T: usize = MAX_TEXTURES + MAX_STORAGE_BUFFERS;
pub const HLSL_MAX_REGISTER_U: usize = MAX_STORAGE_BUFFERS + MAX_STORAGE_IMAGES;
pub const MSL_MAX_BUFFERS: usize = MAX_UNIFORM_BLOCKS + MAX_STORAGE_BUFFERS;
pub const MSL_MAX_TEXTURES: usize = MAX_TEXTURES + MAX_STORAGE_IMAGES;

const_assert!(
    MAX_TEXTURES + MAX_STORAGE_BUFFERS + MAX_STORAGE_IMAGES + MAX_SAMPLERS
        <= WGSL_GROUP1_STAGE_RANGE
);

/// Hands out consecutive slots in `base..base + capacity`.
struct SlotCounter {
    next: u32,
    capacity: usize,
    end: u32,
    convention: Convention,
}

impl SlotCounter {
    fn new(base: u32, capacity: usize, convention: Convention) -> Self {
        Self {
            next: base,
            capacity,
            end: base + capacity as u32,
            convention,
        }
    }

    fn take(&mut self, category: Category, name: &str) -> Result<u32> {
        if self.next >= self.end {
            return Err(crate::Error::Capacity {
                category,
                name: name.to_owned(),
                limit: self.capacity as u32,
                convention: Some(self.convention),
            });
        }
        let slot = self.next;
        self.next += 1;
        Ok(slot)
    }
}

fn in_stage<R: Resource>(items: &mut [R], stage: ShaderStage) -> impl Iterator<Item = &mut R> {
    items.iter_mut().filter(move |r| r.stage() == stage)
}

/// Fills in the native slots of every resource in a merged program table.
///
/// The result only depends on the canonical order and stages of the
/// resources, so it is identical on every run.
pub fn allocate_slots(bindings: &mut Bindings) -> Result<()> {
    for stage in ShaderStage::ALL {
        allocate_hlsl(bindings, stage)?;
        allocate_msl(bindings, stage)?;
        allocate_wgsl(bindings, stage)?;
        allocate_glsl_pairs(bindings, stage)?;
    }
    for sbuf in &mut bindings.storage_buffers {
        sbuf.native.glsl_binding = sbuf.canonical_slot;
    }
    for simg in &mut bindings.storage_images {
        simg.native.glsl_binding = simg.canonical_slot;
    }
    Ok(())
}

fn allocate_hlsl(b: &mut Bindings, stage: ShaderStage) -> Result<()> {
    let mut reg_b = SlotCounter::new(0, MAX_UNIFORM_BLOCKS, Convention::Hlsl);
    for ub in in_stage(&mut b.uniform_blocks, stage) {
        ub.native.hlsl_register_b = Some(reg_b.take(Category::UniformBlock, &ub.name)?);
    }

    let mut reg_t = SlotCounter::new(0, HLSL_MAX_REGISTER_T, Convention::Hlsl);
    for tex in in_stage(&mut b.textures, stage) {
        tex.native.hlsl_register_t = Some(reg_t.take(Category::Texture, &tex.name)?);
    }
    for sbuf in in_stage(&mut b.storage_buffers, stage).filter(|s| s.readonly) {
        sbuf.native.hlsl_register_t = Some(reg_t.take(Category::StorageBuffer, &sbuf.name)?);
    }

    let mut reg_u = SlotCounter::new(0, HLSL_MAX_REGISTER_U, Convention::Hlsl);
    for sbuf in in_stage(&mut b.storage_buffers, stage).filter(|s| !s.readonly) {
        sbuf.native.hlsl_register_u = Some(reg_u.take(Category::StorageBuffer, &sbuf.name)?);
    }
    for simg in in_stage(&mut b.storage_images, stage) {
        simg.native.hlsl_register_u = Some(reg_u.take(Category::StorageImage, &simg.name)?);
    }

    let mut reg_s = SlotCounter::new(0, MAX_SAMPLERS, Convention::Hlsl);
    for smp in in_stage(&mut b.samplers, stage) {
        smp.native.hlsl_register_s = Some(reg_s.take(Category::Sampler, &smp.name)?);
    }
    Ok(())
}

fn allocate_msl(b: &mut Bindings, stage: ShaderStage) -> Result<()> {
    let mut buffer = SlotCounter::new(0, MSL_MAX_BUFFERS, Convention::Msl);
    for ub in in_stage(&mut b.uniform_blocks, stage) {
        ub.native.msl_buffer = Some(buffer.take(Category::UniformBlock, &ub.name)?);
    }
    for sbuf in in_stage(&mut b.storage_buffers, stage) {
        sbuf.native.msl_buffer = Some(buffer.take(Category::StorageBuffer, &sbuf.name)?);
    }

    let mut texture = SlotCounter::new(0, MSL_MAX_TEXTURES, Convention::Msl);
    for tex in in_stage(&mut b.textures, stage) {
        tex.native.msl_texture = Some(texture.take(Category::Texture, &tex.name)?);
    }
    for simg in in_stage(&mut b.storage_images, stage) {
        simg.native.msl_texture = Some(texture.take(Category::StorageImage, &simg.name)?);
    }

    let mut sampler = SlotCounter::new(0, MAX_SAMPLERS, Convention::Msl);
    for smp in in_stage(&mut b.samplers, stage) {
        smp.native.msl_sampler = Some(sampler.take(Category::Sampler, &smp.name)?);
    }
    Ok(())
}

fn allocate_wgsl(b: &mut Bindings, stage: ShaderStage) -> Result<()> {
    let (group0_base, group1_base) = match stage {
        ShaderStage::Fragment => (WGSL_FS_GROUP0_BASE, WGSL_FS_GROUP1_BASE),
        ShaderStage::Vertex | ShaderStage::Compute => (0, 0),
    };

    let mut group0 = SlotCounter::new(group0_base, MAX_UNIFORM_BLOCKS, Convention::Wgsl);
    for ub in in_stage(&mut b.uniform_blocks, stage) {
        ub.native.wgsl_group0_binding = Some(group0.take(Category::UniformBlock, &ub.name)?);
    }

    let mut group1 = SlotCounter::new(group1_base, WGSL_GROUP1_STAGE_RANGE, Convention::Wgsl);
    for tex in in_stage(&mut b.textures, stage) {
        tex.native.wgsl_group1_binding = Some(group1.take(Category::Texture, &tex.name)?);
    }
    for sbuf in in_stage(&mut b.storage_buffers, stage) {
        sbuf.native.wgsl_group1_binding = Some(group1.take(Category::StorageBuffer, &sbuf.name)?);
    }
    for simg in in_stage(&mut b.storage_images, stage) {
        simg.native.wgsl_group1_binding = Some(group1.take(Category::StorageImage, &simg.name)?);
    }
    for smp in in_stage(&mut b.samplers, stage) {
        smp.native.wgsl_group1_binding = Some(group1.take(Category::Sampler, &smp.name)?);
    }
    Ok(())
}

fn allocate_glsl_pairs(b: &mut Bindings, stage: ShaderStage) -> Result<()> {
    let base = match stage {
        ShaderStage::Fragment => GLSL_FS_TEXTURE_SAMPLER_BASE,
        ShaderStage::Vertex | ShaderStage::Compute => 0,
    };
    let mut binding = SlotCounter::new(base, MAX_TEXTURE_SAMPLERS, Convention::Glsl);
    for pair in in_stage(&mut b.texture_samplers, stage) {
        pair.native.glsl_binding = Some(binding.take(Category::TextureSampler, &pair.name)?);
    }
    Ok(())
}

/// A flat view of one allocated resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindSlot<'a> {
    pub category: Category,
    pub name: &'a str,
    pub stage: ShaderStage,
    pub canonical_slot: Option<u32>,
    pub native: NativeSlots,
}

impl Bindings {
    /// Every resource with its slots, category by category.
    pub fn bind_slots(&self) -> Vec<BindSlot<'_>> {
        let mut slots = Vec::new();
        let mut push = |category, name, stage, canonical_slot, native| {
            slots.push(BindSlot {
                category,
                name,
                stage,
                canonical_slot,
                native,
            });
        };
        for r in &self.uniform_blocks {
            push(Category::UniformBlock, r.name.as_str(), r.stage, r.canonical_slot, r.native);
        }
        for r in &self.storage_buffers {
            push(Category::StorageBuffer, r.name.as_str(), r.stage, r.canonical_slot, r.native);
        }
        for r in &self.textures {
            push(Category::Texture, r.name.as_str(), r.stage, r.canonical_slot, r.native);
        }
        for r in &self.samplers {
            push(Category::Sampler, r.name.as_str(), r.stage, r.canonical_slot, r.native);
        }
        for r in &self.storage_images {
            push(Category::StorageImage, r.name.as_str(), r.stage, r.canonical_slot, r.native);
        }
        for r in &self.texture_samplers {
            push(Category::TextureSampler, r.name.as_str(), r.stage, r.canonical_slot, r.native);
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ImageSampleType, ImageType, Sampler, SamplerType, StorageBuffer, StorageImage,
        StoragePixelFormat, Texture, TextureSampler, Type, UniformBlock,
    };

    fn ub(name: &str, stage: ShaderStage, canonical: u32) -> UniformBlock {
        UniformBlock {
            stage,
            slot: 0,
            canonical_slot: Some(canonical),
            name: name.into(),
            inst_name: name.into(),
            flattened: false,
            struct_info: Type::structure(name, None, vec![], 16),
            native: NativeSlots::default(),
        }
    }

    fn tex(name: &str, stage: ShaderStage, canonical: u32) -> Texture {
        Texture {
            stage,
            slot: 0,
            canonical_slot: Some(canonical),
            name: name.into(),
            image_type: ImageType::Dim2,
            sample_type: ImageSampleType::Float,
            multisampled: false,
            native: NativeSlots::default(),
        }
    }

    fn sbuf(name: &str, stage: ShaderStage, canonical: u32, readonly: bool) -> StorageBuffer {
        StorageBuffer {
            stage,
            slot: canonical,
            canonical_slot: Some(canonical),
            name: name.into(),
            inst_name: name.into(),
            readonly,
            struct_info: Type::structure(name, None, vec![], 16),
            native: NativeSlots::default(),
        }
    }

    fn smp(name: &str, stage: ShaderStage, canonical: u32) -> Sampler {
        Sampler {
            stage,
            slot: 0,
            canonical_slot: Some(canonical),
            name: name.into(),
            sampler_type: SamplerType::Filtering,
            native: NativeSlots::default(),
        }
    }

    fn simg(name: &str, stage: ShaderStage, canonical: u32) -> StorageImage {
        StorageImage {
            stage,
            slot: canonical,
            canonical_slot: Some(canonical),
            name: name.into(),
            image_type: ImageType::Dim2,
            format: StoragePixelFormat::Rgba8,
            native: NativeSlots::default(),
        }
    }

    fn pair(texture: &str, sampler: &str, stage: ShaderStage, canonical: u32) -> TextureSampler {
        TextureSampler {
            stage,
            slot: canonical,
            canonical_slot: Some(canonical),
            name: format!("{texture}_{sampler}"),
            texture_name: texture.into(),
            sampler_name: sampler.into(),
            native: NativeSlots::default(),
        }
    }

    fn program() -> Bindings {
        use ShaderStage::{Fragment, Vertex};
        Bindings {
            uniform_blocks: vec![ub("vs_params", Vertex, 0), ub("fs_params", Fragment, 1)],
            storage_buffers: vec![
                sbuf("vertices", Vertex, 0, true),
                sbuf("lights", Fragment, 1, true),
                sbuf("counters", Fragment, 2, false),
            ],
            textures: vec![tex("albedo", Fragment, 0), tex("height", Vertex, 1)],
            samplers: vec![smp("albedo_smp", Fragment, 0)],
            storage_images: vec![simg("out_img", Fragment, 0)],
            texture_samplers: vec![
                pair("albedo", "albedo_smp", Fragment, 0),
                pair("height", "height_smp", Vertex, 1),
            ],
        }
    }

    #[test]
    fn hlsl_registers() {
        let mut b = program();
        allocate_slots(&mut b).unwrap();
        // Read-only storage buffers follow the textures of their stage.
        assert_eq!(b.textures[0].native.hlsl_register_t, Some(0));
        assert_eq!(b.storage_buffers[1].native.hlsl_register_t, Some(1));
        assert_eq!(b.textures[1].native.hlsl_register_t, Some(0));
        assert_eq!(b.storage_buffers[0].native.hlsl_register_t, Some(1));
        // Storage images follow read/write storage buffers.
        assert_eq!(b.storage_buffers[2].native.hlsl_register_u, Some(0));
        assert_eq!(b.storage_images[0].native.hlsl_register_u, Some(1));
        assert_eq!(b.uniform_blocks[1].native.hlsl_register_b, Some(0));
        assert_eq!(b.storage_buffers[2].native.hlsl_register_t, None);
    }

    #[test]
    fn metal_indices() {
        let mut b = program();
        allocate_slots(&mut b).unwrap();
        assert_eq!(b.uniform_blocks[1].native.msl_buffer, Some(0));
        assert_eq!(b.storage_buffers[1].native.msl_buffer, Some(1));
        assert_eq!(b.storage_buffers[2].native.msl_buffer, Some(2));
        assert_eq!(b.storage_images[0].native.msl_texture, Some(1));
        assert_eq!(b.samplers[0].native.msl_sampler, Some(0));
    }

    #[test]
    fn wgsl_groups() {
        let mut b = program();
        allocate_slots(&mut b).unwrap();
        assert_eq!(b.uniform_blocks[0].native.wgsl_group0_binding, Some(0));
        assert_eq!(b.uniform_blocks[1].native.wgsl_group0_binding, Some(8));
        // Fragment group 1: albedo, lights, counters, out_img, albedo_smp.
        assert_eq!(b.textures[0].native.wgsl_group1_binding, Some(64));
        assert_eq!(b.storage_buffers[2].native.wgsl_group1_binding, Some(66));
        assert_eq!(b.storage_images[0].native.wgsl_group1_binding, Some(67));
        assert_eq!(b.samplers[0].native.wgsl_group1_binding, Some(68));
        // Vertex group 1: height, vertices.
        assert_eq!(b.textures[1].native.wgsl_group1_binding, Some(0));
        assert_eq!(b.storage_buffers[0].native.wgsl_group1_binding, Some(1));
    }

    #[test]
    fn glsl_storage_bindings_are_canonical() {
        let mut b = program();
        allocate_slots(&mut b).unwrap();
        let bindings: Vec<_> = b
            .storage_buffers
            .iter()
            .map(|s| s.native.glsl_binding)
            .collect();
        assert_eq!(bindings, [Some(0), Some(1), Some(2)]);
        assert_eq!(b.uniform_blocks[0].native.glsl_binding, None);
    }

    #[test]
    fn glsl_texture_sampler_bindings() {
        let mut b = program();
        allocate_slots(&mut b).unwrap();
        assert_eq!(b.texture_samplers[0].native.glsl_binding, Some(16));
        assert_eq!(b.texture_samplers[1].native.glsl_binding, Some(0));
        let listed = b
            .bind_slots()
            .into_iter()
            .find(|slot| {
                slot.category == Category::TextureSampler && slot.name == "albedo_albedo_smp"
            })
            .unwrap();
        assert_eq!(listed.native.glsl_binding, Some(GLSL_FS_TEXTURE_SAMPLER_BASE));
    }

    #[test]
    fn hlsl_t_register_overflow() {
        let mut b = Bindings {
            textures: (0..16)
                .map(|i| tex(&format!("t{i}"), ShaderStage::Fragment, i))
                .collect(),
            storage_buffers: (0..9)
                .map(|i| sbuf(&format!("s{i}"), ShaderStage::Fragment, i, true))
                .collect(),
            ..Bindings::default()
        };
        let err = allocate_slots(&mut b).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Capacity {
                convention: Some(Convention::Hlsl),
                limit: 24,
                ..
            }
        ));
    }
}
