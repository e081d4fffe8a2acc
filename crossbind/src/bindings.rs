// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    Category, NativeSlots, Resource, Sampler, ShaderStage, StorageBuffer, StorageImage, Texture,
    TextureSampler, UniformBlock,
};

pub const MAX_UNIFORM_BLOCKS: usize = 8;
pub const MAX_STORAGE_BUFFERS: usize = 8;
pub const MAX_TEXTURES: usize = 16;
pub const MAX_SAMPLERS: usize = 16;
pub const MAX_STORAGE_IMAGES: usize = 4;
pub const MAX_TEXTURE_SAMPLERS: usize = 16;

impl Category {
    /// How many canonical slots a program may use in this category.
    pub fn capacity(self) -> usize {
        match self {
            Self::UniformBlock => MAX_UNIFORM_BLOCKS,
            Self::StorageBuffer => MAX_STORAGE_BUFFERS,
            Self::Texture => MAX_TEXTURES,
            Self::Sampler => MAX_SAMPLERS,
            Self::StorageImage => MAX_STORAGE_IMAGES,
            Self::TextureSampler => MAX_TEXTURE_SAMPLERS,
            Self::VertexAttr => crate::MAX_ATTRS,
        }
    }
}

/// Resources of a stage, a program or a whole input, one list per category.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Bindings {
    pub uniform_blocks: Vec<UniformBlock>,
    pub storage_buffers: Vec<StorageBuffer>,
    pub textures: Vec<Texture>,
    pub samplers: Vec<Sampler>,
    pub storage_images: Vec<StorageImage>,
    pub texture_samplers: Vec<TextureSampler>,
}

impl Bindings {
    pub fn is_empty(&self) -> bool {
        self.uniform_blocks.is_empty()
            && self.storage_buffers.is_empty()
            && self.textures.is_empty()
            && self.samplers.is_empty()
            && self.storage_images.is_empty()
            && self.texture_samplers.is_empty()
    }

    pub fn find_uniform_block_by_name(&self, name: &str) -> Option<&UniformBlock> {
        find_by_name(&self.uniform_blocks, name)
    }

    pub fn find_storage_buffer_by_name(&self, name: &str) -> Option<&StorageBuffer> {
        find_by_name(&self.storage_buffers, name)
    }

    pub fn find_texture_by_name(&self, name: &str) -> Option<&Texture> {
        find_by_name(&self.textures, name)
    }

    pub fn find_sampler_by_name(&self, name: &str) -> Option<&Sampler> {
        find_by_name(&self.samplers, name)
    }

    pub fn find_storage_image_by_name(&self, name: &str) -> Option<&StorageImage> {
        find_by_name(&self.storage_images, name)
    }

    pub fn find_texture_sampler_by_name(&self, name: &str) -> Option<&TextureSampler> {
        find_by_name(&self.texture_samplers, name)
    }

    pub fn find_uniform_block_by_slot(&self, slot: u32) -> Option<&UniformBlock> {
        find_by_slot(&self.uniform_blocks, slot)
    }

    pub fn find_storage_buffer_by_slot(&self, slot: u32) -> Option<&StorageBuffer> {
        find_by_slot(&self.storage_buffers, slot)
    }

    pub fn find_texture_by_slot(&self, slot: u32) -> Option<&Texture> {
        find_by_slot(&self.textures, slot)
    }

    pub fn find_sampler_by_slot(&self, slot: u32) -> Option<&Sampler> {
        find_by_slot(&self.samplers, slot)
    }

    pub fn find_storage_image_by_slot(&self, slot: u32) -> Option<&StorageImage> {
        find_by_slot(&self.storage_images, slot)
    }

    /// Native slots of the resource `name` used by `stage`.
    pub fn native_slots(
        &self,
        category: Category,
        name: &str,
        stage: ShaderStage,
    ) -> Option<NativeSlots> {
        fn lookup<R: Resource>(
            items: &[R],
            name: &str,
            stage: ShaderStage,
        ) -> Option<NativeSlots> {
            items
                .iter()
                .find(|r| r.name() == name && r.stage() == stage)
                .map(|r| *r.native())
        }
        match category {
            Category::UniformBlock => lookup(&self.uniform_blocks, name, stage),
            Category::StorageBuffer => lookup(&self.storage_buffers, name, stage),
            Category::Texture => lookup(&self.textures, name, stage),
            Category::Sampler => lookup(&self.samplers, name, stage),
            Category::StorageImage => lookup(&self.storage_images, name, stage),
            Category::TextureSampler => lookup(&self.texture_samplers, name, stage),
            Category::VertexAttr => None,
        }
    }

    /// Canonical texture and sampler slots of a combined pair.
    pub fn texture_sampler_slots(&self, pair: &TextureSampler) -> Option<(u32, u32)> {
        let texture = self.find_texture_by_name(&pair.texture_name)?;
        let sampler = self.find_sampler_by_name(&pair.sampler_name)?;
        Some((texture.canonical_slot?, sampler.canonical_slot?))
    }
}

fn find_by_name<'a, R: Resource>(items: &'a [R], name: &str) -> Option<&'a R> {
    items.iter().find(|r| r.name() == name)
}

fn find_by_slot<R: Resource>(items: &[R], slot: u32) -> Option<&R> {
    items.iter().find(|r| r.canonical_slot() == Some(slot))
}
