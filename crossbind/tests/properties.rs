// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests of member layout and slot allocation.

use std::collections::HashSet;

use crossbind::{
    allocate_slots, emit_layout, merge_bindings, roundup, Bindings, ImageSampleType, ImageType,
    LayoutItem, NativeSlots, Sampler, SamplerType, ScalarKind, ShaderStage, StorageBuffer,
    StorageImage, StoragePixelFormat, Texture, Type, UniformBlock, UNIFORM_BLOCK_PADDING,
    WGSL_FS_GROUP1_BASE,
};
use proptest::prelude::*;

fn member(kind: u8, name: String) -> Type {
    match kind {
        0 => Type::scalar(name, ScalarKind::Float),
        1 => Type::vector(name, ScalarKind::Float, 2),
        2 => Type::vector(name, ScalarKind::Int, 3),
        3 => Type::vector(name, ScalarKind::Float, 4),
        4 => Type::matrix(name, 4, 4),
        _ => Type::vector(name, ScalarKind::Float, 4).with_array(3, 16),
    }
}

/// A uniform block whose members are separated by random gaps.
fn block_strategy() -> impl Strategy<Value = Type> {
    prop::collection::vec((0_u32..4, 0_u8..6), 1..12).prop_map(|specs| {
        let mut cursor = 0;
        let mut members = Vec::new();
        for (i, (gap, kind)) in specs.into_iter().enumerate() {
            let ty = member(kind, format!("m{i}")).at(cursor + 4 * gap);
            cursor = ty.offset + ty.footprint();
            members.push(ty);
        }
        Type::structure("block", Some("block".into()), members, cursor)
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]
    #[test]
    fn layout_is_gap_free_and_padded(block in block_strategy()) {
        let layout = emit_layout(&block, UNIFORM_BLOCK_PADDING);
        prop_assert_eq!(layout.size, roundup(block.size, 16));
        prop_assert_eq!(layout.items.iter().map(LayoutItem::size).sum::<u32>(), layout.size);

        let mut offset = 0;
        let mut previous_was_padding = false;
        for item in &layout.items {
            match item {
                LayoutItem::Member { ty, .. } => {
                    prop_assert_eq!(ty.offset, offset);
                    previous_was_padding = false;
                }
                LayoutItem::Padding { offset: at, size } => {
                    prop_assert_eq!(*at, offset);
                    prop_assert!(*size > 0);
                    prop_assert!(!previous_was_padding);
                    previous_was_padding = true;
                }
            }
            offset += item.size();
        }
    }
}

#[derive(Clone, Debug)]
struct StageCounts {
    uniform_blocks: usize,
    textures: usize,
    storage_buffers: usize,
    storage_images: usize,
    samplers: usize,
}

fn counts_strategy() -> impl Strategy<Value = StageCounts> {
    (0_usize..4, 0_usize..8, 0_usize..4, 0_usize..2, 0_usize..8).prop_map(
        |(uniform_blocks, textures, storage_buffers, storage_images, samplers)| StageCounts {
            uniform_blocks,
            textures,
            storage_buffers,
            storage_images,
            samplers,
        },
    )
}

fn stage_bindings(stage: ShaderStage, counts: &StageCounts, first_binding: u32) -> Bindings {
    let prefix = match stage {
        ShaderStage::Vertex => "vs",
        ShaderStage::Fragment => "fs",
        ShaderStage::Compute => "cs",
    };
    let n = |i: usize| i as u32;
    Bindings {
        uniform_blocks: (0..counts.uniform_blocks)
            .map(|i| UniformBlock {
                stage,
                slot: n(i),
                canonical_slot: None,
                name: format!("{prefix}_params{i}"),
                inst_name: format!("p{i}"),
                flattened: false,
                struct_info: Type::structure(
                    "params",
                    None,
                    vec![Type::vector("v", ScalarKind::Float, 4)],
                    16,
                ),
                native: NativeSlots::default(),
            })
            .collect(),
        storage_buffers: (0..counts.storage_buffers)
            .map(|i| StorageBuffer {
                stage,
                slot: first_binding + n(i),
                canonical_slot: None,
                name: format!("{prefix}_buf{i}"),
                inst_name: format!("b{i}"),
                readonly: i % 2 == 0,
                struct_info: Type::structure("buf", None, vec![], 16),
                native: NativeSlots::default(),
            })
            .collect(),
        textures: (0..counts.textures)
            .map(|i| Texture {
                stage,
                slot: n(i),
                canonical_slot: None,
                name: format!("{prefix}_tex{i}"),
                image_type: ImageType::Dim2,
                sample_type: ImageSampleType::Float,
                multisampled: false,
                native: NativeSlots::default(),
            })
            .collect(),
        samplers: (0..counts.samplers)
            .map(|i| Sampler {
                stage,
                slot: n(i),
                canonical_slot: None,
                name: format!("{prefix}_smp{i}"),
                sampler_type: SamplerType::Filtering,
                native: NativeSlots::default(),
            })
            .collect(),
        storage_images: (0..counts.storage_images)
            .map(|i| StorageImage {
                stage,
                slot: first_binding + n(i),
                canonical_slot: None,
                name: format!("{prefix}_img{i}"),
                image_type: ImageType::Dim2,
                format: StoragePixelFormat::Rgba8,
                native: NativeSlots::default(),
            })
            .collect(),
        texture_samplers: Vec::new(),
    }
}

fn program(vs: &StageCounts, fs: &StageCounts) -> Bindings {
    let vs = stage_bindings(ShaderStage::Vertex, vs, 0);
    let fs = stage_bindings(ShaderStage::Fragment, fs, 4);
    let mut merged = merge_bindings([&vs, &fs]).unwrap();
    allocate_slots(&mut merged).unwrap();
    merged
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]
    #[test]
    fn allocation_is_deterministic(vs in counts_strategy(), fs in counts_strategy()) {
        prop_assert_eq!(program(&vs, &fs), program(&vs, &fs));
    }

    #[test]
    fn wgsl_groups_are_separated(vs in counts_strategy(), fs in counts_strategy()) {
        let bindings = program(&vs, &fs);
        let mut group0 = HashSet::new();
        let mut group1 = HashSet::new();
        for slot in bindings.bind_slots() {
            let native = slot.native;
            if let Some(binding) = native.wgsl_group0_binding {
                prop_assert!(native.wgsl_group1_binding.is_none());
                prop_assert!(group0.insert(binding));
            }
            if let Some(binding) = native.wgsl_group1_binding {
                prop_assert!(group1.insert(binding));
                if slot.stage == ShaderStage::Fragment {
                    prop_assert!(binding >= WGSL_FS_GROUP1_BASE);
                } else {
                    prop_assert!(binding < WGSL_FS_GROUP1_BASE);
                }
            }
        }
        prop_assert_eq!(group0.len(), bindings.uniform_blocks.len());
    }

    #[test]
    fn hlsl_registers_never_collide(vs in counts_strategy(), fs in counts_strategy()) {
        let bindings = program(&vs, &fs);
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            let mut seen = HashSet::new();
            for slot in bindings.bind_slots().into_iter().filter(|s| s.stage == stage) {
                let n = slot.native;
                let registers = [
                    n.hlsl_register_b.map(|r| ('b', r)),
                    n.hlsl_register_t.map(|r| ('t', r)),
                    n.hlsl_register_u.map(|r| ('u', r)),
                    n.hlsl_register_s.map(|r| ('s', r)),
                ];
                for register in registers.into_iter().flatten() {
                    prop_assert!(seen.insert(register));
                }
            }
        }
    }
}
