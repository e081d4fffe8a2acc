// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deduplication of resources across stages and programs.

use std::collections::HashMap;

use crate::error::Result;
use crate::reflection::{ProgramReflection, StageAttr};
use crate::{Bindings, Category, Error, Resource};

/// Merges resource tables into one, assigning canonical slots.
///
/// Resources are matched by name within a category. The first occurrence of
/// a name wins and later occurrences must be in the same stage with the same
/// shape. Canonical slots are assigned densely in first-seen order.
pub fn merge_bindings<'a>(sources: impl IntoIterator<Item = &'a Bindings>) -> Result<Bindings> {
    let mut merged = Bindings::default();
    for bindings in sources {
        merge_into(&mut merged.uniform_blocks, &bindings.uniform_blocks)?;
        merge_into(&mut merged.storage_buffers, &bindings.storage_buffers)?;
        merge_into(&mut merged.textures, &bindings.textures)?;
        merge_into(&mut merged.samplers, &bindings.samplers)?;
        merge_into(&mut merged.storage_images, &bindings.storage_images)?;
        merge_into(&mut merged.texture_samplers, &bindings.texture_samplers)?;
    }
    Ok(merged)
}

fn merge_into<R: Resource>(merged: &mut Vec<R>, incoming: &[R]) -> Result<()> {
    for resource in incoming {
        match merged.iter().find(|r| r.name() == resource.name()) {
            Some(existing) if existing.same_shape(resource) => {}
            Some(_) => {
                return Err(Error::Conflict {
                    category: R::CATEGORY,
                    name: resource.name().to_owned(),
                });
            }
            None => {
                let mut resource = resource.clone();
                resource.set_canonical_slot(merged.len() as u32);
                log::trace!(
                    "{} '{}' from the {} stage gets canonical slot {}",
                    R::CATEGORY,
                    resource.name(),
                    resource.stage(),
                    merged.len()
                );
                merged.push(resource);
            }
        }
    }
    Ok(())
}

/// Checks a merged program table against per-category capacities, and
/// storage resources against stage-local binding collisions.
///
/// GL binds storage buffers and storage images at the binding the shader
/// declares, so two different resources declared at the same binding in a
/// single program can't both be bound.
pub fn validate_program_bindings(program: &str, bindings: &Bindings) -> Result<()> {
    check_capacity(&bindings.uniform_blocks)?;
    check_capacity(&bindings.storage_buffers)?;
    check_capacity(&bindings.textures)?;
    check_capacity(&bindings.samplers)?;
    check_capacity(&bindings.storage_images)?;
    check_capacity(&bindings.texture_samplers)?;
    check_collisions(program, &bindings.storage_buffers)?;
    check_collisions(program, &bindings.storage_images)?;
    Ok(())
}

fn check_capacity<R: Resource>(items: &[R]) -> Result<()> {
    let limit = R::CATEGORY.capacity();
    match items.get(limit) {
        Some(first_over) => Err(Error::Capacity {
            category: R::CATEGORY,
            name: first_over.name().to_owned(),
            limit: limit as u32,
            convention: None,
        }),
        None => Ok(()),
    }
}

fn check_collisions<R: Resource>(program: &str, items: &[R]) -> Result<()> {
    let mut seen: HashMap<u32, &R> = HashMap::new();
    for resource in items {
        if let Some(first) = seen.insert(resource.stage_slot(), resource) {
            return Err(Error::BindingCollision {
                category: R::CATEGORY,
                program: program.to_owned(),
                first: first.name().to_owned(),
                second: resource.name().to_owned(),
                binding: resource.stage_slot(),
            });
        }
    }
    Ok(())
}

/// A vertex shader input, tagged with the snippet declaring it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VertexAttr {
    pub snippet: String,
    pub attr: StageAttr,
}

/// Collects the vertex shader inputs of all programs.
///
/// Attributes are identified by snippet and attribute name. The same
/// attribute seen through different programs must agree on its slot and
/// semantics.
pub fn merge_vertex_attrs(programs: &[ProgramReflection]) -> Result<Vec<VertexAttr>> {
    let mut merged: Vec<VertexAttr> = Vec::new();
    for vs in programs.iter().filter_map(ProgramReflection::vs) {
        for attr in vs.inputs() {
            let existing = merged
                .iter()
                .find(|a| a.snippet == vs.snippet && a.attr.name == attr.name);
            match existing {
                Some(existing) if existing.attr.same_as(attr) => {}
                Some(_) => {
                    return Err(Error::Conflict {
                        category: Category::VertexAttr,
                        name: attr.name.clone(),
                    });
                }
                None => merged.push(VertexAttr {
                    snippet: vs.snippet.clone(),
                    attr: attr.clone(),
                }),
            }
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::{StageAttrs, StageReflection, ATTR_SEMANTIC};
    use crate::{NativeSlots, ScalarKind, ShaderStage, StorageBuffer, Type, UniformBlock};

    fn params(stage: ShaderStage, members: Vec<Type>) -> UniformBlock {
        UniformBlock {
            stage,
            slot: 0,
            canonical_slot: None,
            name: "params".into(),
            inst_name: "p".into(),
            flattened: false,
            struct_info: Type::structure("params", Some("params".into()), members, 16),
            native: NativeSlots::default(),
        }
    }

    fn stage_bindings(blocks: Vec<UniformBlock>) -> Bindings {
        Bindings {
            uniform_blocks: blocks,
            ..Bindings::default()
        }
    }

    fn sbuf(name: &str, stage: ShaderStage, slot: u32) -> StorageBuffer {
        StorageBuffer {
            stage,
            slot,
            canonical_slot: None,
            name: name.into(),
            inst_name: name.into(),
            readonly: true,
            struct_info: Type::structure(name, None, vec![], 16),
            native: NativeSlots::default(),
        }
    }

    fn position_at(slot: u32) -> StageAttrs {
        let mut attrs: StageAttrs = std::array::from_fn(|_| None);
        attrs[slot as usize] = Some(StageAttr {
            slot,
            name: "position".into(),
            sem_name: ATTR_SEMANTIC.into(),
            sem_index: slot,
            ty: Type::vector("position", ScalarKind::Float, 4),
        });
        attrs
    }

    fn render_program(name: &str, inputs: StageAttrs) -> ProgramReflection {
        let vs = StageReflection {
            snippet: "vs".into(),
            stage: ShaderStage::Vertex,
            entry_point: "main".into(),
            workgroup_size: [1, 1, 1],
            inputs,
            outputs: std::array::from_fn(|_| None),
            bindings: Bindings::default(),
        };
        ProgramReflection {
            name: name.into(),
            line: 1,
            stages: [Some(vs), None, None],
            bindings: Bindings::default(),
        }
    }

    #[test]
    fn identical_blocks_share_a_canonical_slot() {
        let tint = || vec![Type::vector("tint", ScalarKind::Float, 4)];
        let first = stage_bindings(vec![params(ShaderStage::Fragment, tint())]);
        let mut shared = params(ShaderStage::Fragment, tint());
        shared.inst_name = "other".into();
        shared.slot = 2;
        let mut extra = params(ShaderStage::Fragment, tint());
        extra.name = "extra".into();
        let second = stage_bindings(vec![extra, shared]);

        let merged = merge_bindings([&first, &second]).unwrap();
        let names: Vec<_> = merged.uniform_blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["params", "extra"]);
        assert_eq!(merged.uniform_blocks[0].inst_name, "p");
        assert_eq!(merged.uniform_blocks[1].canonical_slot, Some(1));
    }

    #[test]
    fn one_name_in_two_stages_conflicts() {
        let tint = || vec![Type::vector("tint", ScalarKind::Float, 4)];
        let vs = stage_bindings(vec![params(ShaderStage::Vertex, tint())]);
        let fs = stage_bindings(vec![params(ShaderStage::Fragment, tint())]);
        let err = merge_bindings([&vs, &fs]).unwrap_err();
        assert!(matches!(
            err,
            Error::Conflict { category: Category::UniformBlock, name } if name == "params"
        ));
    }

    #[test]
    fn shared_vertex_attrs_merge_once() {
        let programs = [
            render_program("a", position_at(0)),
            render_program("b", position_at(0)),
        ];
        let attrs = merge_vertex_attrs(&programs).unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].snippet, "vs");
    }

    #[test]
    fn vertex_attr_moved_to_another_slot_conflicts() {
        let programs = [
            render_program("a", position_at(0)),
            render_program("b", position_at(1)),
        ];
        let err = merge_vertex_attrs(&programs).unwrap_err();
        assert!(matches!(
            err,
            Error::Conflict { category: Category::VertexAttr, name } if name == "position"
        ));
    }

    #[test]
    fn differing_blocks_conflict() {
        let first = stage_bindings(vec![params(
            ShaderStage::Fragment,
            vec![Type::vector("tint", ScalarKind::Float, 4)],
        )]);
        let second = stage_bindings(vec![params(
            ShaderStage::Fragment,
            vec![Type::vector("tint", ScalarKind::Float, 3)],
        )]);
        let err = merge_bindings([&first, &second]).unwrap_err();
        assert!(matches!(
            err,
            Error::Conflict { category: Category::UniformBlock, name } if name == "params"
        ));
    }

    #[test]
    fn storage_buffers_colliding_on_a_binding() {
        let bindings = Bindings {
            storage_buffers: vec![
                sbuf("positions", ShaderStage::Vertex, 0),
                sbuf("colors", ShaderStage::Fragment, 0),
            ],
            ..Bindings::default()
        };
        let err = validate_program_bindings("quad", &bindings).unwrap_err();
        assert!(matches!(err, Error::BindingCollision { binding: 0, .. }));
    }

    #[test]
    fn too_many_storage_buffers() {
        let bindings = Bindings {
            storage_buffers: (0..9)
                .map(|i| sbuf(&format!("buf{i}"), ShaderStage::Compute, i))
                .collect(),
            ..Bindings::default()
        };
        let err = validate_program_bindings("sim", &bindings).unwrap_err();
        assert!(matches!(err, Error::Capacity { name, limit: 8, .. } if name == "buf8"));
    }
}
