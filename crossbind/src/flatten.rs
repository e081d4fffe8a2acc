// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform blocks that GL backends see as a single vec4 array.

use crate::types::{roundup, ScalarKind, Shape, Type};

/// The component family a flattened block is uploaded as.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TypeFamily {
    Float,
    Int,
}

impl Type {
    /// The flattening family of this member; `None` for bools and structs.
    pub fn family(&self) -> Option<TypeFamily> {
        match &self.shape {
            Shape::Vector {
                kind: ScalarKind::Float,
                ..
            }
            | Shape::Matrix { .. } => Some(TypeFamily::Float),
            Shape::Vector {
                kind: ScalarKind::Int | ScalarKind::UInt,
                ..
            } => Some(TypeFamily::Int),
            Shape::Vector {
                kind: ScalarKind::Bool,
                ..
            }
            | Shape::Struct { .. } => None,
        }
    }
}

/// Whether `block` has members and all of them share one family.
pub fn can_flatten(block: &Type) -> bool {
    family_of(block).is_some()
}

fn family_of(block: &Type) -> Option<TypeFamily> {
    let mut family = None;
    for member in block.members() {
        let member_family = member.family()?;
        match family {
            None => family = Some(member_family),
            Some(f) if f != member_family => return None,
            Some(_) => {}
        }
    }
    family
}

/// The synthetic uniform standing in for a flattened block.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FlattenedUniform {
    /// The struct name of the block, never its instance name.
    pub name: String,
    pub family: TypeFamily,
    /// Number of 4-component elements.
    pub array_count: u32,
}

impl FlattenedUniform {
    pub fn glsl_name(&self) -> &'static str {
        match self.family {
            TypeFamily::Float => "vec4",
            TypeFamily::Int => "ivec4",
        }
    }
}

pub(crate) fn flattened_uniform(name: &str, block: &Type) -> FlattenedUniform {
    FlattenedUniform {
        name: name.to_owned(),
        family: family_of(block).unwrap_or(TypeFamily::Float),
        array_count: roundup(block.size, 16) / 16,
    }
}
