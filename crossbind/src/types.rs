// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The memory layout model of buffer members.

use std::borrow::Cow;

/// The element kind of scalars and vectors.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScalarKind {
    Bool,
    Int,
    UInt,
    Float,
}

/// The shape of a [`Type`], independent of its array dimension.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Shape {
    /// A scalar when `arity` is 1, a vector otherwise.
    Vector { kind: ScalarKind, arity: u8 },
    /// A float matrix of `columns` column vectors with `rows` components each.
    Matrix { columns: u8, rows: u8 },
    /// A struct whose members are laid out at their own offsets.
    Struct {
        type_name: Option<String>,
        members: Vec<Type>,
    },
}

/// Array dimension of a [`Type`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ArrayInfo {
    /// Element count, zero for a runtime-sized array.
    pub count: u32,
    /// Bytes between consecutive elements.
    pub stride: u32,
}

/// A member (or the whole) of a uniform block or storage buffer.
///
/// Two types are equal when all of their properties are equal, recursively
/// through struct members. This includes names and offsets.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Type {
    pub name: String,
    pub shape: Shape,
    /// Byte offset inside the enclosing struct.
    pub offset: u32,
    /// Byte size of a single element.
    pub size: u32,
    pub align: u32,
    pub array: Option<ArrayInfo>,
    /// Bytes between matrix columns, zero for anything but matrices.
    pub matrix_stride: u32,
}

impl Type {
    pub fn scalar(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self::vector(name, kind, 1)
    }

    pub fn vector(name: impl Into<String>, kind: ScalarKind, arity: u8) -> Self {
        let shape = Shape::Vector { kind, arity };
        Self {
            name: name.into(),
            align: shape_align(&shape),
            shape,
            offset: 0,
            size: 4 * u32::from(arity),
            array: None,
            matrix_stride: 0,
        }
    }

    /// A matrix whose columns are padded to vec4 as in std140 and std430.
    pub fn matrix(name: impl Into<String>, columns: u8, rows: u8) -> Self {
        let matrix_stride = if rows == 2 { 8 } else { 16 };
        let shape = Shape::Matrix { columns, rows };
        Self {
            name: name.into(),
            align: shape_align(&shape),
            shape,
            offset: 0,
            size: u32::from(columns) * matrix_stride,
            array: None,
            matrix_stride,
        }
    }

    pub fn structure(
        name: impl Into<String>,
        type_name: Option<String>,
        members: Vec<Self>,
        size: u32,
    ) -> Self {
        let shape = Shape::Struct { type_name, members };
        Self {
            name: name.into(),
            align: shape_align(&shape),
            shape,
            offset: 0,
            size,
            array: None,
            matrix_stride: 0,
        }
    }

    #[must_use]
    pub fn at(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn with_array(mut self, count: u32, stride: u32) -> Self {
        self.array = Some(ArrayInfo { count, stride });
        self
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.shape, Shape::Struct { .. })
    }

    pub fn is_runtime_array(&self) -> bool {
        matches!(self.array, Some(ArrayInfo { count: 0, .. }))
    }

    /// Struct members, empty for anything but structs.
    pub fn members(&self) -> &[Self] {
        match &self.shape {
            Shape::Struct { members, .. } => members,
            _ => &[],
        }
    }

    /// The declared struct type name, falling back to the member name.
    pub fn struct_name(&self) -> &str {
        match &self.shape {
            Shape::Struct {
                type_name: Some(type_name),
                ..
            } => type_name,
            _ => &self.name,
        }
    }

    /// Bytes this member occupies in its parent.
    ///
    /// A runtime-sized array accounts for exactly one element, which is also
    /// how it appears in generated declarations.
    pub fn footprint(&self) -> u32 {
        match self.array {
            Some(ArrayInfo { count: 0, stride }) => stride,
            Some(ArrayInfo { count, stride }) => count * stride,
            None => self.size,
        }
    }

    /// The GLSL spelling of the element type, for example `vec3` or `mat4x3`.
    pub fn glsl_name(&self) -> Cow<'_, str> {
        match &self.shape {
            Shape::Vector { kind, arity: 1 } => Cow::Borrowed(match kind {
                ScalarKind::Bool => "bool",
                ScalarKind::Int => "int",
                ScalarKind::UInt => "uint",
                ScalarKind::Float => "float",
            }),
            Shape::Vector { kind, arity } => {
                let prefix = match kind {
                    ScalarKind::Bool => "b",
                    ScalarKind::Int => "i",
                    ScalarKind::UInt => "u",
                    ScalarKind::Float => "",
                };
                Cow::Owned(format!("{prefix}vec{arity}"))
            }
            Shape::Matrix { columns, rows } if columns == rows => {
                Cow::Owned(format!("mat{columns}"))
            }
            Shape::Matrix { columns, rows } => Cow::Owned(format!("mat{columns}x{rows}")),
            Shape::Struct { .. } => Cow::Borrowed(self.struct_name()),
        }
    }
}

/// Alignment of a shape in a buffer.
///
/// Vectors (and matrix columns, which are vectors of `rows` components) of
/// arity 3 align to 16 bytes, everything else to 4 bytes per component.
/// Structs align to their most aligned member.
pub fn shape_align(shape: &Shape) -> u32 {
    match shape {
        Shape::Vector { arity, .. } => arity_align(*arity),
        Shape::Matrix { rows, .. } => arity_align(*rows),
        Shape::Struct { members, .. } => members.iter().map(|m| m.align).max().unwrap_or(4),
    }
}

fn arity_align(arity: u8) -> u32 {
    if arity == 3 {
        16
    } else {
        4 * u32::from(arity)
    }
}

/// Rounds `value` up to the next multiple of `to`.
pub fn roundup(value: u32, to: u32) -> u32 {
    value.div_ceil(to) * to
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_rule() {
        let f = |arity| Type::vector("v", ScalarKind::Float, arity).align;
        assert_eq!([f(1), f(2), f(3), f(4)], [4, 8, 16, 16]);
        assert_eq!(Type::matrix("m", 4, 4).align, 16);
        assert_eq!(Type::matrix("m", 3, 2).align, 8);
        assert_eq!(Type::matrix("m", 2, 3).align, 16);
    }

    #[test]
    fn struct_aligns_to_widest_member() {
        let s = Type::structure(
            "light",
            Some("Light".into()),
            vec![
                Type::scalar("intensity", ScalarKind::Float),
                Type::vector("dir", ScalarKind::Float, 2).at(8),
            ],
            16,
        );
        assert_eq!(s.align, 8);
        assert_eq!(s.struct_name(), "Light");
        assert_eq!(s.glsl_name(), "Light");
    }

    #[test]
    fn footprint_of_arrays() {
        let v = Type::vector("v", ScalarKind::Float, 2);
        assert_eq!(v.footprint(), 8);
        assert_eq!(v.clone().with_array(4, 16).footprint(), 64);
        let runtime = v.with_array(0, 16);
        assert!(runtime.is_runtime_array());
        assert_eq!(runtime.footprint(), 16);
    }

    #[test]
    fn glsl_names() {
        assert_eq!(Type::scalar("a", ScalarKind::UInt).glsl_name(), "uint");
        assert_eq!(Type::vector("a", ScalarKind::Int, 3).glsl_name(), "ivec3");
        assert_eq!(Type::matrix("a", 4, 4).glsl_name(), "mat4");
        assert_eq!(Type::matrix("a", 4, 3).glsl_name(), "mat4x3");
    }

    #[test]
    fn roundup_to_multiples() {
        assert_eq!(roundup(0, 16), 0);
        assert_eq!(roundup(1, 16), 16);
        assert_eq!(roundup(16, 16), 16);
        assert_eq!(roundup(84, 16), 96);
    }
}
