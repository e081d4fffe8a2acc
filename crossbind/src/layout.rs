// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Padded member sequences for host-side struct declarations.

use crate::types::{roundup, Type};

/// Where the tail of a struct is padded to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PadTo {
    /// The next multiple of the given byte count, at least the declared size.
    Multiple(u32),
    /// Exactly the given byte count.
    Size(u32),
}

/// Padding granularity of uniform blocks.
pub const UNIFORM_BLOCK_PADDING: PadTo = PadTo::Multiple(16);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutItem<'a> {
    Member {
        ty: &'a Type,
        /// The layout of a struct member, padded to its own size.
        nested: Option<StructLayout<'a>>,
    },
    Padding {
        offset: u32,
        size: u32,
    },
}

impl LayoutItem<'_> {
    pub fn size(&self) -> u32 {
        match self {
            Self::Member { ty, .. } => ty.footprint(),
            Self::Padding { size, .. } => *size,
        }
    }

    /// Name of the item as it appears in a declaration.
    pub fn name(&self) -> String {
        match self {
            Self::Member { ty, .. } => ty.name.clone(),
            Self::Padding { offset, .. } => format!("_pad_{offset}"),
        }
    }
}

/// A gap free sequence of members and padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructLayout<'a> {
    pub items: Vec<LayoutItem<'a>>,
    /// Sum of all item sizes.
    pub size: u32,
}

impl StructLayout<'_> {
    pub fn padding_bytes(&self) -> u32 {
        self.items
            .iter()
            .filter_map(|item| match item {
                LayoutItem::Padding { size, .. } => Some(*size),
                LayoutItem::Member { .. } => None,
            })
            .sum()
    }
}

/// Lays out the members of `ty` in offset order with explicit padding.
///
/// A padding item fills every gap between the end of one member and the
/// offset of the next, and one more pads the tail according to `pad`.
/// Nested structs are laid out independently, starting at offset zero.
pub fn emit_layout(ty: &Type, pad: PadTo) -> StructLayout<'_> {
    let mut members: Vec<&Type> = ty.members().iter().collect();
    members.sort_by_key(|member| member.offset);

    let mut items = Vec::with_capacity(members.len() * 2 + 1);
    let mut cursor = 0;
    for member in members {
        if member.offset > cursor {
            items.push(LayoutItem::Padding {
                offset: cursor,
                size: member.offset - cursor,
            });
            cursor = member.offset;
        }
        let nested = member
            .is_struct()
            .then(|| emit_layout(member, PadTo::Size(member.size)));
        items.push(LayoutItem::Member { ty: member, nested });
        cursor += member.footprint();
    }

    let end = match pad {
        PadTo::Multiple(n) => roundup(cursor.max(ty.size), n),
        PadTo::Size(n) => n,
    };
    if end > cursor {
        items.push(LayoutItem::Padding {
            offset: cursor,
            size: end - cursor,
        });
        cursor = end;
    } else if end < cursor {
        log::warn!(
            "struct '{}' occupies {cursor} bytes but is declared with {end}",
            ty.struct_name()
        );
    }
    StructLayout {
        items,
        size: cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScalarKind;

    fn params() -> Type {
        Type::structure(
            "params",
            Some("params".into()),
            vec![
                Type::matrix("mvp", 4, 4),
                Type::vector("tint", ScalarKind::Float, 3).at(64),
                Type::scalar("scale", ScalarKind::Float).at(80),
            ],
            84,
        )
    }

    #[test]
    fn uniform_block_tail_is_padded() {
        let block = params();
        let layout = emit_layout(&block, UNIFORM_BLOCK_PADDING);
        let names: Vec<_> = layout.items.iter().map(LayoutItem::name).collect();
        assert_eq!(names, ["mvp", "tint", "_pad_76", "scale", "_pad_84"]);
        assert_eq!(layout.size, 96);
        assert_eq!(layout.padding_bytes(), 16);
    }

    #[test]
    fn members_are_walked_in_offset_order() {
        let block = Type::structure(
            "b",
            None,
            vec![
                Type::scalar("second", ScalarKind::Int).at(16),
                Type::scalar("first", ScalarKind::Int),
            ],
            20,
        );
        let layout = emit_layout(&block, PadTo::Size(20));
        let names: Vec<_> = layout.items.iter().map(LayoutItem::name).collect();
        assert_eq!(names, ["first", "_pad_4", "second"]);
        assert_eq!(layout.size, 20);
    }

    #[test]
    fn nested_structs_pad_to_their_own_size() {
        let light = Type::structure(
            "light",
            Some("Light".into()),
            vec![Type::vector("color", ScalarKind::Float, 3)],
            16,
        )
        .with_array(2, 16);
        let block = Type::structure("lights", None, vec![light], 32);
        let layout = emit_layout(&block, UNIFORM_BLOCK_PADDING);
        assert_eq!(layout.size, 32);
        let LayoutItem::Member {
            nested: Some(nested),
            ..
        } = &layout.items[0]
        else {
            panic!("expected a nested struct layout");
        };
        assert_eq!(nested.size, 16);
        assert_eq!(nested.items[1], LayoutItem::Padding { offset: 12, size: 4 });
    }

    #[test]
    fn storage_buffer_pads_to_declared_size() {
        let particle = Type::structure(
            "prt",
            Some("particle".into()),
            vec![
                Type::vector("pos", ScalarKind::Float, 4),
                Type::vector("vel", ScalarKind::Float, 2).at(16),
            ],
            32,
        )
        .with_array(0, 32);
        let buffer = Type::structure("ssbo", Some("ssbo".into()), vec![particle], 32);
        let layout = emit_layout(&buffer, PadTo::Size(buffer.size));
        assert_eq!(layout.items.len(), 1);
        assert_eq!(layout.size, 32);
    }
}
