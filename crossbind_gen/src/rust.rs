// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rust declarations matching the padded buffer layouts.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt::{self, Write};

use crossbind::{
    ArrayInfo, Contract, LayoutItem, Output, ProgramReflection, ScalarKind, Shape, StructLayout,
    Type,
};

use crate::Writer;

pub(crate) fn write(w: &mut Writer, output: &Output) -> fmt::Result {
    // Slots and layouts are the same in every language, so any contract will do.
    let Some(contract) = output.contracts().next() else {
        return Ok(());
    };
    writeln!(w, "// Generated by crossbind from {}. Do not edit.", output.path)?;
    writeln!(w, "#![allow(dead_code)]")?;
    write_structs(w, contract)?;
    for program in &contract.programs {
        writeln!(w)?;
        write_slots(w, program)?;
    }
    Ok(())
}

fn write_structs(w: &mut Writer, contract: &Contract) -> fmt::Result {
    let mut emitted = HashSet::new();
    for ub in &contract.bindings.uniform_blocks {
        let name = pascal_case(&ub.name);
        write_struct(w, &mut emitted, &name, Some(ub.struct_info.align), &ub.layout())?;
    }
    for sbuf in &contract.bindings.storage_buffers {
        let layout = sbuf.layout();
        // A buffer made of a single struct array is declared by its element.
        match element_layout(&layout) {
            Some((element, nested)) => {
                let name = pascal_case(element.struct_name());
                write_struct(w, &mut emitted, &name, Some(element.align), nested)?;
            }
            None => {
                let name = pascal_case(&sbuf.name);
                write_struct(w, &mut emitted, &name, Some(sbuf.struct_info.align), &layout)?;
            }
        }
    }
    Ok(())
}

fn element_layout<'a>(layout: &'a StructLayout<'a>) -> Option<(&'a Type, &'a StructLayout<'a>)> {
    let mut members = layout.items.iter().filter_map(|item| match item {
        LayoutItem::Member { ty, nested } => Some((*ty, nested.as_ref())),
        LayoutItem::Padding { .. } => None,
    });
    let (element, nested) = members.next()?;
    if members.next().is_some() {
        return None;
    }
    Some((element, nested?))
}

/// Declares a struct, hoisting nested struct members into their own structs first.
///
/// Hoisted structs are named after their parent and member, and carry no
/// alignment of their own. Names already in `emitted` are skipped.
fn write_struct(
    w: &mut Writer,
    emitted: &mut HashSet<String>,
    name: &str,
    align: Option<u32>,
    layout: &StructLayout<'_>,
) -> fmt::Result {
    if !emitted.insert(name.to_owned()) {
        return Ok(());
    }
    for item in &layout.items {
        if let LayoutItem::Member {
            ty,
            nested: Some(nested),
        } = item
        {
            let nested_name = format!("{name}{}", pascal_case(&ty.name));
            write_struct(w, emitted, &nested_name, None, nested)?;
        }
    }

    writeln!(w)?;
    match align {
        Some(align) => writeln!(w, "#[repr(C, align({align}))]")?,
        None => writeln!(w, "#[repr(C)]")?,
    }
    writeln!(w, "#[derive(Clone, Copy, Debug)]")?;
    w.open(format_args!("pub struct {name} {{"))?;
    for item in &layout.items {
        match item {
            LayoutItem::Member { ty, .. } => {
                let nested_name = format!("{name}{}", pascal_case(&ty.name));
                writeln!(w, "pub {}: {},", ident(&ty.name), rust_type(ty, &nested_name))?;
            }
            LayoutItem::Padding { offset, size } => {
                writeln!(w, "pub _pad_{offset}: [u8; {size}],")?;
            }
        }
    }
    w.close(format_args!("}}"))?;
    writeln!(
        w,
        "const _: () = assert!(std::mem::size_of::<{name}>() == {});",
        layout.size
    )
}

/// The Rust type of a member, `nested_name` naming the hoisted struct of a struct member.
fn rust_type(ty: &Type, nested_name: &str) -> String {
    let element = match &ty.shape {
        Shape::Vector { kind, arity: 1 } => scalar_type(*kind).to_owned(),
        Shape::Vector { kind, arity } => format!("[{}; {arity}]", scalar_type(*kind)),
        Shape::Matrix { columns, .. } => format!("[[f32; {}]; {columns}]", ty.matrix_stride / 4),
        Shape::Struct { .. } => nested_name.to_owned(),
    };
    let Some(ArrayInfo { count, stride }) = ty.array else {
        return element;
    };
    // Array elements take up their whole stride, e.g. a std140 float array element is a vec4.
    let element = match &ty.shape {
        Shape::Vector { kind, .. } if stride > ty.size => {
            format!("[{}; {}]", scalar_type(*kind), stride / 4)
        }
        _ => element,
    };
    if count == 0 {
        element
    } else {
        format!("[{element}; {count}]")
    }
}

fn scalar_type(kind: ScalarKind) -> &'static str {
    match kind {
        // Bools are 32 bits wide in buffers.
        ScalarKind::Bool | ScalarKind::Int => "i32",
        ScalarKind::UInt => "u32",
        ScalarKind::Float => "f32",
    }
}

/// Bind slot constants of one program, in a module named after it.
fn write_slots(w: &mut Writer, program: &ProgramReflection) -> fmt::Result {
    let module = program.name.to_lowercase();
    w.open(format_args!("pub mod {} {{", ident(&module)))?;
    if let Some(vs) = program.vs() {
        for attr in vs.inputs() {
            write_const(w, "ATTR", &attr.name, Some(attr.slot))?;
        }
    }
    let bindings = &program.bindings;
    for ub in &bindings.uniform_blocks {
        write_const(w, "UB", &ub.name, ub.canonical_slot)?;
    }
    for sbuf in &bindings.storage_buffers {
        write_const(w, "SBUF", &sbuf.name, sbuf.canonical_slot)?;
    }
    for tex in &bindings.textures {
        write_const(w, "TEX", &tex.name, tex.canonical_slot)?;
    }
    for smp in &bindings.samplers {
        write_const(w, "SMP", &smp.name, smp.canonical_slot)?;
    }
    for simg in &bindings.storage_images {
        write_const(w, "SIMG", &simg.name, simg.canonical_slot)?;
    }
    w.close(format_args!("}}"))
}

fn write_const(w: &mut Writer, prefix: &str, name: &str, slot: Option<u32>) -> fmt::Result {
    match slot {
        Some(slot) => writeln!(
            w,
            "pub const {prefix}_{}: usize = {slot};",
            name.to_uppercase()
        ),
        None => Ok(()),
    }
}

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// `name` as a Rust identifier, raw if it is a keyword.
fn ident(name: &str) -> Cow<'_, str> {
    match name {
        // These can't be raw identifiers.
        "crate" | "self" | "Self" | "super" => Cow::Owned(format!("{name}_")),
        _ if KEYWORDS.contains(&name) => Cow::Owned(format!("r#{name}")),
        _ => Cow::Borrowed(name),
    }
}

fn pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .map(|first| first.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .collect()
}
