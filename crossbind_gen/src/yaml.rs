// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reflection dump in YAML.

use std::fmt::{self, Write};

use crossbind::{
    Bindings, Contract, Convention, NativeSlots, Output, ProgramReflection, ShaderStage,
    Slang, StageAttr, StorageBuffer, UniformBlock,
};

use crate::Writer;

pub(crate) fn write(w: &mut Writer, output: &Output) -> fmt::Result {
    w.open(format_args!("shaders:"))?;
    for contract in output.contracts() {
        write_contract(w, contract, output.reflection)?;
    }
    w.dedent();
    Ok(())
}

fn write_contract(w: &mut Writer, contract: &Contract, reflection: bool) -> fmt::Result {
    let slang = contract.slang;
    w.open(format_args!("-"))?;
    writeln!(w, "slang: {slang}")?;
    w.open(format_args!("programs:"))?;
    for program in &contract.programs {
        w.open(format_args!("-"))?;
        writeln!(w, "name: {}", program.name)?;
        write_stages(w, program, slang)?;
        write_attrs(w, program, slang)?;
        write_bindings(w, &program.bindings, slang, reflection)?;
        w.dedent();
    }
    w.dedent();
    w.dedent();
    Ok(())
}

fn write_stages(w: &mut Writer, program: &ProgramReflection, slang: Slang) -> fmt::Result {
    for stage in program.iter_stages() {
        w.open(format_args!("{}_func:", stage.stage))?;
        writeln!(w, "snippet: {}", stage.snippet)?;
        writeln!(w, "is_binary: {}", slang.has_bytecode())?;
        writeln!(w, "entry_point: {}", stage.entry_point)?;
        if let Some(target) = d3d11_target(slang, stage.stage) {
            writeln!(w, "d3d11_target: {target}")?;
        }
        w.dedent();
    }
    if let Some(cs) = program.cs().filter(|_| slang.is_msl()) {
        let [x, y, z] = cs.workgroup_size;
        w.open(format_args!("mtl_threads_per_threadgroup:"))?;
        writeln!(w, "x: {x}")?;
        writeln!(w, "y: {y}")?;
        writeln!(w, "z: {z}")?;
        w.dedent();
    }
    Ok(())
}

fn d3d11_target(slang: Slang, stage: ShaderStage) -> Option<&'static str> {
    let target = match (slang, stage) {
        (Slang::Hlsl4, ShaderStage::Vertex) => "vs_4_0",
        (Slang::Hlsl4, ShaderStage::Fragment) => "ps_4_0",
        (Slang::Hlsl4, ShaderStage::Compute) => "cs_4_0",
        (Slang::Hlsl5, ShaderStage::Vertex) => "vs_5_0",
        (Slang::Hlsl5, ShaderStage::Fragment) => "ps_5_0",
        (Slang::Hlsl5, ShaderStage::Compute) => "cs_5_0",
        _ => return None,
    };
    Some(target)
}

fn write_attrs(w: &mut Writer, program: &ProgramReflection, slang: Slang) -> fmt::Result {
    let Some(vs) = program.vs() else {
        return Ok(());
    };
    let mut attrs = vs.inputs().peekable();
    if attrs.peek().is_none() {
        return Ok(());
    }
    w.open(format_args!("attrs:"))?;
    for attr in attrs {
        write_attr(w, attr, slang)?;
    }
    w.dedent();
    Ok(())
}

fn write_attr(w: &mut Writer, attr: &StageAttr, slang: Slang) -> fmt::Result {
    w.open(format_args!("-"))?;
    writeln!(w, "slot: {}", attr.slot)?;
    writeln!(w, "type: {}", attr.ty.glsl_name())?;
    if slang.is_glsl() {
        writeln!(w, "glsl_name: {}", attr.name)?;
    } else if slang.is_hlsl() {
        writeln!(w, "hlsl_sem_name: {}", attr.sem_name)?;
        writeln!(w, "hlsl_sem_index: {}", attr.sem_index)?;
    }
    w.dedent();
    Ok(())
}

fn write_bindings(
    w: &mut Writer,
    bindings: &Bindings,
    slang: Slang,
    reflection: bool,
) -> fmt::Result {
    if !bindings.uniform_blocks.is_empty() {
        w.open(format_args!("uniform_blocks:"))?;
        for ub in &bindings.uniform_blocks {
            write_uniform_block(w, ub, slang, reflection)?;
        }
        w.dedent();
    }
    if !bindings.storage_buffers.is_empty() {
        w.open(format_args!("storage_buffers:"))?;
        for sbuf in &bindings.storage_buffers {
            write_storage_buffer(w, sbuf, slang)?;
        }
        w.dedent();
    }
    if !bindings.textures.is_empty() {
        w.open(format_args!("textures:"))?;
        for tex in &bindings.textures {
            w.open(format_args!("-"))?;
            write_slot(w, tex.canonical_slot, tex.stage)?;
            writeln!(w, "name: {}", tex.name)?;
            writeln!(w, "multisampled: {}", tex.multisampled)?;
            writeln!(w, "type: {}", tex.image_type.as_str())?;
            writeln!(w, "sample_type: {}", tex.sample_type.as_str())?;
            write_native(w, &tex.native, slang.convention())?;
            w.dedent();
        }
        w.dedent();
    }
    if !bindings.samplers.is_empty() {
        w.open(format_args!("samplers:"))?;
        for smp in &bindings.samplers {
            w.open(format_args!("-"))?;
            write_slot(w, smp.canonical_slot, smp.stage)?;
            writeln!(w, "name: {}", smp.name)?;
            writeln!(w, "sampler_type: {}", smp.sampler_type.as_str())?;
            write_native(w, &smp.native, slang.convention())?;
            w.dedent();
        }
        w.dedent();
    }
    if !bindings.storage_images.is_empty() {
        w.open(format_args!("storage_images:"))?;
        for simg in &bindings.storage_images {
            w.open(format_args!("-"))?;
            write_slot(w, simg.canonical_slot, simg.stage)?;
            writeln!(w, "name: {}", simg.name)?;
            writeln!(w, "type: {}", simg.image_type.as_str())?;
            writeln!(w, "access_format: {}", simg.format.as_str())?;
            write_native(w, &simg.native, slang.convention())?;
            w.dedent();
        }
        w.dedent();
    }
    if !bindings.texture_samplers.is_empty() {
        w.open(format_args!("texture_sampler_pairs:"))?;
        for pair in &bindings.texture_samplers {
            w.open(format_args!("-"))?;
            write_slot(w, pair.canonical_slot, pair.stage)?;
            writeln!(w, "name: {}", pair.name)?;
            writeln!(w, "texture_name: {}", pair.texture_name)?;
            writeln!(w, "sampler_name: {}", pair.sampler_name)?;
            if let Some((texture, sampler)) = bindings.texture_sampler_slots(pair) {
                writeln!(w, "texture_slot: {texture}")?;
                writeln!(w, "sampler_slot: {sampler}")?;
            }
            if slang.is_glsl() {
                writeln!(w, "glsl_name: {}", pair.name)?;
                write_native(w, &pair.native, Convention::Glsl)?;
            }
            w.dedent();
        }
        w.dedent();
    }
    Ok(())
}

fn write_slot(w: &mut Writer, slot: Option<u32>, stage: ShaderStage) -> fmt::Result {
    if let Some(slot) = slot {
        writeln!(w, "slot: {slot}")?;
    }
    writeln!(w, "stage: {stage}")
}

fn write_uniform_block(
    w: &mut Writer,
    ub: &UniformBlock,
    slang: Slang,
    reflection: bool,
) -> fmt::Result {
    let size = ub.layout().size;
    w.open(format_args!("-"))?;
    write_slot(w, ub.canonical_slot, ub.stage)?;
    writeln!(w, "size: {size}")?;
    writeln!(w, "struct_name: {}", ub.name)?;
    writeln!(w, "inst_name: {}", ub.inst_name)?;
    if slang.is_glsl() {
        w.open(format_args!("glsl_uniforms:"))?;
        if let Some(flat) = ub.flattened_uniform() {
            w.open(format_args!("-"))?;
            writeln!(w, "type: {}", flat.glsl_name())?;
            writeln!(w, "array_count: {}", flat.array_count)?;
            writeln!(w, "offset: 0")?;
            writeln!(w, "glsl_name: {}", flat.name)?;
            w.dedent();
        } else {
            for member in ub.struct_info.members() {
                w.open(format_args!("-"))?;
                writeln!(w, "type: {}", member.glsl_name())?;
                writeln!(w, "array_count: {}", member.array.map_or(0, |a| a.count))?;
                writeln!(w, "offset: {}", member.offset)?;
                writeln!(w, "glsl_name: {}.{}", ub.inst_name, member.name)?;
                w.dedent();
            }
        }
        w.dedent();
    } else {
        write_native(w, &ub.native, slang.convention())?;
    }
    if reflection {
        w.open(format_args!("members:"))?;
        for member in ub.struct_info.members() {
            w.open(format_args!("-"))?;
            writeln!(w, "name: {}", member.name)?;
            writeln!(w, "type: {}", member.glsl_name())?;
            writeln!(w, "array_count: {}", member.array.map_or(0, |a| a.count))?;
            writeln!(w, "offset: {}", member.offset)?;
            w.dedent();
        }
        w.dedent();
    }
    w.dedent();
    Ok(())
}

fn write_storage_buffer(w: &mut Writer, sbuf: &StorageBuffer, slang: Slang) -> fmt::Result {
    w.open(format_args!("-"))?;
    write_slot(w, sbuf.canonical_slot, sbuf.stage)?;
    writeln!(w, "size: {}", sbuf.struct_info.size)?;
    writeln!(w, "align: {}", sbuf.struct_info.align)?;
    writeln!(w, "struct_name: {}", sbuf.name)?;
    writeln!(w, "inst_name: {}", sbuf.inst_name)?;
    if let [item] = sbuf.struct_info.members() {
        if item.is_struct() {
            writeln!(w, "inner_struct_name: {}", item.struct_name())?;
        }
    }
    writeln!(w, "readonly: {}", sbuf.readonly)?;
    write_native(w, &sbuf.native, slang.convention())?;
    w.dedent();
    Ok(())
}

/// Writes the slots `convention` binds the resource at.
fn write_native(w: &mut Writer, native: &NativeSlots, convention: Convention) -> fmt::Result {
    let fields = match convention {
        Convention::Hlsl => vec![
            ("hlsl_register_b_n", native.hlsl_register_b),
            ("hlsl_register_t_n", native.hlsl_register_t),
            ("hlsl_register_u_n", native.hlsl_register_u),
            ("hlsl_register_s_n", native.hlsl_register_s),
        ],
        Convention::Msl => vec![
            ("msl_buffer_n", native.msl_buffer),
            ("msl_texture_n", native.msl_texture),
            ("msl_sampler_n", native.msl_sampler),
        ],
        Convention::Wgsl => vec![
            ("wgsl_group0_binding_n", native.wgsl_group0_binding),
            ("wgsl_group1_binding_n", native.wgsl_group1_binding),
        ],
        Convention::Glsl => vec![("glsl_binding_n", native.glsl_binding)],
    };
    for (key, value) in fields {
        if let Some(value) = value {
            writeln!(w, "{key}: {value}")?;
        }
    }
    Ok(())
}
