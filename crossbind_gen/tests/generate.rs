// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generators running on contracts built from canned shader interfaces.

use std::collections::HashMap;

use crossbind::{
    build, BaseKind, BufferVar, BuildOptions, Code, CombinedImageSampler, CompiledStage,
    Diagnostic, ImageDim, ImageVar, Input, InterfaceVar, MemberDesc, Output, Program, SamplerVar,
    ShaderInterface, ShaderStage, Slang, Slangs, Snippet, TypeDesc, TypeHandle,
};
use crossbind_gen::{Error, Generator};

fn vec4(interface: &mut ShaderInterface) -> TypeHandle {
    interface.add_type(TypeDesc {
        vecsize: 4,
        ..TypeDesc::scalar(BaseKind::Float, 16)
    })
}

fn vertex_interface() -> ShaderInterface {
    let mut vs = ShaderInterface::new(ShaderStage::Vertex, "main");
    for (location, name) in [(0, "position"), (1, "color0")] {
        let ty = vec4(&mut vs);
        vs.inputs.push(InterfaceVar {
            name: name.into(),
            location,
            ty,
        });
    }
    let ty = vec4(&mut vs);
    vs.outputs.push(InterfaceVar {
        name: "color".into(),
        location: 0,
        ty,
    });
    let mvp = vs.add_type(TypeDesc {
        vecsize: 4,
        columns: 4,
        matrix_stride: 16,
        ..TypeDesc::scalar(BaseKind::Float, 64)
    });
    let block = vs.add_type(TypeDesc {
        name: Some("vs_params".into()),
        members: vec![MemberDesc {
            name: "mvp".into(),
            ty: mvp,
            offset: 0,
        }],
        ..TypeDesc::scalar(BaseKind::Struct, 64)
    });
    vs.uniform_buffers.push(BufferVar {
        name: "vs_params".into(),
        inst_name: None,
        binding: Some(0),
        ty: block,
        readonly: true,
    });
    vs
}

fn fragment_interface() -> ShaderInterface {
    let mut fs = ShaderInterface::new(ShaderStage::Fragment, "main");
    let ty = vec4(&mut fs);
    fs.inputs.push(InterfaceVar {
        name: "color".into(),
        location: 0,
        ty,
    });
    let tint = vec4(&mut fs);
    let scale = fs.add_type(TypeDesc::scalar(BaseKind::Float, 4));
    let block = fs.add_type(TypeDesc {
        name: Some("fs_params".into()),
        members: vec![
            MemberDesc {
                name: "tint".into(),
                ty: tint,
                offset: 0,
            },
            MemberDesc {
                name: "scale".into(),
                ty: scale,
                offset: 16,
            },
        ],
        ..TypeDesc::scalar(BaseKind::Struct, 20)
    });
    fs.uniform_buffers.push(BufferVar {
        name: "fs_params".into(),
        inst_name: Some("params".into()),
        binding: Some(0),
        ty: block,
        readonly: true,
    });
    fs.images.push(ImageVar {
        name: "tex".into(),
        binding: Some(0),
        dim: ImageDim::D2,
        arrayed: false,
        multisampled: false,
        sampled_kind: BaseKind::Float,
        is_depth: false,
    });
    fs.samplers.push(SamplerVar {
        name: "smp".into(),
        binding: Some(0),
        is_comparison: false,
    });
    fs.combined_image_samplers.push(CombinedImageSampler {
        name: "tex_smp".into(),
        binding: None,
        image: "tex".into(),
        sampler: "smp".into(),
    });
    fs
}

/// A compute stage updating a runtime-sized array of particles.
fn compute_interface() -> ShaderInterface {
    let mut cs = ShaderInterface::new(ShaderStage::Compute, "main");
    cs.workgroup_size = [64, 1, 1];
    let pos = vec4(&mut cs);
    let vel = cs.add_type(TypeDesc {
        vecsize: 2,
        ..TypeDesc::scalar(BaseKind::Float, 8)
    });
    let particles = cs.add_type(TypeDesc {
        name: Some("particle".into()),
        members: vec![
            MemberDesc {
                name: "pos".into(),
                ty: pos,
                offset: 0,
            },
            MemberDesc {
                name: "vel".into(),
                ty: vel,
                offset: 16,
            },
        ],
        array: vec![0],
        array_stride: 32,
        ..TypeDesc::scalar(BaseKind::Struct, 32)
    });
    let buffer = cs.add_type(TypeDesc {
        name: Some("particles_buf".into()),
        members: vec![MemberDesc {
            name: "items".into(),
            ty: particles,
            offset: 0,
        }],
        ..TypeDesc::scalar(BaseKind::Struct, 0)
    });
    cs.storage_buffers.push(BufferVar {
        name: "particles_buf".into(),
        inst_name: Some("buf".into()),
        binding: Some(0),
        ty: buffer,
        readonly: false,
    });
    cs
}

fn build_particles(slangs: Slangs, failing: Option<Slang>, reflection: bool) -> Output {
    let input = Input {
        path: "particles.glsl".into(),
        snippets: vec![
            Snippet::new("vs", ShaderStage::Vertex, ""),
            Snippet::new("fs", ShaderStage::Fragment, ""),
            Snippet::new("cs", ShaderStage::Compute, ""),
        ],
        programs: vec![
            Program::render("triangle", "vs", "fs"),
            Program::compute("simulate", "cs"),
        ],
    };
    let interfaces = HashMap::from([
        ("vs", vertex_interface()),
        ("fs", fragment_interface()),
        ("cs", compute_interface()),
    ]);
    let mut compiler = |snippet: &Snippet, slang: Slang| {
        if failing == Some(slang) {
            return Err(vec![Diagnostic::error("particles.glsl", 3, "no such function")]);
        }
        Ok(CompiledStage {
            code: Code::Source(String::new()),
            entry_point: None,
            interface: interfaces[snippet.name.as_str()].clone(),
            diagnostics: Vec::new(),
        })
    };
    let options = BuildOptions::new(slangs).with_reflection(reflection);
    build(&input, &options, &mut compiler)
}

fn all_conventions() -> Slangs {
    [Slang::Glsl430, Slang::Hlsl5, Slang::MetalMacos, Slang::Wgsl]
        .into_iter()
        .collect()
}

#[test]
fn rust_declarations() {
    let output = build_particles(all_conventions(), None, false);
    let code = Generator::Rust.generate(&output).unwrap();

    assert!(code.starts_with(
        "// Generated by crossbind from particles.glsl. Do not edit.\n#![allow(dead_code)]\n"
    ));
    let fs_params = "
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug)]
pub struct FsParams {
    pub tint: [f32; 4],
    pub scale: f32,
    pub _pad_20: [u8; 12],
}
const _: () = assert!(std::mem::size_of::<FsParams>() == 32);
";
    assert!(code.contains(fs_params), "{code}");
    assert!(code.contains("pub struct VsParams {\n    pub mvp: [[f32; 4]; 4],\n}\n"));

    let particle = "
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug)]
pub struct Particle {
    pub pos: [f32; 4],
    pub vel: [f32; 2],
    pub _pad_24: [u8; 8],
}
";
    assert!(code.contains(particle), "{code}");
    assert!(!code.contains("pub struct ParticlesBuf"));

    let triangle = "
pub mod triangle {
    pub const ATTR_POSITION: usize = 0;
    pub const ATTR_COLOR0: usize = 1;
    pub const UB_VS_PARAMS: usize = 0;
    pub const UB_FS_PARAMS: usize = 1;
    pub const TEX_TEX: usize = 0;
    pub const SMP_SMP: usize = 0;
}
";
    assert!(code.contains(triangle), "{code}");
    assert!(code.contains("pub mod simulate {\n    pub const SBUF_PARTICLES_BUF: usize = 0;\n}\n"));
}

#[test]
fn yaml_reflection() {
    let output = build_particles(all_conventions(), None, false);
    let yaml = Generator::Yaml.generate(&output).unwrap();

    let prefix = "\
shaders:
  -
    slang: glsl430
    programs:
      -
        name: triangle
        vertex_func:
          snippet: vs
          is_binary: false
          entry_point: main
";
    assert!(yaml.starts_with(prefix), "{yaml}");
    for slang in ["glsl430", "hlsl5", "metal_macos", "wgsl"] {
        assert!(yaml.contains(&format!("    slang: {slang}\n")));
    }
    // GL sees both float blocks as vec4 arrays.
    assert!(yaml.contains("type: vec4\n                array_count: 2\n"));
    assert!(yaml.contains("d3d11_target: ps_5_0"));
    assert!(yaml.contains("hlsl_sem_name: TEXCOORD"));
    assert!(yaml.contains("entry_point: main0"));
    assert!(yaml.contains("mtl_threads_per_threadgroup:\n          x: 64\n"));
    assert!(yaml.contains("wgsl_group0_binding_n: 8"));
    assert!(yaml.contains("wgsl_group1_binding_n: 65"));
    assert!(yaml.contains("hlsl_register_u_n: 0"));
    assert!(yaml.contains("inner_struct_name: particle"));
    assert!(yaml.contains("texture_slot: 0\n            sampler_slot: 0\n"));
    assert!(yaml.contains("glsl_name: tex_smp\n            glsl_binding_n: 16\n"));
    assert!(!yaml.contains("members:"));
}

#[test]
fn yaml_members_on_request() {
    let output = build_particles([Slang::Wgsl].into_iter().collect(), None, true);
    let yaml = Generator::Yaml.generate(&output).unwrap();
    assert!(yaml.contains("members:\n"));
    assert!(yaml.contains("name: mvp\n"));
    assert!(yaml.contains("type: mat4\n"));
}

#[test]
fn generation_is_deterministic() {
    for generator in Generator::ALL {
        let a = generator.generate(&build_particles(all_conventions(), None, true));
        let b = generator.generate(&build_particles(all_conventions(), None, true));
        assert_eq!(a.unwrap(), b.unwrap());
    }
}

#[test]
fn failed_language_is_reported() {
    let output = build_particles(all_conventions(), Some(Slang::Wgsl), false);
    assert!(output.contract(Slang::Hlsl5).is_some());
    match Generator::Rust.generate(&output) {
        Err(Error::Backend { path, slang, .. }) => {
            assert_eq!(path, "particles.glsl");
            assert_eq!(slang, Slang::Wgsl);
        }
        other => panic!("expected a backend error, got {other:?}"),
    }
}
