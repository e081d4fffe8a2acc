// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Crossbind computes the host-side binding contract of cross-compiled shaders.
//!
//! A shader build tool hands Crossbind a set of GLSL snippets grouped into
//! programs, together with a [`ShaderCompiler`] that compiles each snippet and
//! reflects its interface. For each target shading language Crossbind then:
//!
//! - converts each stage's interface into a [`StageReflection`],
//! - merges the resources of a program's stages and assigns canonical slots,
//! - allocates the native binding numbers of each [`Convention`],
//! - checks that vertex outputs match fragment inputs,
//! - and collects everything into a [`Contract`] that code generators turn
//!   into host-side declarations.
//!
//! Uniform block and storage buffer types are described by the layout model
//! in [`Type`], which [`emit_layout`] turns into gap free padded members.
//!
//! Enable the `naga` feature to reflect GLSL with [`compile::NagaCompiler`].

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
// Feel free to send a PR that solves one or more of these.
#![allow(missing_docs, reason = "We have many as-yet undocumented items.")]
#![allow(
    clippy::cast_possible_truncation,
    clippy::missing_assert_message,
    reason = "Deferred, only apply in some feature sets so not expect"
)]

mod bindings;
mod contract;
mod error;
mod flatten;
mod input;
mod interface;
mod layout;
mod linkage;
mod merge;
mod reflection;
mod resource;
mod slang;
mod slots;
mod stage;
mod types;

#[cfg(feature = "naga")]
pub mod compile;

pub use bindings::{
    Bindings, MAX_SAMPLERS, MAX_STORAGE_BUFFERS, MAX_STORAGE_IMAGES, MAX_TEXTURES,
    MAX_TEXTURE_SAMPLERS, MAX_UNIFORM_BLOCKS,
};
pub use contract::{build, build_backend, BuildOptions, Contract, Output, StageSource};
pub use error::Error;
pub use flatten::{can_flatten, FlattenedUniform, TypeFamily};
pub use input::{Input, Program, Snippet};
pub use interface::{
    BaseKind, BufferVar, Code, CombinedImageSampler, CompiledStage, Diagnostic, ImageDim,
    ImageVar, InterfaceVar, MemberDesc, SamplerVar, Severity, ShaderCompiler, ShaderInterface,
    StorageImageVar, TypeDesc, TypeHandle,
};
pub use layout::{emit_layout, LayoutItem, PadTo, StructLayout, UNIFORM_BLOCK_PADDING};
pub use linkage::validate_linkage;
pub use merge::{merge_bindings, merge_vertex_attrs, validate_program_bindings, VertexAttr};
pub use reflection::{
    ProgramReflection, StageAttr, StageAttrs, StageReflection, ATTR_SEMANTIC, MAX_ATTRS,
};
pub use resource::{
    Category, ImageSampleType, ImageType, NativeSlots, Resource, Sampler, SamplerType,
    StorageBuffer, StorageImage, StoragePixelFormat, Texture, TextureSampler, UniformBlock,
};
pub use slang::{Convention, Slang, Slangs};
pub use slots::{
    allocate_slots, BindSlot, GLSL_FS_TEXTURE_SAMPLER_BASE, HLSL_MAX_REGISTER_T,
    HLSL_MAX_REGISTER_U, MSL_MAX_BUFFERS, MSL_MAX_TEXTURES, WGSL_FS_GROUP0_BASE,
    WGSL_FS_GROUP1_BASE, WGSL_GROUP1_STAGE_RANGE,
};
pub use stage::ShaderStage;
pub use types::{roundup, shape_align, ArrayInfo, ScalarKind, Shape, Type};

// Only used by the integration tests.
#[cfg(test)]
use {proptest as _, serde_json as _};
