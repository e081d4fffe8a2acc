// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The boundary to the external shader compiler.
//!
//! A [`ShaderCompiler`] turns one [`Snippet`] into code for one [`Slang`] and
//! describes the shader's interface as a [`ShaderInterface`]. Types are stored
//! in an arena and referenced by [`TypeHandle`]. Once the slots of a program
//! are allocated, [`ShaderCompiler::bind`] may rewrite the code of each of its
//! stages to use them.

use std::fmt;

use crate::{Bindings, ShaderStage, Slang, Snippet, StoragePixelFormat};

/// Compiles snippets and reflects their interfaces.
pub trait ShaderCompiler {
    /// Compiles `snippet` for `slang`.
    ///
    /// Errors are reported as diagnostics; an `Err` must contain at least one
    /// diagnostic with [`Severity::Error`].
    fn compile(&mut self, snippet: &Snippet, slang: Slang)
        -> Result<CompiledStage, Vec<Diagnostic>>;

    /// Emits the code of `snippet` with its resources at the native slots of
    /// `bindings`, the allocated table of a program using the snippet.
    ///
    /// `Ok(None)` keeps the code returned by [`compile`](Self::compile).
    fn bind(
        &mut self,
        snippet: &Snippet,
        slang: Slang,
        bindings: &Bindings,
    ) -> Result<Option<Code>, Vec<Diagnostic>> {
        let _ = (snippet, slang, bindings);
        Ok(None)
    }
}

impl<F> ShaderCompiler for F
where
    F: FnMut(&Snippet, Slang) -> Result<CompiledStage, Vec<Diagnostic>>,
{
    fn compile(
        &mut self,
        snippet: &Snippet,
        slang: Slang,
    ) -> Result<CompiledStage, Vec<Diagnostic>> {
        self(snippet, slang)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Code {
    Source(String),
    Bytecode(Vec<u8>),
}

#[derive(Clone, Debug)]
pub struct CompiledStage {
    pub code: Code,
    /// Entry point name in `code`, if the compiler doesn't follow
    /// [`Slang::entry_point`].
    pub entry_point: Option<String>,
    pub interface: ShaderInterface,
    /// Warnings produced while compiling.
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Severity {
    Error,
    Warning,
}

/// A compiler message tied to a line of the input file.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Diagnostic {
    pub severity: Severity,
    pub file: String,
    pub line: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn error(file: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn warning(file: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{}:{}: {severity}: {}",
            self.file, self.line, self.message
        )
    }
}

/// Index of a [`TypeDesc`] in [`ShaderInterface::types`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeHandle(pub usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BaseKind {
    Bool,
    Int,
    UInt,
    Float,
    Half,
    Struct,
    Image,
    Sampler,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberDesc {
    pub name: String,
    pub ty: TypeHandle,
    pub offset: u32,
}

/// A type as the compiler reports it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDesc {
    pub name: Option<String>,
    pub kind: BaseKind,
    /// Components per vector, or rows per matrix column.
    pub vecsize: u8,
    /// Matrix columns, 1 for scalars and vectors.
    pub columns: u8,
    /// Array dimensions, outermost first. A zero is a runtime-sized dimension.
    pub array: Vec<u32>,
    pub array_stride: u32,
    pub matrix_stride: u32,
    /// Byte size of a single element.
    pub size: u32,
    pub members: Vec<MemberDesc>,
}

impl TypeDesc {
    pub fn scalar(kind: BaseKind, size: u32) -> Self {
        Self {
            name: None,
            kind,
            vecsize: 1,
            columns: 1,
            array: Vec::new(),
            array_stride: 0,
            matrix_stride: 0,
            size,
            members: Vec::new(),
        }
    }
}

/// A stage input or output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceVar {
    pub name: String,
    pub location: u32,
    pub ty: TypeHandle,
}

/// A uniform block or storage buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferVar {
    /// The block's type name.
    pub name: String,
    pub inst_name: Option<String>,
    pub binding: Option<u32>,
    pub ty: TypeHandle,
    /// Storage buffers only: whether the shader never writes to it.
    pub readonly: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ImageDim {
    D1,
    D2,
    D3,
    Cube,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageVar {
    pub name: String,
    pub binding: Option<u32>,
    pub dim: ImageDim,
    pub arrayed: bool,
    pub multisampled: bool,
    /// Component kind returned by sampling.
    pub sampled_kind: BaseKind,
    pub is_depth: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplerVar {
    pub name: String,
    pub binding: Option<u32>,
    pub is_comparison: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageImageVar {
    pub name: String,
    pub binding: Option<u32>,
    pub dim: ImageDim,
    pub arrayed: bool,
    pub format: Option<StoragePixelFormat>,
}

/// A texture and sampler the shader samples together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CombinedImageSampler {
    pub name: String,
    pub binding: Option<u32>,
    pub image: String,
    pub sampler: String,
}

/// Everything the compiler reports about one compiled stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderInterface {
    pub stage: ShaderStage,
    pub entry_point: String,
    pub workgroup_size: [u32; 3],
    pub inputs: Vec<InterfaceVar>,
    pub outputs: Vec<InterfaceVar>,
    pub uniform_buffers: Vec<BufferVar>,
    pub storage_buffers: Vec<BufferVar>,
    pub images: Vec<ImageVar>,
    pub samplers: Vec<SamplerVar>,
    pub storage_images: Vec<StorageImageVar>,
    pub combined_image_samplers: Vec<CombinedImageSampler>,
    pub types: Vec<TypeDesc>,
}

impl ShaderInterface {
    pub fn new(stage: ShaderStage, entry_point: impl Into<String>) -> Self {
        Self {
            stage,
            entry_point: entry_point.into(),
            workgroup_size: [0; 3],
            inputs: Vec::new(),
            outputs: Vec::new(),
            uniform_buffers: Vec::new(),
            storage_buffers: Vec::new(),
            images: Vec::new(),
            samplers: Vec::new(),
            storage_images: Vec::new(),
            combined_image_samplers: Vec::new(),
            types: Vec::new(),
        }
    }

    pub fn add_type(&mut self, desc: TypeDesc) -> TypeHandle {
        self.types.push(desc);
        TypeHandle(self.types.len() - 1)
    }

    pub fn type_desc(&self, handle: TypeHandle) -> Option<&TypeDesc> {
        self.types.get(handle.0)
    }
}
