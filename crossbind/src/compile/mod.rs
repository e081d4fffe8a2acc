// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A [`ShaderCompiler`] built on naga's GLSL front end.
//!
//! Snippets are parsed as Vulkan-flavoured GLSL, validated, and reflected into
//! a [`ShaderInterface`]. With the `wgsl`, `msl` or `glsl` features enabled the
//! validated module is also written out in that language; other languages
//! produce empty source and a warning.
//!
//! [`ShaderCompiler::compile`] writes a snippet with the slots it would get as
//! the only stage of its kind in a program. [`ShaderCompiler::bind`] writes it
//! again with the slots of a real program.

use std::collections::HashMap;

use naga::{
    front::glsl,
    valid::{Capabilities, ModuleInfo, ValidationFlags, Validator},
    AddressSpace, Binding, Handle, ImageClass, Module, StorageAccess, TypeInner, UniqueArena,
};

use crate::interface::{
    BaseKind, BufferVar, CombinedImageSampler, ImageDim, ImageVar, InterfaceVar, MemberDesc,
    SamplerVar, StorageImageVar, TypeDesc, TypeHandle,
};
use crate::reflection::StageReflection;
use crate::{
    allocate_slots, merge_bindings, Bindings, Category, Code, CompiledStage, Diagnostic,
    ShaderCompiler, ShaderInterface, ShaderStage, Slang, Snippet, StoragePixelFormat,
};

mod backend;

/// Compiles snippets with naga.
#[derive(Clone, Debug, Default)]
pub struct NagaCompiler {
    /// Input file name reported in diagnostics.
    pub path: String,
}

impl NagaCompiler {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    fn diagnostic(&self, snippet: &Snippet, line: u32, message: impl Into<String>) -> Diagnostic {
        // Lines are 1-based both in the snippet and in the input file.
        let line = snippet.first_line.max(1) + line.saturating_sub(1);
        Diagnostic::error(&self.path, line, message)
    }

    /// Parses and validates a snippet.
    pub fn parse(&self, snippet: &Snippet) -> Result<(Module, ModuleInfo), Vec<Diagnostic>> {
        let options = glsl::Options::from(naga_stage(snippet.stage));
        let module = glsl::Frontend::default()
            .parse(&options, &snippet.source)
            .map_err(|errors| {
                errors
                    .errors
                    .iter()
                    .map(|error| {
                        let location = error.meta.location(&snippet.source);
                        self.diagnostic(snippet, location.line_number, error.kind.to_string())
                    })
                    .collect::<Vec<_>>()
            })?;
        let info = Validator::new(
            ValidationFlags::all() & !ValidationFlags::CONTROL_FLOW_UNIFORMITY,
            Capabilities::all(),
        )
        .validate(&module)
        .map_err(|error| {
            let line = error
                .spans()
                .next()
                .map(|(span, _)| span.location(&snippet.source).line_number)
                .unwrap_or(0);
            vec![self.diagnostic(snippet, line, error.as_inner().to_string())]
        })?;
        Ok((module, info))
    }
}

impl ShaderCompiler for NagaCompiler {
    fn compile(
        &mut self,
        snippet: &Snippet,
        slang: Slang,
    ) -> Result<CompiledStage, Vec<Diagnostic>> {
        let (module, info) = self.parse(snippet)?;
        let interface = reflect(&module, &info, snippet.stage)
            .map_err(|message| vec![self.diagnostic(snippet, 0, message)])?;
        let written = if backend::has_writer(slang) {
            let bindings = stage_bindings(&interface, snippet, slang)
                .map_err(|err| vec![self.diagnostic(snippet, 0, err.to_string())])?;
            backend::write_source(&module, &info, snippet.stage, slang, &bindings)
                .map_err(|message| vec![self.diagnostic(snippet, 0, message)])?
        } else {
            None
        };
        let mut diagnostics = Vec::new();
        let (code, entry_point) = match written {
            Some(written) => (Code::Source(written.source), written.entry_point),
            None => {
                diagnostics.push(Diagnostic::warning(
                    &self.path,
                    snippet.first_line,
                    format!("no {slang} output available for snippet '{}'", snippet.name),
                ));
                (Code::Source(String::new()), None)
            }
        };
        Ok(CompiledStage {
            code,
            entry_point,
            interface,
            diagnostics,
        })
    }

    fn bind(
        &mut self,
        snippet: &Snippet,
        slang: Slang,
        bindings: &Bindings,
    ) -> Result<Option<Code>, Vec<Diagnostic>> {
        if !backend::has_writer(slang) {
            return Ok(None);
        }
        let (module, info) = self.parse(snippet)?;
        match backend::write_source(&module, &info, snippet.stage, slang, bindings) {
            Ok(written) => Ok(written.map(|written| Code::Source(written.source))),
            Err(message) => Err(vec![self.diagnostic(snippet, 0, message)]),
        }
    }
}

/// The allocated table of a program whose only stage is `snippet`.
fn stage_bindings(
    interface: &ShaderInterface,
    snippet: &Snippet,
    slang: Slang,
) -> crate::error::Result<Bindings> {
    let stage = StageReflection::parse(interface, snippet, slang)?;
    let mut bindings = merge_bindings([&stage.bindings])?;
    allocate_slots(&mut bindings)?;
    Ok(bindings)
}

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
        ShaderStage::Compute => naga::ShaderStage::Compute,
    }
}

/// Describes the interface of the `stage` entry point in `module`.
pub fn reflect(
    module: &Module,
    info: &ModuleInfo,
    stage: ShaderStage,
) -> Result<ShaderInterface, String> {
    let Some((index, entry)) = module
        .entry_points
        .iter()
        .enumerate()
        .find(|(_, entry)| entry.stage == naga_stage(stage))
    else {
        return Err(format!("no {stage} entry point found"));
    };
    let mut reflector = Reflector {
        module,
        interface: ShaderInterface::new(stage, entry.name.clone()),
        types: HashMap::new(),
    };
    reflector.interface.workgroup_size = entry.workgroup_size;

    for argument in &entry.function.arguments {
        let name = argument.name.clone().unwrap_or_default();
        let vars = reflector.locations(argument.ty, argument.binding.as_ref(), name);
        reflector.interface.inputs.extend(vars);
    }
    if let Some(result) = &entry.function.result {
        let vars = reflector.locations(result.ty, result.binding.as_ref(), String::new());
        reflector.interface.outputs.extend(vars);
    }

    let entry_info = info.get_entry_point(index);
    for (handle, var) in module.global_variables.iter() {
        if entry_info[handle].is_empty() {
            continue;
        }
        reflector.global(var);
    }
    reflector.interface.combined_image_samplers = combined_image_samplers(module, entry);
    Ok(reflector.interface)
}

struct Reflector<'a> {
    module: &'a Module,
    interface: ShaderInterface,
    types: HashMap<Handle<naga::Type>, TypeHandle>,
}

impl Reflector<'_> {
    /// Stage inputs or outputs carried by a value, flattening structs.
    fn locations(
        &mut self,
        ty: Handle<naga::Type>,
        binding: Option<&Binding>,
        name: String,
    ) -> Vec<InterfaceVar> {
        match binding {
            Some(Binding::Location { location, .. }) => vec![InterfaceVar {
                name,
                location: *location,
                ty: self.add_type(ty),
            }],
            Some(Binding::BuiltIn(_)) => Vec::new(),
            None => {
                let module = self.module;
                match &module.types[ty].inner {
                    TypeInner::Struct { members, .. } => members
                        .iter()
                        .flat_map(|member| {
                            self.locations(
                                member.ty,
                                member.binding.as_ref(),
                                member.name.clone().unwrap_or_default(),
                            )
                        })
                        .collect(),
                    _ => Vec::new(),
                }
            }
        }
    }

    fn global(&mut self, var: &naga::GlobalVariable) {
        let module = self.module;
        let binding = var.binding.as_ref().map(|b| b.binding);
        let name = var.name.clone().unwrap_or_default();
        let ty = &module.types[var.ty];
        match var.space {
            AddressSpace::Uniform | AddressSpace::Storage { .. } => {
                let readonly = match var.space {
                    AddressSpace::Storage { access } => !access.contains(StorageAccess::STORE),
                    _ => true,
                };
                let buffer = BufferVar {
                    name: buffer_name(ty, &name),
                    inst_name: var.name.clone(),
                    binding,
                    ty: self.add_type(var.ty),
                    readonly,
                };
                if matches!(var.space, AddressSpace::Uniform) {
                    self.interface.uniform_buffers.push(buffer);
                } else {
                    self.interface.storage_buffers.push(buffer);
                }
            }
            AddressSpace::Handle => match ty.inner {
                TypeInner::Image {
                    dim,
                    arrayed,
                    class,
                } => {
                    let dim = image_dim(dim);
                    match class {
                        ImageClass::Sampled { kind, multi } => self.interface.images.push(ImageVar {
                            name,
                            binding,
                            dim,
                            arrayed,
                            multisampled: multi,
                            sampled_kind: base_kind(kind, 4),
                            is_depth: false,
                        }),
                        ImageClass::Depth { multi } => self.interface.images.push(ImageVar {
                            name,
                            binding,
                            dim,
                            arrayed,
                            multisampled: multi,
                            sampled_kind: BaseKind::Float,
                            is_depth: true,
                        }),
                        ImageClass::Storage { format, .. } => {
                            self.interface.storage_images.push(StorageImageVar {
                                name,
                                binding,
                                dim,
                                arrayed,
                                format: pixel_format(format),
                            });
                        }
                        #[allow(unreachable_patterns, reason = "Depends on the naga version")]
                        _ => log::warn!("ignoring image '{name}' of unsupported class"),
                    }
                }
                TypeInner::Sampler { comparison } => self.interface.samplers.push(SamplerVar {
                    name,
                    binding,
                    is_comparison: comparison,
                }),
                _ => {}
            },
            _ => {}
        }
    }

    fn add_type(&mut self, handle: Handle<naga::Type>) -> TypeHandle {
        if let Some(&known) = self.types.get(&handle) {
            return known;
        }
        let desc = self.describe(handle);
        let known = self.interface.add_type(desc);
        self.types.insert(handle, known);
        known
    }

    fn describe(&mut self, handle: Handle<naga::Type>) -> TypeDesc {
        let module = self.module;
        let ty = &module.types[handle];
        let size = ty.inner.size(module.to_ctx());
        let mut desc = match ty.inner {
            TypeInner::Scalar(scalar) => {
                TypeDesc::scalar(base_kind(scalar.kind, scalar.width), size)
            }
            TypeInner::Vector { size: n, scalar } => TypeDesc {
                vecsize: n as u8,
                ..TypeDesc::scalar(base_kind(scalar.kind, scalar.width), size)
            },
            TypeInner::Matrix {
                columns,
                rows,
                scalar,
            } => TypeDesc {
                vecsize: rows as u8,
                columns: columns as u8,
                matrix_stride: column_stride(rows, scalar.width),
                ..TypeDesc::scalar(base_kind(scalar.kind, scalar.width), size)
            },
            TypeInner::Array {
                base,
                size: count,
                stride,
            } => {
                let mut element = self.describe(base);
                let count = match count {
                    naga::ArraySize::Constant(n) => n.get(),
                    _ => 0,
                };
                element.array.insert(0, count);
                element.array_stride = stride;
                return element;
            }
            TypeInner::Struct { ref members, span } => TypeDesc {
                members: members
                    .iter()
                    .map(|member| MemberDesc {
                        name: member.name.clone().unwrap_or_default(),
                        ty: self.add_type(member.ty),
                        offset: member.offset,
                    })
                    .collect(),
                ..TypeDesc::scalar(BaseKind::Struct, span)
            },
            TypeInner::Image { .. } => TypeDesc::scalar(BaseKind::Image, 0),
            TypeInner::Sampler { .. } => TypeDesc::scalar(BaseKind::Sampler, 0),
            _ => TypeDesc::scalar(BaseKind::Unknown, size),
        };
        desc.name = ty.name.clone();
        desc
    }
}

/// Buffers are known by their block type name, other resources by their
/// variable name.
fn buffer_name(ty: &naga::Type, var_name: &str) -> String {
    ty.name.clone().unwrap_or_else(|| var_name.to_owned())
}

/// The category and name a global is reflected under, if it is a resource.
#[allow(dead_code, reason = "Only used by the writers enabled in some feature sets")]
fn resource_of(
    types: &UniqueArena<naga::Type>,
    var: &naga::GlobalVariable,
) -> Option<(Category, String)> {
    let name = var.name.clone().unwrap_or_default();
    let ty = &types[var.ty];
    let category = match var.space {
        AddressSpace::Uniform => return Some((Category::UniformBlock, buffer_name(ty, &name))),
        AddressSpace::Storage { .. } => {
            return Some((Category::StorageBuffer, buffer_name(ty, &name)));
        }
        AddressSpace::Handle => match ty.inner {
            TypeInner::Image {
                class: ImageClass::Storage { .. },
                ..
            } => Category::StorageImage,
            TypeInner::Image { .. } => Category::Texture,
            TypeInner::Sampler { .. } => Category::Sampler,
            _ => return None,
        },
        _ => return None,
    };
    Some((category, name))
}

fn base_kind(kind: naga::ScalarKind, width: u8) -> BaseKind {
    match (kind, width) {
        (naga::ScalarKind::Bool, _) => BaseKind::Bool,
        (naga::ScalarKind::Sint, 4) => BaseKind::Int,
        (naga::ScalarKind::Uint, 4) => BaseKind::UInt,
        (naga::ScalarKind::Float, 4) => BaseKind::Float,
        (naga::ScalarKind::Float, 2) => BaseKind::Half,
        _ => BaseKind::Unknown,
    }
}

fn column_stride(rows: naga::VectorSize, width: u8) -> u32 {
    let padded_rows = match rows {
        naga::VectorSize::Bi => 2,
        _ => 4,
    };
    padded_rows * u32::from(width)
}

fn image_dim(dim: naga::ImageDimension) -> ImageDim {
    match dim {
        naga::ImageDimension::D1 => ImageDim::D1,
        naga::ImageDimension::D2 => ImageDim::D2,
        naga::ImageDimension::D3 => ImageDim::D3,
        naga::ImageDimension::Cube => ImageDim::Cube,
    }
}

fn pixel_format(format: naga::StorageFormat) -> Option<StoragePixelFormat> {
    use naga::StorageFormat as F;
    Some(match format {
        F::Rgba8Unorm => StoragePixelFormat::Rgba8,
        F::Rgba8Snorm => StoragePixelFormat::Rgba8Sn,
        F::Rgba8Uint => StoragePixelFormat::Rgba8Ui,
        F::Rgba8Sint => StoragePixelFormat::Rgba8Si,
        F::Rgba16Uint => StoragePixelFormat::Rgba16Ui,
        F::Rgba16Sint => StoragePixelFormat::Rgba16Si,
        F::Rgba16Float => StoragePixelFormat::Rgba16F,
        F::R32Uint => StoragePixelFormat::R32Ui,
        F::R32Sint => StoragePixelFormat::R32Si,
        F::R32Float => StoragePixelFormat::R32F,
        F::Rg32Uint => StoragePixelFormat::Rg32Ui,
        F::Rg32Sint => StoragePixelFormat::Rg32Si,
        F::Rg32Float => StoragePixelFormat::Rg32F,
        F::Rgba32Uint => StoragePixelFormat::Rgba32Ui,
        F::Rgba32Sint => StoragePixelFormat::Rgba32Si,
        F::Rgba32Float => StoragePixelFormat::Rgba32F,
        _ => return None,
    })
}

/// Texture and sampler globals that are sampled together.
fn combined_image_samplers(module: &Module, entry: &naga::EntryPoint) -> Vec<CombinedImageSampler> {
    let mut pairs: Vec<CombinedImageSampler> = Vec::new();
    let functions = module
        .functions
        .iter()
        .map(|(_, function)| function)
        .chain(std::iter::once(&entry.function));
    for function in functions {
        for (_, expression) in function.expressions.iter() {
            let naga::Expression::ImageSample { image, sampler, .. } = *expression else {
                continue;
            };
            let global_name = |expr: Handle<naga::Expression>| match function.expressions[expr] {
                naga::Expression::GlobalVariable(var) => module.global_variables[var].name.clone(),
                _ => None,
            };
            let (Some(image), Some(sampler)) = (global_name(image), global_name(sampler)) else {
                continue;
            };
            let name = format!("{image}_{sampler}");
            if pairs.iter().all(|pair| pair.name != name) {
                pairs.push(CombinedImageSampler {
                    name,
                    binding: None,
                    image,
                    sampler,
                });
            }
        }
    }
    pairs
}
