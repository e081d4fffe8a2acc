// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Source writers for the languages naga can emit.
//!
//! Resource globals are rebound before writing, so that the source declares
//! each resource at the native slots of the table it is written for.

use naga::{valid::ModuleInfo, Module};

use crate::{Bindings, ShaderStage, Slang};

/// Source written for one entry point.
pub(super) struct Written {
    pub source: String,
    /// The entry point's name in `source`, when the writer picks it.
    pub entry_point: Option<String>,
}

impl Written {
    #[allow(dead_code, reason = "Only used by the writers enabled in some feature sets")]
    fn source(source: String) -> Self {
        Self {
            source,
            entry_point: None,
        }
    }
}

pub(super) fn has_writer(slang: Slang) -> bool {
    match slang {
        Slang::Wgsl => cfg!(feature = "wgsl"),
        Slang::MetalMacos | Slang::MetalIos | Slang::MetalSim => cfg!(feature = "msl"),
        Slang::Glsl410 | Slang::Glsl430 | Slang::Glsl300es => cfg!(feature = "glsl"),
        Slang::Hlsl4 | Slang::Hlsl5 => false,
    }
}

/// Writes the `stage` entry point of `module` in `slang`, or `None` if no
/// writer for it is enabled.
#[allow(
    unused_variables,
    reason = "Only used by the writers enabled in some feature sets"
)]
pub(super) fn write_source(
    module: &Module,
    info: &ModuleInfo,
    stage: ShaderStage,
    slang: Slang,
    bindings: &Bindings,
) -> Result<Option<Written>, String> {
    let Some(index) = module
        .entry_points
        .iter()
        .position(|entry| entry.stage == super::naga_stage(stage))
    else {
        return Err(format!("no {stage} entry point found"));
    };
    match slang {
        #[cfg(feature = "wgsl")]
        Slang::Wgsl => {
            wgsl(module.clone(), info, stage, bindings).map(|s| Some(Written::source(s)))
        }
        #[cfg(feature = "msl")]
        Slang::MetalMacos | Slang::MetalIos | Slang::MetalSim => {
            msl(module.clone(), info, index, stage, bindings).map(Some)
        }
        #[cfg(feature = "glsl")]
        Slang::Glsl410 | Slang::Glsl430 | Slang::Glsl300es => {
            let source = glsl(module.clone(), info, index, stage, slang, bindings)?;
            Ok(Some(Written::source(source)))
        }
        _ => Ok(None),
    }
}

/// A binding no two globals of a module share.
#[cfg(any(feature = "msl", feature = "glsl"))]
fn unique_binding(handle: naga::Handle<naga::GlobalVariable>) -> naga::ResourceBinding {
    naga::ResourceBinding {
        group: 0,
        binding: handle.index() as u32,
    }
}

#[cfg(any(feature = "msl", feature = "glsl"))]
fn slot(native: Option<u32>) -> Option<u8> {
    native.and_then(|n| u8::try_from(n).ok())
}

#[cfg(feature = "wgsl")]
fn wgsl(
    mut module: Module,
    info: &ModuleInfo,
    stage: ShaderStage,
    bindings: &Bindings,
) -> Result<String, String> {
    use naga::back::wgsl;

    use crate::Category;

    for (_, var) in module.global_variables.iter_mut() {
        let Some((category, name)) = super::resource_of(&module.types, var) else {
            continue;
        };
        let Some(native) = bindings.native_slots(category, &name, stage) else {
            continue;
        };
        let target = match category {
            Category::UniformBlock => native.wgsl_group0_binding.map(|binding| (0, binding)),
            _ => native.wgsl_group1_binding.map(|binding| (1, binding)),
        };
        if let Some((group, binding)) = target {
            var.binding = Some(naga::ResourceBinding { group, binding });
        }
    }
    wgsl::write_string(&module, info, wgsl::WriterFlags::empty()).map_err(|e| e.to_string())
}

/// Buffer index naga passes runtime array sizes in, above every buffer slot.
#[cfg(feature = "msl")]
const MSL_SIZES_BUFFER: u8 = 30;

#[cfg(feature = "msl")]
static_assertions::const_assert!((MSL_SIZES_BUFFER as usize) >= crate::MSL_MAX_BUFFERS);

#[cfg(feature = "msl")]
fn msl(
    mut module: Module,
    info: &ModuleInfo,
    index: usize,
    stage: ShaderStage,
    bindings: &Bindings,
) -> Result<Written, String> {
    use naga::back::msl;
    use naga::{AddressSpace, StorageAccess};

    use crate::Category;

    let mut resources = msl::BindingMap::default();
    for (handle, var) in module.global_variables.iter_mut() {
        let Some((category, name)) = super::resource_of(&module.types, var) else {
            continue;
        };
        let Some(native) = bindings.native_slots(category, &name, stage) else {
            continue;
        };
        let target = match category {
            Category::UniformBlock | Category::StorageBuffer => msl::BindTarget {
                buffer: slot(native.msl_buffer),
                mutable: matches!(
                    var.space,
                    AddressSpace::Storage { access } if access.contains(StorageAccess::STORE)
                ),
                ..Default::default()
            },
            Category::Texture | Category::StorageImage => msl::BindTarget {
                texture: slot(native.msl_texture),
                ..Default::default()
            },
            Category::Sampler => msl::BindTarget {
                sampler: slot(native.msl_sampler).map(msl::BindSamplerTarget::Resource),
                ..Default::default()
            },
            Category::TextureSampler | Category::VertexAttr => continue,
        };
        let binding = unique_binding(handle);
        var.binding = Some(binding);
        resources.insert(binding, target);
    }

    let entry_point = module.entry_points[index].name.clone();
    let options = msl::Options {
        lang_version: (2, 0),
        per_entry_point_map: msl::EntryPointResourceMap::from([(
            entry_point,
            msl::EntryPointResources {
                resources,
                push_constant_buffer: None,
                sizes_buffer: Some(MSL_SIZES_BUFFER),
            },
        )]),
        fake_missing_bindings: false,
        ..Default::default()
    };
    let (source, translation) =
        msl::write_string(&module, info, &options, &msl::PipelineOptions::default())
            .map_err(|e| e.to_string())?;
    match translation.entry_point_names.into_iter().nth(index) {
        Some(Ok(name)) => Ok(Written {
            source,
            entry_point: Some(name),
        }),
        Some(Err(e)) => Err(e.to_string()),
        None => Err("entry point missing from the Metal output".into()),
    }
}

#[cfg(feature = "glsl")]
fn glsl(
    mut module: Module,
    info: &ModuleInfo,
    index: usize,
    stage: ShaderStage,
    slang: Slang,
    bindings: &Bindings,
) -> Result<String, String> {
    use naga::back::glsl::{self, PipelineOptions, Version};

    use crate::Category;

    let version = match slang {
        Slang::Glsl410 => Version::Desktop(410),
        Slang::Glsl300es => Version::Embedded {
            version: 300,
            is_webgl: true,
        },
        _ => Version::Desktop(430),
    };
    let entry = &module.entry_points[index];
    let pipeline_options = PipelineOptions {
        entry_point: entry.name.clone(),
        shader_stage: entry.stage,
        multiview: None,
    };

    let mut binding_map = glsl::BindingMap::default();
    for (handle, var) in module.global_variables.iter_mut() {
        let Some((category, name)) = super::resource_of(&module.types, var) else {
            continue;
        };
        // Textures are bound through the first pair sampling them.
        let glsl_binding = match category {
            Category::StorageBuffer | Category::StorageImage => bindings
                .native_slots(category, &name, stage)
                .and_then(|native| native.glsl_binding),
            Category::Texture => bindings
                .texture_samplers
                .iter()
                .find(|pair| pair.stage == stage && pair.texture_name == name)
                .and_then(|pair| pair.native.glsl_binding),
            _ => None,
        };
        let binding = unique_binding(handle);
        var.binding = Some(binding);
        if let Some(slot) = slot(glsl_binding) {
            binding_map.insert(binding, slot);
        }
    }

    let options = glsl::Options {
        version,
        binding_map,
        ..Default::default()
    };
    let mut source = String::new();
    {
        let mut writer = glsl::Writer::new(
            &mut source,
            &module,
            info,
            &options,
            &pipeline_options,
            naga::proc::BoundsCheckPolicies::default(),
        )
        .map_err(|e| e.to_string())?;
        writer.write().map_err(|e| e.to_string())?;
    }
    Ok(source)
}
