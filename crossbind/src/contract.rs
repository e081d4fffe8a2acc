// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Building the per-backend binding contract of an input file.

use std::collections::HashMap;

use crate::error::Result;
use crate::interface::Severity;
use crate::merge::{merge_bindings, merge_vertex_attrs, validate_program_bindings, VertexAttr};
use crate::reflection::{ProgramReflection, StageReflection};
use crate::{
    allocate_slots, validate_linkage, Bindings, Code, Diagnostic, Error, Input, Program,
    ShaderCompiler, ShaderStage, Slang, Slangs,
};

/// Settings of a build.
#[derive(Clone, Debug, Default)]
pub struct BuildOptions {
    /// Languages to build contracts for.
    pub slangs: Slangs,
    /// Whether generators should include member level reflection.
    pub reflection: bool,
}

impl BuildOptions {
    pub fn new(slangs: Slangs) -> Self {
        Self {
            slangs,
            reflection: false,
        }
    }

    #[must_use]
    pub fn with_reflection(mut self, reflection: bool) -> Self {
        self.reflection = reflection;
        self
    }
}

/// The code of one program stage, bound to the program's native slots.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StageSource {
    pub program: String,
    pub snippet: String,
    pub stage: ShaderStage,
    pub code: Code,
}

/// Everything a generator needs to emit host-side bindings for one language.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Contract {
    pub slang: Slang,
    /// Programs in declaration order, each with its merged and allocated bindings.
    pub programs: Vec<ProgramReflection>,
    /// All resources of the input, used to emit each declaration once.
    ///
    /// Canonical slots in this table are not the slots of any program.
    pub bindings: Bindings,
    /// Code of every program stage, in program and then stage order.
    pub sources: Vec<StageSource>,
    /// Warnings reported by the compiler.
    pub warnings: Vec<Diagnostic>,
}

impl Contract {
    pub fn program(&self, name: &str) -> Option<&ProgramReflection> {
        self.programs.iter().find(|p| p.name == name)
    }

    pub fn source(&self, program: &str, stage: ShaderStage) -> Option<&StageSource> {
        self.sources
            .iter()
            .find(|s| s.program == program && s.stage == stage)
    }

    /// Vertex shader inputs across all programs.
    pub fn vertex_attrs(&self) -> Result<Vec<VertexAttr>> {
        merge_vertex_attrs(&self.programs)
    }
}

// Contracts of different languages are built and consumed independently.
static_assertions::assert_impl_all!(Contract: Send, Sync);

/// The outcome of a build: one result per requested language.
///
/// A failing language doesn't prevent the others from building.
#[derive(Debug)]
pub struct Output {
    pub path: String,
    /// Copied from [`BuildOptions::reflection`].
    pub reflection: bool,
    pub backends: Vec<(Slang, Result<Contract>)>,
}

impl Output {
    pub fn contract(&self, slang: Slang) -> Option<&Contract> {
        self.backends
            .iter()
            .find(|(s, _)| *s == slang)
            .and_then(|(_, result)| result.as_ref().ok())
    }

    /// Successfully built contracts in language order.
    pub fn contracts(&self) -> impl Iterator<Item = &Contract> {
        self.backends
            .iter()
            .filter_map(|(_, result)| result.as_ref().ok())
    }

    pub fn errors(&self) -> impl Iterator<Item = (Slang, &Error)> {
        self.backends
            .iter()
            .filter_map(|(slang, result)| Some((*slang, result.as_ref().err()?)))
    }

    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }
}

/// Builds the contract of `input` for every language in `options`.
pub fn build(input: &Input, options: &BuildOptions, compiler: &mut impl ShaderCompiler) -> Output {
    let backends = options
        .slangs
        .slangs()
        .map(|slang| {
            let result = build_backend(input, slang, compiler);
            if let Err(err) = &result {
                log::debug!("building {} for {slang} failed: {err}", input.path);
            }
            (slang, result)
        })
        .collect();
    Output {
        path: input.path.clone(),
        reflection: options.reflection,
        backends,
    }
}

/// Builds the contract of `input` for a single language.
pub fn build_backend(
    input: &Input,
    slang: Slang,
    compiler: &mut impl ShaderCompiler,
) -> Result<Contract> {
    let mut stages: HashMap<&str, StageReflection> = HashMap::new();
    let mut codes: HashMap<&str, Code> = HashMap::new();
    let mut warnings = Vec::new();

    for snippet in &input.snippets {
        if !input.is_referenced(snippet) {
            log::trace!("skipping unreferenced snippet '{}'", snippet.name);
            continue;
        }
        let compiled = compiler
            .compile(snippet, slang)
            .map_err(|diagnostics| Error::Compile {
                slang,
                snippet: snippet.name.clone(),
                diagnostics,
            })?;
        let (errors, snippet_warnings): (Vec<_>, Vec<_>) = compiled
            .diagnostics
            .into_iter()
            .partition(|d| d.severity == Severity::Error);
        if !errors.is_empty() {
            return Err(Error::Compile {
                slang,
                snippet: snippet.name.clone(),
                diagnostics: errors,
            });
        }
        for warning in &snippet_warnings {
            log::warn!("{warning}");
        }
        warnings.extend(snippet_warnings);

        let mut reflection = StageReflection::parse(&compiled.interface, snippet, slang)?;
        if let Some(entry_point) = compiled.entry_point {
            reflection.entry_point = entry_point;
        }
        stages.insert(&snippet.name, reflection);
        codes.insert(&snippet.name, compiled.code);
    }

    let mut programs = Vec::with_capacity(input.programs.len());
    let mut sources = Vec::new();
    for program in &input.programs {
        let reflection = reflect_program(input, program, &stages)?;
        validate_linkage(&reflection)?;
        for stage in reflection.iter_stages() {
            let (Some(snippet), Some(code)) = (
                input.snippet(&stage.snippet),
                codes.get(stage.snippet.as_str()),
            ) else {
                continue;
            };
            let bound = compiler
                .bind(snippet, slang, &reflection.bindings)
                .map_err(|diagnostics| Error::Compile {
                    slang,
                    snippet: snippet.name.clone(),
                    diagnostics,
                })?;
            sources.push(StageSource {
                program: program.name.clone(),
                snippet: snippet.name.clone(),
                stage: stage.stage,
                code: bound.unwrap_or_else(|| code.clone()),
            });
        }
        programs.push(reflection);
    }

    let bindings = merge_bindings(programs.iter().map(|p| &p.bindings))?;
    Ok(Contract {
        slang,
        programs,
        bindings,
        sources,
        warnings,
    })
}

fn reflect_program(
    input: &Input,
    program: &Program,
    stages: &HashMap<&str, StageReflection>,
) -> Result<ProgramReflection> {
    let mut reflected: [Option<StageReflection>; 3] = [None, None, None];
    for (stage, snippet) in program.stages() {
        let unknown = || Error::UnknownSnippet {
            program: program.name.clone(),
            snippet: snippet.to_owned(),
        };
        let declared = input.snippet(snippet).ok_or_else(unknown)?;
        if declared.stage != stage {
            return Err(Error::StageMismatch {
                program: program.name.clone(),
                snippet: snippet.to_owned(),
                expected: stage,
            });
        }
        let reflection = stages.get(snippet).ok_or_else(unknown)?;
        reflected[stage.index()] = Some(reflection.clone());
    }

    let mut bindings = merge_bindings(reflected.iter().flatten().map(|s| &s.bindings))?;
    validate_program_bindings(&program.name, &bindings)?;
    allocate_slots(&mut bindings)?;
    Ok(ProgramReflection {
        name: program.name.clone(),
        line: program.line,
        stages: reflected,
        bindings,
    })
}
