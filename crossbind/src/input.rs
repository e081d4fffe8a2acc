// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The parsed shader input file: snippets and the programs that pair them.

use std::collections::HashMap;

use crate::{ImageSampleType, SamplerType, ShaderStage};

/// One stage worth of shader source.
#[derive(Clone, Debug, PartialEq)]
pub struct Snippet {
    pub name: String,
    pub stage: ShaderStage,
    /// Preprocessed GLSL handed to the shader compiler.
    pub source: String,
    /// Line of the snippet in the input file, used for diagnostics.
    pub first_line: u32,
    /// Overrides of the reflected sample type, keyed by texture name.
    pub image_sample_type_tags: HashMap<String, ImageSampleType>,
    /// Overrides of the reflected sampler type, keyed by sampler name.
    pub sampler_type_tags: HashMap<String, SamplerType>,
}

impl Snippet {
    pub fn new(name: impl Into<String>, stage: ShaderStage, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage,
            source: source.into(),
            first_line: 0,
            image_sample_type_tags: HashMap::new(),
            sampler_type_tags: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_image_sample_type(mut self, texture: &str, ty: ImageSampleType) -> Self {
        self.image_sample_type_tags.insert(texture.to_owned(), ty);
        self
    }

    #[must_use]
    pub fn with_sampler_type(mut self, sampler: &str, ty: SamplerType) -> Self {
        self.sampler_type_tags.insert(sampler.to_owned(), ty);
        self
    }
}

/// A named pairing of a vertex and fragment snippet, or a single compute snippet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    pub name: String,
    pub vs: Option<String>,
    pub fs: Option<String>,
    pub cs: Option<String>,
    pub line: u32,
}

impl Program {
    pub fn render(name: impl Into<String>, vs: impl Into<String>, fs: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vs: Some(vs.into()),
            fs: Some(fs.into()),
            cs: None,
            line: 0,
        }
    }

    pub fn compute(name: impl Into<String>, cs: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vs: None,
            fs: None,
            cs: Some(cs.into()),
            line: 0,
        }
    }

    pub fn is_compute(&self) -> bool {
        self.cs.is_some()
    }

    /// Snippet names in stage order, paired with the stage they're used as.
    pub fn stages(&self) -> impl Iterator<Item = (ShaderStage, &str)> {
        [
            (ShaderStage::Vertex, &self.vs),
            (ShaderStage::Fragment, &self.fs),
            (ShaderStage::Compute, &self.cs),
        ]
        .into_iter()
        .filter_map(|(stage, name)| Some((stage, name.as_deref()?)))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Input {
    pub path: String,
    pub snippets: Vec<Snippet>,
    pub programs: Vec<Program>,
}

impl Input {
    pub fn snippet(&self, name: &str) -> Option<&Snippet> {
        self.snippets.iter().find(|s| s.name == name)
    }

    /// Whether any program uses the snippet.
    pub fn is_referenced(&self, snippet: &Snippet) -> bool {
        self.programs
            .iter()
            .flat_map(Program::stages)
            .any(|(_, name)| name == snippet.name)
    }
}
