// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use thiserror::Error;

use crate::{Category, Convention, Diagnostic, Slang};

/// Errors that can occur while building a binding contract.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The shader compiler rejected a snippet.
    #[error("failed to compile snippet '{snippet}' for {slang}: {}", first_message(.diagnostics))]
    Compile {
        slang: Slang,
        snippet: String,
        diagnostics: Vec<Diagnostic>,
    },
    /// Two resources of one category share a name but disagree on their shape.
    #[error("conflicting {category} definitions found for '{name}'")]
    Conflict { category: Category, name: String },
    /// Two distinct resources would be bound to the same stage-local slot.
    #[error("{category}s '{first}' and '{second}' in program '{program}' both use binding {binding}")]
    BindingCollision {
        category: Category,
        program: String,
        first: String,
        second: String,
        binding: u32,
    },
    /// A resource does not fit into the limits of a category or binding convention.
    #[error("{category} '{name}' exceeds the limit of {limit}{}", in_convention(.convention))]
    Capacity {
        category: Category,
        name: String,
        limit: u32,
        convention: Option<Convention>,
    },
    /// Vertex stage outputs don't match fragment stage inputs.
    #[error(
        "outputs of vs '{vs}' don't match inputs of fs '{fs}' for attr #{slot} (vs={vs_attr},fs={fs_attr})"
    )]
    Link {
        program: String,
        vs: String,
        fs: String,
        slot: u32,
        vs_attr: String,
        fs_attr: String,
    },
    /// The reflected interface contains something the binding model can't express.
    #[error("'{name}' in snippet '{snippet}': {reason}")]
    UnsupportedShape {
        snippet: String,
        name: String,
        reason: &'static str,
    },
    /// A program references a snippet that was never declared.
    #[error("program '{program}' references unknown snippet '{snippet}'")]
    UnknownSnippet { program: String, snippet: String },
    /// A snippet is used in a stage it wasn't declared for.
    #[error("program '{program}' uses snippet '{snippet}' as a {expected} shader")]
    StageMismatch {
        program: String,
        snippet: String,
        expected: crate::ShaderStage,
    },
    /// A name does not spell any target shading language.
    #[error("unknown shading language '{0}'")]
    UnknownSlang(String),
    /// A type tag does not spell any sample or sampler type.
    #[error("unknown {kind} '{value}'")]
    UnknownTag { kind: &'static str, value: String },
}

fn first_message(diagnostics: &[Diagnostic]) -> String {
    match diagnostics.first() {
        Some(diagnostic) => diagnostic.to_string(),
        None => "no diagnostics".into(),
    }
}

fn in_convention(convention: &Option<Convention>) -> String {
    match convention {
        Some(convention) => format!(" for {convention} bindings"),
        None => String::new(),
    }
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;
