// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generators that turn a [`crossbind`] build [`Output`] into text.
//!
//! Generators only read the contract. Slots and layouts are taken as they
//! were computed by the build, never recomputed here.
//!
//! - [`Generator::Yaml`] dumps the reflection of every built language.
//! - [`Generator::Rust`] declares padded `#[repr(C)]` structs for uniform
//!   blocks and storage buffers, and the bind slot constants of each program.

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

mod rust;
mod writer;
mod yaml;

use std::fmt;
use std::str::FromStr;

use crossbind::{Output, Slang};
use thiserror::Error;

use writer::Writer;

/// Errors that can occur while generating.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The requested generator name is not known.
    #[error("unknown generator '{0}'")]
    UnknownGenerator(String),
    /// The build didn't produce any contract to generate from.
    #[error("no language was built for '{path}'")]
    NoContracts { path: String },
    /// One of the requested languages failed to build.
    #[error("building '{path}' for {slang} failed: {message}")]
    Backend {
        path: String,
        slang: Slang,
        message: String,
    },
    /// Writing into the output buffer failed.
    #[error("failed to format generated code")]
    Format(#[from] fmt::Error),
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

/// The available output formats.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Generator {
    Yaml,
    Rust,
}

impl Generator {
    pub const ALL: [Self; 2] = [Self::Yaml, Self::Rust];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Rust => "rust",
        }
    }

    /// File extension of the generated text.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Rust => "rs",
        }
    }

    /// Generates the text for `output`.
    ///
    /// Fails if any requested language failed to build, so that a partial
    /// contract never ends up in generated code.
    pub fn generate(self, output: &Output) -> Result<String> {
        if let Some((slang, err)) = output.errors().next() {
            return Err(Error::Backend {
                path: output.path.clone(),
                slang,
                message: err.to_string(),
            });
        }
        if output.contracts().next().is_none() {
            return Err(Error::NoContracts {
                path: output.path.clone(),
            });
        }
        let mut writer = match self {
            Self::Yaml => Writer::new("  "),
            Self::Rust => Writer::new("    "),
        };
        match self {
            Self::Yaml => yaml::write(&mut writer, output)?,
            Self::Rust => rust::write(&mut writer, output)?,
        }
        let text = writer.finish();
        log::debug!(
            "generated {} bytes of {} for '{}'",
            text.len(),
            self.as_str(),
            output.path
        );
        Ok(text)
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Generator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|generator| generator.as_str() == s)
            .ok_or_else(|| Error::UnknownGenerator(s.to_owned()))
    }
}
