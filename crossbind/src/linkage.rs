// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::error::Result;
use crate::reflection::{ProgramReflection, StageAttr, MAX_ATTRS};
use crate::Error;

/// Checks that every vertex output of a program feeds the fragment input at
/// the same location, and that neither stage has an unmatched attribute.
///
/// Compute programs have nothing to link.
pub fn validate_linkage(program: &ProgramReflection) -> Result<()> {
    let (Some(vs), Some(fs)) = (program.vs(), program.fs()) else {
        return Ok(());
    };
    for slot in 0..MAX_ATTRS {
        let out = vs.outputs[slot].as_ref();
        let inp = fs.inputs[slot].as_ref();
        let linked = match (out, inp) {
            (None, None) => true,
            (Some(out), Some(inp)) => out.links_to(inp),
            _ => false,
        };
        if !linked {
            return Err(Error::Link {
                program: program.name.clone(),
                vs: vs.snippet.clone(),
                fs: fs.snippet.clone(),
                slot: slot as u32,
                vs_attr: attr_name(out),
                fs_attr: attr_name(inp),
            });
        }
    }
    Ok(())
}

fn attr_name(attr: Option<&StageAttr>) -> String {
    attr.map(|a| a.name.clone()).unwrap_or_default()
}
