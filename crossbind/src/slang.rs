// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Target shading languages and the binding conventions they follow.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::Error;

/// A target shading language.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Slang {
    Glsl410,
    Glsl430,
    Glsl300es,
    Hlsl4,
    Hlsl5,
    MetalMacos,
    MetalIos,
    MetalSim,
    Wgsl,
}

impl Slang {
    pub const ALL: [Self; 9] = [
        Self::Glsl410,
        Self::Glsl430,
        Self::Glsl300es,
        Self::Hlsl4,
        Self::Hlsl5,
        Self::MetalMacos,
        Self::MetalIos,
        Self::MetalSim,
        Self::Wgsl,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Glsl410 => "glsl410",
            Self::Glsl430 => "glsl430",
            Self::Glsl300es => "glsl300es",
            Self::Hlsl4 => "hlsl4",
            Self::Hlsl5 => "hlsl5",
            Self::MetalMacos => "metal_macos",
            Self::MetalIos => "metal_ios",
            Self::MetalSim => "metal_sim",
            Self::Wgsl => "wgsl",
        }
    }

    /// The binding convention native slots are allocated under.
    pub fn convention(self) -> Convention {
        match self {
            Self::Glsl410 | Self::Glsl430 | Self::Glsl300es => Convention::Glsl,
            Self::Hlsl4 | Self::Hlsl5 => Convention::Hlsl,
            Self::MetalMacos | Self::MetalIos | Self::MetalSim => Convention::Msl,
            Self::Wgsl => Convention::Wgsl,
        }
    }

    pub fn is_glsl(self) -> bool {
        self.convention() == Convention::Glsl
    }

    pub fn is_hlsl(self) -> bool {
        self.convention() == Convention::Hlsl
    }

    pub fn is_msl(self) -> bool {
        self.convention() == Convention::Msl
    }

    pub fn is_wgsl(self) -> bool {
        self.convention() == Convention::Wgsl
    }

    /// Whether a platform compiler can turn sources of this language into bytecode.
    pub fn has_bytecode(self) -> bool {
        self.is_hlsl() || self.is_msl()
    }

    /// The entry point name a compiled stage exposes in this language.
    ///
    /// Metal reserves `main`, so cross-compiled entry points get a `0` suffix.
    pub fn entry_point(self, name: &str) -> String {
        if self.is_msl() {
            format!("{name}0")
        } else {
            name.to_owned()
        }
    }
}

impl fmt::Display for Slang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slang {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|slang| slang.as_str() == s)
            .ok_or_else(|| Error::UnknownSlang(s.to_owned()))
    }
}

/// The four families of binding rules native slots are allocated under.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Convention {
    Glsl,
    Hlsl,
    Msl,
    Wgsl,
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Glsl => "GLSL",
            Self::Hlsl => "HLSL",
            Self::Msl => "Metal",
            Self::Wgsl => "WGSL",
        })
    }
}

bitflags! {
    /// A set of target shading languages.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Slangs: u16 {
        const GLSL410 = 1 << 0;
        const GLSL430 = 1 << 1;
        const GLSL300ES = 1 << 2;
        const HLSL4 = 1 << 3;
        const HLSL5 = 1 << 4;
        const METAL_MACOS = 1 << 5;
        const METAL_IOS = 1 << 6;
        const METAL_SIM = 1 << 7;
        const WGSL = 1 << 8;
    }
}

impl Slangs {
    pub fn has(self, slang: Slang) -> bool {
        self.contains(slang.into())
    }

    /// The contained languages in declaration order.
    pub fn slangs(self) -> impl Iterator<Item = Slang> {
        Slang::ALL.into_iter().filter(move |slang| self.has(*slang))
    }
}

impl From<Slang> for Slangs {
    fn from(slang: Slang) -> Self {
        match slang {
            Slang::Glsl410 => Self::GLSL410,
            Slang::Glsl430 => Self::GLSL430,
            Slang::Glsl300es => Self::GLSL300ES,
            Slang::Hlsl4 => Self::HLSL4,
            Slang::Hlsl5 => Self::HLSL5,
            Slang::MetalMacos => Self::METAL_MACOS,
            Slang::MetalIos => Self::METAL_IOS,
            Slang::MetalSim => Self::METAL_SIM,
            Slang::Wgsl => Self::WGSL,
        }
    }
}

impl FromIterator<Slang> for Slangs {
    fn from_iter<T: IntoIterator<Item = Slang>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |set, slang| set | Self::from(slang))
    }
}

impl FromStr for Slangs {
    type Err = Error;

    /// Parses a colon separated list such as `glsl430:hlsl5:wgsl`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(':')
            .filter(|part| !part.is_empty())
            .map(str::parse::<Slang>)
            .collect()
    }
}
