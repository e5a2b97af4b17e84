use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum_macros::EnumString;

use super::DescriptorError;

pub const DEFAULT_MEMORY_SIZE: u32 = 128;
pub const DEFAULT_TIMEOUT_SECS: u64 = 3;

#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    strum_macros::Display,
)]
pub enum Runtime {
    #[default]
    #[serde(rename = "provided.al2023")]
    #[strum(serialize = "provided.al2023")]
    ProvidedAl2023,
    #[serde(rename = "provided.al2")]
    #[strum(serialize = "provided.al2")]
    ProvidedAl2,
    #[serde(rename = "nodejs22.x")]
    #[strum(serialize = "nodejs22.x")]
    Nodejs22x,
    #[serde(rename = "nodejs20.x")]
    #[strum(serialize = "nodejs20.x")]
    Nodejs20x,
}

/// Handler module plus the symbol it exports, written `module.symbol`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryPoint {
    pub module: String,
    pub symbol: String,
}

impl EntryPoint {
    pub fn new(module: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            symbol: symbol.into(),
        }
    }
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.module.trim().is_empty() || self.symbol.trim().is_empty() {
            return Err(DescriptorError::InvalidEntryPoint(self.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.symbol)
    }
}

impl FromStr for EntryPoint {
    type Err = DescriptorError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, symbol) = s
            .rsplit_once('.')
            .ok_or_else(|| DescriptorError::InvalidEntryPoint(s.to_string()))?;
        let entry = EntryPoint::new(module, symbol);
        entry.validate().map(|_| entry)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceMapMode {
    #[default]
    Default,
    External,
    Inline,
    Both,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BundlingConfig {
    #[serde(default)]
    pub minify: bool,
    #[serde(default)]
    pub source_map: bool,
    #[serde(default)]
    pub source_map_mode: SourceMapMode,
    #[serde(default = "default_sources_content")]
    pub sources_content: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

fn default_sources_content() -> bool {
    true
}

impl Default for BundlingConfig {
    fn default() -> Self {
        Self {
            minify: false,
            source_map: false,
            source_map_mode: SourceMapMode::Default,
            sources_content: default_sources_content(),
            target: None,
        }
    }
}

impl BundlingConfig {
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if !self.source_map {
            if self.source_map_mode != SourceMapMode::Default {
                return Err(DescriptorError::InvalidBundling(
                    "sourceMapMode cannot be used when sourceMap is false".to_string(),
                ));
            }
            if !self.sources_content {
                return Err(DescriptorError::InvalidBundling(
                    "sourcesContent cannot be used when sourceMap is false".to_string(),
                ));
            }
        }
        match self.target.as_deref() {
            Some(target) if target.trim().is_empty() => Err(DescriptorError::InvalidBundling(
                "target cannot be empty".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResource {
    pub id: String,
    #[serde(default)]
    pub runtime: Runtime,
    pub entry: EntryPoint,
    #[serde(default)]
    pub bundling: BundlingConfig,
    #[serde(default = "default_memory_size")]
    pub memory_size: u32,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_memory_size() -> u32 {
    DEFAULT_MEMORY_SIZE
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl FunctionResource {
    pub fn new(id: impl Into<String>, entry: EntryPoint) -> Self {
        Self {
            id: id.into(),
            runtime: Runtime::default(),
            entry,
            bundling: BundlingConfig::default(),
            memory_size: DEFAULT_MEMORY_SIZE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
    pub fn runtime(mut self, runtime: Runtime) -> Self {
        self.runtime = runtime;
        self
    }
    pub fn bundling(mut self, bundling: BundlingConfig) -> Self {
        self.bundling = bundling;
        self
    }
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
    pub fn validate(&self) -> Result<(), DescriptorError> {
        self.entry.validate()?;
        self.bundling.validate()?;
        if self.timeout_secs == 0 {
            return Err(DescriptorError::InvalidFunction(format!(
                "Function[{}] timeout must be at least one second",
                self.id
            )));
        }
        Ok(())
    }
}
