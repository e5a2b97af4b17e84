use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{descriptor::DeploymentDescriptor, solutions, storage::file::DEFAULT_STATE_FILE};

pub const STATE_FILE_VAR: &str = "HELLO_STACK_STATE_FILE";
pub const DESCRIPTOR_VAR: &str = "HELLO_STACK_DESCRIPTOR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub state_file: PathBuf,
    pub descriptor: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            descriptor: None,
        }
    }
}

impl Settings {
    /// Reads the process environment, after loading `.env` if there is one.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            state_file: var(STATE_FILE_VAR)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.state_file),
            descriptor: var(DESCRIPTOR_VAR)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// The descriptor file when one is configured, the hello stack otherwise.
    pub fn load_descriptor(&self) -> anyhow::Result<DeploymentDescriptor> {
        match self.descriptor.as_deref() {
            Some(path) => load_descriptor_file(path),
            None => solutions::hello::hello_stack(),
        }
    }
}

pub fn load_descriptor_file(path: &Path) -> anyhow::Result<DeploymentDescriptor> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read descriptor {}", path.display()))?;
    DeploymentDescriptor::from_json(&content)
        .with_context(|| format!("Invalid descriptor {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unset_variables_fall_back_to_defaults() {
        assert_eq!(Settings::from_vars(vars(&[])), Settings::default());
        assert_eq!(
            Settings::from_vars(vars(&[(STATE_FILE_VAR, "")])),
            Settings::default()
        );
    }

    #[test]
    fn variables_override_defaults() {
        let settings = Settings::from_vars(vars(&[
            (STATE_FILE_VAR, "/tmp/state.bin"),
            (DESCRIPTOR_VAR, "stack.json"),
        ]));
        assert_eq!(settings.state_file, PathBuf::from("/tmp/state.bin"));
        assert_eq!(settings.descriptor, Some(PathBuf::from("stack.json")));
    }

    #[test]
    fn descriptor_defaults_to_the_hello_stack() {
        let descriptor = Settings::default().load_descriptor().unwrap();
        assert_eq!(descriptor.name, solutions::hello::STACK_NAME);
    }

    #[test]
    fn descriptor_file_is_loaded_and_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.json");
        let stack = solutions::hello::hello_stack().unwrap();
        std::fs::write(&path, stack.to_json().unwrap()).unwrap();

        let settings = Settings {
            descriptor: Some(path.clone()),
            ..Default::default()
        };
        assert_eq!(settings.load_descriptor().unwrap(), stack);

        std::fs::write(&path, r#"{"name":"x","resources":[{"kind":"Endpoint","id":"A","handler":"B"}]}"#)
            .unwrap();
        assert!(settings.load_descriptor().is_err());
    }
}
