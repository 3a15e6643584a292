//! `vni.toml` configuration.
//!
//! Every section and key is optional. Command line flags are applied on top of the file.

use crate::compiler_frontend::analysis::name_inference::InferenceOptions;
use crate::compiler_frontend::compiler_errors::CompilerError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "vni.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub inference: InferenceSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceSettings {
    /// Look through every call with a self parameter, not only coroutine accessors.
    pub infer_self_through_all_accessors: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    /// Run independent queries on the rayon thread pool.
    pub parallel_queries: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            parallel_queries: true,
        }
    }
}

impl Config {
    pub fn from_toml_str(source: &str, path: &Path) -> Result<Config, CompilerError> {
        toml::from_str(source).map_err(|error| {
            CompilerError::config_error(path, format!("Could not parse {}: {error}", path.display()))
        })
    }

    pub fn load(path: &Path) -> Result<Config, CompilerError> {
        let source = fs::read_to_string(path).map_err(|error| {
            CompilerError::file_error(path, format!("Could not read config file: {error}"))
        })?;

        Config::from_toml_str(&source, path)
    }

    /// Loads `vni.toml` from `dir` when it exists, otherwise the defaults.
    pub fn load_from_dir(dir: &Path) -> Result<Config, CompilerError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Config::default());
        }

        Config::load(&path)
    }

    pub fn inference_options(&self) -> InferenceOptions {
        if self.inference.infer_self_through_all_accessors {
            InferenceOptions::INFER_SELF_THROUGH_ALL_ACCESSORS
        } else {
            InferenceOptions::NONE
        }
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
