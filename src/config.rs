//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/unravel/unravel.toml`
//! 3. Explicit config file (`--config <file>`)
//! 4. Environment variables: `UNRAVEL_*` prefix
//!
//! Command-line flags are applied on top by the CLI layer.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{UnravelOptions, DEFAULT_WINDOW_HALF_LENGTH};

/// Unified configuration for unravel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Segments on each side of the unravelled one used for direction estimation
    pub window_half_length: usize,
    /// File extensions treated as morphologies in directory runs (case-insensitive)
    pub extensions: Vec<String>,
    /// Process the files of a directory run in parallel
    pub parallel: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_half_length: DEFAULT_WINDOW_HALF_LENGTH,
            extensions: vec!["swc".into()],
            parallel: true,
        }
    }
}

/// Raw settings for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub window_half_length: Option<usize>,
    pub extensions: Option<Vec<String>>,
    pub parallel: Option<bool>,
}

/// Get the XDG config directory for unravel.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "unravel").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("unravel.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Options for the unravelling algorithm.
    pub fn unravel_options(&self) -> UnravelOptions {
        UnravelOptions::with_window_half_length(self.window_half_length)
    }

    /// Overlay wins for every field it specifies.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            window_half_length: overlay
                .window_half_length
                .unwrap_or(self.window_half_length),
            extensions: overlay
                .extensions
                .clone()
                .unwrap_or_else(|| self.extensions.clone()),
            parallel: overlay.parallel.unwrap_or(self.parallel),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `explicit` - Optional config file given on the command line; it must exist
    pub fn load(explicit: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            current = current.merge_with(&load_raw_settings(path)?);
        }

        Self::apply_env_overrides(current, Self::environment())?.validate()
    }

    /// Only SWC can be read, so `extensions` may only spell `swc` differently.
    fn validate(self) -> Result<Self, ApplicationError> {
        if self.extensions.is_empty() {
            return Err(ApplicationError::Config {
                message: "extensions: at least one extension is required".into(),
            });
        }
        if let Some(ext) = self
            .extensions
            .iter()
            .find(|ext| !ext.trim_start_matches('.').eq_ignore_ascii_case("swc"))
        {
            return Err(ApplicationError::Config {
                message: format!("extensions: unsupported morphology format '{ext}', only swc is supported"),
            });
        }
        Ok(self)
    }

    fn environment() -> Environment {
        Environment::with_prefix("UNRAVEL")
            .prefix_separator("_")
            .separator("__")
    }

    /// Apply UNRAVEL_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self, source: Environment) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(source)
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("window_half_length") {
            settings.window_half_length = val.trim().parse().map_err(|_| ApplicationError::Config {
                message: format!("UNRAVEL_WINDOW_HALF_LENGTH: not a non-negative integer: {val}"),
            })?;
        }
        if let Ok(val) = config.get_string("extensions") {
            settings.extensions = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(val) = config.get_string("parallel") {
            settings.parallel = val.trim().parse().map_err(|_| ApplicationError::Config {
                message: format!("UNRAVEL_PARALLEL: expected true or false: {val}"),
            })?;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# unravel configuration
#
# Locations (by precedence, lowest to highest):
#   Global:   ~/.config/unravel/unravel.toml
#   Explicit: --config <file>
#   Env:      UNRAVEL_* environment variables
#   Flags:    --window-half-length, --sequential

# Segments on each side of a segment used to estimate its direction
# window_half_length = 5

# Extensions of morphology files picked up by `unravel dir`.
# Only SWC is supported; entries may differ in case or carry a leading dot.
# extensions = ["swc"]

# Unravel the files of a directory in parallel
# parallel = true
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn env_source(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::environment().source(Some(map))
    }

    #[test]
    fn given_defaults_when_created_then_window_is_five() {
        let settings = Settings::default();
        assert_eq!(settings.window_half_length, 5);
        assert_eq!(settings.extensions, vec!["swc".to_string()]);
        assert!(settings.parallel);
        assert_eq!(settings.unravel_options(), UnravelOptions::default());
    }

    #[test]
    fn given_partial_overlay_when_merging_then_keeps_unspecified_fields() {
        let overlay = RawSettings {
            window_half_length: Some(2),
            ..RawSettings::default()
        };

        let merged = Settings::default().merge_with(&overlay);

        assert_eq!(merged.window_half_length, 2);
        assert_eq!(merged.extensions, vec!["swc".to_string()]);
        assert!(merged.parallel);
    }

    #[test]
    fn given_env_vars_when_applying_overrides_then_replaces_values() {
        let source = env_source(&[
            ("UNRAVEL_WINDOW_HALF_LENGTH", "3"),
            ("UNRAVEL_EXTENSIONS", "swc, .SWC"),
            ("UNRAVEL_PARALLEL", "false"),
        ]);

        let settings = Settings::apply_env_overrides(Settings::default(), source).unwrap();

        assert_eq!(settings.window_half_length, 3);
        assert_eq!(settings.extensions, vec!["swc".to_string(), ".SWC".to_string()]);
        assert!(!settings.parallel);
    }

    #[test]
    fn given_negative_window_env_var_when_applying_overrides_then_fails() {
        let source = env_source(&[("UNRAVEL_WINDOW_HALF_LENGTH", "-1")]);

        let result = Settings::apply_env_overrides(Settings::default(), source);

        assert!(matches!(result, Err(ApplicationError::Config { .. })));
    }

    #[rstest]
    #[case(vec!["swc"], true)]
    #[case(vec!["SWC", ".swc"], true)]
    #[case(vec!["swc", "asc"], false)]
    #[case(vec!["h5"], false)]
    #[case(vec![], false)]
    fn given_extensions_when_validating_then_only_swc_spellings_pass(
        #[case] extensions: Vec<&str>,
        #[case] valid: bool,
    ) {
        let settings = Settings {
            extensions: extensions.into_iter().map(String::from).collect(),
            ..Settings::default()
        };

        let result = settings.validate();

        assert_eq!(result.is_ok(), valid, "{:?}", result);
    }

    #[test]
    fn given_settings_when_serializing_then_template_keys_match() {
        let toml = Settings::default().to_toml().unwrap();
        let parsed: RawSettings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.window_half_length, Some(5));

        // Template is valid TOML with every key commented out
        let template: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(template.window_half_length.is_none());
    }
}
