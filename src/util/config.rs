//! Configuration file support for portcfg.
//!
//! portcfg supports two configuration file locations:
//! - Global: `~/.portcfg/config.toml` - User-wide defaults
//! - Project: `.portcfg/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::{BuildFacts, CapabilityTable, TableOverrides};
use crate::emit::OutputFormat;
use crate::resolver::SymbolNames;

/// portcfg configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output settings
    pub output: OutputConfig,

    /// Capability table overrides
    #[serde(skip_serializing_if = "TableOverrides::is_empty")]
    pub thresholds: TableOverrides,

    /// Facts added to every probed or loaded configuration
    pub facts: FactsConfig,
}

/// Output-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Symbol prefix (default `PORTCFG`)
    pub prefix: Option<String>,

    /// Include guard of the generated header
    pub include_guard: Option<String>,

    /// Generated config header to include unless `<PREFIX>_NO_CONFIG` is set
    pub config_header: Option<String>,

    /// Default output format
    pub format: Option<OutputFormat>,
}

/// Facts the preprocessor cannot see.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactsConfig {
    /// Functions known to exist (e.g. `pthread_yield`)
    pub functions: Vec<String>,

    /// Headers known to exist
    pub headers: Vec<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.output.prefix.is_some() {
            self.output.prefix = other.output.prefix;
        }
        if other.output.include_guard.is_some() {
            self.output.include_guard = other.output.include_guard;
        }
        if other.output.config_header.is_some() {
            self.output.config_header = other.output.config_header;
        }
        if other.output.format.is_some() {
            self.output.format = other.output.format;
        }

        self.thresholds.merge(other.thresholds);

        for f in other.facts.functions {
            if !self.facts.functions.contains(&f) {
                self.facts.functions.push(f);
            }
        }
        for h in other.facts.headers {
            if !self.facts.headers.contains(&h) {
                self.facts.headers.push(h);
            }
        }
    }

    /// Symbol names under the configured prefix.
    pub fn names(&self) -> SymbolNames {
        self.output
            .prefix
            .as_deref()
            .map(SymbolNames::new)
            .unwrap_or_default()
    }

    /// The builtin capability table with configured overrides applied.
    pub fn table(&self) -> CapabilityTable {
        CapabilityTable::builtin().with_overrides(&self.thresholds)
    }

    /// Add the configured facts to `facts`.
    pub fn apply_facts(&self, facts: &mut BuildFacts) {
        facts
            .features
            .functions
            .extend(self.facts.functions.iter().cloned());
        facts
            .features
            .headers
            .extend(self.facts.headers.iter().cloned());
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.portcfg/config.toml)
/// 2. Global config (~/.portcfg/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    // Project config overrides global
    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global portcfg config directory (~/.portcfg).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".portcfg"))
}

/// Get the global config path (~/.portcfg/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.portcfg/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".portcfg").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CompilerFamily, Version};
    use tempfile::TempDir;

    #[test]
    fn test_parse_config() {
        let config: Config = toml::from_str(
            r#"
[output]
prefix = "FOLLY"
config_header = "folly-config.h"
format = "json"

[thresholds.late_binding]
gcc = "4.8"

[facts]
functions = ["pthread_yield"]
"#,
        )
        .unwrap();

        assert_eq!(config.output.prefix.as_deref(), Some("FOLLY"));
        assert_eq!(config.output.format, Some(OutputFormat::Json));
        assert_eq!(config.names().noreturn(), "FOLLY_NORETURN");
        assert_eq!(
            config.table().late_binding_min(&CompilerFamily::Gcc),
            Some(Version::new(4, 8))
        );
        assert_eq!(config.facts.functions, vec!["pthread_yield"]);
    }

    #[test]
    fn test_default_names() {
        assert_eq!(Config::default().names().prefix(), "PORTCFG");
    }

    #[test]
    fn test_project_overrides_global() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let project = project_config_path(tmp.path());

        std::fs::write(
            &global,
            "[output]\nprefix = \"GLOBAL\"\ninclude_guard = \"G_H\"\n[facts]\nfunctions = [\"a\"]\n",
        )
        .unwrap();
        std::fs::create_dir_all(project.parent().unwrap()).unwrap();
        std::fs::write(
            &project,
            "[output]\nprefix = \"PROJECT\"\n[facts]\nfunctions = [\"a\", \"b\"]\n",
        )
        .unwrap();

        let config = load_config(Some(&global), &project);
        assert_eq!(config.output.prefix.as_deref(), Some("PROJECT"));
        assert_eq!(config.output.include_guard.as_deref(), Some("G_H"));
        assert_eq!(config.facts.functions, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_files_give_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(None, &project_config_path(tmp.path()));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_apply_facts() {
        let mut facts = BuildFacts::for_compiler(CompilerFamily::Gcc, Version::new(9, 0));
        let config = Config {
            facts: FactsConfig {
                functions: vec!["pthread_yield".into()],
                headers: vec!["sched.h".into()],
            },
            ..Default::default()
        };

        config.apply_facts(&mut facts);
        assert!(facts.features.has_function("pthread_yield"));
        assert!(facts.features.has_header("sched.h"));
    }
}
