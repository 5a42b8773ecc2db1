use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod validator;
#[cfg(feature = "cli")]
pub mod watcher;

#[cfg(feature = "cli")]
use crate::cli::Cli;
use crate::template::{Template, DEFAULT_TYPE};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub form: FormSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Engine behavior shared by every form
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormSettings {
    /// Trim string and text inputs on read unless a field says otherwise
    #[serde(default)]
    pub trim_strings: bool,
    /// Type assumed by templates that omit `type`
    #[serde(default = "default_type")]
    pub default_type: String,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            trim_strings: false,
            default_type: default_type(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputSettings {
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            pretty: default_pretty(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_type() -> String {
    DEFAULT_TYPE.to_string()
}

fn default_pretty() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_root(".")
    }

    /// Create settings from CLI arguments (config file plus CLI overrides)
    #[cfg(feature = "cli")]
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let mut settings = Self::from_file(&cli.config)?;

        // CLI > env vars > config file
        settings.apply_cli_overrides(cli);
        settings.validate()?;

        Ok(settings)
    }

    #[cfg(feature = "cli")]
    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(trim) = cli.trim_strings {
            self.form.trim_strings = trim;
        }
        if let Some(default_type) = &cli.default_type {
            self.form.default_type = default_type.clone();
        }
        if cli.compact {
            self.output.pretty = false;
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load `formloom.toml` (or `.json`/`.yaml`) from `root`, if present
    pub fn from_root(root: &str) -> Result<Self, anyhow::Error> {
        let settings = Self::from_file(&Path::new(root).join("formloom"))?;
        settings.validate()?;
        Ok(settings)
    }

    fn from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .set_default("form.trim_strings", false)?
            .set_default("form.default_type", DEFAULT_TYPE)?
            .set_default("output.pretty", true)?
            .set_default("logging.level", "info")?
            .build()?;

        Ok(s.try_deserialize()?)
    }

    /// Validate, collecting every problem into one error
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }

    /// Load one template file, using the configured default type
    pub fn load_template(&self, path: &Path) -> Result<Template, anyhow::Error> {
        Template::load(path, &self.form.default_type)
            .map_err(|e| anyhow::anyhow!("Failed to load template {}: {}", path.display(), e))
    }
}

/// Load every `*.json`, `*.yaml`, `*.yml` and `*.toml` template in `path`,
/// sorted by file name. Unreadable templates are reported together.
pub fn load_templates_from_dir(
    path: &str,
    default_type: &str,
) -> Result<Vec<(PathBuf, Template)>, anyhow::Error> {
    let pattern = format!("{}/*", path);
    let mut templates = Vec::new();
    let mut failures = Vec::new();

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in glob::glob(&pattern)? {
        match entry {
            Ok(path) => paths.push(path),
            Err(e) => tracing::warn!("Failed to read glob entry: {}", e),
        }
    }
    paths.sort();

    for path in paths {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !matches!(ext, "json" | "yaml" | "yml" | "toml") {
            continue;
        }
        match Template::load(&path, default_type) {
            Ok(template) => templates.push((path, template)),
            Err(e) => failures.push(format!("{}: {}", path.display(), e)),
        }
    }

    if failures.is_empty() {
        tracing::debug!(count = templates.len(), dir = path, "Loaded templates");
        Ok(templates)
    } else {
        Err(anyhow::anyhow!(
            "Failed to load {} template(s):\n{}",
            failures.len(),
            failures.join("\n")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(!settings.form.trim_strings);
        assert_eq!(settings.form.default_type, "string");
        assert!(settings.output.pretty);
        assert_eq!(settings.logging.level, "info");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_from_root_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::from_root(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.form.default_type, "string");
    }

    #[test]
    fn test_from_root_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("formloom.toml"),
            "[form]\ntrim_strings = true\ndefault_type = \"text\"\n\n[output]\npretty = false\n",
        )
        .unwrap();
        let settings = Settings::from_root(dir.path().to_str().unwrap()).unwrap();
        assert!(settings.form.trim_strings);
        assert_eq!(settings.form.default_type, "text");
        assert!(!settings.output.pretty);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_from_root_rejects_unknown_type() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("formloom.toml"),
            "[form]\ndefault_type = \"spreadsheet\"\n",
        )
        .unwrap();
        let err = Settings::from_root(dir.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("form.default_type"));
    }
}
