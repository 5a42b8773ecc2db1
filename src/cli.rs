use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Formloom - render, edit and read back declarative form templates
#[derive(Parser, Debug, Clone)]
#[command(name = "formloom", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "FORMLOOM_CONFIG", default_value = "formloom.toml", global = true)]
    pub config: PathBuf,

    /// Trim string inputs on read (overrides form.trim_strings)
    #[arg(long, env = "FORMLOOM_TRIM_STRINGS", num_args = 0..=1, default_missing_value = "true", global = true)]
    pub trim_strings: Option<bool>,

    /// Type of template fields that name none (overrides form.default_type)
    #[arg(long, env = "FORMLOOM_DEFAULT_TYPE", global = true)]
    pub default_type: Option<String>,

    /// Print JSON on one line
    #[arg(long, global = true)]
    pub compact: bool,

    /// Log level (overrides logging.level)
    #[arg(long, env = "FORMLOOM_LOG", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build a form from a template and value and print what it reads back
    Render {
        #[command(flatten)]
        input: FormInput,

        /// Include fields that are currently hidden
        #[arg(long)]
        include_hidden: bool,

        /// Re-render whenever the template file changes
        #[arg(short, long)]
        watch: bool,
    },
    /// Build a form, apply edits as a user would, and print the result
    Edit {
        #[command(flatten)]
        input: FormInput,

        /// Edit as `path=value`, e.g. `tags[1].value=c`; applied in order
        #[arg(short, long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,

        /// Append an item to the array at this path before the edits
        #[arg(long = "add")]
        add: Vec<String>,

        /// Remove the array item at this resolved path (e.g. `tags[0]`) before the edits
        #[arg(long = "remove")]
        remove: Vec<String>,

        /// Include fields that are currently hidden
        #[arg(long)]
        include_hidden: bool,
    },
    /// List the fields a template renders for a value
    Fields {
        #[command(flatten)]
        input: FormInput,
    },
    /// Load every template in a directory and report problems
    Check {
        /// Directory of *.json, *.yaml, *.yml and *.toml templates
        dir: PathBuf,
    },
}

/// Template and starting value of a form
#[derive(clap::Args, Debug, Clone)]
pub struct FormInput {
    /// Template file (.json, .yaml, .yml or .toml)
    #[arg(short, long)]
    pub template: PathBuf,

    /// Initial value as a JSON file
    #[arg(short = 'v', long = "value", conflicts_with = "value_json")]
    pub value: Option<PathBuf>,

    /// Initial value as inline JSON
    #[arg(long = "json")]
    pub value_json: Option<String>,
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((path, value)) if !path.trim().is_empty() => {
            Ok((path.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected path=value, got '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["formloom", "render", "--template", "form.json"]);
        assert_eq!(cli.config, PathBuf::from("formloom.toml"));
        assert!(cli.trim_strings.is_none());
        assert!(cli.default_type.is_none());
        assert!(!cli.compact);
        match cli.command {
            Command::Render {
                input,
                include_hidden,
                watch,
            } => {
                assert_eq!(input.template, PathBuf::from("form.json"));
                assert!(input.value.is_none());
                assert!(!include_hidden);
                assert!(!watch);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_with_args() {
        let cli = Cli::parse_from([
            "formloom",
            "--config",
            "custom.toml",
            "--trim-strings",
            "--default-type",
            "text",
            "edit",
            "-t",
            "form.yaml",
            "--json",
            r#"{"name":"Al"}"#,
            "--add",
            "tags",
            "--set",
            "tags[0].value=c",
            "--set",
            "name=Bo=b",
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert_eq!(cli.trim_strings, Some(true));
        assert_eq!(cli.default_type, Some("text".to_string()));
        match cli.command {
            Command::Edit { input, set, add, .. } => {
                assert_eq!(input.value_json.as_deref(), Some(r#"{"name":"Al"}"#));
                assert_eq!(add, vec!["tags".to_string()]);
                assert_eq!(
                    set,
                    vec![
                        ("tags[0].value".to_string(), "c".to_string()),
                        ("name".to_string(), "Bo=b".to_string()),
                    ]
                );
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_assignment() {
        let result = Cli::try_parse_from(["formloom", "edit", "-t", "f.json", "--set", "novalue"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_fields_and_check_commands() {
        let cli = Cli::parse_from(["formloom", "check", "templates"]);
        assert!(matches!(cli.command, Command::Check { ref dir } if dir == &PathBuf::from("templates")));

        let cli = Cli::parse_from(["formloom", "fields", "-t", "f.json"]);
        match cli.command {
            Command::Fields { input } => assert_eq!(input.template, PathBuf::from("f.json")),
            _ => panic!("expected fields command"),
        }
    }
}
