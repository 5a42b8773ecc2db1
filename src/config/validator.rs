use thiserror::Error;

use crate::config::{FormSettings, LoggingSettings, Settings};
use crate::input::InputKind;

/// Log levels accepted by `logging.level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_form(&settings.form) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_logging(&settings.logging) {
            errors.extend(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_form(form: &FormSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if form.default_type.is_empty() {
            errors.push(ValidationError::MissingField("form.default_type".to_string()));
        } else if InputKind::from_type_name(&form.default_type).is_none() {
            // Only input types make sense for fields that name no type at all
            errors.push(ValidationError::InvalidValue {
                field: "form.default_type".to_string(),
                reason: format!("'{}' is not an input type", form.default_type),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_logging(logging: &LoggingSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let level = logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            errors.push(ValidationError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!(
                    "'{}' is not one of {}",
                    logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(ConfigValidator::validate(&Settings::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut settings = Settings::default();
        settings.form.default_type = "array".to_string();
        settings.logging.level = "loud".to_string();

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("form.default_type"));
        assert!(errors[1].to_string().contains("logging.level"));
    }

    #[test]
    fn test_empty_default_type() {
        let mut settings = Settings::default();
        settings.form.default_type.clear();
        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert!(matches!(&errors[0], ValidationError::MissingField(f) if f == "form.default_type"));
    }

    #[test]
    fn test_level_is_case_insensitive() {
        let mut settings = Settings::default();
        settings.logging.level = "DEBUG".to_string();
        assert!(ConfigValidator::validate(&settings).is_ok());
    }
}
