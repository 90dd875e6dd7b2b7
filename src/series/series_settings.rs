//! Tunable parameters of compilation and evaluation.
//!
//! Settings can be built in code or read from a sectioned document:
//! ```text
//! integral
//!   steps: 1000
//!   max_delta_steps: 100000
//! evaluation
//!   real_tolerance: 1e-10
//!   max_depth: 512
//!   fold_constants: true
//! logging
//!   loglevel: info
//! ```
use crate::Utils::logger::parse_loglevel;
use crate::Utils::settings_parser::{Value, parse_document};
use crate::series::series_errors::SettingsError;
use log::info;
use std::fs;
use std::path::Path;

pub const DEFAULT_INTEGRAL_STEPS: usize = 1000;
pub const DEFAULT_MAX_DELTA_STEPS: usize = 100_000;
pub const DEFAULT_REAL_TOLERANCE: f64 = 1e-10;
pub const DEFAULT_MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSettings {
    /// Riemann steps of a cold integral
    pub integral_steps: usize,
    /// upper clamp for the steps of one boundary delta of a cached integral
    pub max_delta_steps: usize,
    /// imaginary parts below this are dropped when a real value is requested
    pub real_tolerance: f64,
    /// deepest expression tree accepted by the compiler
    pub max_depth: usize,
    /// pre-evaluate variable-free subtrees at compile time
    pub fold_constants: bool,
    /// debug, info, warn, error or off; `None` leaves logging untouched
    pub loglevel: Option<String>,
}

impl Default for SeriesSettings {
    fn default() -> Self {
        Self {
            integral_steps: DEFAULT_INTEGRAL_STEPS,
            max_delta_steps: DEFAULT_MAX_DELTA_STEPS,
            real_tolerance: DEFAULT_REAL_TOLERANCE,
            max_depth: DEFAULT_MAX_DEPTH,
            fold_constants: true,
            loglevel: None,
        }
    }
}

fn single<'a>(
    section: &str,
    key: &str,
    values: &'a [Value],
) -> Result<&'a Value, SettingsError> {
    match values {
        [value] => Ok(value),
        _ => Err(SettingsError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(","),
        }),
    }
}

fn invalid(section: &str, key: &str, value: &Value) -> SettingsError {
    SettingsError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn positive_integer(section: &str, key: &str, value: &Value) -> Result<usize, SettingsError> {
    value
        .as_integer()
        .filter(|v| *v > 0)
        .map(|v| v as usize)
        .ok_or_else(|| invalid(section, key, value))
}

impl SeriesSettings {
    /// Reads settings from a document; keys that are absent keep their defaults.
    pub fn from_document(document: &str) -> Result<Self, SettingsError> {
        let parsed = parse_document(document).map_err(SettingsError::Parse)?;
        let mut settings = SeriesSettings::default();
        for (section, pairs) in &parsed {
            for (key, values) in pairs {
                let value = single(section, key, values)?;
                match (section.as_str(), key.as_str()) {
                    ("integral", "steps") => {
                        settings.integral_steps = positive_integer(section, key, value)?;
                    }
                    ("integral", "max_delta_steps") => {
                        settings.max_delta_steps = positive_integer(section, key, value)?;
                    }
                    ("evaluation", "real_tolerance") => {
                        settings.real_tolerance = value
                            .as_float()
                            .filter(|v| *v >= 0.0 && v.is_finite())
                            .ok_or_else(|| invalid(section, key, value))?;
                    }
                    ("evaluation", "max_depth") => {
                        settings.max_depth = positive_integer(section, key, value)?;
                    }
                    ("evaluation", "fold_constants") => {
                        settings.fold_constants = value
                            .as_boolean()
                            .ok_or_else(|| invalid(section, key, value))?;
                    }
                    ("logging", "loglevel") => {
                        let level = value.to_string();
                        if parse_loglevel(&level).is_none() {
                            return Err(invalid(section, key, value));
                        }
                        settings.loglevel = Some(level);
                    }
                    _ => {
                        return Err(SettingsError::UnknownKey {
                            section: section.clone(),
                            key: key.clone(),
                        });
                    }
                }
            }
        }
        Ok(settings)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let document = fs::read_to_string(path.as_ref())?;
        let settings = Self::from_document(&document)?;
        info!("series settings loaded from {}", path.as_ref().display());
        Ok(settings)
    }
}
