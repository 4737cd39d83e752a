//! Application configuration, loaded once at startup from `config.json`.
//!
//! ```json
//! {
//!   "app_title": "Tightening results",
//!   "numeric_columns": ["M[Nm]", "T[s]"],
//!   "default_tabs": ["M[Nm]", "T[s]"],
//!   "x_y_defaults": { "x": "T[s]", "y": "M[Nm]" },
//!   "plot_colors": {
//!     "main_palette": "Plotly",
//!     "trendline": { "color": "black", "style": "dash" }
//!   },
//!   "css_style": { "font": "Arial" }
//! }
//! ```
//!
//! Every key above is required except `css_style`. Validation happens in
//! [`AppConfig::validate`], called by both constructors, so a config that
//! loads is always usable.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::{named_palette, parse_color, PALETTE_NAMES};
use crate::data::model::Schema;
use crate::error::ConfigError;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "RUSTY_TORQUE_CONFIG";

/// Config file looked up in the working directory by default.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub app_title: String,
    /// Presentation only; the UI shell may ignore it.
    #[serde(default)]
    pub page_icon: Option<String>,
    /// Ordered list of columns eligible for metrics and charts.
    pub numeric_columns: Vec<String>,
    /// Numeric columns rendered as grouped box plots.
    pub default_tabs: Vec<String>,
    pub x_y_defaults: XyDefaults,
    pub plot_colors: PlotColors,
    /// Presentation only, never read by the pipeline.
    #[serde(default)]
    pub css_style: BTreeMap<String, String>,
    #[serde(default)]
    pub columns: ColumnNames,
    /// Columns whose mean is reported as a KPI. Defaults to every numeric
    /// column.
    #[serde(default)]
    pub kpi_columns: Option<Vec<String>>,
    #[serde(default = "default_markers")]
    pub nonconforming_markers: Vec<String>,
    #[serde(default)]
    pub export: ExportSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct XyDefaults {
    pub x: String,
    pub y: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlotColors {
    pub main_palette: String,
    pub trendline: TrendlineStyle,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TrendlineStyle {
    pub color: String,
    pub style: DashStyle,
}

/// Dash pattern of a trend overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DashStyle {
    Solid,
    Dot,
    Dash,
    LongDash,
    DashDot,
    LongDashDot,
}

/// Names of the two categorical columns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnNames {
    #[serde(default = "default_result_column")]
    pub result: String,
    #[serde(default = "default_program_column")]
    pub program: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            result: default_result_column(),
            program: default_program_column(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExportSettings {
    #[serde(default = "default_export_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_file_stem")]
    pub file_stem: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_export_timeout(),
            file_stem: default_file_stem(),
        }
    }
}

fn default_markers() -> Vec<String> {
    ["ERR", "W", "L", "T"].iter().map(|m| m.to_string()).collect()
}

fn default_result_column() -> String {
    "Result.".to_string()
}

fn default_program_column() -> String {
    "Prog.".to_string()
}

fn default_export_timeout() -> u64 {
    30
}

fn default_file_stem() -> String {
    "rapport".to_string()
}

impl AppConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a config from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every cross-field constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_title.trim().is_empty() {
            return Err(invalid("app_title must not be empty"));
        }
        if self.numeric_columns.is_empty() {
            return Err(invalid("numeric_columns must list at least one column"));
        }
        let mut seen = BTreeSet::new();
        for col in &self.numeric_columns {
            if col.trim() != col || col.is_empty() {
                return Err(invalid(format!(
                    "numeric column '{col}' must be non-empty and trimmed"
                )));
            }
            if !seen.insert(col.as_str()) {
                return Err(invalid(format!("numeric column '{col}' is listed twice")));
            }
        }
        for col in [&self.columns.result, &self.columns.program] {
            if seen.contains(col.as_str()) {
                return Err(invalid(format!(
                    "'{col}' cannot be both categorical and numeric"
                )));
            }
        }
        if self.columns.result == self.columns.program {
            return Err(invalid("result and program columns must differ"));
        }

        self.require_numeric("default_tabs", &self.default_tabs)?;
        self.require_numeric("x_y_defaults.x", std::slice::from_ref(&self.x_y_defaults.x))?;
        self.require_numeric("x_y_defaults.y", std::slice::from_ref(&self.x_y_defaults.y))?;
        if let Some(kpis) = &self.kpi_columns {
            self.require_numeric("kpi_columns", kpis)?;
        }

        if named_palette(&self.plot_colors.main_palette).is_none() {
            return Err(invalid(format!(
                "unknown palette '{}' (expected one of {})",
                self.plot_colors.main_palette,
                PALETTE_NAMES.join(", ")
            )));
        }
        if parse_color(&self.plot_colors.trendline.color).is_none() {
            return Err(invalid(format!(
                "trendline colour '{}' is neither a hex code nor a CSS colour name",
                self.plot_colors.trendline.color
            )));
        }

        if self.nonconforming_markers.iter().any(|m| m.is_empty()) {
            return Err(invalid("nonconforming_markers must not contain empty strings"));
        }
        if self.export.timeout_secs == 0 {
            return Err(invalid("export.timeout_secs must be positive"));
        }
        if self.export.file_stem.trim().is_empty() {
            return Err(invalid("export.file_stem must not be empty"));
        }
        Ok(())
    }

    fn require_numeric(&self, key: &str, columns: &[String]) -> Result<(), ConfigError> {
        match columns.iter().find(|c| !self.is_numeric(c)) {
            Some(col) => Err(invalid(format!(
                "{key}: '{col}' is not listed in numeric_columns"
            ))),
            None => Ok(()),
        }
    }

    /// Whether `column` is one of the configured numeric columns.
    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric_columns.iter().any(|c| c == column)
    }

    /// Columns whose means are reported as KPIs.
    pub fn kpi_columns(&self) -> &[String] {
        self.kpi_columns.as_deref().unwrap_or(&self.numeric_columns)
    }

    /// Colour sequence of the configured palette.
    pub fn palette(&self) -> Vec<String> {
        named_palette(&self.plot_colors.main_palette).unwrap_or_default()
    }

    /// The column contract a loaded table must satisfy.
    pub fn schema(&self) -> Schema {
        Schema {
            result_column: self.columns.result.clone(),
            program_column: self.columns.program.clone(),
            numeric_columns: self.numeric_columns.clone(),
        }
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_secs(self.export.timeout_secs)
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "app_title": "Tightening results",
        "page_icon": "🔧",
        "numeric_columns": ["M[Nm]", "T[s]", "Angle[deg]"],
        "default_tabs": ["M[Nm]", "T[s]"],
        "x_y_defaults": { "x": "T[s]", "y": "M[Nm]" },
        "plot_colors": {
            "main_palette": "Set2",
            "trendline": { "color": "black", "style": "dash" }
        },
        "css_style": { "font": "Arial", "max_width": "1400px" }
    }"#;

    #[test]
    fn test_sample_config_loads_with_defaults() {
        let config = AppConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.app_title, "Tightening results");
        assert_eq!(config.columns, ColumnNames::default());
        assert_eq!(config.nonconforming_markers, vec!["ERR", "W", "L", "T"]);
        assert_eq!(config.kpi_columns(), config.numeric_columns.as_slice());
        assert_eq!(config.plot_colors.trendline.style, DashStyle::Dash);
        assert_eq!(config.export_timeout(), Duration::from_secs(30));
        assert_eq!(config.palette()[0], "#66C2A5");
    }

    #[test]
    fn test_missing_required_key_fails_fast() {
        let text = SAMPLE.replace(r#""app_title": "Tightening results","#, "");
        let err = AppConfig::from_json_str(&text).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("app_title"));
    }

    #[test]
    fn test_default_tab_must_be_numeric() {
        let text = SAMPLE.replace(r#""default_tabs": ["M[Nm]", "T[s]"]"#, r#""default_tabs": ["Torque"]"#);
        let err = AppConfig::from_json_str(&text).unwrap_err();
        assert!(err.to_string().contains("Torque"));
    }

    #[test]
    fn test_xy_defaults_must_be_numeric() {
        let text = SAMPLE.replace(r#""x": "T[s]""#, r#""x": "Speed""#);
        assert!(matches!(
            AppConfig::from_json_str(&text),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_unknown_palette_is_rejected() {
        let text = SAMPLE.replace("Set2", "Neon");
        let err = AppConfig::from_json_str(&text).unwrap_err();
        assert!(err.to_string().contains("Neon"));
    }

    #[test]
    fn test_bad_trend_colour_and_style_are_rejected() {
        let text = SAMPLE.replace(r#""color": "black""#, r#""color": "blackish""#);
        assert!(AppConfig::from_json_str(&text).is_err());
        let text = SAMPLE.replace(r#""style": "dash""#, r#""style": "zigzag""#);
        assert!(matches!(
            AppConfig::from_json_str(&text),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_duplicate_numeric_column_is_rejected() {
        let text = SAMPLE.replace(r#"["M[Nm]", "T[s]", "Angle[deg]"]"#, r#"["M[Nm]", "M[Nm]"]"#);
        let text = text.replace(r#""default_tabs": ["M[Nm]", "T[s]"]"#, r#""default_tabs": []"#);
        let text = text.replace(r#""x": "T[s]""#, r#""x": "M[Nm]""#);
        let err = AppConfig::from_json_str(&text).unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = AppConfig::load(&dir.path().join("config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_schema_mirrors_config() {
        let config = AppConfig::from_json_str(SAMPLE).unwrap();
        let schema = config.schema();
        assert_eq!(schema.result_column, "Result.");
        assert_eq!(schema.program_column, "Prog.");
        assert_eq!(schema.numeric_columns.len(), 3);
    }
}
