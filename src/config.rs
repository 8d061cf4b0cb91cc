use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::error::ToolError;

pub const DEFAULT_USER_CONFIG_PATH: &str = "./user_config.yaml";
pub const ACCESS_TOKEN_ENV: &str = "APEXCOV_ACCESS_TOKEN";

/// Raw on-disk shape of `user_config.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUserConfig {
    login_url: String,
    #[serde(default)]
    instance_url: Option<String>,
    api_version: String,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    template_file_path: Option<PathBuf>,
    #[serde(default)]
    result_file_path: Option<PathBuf>,
    warning_percent: f64,
    fatal_percent: f64,
    #[serde(default)]
    warning_color: Option<String>,
    #[serde(default)]
    fatal_color: Option<String>,
    #[serde(default)]
    below_mark: Option<String>,
    #[serde(default)]
    target_apex_class: Option<Vec<String>>,
    #[serde(default)]
    target_apex_test_class: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub warning_ratio: f64,
    pub fatal_ratio: f64,
}

impl Thresholds {
    /// Both thresholds must lie in [0, 1] and fatal may not exceed warning.
    pub fn new(warning_ratio: f64, fatal_ratio: f64) -> Result<Self, String> {
        for (name, value) in [("warningPercent", warning_ratio), ("fatalPercent", fatal_ratio)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} must be within [0, 1], got {value}"));
            }
        }
        if fatal_ratio > warning_ratio {
            return Err(format!(
                "fatalPercent ({fatal_ratio}) must not exceed warningPercent ({warning_ratio})"
            ));
        }
        Ok(Self {
            warning_ratio,
            fatal_ratio,
        })
    }

    pub fn is_below_warning(&self, ratio: f64) -> bool {
        ratio < self.warning_ratio
    }

    pub fn is_below_fatal(&self, ratio: f64) -> bool {
        ratio < self.fatal_ratio
    }
}

#[derive(Debug, Clone)]
pub struct ReportStyleConfig {
    pub warning_color: String,
    pub fatal_color: String,
    pub below_mark: String,
}

/// Resolved configuration, built once and passed by reference.
#[derive(Debug, Clone)]
pub struct UserConfig {
    pub source_path: PathBuf,
    pub login_url: String,
    pub instance_url: String,
    pub api_version: String,
    pub user_name: String,
    pub access_token: Option<String>,
    pub template_file_path: Option<PathBuf>,
    pub result_file_path: Option<PathBuf>,
    pub thresholds: Thresholds,
    pub report_style: ReportStyleConfig,
    pub target_apex_classes: Vec<String>,
    pub target_apex_test_classes: Vec<String>,
}

impl UserConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(configuration_error(path, "file not found").into());
        }

        let raw_text = fs::read_to_string(path)
            .map_err(|err| configuration_error(path, err.to_string()))
            .with_context(|| format!("failed to read {}", path.display()))?;

        Self::from_yaml_str(path, &raw_text)
    }

    pub fn from_yaml_str(path: &Path, yaml: &str) -> Result<Self> {
        let raw: RawUserConfig = serde_yaml_ng::from_str(yaml)
            .map_err(|err| configuration_error(path, err.to_string()))
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let thresholds = Thresholds::new(raw.warning_percent, raw.fatal_percent)
            .map_err(|reason| configuration_error(path, reason))?;

        let access_token = raw
            .access_token
            .filter(|value| !value.trim().is_empty())
            .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok())
            .map(|value| value.trim().to_string());

        let instance_url = raw
            .instance_url
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| raw.login_url.clone());

        Ok(Self {
            source_path: path.to_path_buf(),
            login_url: raw.login_url,
            instance_url,
            api_version: raw.api_version,
            user_name: raw.user_name.unwrap_or_default(),
            access_token,
            template_file_path: raw.template_file_path,
            result_file_path: raw.result_file_path,
            thresholds,
            report_style: ReportStyleConfig {
                warning_color: raw.warning_color.unwrap_or_else(|| "ffff00".to_string()),
                fatal_color: raw.fatal_color.unwrap_or_else(|| "ff0000".to_string()),
                below_mark: raw.below_mark.unwrap_or_else(|| "*".to_string()),
            },
            target_apex_classes: normalize_names(raw.target_apex_class),
            target_apex_test_classes: normalize_names(raw.target_apex_test_class),
        })
    }

    pub fn template_file_path(&self) -> Result<&Path> {
        self.template_file_path
            .as_deref()
            .ok_or_else(|| configuration_error(&self.source_path, "templateFilePath is not set"))
            .map_err(Into::into)
    }

    pub fn result_file_path(&self) -> Result<&Path> {
        self.result_file_path
            .as_deref()
            .ok_or_else(|| configuration_error(&self.source_path, "resultFilePath is not set"))
            .map_err(Into::into)
    }

    pub fn log_settings(&self) {
        info!(
            login_url = %self.login_url,
            instance_url = %self.instance_url,
            api_version = %self.api_version,
            user_name = %self.user_name,
            template_file_path = %display_optional_path(self.template_file_path.as_deref()),
            result_file_path = %display_optional_path(self.result_file_path.as_deref()),
            warning_percent = self.thresholds.warning_ratio,
            fatal_percent = self.thresholds.fatal_ratio,
            target_apex_class = %self.target_apex_classes.join(","),
            target_apex_test_class = %self.target_apex_test_classes.join(","),
            "loaded settings"
        );
    }
}

fn normalize_names(values: Option<Vec<String>>) -> Vec<String> {
    values
        .unwrap_or_default()
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn display_optional_path(path: Option<&Path>) -> String {
    path.map(|value| value.display().to_string())
        .unwrap_or_default()
}

fn configuration_error(path: &Path, reason: impl Into<String>) -> ToolError {
    ToolError::Configuration {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
