use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::check::{CheckResult, check, merge_check_message};
use crate::errors::{Result, XaSinkError};

pub const URL: &str = "url";
pub const USER: &str = "user";
pub const PASSWORD: &str = "password";
pub const MAX_COMMIT_ATTEMPTS: &str = "max_commit_attempts";
pub const TREAT_UNKNOWN_AS_SUCCESS: &str = "treat_unknown_as_success";

pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 3;

fn default_max_commit_attempts() -> u32 {
    DEFAULT_MAX_COMMIT_ATTEMPTS
}

/// Options of an exactly-once sink consumed by the aggregated committer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkOptions {
    /// Connection target of the transactional store.
    pub url: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Attempts allowed per branch before its commit is declared fatal.
    #[serde(default = "default_max_commit_attempts")]
    pub max_commit_attempts: u32,
    /// Treat a branch the store does not know as already committed.
    #[serde(default)]
    pub treat_unknown_as_success: bool,
}

impl SinkOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: None,
            password: None,
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
            treat_unknown_as_success: false,
        }
    }

    pub fn with_max_commit_attempts(mut self, max_commit_attempts: u32) -> Self {
        self.max_commit_attempts = max_commit_attempts;
        self
    }

    pub fn with_treat_unknown_as_success(mut self, enabled: bool) -> Self {
        self.treat_unknown_as_success = enabled;
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Checks raw configuration before it is deserialized. All problems are
    /// reported together in one message.
    pub fn validate(config: &Value) -> CheckResult {
        merge_check_message(&[check(config, &[URL]), check_max_commit_attempts(config)])
    }

    /// Validates and deserializes options from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`XaSinkError::InvalidConfig`] when required keys are missing
    /// or a value has the wrong type.
    pub fn from_value(config: &Value) -> Result<Self> {
        Self::validate(config).into_result()?;
        serde_json::from_value(config.clone()).map_err(|e| XaSinkError::InvalidConfig(e.to_string()))
    }

    /// Reads options from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Value = serde_json::from_str(&text)
            .map_err(|e| XaSinkError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_value(&config)
    }
}

fn check_max_commit_attempts(config: &Value) -> CheckResult {
    match config.get(MAX_COMMIT_ATTEMPTS) {
        None | Some(Value::Null) => CheckResult::success(),
        Some(value) if value.as_u64().is_some_and(|n| n > 0) => CheckResult::success(),
        Some(value) => CheckResult::error(format!(
            "[{}] must be a positive integer, got {}",
            MAX_COMMIT_ATTEMPTS, value
        )),
    }
}
