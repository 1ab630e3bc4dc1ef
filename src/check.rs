//! Presence checks over raw connector configuration.
//!
//! Keys may be dotted paths (`"connection.url"`) that walk nested objects.
//! A key is missing when the path does not resolve or resolves to `null`.

use serde_json::Value;

use crate::errors::{Result, XaSinkError};

pub const CHECK_SUCCESS: &str = "All check is success";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    success: bool,
    message: String,
}

impl CheckResult {
    pub fn success() -> Self {
        Self {
            success: true,
            message: CHECK_SUCCESS.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Converts a failed check into [`XaSinkError::InvalidConfig`].
    pub fn into_result(self) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(XaSinkError::InvalidConfig(self.message))
        }
    }
}

fn lookup<'a>(config: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(config, |node, segment| node.get(segment))
        .filter(|value| !value.is_null())
}

/// Fails unless every key in `keys` is present and non-null. The message
/// lists all missing keys.
pub fn check(config: &Value, keys: &[&str]) -> CheckResult {
    let missing: Vec<&str> = keys
        .iter()
        .copied()
        .filter(|key| lookup(config, key).is_none())
        .collect();
    if missing.is_empty() {
        CheckResult::success()
    } else {
        CheckResult::error(format!(
            "please specify [{}] as non-empty",
            missing.join(",")
        ))
    }
}

/// Succeeds if at least one key in `keys` is present, or if `keys` is empty.
pub fn check_one(config: &Value, keys: &[&str]) -> CheckResult {
    if keys.is_empty() {
        return CheckResult {
            success: true,
            message: String::new(),
        };
    }
    if keys.iter().any(|key| lookup(config, key).is_some()) {
        CheckResult::success()
    } else {
        CheckResult::error(format!(
            "please specify at least one config of [{}] as non-empty",
            keys.join(",")
        ))
    }
}

/// Succeeds iff every result succeeded; otherwise joins all failure messages.
pub fn merge_check_message(results: &[CheckResult]) -> CheckResult {
    let failures: Vec<&str> = results
        .iter()
        .filter(|result| !result.success)
        .map(|result| result.message.as_str())
        .collect();
    if failures.is_empty() {
        CheckResult::success()
    } else {
        CheckResult::error(failures.join(","))
    }
}
