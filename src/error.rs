// ⚠️ Error taxonomy for the update pipeline
//
// Input problems and lookups that come up empty are reported per item.
// Registry I/O arrives as anyhow::Error from the storage layer and is
// captured as a system failure without stopping the batch.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Problems with the raw request itself; never retried
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("vehicle name is empty")]
    EmptyName,

    #[error("vehicle name is too long ({len} characters, max {max})")]
    NameTooLong { len: usize, max: usize },

    #[error("unknown status '{raw}'; allowed values: {allowed}")]
    UnknownStatus { raw: String, allowed: String },
}

/// Per-item failure while applying a status update
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("vehicle not found")]
    NotFound { suggestions: Vec<String> },

    /// Reserved: the current transition policy permits every change
    #[error("transition rejected: {0}")]
    Transition(String),

    #[error("registry error: {0:#}")]
    System(#[from] anyhow::Error),
}

impl UpdateError {
    pub fn kind(&self) -> FailureKind {
        match self {
            UpdateError::Input(_) => FailureKind::Input,
            UpdateError::NotFound { .. } => FailureKind::NotFound,
            UpdateError::Transition(_) => FailureKind::Transition,
            UpdateError::System(_) => FailureKind::System,
        }
    }

    /// Suggested alternate names (only populated for NotFound)
    pub fn suggestions(&self) -> &[String] {
        match self {
            UpdateError::NotFound { suggestions } => suggestions,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Input,
    NotFound,
    Transition,
    System,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Input => "input",
            FailureKind::NotFound => "not_found",
            FailureKind::Transition => "transition",
            FailureKind::System => "system",
        }
    }
}

/// Check a raw vehicle name before it reaches the resolver
///
/// Returns the trimmed name.
pub fn validate_vehicle_name(raw: &str, max_len: usize) -> Result<&str, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InputError::EmptyName);
    }

    let len = trimmed.chars().count();
    if len > max_len {
        return Err(InputError::NameTooLong { len, max: max_len });
    }

    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_vehicle_name() {
        assert_eq!(validate_vehicle_name("  Audi RS6 ", 100).unwrap(), "Audi RS6");
        assert_eq!(validate_vehicle_name("   ", 100), Err(InputError::EmptyName));
        assert_eq!(
            validate_vehicle_name("abcdef", 5),
            Err(InputError::NameTooLong { len: 6, max: 5 })
        );
    }

    #[test]
    fn test_update_error_kinds() {
        let not_found = UpdateError::NotFound {
            suggestions: vec!["Audi RS6".to_string()],
        };
        assert_eq!(not_found.kind(), FailureKind::NotFound);
        assert_eq!(not_found.to_string(), "vehicle not found");
        assert_eq!(not_found.suggestions().len(), 1);

        let system = UpdateError::from(anyhow::anyhow!("disk full"));
        assert_eq!(system.kind(), FailureKind::System);
        assert!(system.to_string().contains("disk full"));
        assert!(system.suggestions().is_empty());

        let input = UpdateError::from(InputError::EmptyName);
        assert_eq!(input.kind(), FailureKind::Input);
        assert_eq!(input.to_string(), "vehicle name is empty");
    }
}
