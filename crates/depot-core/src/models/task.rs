use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Lifecycle state of an assembly task, as reported to clients.
///
/// `Unknown` covers task ids the backend has no record of, including records
/// that expired; a retry is allowed from `Failure` and `Unknown` only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Started,
    Success,
    Failure,
    Unknown,
}

impl TaskState {
    /// Whether the task has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failure)
    }
}

impl Display for TaskState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TaskState::Pending => write!(f, "PENDING"),
            TaskState::Started => write!(f, "STARTED"),
            TaskState::Success => write!(f, "SUCCESS"),
            TaskState::Failure => write!(f, "FAILURE"),
            TaskState::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl FromStr for TaskState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TaskState::Pending),
            "STARTED" => Ok(TaskState::Started),
            "SUCCESS" => Ok(TaskState::Success),
            "FAILURE" => Ok(TaskState::Failure),
            "UNKNOWN" => Ok(TaskState::Unknown),
            _ => Err(anyhow::anyhow!("Invalid task state: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display_roundtrip() {
        for state in [
            TaskState::Pending,
            TaskState::Started,
            TaskState::Success,
            TaskState::Failure,
            TaskState::Unknown,
        ] {
            assert_eq!(state.to_string().parse::<TaskState>().unwrap(), state);
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskState::Success.is_terminal());
        assert!(TaskState::Failure.is_terminal());
        assert!(!TaskState::Pending.is_terminal());
        assert!(!TaskState::Started.is_terminal());
        assert!(!TaskState::Unknown.is_terminal());
    }
}
