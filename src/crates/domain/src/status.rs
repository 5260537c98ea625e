//! Shared status and verdict enums for `Task` and `TestCase`.

use serde::{Deserialize, Serialize};

/// Task lifecycle status (§3 Data Model).
///
/// Stored in SQLite as plain `TEXT` (SQLite has no native enum type),
/// so this type carries its own `as_str`/`parse` pair rather than a
/// derived `sqlx::Type` — the same approach the teacher's repositories
/// use for string-valued columns (bind/compare the string directly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Created,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Created
    }
}

/// Test case lifecycle status. A case transitions
/// `pending -> running -> (completed | failed)` — see invariant I2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl CaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl Default for CaseStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Tri-state pass/fail verdict. `is_passed` is set only on terminal
/// case states (I2), first provisionally by Execution's synthetic
/// scoring, then authoritatively by Report's LLM analysis (see
/// SPEC_FULL.md §9's precedence decision).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Unknown,
    Pass,
    Fail,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "pass" => Self::Pass,
            "fail" => Self::Fail,
            _ => Self::Unknown,
        }
    }
}

impl Default for Verdict {
    fn default() -> Self {
        Self::Unknown
    }
}

impl Verdict {
    /// Map a boolean success flag to a verdict, as produced by
    /// Execution's synthetic scoring or Report's LLM analysis.
    pub fn from_bool(passed: bool) -> Self {
        if passed {
            Self::Pass
        } else {
            Self::Fail
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Pass => Some(true),
            Self::Fail => Some(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_from_bool() {
        assert_eq!(Verdict::from_bool(true), Verdict::Pass);
        assert_eq!(Verdict::from_bool(false), Verdict::Fail);
    }

    #[test]
    fn defaults() {
        assert_eq!(TaskStatus::default(), TaskStatus::Created);
        assert_eq!(CaseStatus::default(), CaseStatus::Pending);
        assert_eq!(Verdict::default(), Verdict::Unknown);
    }
}
