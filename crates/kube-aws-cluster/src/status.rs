//! Stack and resource status codes.
//!
//! The orchestration service reports the same status vocabulary for whole
//! stacks and for individual resources. Codes this crate does not know are
//! kept verbatim in [`StackStatus::Other`].
//!
//! ```text
//!   CREATE_IN_PROGRESS ──▶ CREATE_COMPLETE
//!          │
//!          ├──▶ CREATE_FAILED
//!          │
//!          └──▶ ROLLBACK_IN_PROGRESS ──▶ ROLLBACK_COMPLETE
//!                                   └──▶ ROLLBACK_FAILED
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A stack or resource status code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StackStatus {
    /// `CREATE_IN_PROGRESS`
    CreateInProgress,
    /// `CREATE_COMPLETE`
    CreateComplete,
    /// `CREATE_FAILED`
    CreateFailed,
    /// `ROLLBACK_IN_PROGRESS`
    RollbackInProgress,
    /// `ROLLBACK_COMPLETE`
    RollbackComplete,
    /// `ROLLBACK_FAILED`
    RollbackFailed,
    /// `DELETE_IN_PROGRESS`
    DeleteInProgress,
    /// `DELETE_COMPLETE`
    DeleteComplete,
    /// `DELETE_FAILED`
    DeleteFailed,
    /// `UPDATE_IN_PROGRESS`
    UpdateInProgress,
    /// `UPDATE_COMPLETE`
    UpdateComplete,
    /// `UPDATE_FAILED`
    UpdateFailed,
    /// Any other code, kept as reported.
    Other(String),
}

impl StackStatus {
    /// Parse a provider status code.
    #[must_use]
    pub fn parse(code: &str) -> Self {
        match code {
            "CREATE_IN_PROGRESS" => Self::CreateInProgress,
            "CREATE_COMPLETE" => Self::CreateComplete,
            "CREATE_FAILED" => Self::CreateFailed,
            "ROLLBACK_IN_PROGRESS" => Self::RollbackInProgress,
            "ROLLBACK_COMPLETE" => Self::RollbackComplete,
            "ROLLBACK_FAILED" => Self::RollbackFailed,
            "DELETE_IN_PROGRESS" => Self::DeleteInProgress,
            "DELETE_COMPLETE" => Self::DeleteComplete,
            "DELETE_FAILED" => Self::DeleteFailed,
            "UPDATE_IN_PROGRESS" => Self::UpdateInProgress,
            "UPDATE_COMPLETE" => Self::UpdateComplete,
            "UPDATE_FAILED" => Self::UpdateFailed,
            other => Self::Other(other.to_string()),
        }
    }

    /// The provider status code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CreateInProgress => "CREATE_IN_PROGRESS",
            Self::CreateComplete => "CREATE_COMPLETE",
            Self::CreateFailed => "CREATE_FAILED",
            Self::RollbackInProgress => "ROLLBACK_IN_PROGRESS",
            Self::RollbackComplete => "ROLLBACK_COMPLETE",
            Self::RollbackFailed => "ROLLBACK_FAILED",
            Self::DeleteInProgress => "DELETE_IN_PROGRESS",
            Self::DeleteComplete => "DELETE_COMPLETE",
            Self::DeleteFailed => "DELETE_FAILED",
            Self::UpdateInProgress => "UPDATE_IN_PROGRESS",
            Self::UpdateComplete => "UPDATE_COMPLETE",
            Self::UpdateFailed => "UPDATE_FAILED",
            Self::Other(code) => code,
        }
    }

    /// Returns true while the provider is still working on the stack.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            Self::CreateInProgress
                | Self::RollbackInProgress
                | Self::DeleteInProgress
                | Self::UpdateInProgress
        )
    }

    /// Returns true if no further automatic transition is expected.
    ///
    /// Unknown codes count as terminal so that polling never spins on a
    /// status it cannot interpret.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !self.is_in_progress()
    }

    /// Returns true if creating the stack did not succeed.
    ///
    /// A rollback means creation failed and the provider is undoing it.
    #[must_use]
    pub fn is_creation_failure(&self) -> bool {
        matches!(
            self,
            Self::CreateFailed
                | Self::RollbackInProgress
                | Self::RollbackComplete
                | Self::RollbackFailed
        )
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for StackStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for StackStatus {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<StackStatus> for String {
    fn from(status: StackStatus) -> Self {
        status.as_str().to_string()
    }
}
