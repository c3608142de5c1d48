//! Operation Status
//!
//! A copyable success/failure value returned or held by most operations,
//! so callers can inspect the latest outcome without matching on errors.

use serde::{Deserialize, Serialize};

/// Outcome of an operation.
///
/// A default-constructed `Status` represents failure: operations assume
/// failure until proven otherwise.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Status {
    success: bool,
}

impl Status {
    /// Creates a status with the given outcome.
    pub fn new(success: bool) -> Self {
        Self { success }
    }

    /// A successful status.
    pub fn success() -> Self {
        Self::new(true)
    }

    /// A failed status.
    pub fn failure() -> Self {
        Self::new(false)
    }

    /// Returns true if the operation succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Converts an engine exit code (zero means success).
    pub fn from_exit_code(code: i32) -> Self {
        Self::new(code == 0)
    }
}

impl From<bool> for Status {
    fn from(success: bool) -> Self {
        Self::new(success)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.success {
            write!(f, "success")
        } else {
            write!(f, "failure")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_failure() {
        assert!(!Status::default().is_success());
    }

    #[test]
    fn test_from_bool() {
        assert!(Status::from(true).is_success());
        assert!(!Status::from(false).is_success());
    }

    #[test]
    fn test_exit_code_convention() {
        assert!(Status::from_exit_code(0).is_success());
        assert!(!Status::from_exit_code(1).is_success());
        assert!(!Status::from_exit_code(-1).is_success());
    }

    #[test]
    fn test_copy_semantics() {
        let a = Status::success();
        let b = a;
        assert_eq!(a, b);
        assert_eq!(b.to_string(), "success");
        assert_eq!(Status::failure().to_string(), "failure");
    }
}
