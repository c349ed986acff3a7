//! Sandbox error types.

use thiserror::Error;

/// Why a generated module could not be evaluated.
///
/// `Reference` and `Type` mirror the JavaScript exceptions the module would
/// have thrown in a real engine; callers usually treat them as "retry once the
/// module's imports are available".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SandboxError {
    /// The module is not syntactically valid.
    #[error("syntax error in {filename}: {message}")]
    Parse {
        /// Name the module was parsed under.
        filename: String,
        /// Parser message.
        message: String,
    },

    /// An undeclared identifier was read or assigned.
    #[error("ReferenceError: {0} is not defined")]
    Reference(String),

    /// A value was used in a way its type does not allow.
    #[error("TypeError: {0}")]
    Type(String),

    /// The module uses a construct outside the supported subset.
    #[error("unsupported construct: {0}")]
    Unsupported(String),
}
