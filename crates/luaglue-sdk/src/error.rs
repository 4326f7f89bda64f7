//! Error types for the marshalling layer

/// Result type for stack and dispatch operations
pub type GlueResult<T> = Result<T, GlueError>;

/// Errors raised while marshalling a call between the script stack and
/// a native method.
///
/// Only conditions that abort the current call are represented here.
/// Malformed table keys are skipped with a diagnostic, and an unresolved
/// receiver is a silent zero-result return.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GlueError {
    /// A stack slot does not hold a value convertible to the required type
    #[error("bad argument #{arg} ({expected} expected, got {got})")]
    TypeMismatch {
        /// Argument position, 1-based, not counting the receiver
        arg: i32,
        /// Expected runtime type name
        expected: &'static str,
        /// Actual runtime type name
        got: &'static str,
    },

    /// Error raised while dispatching a named method
    #[error("calling '{method}': {source}")]
    InCall {
        /// Bound method name
        method: String,
        /// Underlying failure
        #[source]
        source: Box<GlueError>,
    },

    /// A parameter descriptor list is not a valid method signature
    #[error("invalid signature: {0}")]
    Signature(String),

    /// The receiver is already borrowed by an outer call on the same object
    #[error("receiver of class '{class}' is already in use")]
    ReceiverBusy {
        /// Class name of the receiver
        class: &'static str,
    },

    /// The bound method returned an error
    #[error("{0}")]
    Method(String),

    /// The bound method panicked
    #[error("method panicked: {0}")]
    Panic(String),

    /// Failure reported by the runtime itself
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl GlueError {
    /// Attach the name of the method being dispatched.
    pub fn in_call(self, method: &str) -> Self {
        match self {
            GlueError::InCall { .. } => self,
            other => GlueError::InCall {
                method: method.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Strip any `InCall` wrapping and return the innermost error.
    pub fn root(&self) -> &GlueError {
        match self {
            GlueError::InCall { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<String> for GlueError {
    fn from(s: String) -> Self {
        GlueError::Runtime(s)
    }
}

impl From<&str> for GlueError {
    fn from(s: &str) -> Self {
        GlueError::Runtime(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_message() {
        let err = GlueError::TypeMismatch {
            arg: 2,
            expected: "number",
            got: "string",
        };
        assert_eq!(err.to_string(), "bad argument #2 (number expected, got string)");
    }

    #[test]
    fn test_in_call_wraps_once() {
        let err = GlueError::Method("boom".into())
            .in_call("add_items")
            .in_call("outer");
        assert_eq!(err.to_string(), "calling 'add_items': boom");
        assert_eq!(err.root(), &GlueError::Method("boom".into()));
    }
}
