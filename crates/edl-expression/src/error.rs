use thiserror::Error;

/// Coarse classification of an [`ExprError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    SandboxViolation,
    UndefinedReference,
    Type,
    ResourceExceeded,
    Shape,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("{message} at position {position}")]
    Syntax { message: String, position: usize },

    #[error("Access to '{0}' is not allowed")]
    SandboxViolation(String),

    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("Undefined function: {0}")]
    UndefinedFunction(String),

    #[error("{0}")]
    Type(String),

    #[error("Maximum recursion depth exceeded (limit {0})")]
    DepthExceeded(usize),

    #[error("Execution timeout exceeded ({0}ms)")]
    Timeout(u64),

    #[error("{path}: {message}")]
    Shape { path: String, message: String },

    #[error("Cannot override built-in function: {0}")]
    BuiltinOverride(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("{path}: Unknown operator: {operator}")]
    UnknownOperator { path: String, operator: String },

    #[error("{path}: Unknown array operation: {op}")]
    UnknownArrayOperation { path: String, op: String },

    #[error("{0}")]
    Thrown(String),
}

impl ExprError {
    pub fn syntax(message: impl Into<String>, position: usize) -> Self {
        ExprError::Syntax {
            message: message.into(),
            position,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        ExprError::Type(message.into())
    }

    pub fn shape(path: &str, message: impl Into<String>) -> Self {
        ExprError::Shape {
            path: display_path(path),
            message: message.into(),
        }
    }

    pub fn unknown_operator(path: &str, operator: &str) -> Self {
        ExprError::UnknownOperator {
            path: display_path(path),
            operator: operator.to_string(),
        }
    }

    pub fn unknown_array_operation(path: &str, op: &str) -> Self {
        ExprError::UnknownArrayOperation {
            path: display_path(path),
            op: op.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExprError::Syntax { .. } => ErrorKind::Syntax,
            ExprError::SandboxViolation(_) => ErrorKind::SandboxViolation,
            ExprError::UndefinedVariable(_)
            | ExprError::UndefinedFunction(_)
            | ExprError::UnknownFunction(_) => ErrorKind::UndefinedReference,
            ExprError::Type(_) | ExprError::Thrown(_) => ErrorKind::Type,
            ExprError::DepthExceeded(_) | ExprError::Timeout(_) => ErrorKind::ResourceExceeded,
            ExprError::Shape { .. }
            | ExprError::BuiltinOverride(_)
            | ExprError::UnknownOperator { .. }
            | ExprError::UnknownArrayOperation { .. } => ErrorKind::Shape,
        }
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_errors_name_the_path() {
        assert_eq!(
            ExprError::shape("", "slice step cannot be zero").to_string(),
            "<root>: slice step cannot be zero"
        );
        assert_eq!(
            ExprError::unknown_operator("auth.sign", "^").to_string(),
            "auth.sign: Unknown operator: ^"
        );
    }

    #[test]
    fn test_kinds() {
        assert_eq!(ExprError::Timeout(10).kind(), ErrorKind::ResourceExceeded);
        assert_eq!(
            ExprError::SandboxViolation("constructor".into()).kind(),
            ErrorKind::SandboxViolation
        );
        assert_eq!(ExprError::syntax("x", 0).kind(), ErrorKind::Syntax);
    }
}
