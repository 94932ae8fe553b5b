//! Error types for the Smart Policy Rule Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while parsing expressions,
//! assembling contexts, and executing policies.

use thiserror::Error;

/// The main error type for the Smart Policy Rule Engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use policy_engine::error::EngineError;
///
/// let error = EngineError::DivisionByZero {
///     expression: "salary / 0".to_string(),
/// };
/// assert_eq!(error.to_string(), "Division by zero in expression: salary / 0");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// An expression could not be parsed.
    #[error("Failed to parse expression '{expression}': {message}")]
    ParseError {
        /// The offending expression (possibly truncated).
        expression: String,
        /// A description of the parse failure.
        message: String,
    },

    /// An expression contained a disallowed token or exceeded safety limits.
    #[error("Unsafe expression rejected: {message}")]
    UnsafeExpression {
        /// Why the expression was rejected.
        message: String,
    },

    /// Division or modulo by zero during evaluation.
    #[error("Division by zero in expression: {expression}")]
    DivisionByZero {
        /// The expression that divided by zero.
        expression: String,
    },

    /// A numeric result fell outside the safe range or was not finite.
    #[error("Numeric overflow in expression: {message}")]
    NumericOverflow {
        /// A description of the overflow.
        message: String,
    },

    /// A condition field could not be resolved against the context.
    #[error("Field could not be resolved: {field}")]
    FieldUnresolved {
        /// The dotted field path that failed to resolve.
        field: String,
    },

    /// An exception already exists for the same (policy, target type, target).
    #[error("Duplicate exception for policy {policy_id}: {target_type} {target_id}")]
    DuplicateException {
        /// The policy the exception belongs to.
        policy_id: String,
        /// The exception target type (EMPLOYEE, DEPARTMENT, ...).
        target_type: String,
        /// The target identifier.
        target_id: String,
    },

    /// An exception target does not exist within the company.
    #[error("Exception target not found: {target_type} {target_id}")]
    TargetNotFound {
        /// The exception target type.
        target_type: String,
        /// The target identifier that was not found.
        target_id: String,
    },

    /// The referenced employee does not exist.
    #[error("Employee not found: {employee_id}")]
    EmployeeNotFound {
        /// The employee identifier that was not found.
        employee_id: String,
    },

    /// The referenced policy does not exist.
    #[error("Policy not found: {policy_id}")]
    PolicyNotFound {
        /// The policy identifier that was not found.
        policy_id: String,
    },

    /// A period string or range was invalid.
    #[error("Invalid period: {message}")]
    InvalidPeriod {
        /// A description of what made the period invalid.
        message: String,
    },

    /// A retro application state transition was not allowed.
    #[error("Invalid state transition: {message}")]
    InvalidStateTransition {
        /// A description of the rejected transition.
        message: String,
    },

    /// The referenced entity (simulation run, retro application, ...) was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity.
        entity: String,
        /// The identifier that was not found.
        id: String,
    },

    /// A storage backend failed.
    #[error("Store error: {message}")]
    Store {
        /// A description of the storage failure.
        message: String,
    },

    /// Configuration file could not be read or parsed.
    #[error("Failed to load engine configuration '{path}': {message}")]
    ConfigError {
        /// The path to the configuration file.
        path: String,
        /// A description of the failure.
        message: String,
    },
}

impl EngineError {
    /// Shorthand for a parse error, truncating long expressions.
    pub fn parse(expression: &str, message: impl Into<String>) -> Self {
        let mut expression = expression.to_string();
        if expression.chars().count() > 120 {
            let cut = expression
                .char_indices()
                .nth(120)
                .map(|(i, _)| i)
                .unwrap_or(expression.len());
            expression.truncate(cut);
            expression.push('…');
        }
        EngineError::ParseError {
            expression,
            message: message.into(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_division_by_zero_displays_expression() {
        let error = EngineError::DivisionByZero {
            expression: "1/0".to_string(),
        };
        assert_eq!(error.to_string(), "Division by zero in expression: 1/0");
    }

    #[test]
    fn test_unsafe_expression_displays_message() {
        let error = EngineError::UnsafeExpression {
            message: "disallowed token 'eval'".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Unsafe expression rejected: disallowed token 'eval'"
        );
    }

    #[test]
    fn test_employee_not_found_displays_id() {
        let error = EngineError::EmployeeNotFound {
            employee_id: "emp_042".to_string(),
        };
        assert_eq!(error.to_string(), "Employee not found: emp_042");
    }

    #[test]
    fn test_duplicate_exception_displays_key() {
        let error = EngineError::DuplicateException {
            policy_id: "pol_1".to_string(),
            target_type: "DEPARTMENT".to_string(),
            target_id: "dep_9".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Duplicate exception for policy pol_1: DEPARTMENT dep_9"
        );
    }

    #[test]
    fn test_parse_shorthand_truncates_long_expressions() {
        let long = "1+".repeat(200);
        let error = EngineError::parse(&long, "too deep");
        if let EngineError::ParseError { expression, .. } = &error {
            assert!(expression.chars().count() <= 121);
            assert!(expression.ends_with('…'));
        } else {
            panic!("expected ParseError");
        }
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_not_found() -> EngineResult<()> {
            Err(EngineError::PolicyNotFound {
                policy_id: "missing".to_string(),
            })
        }

        fn propagates_error() -> EngineResult<()> {
            returns_not_found()?;
            Ok(())
        }

        assert!(propagates_error().is_err());
    }
}
