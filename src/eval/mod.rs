//! Expression, formula, and condition evaluation.
//!
//! The expression layer is pure and synchronous; formulas and conditions
//! layer field resolution on top of it. No administrator-authored text
//! ever reaches a dynamic code-execution facility.

pub mod condition;
pub mod expression;
pub mod formula;
pub mod value;

pub use condition::ConditionEvaluator;
pub use expression::{evaluate_boolean, evaluate_comparison, evaluate_math};
pub use formula::{FormulaEvaluator, extract_variables};
pub use value::FieldValue;
