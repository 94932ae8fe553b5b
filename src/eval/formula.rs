//! Formula evaluation over a context.
//!
//! A formula is an arithmetic expression whose identifiers are context
//! field paths (`basicSalary / workingDays * absentDays`). This layer
//! extracts the identifiers, resolves them against a [`ContextView`],
//! and hands a pure variable map to the expression evaluator.

use std::collections::HashMap;

use tracing::warn;

use crate::context::ContextView;
use crate::error::EngineResult;
use crate::eval::expression::{self, RESERVED_WORDS};
use crate::eval::FieldValue;

/// Extracts candidate variable tokens from a formula: identifier-shaped
/// words (dotted paths included), minus the expression language's own
/// reserved words.
pub fn extract_variables(formula: &str) -> Vec<String> {
    let chars: Vec<char> = formula.chars().collect();
    let mut tokens: Vec<String> = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_alphabetic() || chars[i] == '_' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
            {
                i += 1;
            }
            let token: String = chars[start..i].iter().collect();
            let token = token.trim_end_matches('.').to_string();
            let upper = token.to_uppercase();
            if !RESERVED_WORDS.contains(&upper.as_str()) && !tokens.contains(&token) {
                tokens.push(token);
            }
        } else {
            i += 1;
        }
    }
    tokens
}

/// Evaluates formulas against a context view.
pub struct FormulaEvaluator;

impl FormulaEvaluator {
    /// Pre-flight safety check without evaluation: length, parenthesis
    /// balance, deny-list.
    pub fn validate_formula(formula: &str) -> EngineResult<()> {
        expression::validate(formula)
    }

    /// Evaluates a formula, resolving identifiers via the view.
    /// Unresolved identifiers default to 0 with a warning.
    pub fn evaluate(formula: &str, view: &ContextView) -> EngineResult<f64> {
        Self::validate_formula(formula)?;
        let mut variables: HashMap<String, FieldValue> = HashMap::new();
        for token in extract_variables(formula) {
            let value = match view.get_number(&token) {
                Some(n) => n,
                None => {
                    warn!(field = %token, formula, "formula field unresolved, defaulting to 0");
                    0.0
                }
            };
            variables.insert(token, FieldValue::Number(value));
        }
        expression::evaluate_math(formula, &variables)
    }

    /// Reads a single pre-aggregated count field; 0 when unresolved.
    pub fn evaluate_count(field: &str, view: &ContextView) -> f64 {
        view.get_number(field).unwrap_or(0.0)
    }

    /// Reads a single pre-aggregated sum field; 0 when unresolved.
    pub fn evaluate_sum(field: &str, view: &ContextView) -> f64 {
        view.get_number(field).unwrap_or(0.0)
    }

    /// Reads a single pre-aggregated average field; 0 when unresolved.
    pub fn evaluate_avg(field: &str, view: &ContextView) -> f64 {
        view.get_number(field).unwrap_or(0.0)
    }

    /// Maps a field name onto the matching streak counter. Substring
    /// matching mirrors how policies name these fields; an unmatched
    /// name yields 0.
    pub fn evaluate_consecutive(field: &str, view: &ContextView) -> f64 {
        let lowered = field.to_lowercase();
        let path = if lowered.contains("late") {
            "attendance.patterns.consecutiveLateDays"
        } else if lowered.contains("absent") {
            "attendance.patterns.consecutiveAbsentDays"
        } else if lowered.contains("present") {
            "attendance.patterns.consecutivePresentDays"
        } else if lowered.contains("early") {
            "attendance.patterns.consecutiveEarlyLeaveDays"
        } else if lowered.contains("sick") {
            "attendance.patterns.consecutiveSickDays"
        } else if lowered.contains("weekend") {
            "attendance.patterns.weekendWorkDays"
        } else {
            return 0.0;
        };
        view.get_number(path).unwrap_or(0.0)
    }
}
