//! Performance benchmarks for the policy expression evaluator.
//!
//! This benchmark suite verifies that expression evaluation meets the
//! per-policy latency targets:
//! - Simple arithmetic: < 10μs mean
//! - Formula with variable substitution and functions: < 50μs mean
//! - Boolean condition expression: < 50μs mean
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use std::collections::HashMap;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use policy_engine::eval::{FieldValue, evaluate_boolean, evaluate_math};

fn salary_variables() -> HashMap<String, FieldValue> {
    let mut variables = HashMap::new();
    variables.insert("basicSalary".to_string(), FieldValue::Number(3000.0));
    variables.insert("workingDays".to_string(), FieldValue::Number(22.0));
    variables.insert("lateDays".to_string(), FieldValue::Number(4.0));
    variables.insert("absentDays".to_string(), FieldValue::Number(1.0));
    variables.insert("overtimeHours".to_string(), FieldValue::Number(12.5));
    variables
}

/// Benchmark: plain arithmetic with no variables.
fn bench_simple_arithmetic(c: &mut Criterion) {
    let variables = HashMap::new();
    c.bench_function("simple_arithmetic", |b| {
        b.iter(|| evaluate_math(black_box("(2 + 3) * 4 - 10 / 2"), &variables))
    });
}

/// Benchmark: a realistic salary formula with substitution and functions.
fn bench_salary_formula(c: &mut Criterion) {
    let variables = salary_variables();
    c.bench_function("salary_formula", |b| {
        b.iter(|| {
            evaluate_math(
                black_box("MIN(basicSalary / workingDays * lateDays, basicSalary * 0.25)"),
                &variables,
            )
        })
    });
}

/// Benchmark: nested function calls.
fn bench_nested_functions(c: &mut Criterion) {
    let variables = salary_variables();
    c.bench_function("nested_functions", |b| {
        b.iter(|| {
            evaluate_math(
                black_box("ROUND(MAX(MIN(overtimeHours, 10) * 1.5, absentDays * 2))"),
                &variables,
            )
        })
    });
}

/// Benchmark: boolean condition expression.
fn bench_boolean_condition(c: &mut Criterion) {
    let variables = salary_variables();
    c.bench_function("boolean_condition", |b| {
        b.iter(|| {
            evaluate_boolean(
                black_box("lateDays > 3 AND absentDays <= 2 OR overtimeHours >= 20"),
                &variables,
                false,
            )
        })
    });
}

criterion_group!(
    benches,
    bench_simple_arithmetic,
    bench_salary_formula,
    bench_nested_functions,
    bench_boolean_condition
);
criterion_main!(benches);
