//! Smart Policy Rule Engine
//!
//! This crate evaluates configurable, payroll-affecting business rules for
//! an HR platform: safe formula and condition evaluation over an enriched
//! per-employee context, tiered occurrence penalties, policy exceptions,
//! what-if simulation, and retroactive application.

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod eval;
pub mod models;
pub mod store;
