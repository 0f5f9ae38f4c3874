//! High-level operations.
//!
//! This module contains the implementation of portcfg commands.

pub mod check;
pub mod explain;
pub mod generate;

pub use check::{check_matrix, format_report, CheckReport, Property, PropertyViolation};
pub use explain::explain;
pub use generate::{generate, FactsSource, GenerateOptions, GenerateResult, GenerateStatus};
