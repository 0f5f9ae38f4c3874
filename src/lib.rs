//! portcfg - compile-time capability detection for C and C++
//!
//! This crate resolves the facts of one build configuration (compiler,
//! standard library, C library, optional headers and functions, sanitizer
//! instrumentation) into a fixed vocabulary of portable symbols, and renders
//! them as a re-includable header.

pub mod core;
pub mod emit;
pub mod ops;
pub mod probe;
pub mod resolver;
pub mod util;

/// Test utilities and mocks for portcfg unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests.
#[cfg(test)]
pub mod test_support;

pub use core::{BuildFacts, CapabilityTable, PortableSymbol, SymbolTable};
pub use resolver::{Resolution, ResolveError, Resolver};
