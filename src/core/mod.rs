//! Core data structures for portcfg.
//!
//! This module contains the foundational types used throughout portcfg:
//! - Compiler and library identities
//! - Compile-time facts for one build configuration
//! - Portable symbols and the define-once symbol table
//! - The capability table of thresholds and spellings

pub mod compiler;
pub mod facts;
pub mod symbol;
pub mod table;

pub use compiler::{CompilerFamily, LibcFamily, StdLibFamily, Version};
pub use facts::{BuildFacts, CompilerFact, FeatureFacts, LibcFact};
pub use symbol::{Definition, PortableSymbol, Registration, SymbolTable};
pub use table::{CapabilityTable, TableOverrides};
