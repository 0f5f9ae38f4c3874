//! Names of the portable symbols, derived from a configurable prefix.

use serde::{Deserialize, Serialize};

/// Default prefix for every portable symbol.
pub const DEFAULT_PREFIX: &str = "PORTCFG";

/// The cooperative-yield name is the platform's own spelling, not prefixed.
pub const YIELD_NAME: &str = "pthread_yield";

/// Native primitive the yield name is aliased onto.
pub const YIELD_TARGET: &str = "sched_yield";

/// Header that declares [`YIELD_TARGET`].
pub const YIELD_HEADER: &str = "sched.h";

/// Names of every symbol the resolver can define.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolNames {
    prefix: String,
}

impl Default for SymbolNames {
    fn default() -> Self {
        SymbolNames::new(DEFAULT_PREFIX)
    }
}

impl SymbolNames {
    pub fn new(prefix: impl Into<String>) -> Self {
        SymbolNames {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn name(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix, suffix)
    }

    pub fn max_align(&self) -> String {
        self.name("MaxAlign")
    }

    pub fn yield_alias(&self) -> String {
        YIELD_NAME.to_string()
    }

    pub fn noreturn(&self) -> String {
        self.name("NORETURN")
    }

    pub fn compiler_prereq(&self) -> String {
        self.name("COMPILER_PREREQ")
    }

    pub fn final_keyword(&self) -> String {
        self.name("FINAL")
    }

    pub fn override_keyword(&self) -> String {
        self.name("OVERRIDE")
    }

    pub fn have_preadv(&self) -> String {
        self.name("HAVE_PREADV")
    }

    pub fn have_pwritev(&self) -> String {
        self.name("HAVE_PWRITEV")
    }

    pub fn sanitize_address(&self) -> String {
        self.name("SANITIZE_ADDRESS")
    }

    pub fn disable_address_sanitizer(&self) -> String {
        self.name("DISABLE_ADDRESS_SANITIZER")
    }

    pub fn namespace_std_begin(&self) -> String {
        self.name("NAMESPACE_STD_BEGIN")
    }

    pub fn namespace_std_end(&self) -> String {
        self.name("NAMESPACE_STD_END")
    }

    /// Macro that suppresses the generated-config include.
    pub fn no_config(&self) -> String {
        self.name("NO_CONFIG")
    }

    /// Default include guard for the rendered header.
    pub fn include_guard(&self) -> String {
        self.name("PORTABILITY_H_")
    }

    /// Every symbol name that is always defined, whatever the facts.
    pub fn always_defined(&self) -> Vec<String> {
        vec![
            self.max_align(),
            self.noreturn(),
            self.compiler_prereq(),
            self.final_keyword(),
            self.override_keyword(),
            self.disable_address_sanitizer(),
            self.namespace_std_begin(),
            self.namespace_std_end(),
        ]
    }
}
