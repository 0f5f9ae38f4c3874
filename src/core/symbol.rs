//! Portable symbols and the define-once symbol table.
//!
//! A `SymbolTable` is the result of resolution: an ordered set of uniquely
//! named symbols. Registration is "define if not already defined", so
//! running the resolver twice against the same table leaves it unchanged.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The resolved definition of a portable symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Definition {
    /// A type declaration (the alignment placeholder)
    Type(String),
    /// An alias for another identifier (`pthread_yield` -> `sched_yield`)
    Alias(String),
    /// A language keyword (`final`, `override`)
    Keyword(String),
    /// A compiler attribute spelling
    Attribute(String),
    /// Arbitrary replacement tokens (namespace bracing)
    Tokens(String),
    /// A boolean feature flag that is present, defined to `1`
    Flag,
    /// A function-like macro
    FunctionLike { params: Vec<String>, body: String },
    /// Defined, but expands to nothing
    Empty,
}

impl Definition {
    /// The replacement text of this definition, as it would appear after the
    /// macro name. Empty definitions return an empty string.
    pub fn expansion(&self) -> String {
        match self {
            Definition::Type(decl) => decl.clone(),
            Definition::Alias(s)
            | Definition::Keyword(s)
            | Definition::Attribute(s)
            | Definition::Tokens(s) => s.clone(),
            Definition::Flag => "1".to_string(),
            Definition::FunctionLike { body, .. } => body.clone(),
            Definition::Empty => String::new(),
        }
    }

    /// Whether the symbol expands to nothing.
    pub fn is_empty(&self) -> bool {
        matches!(self, Definition::Empty)
    }

    /// Short label used in explain output.
    pub fn kind(&self) -> &'static str {
        match self {
            Definition::Type(_) => "type",
            Definition::Alias(_) => "alias",
            Definition::Keyword(_) => "keyword",
            Definition::Attribute(_) => "attribute",
            Definition::Tokens(_) => "tokens",
            Definition::Flag => "flag",
            Definition::FunctionLike { .. } => "function-like",
            Definition::Empty => "empty",
        }
    }
}

/// A uniform name the rest of a codebase may use, with its resolved definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortableSymbol {
    pub name: String,
    pub definition: Definition,
}

impl PortableSymbol {
    pub fn new(name: impl Into<String>, definition: Definition) -> Self {
        PortableSymbol {
            name: name.into(),
            definition,
        }
    }
}

impl fmt::Display for PortableSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.definition {
            Definition::FunctionLike { params, body } => {
                write!(f, "{}({}) {}", self.name, params.join(", "), body)
            }
            Definition::Empty => write!(f, "{} <empty>", self.name),
            def => write!(f, "{} {}", self.name, def.expansion()),
        }
    }
}

/// Outcome of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The symbol (or pair) was newly defined
    Defined,
    /// A symbol with that name already existed; nothing changed
    AlreadyDefined,
}

/// Ordered, define-once collection of portable symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: Vec<PortableSymbol>,
    index: HashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a symbol with this name has been defined.
    pub fn is_defined(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Look up a symbol by name.
    pub fn get(&self, name: &str) -> Option<&PortableSymbol> {
        self.index.get(name).map(|&i| &self.symbols[i])
    }

    /// Look up a symbol's definition by name.
    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.get(name).map(|s| &s.definition)
    }

    /// Define a symbol unless one with the same name already exists.
    pub fn define_if_absent(&mut self, symbol: PortableSymbol) -> Registration {
        if self.is_defined(&symbol.name) {
            tracing::debug!("`{}` already defined, keeping existing definition", symbol.name);
            return Registration::AlreadyDefined;
        }

        self.index.insert(symbol.name.clone(), self.symbols.len());
        self.symbols.push(symbol);
        Registration::Defined
    }

    /// Define two symbols together, only if neither exists yet.
    ///
    /// Pairs are all-or-nothing: if either name is already taken the table is
    /// left untouched.
    pub fn define_pair_if_absent(
        &mut self,
        first: PortableSymbol,
        second: PortableSymbol,
    ) -> Registration {
        let first_defined = self.is_defined(&first.name);
        let second_defined = self.is_defined(&second.name);

        if first_defined || second_defined {
            if first_defined != second_defined {
                tracing::warn!(
                    "only one of `{}` / `{}` is defined; leaving the pair untouched",
                    first.name,
                    second.name
                );
            }
            return Registration::AlreadyDefined;
        }

        self.define_if_absent(first);
        self.define_if_absent(second);
        Registration::Defined
    }

    /// Iterate symbols in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &PortableSymbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl<'a> IntoIterator for &'a SymbolTable {
    type Item = &'a PortableSymbol;
    type IntoIter = std::slice::Iter<'a, PortableSymbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.symbols.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_once() {
        let mut table = SymbolTable::new();
        let first = table.define_if_absent(PortableSymbol::new(
            "P_NORETURN",
            Definition::Attribute("__attribute__((noreturn))".into()),
        ));
        let second = table.define_if_absent(PortableSymbol::new("P_NORETURN", Definition::Empty));

        assert_eq!(first, Registration::Defined);
        assert_eq!(second, Registration::AlreadyDefined);
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.definition("P_NORETURN"),
            Some(&Definition::Attribute("__attribute__((noreturn))".into()))
        );
    }

    #[test]
    fn test_pair_is_all_or_nothing() {
        let mut table = SymbolTable::new();
        table.define_if_absent(PortableSymbol::new("P_FINAL", Definition::Empty));

        let reg = table.define_pair_if_absent(
            PortableSymbol::new("P_FINAL", Definition::Keyword("final".into())),
            PortableSymbol::new("P_OVERRIDE", Definition::Keyword("override".into())),
        );

        assert_eq!(reg, Registration::AlreadyDefined);
        assert!(!table.is_defined("P_OVERRIDE"));
        assert_eq!(table.definition("P_FINAL"), Some(&Definition::Empty));
    }

    #[test]
    fn test_definition_order_is_preserved() {
        let mut table = SymbolTable::new();
        table.define_if_absent(PortableSymbol::new("B", Definition::Flag));
        table.define_if_absent(PortableSymbol::new("A", Definition::Flag));

        let names: Vec<_> = table.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["B", "A"]);
    }

    #[test]
    fn test_display() {
        let sym = PortableSymbol::new(
            "P_COMPILER_PREREQ",
            Definition::FunctionLike {
                params: vec!["maj".into(), "min".into()],
                body: "0".into(),
            },
        );
        assert_eq!(sym.to_string(), "P_COMPILER_PREREQ(maj, min) 0");
        assert_eq!(Definition::Flag.expansion(), "1");
        assert_eq!(
            PortableSymbol::new("P_FINAL", Definition::Empty).to_string(),
            "P_FINAL <empty>"
        );
    }
}
