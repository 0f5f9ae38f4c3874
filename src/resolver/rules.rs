//! The resolution rules.
//!
//! Each rule consults a fixed slice of the facts and registers one symbol
//! family. Rules never overwrite: every registration goes through the
//! define-once symbol table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::symbol::{Definition, PortableSymbol, Registration, SymbolTable};
use crate::core::{BuildFacts, CapabilityTable, CompilerFamily, StdLibFamily, Version};
use crate::resolver::errors::ResolveError;
use crate::resolver::fallback::{Condition, FallbackChain};
use crate::resolver::gate::VersionGate;
use crate::resolver::names::{SymbolNames, YIELD_HEADER, YIELD_NAME, YIELD_TARGET};

/// `__has_feature` query that reports AddressSanitizer on clang.
pub const ASAN_FEATURE: &str = "address_sanitizer";

/// Macro GCC predefines under `-fsanitize=address`.
pub const ASAN_MACRO: &str = "__SANITIZE_ADDRESS__";

/// Older attribute disabling ASan instrumentation (clang and gcc).
pub const ATTR_NO_ADDRESS_SAFETY_ANALYSIS: &str = "__no_address_safety_analysis__";

/// Newer attribute disabling ASan instrumentation (clang).
pub const ATTR_NO_SANITIZE_ADDRESS: &str = "__no_sanitize_address__";

/// Identifies a rule. Declaration order is the default evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    Alignment,
    CooperativeYield,
    NoReturn,
    VersionGate,
    LateBinding,
    VectorIo,
    SanitizerMode,
    SanitizerSuppression,
    NamespaceBracing,
}

impl RuleId {
    pub const ALL: [RuleId; 9] = [
        RuleId::Alignment,
        RuleId::CooperativeYield,
        RuleId::NoReturn,
        RuleId::VersionGate,
        RuleId::LateBinding,
        RuleId::VectorIo,
        RuleId::SanitizerMode,
        RuleId::SanitizerSuppression,
        RuleId::NamespaceBracing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::Alignment => "alignment",
            RuleId::CooperativeYield => "cooperative-yield",
            RuleId::NoReturn => "noreturn",
            RuleId::VersionGate => "version-gate",
            RuleId::LateBinding => "late-binding",
            RuleId::VectorIo => "vector-io",
            RuleId::SanitizerMode => "sanitizer-mode",
            RuleId::SanitizerSuppression => "sanitizer-suppression",
            RuleId::NamespaceBracing => "namespace-bracing",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State shared between rules during one resolution pass.
///
/// Prerequisite rules publish their results here (the version gate, the
/// sanitizer mode) for dependent rules to read.
#[derive(Debug)]
pub struct RuleContext<'a> {
    pub facts: &'a BuildFacts,
    pub table: &'a CapabilityTable,
    pub names: &'a SymbolNames,
    pub gate: Option<VersionGate>,
    pub sanitizer_active: Option<bool>,
}

impl<'a> RuleContext<'a> {
    pub fn new(facts: &'a BuildFacts, table: &'a CapabilityTable, names: &'a SymbolNames) -> Self {
        RuleContext {
            facts,
            table,
            names,
            gate: None,
            sanitizer_active: None,
        }
    }

    fn gate(&self, rule: RuleId) -> Result<VersionGate, ResolveError> {
        self.gate.ok_or(ResolveError::MissingPrerequisite {
            rule,
            prerequisite: RuleId::VersionGate,
        })
    }

    fn sanitizer_active(&self, rule: RuleId) -> Result<bool, ResolveError> {
        self.sanitizer_active
            .ok_or(ResolveError::MissingPrerequisite {
                rule,
                prerequisite: RuleId::SanitizerMode,
            })
    }
}

/// What a rule decided and which symbols it touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule: RuleId,
    /// The alternative that was chosen
    pub decision: String,
    /// Facts the rule looked at, rendered as `name = value`
    pub consulted: Vec<String>,
    /// Higher-priority fallback candidates whose condition failed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<String>,
    /// Symbols newly defined by this pass
    pub defined: Vec<String>,
    /// Symbols that already existed and were left alone
    pub unchanged: Vec<String>,
    /// Conditional symbols deliberately left undefined
    pub undefined: Vec<String>,
}

impl RuleOutcome {
    fn new(rule: RuleId, decision: impl Into<String>) -> Self {
        RuleOutcome {
            rule,
            decision: decision.into(),
            consulted: Vec::new(),
            rejected: Vec::new(),
            defined: Vec::new(),
            unchanged: Vec::new(),
            undefined: Vec::new(),
        }
    }

    fn consulted(mut self, fact: impl Into<String>) -> Self {
        self.consulted.push(fact.into());
        self
    }

    fn record(&mut self, registration: Registration, names: &[String]) {
        let bucket = match registration {
            Registration::Defined => &mut self.defined,
            Registration::AlreadyDefined => &mut self.unchanged,
        };
        bucket.extend(names.iter().cloned());
    }

    /// Whether this outcome mentions the symbol in any bucket.
    pub fn touches(&self, symbol: &str) -> bool {
        self.defined
            .iter()
            .chain(&self.unchanged)
            .chain(&self.undefined)
            .any(|s| s == symbol)
    }
}

/// A single resolution rule.
pub trait Rule: Send + Sync {
    /// Which rule this is.
    fn id(&self) -> RuleId;

    /// Rules that must run before this one.
    fn prerequisites(&self) -> &'static [RuleId] {
        &[]
    }

    /// Evaluate the rule, registering its symbols.
    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        symbols: &mut SymbolTable,
    ) -> Result<RuleOutcome, ResolveError>;
}

/// All built-in rules, in declaration order.
pub fn builtin_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(AlignmentRule),
        Box::new(CooperativeYieldRule),
        Box::new(NoReturnRule),
        Box::new(VersionGateRule),
        Box::new(LateBindingRule),
        Box::new(VectorIoRule),
        Box::new(SanitizerModeRule),
        Box::new(SanitizerSuppressionRule),
        Box::new(NamespaceBracingRule),
    ]
}

fn compiler_fact(facts: &BuildFacts) -> String {
    format!(
        "compiler = {} {}",
        facts.compiler.family, facts.compiler.version
    )
}

fn owned(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|l| l.to_string()).collect()
}

fn owned_labels<T>(chain: &FallbackChain<T>) -> Vec<String> {
    chain.labels().map(str::to_string).collect()
}

// ============================================================================
// Alignment placeholder
// ============================================================================

/// Defines the maximally-aligned storage placeholder. Fatal on an unknown family.
pub struct AlignmentRule;

impl Rule for AlignmentRule {
    fn id(&self) -> RuleId {
        RuleId::Alignment
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        symbols: &mut SymbolTable,
    ) -> Result<RuleOutcome, ResolveError> {
        let family = &ctx.facts.compiler.family;
        let spelling = ctx.table.alignment_spelling(family).ok_or_else(|| {
            ResolveError::UnsupportedAlignment {
                family: family.clone(),
            }
        })?;

        let name = ctx.names.max_align();
        let declaration = format!("struct {} {{ char c; }} {};", name, spelling);
        let reg = symbols.define_if_absent(PortableSymbol::new(
            name.clone(),
            Definition::Type(declaration),
        ));

        let mut outcome = RuleOutcome::new(self.id(), format!("{}: {}", family, spelling))
            .consulted(format!("compiler.family = {}", family));
        outcome.record(reg, &[name]);
        Ok(outcome)
    }
}

// ============================================================================
// Cooperative yield
// ============================================================================

/// Aliases `pthread_yield` onto `sched_yield` when only the latter exists.
pub struct CooperativeYieldRule;

impl Rule for CooperativeYieldRule {
    fn id(&self) -> RuleId {
        RuleId::CooperativeYield
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        symbols: &mut SymbolTable,
    ) -> Result<RuleOutcome, ResolveError> {
        let features = &ctx.facts.features;
        let has_header = features.has_header(YIELD_HEADER);
        let native = features.has_function(YIELD_NAME);
        let name = ctx.names.yield_alias();

        let decision = match (has_header, native) {
            (false, _) => format!("<{}> unavailable", YIELD_HEADER),
            (true, true) => format!("native {} available", YIELD_NAME),
            (true, false) => format!("alias onto {}", YIELD_TARGET),
        };

        let mut outcome = RuleOutcome::new(self.id(), decision)
            .consulted(format!("header {} = {}", YIELD_HEADER, has_header))
            .consulted(format!("function {} = {}", YIELD_NAME, native));

        if has_header && !native {
            let reg = symbols.define_if_absent(PortableSymbol::new(
                name.clone(),
                Definition::Alias(YIELD_TARGET.to_string()),
            ));
            outcome.record(reg, &[name]);
        } else {
            outcome.undefined.push(name);
        }

        Ok(outcome)
    }
}

// ============================================================================
// No-return attribute
// ============================================================================

/// Defines the no-return marker; empty for families without an attribute.
pub struct NoReturnRule;

impl Rule for NoReturnRule {
    fn id(&self) -> RuleId {
        RuleId::NoReturn
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        symbols: &mut SymbolTable,
    ) -> Result<RuleOutcome, ResolveError> {
        let family = &ctx.facts.compiler.family;
        let (decision, definition) = match ctx.table.noreturn_spelling(family) {
            Some(spelling) => (
                format!("{}: {}", family, spelling),
                Definition::Attribute(spelling.to_string()),
            ),
            None => (format!("{}: no attribute", family), Definition::Empty),
        };

        let name = ctx.names.noreturn();
        let reg = symbols.define_if_absent(PortableSymbol::new(name.clone(), definition));

        let mut outcome = RuleOutcome::new(self.id(), decision)
            .consulted(format!("compiler.family = {}", family));
        outcome.record(reg, &[name]);
        Ok(outcome)
    }
}

// ============================================================================
// Version gate
// ============================================================================

/// Publishes the version-gate predicate for later rules.
pub struct VersionGateRule;

impl Rule for VersionGateRule {
    fn id(&self) -> RuleId {
        RuleId::VersionGate
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        symbols: &mut SymbolTable,
    ) -> Result<RuleOutcome, ResolveError> {
        let gate = VersionGate::for_compiler(&ctx.facts.compiler);
        ctx.gate = Some(gate);

        let decision = match gate.active() {
            Some(v) => format!("compare against {}", v),
            None => "unknown compiler, gate always false".to_string(),
        };

        let name = ctx.names.compiler_prereq();
        let reg = symbols.define_if_absent(PortableSymbol::new(name.clone(), gate.to_definition()));

        let mut outcome =
            RuleOutcome::new(self.id(), decision).consulted(compiler_fact(ctx.facts));
        outcome.record(reg, &[name]);
        Ok(outcome)
    }
}

// ============================================================================
// final / override
// ============================================================================

/// Defines the `final` / `override` aliases as an atomic pair.
pub struct LateBindingRule;

impl LateBindingRule {
    /// Keywords if the family's minimum is met, otherwise nothing.
    pub fn chain(family: &CompilerFamily, table: &CapabilityTable) -> FallbackChain<bool> {
        let chain = FallbackChain::new();
        let chain = match table.late_binding_min(family) {
            Some(min) => chain.candidate(
                format!("{} >= {}", family, min),
                Condition::All(vec![
                    Condition::Family(family.clone()),
                    Condition::CompilerAtLeast(min),
                ]),
                true,
            ),
            None => chain,
        };
        chain.otherwise("keywords elided", false)
    }
}

impl Rule for LateBindingRule {
    fn id(&self) -> RuleId {
        RuleId::LateBinding
    }

    fn prerequisites(&self) -> &'static [RuleId] {
        &[RuleId::VersionGate]
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        symbols: &mut SymbolTable,
    ) -> Result<RuleOutcome, ResolveError> {
        let gate = ctx.gate(self.id())?;
        let chain = Self::chain(&ctx.facts.compiler.family, ctx.table);
        let selection = chain.select(ctx.facts, &gate);

        let (label, supported, rejected) = match selection {
            Some(sel) => (sel.label.to_string(), *sel.value, owned(&sel.rejected)),
            None => ("keywords elided".to_string(), false, owned_labels(&chain)),
        };

        let (final_def, override_def) = if supported {
            (
                Definition::Keyword("final".to_string()),
                Definition::Keyword("override".to_string()),
            )
        } else {
            (Definition::Empty, Definition::Empty)
        };

        let final_name = ctx.names.final_keyword();
        let override_name = ctx.names.override_keyword();
        let reg = symbols.define_pair_if_absent(
            PortableSymbol::new(final_name.clone(), final_def),
            PortableSymbol::new(override_name.clone(), override_def),
        );

        let mut outcome = RuleOutcome::new(self.id(), label).consulted(compiler_fact(ctx.facts));
        outcome.rejected = rejected;
        outcome.record(reg, &[final_name, override_name]);
        Ok(outcome)
    }
}

// ============================================================================
// preadv / pwritev
// ============================================================================

/// Defines both vector I/O flags when the C library is new enough.
pub struct VectorIoRule;

impl Rule for VectorIoRule {
    fn id(&self) -> RuleId {
        RuleId::VectorIo
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        symbols: &mut SymbolTable,
    ) -> Result<RuleOutcome, ResolveError> {
        let names = [ctx.names.have_preadv(), ctx.names.have_pwritev()];

        let Some(libc) = ctx.facts.libc else {
            let mut outcome = RuleOutcome::new(self.id(), "C library unknown")
                .consulted("libc = unknown");
            outcome.undefined.extend(names);
            return Ok(outcome);
        };

        let consulted = format!("libc = {} {}", libc.family, libc.version);
        let mut outcome = match ctx.table.vector_io_min(libc.family) {
            Some(min) if libc.version >= min => {
                let reg = symbols.define_pair_if_absent(
                    PortableSymbol::new(names[0].clone(), Definition::Flag),
                    PortableSymbol::new(names[1].clone(), Definition::Flag),
                );
                let mut outcome = RuleOutcome::new(
                    self.id(),
                    format!("{} {} >= {}", libc.family, libc.version, min),
                );
                outcome.record(reg, &names);
                outcome
            }
            Some(min) => {
                let mut outcome = RuleOutcome::new(
                    self.id(),
                    format!("{} {} < {}", libc.family, libc.version, min),
                );
                outcome.undefined.extend(names);
                outcome
            }
            None => {
                let mut outcome =
                    RuleOutcome::new(self.id(), format!("no threshold for {}", libc.family));
                outcome.undefined.extend(names);
                outcome
            }
        };

        outcome.consulted.push(consulted);
        Ok(outcome)
    }
}

// ============================================================================
// Sanitizer mode
// ============================================================================

/// How AddressSanitizer is detected for a compiler family.
///
/// The strategies are not interchangeable: clang does not predefine the
/// GCC macro in every release, and GCC has no `__has_feature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizerProbe {
    /// `__has_feature(address_sanitizer)`
    FeatureQuery,
    /// Version gate plus the predefined `__SANITIZE_ADDRESS__` macro
    InstrumentationMacro { min: Version },
    /// No way to detect; never active
    Unavailable,
}

impl SanitizerProbe {
    pub fn for_compiler(family: &CompilerFamily, table: &CapabilityTable) -> Self {
        if family.is_clang_like() {
            SanitizerProbe::FeatureQuery
        } else if let Some(min) = table.sanitizer_macro_min(family) {
            SanitizerProbe::InstrumentationMacro { min }
        } else {
            SanitizerProbe::Unavailable
        }
    }

    pub fn detect(&self, facts: &BuildFacts, gate: &VersionGate) -> bool {
        match self {
            SanitizerProbe::FeatureQuery => facts.features.has_feature(ASAN_FEATURE),
            SanitizerProbe::InstrumentationMacro { min } => {
                gate.prereq(*min) && facts.features.is_predefined(ASAN_MACRO)
            }
            SanitizerProbe::Unavailable => false,
        }
    }

    fn describe(&self) -> String {
        match self {
            SanitizerProbe::FeatureQuery => format!("__has_feature({})", ASAN_FEATURE),
            SanitizerProbe::InstrumentationMacro { min } => {
                format!("version >= {} && {}", min, ASAN_MACRO)
            }
            SanitizerProbe::Unavailable => "no detection mechanism".to_string(),
        }
    }
}

/// Defines the sanitizer-active flag, only when instrumentation is confirmed.
pub struct SanitizerModeRule;

impl Rule for SanitizerModeRule {
    fn id(&self) -> RuleId {
        RuleId::SanitizerMode
    }

    fn prerequisites(&self) -> &'static [RuleId] {
        &[RuleId::VersionGate]
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        symbols: &mut SymbolTable,
    ) -> Result<RuleOutcome, ResolveError> {
        let gate = ctx.gate(self.id())?;
        let probe = SanitizerProbe::for_compiler(&ctx.facts.compiler.family, ctx.table);
        let active = probe.detect(ctx.facts, &gate);
        ctx.sanitizer_active = Some(active);

        let name = ctx.names.sanitize_address();
        let mut outcome = RuleOutcome::new(
            self.id(),
            format!("{} -> {}", probe.describe(), if active { "active" } else { "inactive" }),
        )
        .consulted(compiler_fact(ctx.facts));

        if active {
            let reg = symbols.define_if_absent(PortableSymbol::new(name.clone(), Definition::Flag));
            outcome.record(reg, &[name]);
        } else {
            outcome.undefined.push(name);
        }

        Ok(outcome)
    }
}

// ============================================================================
// Sanitizer suppression
// ============================================================================

/// Defines the suppress-instrumentation attribute from an ordered chain.
pub struct SanitizerSuppressionRule;

impl SanitizerSuppressionRule {
    /// Spelling candidates in priority order. Every non-empty spelling also
    /// disables inlining, which would otherwise reintroduce instrumentation.
    pub fn chain() -> FallbackChain<Definition> {
        let attr = |name: &str| {
            Definition::Attribute(format!("__attribute__(({}, __noinline__))", name))
        };

        FallbackChain::new()
            .candidate(
                format!("clang {}", ATTR_NO_ADDRESS_SAFETY_ANALYSIS),
                Condition::All(vec![
                    Condition::ClangLike,
                    Condition::HasAttribute(ATTR_NO_ADDRESS_SAFETY_ANALYSIS.to_string()),
                ]),
                attr(ATTR_NO_ADDRESS_SAFETY_ANALYSIS),
            )
            .candidate(
                format!("clang {}", ATTR_NO_SANITIZE_ADDRESS),
                Condition::All(vec![
                    Condition::ClangLike,
                    Condition::HasAttribute(ATTR_NO_SANITIZE_ADDRESS.to_string()),
                ]),
                attr(ATTR_NO_SANITIZE_ADDRESS),
            )
            .candidate(
                format!("gcc {}", ATTR_NO_ADDRESS_SAFETY_ANALYSIS),
                Condition::Family(CompilerFamily::Gcc),
                attr(ATTR_NO_ADDRESS_SAFETY_ANALYSIS),
            )
            .otherwise("empty", Definition::Empty)
    }
}

impl Rule for SanitizerSuppressionRule {
    fn id(&self) -> RuleId {
        RuleId::SanitizerSuppression
    }

    fn prerequisites(&self) -> &'static [RuleId] {
        &[RuleId::SanitizerMode]
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        symbols: &mut SymbolTable,
    ) -> Result<RuleOutcome, ResolveError> {
        let active = ctx.sanitizer_active(self.id())?;
        let gate = ctx.gate.unwrap_or_else(VersionGate::closed);

        let (decision, definition, rejected) = if active {
            let chain = Self::chain();
            match chain.select(ctx.facts, &gate) {
                Some(sel) => (sel.label.to_string(), sel.value.clone(), owned(&sel.rejected)),
                None => ("empty".to_string(), Definition::Empty, owned_labels(&chain)),
            }
        } else {
            ("sanitizer inactive".to_string(), Definition::Empty, Vec::new())
        };

        let name = ctx.names.disable_address_sanitizer();
        let reg = symbols.define_if_absent(PortableSymbol::new(name.clone(), definition));

        let mut outcome = RuleOutcome::new(self.id(), decision)
            .consulted(format!("sanitizer active = {}", active));
        outcome.rejected = rejected;
        outcome.record(reg, &[name]);
        Ok(outcome)
    }
}

// ============================================================================
// Namespace std bracing
// ============================================================================

/// How to open and close `namespace std` for forward declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceBracing {
    /// libc++ declares its symbols in an inline namespace inside `std`
    InlineNamespace,
    /// Plain `namespace std { ... }`
    Plain,
}

impl NamespaceBracing {
    pub fn for_stdlib(stdlib: StdLibFamily) -> Self {
        match stdlib {
            StdLibFamily::Libcxx => NamespaceBracing::InlineNamespace,
            _ => NamespaceBracing::Plain,
        }
    }

    pub fn open(&self) -> &'static str {
        match self {
            NamespaceBracing::InlineNamespace => "_LIBCPP_BEGIN_NAMESPACE_STD",
            NamespaceBracing::Plain => "namespace std {",
        }
    }

    pub fn close(&self) -> &'static str {
        match self {
            NamespaceBracing::InlineNamespace => "_LIBCPP_END_NAMESPACE_STD",
            NamespaceBracing::Plain => "}",
        }
    }

    /// Whether `open ... close` nests to zero.
    pub fn is_balanced(open: &str, close: &str) -> bool {
        let depth = |s: &str| {
            s.matches('{').count() as i64 - s.matches('}').count() as i64
                + s.matches("_BEGIN_NAMESPACE_STD").count() as i64
                - s.matches("_END_NAMESPACE_STD").count() as i64
        };
        depth(open) > 0 && depth(open) + depth(close) == 0
    }
}

/// Defines the `namespace std` open/close pair.
pub struct NamespaceBracingRule;

impl Rule for NamespaceBracingRule {
    fn id(&self) -> RuleId {
        RuleId::NamespaceBracing
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        symbols: &mut SymbolTable,
    ) -> Result<RuleOutcome, ResolveError> {
        let bracing = NamespaceBracing::for_stdlib(ctx.facts.stdlib);
        let begin = ctx.names.namespace_std_begin();
        let end = ctx.names.namespace_std_end();

        let reg = symbols.define_pair_if_absent(
            PortableSymbol::new(begin.clone(), Definition::Tokens(bracing.open().to_string())),
            PortableSymbol::new(end.clone(), Definition::Tokens(bracing.close().to_string())),
        );

        let decision = match bracing {
            NamespaceBracing::InlineNamespace => "libc++ inline namespace",
            NamespaceBracing::Plain => "plain namespace std",
        };

        let mut outcome = RuleOutcome::new(self.id(), decision)
            .consulted(format!("stdlib = {}", ctx.facts.stdlib));
        outcome.record(reg, &[begin, end]);
        Ok(outcome)
    }
}
