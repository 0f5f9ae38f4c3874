//! Capability resolution.
//!
//! This module maps one set of compile-time facts onto the portable symbol
//! vocabulary. The resolver is pure and deterministic: all I/O (fixture
//! loading, compiler probing) happens before resolution.
//!
//! Rules form a partial order (the version gate before the late-binding
//! keywords and sanitizer detection, sanitizer detection before the
//! suppression attribute). The evaluation order is a topological sort of
//! that order, stable by declaration among independent rules.

pub mod errors;
pub mod fallback;
pub mod gate;
pub mod names;
pub mod rules;

pub use errors::ResolveError;
pub use fallback::{Condition, FallbackChain};
pub use gate::VersionGate;
pub use names::{SymbolNames, DEFAULT_PREFIX};
pub use rules::{Rule, RuleId, RuleOutcome};

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::core::{BuildFacts, CapabilityTable, SymbolTable};
use rules::{builtin_rules, RuleContext};

/// The capability resolver: a rule set plus the table it consults.
pub struct Resolver {
    rules: Vec<Box<dyn Rule>>,
    table: CapabilityTable,
    names: SymbolNames,
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new(CapabilityTable::builtin(), SymbolNames::default())
    }
}

impl Resolver {
    /// Create a resolver with every built-in rule.
    pub fn new(table: CapabilityTable, names: SymbolNames) -> Self {
        Self::with_rules(builtin_rules(), table, names)
    }

    /// Create a resolver with a custom rule set.
    pub fn with_rules(rules: Vec<Box<dyn Rule>>, table: CapabilityTable, names: SymbolNames) -> Self {
        Resolver {
            rules,
            table,
            names,
        }
    }

    pub fn table(&self) -> &CapabilityTable {
        &self.table
    }

    pub fn names(&self) -> &SymbolNames {
        &self.names
    }

    /// Compute the evaluation order of the rules.
    ///
    /// Returns indices into the rule list. Among rules whose prerequisites
    /// are satisfied, the one declared first runs first.
    pub fn evaluation_order(&self) -> Result<Vec<usize>, ResolveError> {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let mut by_id: HashMap<RuleId, NodeIndex> = HashMap::new();

        for (i, rule) in self.rules.iter().enumerate() {
            by_id.insert(rule.id(), graph.add_node(i));
        }

        for rule in &self.rules {
            let node = by_id[&rule.id()];
            for prereq in rule.prerequisites() {
                let Some(&prereq_node) = by_id.get(prereq) else {
                    return Err(ResolveError::MissingPrerequisite {
                        rule: rule.id(),
                        prerequisite: *prereq,
                    });
                };
                graph.add_edge(prereq_node, node, ());
            }
        }

        if let Some(cycle) = tarjan_scc(&graph).into_iter().find(|scc| {
            scc.len() > 1 || graph.contains_edge(scc[0], scc[0])
        }) {
            let mut rules: Vec<RuleId> = cycle.iter().map(|&n| self.rules[graph[n]].id()).collect();
            rules.sort();
            return Err(ResolveError::RuleCycle { rules });
        }

        // Kahn's algorithm, picking the lowest declaration index first.
        let mut in_degree: HashMap<NodeIndex, usize> = graph
            .node_indices()
            .map(|n| (n, graph.neighbors_directed(n, Direction::Incoming).count()))
            .collect();
        let mut ready: BTreeSet<usize> = graph
            .node_indices()
            .filter(|n| in_degree[n] == 0)
            .map(|n| graph[n])
            .collect();
        let mut order = Vec::with_capacity(self.rules.len());

        while let Some(i) = ready.pop_first() {
            order.push(i);
            let node = by_id[&self.rules[i].id()];
            for next in graph.neighbors_directed(node, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&next) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(graph[next]);
                    }
                }
            }
        }

        Ok(order)
    }

    /// Resolve the facts into a fresh symbol table.
    pub fn resolve(&self, facts: &BuildFacts) -> Result<Resolution, ResolveError> {
        let mut symbols = SymbolTable::new();
        let outcomes = self.resolve_into(facts, &mut symbols)?;
        let sanitizer_active = symbols.is_defined(&self.names.sanitize_address());

        Ok(Resolution {
            facts: facts.clone(),
            names: self.names.clone(),
            symbols,
            outcomes,
            sanitizer_active,
        })
    }

    /// Resolve the facts into an existing table.
    ///
    /// Symbols already present are kept, so resolving the same facts into
    /// the same table again changes nothing.
    pub fn resolve_into(
        &self,
        facts: &BuildFacts,
        symbols: &mut SymbolTable,
    ) -> Result<Vec<RuleOutcome>, ResolveError> {
        let order = self.evaluation_order()?;
        let mut ctx = RuleContext::new(facts, &self.table, &self.names);
        let mut outcomes = Vec::with_capacity(order.len());

        tracing::debug!("resolving capabilities for {}", facts.summary());

        for i in order {
            let rule = &self.rules[i];
            let outcome = rule.apply(&mut ctx, symbols)?;
            tracing::debug!("  {}: {}", rule.id(), outcome.decision);
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

/// The result of resolving one configuration.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub facts: BuildFacts,
    pub names: SymbolNames,
    pub symbols: SymbolTable,
    pub outcomes: Vec<RuleOutcome>,
    pub sanitizer_active: bool,
}

impl Resolution {
    /// The outcome of a specific rule.
    pub fn outcome(&self, rule: RuleId) -> Option<&RuleOutcome> {
        self.outcomes.iter().find(|o| o.rule == rule)
    }

    /// Outcomes of every rule that touched the named symbol.
    pub fn outcomes_for(&self, symbol: &str) -> Vec<&RuleOutcome> {
        self.outcomes.iter().filter(|o| o.touches(symbol)).collect()
    }

    /// The expansion of a symbol, or `None` if it is undefined.
    pub fn expansion(&self, symbol: &str) -> Option<String> {
        self.symbols.definition(symbol).map(|d| d.expansion())
    }
}
