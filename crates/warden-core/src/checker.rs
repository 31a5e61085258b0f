//! Trace checking: finite-trace LTL evaluation with counterexamples.
//!
//! The checker fills a table indexed by (sub-formula, position) from the last
//! trace position back to the first. Every cell is computed from cells at the
//! same position (children) or the next position (temporal successors), so
//! each cell is computed exactly once: O(|formula| × |trace|) time and space,
//! no recursion over positions.
//!
//! A virtual column one past the last event stands for "the trace has ended".
//! Obligations that reach it unresolved (`X`, `F`, `U`) are false for
//! ordinary contracts. Best-effort contracts are evaluated twice in the same
//! sweep, once resolving pending obligations to false and once to true, with
//! negation swapping the two readings. Agreement gives a definite verdict;
//! disagreement means the trace ended too early to decide.
//!
//! `G` is never a pending obligation: a trace that ends with every position
//! satisfying φ satisfies `G φ` under both readings. `F` at the end is
//! pending, so under best effort `G φ` and `!F !φ` can differ: on `[{p}]`,
//! `G p` is satisfied while `!F !p` is inconclusive.
//!
//! Alongside each truth value the sweep records how many events are needed to
//! establish it, following the first decisive conjunct/disjunct in formula
//! order. For a violated contract that count is the length of the shortest
//! prefix that already determines the violation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::contract::{Contract, ContractSet, Formula};
use crate::trace::ExecutionTrace;

/// Outcome class of one contract check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Satisfied,
    Violated,
    /// Only for best-effort contracts whose obligations were still pending
    /// when the trace ended.
    Inconclusive,
}

impl VerdictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Satisfied => "satisfied",
            Self::Violated => "violated",
            Self::Inconclusive => "inconclusive",
        }
    }
}

/// Result of checking one contract against one trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// Name of the contract checked
    pub contract: String,

    /// True only when `status` is `Satisfied`
    pub satisfied: bool,

    pub status: VerdictStatus,

    /// Shortest trace prefix witnessing a violation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterexample: Option<ExecutionTrace>,
}

impl Verdict {
    fn new(contract: &str, status: VerdictStatus, counterexample: Option<ExecutionTrace>) -> Self {
        Self {
            contract: contract.to_string(),
            satisfied: status == VerdictStatus::Satisfied,
            status,
            counterexample,
        }
    }

    pub fn is_violated(&self) -> bool {
        self.status == VerdictStatus::Violated
    }
}

/// How obligations pending at the end of the trace resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reading {
    /// Ordinary LTLf: pending obligations are false, negation is plain.
    Finite,
    /// Pending obligations fail.
    Pessimistic,
    /// Pending obligations succeed.
    Optimistic,
}

impl Reading {
    fn dual(self) -> Self {
        match self {
            Self::Finite => Self::Finite,
            Self::Pessimistic => Self::Optimistic,
            Self::Optimistic => Self::Pessimistic,
        }
    }

    fn pending(self) -> bool {
        self == Self::Optimistic
    }

    /// Table slot of this reading. A table holds either the finite reading
    /// alone or the pessimistic/optimistic pair.
    fn slot(self) -> usize {
        match self {
            Self::Finite | Self::Pessimistic => 0,
            Self::Optimistic => 1,
        }
    }
}

/// Flattened sub-formula; children are indices of earlier nodes.
#[derive(Debug, Clone, Copy)]
enum Node<'f> {
    True,
    False,
    Atom(&'f str),
    Not(usize),
    And(usize, usize),
    Or(usize, usize),
    Implies(usize, usize),
    Next(usize),
    Until(usize, usize),
    Globally(usize),
    Eventually(usize),
}

/// Post-order flattening: every child precedes its parent, root is last.
fn flatten<'f>(formula: &'f Formula, nodes: &mut Vec<Node<'f>>) -> usize {
    let node = match formula {
        Formula::True => Node::True,
        Formula::False => Node::False,
        Formula::Atom(name) => Node::Atom(name),
        Formula::Not(inner) => Node::Not(flatten(inner, nodes)),
        Formula::Next(inner) => Node::Next(flatten(inner, nodes)),
        Formula::Globally(inner) => Node::Globally(flatten(inner, nodes)),
        Formula::Eventually(inner) => Node::Eventually(flatten(inner, nodes)),
        Formula::And(lhs, rhs) => {
            let l = flatten(lhs, nodes);
            Node::And(l, flatten(rhs, nodes))
        }
        Formula::Or(lhs, rhs) => {
            let l = flatten(lhs, nodes);
            Node::Or(l, flatten(rhs, nodes))
        }
        Formula::Implies(lhs, rhs) => {
            let l = flatten(lhs, nodes);
            Node::Implies(l, flatten(rhs, nodes))
        }
        Formula::Until(lhs, rhs) => {
            let l = flatten(lhs, nodes);
            Node::Until(l, flatten(rhs, nodes))
        }
    };
    nodes.push(node);
    nodes.len() - 1
}

/// A truth value and the number of leading events needed to establish it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    value: bool,
    need: usize,
}

impl Cell {
    fn new(value: bool, need: usize) -> Self {
        Self { value, need }
    }
}

/// The (reading × sub-formula × position) table for one formula and trace.
struct Table<'f> {
    nodes: Vec<Node<'f>>,
    readings: &'static [Reading],
    columns: usize,
    cells: Vec<Cell>,
}

impl<'f> Table<'f> {
    fn build(formula: &'f Formula, trace: &ExecutionTrace, readings: &'static [Reading]) -> Self {
        let mut nodes = Vec::with_capacity(formula.size());
        flatten(formula, &mut nodes);

        let len = trace.len();
        let columns = len + 1;
        let mut table = Self {
            cells: vec![Cell::new(false, 0); readings.len() * nodes.len() * columns],
            nodes,
            readings,
            columns,
        };

        for col in (0..columns).rev() {
            for node in 0..table.nodes.len() {
                for &reading in readings {
                    let cell = table.compute(trace, reading, node, col);
                    let idx = table.index(reading, node, col);
                    table.cells[idx] = cell;
                }
            }
        }
        table
    }

    fn index(&self, reading: Reading, node: usize, col: usize) -> usize {
        debug_assert!(self.readings.contains(&reading));
        (reading.slot() * self.nodes.len() + node) * self.columns + col
    }

    fn get(&self, reading: Reading, node: usize, col: usize) -> Cell {
        self.cells[self.index(reading, node, col)]
    }

    fn root(&self, reading: Reading) -> Cell {
        self.get(reading, self.nodes.len() - 1, 0)
    }

    fn compute(&self, trace: &ExecutionTrace, r: Reading, node: usize, col: usize) -> Cell {
        let len = self.columns - 1;
        let beyond = col == len;
        let at = |n: usize| self.get(r, n, col);
        let at_dual = |n: usize| self.get(r.dual(), n, col);
        let later = |n: usize| self.get(r, n, col + 1);

        match self.nodes[node] {
            Node::True | Node::False if beyond => {
                Cell::new(matches!(self.nodes[node], Node::True), len)
            }
            Node::True => Cell::new(true, col + 1),
            Node::False => Cell::new(false, col + 1),
            Node::Atom(_) if beyond => Cell::new(false, len),
            Node::Atom(name) => Cell::new(trace.events()[col].holds(name), col + 1),
            Node::Not(c) => {
                let inner = at_dual(c);
                Cell::new(!inner.value, inner.need)
            }
            Node::And(a, b) => {
                let (a, b) = (at(a), at(b));
                match (a.value, b.value) {
                    (true, true) => Cell::new(true, a.need.max(b.need)),
                    (false, _) => Cell::new(false, a.need),
                    (true, false) => Cell::new(false, b.need),
                }
            }
            Node::Or(a, b) => {
                let (a, b) = (at(a), at(b));
                match (a.value, b.value) {
                    (true, _) => Cell::new(true, a.need),
                    (false, true) => Cell::new(true, b.need),
                    (false, false) => Cell::new(false, a.need.max(b.need)),
                }
            }
            Node::Implies(a, b) => {
                // The antecedent sits under an implicit negation.
                let (a, b) = (at_dual(a), at(b));
                match (a.value, b.value) {
                    (false, _) => Cell::new(true, a.need),
                    (true, true) => Cell::new(true, b.need),
                    (true, false) => Cell::new(false, a.need.max(b.need)),
                }
            }
            Node::Next(_) | Node::Eventually(_) | Node::Until(..) if beyond => {
                Cell::new(r.pending(), len)
            }
            Node::Globally(_) if beyond => Cell::new(true, len),
            Node::Next(_) if col + 1 == len => Cell::new(r.pending(), len),
            Node::Next(c) => later(c),
            Node::Eventually(c) => {
                let (now, rest) = (at(c), later(node));
                match (now.value, rest.value) {
                    (true, _) => now,
                    (false, true) => rest,
                    (false, false) => Cell::new(false, now.need.max(rest.need)),
                }
            }
            Node::Globally(c) => {
                let (now, rest) = (at(c), later(node));
                match (now.value, rest.value) {
                    (false, _) => now,
                    (true, false) => rest,
                    (true, true) => Cell::new(true, now.need.max(rest.need)),
                }
            }
            Node::Until(a, b) => {
                let (a, b, rest) = (at(a), at(b), later(node));
                if b.value {
                    b
                } else if !a.value {
                    Cell::new(false, a.need.max(b.need))
                } else if rest.value {
                    Cell::new(true, a.need.max(rest.need))
                } else {
                    Cell::new(false, b.need.max(rest.need))
                }
            }
        }
    }
}

const FINITE: &[Reading] = &[Reading::Finite];
const BOUNDED: &[Reading] = &[Reading::Pessimistic, Reading::Optimistic];

/// Evaluates contracts against execution traces.
///
/// Stateless and pure: checking never blocks, never performs I/O, and the
/// same (contract, trace) pair always produces the same verdict. Safe to
/// share across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceChecker;

impl TraceChecker {
    pub fn new() -> Self {
        Self
    }

    /// Check one contract against one trace.
    pub fn check(&self, contract: &Contract, trace: &ExecutionTrace) -> Verdict {
        let verdict = if contract.is_best_effort() {
            let table = Table::build(contract.formula(), trace, BOUNDED);
            let lower = table.root(Reading::Pessimistic);
            let upper = table.root(Reading::Optimistic);

            if lower.value {
                Verdict::new(contract.name(), VerdictStatus::Satisfied, None)
            } else if !upper.value {
                Verdict::new(
                    contract.name(),
                    VerdictStatus::Violated,
                    Some(trace.prefix(upper.need)),
                )
            } else {
                Verdict::new(contract.name(), VerdictStatus::Inconclusive, None)
            }
        } else {
            let root = Table::build(contract.formula(), trace, FINITE).root(Reading::Finite);
            if root.value {
                Verdict::new(contract.name(), VerdictStatus::Satisfied, None)
            } else {
                Verdict::new(
                    contract.name(),
                    VerdictStatus::Violated,
                    Some(trace.prefix(root.need)),
                )
            }
        };

        debug!(
            contract = %contract.name(),
            status = verdict.status.as_str(),
            trace_len = trace.len(),
            counterexample_len = verdict.counterexample.as_ref().map(|c| c.len()),
            "Contract checked"
        );
        verdict
    }

    /// Check every contract in the set, in set order.
    pub fn check_all(&self, contracts: &ContractSet, trace: &ExecutionTrace) -> Vec<Verdict> {
        contracts
            .contracts()
            .iter()
            .map(|contract| self.check(contract, trace))
            .collect()
    }

    /// Whether `formula` holds at the start of `trace` under ordinary LTLf.
    pub fn holds(&self, formula: &Formula, trace: &ExecutionTrace) -> bool {
        Table::build(formula, trace, FINITE).root(Reading::Finite).value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::parse_formula;

    fn contract(formula: &str) -> Contract {
        Contract::from_formula("test", parse_formula(formula).unwrap()).unwrap()
    }

    fn trace(steps: &[&[&str]]) -> ExecutionTrace {
        ExecutionTrace::from_labels(steps.iter().map(|s| s.iter().copied()))
    }

    fn check(formula: &str, steps: &[&[&str]]) -> Verdict {
        TraceChecker::new().check(&contract(formula), &trace(steps))
    }

    #[test]
    fn test_response_follows_request() {
        let verdict = check("G(request -> F response)", &[&["request"], &[], &["response"]]);
        assert_eq!(verdict.status, VerdictStatus::Satisfied);
        assert!(verdict.satisfied);
        assert!(verdict.counterexample.is_none());
    }

    #[test]
    fn test_unanswered_request_needs_whole_trace() {
        let verdict = check("G(request -> F response)", &[&["request"], &[]]);
        assert_eq!(verdict.status, VerdictStatus::Violated);
        assert!(!verdict.satisfied);
        assert_eq!(verdict.counterexample, Some(trace(&[&["request"], &[]])));
    }

    #[test]
    fn test_safety_counterexample_stops_at_violation() {
        let verdict = check(
            "G(!unauthorized_action)",
            &[&[], &["unauthorized_action"], &[], &[]],
        );
        assert_eq!(verdict.status, VerdictStatus::Violated);
        assert_eq!(
            verdict.counterexample,
            Some(trace(&[&[], &["unauthorized_action"]]))
        );
    }

    #[test]
    fn test_next_at_last_position_is_false() {
        assert!(check("X a", &[&["b"]]).is_violated());
        assert!(!check("X a", &[&["b"], &["a"]]).is_violated());
        // the dual, weak next, holds at the end
        assert!(check("!X !a", &[&["b"]]).satisfied);
    }

    #[test]
    fn test_until_requires_witness() {
        assert!(check("a U b", &[&["a"], &["a"], &["b"]]).satisfied);
        assert!(check("a U b", &[&["a"], &["a"]]).is_violated());
        assert!(check("a U b", &[&["a"], &[], &["b"]]).is_violated());
        assert!(check("a U b", &[&["b"]]).satisfied);
    }

    #[test]
    fn test_until_counterexample_ends_at_break() {
        let verdict = check("a U b", &[&["a"], &[], &["b"]]);
        assert_eq!(verdict.counterexample.unwrap().len(), 2);
    }

    #[test]
    fn test_first_violating_conjunct_decides_prefix() {
        // both conjuncts fail; `G !x` fails at event 1, `F y` needs the whole trace
        let verdict = check("G !x & F y", &[&[], &["x"], &[], &[]]);
        assert_eq!(verdict.counterexample.unwrap().len(), 2);

        let verdict = check("F y & G !x", &[&[], &["x"], &[], &[]]);
        assert_eq!(verdict.counterexample.unwrap().len(), 4);
    }

    #[test]
    fn test_unrelated_labels_are_ignored() {
        let verdict = check("G !bad", &[&["noise", "other"], &["telemetry"]]);
        assert!(verdict.satisfied);
    }

    #[test]
    fn test_empty_trace() {
        assert!(check("G !bad", &[]).satisfied);
        assert!(check("G(request -> F response)", &[]).satisfied);

        let verdict = check("F done", &[]);
        assert!(verdict.is_violated());
        assert_eq!(verdict.counterexample.unwrap().len(), 0);
    }

    #[test]
    fn test_terminal_must_be_last() {
        let formula = "G(terminal -> !(X true))";
        assert!(check(formula, &[&[], &["terminal"]]).satisfied);

        let verdict = check(formula, &[&["terminal"], &[], &[]]);
        assert!(verdict.is_violated());
        assert_eq!(verdict.counterexample.unwrap().len(), 2);
    }

    #[test]
    fn test_best_effort_pending_is_inconclusive() {
        let contract = contract("G(error -> F escalated)").best_effort();
        let checker = TraceChecker::new();

        let pending = checker.check(&contract, &trace(&[&[], &["error"]]));
        assert_eq!(pending.status, VerdictStatus::Inconclusive);
        assert!(!pending.satisfied);
        assert!(pending.counterexample.is_none());

        let resolved = checker.check(&contract, &trace(&[&["error"], &["escalated"]]));
        assert_eq!(resolved.status, VerdictStatus::Satisfied);
    }

    #[test]
    fn test_best_effort_still_reports_definite_violations() {
        let contract = contract("G !bad & F done").best_effort();
        let verdict = TraceChecker::new().check(&contract, &trace(&[&[], &["bad"], &[]]));
        assert_eq!(verdict.status, VerdictStatus::Violated);
        assert_eq!(verdict.counterexample.unwrap().len(), 2);
    }

    #[test]
    fn test_best_effort_negated_obligation() {
        // !F a: "a never happens"; pending F flips under negation
        let contract = contract("!F a").best_effort();
        let checker = TraceChecker::new();

        assert_eq!(
            checker.check(&contract, &trace(&[&[], &[]])).status,
            VerdictStatus::Inconclusive
        );
        assert_eq!(
            checker.check(&contract, &trace(&[&["a"], &[]])).status,
            VerdictStatus::Violated
        );
    }

    #[test]
    fn test_best_effort_globally_is_not_dual_of_eventually() {
        let checker = TraceChecker::new();
        let single = trace(&[&["p"]]);

        let globally = checker.check(&contract("G p").best_effort(), &single);
        assert_eq!(globally.status, VerdictStatus::Satisfied);

        let dual = checker.check(&contract("!F !p").best_effort(), &single);
        assert_eq!(dual.status, VerdictStatus::Inconclusive);

        // the ordinary reading keeps the identity
        assert!(checker.holds(&parse_formula("G p").unwrap(), &single));
        assert!(checker.holds(&parse_formula("!F !p").unwrap(), &single));
    }

    #[test]
    fn test_check_all_preserves_order() {
        let mut set = ContractSet::new(["a", "b"]).unwrap();
        set.add("first", "G a", false).unwrap();
        set.add("second", "F b", false).unwrap();

        let verdicts = TraceChecker::new().check_all(&set, &trace(&[&["a"], &["a", "b"]]));
        let names: Vec<_> = verdicts.iter().map(|v| v.contract.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(verdicts.iter().all(|v| v.satisfied));
    }

    #[test]
    fn test_holds() {
        let checker = TraceChecker::new();
        let formula = parse_formula("F(a & X b)").unwrap();
        assert!(checker.holds(&formula, &trace(&[&[], &["a"], &["b"]])));
        assert!(!checker.holds(&formula, &trace(&[&["b"], &["a"]])));
    }

    #[test]
    fn test_verdict_serialization() {
        let verdict = check("G !bad", &[&["bad"]]);
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["status"], "violated");
        assert_eq!(json["counterexample"]["events"][0]["labels"][0], "bad");
    }
}
