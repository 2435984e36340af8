use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use tracing::debug;

use crate::error::GrammarError;
use crate::rules::{Rhs, Rule};
use crate::utils::{fsum, is_close};

/// How far the rule probabilities of one left hand side may stray from 1
pub const PROB_TOLERANCE: f64 = 1e-6;

/// A PCFG in Chomsky Normal Form.
///
/// Rules are owned in a flat list, and the lookup tables hold indices into it,
/// so a grammar can be shared between threads once built.
#[derive(Debug, Clone)]
pub struct Grammar {
  start: String,
  rules: Vec<Rule>,
  by_terminal: HashMap<String, Vec<usize>>,
  by_pair: HashMap<String, HashMap<String, Vec<usize>>>,
  by_lhs: BTreeMap<String, Vec<usize>>,
}

impl Grammar {
  /// Indexes `rules` for lookup by right hand side. Fails if a rule's
  /// probability is outside (0, 1], since its log would never win a cell.
  pub fn new(start: impl Into<String>, rules: Vec<Rule>) -> Result<Self, GrammarError> {
    let start = start.into();
    let _span = tracing::debug_span!("grammar_new", start = %start, rules = rules.len()).entered();

    if let Some(rule) = rules.iter().find(|r| !(r.prob > 0.0 && r.prob <= 1.0)) {
      return Err(GrammarError::BadRuleProbability {
        rule: rule.to_string(),
        prob: rule.prob,
      });
    }

    let mut by_terminal: HashMap<String, Vec<usize>> = HashMap::new();
    let mut by_pair: HashMap<String, HashMap<String, Vec<usize>>> = HashMap::new();
    let mut by_lhs: BTreeMap<String, Vec<usize>> = BTreeMap::new();

    for (idx, rule) in rules.iter().enumerate() {
      match &rule.rhs {
        Rhs::Terminal(t) => by_terminal.entry(t.clone()).or_default().push(idx),
        Rhs::Pair(a, b) => by_pair
          .entry(a.clone())
          .or_default()
          .entry(b.clone())
          .or_default()
          .push(idx),
      }
      by_lhs.entry(rule.lhs.clone()).or_default().push(idx);
    }

    debug!(
      terminals = by_terminal.len(),
      nonterminals = by_lhs.len(),
      "built grammar indices"
    );

    Ok(Self {
      start,
      rules,
      by_terminal,
      by_pair,
      by_lhs,
    })
  }

  pub fn start(&self) -> &str {
    &self.start
  }

  pub fn rules(&self) -> &[Rule] {
    &self.rules
  }

  fn resolve<'a>(
    &'a self,
    idxs: Option<&'a Vec<usize>>,
  ) -> impl Iterator<Item = &'a Rule> + use<'a> {
    idxs.into_iter().flatten().map(move |&idx| &self.rules[idx])
  }

  /// All rules `X -> left right`, in the order they were declared
  pub fn rules_for_binary_rhs<'a>(
    &'a self,
    left: &str,
    right: &str,
  ) -> impl Iterator<Item = &'a Rule> + use<'a> {
    self.resolve(self.by_pair.get(left).and_then(|m| m.get(right)))
  }

  /// All rules `X -> terminal`, in the order they were declared
  pub fn rules_for_unary_rhs<'a>(
    &'a self,
    terminal: &str,
  ) -> impl Iterator<Item = &'a Rule> + use<'a> {
    self.resolve(self.by_terminal.get(terminal))
  }

  /// All rules with left hand side `lhs`
  pub fn rules_for_lhs<'a>(&'a self, lhs: &str) -> impl Iterator<Item = &'a Rule> + use<'a> {
    self.resolve(self.by_lhs.get(lhs))
  }

  /// Symbols that appear on the left of some rule, sorted
  pub fn nonterminals(&self) -> impl Iterator<Item = &str> {
    self.by_lhs.keys().map(String::as_str)
  }

  /// Words the grammar can produce, sorted
  pub fn terminals(&self) -> BTreeSet<&str> {
    self.by_terminal.keys().map(String::as_str).collect()
  }

  /// Checks that the rules of every left hand side form a probability
  /// distribution, and names the first (in sorted order) that doesn't.
  pub fn verify(&self) -> Result<(), GrammarError> {
    for (lhs, idxs) in self.by_lhs.iter() {
      let sum = fsum(idxs.iter().map(|&idx| self.rules[idx].prob));
      if !is_close(sum, 1.0, PROB_TOLERANCE) {
        debug!(lhs = %lhs, sum, "rule probabilities don't sum to 1");
        return Err(GrammarError::ProbabilitiesDontSum {
          lhs: lhs.clone(),
          sum,
        });
      }
    }
    Ok(())
  }

  pub fn is_valid_pcfg(&self) -> bool {
    self.verify().is_ok()
  }
}

/// Prints the grammar back in the format `parse_grammar` reads
impl fmt::Display for Grammar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{} ; 1.0", self.start)?;
    for rule in self.rules.iter() {
      writeln!(f, "{}", rule)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn toy() -> Grammar {
    Grammar::new(
      "S",
      vec![
        Rule::binary("S", "A", "B", 1.0),
        Rule::terminal("A", "a", 1.0),
        Rule::terminal("B", "b", 1.0),
      ],
    ).unwrap()
  }

  #[test]
  fn test_lookups() {
    let g = toy();
    assert_eq!(g.start(), "S");

    let rules = g.rules_for_binary_rhs("A", "B").collect::<Vec<_>>();
    assert_eq!(rules, vec![&Rule::binary("S", "A", "B", 1.0)]);

    let rules = g.rules_for_unary_rhs("a").collect::<Vec<_>>();
    assert_eq!(rules, vec![&Rule::terminal("A", "a", 1.0)]);

    assert_eq!(g.rules_for_binary_rhs("B", "A").count(), 0);
    assert_eq!(g.rules_for_binary_rhs("Q", "A").count(), 0);
    assert_eq!(g.rules_for_unary_rhs("c").count(), 0);
    assert_eq!(g.rules_for_lhs("S").count(), 1);

    assert_eq!(g.nonterminals().collect::<Vec<_>>(), vec!["A", "B", "S"]);
    assert_eq!(g.terminals().into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
  }

  #[test]
  fn test_lookup_keeps_declaration_order() {
    let g = Grammar::new(
      "S",
      vec![
        Rule::binary("S", "A", "A", 0.5),
        Rule::binary("T", "A", "A", 1.0),
        Rule::binary("S", "A", "B", 0.5),
        Rule::terminal("A", "a", 1.0),
      ],
    ).unwrap();

    let lhss = g
      .rules_for_binary_rhs("A", "A")
      .map(|r| r.lhs.as_str())
      .collect::<Vec<_>>();
    assert_eq!(lhss, vec!["S", "T"]);
  }

  #[test]
  fn test_valid_pcfg() {
    assert!(toy().is_valid_pcfg());

    let g = Grammar::new(
      "S",
      vec![
        Rule::binary("S", "A", "B", 0.3),
        Rule::binary("S", "B", "A", 0.7 + 1e-9),
        Rule::terminal("A", "a", 1.0),
        Rule::terminal("B", "b", 1.0),
      ],
    ).unwrap();
    assert!(g.is_valid_pcfg());
  }

  #[test]
  fn test_invalid_pcfg_names_symbol() {
    let g = Grammar::new(
      "S",
      vec![
        Rule::binary("S", "A", "B", 1.0),
        Rule::terminal("A", "a", 0.5),
        Rule::terminal("A", "b", 0.47),
        Rule::terminal("B", "b", 1.0),
      ],
    ).unwrap();

    assert!(!g.is_valid_pcfg());
    match g.verify() {
      Err(GrammarError::ProbabilitiesDontSum { lhs, sum }) => {
        assert_eq!(lhs, "A");
        assert!(is_close(sum, 0.97, 1e-12));
      }
      other => panic!("expected ProbabilitiesDontSum, got {:?}", other),
    }
  }

  #[test]
  fn test_rejects_probability_out_of_range() {
    for prob in [0.0, -0.5, 1.5, f64::NAN] {
      let result = Grammar::new(
        "S",
        vec![Rule::binary("S", "A", "A", prob), Rule::terminal("A", "a", 1.0)],
      );
      match result {
        Err(GrammarError::BadRuleProbability { rule, .. }) => {
          assert_eq!(rule, Rule::binary("S", "A", "A", prob).to_string());
        }
        other => panic!("expected BadRuleProbability for {}, got {:?}", prob, other),
      }
    }
  }

  #[test]
  fn test_grammar_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Grammar>();
  }
}
