use std::fmt;

/// The right hand side of a CNF rule: either a single terminal (a word) or
/// exactly two nonterminals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rhs {
  Terminal(String),
  Pair(String, String),
}

impl Rhs {
  /// Builds a right hand side from a list of symbols, if it has a CNF shape.
  /// One symbol is read as a terminal, two as a pair of nonterminals.
  pub fn from_symbols<S>(symbols: Vec<S>) -> Option<Self>
  where
    S: Into<String>,
  {
    let mut iter = symbols.into_iter();
    match (iter.next(), iter.next(), iter.next()) {
      (Some(t), None, None) => Some(Self::Terminal(t.into())),
      (Some(a), Some(b), None) => Some(Self::Pair(a.into(), b.into())),
      _ => None,
    }
  }
}

impl fmt::Display for Rhs {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Terminal(t) => write!(f, "{}", t),
      Self::Pair(a, b) => write!(f, "{} {}", a, b),
    }
  }
}

/// A weighted CNF rule `lhs -> rhs` with probability `prob`
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
  pub lhs: String,
  pub rhs: Rhs,
  pub prob: f64,
}

impl Rule {
  pub fn new(lhs: impl Into<String>, rhs: Rhs, prob: f64) -> Self {
    Self {
      lhs: lhs.into(),
      rhs,
      prob,
    }
  }

  /// Shorthand for a lexical rule `lhs -> word`
  pub fn terminal(lhs: impl Into<String>, word: impl Into<String>, prob: f64) -> Self {
    Self::new(lhs, Rhs::Terminal(word.into()), prob)
  }

  /// Shorthand for a binary rule `lhs -> left right`
  pub fn binary(
    lhs: impl Into<String>,
    left: impl Into<String>,
    right: impl Into<String>,
    prob: f64,
  ) -> Self {
    Self::new(lhs, Rhs::Pair(left.into(), right.into()), prob)
  }

  /// Base-2 log of the rule probability
  pub fn log_prob(&self) -> f64 {
    self.prob.log2()
  }
}

impl fmt::Display for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} -> {} ; {}", self.lhs, self.rhs, self.prob)
  }
}
