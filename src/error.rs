use thiserror::Error;

use crate::chart::Span;

/// Everything that can be wrong with a grammar, either in its text or in its
/// probabilities.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GrammarError {
  /// A line of grammar text that couldn't be read as a rule or start declaration
  #[error("line {line}: {message}")]
  Syntax { line: usize, message: String },
  /// A rule whose right hand side isn't one terminal or two nonterminals
  #[error("line {line}: rule `{rule}` is not in CNF (expected one terminal or two nonterminals)")]
  NotCnf { line: usize, rule: String },
  /// A rule probability outside of (0, 1]
  #[error("line {line}: probability {prob} is not in (0, 1]")]
  BadProbability { line: usize, prob: f64 },
  /// Same as `BadProbability`, for rules that didn't come from text
  #[error("rule `{rule}` has probability {prob}, which is not in (0, 1]")]
  BadRuleProbability { rule: String, prob: f64 },
  #[error("grammar has no start symbol declaration")]
  MissingStartSymbol,
  /// A grammar with a start symbol but no rules
  #[error("empty ruleset")]
  NoRules,
  #[error("grammar declares more than one start symbol: {first} and {second}")]
  DuplicateStartSymbol { first: String, second: String },
  /// The rules for `lhs` don't form a probability distribution
  #[error("probabilities of rules for {lhs} sum to {sum}, not 1")]
  ProbabilitiesDontSum { lhs: String, sum: f64 },
}

/// Errors raised by the parser proper.
///
/// A sentence with no parse is *not* an error: membership just comes back
/// false. `NoDerivation` is reserved for asking the chart for a tree it
/// doesn't contain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CykError {
  #[error("invalid grammar: {0}")]
  InvalidGrammar(#[from] GrammarError),
  #[error("no derivation of {symbol} over span {span} in chart")]
  NoDerivation { symbol: String, span: Span },
  #[error("malformed input: {0}")]
  MalformedInput(String),
}
