use std::sync::Arc;

use tracing::{debug, trace};

use crate::chart::{Backpointer, Cell, Chart, Derivation, MembershipChart, ProbabilityTable, Span};
use crate::error::CykError;
use crate::grammar::Grammar;
use crate::syntree::{Constituent, ParseTree, SynTree, Word};

/// Fills a chart recording only which nonterminals can cover each span.
pub fn membership_chart<S>(g: &Grammar, input: &[S]) -> MembershipChart
where
  S: AsRef<str>,
{
  let n = input.len();
  let _span = tracing::debug_span!("membership_chart", tokens = n).entered();
  let mut chart = MembershipChart::new(n);

  for (i, token) in input.iter().enumerate() {
    let token = token.as_ref();
    let mut cell = Cell::new();
    for rule in g.rules_for_unary_rhs(token) {
      cell.insert_if_absent(&rule.lhs, ());
    }
    if cell.is_empty() {
      debug!(token, position = i, "no rule produces token");
    }
    chart.fill(Span::new(i, i + 1), cell);
  }

  for width in 2..=n {
    for start in 0..=(n - width) {
      let span = Span::new(start, start + width);
      let mut cell = Cell::new();

      for k in (span.start + 1)..span.end {
        let (left, right) = span.split_at(k);
        let (Some(left), Some(right)) = (chart.get(left), chart.get(right)) else {
          continue;
        };

        for a in left.symbols() {
          for b in right.symbols() {
            for rule in g.rules_for_binary_rhs(a, b) {
              cell.insert_if_absent(&rule.lhs, ());
            }
          }
        }
      }

      chart.fill(span, cell);
    }
  }

  chart
}

/// Whether the start symbol of `g` covers all of `input`.
/// A CNF grammar can't derive the empty string, so empty input is never in
/// the language.
pub fn is_in_language<S>(g: &Grammar, input: &[S]) -> bool
where
  S: AsRef<str>,
{
  if input.is_empty() {
    return false;
  }
  membership_chart(g, input)
    .entry(Span::new(0, input.len()), g.start())
    .is_some()
}

/// Records `derivation` for `lhs` if `candidate` beats what the cell already
/// holds. An absent entry loses to anything; on an exact tie the entry that
/// was there first stays.
fn offer<F>(
  span: Span,
  cell: &mut Cell<Derivation>,
  probs: &mut Cell<f64>,
  lhs: &str,
  candidate: f64,
  derivation: F,
) where
  F: FnOnce() -> Derivation,
{
  let best = probs.get(lhs).copied().unwrap_or(f64::NEG_INFINITY);
  if candidate > best {
    trace!(span = %span, lhs, logprob = candidate, "new best derivation");
    cell.insert(lhs, derivation());
    probs.insert(lhs, candidate);
  }
}

/// Fills a chart with the most probable derivation of every (span,
/// nonterminal) pair, alongside a table of their base-2 log-probabilities.
///
/// Candidates are tried split point by split point from the left, then by
/// left constituent, right constituent, and rule in the order each was first
/// recorded or declared. Of equally probable derivations the first one tried
/// wins, so the result is fully determined by the grammar and the input.
pub fn viterbi_chart<S>(g: &Grammar, input: &[S]) -> (Chart, ProbabilityTable)
where
  S: AsRef<str>,
{
  let n = input.len();
  let _span = tracing::debug_span!("viterbi_chart", tokens = n).entered();
  let mut chart = Chart::new(n);
  let mut probs = ProbabilityTable::new(n);

  for (i, token) in input.iter().enumerate() {
    let token = token.as_ref();
    let span = Span::new(i, i + 1);
    let mut cell = Cell::new();
    let mut prob_cell = Cell::new();

    for rule in g.rules_for_unary_rhs(token) {
      offer(span, &mut cell, &mut prob_cell, &rule.lhs, rule.log_prob(), || {
        Derivation::Leaf(token.to_string())
      });
    }
    if cell.is_empty() {
      debug!(token, position = i, "no rule produces token");
    }

    chart.fill(span, cell);
    probs.fill(span, prob_cell);
  }

  for width in 2..=n {
    for start in 0..=(n - width) {
      let span = Span::new(start, start + width);
      let mut cell = Cell::new();
      let mut prob_cell = Cell::new();

      for k in (span.start + 1)..span.end {
        let (left_span, right_span) = span.split_at(k);
        let (Some(left), Some(right)) = (probs.get(left_span), probs.get(right_span)) else {
          continue;
        };

        for (a, &a_prob) in left.iter() {
          for (b, &b_prob) in right.iter() {
            for rule in g.rules_for_binary_rhs(a, b) {
              let candidate = a_prob + b_prob + rule.log_prob();
              offer(span, &mut cell, &mut prob_cell, &rule.lhs, candidate, || {
                Derivation::Binary(
                  Backpointer::new(a, left_span),
                  Backpointer::new(b, right_span),
                )
              });
            }
          }
        }
      }

      chart.fill(span, cell);
      probs.fill(span, prob_cell);
    }
  }

  debug!(entries = chart.num_entries(), "filled chart");
  (chart, probs)
}

/// Rebuilds the tree rooted at `symbol` over `start..end` by following
/// backpointers down the chart.
///
/// Asking for an entry the chart doesn't have is a caller error, reported as
/// `NoDerivation`, distinct from a sentence simply having no parse.
pub fn get_tree(chart: &Chart, start: usize, end: usize, symbol: &str) -> Result<ParseTree, CykError> {
  let span = Span::new(start, end);
  if chart.get(span).is_none() {
    return Err(CykError::MalformedInput(format!(
      "span {} is outside a chart over {} tokens",
      span,
      chart.num_tokens()
    )));
  }
  build_tree(chart, span, symbol)
}

fn build_tree(chart: &Chart, span: Span, symbol: &str) -> Result<ParseTree, CykError> {
  let constituent = Constituent {
    value: symbol.to_string(),
    span,
  };

  match chart.entry(span, symbol) {
    None => Err(CykError::NoDerivation {
      symbol: symbol.to_string(),
      span,
    }),
    Some(Derivation::Leaf(token)) => Ok(SynTree::Branch(
      constituent,
      vec![SynTree::Leaf(Word {
        value: token.clone(),
        span,
      })],
    )),
    Some(Derivation::Binary(left, right)) => {
      // both halves must be non-empty and meet, or the walk would not shrink
      let splits = left.span.start == span.start
        && left.span.end == right.span.start
        && right.span.end == span.end
        && !left.span.is_empty()
        && !right.span.is_empty();
      if !splits {
        return Err(CykError::MalformedInput(format!(
          "backpointers {} {} don't split {}",
          left, right, span
        )));
      }

      let children = vec![
        build_tree(chart, left.span, &left.symbol)?,
        build_tree(chart, right.span, &right.symbol)?,
      ];
      Ok(SynTree::Branch(constituent, children))
    }
  }
}

/// Runs the weighted builder and pulls out the start symbol's tree over the
/// whole input, with its log-probability.
pub fn best_parse<S>(g: &Grammar, input: &[S]) -> Option<(ParseTree, f64)>
where
  S: AsRef<str>,
{
  if input.is_empty() {
    return None;
  }
  let (chart, probs) = viterbi_chart(g, input);
  root_parse(&chart, &probs, g.start())
}

/// The tree and log-probability of `symbol` over the whole input, if the
/// tables have one. A recorded entry that can't be rebuilt is logged.
fn root_parse(chart: &Chart, probs: &ProbabilityTable, symbol: &str) -> Option<(ParseTree, f64)> {
  let root = Span::new(0, chart.num_tokens());
  let logprob = *probs.entry(root, symbol)?;
  match get_tree(chart, root.start, root.end, symbol) {
    Ok(tree) => Some((tree, logprob)),
    Err(e) => {
      debug!(error = %e, symbol, "couldn't rebuild a recorded parse");
      None
    }
  }
}

/// A CKY parser over a shared, read-only grammar.
///
/// Cloning a parser is cheap, and the grammar can be shared between parsers
/// on different threads; every parse owns its own charts.
#[derive(Debug, Clone)]
pub struct CkyParser {
  grammar: Arc<Grammar>,
}

impl CkyParser {
  pub fn new(grammar: impl Into<Arc<Grammar>>) -> Self {
    Self {
      grammar: grammar.into(),
    }
  }

  pub fn grammar(&self) -> &Grammar {
    &self.grammar
  }

  pub fn is_in_language<S>(&self, tokens: &[S]) -> bool
  where
    S: AsRef<str>,
  {
    is_in_language(&self.grammar, tokens)
  }

  pub fn parse_with_backpointers<S>(&self, tokens: &[S]) -> (Chart, ProbabilityTable)
  where
    S: AsRef<str>,
  {
    viterbi_chart(&self.grammar, tokens)
  }

  /// The most probable tree for the whole sentence, with its log-probability,
  /// or `None` if the sentence isn't in the language.
  pub fn best_parse<S>(&self, tokens: &[S]) -> Option<(ParseTree, f64)>
  where
    S: AsRef<str>,
  {
    best_parse(&self.grammar, tokens)
  }
}
