//! Sanity checks over charts and probability tables, for tests and for
//! tables that didn't come out of this crate's own builders.
//!
//! The parser never calls these. Each check stops at the first problem.

use thiserror::Error;

use crate::chart::{Backpointer, Chart, Derivation, ProbabilityTable, Span};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatViolation {
  /// A word marker on a span wider than one token
  #[error("{symbol} over {span} rewrites to a word but spans more than one token")]
  LeafOnWideSpan { span: Span, symbol: String },
  /// A pair of backpointers on a one-token span
  #[error("{symbol} over {span} has backpointers but spans a single token")]
  BinaryOnLeafSpan { span: Span, symbol: String },
  /// Backpointers whose spans don't exactly partition their parent
  #[error("backpointers of {symbol} over {span} cover {left} and {right}, which don't split it")]
  BadSplit {
    span: Span,
    symbol: String,
    left: Span,
    right: Span,
  },
  /// A backpointer to an entry the chart doesn't have
  #[error("{symbol} over {span} points to {target}, which isn't in the chart")]
  DanglingBackpointer {
    span: Span,
    symbol: String,
    target: Backpointer,
  },
  #[error("log probability of {symbol} over {span} is NaN")]
  NotANumber { span: Span, symbol: String },
  #[error("log probability of {symbol} over {span} may not be > 0: {value}")]
  PositiveLogProb { span: Span, symbol: String, value: f64 },
  /// A chart and probability table over different numbers of tokens
  #[error("chart covers {chart} tokens but probability table covers {probs}")]
  TokenCountMismatch { chart: usize, probs: usize },
  /// An entry present in one of a chart and probability table but not the other
  #[error("{symbol} over {span} is in only one of the chart and probability table")]
  MissingCounterpart { span: Span, symbol: String },
}

fn check_backpointer(
  chart: &Chart,
  span: Span,
  symbol: &str,
  target: &Backpointer,
) -> Result<(), FormatViolation> {
  if chart.entry(target.span, &target.symbol).is_some() {
    Ok(())
  } else {
    Err(FormatViolation::DanglingBackpointer {
      span,
      symbol: symbol.to_string(),
      target: target.clone(),
    })
  }
}

/// Checks what the chart types can't enforce on their own: words only on
/// one-token spans, backpointers that split their span exactly in two, and
/// backpointers that lead somewhere.
pub fn validate_chart(chart: &Chart) -> Result<(), FormatViolation> {
  for (span, cell) in chart.iter() {
    for (symbol, derivation) in cell.iter() {
      match derivation {
        Derivation::Leaf(_) if !span.is_leaf() => {
          return Err(FormatViolation::LeafOnWideSpan {
            span,
            symbol: symbol.to_string(),
          });
        }
        Derivation::Leaf(_) => {}
        Derivation::Binary(_, _) if span.is_leaf() => {
          return Err(FormatViolation::BinaryOnLeafSpan {
            span,
            symbol: symbol.to_string(),
          });
        }
        Derivation::Binary(left, right) => {
          let splits = left.span.start == span.start
            && left.span.end == right.span.start
            && right.span.end == span.end
            && !left.span.is_empty()
            && !right.span.is_empty();
          if !splits {
            return Err(FormatViolation::BadSplit {
              span,
              symbol: symbol.to_string(),
              left: left.span,
              right: right.span,
            });
          }
          check_backpointer(chart, span, symbol, left)?;
          check_backpointer(chart, span, symbol, right)?;
        }
      }
    }
  }
  Ok(())
}

/// Checks that every entry is a real log probability: a number, and not above 0.
pub fn validate_probs(probs: &ProbabilityTable) -> Result<(), FormatViolation> {
  for (span, cell) in probs.iter() {
    for (symbol, &value) in cell.iter() {
      if value.is_nan() {
        return Err(FormatViolation::NotANumber {
          span,
          symbol: symbol.to_string(),
        });
      }
      if value > 0.0 {
        return Err(FormatViolation::PositiveLogProb {
          span,
          symbol: symbol.to_string(),
          value,
        });
      }
    }
  }
  Ok(())
}

/// Validates both tables and checks they have entries for the same
/// (span, nonterminal) pairs.
pub fn validate_pair(chart: &Chart, probs: &ProbabilityTable) -> Result<(), FormatViolation> {
  validate_chart(chart)?;
  validate_probs(probs)?;

  if chart.num_tokens() != probs.num_tokens() {
    return Err(FormatViolation::TokenCountMismatch {
      chart: chart.num_tokens(),
      probs: probs.num_tokens(),
    });
  }

  for span in chart.spans() {
    let (Some(c), Some(p)) = (chart.get(span), probs.get(span)) else {
      continue;
    };
    let missing = c
      .symbols()
      .find(|s| !p.contains(s))
      .or_else(|| p.symbols().find(|s| !c.contains(s)));
    if let Some(symbol) = missing {
      return Err(FormatViolation::MissingCounterpart {
        span,
        symbol: symbol.to_string(),
      });
    }
  }
  Ok(())
}

fn report(kind: &str, result: Result<(), FormatViolation>) -> bool {
  match result {
    Ok(()) => true,
    Err(violation) => {
      tracing::error!(table = kind, "{}", violation);
      false
    }
  }
}

/// Whether a backpointer chart is well formed. Logs the first problem found.
pub fn check_table_format(chart: &Chart) -> bool {
  report("backpointer", validate_chart(chart))
}

/// Whether a probability table is well formed. Logs the first problem found.
pub fn check_probs_format(probs: &ProbabilityTable) -> bool {
  report("probability", validate_probs(probs))
}
