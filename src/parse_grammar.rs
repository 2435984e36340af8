//! Line-oriented reading of `.pcfg` grammar files:
//!
//! ```text
//! # comment
//! TOP ; 1.0
//! TOP -> NP PUN ; 0.5
//! NP -> flights ; 0.15
//! ```
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::GrammarError;
use crate::grammar::Grammar;
use crate::rules::{Rhs, Rule};
use crate::Err;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

/// One meaningful line of a grammar file
#[derive(Debug, Clone, PartialEq)]
enum Line {
  Start(String),
  Rule(Rule),
}

/// Reads a rule `LHS -> SYM [SYM] ; PROB`. The probability follows the last `;`.
fn parse_rule(line: &str, lineno: usize) -> Result<Rule, GrammarError> {
  regex_static!(RULE, r"^([^\s;]+)\s*->(.*);([^;]*)$");

  let caps = RULE.captures(line).ok_or_else(|| GrammarError::Syntax {
    line: lineno,
    message: format!("couldn't read rule `{}`", line),
  })?;
  let lhs = &caps[1];
  let symbols = caps[2].split_whitespace().collect::<Vec<_>>();
  let prob_str = caps[3].trim();

  let rhs = Rhs::from_symbols(symbols).ok_or_else(|| GrammarError::NotCnf {
    line: lineno,
    rule: line.to_string(),
  })?;

  let prob = prob_str.parse::<f64>().map_err(|e| GrammarError::Syntax {
    line: lineno,
    message: format!("probability `{}`: {}", prob_str, e),
  })?;
  if !(prob > 0.0 && prob <= 1.0) {
    return Err(GrammarError::BadProbability { line: lineno, prob });
  }

  Ok(Rule::new(lhs, rhs, prob))
}

/// Reads a start declaration `SYMBOL ; PROB`. The probability is ignored.
fn parse_start(line: &str, lineno: usize) -> Result<String, GrammarError> {
  regex_static!(START, r"^([^\s;]+)\s*;[^;]*$");

  START
    .captures(line)
    .map(|caps| caps[1].to_string())
    .ok_or_else(|| GrammarError::Syntax {
      line: lineno,
      message: format!("expected `SYMBOL ; PROB` or a rule, got `{}`", line),
    })
}

fn parse_line(raw: &str, lineno: usize) -> Result<Option<Line>, GrammarError> {
  let line = raw.trim();
  if line.is_empty() || line.starts_with('#') {
    Ok(None)
  } else if line.contains("->") {
    parse_rule(line, lineno).map(|r| Some(Line::Rule(r)))
  } else {
    parse_start(line, lineno).map(|s| Some(Line::Start(s)))
  }
}

/// Parses grammar text into its start symbol and rules, in file order.
/// Errors on the first malformed line, or if there isn't exactly one start
/// declaration.
pub fn parse(s: &str) -> Result<(String, Vec<Rule>), GrammarError> {
  let mut start: Option<String> = None;
  let mut rules = Vec::new();

  for (idx, raw) in s.lines().enumerate() {
    match parse_line(raw, idx + 1)? {
      None => {}
      Some(Line::Rule(rule)) => rules.push(rule),
      Some(Line::Start(symbol)) => {
        if let Some(first) = start {
          return Err(GrammarError::DuplicateStartSymbol {
            first,
            second: symbol,
          });
        }
        start = Some(symbol);
      }
    }
  }

  let start = start.ok_or(GrammarError::MissingStartSymbol)?;
  if rules.is_empty() {
    return Err(GrammarError::NoRules);
  }
  Ok((start, rules))
}

impl FromStr for Grammar {
  type Err = GrammarError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (start, rules) = parse(s)?;
    Self::new(start, rules)
  }
}

impl Grammar {
  pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, Err> {
    let src = fs::read_to_string(path)?;
    Ok(src.parse()?)
  }
}
