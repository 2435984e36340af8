#[macro_use]
extern crate lazy_static;

pub mod chart;
pub mod cyk;
pub mod error;
pub mod grammar;
pub mod parse_grammar;
pub mod rules;
pub mod syntree;
pub mod utils;
pub mod validate;

pub use crate::chart::{Backpointer, Cell, Chart, Derivation, ProbabilityTable, Span, Table};
pub use crate::cyk::{get_tree, CkyParser};
pub use crate::error::{CykError, GrammarError};
pub use crate::grammar::Grammar;
pub use crate::rules::{Rhs, Rule};
pub use crate::syntree::{ParseTree, SynTree};
pub use crate::utils::Err;

impl Grammar {
  pub fn parse_chart<S>(&self, input: &[S]) -> (Chart, ProbabilityTable)
  where
    S: AsRef<str>,
  {
    cyk::viterbi_chart(self, input)
  }

  pub fn accepts<S>(&self, input: &[S]) -> bool
  where
    S: AsRef<str>,
  {
    cyk::is_in_language(self, input)
  }

  /// The most probable parse of `input` and its base-2 log-probability
  pub fn parse<S>(&self, input: &[S]) -> Option<(ParseTree, f64)>
  where
    S: AsRef<str>,
  {
    cyk::best_parse(self, input)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::utils::is_close;
  use crate::validate::validate_pair;

  const FLIGHTS: &str = include_str!("../grammars/flights.pcfg");
  const TOY: &str = include_str!("../grammars/toy.pcfg");

  const SENTENCES: &[&str] = &[
    "flights from miami to cleveland .",
    "miami flights cleveland from to .",
    "show me the cheapest flight on tuesday .",
    "i want a flight from miami .",
    "the flight .",
    "show me flights .",
    "flights flights .",
    "the .",
    "to miami",
    "show me the flights from cleveland to miami on tuesday .",
  ];

  fn tokens(s: &str) -> Vec<&str> {
    s.split_whitespace().collect()
  }

  #[test]
  fn test_toy_file() {
    let g: Grammar = TOY.parse().unwrap();
    let parser = CkyParser::new(g);

    assert!(parser.is_in_language(&["a", "b"]));
    assert!(!parser.is_in_language(&["b", "a"]));

    let (chart, probs) = parser.parse_with_backpointers(&["a", "b"]);
    assert_eq!(
      chart.entry(Span::new(0, 2), "S"),
      Some(&Derivation::Binary(
        Backpointer::new("A", Span::new(0, 1)),
        Backpointer::new("B", Span::new(1, 2)),
      ))
    );
    assert_eq!(probs.entry(Span::new(0, 2), "S"), Some(&0.0));
    assert_eq!(
      get_tree(&chart, 0, 2, "S").unwrap().bracketed(),
      "(S (A a) (B b))"
    );
  }

  #[test]
  fn test_flights_parses() {
    let g: Grammar = FLIGHTS.parse().unwrap();

    let cases: [(&str, &str, f64); 4] = [
      (
        "the flight .",
        "(TOP (NP (DT the) (NN flight)) (PUN .))",
        0.027,
      ),
      (
        "show me flights .",
        "(TOP (VP (VX (VDAT show) (NP me)) (NP flights)) (PUN .))",
        0.000675,
      ),
      (
        "i want a flight from miami .",
        "(TOP (S (NP i) (VP (V want) (NP (NP (DT a) (NN flight)) (PP (P from) (NP miami))))) (PUN .))",
        1.5552e-6,
      ),
      (
        "show me the cheapest flight on tuesday .",
        "(TOP (VP (VX (VDAT show) (NP me)) (NP (NP (DT the) (NOM (JJ cheapest) (NN flight))) (PP (P on) (NP tuesday)))) (PUN .))",
        2.43e-7,
      ),
    ];

    for (sentence, bracketed, prob) in cases {
      let (tree, logprob) = g.parse(&tokens(sentence)).unwrap();
      assert_eq!(tree.bracketed(), bracketed, "{}", sentence);
      assert!(
        is_close(logprob, prob.log2(), 1e-9),
        "{}: {} vs {}",
        sentence,
        logprob,
        prob.log2()
      );
    }

    assert!(g.accepts(&tokens("flights from miami to cleveland .")));
    assert!(!g.accepts(&tokens("miami flights cleveland from to .")));
    assert!(g.parse(&tokens("miami flights cleveland from to .")).is_none());
  }

  #[test]
  fn test_membership_agrees_with_chart() {
    let g: Grammar = FLIGHTS.parse().unwrap();
    for sentence in SENTENCES {
      let input = tokens(sentence);
      let (chart, _) = g.parse_chart(&input);
      let in_chart = chart.entry(Span::new(0, input.len()), g.start()).is_some();
      assert_eq!(g.accepts(&input), in_chart, "{}", sentence);
    }
  }

  #[test]
  fn test_parsing_is_deterministic() {
    let g: Grammar = FLIGHTS.parse().unwrap();
    for sentence in SENTENCES {
      let input = tokens(sentence);
      let (chart1, probs1) = g.parse_chart(&input);
      let (chart2, probs2) = g.parse_chart(&input);
      assert_eq!(chart1, chart2);

      for span in probs1.spans() {
        let c1 = probs1.get(span).unwrap();
        let c2 = probs2.get(span).unwrap();
        let bits1 = c1.iter().map(|(s, p)| (s, p.to_bits())).collect::<Vec<_>>();
        let bits2 = c2.iter().map(|(s, p)| (s, p.to_bits())).collect::<Vec<_>>();
        assert_eq!(bits1, bits2, "{} at {}", sentence, span);
      }
    }
  }

  #[test]
  fn test_stored_probability_beats_every_candidate() {
    let g: Grammar = FLIGHTS.parse().unwrap();
    for sentence in SENTENCES {
      let input = tokens(sentence);
      let (_, probs) = g.parse_chart(&input);

      for (i, token) in input.iter().enumerate() {
        for rule in g.rules_for_unary_rhs(token) {
          let best = probs.entry(Span::new(i, i + 1), &rule.lhs).unwrap();
          assert!(*best >= rule.log_prob());
        }
      }

      for span in probs.spans().filter(|s| s.len() > 1) {
        for k in (span.start + 1)..span.end {
          let (l, r) = span.split_at(k);
          for (a, pa) in probs.get(l).unwrap().iter() {
            for (b, pb) in probs.get(r).unwrap().iter() {
              for rule in g.rules_for_binary_rhs(a, b) {
                let candidate = pa + pb + rule.log_prob();
                let best = probs.entry(span, &rule.lhs).unwrap();
                assert!(*best >= candidate, "{} {} at {}", sentence, rule, span);
              }
            }
          }
        }
      }
    }
  }

  #[test]
  fn test_extracted_trees_are_well_formed() {
    let g: Grammar = FLIGHTS.parse().unwrap();
    for sentence in SENTENCES {
      let input = tokens(sentence);
      let (chart, probs) = g.parse_chart(&input);
      assert_eq!(validate_pair(&chart, &probs), Ok(()), "{}", sentence);

      // every entry in the chart, not just the root, must rebuild cleanly
      for (span, cell) in chart.iter() {
        for symbol in cell.symbols() {
          let tree = get_tree(&chart, span.start, span.end, symbol).unwrap();
          assert_eq!(tree.check_spans(), Ok(()));
          assert_eq!(tree.span(), span);
          assert_eq!(tree.leaves(), input[span.start..span.end].to_vec());
        }
      }
    }
  }
}
