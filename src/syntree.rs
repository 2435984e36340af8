use std::fmt;

use crate::chart::Span;

#[derive(Debug, PartialEq, Clone)]
pub struct Constituent<T> {
  pub value: T,
  pub span: Span,
}

impl<T> fmt::Display for Constituent<T>
where
  T: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.span, self.value)
  }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Word<U> {
  pub value: U,
  pub span: Span,
}

impl<U> fmt::Display for Word<U>
where
  U: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.span, self.value)
  }
}

/// A syntax tree. In a CNF parse every branch has either one leaf child
/// (a preterminal over its word) or two branch children.
#[derive(Debug, PartialEq, Clone)]
pub enum SynTree<T, U> {
  Branch(Constituent<T>, Vec<SynTree<T, U>>),
  Leaf(Word<U>),
}

/// Trees as extracted from a chart: nonterminal labels over word leaves
pub type ParseTree = SynTree<String, String>;

impl<T, U> SynTree<T, U> {
  pub fn is_leaf(&self) -> bool {
    matches!(self, Self::Leaf(_))
  }

  pub fn is_branch(&self) -> bool {
    matches!(self, Self::Branch(_, _))
  }

  pub fn get_branch(&self) -> Option<(&Constituent<T>, &Vec<SynTree<T, U>>)> {
    match self {
      Self::Branch(c, cs) => Some((c, cs)),
      _ => None,
    }
  }

  pub fn span(&self) -> Span {
    match self {
      Self::Branch(c, _) => c.span,
      Self::Leaf(w) => w.span,
    }
  }

  /// The words at the bottom of the tree, left to right
  pub fn leaves(&self) -> Vec<&U> {
    let mut out = Vec::new();
    self.collect_leaves(&mut out);
    out
  }

  fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a U>) {
    match self {
      Self::Leaf(w) => out.push(&w.value),
      Self::Branch(_, children) => {
        for child in children.iter() {
          child.collect_leaves(out);
        }
      }
    }
  }

  /// Number of branch nodes
  pub fn num_constituents(&self) -> usize {
    match self {
      Self::Leaf(_) => 0,
      Self::Branch(_, children) => 1 + children.iter().map(Self::num_constituents).sum::<usize>(),
    }
  }

  /// Checks that every branch's children sit side by side and exactly cover
  /// the branch's own span, and that leaves are one token wide.
  /// Returns the first offending span.
  pub fn check_spans(&self) -> Result<(), Span> {
    match self {
      Self::Leaf(w) => {
        if w.span.is_leaf() {
          Ok(())
        } else {
          Err(w.span)
        }
      }
      Self::Branch(c, children) => {
        if children.is_empty() {
          return Err(c.span);
        }
        let mut pos = c.span.start;
        for child in children.iter() {
          if child.span().start != pos {
            return Err(c.span);
          }
          child.check_spans()?;
          pos = child.span().end;
        }
        if pos == c.span.end { Ok(()) } else { Err(c.span) }
      }
    }
  }
}

impl<T, U> SynTree<T, U>
where
  T: fmt::Display,
  U: fmt::Display,
{
  pub fn label(&self) -> String {
    match self {
      Self::Branch(c, _) => c.value.to_string(),
      Self::Leaf(w) => w.value.to_string(),
    }
  }

  /// Penn-treebank style bracketing, e.g. `(S (A a) (B b))`
  pub fn bracketed(&self) -> String {
    match self {
      Self::Leaf(w) => w.value.to_string(),
      Self::Branch(c, children) => {
        let mut s = format!("({}", c.value);
        for child in children.iter() {
          s.push(' ');
          s.push_str(&child.bracketed());
        }
        s.push(')');
        s
      }
    }
  }

  fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    match self {
      Self::Leaf(w) => write!(f, "{}", w),
      Self::Branch(c, children) => {
        write!(f, "({}", c)?;
        if let [Self::Leaf(w)] = children.as_slice() {
          write!(f, " ({}))", w)
        } else {
          for child in children.iter() {
            write!(f, "\n{:width$}", "", width = 2 * (depth + 1))?;
            child.fmt_indented(f, depth + 1)?;
          }
          write!(f, ")")
        }
      }
    }
  }
}

impl<T, U> fmt::Display for SynTree<T, U>
where
  T: fmt::Display,
  U: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.fmt_indented(f, 0)
  }
}
