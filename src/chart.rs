use std::collections::HashMap;
use std::fmt;

use crate::error::CykError;

/// A half-open interval `start..end` over token positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
  pub start: usize,
  pub end: usize,
}

impl Span {
  pub fn new(start: usize, end: usize) -> Self {
    Self { start, end }
  }

  pub fn len(&self) -> usize {
    self.end.saturating_sub(self.start)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Spans of width 1 cover a single token
  pub fn is_leaf(&self) -> bool {
    self.len() == 1
  }

  /// Splits into `start..k` and `k..end`
  pub fn split_at(&self, k: usize) -> (Span, Span) {
    (Span::new(self.start, k), Span::new(k, self.end))
  }
}

impl fmt::Display for Span {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}", self.start, self.end)
  }
}

/// One of the two constituents a binary chart entry was built from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Backpointer {
  pub symbol: String,
  pub span: Span,
}

impl Backpointer {
  pub fn new(symbol: impl Into<String>, span: Span) -> Self {
    Self {
      symbol: symbol.into(),
      span,
    }
  }
}

impl fmt::Display for Backpointer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}[{}]", self.symbol, self.span)
  }
}

/// How a nonterminal came to cover a span: either it rewrote directly to the
/// token there, or a binary rule joined two adjacent constituents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Derivation {
  Leaf(String),
  Binary(Backpointer, Backpointer),
}

impl fmt::Display for Derivation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Leaf(token) => write!(f, "{:?}", token),
      Self::Binary(left, right) => write!(f, "{} {}", left, right),
    }
  }
}

/// The entries of a single span: a map from nonterminal to marker that
/// remembers insertion order, so iterating over a cell is deterministic.
///
/// Lookups never create entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell<M> {
  entries: Vec<(String, M)>,
  index: HashMap<String, usize>,
}

impl<M> Default for Cell<M> {
  fn default() -> Self {
    Self::new()
  }
}

impl<M> Cell<M> {
  pub fn new() -> Self {
    Self {
      entries: Vec::new(),
      index: HashMap::new(),
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn get(&self, symbol: &str) -> Option<&M> {
    self.index.get(symbol).map(|&idx| &self.entries[idx].1)
  }

  pub fn contains(&self, symbol: &str) -> bool {
    self.index.contains_key(symbol)
  }

  /// Adds `symbol` if it isn't there yet. Returns whether it was added.
  pub fn insert_if_absent(&mut self, symbol: &str, marker: M) -> bool {
    if self.contains(symbol) {
      false
    } else {
      self.index.insert(symbol.to_string(), self.entries.len());
      self.entries.push((symbol.to_string(), marker));
      true
    }
  }

  /// Sets the marker for `symbol`, returning the old one. An overwritten
  /// entry keeps its original position in iteration order.
  pub fn insert(&mut self, symbol: &str, marker: M) -> Option<M> {
    if let Some(&idx) = self.index.get(symbol) {
      Some(std::mem::replace(&mut self.entries[idx].1, marker))
    } else {
      self.insert_if_absent(symbol, marker);
      None
    }
  }

  pub fn symbols(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(s, _)| s.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &M)> {
    self.entries.iter().map(|(s, m)| (s.as_str(), m))
  }
}

/// A triangular table with one cell per span of an `n`-token input, stored
/// flat and addressed by index arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<M> {
  n: usize,
  cells: Vec<Cell<M>>,
}

/// Backpointers for the best derivation of each (span, nonterminal)
pub type Chart = Table<Derivation>;

/// Base-2 log-probabilities, parallel to a [`Chart`]
pub type ProbabilityTable = Table<f64>;

/// Which nonterminals cover each span, and nothing else
pub type MembershipChart = Table<()>;

impl<M> Table<M> {
  pub fn new(n: usize) -> Self {
    let count = n * (n + 1) / 2;
    Self {
      n,
      cells: (0..count).map(|_| Cell::new()).collect(),
    }
  }

  /// Number of tokens the table was built for
  pub fn num_tokens(&self) -> usize {
    self.n
  }

  fn index(&self, span: Span) -> Option<usize> {
    if span.start < span.end && span.end <= self.n {
      // row `start` holds spans start..start+1 through start..n
      let offset = span.start * (2 * self.n - span.start + 1) / 2;
      Some(offset + span.len() - 1)
    } else {
      None
    }
  }

  /// Every valid span, ordered by start then end
  pub fn spans(&self) -> impl Iterator<Item = Span> + use<M> {
    let n = self.n;
    (0..n).flat_map(move |start| (start + 1..=n).map(move |end| Span::new(start, end)))
  }

  pub fn get(&self, span: Span) -> Option<&Cell<M>> {
    self.index(span).map(|idx| &self.cells[idx])
  }

  /// The marker for `symbol` over `span`, if there is one
  pub fn entry(&self, span: Span, symbol: &str) -> Option<&M> {
    self.get(span).and_then(|cell| cell.get(symbol))
  }

  /// Sets a single entry. Fails if the span is outside the table.
  pub fn insert(&mut self, span: Span, symbol: &str, marker: M) -> Result<Option<M>, CykError> {
    let idx = self.checked_index(span)?;
    Ok(self.cells[idx].insert(symbol, marker))
  }

  /// Puts a freshly built cell in place. The chart builders only pass spans
  /// from their own loops, which are always in range.
  pub(crate) fn fill(&mut self, span: Span, cell: Cell<M>) {
    if let Some(idx) = self.index(span) {
      self.cells[idx] = cell;
    } else {
      debug_assert!(false, "built a cell for out of range span {}", span);
    }
  }

  fn checked_index(&self, span: Span) -> Result<usize, CykError> {
    self.index(span).ok_or_else(|| {
      CykError::MalformedInput(format!(
        "span {} is outside a table over {} tokens",
        span, self.n
      ))
    })
  }

  /// Non-empty cells, ordered by start then end
  pub fn iter(&self) -> impl Iterator<Item = (Span, &Cell<M>)> {
    self
      .spans()
      .zip(self.cells.iter())
      .filter(|(_, cell)| !cell.is_empty())
  }

  /// Total number of entries over all cells
  pub fn num_entries(&self) -> usize {
    self.cells.iter().map(Cell::len).sum()
  }
}

impl<M> fmt::Display for Table<M>
where
  M: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (span, cell) in self.iter() {
      writeln!(f, "{}:", span)?;
      for (symbol, marker) in cell.iter() {
        writeln!(f, "  {}: {}", symbol, marker)?;
      }
    }
    Ok(())
  }
}
