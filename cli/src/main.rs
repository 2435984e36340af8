use std::env;
use std::io;
use std::io::Write;
use std::process;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cykparse::validate::{check_probs_format, check_table_format};
use cykparse::{get_tree, CkyParser, Err, Grammar, Span};

fn usage(prog_name: &str) -> String {
  format!(
    r"Usage: {} FILE [options]

Reads sentences from stdin, one per line, and parses them with the PCFG in FILE.

Options:
  -h, --help       Print this message
  -v, --verify     Check that FILE is a valid PCFG and exit
  -c, --chart      Print the backpointer chart (defaults to not printing)
  -p, --probs      Print the log-probability table (defaults to not printing)
  -m, --max-len N  Skip sentences longer than N tokens

Set RUST_LOG (e.g. RUST_LOG=cykparse=debug) for parser logging on stderr.",
    prog_name
  )
}

struct Args {
  filename: String,
  verify: bool,
  print_chart: bool,
  print_probs: bool,
  max_len: Option<usize>,
}

impl Args {
  fn make_error_message(msg: &str, prog_name: impl AsRef<str>) -> String {
    format!("argument error: {}.\n\n{}", msg, usage(prog_name.as_ref()))
  }

  fn parse(v: Vec<String>) -> Result<Self, String> {
    let mut iter = v.into_iter();
    let Some(prog_name) = iter.next() else {
      return Err(Self::make_error_message("bad argument vector", "cky"));
    };

    let mut filename: Option<String> = None;
    let mut verify = false;
    let mut print_chart = false;
    let mut print_probs = false;
    let mut max_len: Option<usize> = None;

    while let Some(o) = iter.next() {
      if o == "-h" || o == "--help" {
        println!("{}", usage(&prog_name));
        process::exit(0);
      } else if o == "-v" || o == "--verify" {
        verify = true;
      } else if o == "-c" || o == "--chart" {
        print_chart = true;
      } else if o == "-p" || o == "--probs" {
        print_probs = true;
      } else if o == "-m" || o == "--max-len" {
        let n = iter
          .next()
          .and_then(|n| n.parse::<usize>().ok())
          .ok_or_else(|| Self::make_error_message("--max-len needs a number", &prog_name))?;
        max_len = Some(n);
      } else if filename.is_none() {
        filename = Some(o);
      } else {
        return Err(Self::make_error_message("invalid arguments", &prog_name));
      }
    }

    if let Some(filename) = filename {
      Ok(Self {
        filename,
        verify,
        print_chart,
        print_probs,
        max_len,
      })
    } else {
      Err(Self::make_error_message("missing filename", prog_name))
    }
  }
}

fn parse(parser: &CkyParser, sentence: &str, opts: &Args) -> Result<(), Err> {
  let tokens = sentence.split_whitespace().collect::<Vec<_>>();
  if tokens.is_empty() {
    return Ok(());
  }
  if let Some(max_len) = opts.max_len {
    if tokens.len() > max_len {
      warn!(tokens = tokens.len(), max_len, "sentence too long, skipping");
      return Ok(());
    }
  }

  let (chart, probs) = parser.parse_with_backpointers(&tokens);
  if !check_table_format(&chart) || !check_probs_format(&probs) {
    return Err("parser produced a malformed chart".into());
  }

  let start = parser.grammar().start();
  let root = Span::new(0, tokens.len());
  let logprob = probs.entry(root, start);
  println!("in language: {}", if logprob.is_some() { "yes" } else { "no" });

  if opts.print_chart {
    println!("chart:\n{}", chart);
  }
  if opts.print_probs {
    println!("probabilities:\n{}", probs);
  }

  if let Some(logprob) = logprob {
    let tree = get_tree(&chart, root.start, root.end, start)?;
    println!("{}", tree.bracketed());
    println!("log2 probability: {:.4}", logprob);
  }
  println!();

  Ok(())
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let opts = match Args::parse(env::args().collect()) {
    Ok(opts) => opts,
    Err(msg) => {
      eprintln!("{}", msg);
      process::exit(255);
    }
  };

  let g = Grammar::read_from_file(&opts.filename)?;
  info!(file = %opts.filename, start = g.start(), rules = g.rules().len(), "loaded grammar");

  if opts.verify {
    match g.verify() {
      Ok(()) => {
        println!("Grammar is valid!");
        return Ok(());
      }
      Err(e) => {
        println!("Grammar is invalid: {}", e);
        process::exit(1);
      }
    }
  }
  if let Err(e) = g.verify() {
    warn!(error = %e, "not a valid PCFG, parsing anyway");
  }

  let parser = CkyParser::new(g);

  let mut input = String::new();
  loop {
    print!("> ");
    io::stdout().flush()?;

    match io::stdin().read_line(&mut input) {
      Ok(0) => {
        // ctrl+d
        return Ok(());
      }
      Ok(_) => {
        parse(&parser, input.trim(), &opts)?;
        input.clear();
      }
      Err(error) => return Err(error.into()),
    }
  }
}
