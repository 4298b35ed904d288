//! semshapes CLI
//!
//! Interactive word arithmetic against a local embedding file.

use anyhow::Context;
use clap::Parser;
use semshapes::args::ModelArgs;
use semshapes::{Neighbor, QueryEngine};
use std::io::{self, BufRead, Write};
use tracing_subscriber::{fmt, EnvFilter};

/// semshapes CLI - Interactive Client
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Evaluate one expression and exit
    #[arg(short, long)]
    expr: Option<String>,

    /// Number of results to show
    #[arg(short, long)]
    n: Option<usize>,

    #[command(flatten)]
    model: ModelArgs,
}

/// One line of REPL input
#[derive(Debug, PartialEq)]
enum Command<'a> {
    Similar(&'a str),
    Vector(&'a str),
    Vocab(Option<&'a str>),
    Info,
    Help,
    Quit,
    Expression(&'a str),
}

fn parse_command(input: &str) -> Command<'_> {
    let mut parts = input.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or_default();
    let rest = parts.next().map(str::trim).filter(|r| !r.is_empty());

    match (head.to_ascii_lowercase().as_str(), rest) {
        ("quit" | "exit", None) => Command::Quit,
        ("help", None) => Command::Help,
        ("info", None) => Command::Info,
        ("vocab", prefix) => Command::Vocab(prefix),
        ("similar", Some(word)) => Command::Similar(word),
        ("vector", Some(word)) => Command::Vector(word),
        _ => Command::Expression(input),
    }
}

fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("semshapes=warn".parse()?))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let store = args
        .model
        .load_store()
        .with_context(|| format!("loading {}", args.model.model.display()))?;
    let engine = QueryEngine::new(store, args.model.engine_options());

    if let Some(expr) = &args.expr {
        let results = engine.arithmetic(expr, args.n)?;
        print_neighbors(&results);
        return Ok(());
    }

    let info = engine.info();
    println!(
        "Loaded {} words ({} dimensions). Type 'help' for available commands, 'quit' to exit.\n",
        info.vocab_size, info.dimensions
    );

    let stdin = io::stdin();
    loop {
        print!("semshapes> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match parse_command(input) {
            Command::Quit => {
                println!("Goodbye!");
                break;
            }
            Command::Help => print_help(),
            Command::Info => {
                let info = engine.info();
                println!(
                    "model_type={} dimensions={} vocab_size={}",
                    info.model_type, info.dimensions, info.vocab_size
                );
            }
            Command::Vocab(prefix) => {
                let words = engine.vocabulary(20, prefix);
                println!("{}", words.join(" "));
            }
            Command::Similar(word) => match engine.similar(word, args.n) {
                Ok(results) => print_neighbors(&results),
                Err(e) => eprintln!("Error: {}", e),
            },
            Command::Vector(word) => match engine.vector(word) {
                Ok(vector) => println!("{:?}", vector),
                Err(e) => eprintln!("Error: {}", e),
            },
            Command::Expression(expr) => match engine.arithmetic(expr, args.n) {
                Ok(results) => print_neighbors(&results),
                Err(e) => eprintln!("Error: {}", e),
            },
        }
    }

    Ok(())
}

fn print_neighbors(results: &[Neighbor]) {
    if results.is_empty() {
        println!("(no results)");
        return;
    }
    for (rank, n) in results.iter().enumerate() {
        println!("{:>3}. {:<24} {:.4}", rank + 1, n.word, n.similarity);
    }
}

fn print_help() {
    println!(
        r#"
Available commands:

  <expression>      - Evaluate word arithmetic, e.g. king - man + woman
  similar <word>    - Words closest to <word>
  vector <word>     - Print the raw embedding of <word>
  vocab [prefix]    - First 20 vocabulary words, optionally by prefix
  info              - Model type, dimensions and vocabulary size

  help              - Show this help
  quit / exit       - Exit the CLI

Operators must be separated by spaces: 'king - man', not 'king-man'.
"#
    );
}
