//! gridcalc CLI - formula inspection and evaluation tool

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gridcalc_formula::value::parse_number;
use gridcalc_formula::{
    evaluate, parse_with_options, CellMap, LexerOptions, TokenStream, Value,
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "gridcalc")]
#[command(author, version, about = "Tokenize, parse and evaluate spreadsheet formulas")]
struct Cli {
    /// Regex matching a single operator character
    #[arg(long, global = true, default_value = gridcalc_formula::options::DEFAULT_OPERATORS)]
    operators: String,

    /// Regex matching a single delimiter character
    #[arg(long, global = true, default_value = gridcalc_formula::options::DEFAULT_DELIMITERS)]
    delimiters: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tokens of a formula, one per line
    Tokens {
        /// Formula text
        formula: String,
    },

    /// Parse a formula and print it back in canonical form
    Parse {
        /// Formula text
        formula: String,

        /// Print the syntax tree instead
        #[arg(short, long)]
        tree: bool,
    },

    /// Evaluate a formula against a set of cells
    Eval {
        /// Formula text
        formula: String,

        /// Cell value as ID=VALUE (repeatable). VALUE is a number, TRUE/FALSE,
        /// "quoted text", =formula, or bare text.
        #[arg(short, long = "cell", value_name = "ID=VALUE")]
        cells: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let options = LexerOptions::new(&cli.operators, &cli.delimiters)
        .context("Failed to compile lexer options")?;

    match cli.command {
        Commands::Tokens { formula } => print_tokens(&formula, &options),
        Commands::Parse { formula, tree } => print_parse(&formula, tree, &options),
        Commands::Eval { formula, cells } => print_eval(&formula, &cells, &options),
    }
}

fn print_tokens(formula: &str, options: &LexerOptions) -> Result<()> {
    for token in TokenStream::with_options(formula, options) {
        let token = token.with_context(|| format!("Failed to tokenize '{}'", formula))?;
        println!("{:>4}  {}", token.position, token.kind);
    }
    Ok(())
}

fn print_parse(formula: &str, tree: bool, options: &LexerOptions) -> Result<()> {
    let ast = parse_with_options(formula, options)
        .with_context(|| format!("Failed to parse '{}'", formula))?;

    if tree {
        println!("{:#?}", ast);
    } else {
        println!("{}", ast);
    }
    Ok(())
}

fn print_eval(formula: &str, cell_args: &[String], options: &LexerOptions) -> Result<()> {
    let ast = parse_with_options(formula, options)
        .with_context(|| format!("Failed to parse '{}'", formula))?;

    let cells = build_cells(cell_args, options)?;
    let value = evaluate(&ast, &cells)
        .with_context(|| format!("Failed to evaluate '{}'", formula))?;

    println!("{}", value);
    Ok(())
}

/// Build the cell map from `ID=VALUE` arguments
///
/// Formula cells see a snapshot of the plain cells only.
fn build_cells(cell_args: &[String], options: &LexerOptions) -> Result<CellMap> {
    let mut cells = CellMap::new();
    let mut formulas = Vec::new();

    for arg in cell_args {
        let (id, raw) = split_cell_arg(arg)?;
        match raw.strip_prefix('=') {
            Some(text) => {
                let expr = parse_with_options(text, options)
                    .with_context(|| format!("Failed to parse formula for cell {}", id))?;
                formulas.push((id.to_string(), expr));
            }
            None => {
                cells.insert(id.to_string(), parse_cell_value(raw));
            }
        }
    }

    let snapshot = Arc::new(cells.clone());
    for (id, expr) in formulas {
        cells.insert(id, Value::formula(expr, snapshot.clone()));
    }

    Ok(cells)
}

fn split_cell_arg(arg: &str) -> Result<(&str, &str)> {
    match arg.split_once('=') {
        Some((id, raw)) if !id.trim().is_empty() => Ok((id.trim(), raw)),
        _ => bail!("Invalid cell '{}': expected ID=VALUE", arg),
    }
}

fn parse_cell_value(raw: &str) -> Value {
    let trimmed = raw.trim();

    if let Some(n) = parse_number(trimmed) {
        return Value::Number(n);
    }

    match trimmed {
        "TRUE" => Value::Boolean(true),
        "FALSE" => Value::Boolean(false),
        _ if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') => {
            Value::String(trimmed[1..trimmed.len() - 1].to_string())
        }
        _ => Value::String(raw.to_string()),
    }
}
