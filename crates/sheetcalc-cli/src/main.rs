//! sheetcalc CLI - evaluate formulas and run cell scripts

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sheetcalc::prelude::*;
use sheetcalc::{evaluate, parse_formula, tokenize};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sheetcalc")]
#[command(author, version, about = "Spreadsheet formula evaluation and recalculation tool")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG wins when set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Load calculation options from a JSON file
    #[arg(long, global = true, value_name = "FILE")]
    options: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a single formula against an empty sheet
    Eval {
        /// Formula text, e.g. "=SUM(1,2)*3"
        formula: String,
    },

    /// Show the tokens of a formula
    Tokens {
        /// Formula text, with or without the leading '='
        formula: String,
    },

    /// Apply a script of cell edits and print the resulting sheet
    ///
    /// Each line is `<CELL> <INPUT>`, e.g. `A1 10` or `B1 =A1*2`.
    /// Empty input clears the cell; lines starting with '#' are ignored.
    Run {
        /// Script file (default: stdin)
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = match &cli.options {
        Some(path) => load_options(path)?,
        None => CalculationOptions::default(),
    };

    match cli.command {
        Commands::Eval { formula } => eval_formula(&formula, cli.json),
        Commands::Tokens { formula } => show_tokens(&formula, cli.json),
        Commands::Run { file } => run_script(file.as_deref(), options, cli.json),
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_options(path: &Path) -> Result<CalculationOptions> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid calculation options in '{}'", path.display()))
}

fn eval_formula(formula: &str, json: bool) -> Result<()> {
    let ast = parse_formula(formula).with_context(|| format!("Failed to parse '{}'", formula))?;
    let value = evaluate(&ast, &Spreadsheet::new());

    if json {
        let out = serde_json::json!({
            "formula": formula,
            "normalized": format!("={}", ast),
            "value": value,
            "display": value.display_string(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", value.display_string());
    }
    Ok(())
}

fn show_tokens(formula: &str, json: bool) -> Result<()> {
    let body = formula.trim_start();
    let body = body.strip_prefix('=').unwrap_or(body);
    let tokens = tokenize(body).with_context(|| format!("Failed to tokenize '{}'", formula))?;

    if json {
        let out: Vec<_> = tokens
            .iter()
            .map(|t| {
                serde_json::json!({
                    "kind": format!("{:?}", t.kind),
                    "value": t.value,
                    "position": t.position,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for token in &tokens {
            println!("{:>4}  {:<12} {}", token.position, format!("{:?}", token.kind), token.value);
        }
    }
    Ok(())
}

fn run_script(file: Option<&Path>, options: CalculationOptions, json: bool) -> Result<()> {
    let script = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read script from stdin")?;
            buf
        }
    };

    let mut sheet = Spreadsheet::with_options(options);
    let mut rejected = 0usize;
    let mut totals = CalculationStats::default();

    for (index, line) in script.lines().enumerate() {
        let line_no = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (cell, input) = match line.split_once(char::is_whitespace) {
            Some((cell, input)) => (cell, input.trim()),
            None => (line, ""),
        };

        tracing::trace!(line = line_no, cell, input, "applying edit");
        match sheet.set_cell(cell, input) {
            Ok(stats) => {
                totals.cells_calculated += stats.cells_calculated;
                totals.errors += stats.errors;
            }
            Err(err) => {
                rejected += 1;
                tracing::debug!(line = line_no, cell, error = %err, "edit rejected");
                eprintln!("line {}: {}: {}", line_no, cell, err);
            }
        }
    }

    print_sheet(&sheet, json)?;
    eprintln!(
        "Calculated {} formulas ({} errors)",
        totals.cells_calculated, totals.errors
    );

    if rejected > 0 {
        bail!("{} edit(s) rejected", rejected);
    }
    Ok(())
}

fn print_sheet(sheet: &Spreadsheet, json: bool) -> Result<()> {
    let mut formulas = Vec::new();
    for (key, _) in sheet.cells() {
        formulas.push(sheet.formula(key)?);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if json {
        let cells: Vec<_> = sheet
            .cells()
            .into_iter()
            .zip(formulas)
            .map(|((key, value), formula)| {
                serde_json::json!({
                    "cell": key.to_string(),
                    "value": value,
                    "display": value.display_string(),
                    "formula": formula,
                })
            })
            .collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&cells)?)?;
    } else {
        for ((key, value), formula) in sheet.cells().into_iter().zip(formulas) {
            match formula {
                Some(formula) => writeln!(out, "{}\t{}\t{}", key, value.display_string(), formula)?,
                None => writeln!(out, "{}\t{}", key, value.display_string())?,
            }
        }
    }

    out.flush().context("Failed to write to stdout")?;
    Ok(())
}
