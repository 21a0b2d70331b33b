use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crossword_csp::{render_grid, CrosswordCreator, Puzzle, SolverConfig};

/// Fill a crossword structure with words from a word list.
#[derive(Parser, Debug)]
#[command(name = "crossword", version, about)]
struct Cli {
    /// Structure file: `_` marks a fillable cell, anything else a block
    structure: PathBuf,

    /// Word list, one word per line
    words: PathBuf,

    /// Also write the filled grid to this file
    output: Option<PathBuf>,

    /// Propagate arc consistency after every tentative assignment
    #[arg(long)]
    inference: bool,
}

fn main() -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(env_filter) => env_filter,
        Err(_) => EnvFilter::default().add_directive("crossword_csp=info".parse()?),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let puzzle = Puzzle::load(&cli.structure, &cli.words)?;
    let config = SolverConfig { inference: cli.inference };
    let mut creator = CrosswordCreator::with_config(&puzzle, config);

    match creator.solve() {
        Some(assignment) => {
            let display_grid = render_grid(&puzzle, &assignment);
            println!("{}", display_grid);

            if let Some(output) = &cli.output {
                fs::write(output, display_grid + "\n")
                    .with_context(|| format!("failed to write {}", output.display()))?;
            }
        }
        None => println!("No solution."),
    }

    Ok(())
}
