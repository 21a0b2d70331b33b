use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a puzzle. Unsatisfiable puzzles are not errors; the solver reports
/// them by returning no assignment.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
