use std::path::PathBuf;

use thiserror::Error;

/// An error that can occur when reading or rewriting the driver roster.
#[derive(Error, Debug)]
pub enum Error {
    /// A column the assigner relies on is absent from the header
    #[error("roster has no '{0}' column")]
    MissingColumn(String),
    /// A row is missing a required value. The row is left untouched and not assigned.
    #[error("malformed roster row {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
    /// A later row repeating a driver id. Only the first row with that id is matched.
    #[error("roster row {line} repeats driver id {driver_id}")]
    DuplicateDriver { line: u64, driver_id: String },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// The roster could not be read or rewritten. A failed rewrite leaves the original file as it was.
    #[error("could not access roster {}", path.display())]
    IOFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
