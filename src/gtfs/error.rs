use thiserror::Error;

/// An error that can occur when reading the stop and trip tables.
#[derive(Error, Debug)]
pub enum Error {
    /// A mandatory file is not present
    #[error("Could not find file {0}")]
    MissingFile(String),
    /// The given path to the feed is neither a file nor a directory
    #[error("Could not read feed: {0} is neither a file nor a directory")]
    NotFileNorDirectory(String),
    /// Impossible to read a file
    #[error("impossible to read '{file_name}'")]
    NamedFileIO {
        /// The file name that could not be read
        file_name: String,
        /// The inital error that caused the unability to read the file
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Impossible to read a CSV file
    #[error("impossible to read csv file '{file_name}'")]
    CSVError {
        /// File name that could not be parsed as CSV
        file_name: String,
        /// The initial error by the csv library
        #[source]
        source: csv::Error,
    },
    /// A row is missing a required value. The row is skipped, the rest of the file is still read.
    #[error("malformed row {line} in '{file_name}': {reason}")]
    MalformedRow {
        file_name: String,
        line: u64,
        reason: String,
    },
}
