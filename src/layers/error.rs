use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("road graph has no nodes")]
    EmptyGraph,
    #[error("no path between stop {from} and stop {to}")]
    NoPath { from: String, to: String },
    #[error("stop {0} is not in the stop catalog")]
    UnknownStop(String),
    #[error("Cannot read file")]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    GtfsError(#[from] crate::gtfs::error::Error),
    #[error(transparent)]
    RosterError(#[from] crate::roster::error::Error),
}
