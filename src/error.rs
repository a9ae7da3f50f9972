use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Malformed coordinate pair #{chunk} ({text:?}): {reason}")]
    Parse {
        chunk: usize,
        text: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Clustering error: {0}")]
    Cluster(String),

    #[error("Naming error: {0}")]
    Naming(String),

    #[error("Table error: {0}")]
    Table(String),

    #[error("Display error: {0}")]
    Display(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn cluster<S: Into<String>>(msg: S) -> Self {
        Error::Cluster(msg.into())
    }
}
