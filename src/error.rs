use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum NormError {
    #[error("reference record at line {line} is corrupt: {message}")]
    DataCorruption { line: usize, message: String },

    #[error("no usable record survived reference curation")]
    EmptyReference,

    #[error("taxon annotation yields no taxonomic ranks: {0:?}")]
    UnparseableTaxon(String),

    #[error("input table has no column named {0:?}")]
    MissingColumn(String),

    #[error("input table line {line} is malformed: {message}")]
    TableParse { line: usize, message: String },

    #[error("missing config file rrna-norm.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
