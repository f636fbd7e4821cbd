use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};

use camino::Utf8Path;
use flate2::read::GzDecoder;

use crate::error::NormError;

/// Read a text file into lines, decoding gzip transparently when the path
/// ends in `.gz`.
pub fn read_lines(path: &Utf8Path) -> Result<Vec<String>, NormError> {
    let file = File::open(path.as_std_path())
        .map_err(|err| NormError::Filesystem(format!("open {path}: {err}")))?;
    if path.as_str().ends_with(".gz") {
        collect_lines(BufReader::new(GzDecoder::new(file)))
    } else {
        collect_lines(BufReader::new(file))
    }
}

fn collect_lines<R: BufRead>(reader: R) -> Result<Vec<String>, NormError> {
    reader
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| NormError::Filesystem(err.to_string()))
}

/// Write through a temporary file in the destination directory and persist
/// it into place, so a failing run never leaves a partial output behind.
pub fn write_atomic(path: &Utf8Path, content: &str) -> Result<(), NormError> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(dir.as_std_path()).map_err(|err| NormError::Filesystem(err.to_string()))?;

    let mut staged = tempfile::Builder::new()
        .prefix(".rrna-norm-")
        .tempfile_in(dir.as_std_path())
        .map_err(|err| NormError::Filesystem(err.to_string()))?;
    staged
        .write_all(content.as_bytes())
        .map_err(|err| NormError::Filesystem(err.to_string()))?;
    staged
        .persist(path.as_std_path())
        .map_err(|err| NormError::Filesystem(err.to_string()))?;
    Ok(())
}
