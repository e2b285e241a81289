use crate::error::Result;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Counts the motif positions of a MotEvo weight matrix file.
///
/// A weight matrix file starts with metadata lines (`//`, `NA REST`, `P0 A C G T`)
/// followed by one line per position, each starting with the position number.
/// Every line starting with a digit is counted as a position.
///
/// # Errors
/// * `MotevoError::Io` - If the file cannot be opened or read
pub fn count_wm_positions(path: impl AsRef<Path>) -> Result<usize> {
    let reader = BufReader::new(File::open(path.as_ref())?);

    let mut positions = 0;
    for line in reader.lines() {
        if line?.starts_with(|c: char| c.is_ascii_digit()) {
            positions += 1;
        }
    }

    Ok(positions)
}

/// File name of a weight matrix path, used to name the MotEvo output files
pub(crate) fn wm_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "wm".to_string())
}
