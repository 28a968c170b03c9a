//! CLI command implementations

pub mod accounts;
pub mod banks;
pub mod detect;
pub mod import;
pub mod profiles;
pub mod reconcile;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tally_core::formats::{decode_text, read_headers, CsvOptions};
use tally_core::{OperationResult, SourceFormat, TallyContext};

/// Get the tally directory from environment or default
pub fn get_tally_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TALLY_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".tally"))
        .context("Could not find home directory; set TALLY_DIR")
}

/// Get or create tally context
pub fn get_context() -> Result<TallyContext> {
    let tally_dir = get_tally_dir()?;

    std::fs::create_dir_all(&tally_dir)
        .with_context(|| format!("Failed to create tally directory: {:?}", tally_dir))?;

    TallyContext::new(&tally_dir).context("Failed to initialize tally context")
}

/// A statement file read from disk, with its detected format and headers
pub struct SourceFile {
    pub bytes: Vec<u8>,
    pub format: SourceFormat,
    pub headers: Vec<String>,
}

impl SourceFile {
    /// Read a file; `format` overrides detection by extension and content
    pub fn read(path: &Path, format: Option<&str>) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
        let decoded = decode_text(&bytes);

        let format = match format {
            Some(name) => name.parse::<SourceFormat>()?,
            None => {
                let file_name = path.file_name().and_then(|n| n.to_str());
                SourceFormat::detect(file_name, &decoded.text)
            }
        };

        // Header read failures surface again, with line numbers, during import
        let headers = read_headers(&decoded.text, format, &CsvOptions::default()).unwrap_or_default();

        Ok(Self { bytes, format, headers })
    }
}

/// Print a failure as a JSON envelope
pub fn print_json_error(error: &anyhow::Error) {
    let result = OperationResult::<()>::fail(format!("{:#}", error));
    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(_) => eprintln!("{:#}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_source_file_reads_csv_headers() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Date,Description,Amount").unwrap();
        writeln!(file, "2024-01-15,Coffee,-4.50").unwrap();

        let source = SourceFile::read(file.path(), None).unwrap();
        assert_eq!(source.format, SourceFormat::Csv);
        assert_eq!(source.headers, vec!["Date", "Description", "Amount"]);
    }

    #[test]
    fn test_source_file_format_override() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "!Type:Bank").unwrap();
        writeln!(file, "D01/15/2024").unwrap();
        writeln!(file, "T-4.50").unwrap();
        writeln!(file, "^").unwrap();

        let detected = SourceFile::read(file.path(), None).unwrap();
        assert_eq!(detected.format, SourceFormat::Csv);

        let forced = SourceFile::read(file.path(), Some("qif")).unwrap();
        assert_eq!(forced.format, SourceFormat::Qif);

        assert!(SourceFile::read(file.path(), Some("xlsx")).is_err());
    }
}
