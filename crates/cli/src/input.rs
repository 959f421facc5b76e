//! NDJSON input: one pushed value per line.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use contracts::Value;
use tracing::warn;

/// Values parsed from one input source
#[derive(Debug, Default)]
pub struct ParsedInput {
    pub values: Vec<Value>,
    /// Lines that were not valid JSON
    pub skipped: usize,
}

/// Read NDJSON from a file, or stdin for "-"
pub fn read_values(path: &Path) -> Result<ParsedInput> {
    if path == Path::new("-") {
        return parse_lines(io::stdin().lock());
    }
    let file =
        File::open(path).with_context(|| format!("Failed to open input {}", path.display()))?;
    parse_lines(BufReader::new(file))
}

/// Parse NDJSON, skipping blank and malformed lines
pub fn parse_lines(reader: impl BufRead) -> Result<ParsedInput> {
    let mut parsed = ParsedInput::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input line")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(line) {
            Ok(json) => parsed.values.push(Value::from(json)),
            Err(e) => {
                parsed.skipped += 1;
                warn!(line = index + 1, error = %e, "Skipping malformed input line");
            }
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_parse_lines_skips_blank_and_malformed() {
        let input = "{\"event\":\"pageView\"}\n\n not json\n\"raw\"\n";
        let parsed = parse_lines(Cursor::new(input)).unwrap();

        assert_eq!(parsed.values.len(), 2);
        assert_eq!(parsed.skipped, 1);
        assert!(parsed.values[0].as_object().is_some());
        assert_eq!(parsed.values[1].as_str(), Some("raw"));
    }

    #[test]
    fn test_read_values_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"browser.lang\":\"en\"}}").unwrap();
        writeln!(file, "{{\"event\":\"deposit\",\"value\":50}}").unwrap();

        let parsed = read_values(file.path()).unwrap();
        assert_eq!(parsed.values.len(), 2);
        assert_eq!(parsed.skipped, 0);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(read_values(Path::new("/nonexistent/input.ndjson")).is_err());
    }
}
