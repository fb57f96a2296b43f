//! FILENAME: core/persistence/src/delimited.rs
//! PURPOSE: Delimited-text decoding (CSV/TSV/TXT uploads).
//! CONTEXT: The delimiter is sniffed from the first non-empty line by
//! counting candidate separators and taking the maximum; fields support
//! double-quote escaping.

use crate::loader::RawGrid;

const CANDIDATES: [char; 4] = [',', ';', '\t', '|'];

/// Counts candidate separators in the sample line and picks the most
/// frequent one; a sample without any candidate falls back to the comma.
pub fn detect_delimiter(sample: &str) -> char {
    let mut best = ',';
    let mut best_count = 0usize;
    for candidate in CANDIDATES {
        let count = sample.matches(candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

/// Decodes a delimited-text upload into a raw grid. The first non-empty
/// line is the header; fully blank lines are skipped.
pub fn read_grid(content: &[u8]) -> RawGrid {
    let text = String::from_utf8_lossy(content);
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let header_line = match lines.next() {
        Some(line) => line,
        None => return RawGrid::default(),
    };
    let delimiter = detect_delimiter(header_line);

    let headers = split_line(header_line, delimiter);
    let rows: Vec<Vec<String>> = lines.map(|line| split_line(line, delimiter)).collect();

    RawGrid { headers, rows }
}

/// Splits one line on the delimiter, honoring double-quoted fields with
/// `""` escapes.
fn split_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
        } else if ch == '"' && current.is_empty() {
            in_quotes = true;
        } else if ch == delimiter {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    fields.push(current);
    fields.iter().map(|f| f.trim().to_string()).collect()
}
