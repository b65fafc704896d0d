//! Maps solc `src` byte offsets back to line/column positions in the
//! original source text.

use serde::{Deserialize, Serialize};

/// A 1-based (line, column) position in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub col: u32,
}

impl SourceLocation {
    pub fn unknown() -> Self {
        Self { line: 0, col: 0 }
    }

    pub fn is_known(&self) -> bool {
        self.line != 0
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, col {}", self.line, self.col)
    }
}

/// Parse the offset out of a solc source tag of the form `offset:length:fileIndex`.
pub fn parse_src_offset(src: &str) -> Option<usize> {
    src.split(':').next()?.parse().ok()
}

/// Convert a byte offset into a 1-based (line, column) pair.
///
/// Lines are delimited by `\n`, `\r\n` or a lone `\r`; the terminator bytes
/// count toward the line they end. Offsets past the end of the text (and
/// empty sources) fall back to (1, 1).
pub fn offset_to_line_col(offset: usize, source_text: &str) -> SourceLocation {
    if source_text.is_empty() {
        return SourceLocation { line: 1, col: 1 };
    }

    let bytes = source_text.as_bytes();
    let mut line: u32 = 1;
    let mut line_start: usize = 0;
    let mut i: usize = 0;

    while i < bytes.len() {
        let terminator_len = match bytes[i] {
            b'\r' if i + 1 < bytes.len() && bytes[i + 1] == b'\n' => 2,
            b'\r' | b'\n' => 1,
            _ => {
                i += 1;
                continue;
            }
        };

        let line_end = i + terminator_len;
        if offset < line_end {
            return SourceLocation {
                line,
                col: (offset - line_start + 1) as u32,
            };
        }
        line += 1;
        line_start = line_end;
        i = line_end;
    }

    if offset < bytes.len() {
        return SourceLocation {
            line,
            col: (offset - line_start + 1) as u32,
        };
    }

    SourceLocation { line: 1, col: 1 }
}

/// Map a full `src` tag to a location, defaulting to the unknown location.
pub fn src_to_location(src: &str, source_text: &str) -> SourceLocation {
    match parse_src_offset(src) {
        Some(offset) => offset_to_line_col(offset, source_text),
        None => SourceLocation::unknown(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_offsets_across_lines() {
        let src = "pragma solidity ^0.8.0;\ncontract C {\n    uint x;\n}\n";
        assert_eq!(offset_to_line_col(0, src), SourceLocation { line: 1, col: 1 });
        // 'c' of "contract" is the first byte of line 2.
        assert_eq!(offset_to_line_col(24, src), SourceLocation { line: 2, col: 1 });
        // "uint" starts after four spaces on line 3.
        assert_eq!(offset_to_line_col(41, src), SourceLocation { line: 3, col: 5 });
    }

    #[test]
    fn counts_crlf_toward_its_line() {
        let src = "ab\r\ncd";
        assert_eq!(offset_to_line_col(2, src), SourceLocation { line: 1, col: 3 });
        assert_eq!(offset_to_line_col(3, src), SourceLocation { line: 1, col: 4 });
        assert_eq!(offset_to_line_col(4, src), SourceLocation { line: 2, col: 1 });
    }

    #[test]
    fn lone_carriage_return_ends_a_line() {
        let src = "ab\rcd";
        assert_eq!(offset_to_line_col(3, src), SourceLocation { line: 2, col: 1 });
    }

    #[test]
    fn out_of_range_falls_back() {
        assert_eq!(offset_to_line_col(100, "short"), SourceLocation { line: 1, col: 1 });
        assert_eq!(offset_to_line_col(0, ""), SourceLocation { line: 1, col: 1 });
    }

    #[test]
    fn parses_src_tags() {
        assert_eq!(parse_src_offset("120:34:0"), Some(120));
        assert_eq!(parse_src_offset("garbage"), None);
    }
}
