//! Comma-offset index over a line of delimited text

use super::RecordError;

const DELIMITER: u8 = b',';

/// A line of comma delimited text plus the byte offset of every comma
///
/// Tokens are sliced from the owned text through the offset table, so asking
/// for field 17 of a 40 field line never re-scans the line. A line with `n`
/// commas has `n + 1` tokens; a trailing comma yields an empty final token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DelimitedText {
    raw: String,
    delimiters: Box<[usize]>,
}

impl DelimitedText {
    /// Index the given line. Offsets are computed eagerly, once.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let delimiters = raw
            .bytes()
            .enumerate()
            .filter(|(_, b)| *b == DELIMITER)
            .map(|(i, _)| i)
            .collect();

        DelimitedText { raw, delimiters }
    }

    /// The i-th token, excluding its surrounding commas
    pub fn token(&self, index: usize) -> Result<&str, RecordError> {
        let n = self.delimiters.len();
        if index > n {
            return Err(RecordError::IndexOutOfRange {
                index,
                delimiters: n,
            });
        }

        let start = if index == 0 {
            0
        } else {
            self.delimiters[index - 1] + 1
        };
        let end = if index == n {
            self.raw.len()
        } else {
            self.delimiters[index]
        };

        // commas are single byte ASCII so both ends sit on char boundaries
        Ok(&self.raw[start..end])
    }

    /// Number of commas found in the line
    pub fn delimiter_count(&self) -> usize {
        self.delimiters.len()
    }

    /// Number of tokens (always `delimiter_count() + 1`)
    pub fn token_count(&self) -> usize {
        self.delimiters.len() + 1
    }

    /// Iterate over every token in order
    pub fn tokens(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.token_count()).filter_map(move |i| self.token(i).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn into_string(self) -> String {
        self.raw
    }
}
