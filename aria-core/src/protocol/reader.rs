//! Fail-soft line reader producing position reports

use std::io::{self, BufRead};

use super::{nop_to_aria_csv, PositionReport, RecordError};

/// Parses one line of text into a position report
pub type LineParser = fn(&str) -> Result<PositionReport, RecordError>;

/// The text formats a [`PositionReader`] understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// OpenARIA CSV, one report per line
    AriaCsv,
    /// NOP radar hits, converted to OpenARIA CSV on the fly
    Nop,
}

impl WireFormat {
    pub fn parser(self) -> LineParser {
        match self {
            WireFormat::AriaCsv => parse_aria_csv,
            WireFormat::Nop => parse_nop,
        }
    }
}

fn parse_aria_csv(line: &str) -> Result<PositionReport, RecordError> {
    PositionReport::parse(line)
}

fn parse_nop(line: &str) -> Result<PositionReport, RecordError> {
    PositionReport::parse(nop_to_aria_csv(line)?)
}

/// Lazily turns a stream of lines into [`PositionReport`]s
///
/// Lines that cannot be parsed are skipped and counted; they never end the
/// stream. The iterator is forward only; to start over, reopen the input.
///
/// A non-recoverable I/O error ends iteration and is kept for the caller,
/// see [`PositionReader::take_io_error`].
pub struct PositionReader<R> {
    input: R,
    parser: LineParser,
    buffer: String,
    line_count: u64,
    error_count: u64,
    io_error: Option<io::Error>,
    finished: bool,
}

impl<R: BufRead> PositionReader<R> {
    pub fn new(input: R, format: WireFormat) -> Self {
        Self::with_parser(input, format.parser())
    }

    pub fn with_parser(input: R, parser: LineParser) -> Self {
        PositionReader {
            input,
            parser,
            buffer: String::new(),
            line_count: 0,
            error_count: 0,
            io_error: None,
            finished: false,
        }
    }

    /// Lines consumed so far, whether or not they produced a report
    pub fn line_count(&self) -> u64 {
        self.line_count
    }

    /// Lines skipped because they could not be decoded
    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// The I/O error that ended iteration early, if any
    pub fn take_io_error(&mut self) -> Option<io::Error> {
        self.io_error.take()
    }
}

impl<R: BufRead> Iterator for PositionReader<R> {
    type Item = PositionReport;

    fn next(&mut self) -> Option<Self::Item> {
        // a loop, not recursion: a long run of bad lines must not grow the stack
        while !self.finished {
            self.buffer.clear();

            match self.input.read_line(&mut self.buffer) {
                Ok(0) => self.finished = true,
                Ok(_) => {
                    self.line_count += 1;
                    let line = self.buffer.trim_end_matches(['\n', '\r']);

                    match (self.parser)(line) {
                        Ok(report) => return Some(report),
                        Err(e) => {
                            self.error_count += 1;
                            log::debug!("skipping line {}: {}", self.line_count, e);
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    // the offending line was consumed, carry on with the next one
                    self.line_count += 1;
                    self.error_count += 1;
                    log::debug!("skipping line {}: {}", self.line_count, e);
                }
                Err(e) => {
                    log::error!("reading stopped after line {}: {}", self.line_count, e);
                    self.io_error = Some(e);
                    self.finished = true;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_and_counts_bad_lines() {
        let data = "\
,,2018-03-24T14:41:09.371Z,a,40.0,-74.0,1000
garbage
,,2018-03-24T14:41:10.371Z,a,95.0,-74.0,1000

,,2018-03-24T14:41:11.371Z,a,40.1,-74.1,1100
";
        let mut reader = PositionReader::new(data.as_bytes(), WireFormat::AriaCsv);
        let reports: Vec<_> = reader.by_ref().collect();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].altitude_ft(), Some(1100.0));
        assert_eq!(reader.line_count(), 5);
        assert_eq!(reader.error_count(), 3);
        assert!(reader.take_io_error().is_none());
    }

    #[test]
    fn test_crlf_line_endings() {
        let data = ",,2018-03-24T14:41:09Z,a,40.0,-74.0,\r\n";
        let reports: Vec<_> = PositionReader::new(data.as_bytes(), WireFormat::AriaCsv).collect();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].field_count(), 7);
        assert_eq!(reports[0].token(6).unwrap(), "");
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let mut data = b",,2018-03-24T14:41:09Z,a,40.0,-74.0\n".to_vec();
        data.extend_from_slice(&[0xff, 0xfe, b'\n']);
        data.extend_from_slice(b",,2018-03-24T14:41:10Z,a,40.0,-74.0\n");

        let mut reader = PositionReader::new(&data[..], WireFormat::AriaCsv);
        assert_eq!(reader.by_ref().count(), 2);
        assert_eq!(reader.error_count(), 1);
        assert_eq!(reader.line_count(), 3);
    }

    #[test]
    fn test_nop_input() {
        let data = "[RH],STARS,A80_B,07/10/2016,20:03:53.856,DAL200,MD88,D,1311,159,339,221,034.27719,-083.63591,1519,1311,57.2078,66.6181,1,L,A,A80,,DRE,ATL,2006,ATL,ACT,IFR,,01465,,,,,27L,L,1,,0,{RH}\n[HB],STARS,A80,{HB}\n";
        let mut reader = PositionReader::new(data.as_bytes(), WireFormat::Nop);

        let reports: Vec<_> = reader.by_ref().collect();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].link_id(), "A80-1519");
        assert_eq!(reader.error_count(), 1);
    }
}
