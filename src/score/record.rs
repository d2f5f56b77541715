//! Semicolon-delimited commit records.
//!
//! Each line holds `identifier;message`, normally produced by
//! `git log --format='%ae;%s'`. Fields may be double-quoted, in which case
//! `;`, line breaks and doubled quotes (`""`) are taken literally. Fields
//! after the second are ignored.

use std::io::BufRead;

use thiserror::Error;

/// Field separator.
pub const DELIMITER: char = ';';

const QUOTE: char = '"';

/// One commit attributed to an author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    /// Author identifier, usually an email address.
    pub identifier: String,
    /// Commit message subject.
    pub message: String,
}

impl InputRecord {
    /// Creates a record.
    pub fn new(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while reading records.
#[derive(Error, Debug)]
pub enum InputError {
    /// A record without both fields.
    #[error("Malformed record on line {line}: expected 2 fields separated by ';', found {fields}")]
    MalformedRecord {
        /// 1-based line where the record starts.
        line: usize,
        /// Number of fields found.
        fields: usize,
    },

    /// A quoted field still open at end of input.
    #[error("Malformed record on line {line}: unterminated quoted field")]
    UnterminatedQuote {
        /// 1-based line where the record starts.
        line: usize,
    },

    /// Failure reading the underlying stream.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// Iterator over the records of a buffered stream.
pub struct RecordReader<R> {
    input: R,
    line: usize,
    finished: bool,
}

impl<R: BufRead> RecordReader<R> {
    /// Wraps a buffered reader.
    pub fn new(input: R) -> Self {
        Self {
            input,
            line: 0,
            finished: false,
        }
    }

    /// Reads one physical line without its terminator; `None` at end of input.
    ///
    /// Bytes that are not valid UTF-8 become U+FFFD.
    fn read_line(&mut self) -> Result<Option<String>, InputError> {
        let mut buffer = Vec::new();
        if self.input.read_until(b'\n', &mut buffer)? == 0 {
            return Ok(None);
        }
        self.line += 1;
        if buffer.ends_with(b"\n") {
            buffer.pop();
            if buffer.ends_with(b"\r") {
                buffer.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&buffer).into_owned()))
    }

    fn next_record(&mut self) -> Result<Option<InputRecord>, InputError> {
        let Some(mut text) = self.read_line()? else {
            return Ok(None);
        };
        let start = self.line;

        let fields = loop {
            match split_fields(&text) {
                Some(fields) => break fields,
                None => match self.read_line()? {
                    Some(continuation) => {
                        text.push('\n');
                        text.push_str(&continuation);
                    }
                    None => return Err(InputError::UnterminatedQuote { line: start }),
                },
            }
        };

        let field_count = fields.len();
        let mut fields = fields.into_iter();
        match (fields.next(), fields.next()) {
            (Some(identifier), Some(message)) => Ok(Some(InputRecord {
                identifier,
                message,
            })),
            _ => Err(InputError::MalformedRecord {
                line: start,
                fields: field_count,
            }),
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<InputRecord, InputError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

/// Splits a record into fields, or `None` while a quoted field is still open.
///
/// A blank record has no fields.
fn split_fields(text: &str) -> Option<Vec<String>> {
    if text.is_empty() {
        return Some(Vec::new());
    }

    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            QUOTE if in_quotes => {
                if chars.peek() == Some(&QUOTE) {
                    chars.next();
                    field.push(QUOTE);
                } else {
                    in_quotes = false;
                }
            }
            QUOTE if field.is_empty() => in_quotes = true,
            DELIMITER if !in_quotes => fields.push(std::mem::take(&mut field)),
            other => field.push(other),
        }
    }

    if in_quotes {
        return None;
    }
    fields.push(field);
    Some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(input: &str) -> Result<Vec<InputRecord>, InputError> {
        RecordReader::new(Cursor::new(input)).collect()
    }

    #[test]
    fn reads_simple_records() {
        let records = read_all("a@x.com;ABCDE-fix bug\nb@x.com;nope\n").unwrap();
        assert_eq!(
            records,
            vec![
                InputRecord::new("a@x.com", "ABCDE-fix bug"),
                InputRecord::new("b@x.com", "nope"),
            ]
        );
    }

    #[test]
    fn last_line_without_newline_is_read() {
        let records = read_all("a@x.com;one").unwrap();
        assert_eq!(records, vec![InputRecord::new("a@x.com", "one")]);
    }

    #[test]
    fn strips_carriage_returns() {
        let records = read_all("a@x.com;one\r\n").unwrap();
        assert_eq!(records[0].message, "one");
    }

    #[test]
    fn extra_fields_are_ignored() {
        let records = read_all("a@x.com;subject;trailing;more\n").unwrap();
        assert_eq!(records, vec![InputRecord::new("a@x.com", "subject")]);
    }

    #[test]
    fn empty_message_is_a_field() {
        let records = read_all("a@x.com;\n").unwrap();
        assert_eq!(records, vec![InputRecord::new("a@x.com", "")]);
    }

    #[test]
    fn quoted_fields_keep_delimiters_and_quotes() {
        let records = read_all("a@x.com;\"ABCDE-fix; \"\"quoted\"\" bug\"\n").unwrap();
        assert_eq!(
            records,
            vec![InputRecord::new("a@x.com", "ABCDE-fix; \"quoted\" bug")]
        );
    }

    #[test]
    fn quoted_field_may_span_lines() {
        let records = read_all("a@x.com;\"first\nsecond\"\nb@x.com;third\n").unwrap();
        assert_eq!(
            records,
            vec![
                InputRecord::new("a@x.com", "first\nsecond"),
                InputRecord::new("b@x.com", "third"),
            ]
        );
    }

    #[test]
    fn quote_inside_unquoted_field_is_literal() {
        let records = read_all("a@x.com;say \"hi\"\n").unwrap();
        assert_eq!(records[0].message, "say \"hi\"");
    }

    #[test]
    fn single_field_is_malformed() {
        let err = read_all("a@x.com;ok\nmissing-separator\n").unwrap_err();
        assert!(matches!(
            err,
            InputError::MalformedRecord { line: 2, fields: 1 }
        ));
    }

    #[test]
    fn blank_line_is_malformed() {
        let err = read_all("a@x.com;ok\n\nb@x.com;ok\n").unwrap_err();
        assert!(matches!(
            err,
            InputError::MalformedRecord { line: 2, fields: 0 }
        ));
    }

    #[test]
    fn unterminated_quote_is_malformed() {
        let err = read_all("a@x.com;\"never closed\n").unwrap_err();
        assert!(matches!(err, InputError::UnterminatedQuote { line: 1 }));
    }

    #[test]
    fn stops_after_first_error() {
        let mut reader = RecordReader::new(Cursor::new("bad\na@x.com;ok\n"));
        assert!(matches!(reader.next(), Some(Err(_))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let input: &[u8] = b"a@x.com;ABCDE-caf\xe9 fix\nb@x.com;ok\n";
        let records: Vec<InputRecord> = RecordReader::new(input)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            records,
            vec![
                InputRecord::new("a@x.com", "ABCDE-caf\u{FFFD} fix"),
                InputRecord::new("b@x.com", "ok"),
            ]
        );
    }

    #[test]
    fn empty_input_has_no_records() {
        assert!(read_all("").unwrap().is_empty());
    }
}
