use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::{fmt, path::Path};

use crate::error::{Error, Result};
use crate::lookup::Lookup;
use crate::value::{Map, Value};

const COMMENT: char = '#';
const QUOTE_SINGLE: char = '\'';
const QUOTE_DOUBLE: char = '"';

/// Reason a line could not be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    InvalidFormat,
    EmptyKey,
    MissingEndQuote,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::InvalidFormat => f.write_str("invalid format"),
            ParseErrorKind::EmptyKey => f.write_str("empty key"),
            ParseErrorKind::MissingEndQuote => f.write_str("missing end quote"),
        }
    }
}

/// A malformed line of env formatted text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line number, 0 when the text was parsed on its own
    pub line: usize,
    pub text: String,
    pub kind: ParseErrorKind,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "line {}: ", self.line)?;
        }
        write!(f, "{} while parsing `{}`", self.kind, self.text)
    }
}

impl std::error::Error for ParseError {}

/// Parses a single `KEY=VALUE` line.
///
/// Returns `None` for blank lines and comments. Surrounding whitespace and an
/// `export ` prefix are stripped from the key, quoted values are unquoted and
/// unquoted values lose any ` # comment` suffix.
pub fn parse_line(line: &str) -> Result<Option<(String, Value)>, ParseError> {
    let text = line.trim();
    if text.is_empty() || text.starts_with(COMMENT) {
        return Ok(None);
    }

    let err = |kind| ParseError {
        line: 0,
        text: text.to_string(),
        kind,
    };

    let (key, val) = text
        .split_once('=')
        .ok_or_else(|| err(ParseErrorKind::InvalidFormat))?;

    let key = match key.strip_prefix("export") {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => key.trim_end(),
    };
    if key.is_empty() {
        return Err(err(ParseErrorKind::EmptyKey));
    }

    let val = val.trim_start();
    let val = if let Some(quoted) = val.strip_prefix(QUOTE_SINGLE) {
        unquote(quoted, QUOTE_SINGLE).ok_or_else(|| err(ParseErrorKind::MissingEndQuote))?
    } else if let Some(quoted) = val.strip_prefix(QUOTE_DOUBLE) {
        unquote(quoted, QUOTE_DOUBLE).ok_or_else(|| err(ParseErrorKind::MissingEndQuote))?
    } else {
        strip_comment(val).to_string()
    };

    Ok(Some((key.to_string(), Value::from(val))))
}

// The opening quote is already stripped. Anything after the closing quote is
// dropped. Double quoted values read `\n` and `\r` as line breaks.
fn unquote(val: &str, quote: char) -> Option<String> {
    let mut out = String::with_capacity(val.len());
    let mut escaped = false;

    for c in val.chars() {
        match c {
            c if c == quote && !escaped => return Some(out),
            '\\' if !escaped => escaped = true,
            'n' if escaped && quote == QUOTE_DOUBLE => {
                escaped = false;
                out.push('\n');
            }
            'r' if escaped && quote == QUOTE_DOUBLE => {
                escaped = false;
                out.push('\r');
            }
            c => {
                escaped = false;
                out.push(c);
            }
        }
    }
    None
}

fn strip_comment(val: &str) -> &str {
    let mut prev_space = true;
    for (i, c) in val.char_indices() {
        if c == COMMENT && prev_space {
            return val[..i].trim_end();
        }
        prev_space = c.is_whitespace();
    }
    val
}

/// Lazily scans env formatted text for values
///
/// A lookup only reads as far as needed to find its key, every pair read on
/// the way is kept for later lookups. Later lines override earlier ones once
/// they have been scanned.
pub struct Reader<R> {
    lines: io::Lines<R>,
    line_no: usize,
    found: Map,
}

impl<R: BufRead> Reader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            found: Map::new(),
        }
    }

    /// Scans the remaining input and returns every pair that was found
    pub fn into_map(mut self) -> Result<Map> {
        self.scan(None)?;
        Ok(self.found)
    }

    fn scan(&mut self, lookup: Option<&str>) -> Result<Option<Value>> {
        for line in self.lines.by_ref() {
            let line = line?;
            self.line_no += 1;

            let parsed = parse_line(&line).map_err(|mut err| {
                err.line = self.line_no;
                err
            })?;
            if let Some((key, val)) = parsed {
                let hit = lookup == Some(key.as_str());
                self.found.insert(key, val.clone());
                if hit {
                    return Ok(Some(val));
                }
            }
        }
        Ok(None)
    }
}

impl Reader<Cursor<String>> {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(Cursor::new(text.into()))
    }
}

impl Reader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> Lookup for Reader<R> {
    fn lookup(&mut self, key: &str) -> Result<Value> {
        if let Some(val) = self.found.get(key) {
            return Ok(val.clone());
        }
        self.scan(Some(key))?.ok_or_else(|| Error::not_found(key))
    }
}
