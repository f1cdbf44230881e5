use crate::constants::{CUISINE, RATING, RESTAURANT_ID, RESTAURANT_NAME};
use crate::error::{MergeError, Result};
use crate::table::{Table, Value};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

static INSERT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^INSERT\s+INTO\s+restaurants\s+VALUES\s*\(\s*(\d+)\s*,\s*'([^']+)'\s*,\s*'([^']+)'\s*,\s*([\d.]+)\s*\)",
    )
    .expect("insert pattern is valid")
});

/// Start of an `INSERT INTO`, in any case, anywhere in the text.
static INSERT_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bINSERT\s+INTO\b").expect("insert keyword pattern is valid"));

const TABLE_NAME: &str = "restaurants";

/// How `INSERT` statements are recognized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Fixed textual pattern. Quoted strings may not contain an apostrophe.
    #[default]
    Pattern,
    /// Small tokenizer that understands `''` and `\'` escapes.
    Grammar,
}

/// Restaurant records pulled from a dump plus the number of `INSERT`
/// statements that did not fit the expected shape.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub table: Table,
    pub candidates: usize,
    pub skipped: usize,
}

struct RestaurantRow {
    id: i64,
    name: String,
    cuisine: String,
    rating: f64,
}

#[instrument(skip_all, fields(path = %path.display(), mode = ?mode))]
pub fn extract_restaurants(path: &Path, mode: ExtractionMode) -> Result<Extraction> {
    let content = fs::read_to_string(path).map_err(|e| MergeError::io(path, e))?;
    let extraction = extract_from_str(&content, mode);

    info!(
        "Extracted {} restaurants from {} INSERT statements ({} skipped)",
        extraction.table.row_count(),
        extraction.candidates,
        extraction.skipped
    );
    counter!("delivery_merge_rows_loaded_total", "source" => "dump")
        .increment(extraction.table.row_count() as u64);
    counter!("delivery_merge_dump_statements_skipped_total").increment(extraction.skipped as u64);
    Ok(extraction)
}

/// Extracts every well-formed restaurant `INSERT` in order of appearance.
///
/// Each `INSERT INTO` starts a candidate, wherever it sits and however the
/// statement wraps across lines. Keywords inside an extracted statement's
/// values are part of that statement and are not candidates.
pub fn extract_from_str(content: &str, mode: ExtractionMode) -> Extraction {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut table = Table::new(
        [RESTAURANT_ID, RESTAURANT_NAME, CUISINE, RATING]
            .iter()
            .map(|c| c.to_string())
            .collect(),
    );
    let mut candidates = 0usize;
    let mut skipped = 0usize;
    let mut consumed = 0usize;
    let mut line = 1usize;
    let mut line_offset = 0usize;

    for start in INSERT_KEYWORD.find_iter(content).map(|m| m.start()) {
        if start < consumed {
            continue;
        }
        candidates += 1;

        let statement = &content[start..];
        let parsed = match mode {
            ExtractionMode::Pattern => match_pattern(statement),
            ExtractionMode::Grammar => parse_grammar(statement),
        };
        match parsed {
            Some((row, len)) => {
                consumed = start + len;
                table.push_row(vec![
                    Value::Int(row.id),
                    Value::Text(row.name),
                    Value::Text(row.cuisine),
                    Value::Float(row.rating),
                ]);
            }
            None => {
                line += content[line_offset..start].matches('\n').count();
                line_offset = start;
                let head = statement.split_once(';').map_or(statement, |(head, _)| head);
                debug!(line, "Skipping unrecognized statement: {}", head.trim_end());
                skipped += 1;
            }
        }
    }

    Extraction {
        table,
        candidates,
        skipped,
    }
}

/// Matches at the start of `statement`; returns the row and the matched length.
fn match_pattern(statement: &str) -> Option<(RestaurantRow, usize)> {
    let caps = INSERT_PATTERN.captures(statement)?;
    let row = RestaurantRow {
        id: caps[1].parse().ok()?,
        name: caps[2].to_string(),
        cuisine: caps[3].to_string(),
        rating: caps[4].parse().ok()?,
    };
    Some((row, caps.get(0)?.end()))
}

#[derive(Debug, PartialEq)]
enum Token {
    Word(String),
    Number(String),
    Str(String),
    LParen,
    RParen,
    Comma,
}

struct Lexer<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Lexer<'s> {
    fn new(src: &'s str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek().filter(|&c| accept(c)) {
            s.push(c);
            self.pos += c.len_utf8();
        }
        s
    }

    /// `None` at end of input or on a character no token starts with.
    fn next_token(&mut self) -> Option<Token> {
        self.take_while(char::is_whitespace);
        let token = match self.peek()? {
            '(' => {
                self.bump();
                Token::LParen
            }
            ')' => {
                self.bump();
                Token::RParen
            }
            ',' => {
                self.bump();
                Token::Comma
            }
            '\'' => {
                self.bump();
                let mut s = String::new();
                loop {
                    match self.bump()? {
                        '\\' => s.push(self.bump()?),
                        '\'' if self.peek() == Some('\'') => {
                            self.bump();
                            s.push('\'');
                        }
                        '\'' => break,
                        other => s.push(other),
                    }
                }
                Token::Str(s)
            }
            c if c.is_ascii_digit() || c == '-' || c == '.' => {
                Token::Number(self.take_while(|d| d.is_ascii_digit() || d == '-' || d == '.'))
            }
            c if c.is_alphanumeric() || c == '_' => {
                Token::Word(self.take_while(|d| d.is_alphanumeric() || d == '_'))
            }
            _ => return None,
        };
        Some(token)
    }

    fn expect(&mut self, expected: Token) -> Option<()> {
        (self.next_token()? == expected).then_some(())
    }

    fn number(&mut self) -> Option<String> {
        match self.next_token()? {
            Token::Number(n) => Some(n),
            _ => None,
        }
    }

    fn string(&mut self) -> Option<String> {
        match self.next_token()? {
            Token::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Parses one statement from the start of `statement`; returns the row and
/// the length consumed up to the closing parenthesis.
fn parse_grammar(statement: &str) -> Option<(RestaurantRow, usize)> {
    let mut lexer = Lexer::new(statement);
    for keyword in ["INSERT", "INTO", TABLE_NAME, "VALUES"] {
        match lexer.next_token()? {
            Token::Word(w) if w.eq_ignore_ascii_case(keyword) => {}
            _ => return None,
        }
    }

    lexer.expect(Token::LParen)?;
    let id = lexer.number()?.parse::<i64>().ok()?;
    lexer.expect(Token::Comma)?;
    let name = lexer.string()?;
    lexer.expect(Token::Comma)?;
    let cuisine = lexer.string()?;
    lexer.expect(Token::Comma)?;
    let rating = lexer.number()?.parse::<f64>().ok()?;
    lexer.expect(Token::RParen)?;

    let row = RestaurantRow {
        id,
        name,
        cuisine,
        rating,
    };
    Some((row, lexer.pos))
}
