use std::{
    io::{self, Write},
    sync::LazyLock,
};

use regex::Regex;

use crate::{
    Record,
    formatter::{Formatter, Rendered},
};

/// Pattern installed by sinks that were given no pattern.
pub const DEFAULT_PATTERN: &str = "[%Y-%m-%d %H:%M:%S.%e] [%^%l%$] %v";

static FLAG: LazyLock<Regex> = LazyLock::new(|| Regex::new("(?s)%.").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Message,
    Level,
    ShortLevel,
    Name,
    Time(&'static str),
    HighlightStart,
    HighlightEnd,
}

/// Formats records according to a `%`-flag pattern.
///
/// | flag | output |
/// |------|--------|
/// | `%v` | message |
/// | `%l` / `%L` | level name / short level name |
/// | `%n` | logger name |
/// | `%Y %m %d %H %M %S` | UTC date and time fields |
/// | `%e` / `%f` | milliseconds / microseconds |
/// | `%^` / `%$` | start / end of the colored range |
/// | `%%` | a literal `%` |
///
/// Unknown flags are written as-is.
#[derive(Debug, Clone)]
pub struct PatternFormatter {
    pattern: String,
    eol: String,
    tokens: Vec<Token>,
}

impl Default for PatternFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN)
    }
}

impl PatternFormatter {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.into(),
            eol: "\n".into(),
            tokens: compile(pattern),
        }
    }

    /// Sets the line terminator appended after each record.
    pub fn with_eol(self, eol: &str) -> Self {
        Self {
            eol: eol.into(),
            ..self
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

fn compile(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut last = 0;
    for flag in FLAG.find_iter(pattern) {
        literal.push_str(&pattern[last..flag.start()]);
        last = flag.end();
        let token = match &flag.as_str()[1..] {
            "v" => Token::Message,
            "l" => Token::Level,
            "L" => Token::ShortLevel,
            "n" => Token::Name,
            "Y" => Token::Time("%Y"),
            "m" => Token::Time("%m"),
            "d" => Token::Time("%d"),
            "H" => Token::Time("%H"),
            "M" => Token::Time("%M"),
            "S" => Token::Time("%S"),
            "e" => Token::Time("%3f"),
            "f" => Token::Time("%6f"),
            "^" => Token::HighlightStart,
            "$" => Token::HighlightEnd,
            "%" => {
                literal.push('%');
                continue;
            }
            _ => {
                literal.push_str(flag.as_str());
                continue;
            }
        };
        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }
        tokens.push(token);
    }
    literal.push_str(&pattern[last..]);
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}

impl Formatter for PatternFormatter {
    fn format(&self, record: &Record, dest: &mut Rendered) -> io::Result<()> {
        let mut open = false;
        for token in &self.tokens {
            match token {
                Token::Literal(s) => dest.push_str(s),
                Token::Message => dest.push_str(&record.message),
                Token::Level => dest.push_str(record.level.as_str()),
                Token::ShortLevel => dest.push_str(record.level.short_str()),
                Token::Name => dest.push_str(record.name.as_deref().unwrap_or_default()),
                Token::Time(spec) => write!(dest.buf_mut(), "{}", record.time.format(spec))?,
                Token::HighlightStart => {
                    dest.mark_highlight_start();
                    open = true;
                }
                Token::HighlightEnd => {
                    dest.mark_highlight_end();
                    open = false;
                }
            }
        }
        if open {
            dest.mark_highlight_end();
        }
        dest.push_str(&self.eol);
        Ok(())
    }
}
