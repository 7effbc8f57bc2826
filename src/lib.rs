//! # termsink
//! Thread-safe console sink that wraps the level-significant part of each log
//! line in ANSI color codes.
//!
//! ## Usage
//! ```toml
//! // Cargo.toml
//! ...
//! [dependencies]
//! termsink = "0.1.0"
//! ```
//!
//! ```rust
//! use termsink::{ColorMode, Level, Record, StdoutColorSink};
//!
//! let sink = StdoutColorSink::stdout(ColorMode::Automatic);
//! sink.write_record(&Record::new(Level::Info, "Hello, world!")).unwrap();
//! ```
//!
//! ## Patterns and colors
//! The highlighted range is delimited by `%^` and `%$` in the pattern. Colors
//! are plain ANSI sequences and can be changed per level.
//!
//! ```rust
//! use termsink::{ColorMode, ColorSink, Level, Record, palette};
//!
//! let sink: ColorSink<Vec<u8>> = ColorSink::new(Vec::new(), ColorMode::Always);
//! sink.set_pattern("%^%L%$ %v");
//! sink.set_color(Level::Info, &palette::fg(colored::Color::Blue));
//! sink.write_record(&Record::new(Level::Info, "ready")).unwrap();
//! assert_eq!(sink.into_inner(), b"\x1b[34mI\x1b[m ready\n");
//! ```
//!
//! ## With the `log` facade
//! ```rust
//! use termsink::{ColorMode, StderrColorSink};
//!
//! log::set_boxed_logger(Box::new(StderrColorSink::stderr(ColorMode::Automatic))).unwrap();
//! log::set_max_level(log::LevelFilter::Info);
//! log::warn!("disk almost full");
//! ```
//!
//! ## Environment
//! [`ColorSink::from_env`] reads `TERMSINK_COLOR_MODE` (`always`, `automatic`,
//! `never`) and `TERMSINK_PATTERN`.

mod config;
mod formatter;
mod level;
mod lock;
pub mod palette;
mod pattern;
mod probe;
mod record;
mod sink;

pub use config::{TERMSINK_CONFIG, TermsinkConfig};
pub use formatter::{Formatter, Rendered};
pub use level::Level;
pub use lock::{ConsoleLock, ConsoleMutex, NullLock};
pub use pattern::{DEFAULT_PATTERN, PatternFormatter};
pub use probe::{EnvProbe, TargetStream, TerminalProbe};
pub use record::Record;
pub use sink::{
    ColorMode, ColorSink, StderrColorSink, StderrColorSinkSt, StdoutColorSink, StdoutColorSinkSt,
};
