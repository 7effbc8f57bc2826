use std::{
    io::{self, Write},
    marker::PhantomData,
    str::FromStr,
};

use log::Log;

use crate::{
    Level, Record,
    config::TERMSINK_CONFIG,
    formatter::{Formatter, Rendered},
    lock::{ConsoleLock, ConsoleMutex, NullLock},
    palette::{ColorTable, RESET},
    pattern::PatternFormatter,
    probe::{EnvProbe, TargetStream, TerminalProbe},
};

/// When a sink wraps the highlighted range in color codes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Always,
    /// Color only if the probe reports a color terminal, checked when the
    /// mode is set.
    #[default]
    Automatic,
    Never,
}

impl FromStr for ColorMode {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" | "on" => Ok(ColorMode::Always),
            "automatic" | "auto" => Ok(ColorMode::Automatic),
            "never" | "off" => Ok(ColorMode::Never),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unknown color mode {s:?}, expected always, automatic or never"),
            )),
        }
    }
}

struct SinkState<W> {
    target: W,
    mode: ColorMode,
    should_color: bool,
    colors: ColorTable,
    formatter: Box<dyn Formatter>,
    probe: Box<dyn TerminalProbe>,
}

impl<W: TargetStream> SinkState<W> {
    fn set_color_mode(&mut self, mode: ColorMode) {
        self.mode = mode;
        self.should_color = match mode {
            ColorMode::Always => true,
            ColorMode::Automatic => self.probe.is_color_terminal(&self.target),
            ColorMode::Never => false,
        };
    }

    fn print(&mut self, record: &Record) -> io::Result<()> {
        let mut rendered = Rendered::new();
        self.formatter.format(record, &mut rendered)?;
        match rendered.split_highlight().filter(|_| self.should_color) {
            Some((before, highlight, after)) => {
                self.target.write_all(before)?;
                self.target
                    .write_all(self.colors.get(record.level).as_bytes())?;
                self.target.write_all(highlight)?;
                self.target.write_all(RESET.as_bytes())?;
                self.target.write_all(after)?;
            }
            None => self.target.write_all(rendered.bytes())?,
        }
        self.target.flush()
    }
}

/// Console sink that colors the level-significant part of each record.
///
/// Every operation runs under the lock selected by `M`, so a record and its
/// color codes reach the stream as one contiguous run, and configuration
/// changes never land in the middle of a record.
pub struct ColorSink<W, M: ConsoleMutex = ConsoleLock> {
    state: M::Guarded<SinkState<W>>,
    _lock: PhantomData<M>,
}

pub type StdoutColorSink = ColorSink<io::Stdout, ConsoleLock>;
pub type StderrColorSink = ColorSink<io::Stderr, ConsoleLock>;
/// Single-threaded stdout sink.
pub type StdoutColorSinkSt = ColorSink<io::Stdout, NullLock>;
/// Single-threaded stderr sink.
pub type StderrColorSinkSt = ColorSink<io::Stderr, NullLock>;

impl<M: ConsoleMutex> ColorSink<io::Stdout, M> {
    pub fn stdout(mode: ColorMode) -> Self {
        Self::new(io::stdout(), mode)
    }
}

impl<M: ConsoleMutex> ColorSink<io::Stderr, M> {
    pub fn stderr(mode: ColorMode) -> Self {
        Self::new(io::stderr(), mode)
    }
}

impl<W: TargetStream, M: ConsoleMutex> ColorSink<W, M> {
    /// Creates a sink probing the terminal with [`EnvProbe`].
    pub fn new(target: W, mode: ColorMode) -> Self {
        Self::with_probe(target, mode, EnvProbe)
    }

    pub fn with_probe(target: W, mode: ColorMode, probe: impl TerminalProbe + 'static) -> Self {
        Self::build(target, mode, Box::new(probe), PatternFormatter::default())
    }

    /// Creates a sink whose color mode and pattern come from the
    /// `TERMSINK_COLOR_MODE` and `TERMSINK_PATTERN` environment variables.
    pub fn from_env(target: W) -> Result<Self, io::Error> {
        let mode = TERMSINK_CONFIG.COLOR_MODE.parse()?;
        let formatter = PatternFormatter::new(&TERMSINK_CONFIG.PATTERN);
        Ok(Self::build(target, mode, Box::new(EnvProbe), formatter))
    }

    fn build(
        target: W,
        mode: ColorMode,
        probe: Box<dyn TerminalProbe>,
        formatter: PatternFormatter,
    ) -> Self {
        let mut state = SinkState {
            target,
            mode,
            should_color: false,
            colors: ColorTable::default(),
            formatter: Box::new(formatter),
            probe,
        };
        state.set_color_mode(mode);
        Self {
            state: M::new(state),
            _lock: PhantomData,
        }
    }

    /// Formats `record` and writes it, flushing the stream afterwards.
    ///
    /// On error the stream may hold a prefix of the record.
    pub fn write_record(&self, record: &Record) -> io::Result<()> {
        M::with(&self.state, |state| state.print(record))
    }

    pub fn flush(&self) -> io::Result<()> {
        M::with(&self.state, |state| state.target.flush())
    }

    /// Sets the color code written before the highlighted range of `level` records.
    pub fn set_color(&self, level: Level, code: &str) {
        M::with(&self.state, |state| state.colors.set(level, code));
    }

    pub fn color(&self, level: Level) -> String {
        M::with(&self.state, |state| state.colors.get(level).to_owned())
    }

    /// Replaces the formatter with a [`PatternFormatter`] for `pattern`.
    pub fn set_pattern(&self, pattern: &str) {
        self.set_formatter(Box::new(PatternFormatter::new(pattern)));
    }

    pub fn set_formatter(&self, formatter: Box<dyn Formatter>) {
        M::with(&self.state, |state| state.formatter = formatter);
    }

    /// Whether records are currently written with color codes.
    pub fn should_color(&self) -> bool {
        M::with(&self.state, |state| state.should_color)
    }

    pub fn color_mode(&self) -> ColorMode {
        M::with(&self.state, |state| state.mode)
    }

    /// Sets the color mode. `Automatic` probes the stream again now.
    pub fn set_color_mode(&self, mode: ColorMode) {
        M::with(&self.state, |state| state.set_color_mode(mode));
    }

    /// Consumes the sink and returns its stream.
    pub fn into_inner(self) -> W {
        M::into_inner(self.state).target
    }
}

impl<W: TargetStream + Send + 'static> Log for ColorSink<W, ConsoleLock> {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        self.write_record(&Record::from(record)).ok();
    }

    fn flush(&self) {
        ColorSink::flush(self).ok();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        ops::Range,
        sync::{
            Arc, Mutex,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
        thread,
    };

    use super::*;
    use crate::palette;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> Vec<u8> {
            self.0.lock().unwrap().clone()
        }

        fn text(&self) -> String {
            String::from_utf8(self.contents()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl TargetStream for SharedBuffer {
        fn is_terminal(&self) -> bool {
            false
        }
    }

    #[derive(Clone, Default)]
    struct FakeProbe {
        color: Arc<AtomicBool>,
        calls: Arc<AtomicUsize>,
    }

    impl TerminalProbe for FakeProbe {
        fn is_color_terminal(&self, _: &dyn TargetStream) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.color.load(Ordering::SeqCst)
        }
    }

    /// Renders fixed text with a fixed highlight range, in small pieces.
    struct Scripted {
        text: &'static str,
        range: Option<Range<usize>>,
    }

    impl Formatter for Scripted {
        fn format(&self, _: &Record, dest: &mut Rendered) -> io::Result<()> {
            for chunk in self.text.as_bytes().chunks(2) {
                dest.buf_mut().extend_from_slice(chunk);
                thread::yield_now();
            }
            if let Some(range) = &self.range {
                dest.set_highlight(range.clone());
            }
            Ok(())
        }
    }

    fn scripted_sink(
        mode: ColorMode,
        range: Option<Range<usize>>,
    ) -> (ColorSink<SharedBuffer>, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let sink = ColorSink::new(buffer.clone(), mode);
        sink.set_formatter(Box::new(Scripted {
            text: "2024 ERROR boom",
            range,
        }));
        (sink, buffer)
    }

    #[test]
    fn test_never_writes_formatted_text_unchanged() {
        let (sink, buffer) = scripted_sink(ColorMode::Never, Some(5..10));
        sink.write_record(&Record::new(Level::Error, "boom")).unwrap();
        assert_eq!(buffer.text(), "2024 ERROR boom");
        assert!(!sink.should_color());
    }

    #[test]
    fn test_always_wraps_highlight() {
        let (sink, buffer) = scripted_sink(ColorMode::Always, Some(5..10));
        sink.write_record(&Record::new(Level::Error, "boom")).unwrap();
        assert_eq!(buffer.text(), "2024 \x1b[31m\x1b[1mERROR\x1b[m boom");
    }

    #[test]
    fn test_empty_range_writes_unchanged() {
        let (sink, buffer) = scripted_sink(ColorMode::Always, Some(5..5));
        sink.write_record(&Record::new(Level::Error, "boom")).unwrap();
        assert_eq!(buffer.text(), "2024 ERROR boom");

        let (sink, buffer) = scripted_sink(ColorMode::Always, None);
        sink.write_record(&Record::new(Level::Error, "boom")).unwrap();
        assert_eq!(buffer.text(), "2024 ERROR boom");
    }

    #[test]
    fn test_out_of_bounds_range_writes_unchanged() {
        let (sink, buffer) = scripted_sink(ColorMode::Always, Some(5..40));
        sink.write_record(&Record::new(Level::Error, "boom")).unwrap();
        assert_eq!(buffer.text(), "2024 ERROR boom");
    }

    #[test]
    fn test_highlight_marks_do_not_leak_between_records() {
        let buffer = SharedBuffer::default();
        let sink: ColorSink<_> = ColorSink::new(buffer.clone(), ColorMode::Always);
        sink.set_pattern("%^%v%$");
        sink.write_record(&Record::new(Level::Info, "a")).unwrap();
        sink.set_pattern("%v");
        sink.write_record(&Record::new(Level::Info, "b")).unwrap();
        assert_eq!(buffer.text(), "\x1b[32ma\x1b[m\nb\n");
    }

    #[test]
    fn test_automatic_probes_only_when_set() {
        let probe = FakeProbe::default();
        probe.color.store(true, Ordering::SeqCst);
        let buffer = SharedBuffer::default();
        let sink: ColorSink<_> =
            ColorSink::with_probe(buffer.clone(), ColorMode::Automatic, probe.clone());
        assert!(sink.should_color());
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

        // Capability changes after resolution are not picked up...
        probe.color.store(false, Ordering::SeqCst);
        sink.set_pattern("%^%L%$");
        sink.write_record(&Record::new(Level::Debug, "x")).unwrap();
        assert!(sink.should_color());
        assert_eq!(buffer.text(), "\x1b[36mD\x1b[m\n");

        // ...until the mode is set again.
        sink.set_color_mode(ColorMode::Automatic);
        assert!(!sink.should_color());
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_always_and_never_do_not_probe() {
        let probe = FakeProbe::default();
        let sink: ColorSink<_> =
            ColorSink::with_probe(SharedBuffer::default(), ColorMode::Always, probe.clone());
        assert!(sink.should_color());
        sink.set_color_mode(ColorMode::Never);
        assert!(!sink.should_color());
        sink.set_color_mode(ColorMode::Always);
        assert_eq!(sink.color_mode(), ColorMode::Always);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_set_color_only_affects_later_records_of_that_level() {
        let buffer = SharedBuffer::default();
        let sink: ColorSink<_> = ColorSink::new(buffer.clone(), ColorMode::Always);
        sink.set_pattern("%^%L%$");
        sink.write_record(&Record::new(Level::Warn, "x")).unwrap();
        let before = buffer.contents();

        sink.set_color(Level::Warn, "X");
        sink.write_record(&Record::new(Level::Warn, "x")).unwrap();
        sink.write_record(&Record::new(Level::Info, "x")).unwrap();

        let text = buffer.text();
        assert!(text.as_bytes().starts_with(&before));
        assert_eq!(
            text,
            "\x1b[33m\x1b[1mW\x1b[m\nXW\x1b[m\n\x1b[32mI\x1b[m\n"
        );
        assert_eq!(sink.color(Level::Warn), "X");
        assert_eq!(sink.color(Level::Info), ColorTable::default().get(Level::Info));
    }

    #[test]
    fn test_color_codes_pass_through_verbatim() {
        let buffer = SharedBuffer::default();
        let sink: ColorSink<_> = ColorSink::new(buffer.clone(), ColorMode::Always);
        sink.set_pattern("%^%v%$");
        let code = format!("{}{}", palette::fg(colored::Color::Blue), "\u{0}\u{7f}");
        sink.set_color(Level::Trace, &code);
        sink.write_record(&Record::new(Level::Trace, "t")).unwrap();
        assert_eq!(buffer.text(), "\x1b[34m\u{0}\u{7f}t\x1b[m\n");
    }

    #[test]
    fn test_concurrent_records_are_contiguous() {
        let buffer = SharedBuffer::default();
        let sink: Arc<ColorSink<_>> = Arc::new(ColorSink::new(buffer.clone(), ColorMode::Always));
        sink.set_pattern("%^%v%$");
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    let message = String::from(char::from(b'a' + i)).repeat(64);
                    for _ in 0..200 {
                        sink.write_record(&Record::new(Level::Info, message.as_str()))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let text = buffer.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 8 * 200);
        for line in lines {
            let body = line
                .strip_prefix("\x1b[32m")
                .and_then(|l| l.strip_suffix(RESET))
                .unwrap_or_else(|| panic!("torn record: {line:?}"));
            assert_eq!(body.len(), 64);
            let first = body.as_bytes()[0];
            assert!(body.bytes().all(|b| b == first), "spliced record: {body:?}");
        }
    }

    #[test]
    fn test_formatter_swap_is_atomic() {
        let buffer = SharedBuffer::default();
        let sink: Arc<ColorSink<_>> = Arc::new(ColorSink::new(buffer.clone(), ColorMode::Never));
        let writers: Vec<_> = (0..4)
            .map(|_| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for _ in 0..200 {
                        sink.write_record(&Record::new(Level::Info, "")).unwrap();
                    }
                })
            })
            .collect();
        for i in 0..200 {
            let text = if i % 2 == 0 { "AAAAAAAA\n" } else { "BBBBBBBB\n" };
            sink.set_formatter(Box::new(Scripted { text, range: None }));
        }
        for h in writers {
            h.join().unwrap();
        }
        for line in buffer.text().lines() {
            assert!(
                line.is_empty()
                    || line.starts_with("[")
                    || line == "AAAAAAAA"
                    || line == "BBBBBBBB",
                "mixed formatter output: {line:?}"
            );
        }
    }

    struct BrokenStream;

    impl Write for BrokenStream {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    impl TargetStream for BrokenStream {
        fn is_terminal(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_io_errors_propagate() {
        let sink: ColorSink<_> = ColorSink::new(BrokenStream, ColorMode::Always);
        let err = sink
            .write_record(&Record::new(Level::Info, "x"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(sink.flush().unwrap_err().kind(), io::ErrorKind::BrokenPipe);
        // the lock was released on the error path
        sink.set_color(Level::Info, "ok");
        assert_eq!(sink.color(Level::Info), "ok");
    }

    #[test]
    fn test_null_lock_sink_into_inner() {
        let sink: ColorSink<Vec<u8>, NullLock> = ColorSink::new(Vec::new(), ColorMode::Automatic);
        assert!(!sink.should_color());
        sink.write_record(&Record::new(Level::Error, "boom").with_name("app"))
            .unwrap();
        sink.flush().unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.ends_with("] [error] boom\n"), "{text:?}");
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_log_facade_adapter() {
        let buffer = SharedBuffer::default();
        let sink: ColorSink<_> = ColorSink::new(buffer.clone(), ColorMode::Always);
        sink.set_pattern("%n %^%l%$ %v");
        assert!(sink.enabled(&log::Metadata::builder().level(log::Level::Trace).build()));
        Log::log(
            &sink,
            &log::Record::builder()
                .args(format_args!("disk at {}%", 91))
                .level(log::Level::Warn)
                .target("app::disk")
                .build(),
        );
        Log::flush(&sink);
        assert_eq!(
            buffer.text(),
            "app::disk \x1b[33m\x1b[1mwarning\x1b[m disk at 91%\n"
        );
    }

    #[test]
    fn test_color_mode_from_str() {
        assert_eq!("Always".parse::<ColorMode>().unwrap(), ColorMode::Always);
        assert_eq!(" auto ".parse::<ColorMode>().unwrap(), ColorMode::Automatic);
        assert_eq!("off".parse::<ColorMode>().unwrap(), ColorMode::Never);
        let err = "sometimes".parse::<ColorMode>().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_from_env_defaults() {
        let sink: ColorSink<Vec<u8>> = ColorSink::from_env(Vec::new()).unwrap();
        assert_eq!(sink.color_mode(), ColorMode::Automatic);
        assert!(!sink.should_color());
    }
}
