use std::{
    env, fs,
    io::{self, IsTerminal, Write},
};

/// A stream a sink can write to and ask about its terminal status.
pub trait TargetStream: Write {
    fn is_terminal(&self) -> bool;
}

impl TargetStream for io::Stdout {
    fn is_terminal(&self) -> bool {
        IsTerminal::is_terminal(self)
    }
}

impl TargetStream for io::Stderr {
    fn is_terminal(&self) -> bool {
        IsTerminal::is_terminal(self)
    }
}

impl TargetStream for fs::File {
    fn is_terminal(&self) -> bool {
        IsTerminal::is_terminal(self)
    }
}

impl TargetStream for Vec<u8> {
    fn is_terminal(&self) -> bool {
        false
    }
}

/// Decides whether a stream should receive ANSI color codes.
pub trait TerminalProbe: Send + Sync {
    fn is_color_terminal(&self, stream: &dyn TargetStream) -> bool;
}

/// Answers from the stream's tty status and the `TERM`, `COLORTERM` and
/// `NO_COLOR` environment variables. Missing information means no color.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvProbe;

const COLOR_TERMS: [&str; 16] = [
    "ansi", "color", "console", "cygwin", "gnome", "konsole", "kterm", "linux", "msys", "putty",
    "rxvt", "screen", "vt100", "xterm", "alacritty", "vt102",
];

impl EnvProbe {
    /// Whether the environment describes a terminal that understands ANSI colors.
    pub fn color_term() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var_os("COLORTERM").is_some() {
            return true;
        }
        let Ok(term) = env::var("TERM") else {
            return false;
        };
        COLOR_TERMS.iter().any(|name| term.contains(name))
    }
}

impl TerminalProbe for EnvProbe {
    fn is_color_terminal(&self, stream: &dyn TargetStream) -> bool {
        stream.is_terminal() && Self::color_term()
    }
}

#[test]
fn test_env_probe_rejects_non_terminals() {
    assert!(!EnvProbe.is_color_terminal(&Vec::<u8>::new()));
    let file = fs::File::create("/tmp/termsink_probe_test.log").unwrap();
    assert!(!EnvProbe.is_color_terminal(&file));
}
