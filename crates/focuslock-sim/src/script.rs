//! Observation script parser.
//!
//! One directive per line. `#` starts a comment; blank lines are skipped.
//!
//! ```text
//! grant overlay_draw          # grant|revoke|unknown <capability>
//! lock                        # lock|unlock
//! foreground org.example.app  # the user switches apps
//! window content org.example  # window <state|content|N> [package]
//! key back                    # key <back|home|app_switch|N> [down|up|multiple|N]
//! mode pinned                 # mode <none|pinned|locked>
//! permissions                 # bare permission-change notice
//! shade                       # the user opens the notification shade
//! fail 2                      # fail the next n platform calls
//! command showOverlay         # run a host command
//! ```

use focuslock_app::{Command, CommandError};
use focuslock_core::{
    Capability, LockTaskMode, ProbeStatus, RawObservation,
    error::ParseCapabilityError,
    observation::{
        ACTION_DOWN, ACTION_MULTIPLE, ACTION_UP, KEYCODE_APP_SWITCH, KEYCODE_BACK, KEYCODE_HOME,
        TYPE_WINDOW_CONTENT_CHANGED, TYPE_WINDOW_STATE_CHANGED,
    },
};
use thiserror::Error;

/// One parsed directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Engage the lock.
    Lock,
    /// Release the lock.
    Unlock,
    /// Change a capability status on the device.
    Status(Capability, ProbeStatus),
    /// The user brings a package to the foreground.
    Launch(String),
    /// Deliver a raw observation as-is.
    Observe(RawObservation),
    /// Open the notification shade.
    Shade,
    /// Fail the next n platform calls.
    Fail(u32),
    /// Dispatch a host command.
    Command(Command),
}

/// A directive and the line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number.
    pub number: usize,
    /// Parsed directive.
    pub directive: Directive,
}

/// Script parse errors. Every variant carries the offending line number.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// First word is not a directive.
    #[error("line {line}: unknown directive `{word}`")]
    UnknownDirective {
        /// Line number.
        line: usize,
        /// Offending word.
        word: String,
    },

    /// A required argument is missing.
    #[error("line {line}: `{directive}` expects {expected}")]
    MissingArgument {
        /// Line number.
        line: usize,
        /// Directive name.
        directive: String,
        /// What was expected.
        expected: &'static str,
    },

    /// More arguments than the directive takes.
    #[error("line {line}: unexpected `{extra}`")]
    TrailingInput {
        /// Line number.
        line: usize,
        /// First unexpected token.
        extra: String,
    },

    /// Argument could not be interpreted.
    #[error("line {line}: invalid {what} `{value}`")]
    InvalidValue {
        /// Line number.
        line: usize,
        /// Kind of value.
        what: &'static str,
        /// Offending token.
        value: String,
    },

    /// Unknown capability name.
    #[error("line {line}: {source}")]
    Capability {
        /// Line number.
        line: usize,
        /// Parse failure.
        source: ParseCapabilityError,
    },

    /// Unknown command method.
    #[error("line {line}: {source}")]
    Command {
        /// Line number.
        line: usize,
        /// Parse failure.
        source: CommandError,
    },
}

/// Parse a whole script.
pub fn parse(source: &str) -> Result<Vec<Line>, ScriptError> {
    let mut lines = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let number = index + 1;
        let text = raw.split('#').next().unwrap_or_default().trim();
        if text.is_empty() {
            continue;
        }
        let directive = parse_line(number, text)?;
        lines.push(Line { number, directive });
    }
    Ok(lines)
}

struct Tokens<'a> {
    line: usize,
    directive: &'a str,
    words: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn required(&mut self, expected: &'static str) -> Result<&'a str, ScriptError> {
        self.words.next().ok_or(ScriptError::MissingArgument {
            line: self.line,
            directive: self.directive.to_string(),
            expected,
        })
    }

    fn optional(&mut self) -> Option<&'a str> {
        self.words.next()
    }

    fn finish<T>(mut self, value: T) -> Result<T, ScriptError> {
        match self.words.next() {
            Some(extra) => Err(ScriptError::TrailingInput { line: self.line, extra: extra.into() }),
            None => Ok(value),
        }
    }

    fn invalid(&self, what: &'static str, value: &str) -> ScriptError {
        ScriptError::InvalidValue { line: self.line, what, value: value.to_string() }
    }
}

fn parse_line(line: usize, text: &str) -> Result<Directive, ScriptError> {
    let mut words = text.split_whitespace();
    let directive = words.next().unwrap_or_default();
    let mut tokens = Tokens { line, directive, words };

    match directive {
        "lock" => tokens.finish(Directive::Lock),
        "unlock" => tokens.finish(Directive::Unlock),
        "permissions" => tokens.finish(Directive::Observe(RawObservation::PermissionsChanged)),
        "shade" => tokens.finish(Directive::Shade),

        "grant" | "revoke" | "unknown" => {
            let status = match directive {
                "grant" => ProbeStatus::Granted,
                "revoke" => ProbeStatus::Denied,
                _ => ProbeStatus::Unknown,
            };
            let name = tokens.required("a capability")?;
            let capability = name
                .parse::<Capability>()
                .map_err(|source| ScriptError::Capability { line, source })?;
            tokens.finish(Directive::Status(capability, status))
        },

        "foreground" => {
            let package = tokens.required("a package")?;
            tokens.finish(Directive::Launch(package.to_string()))
        },

        "window" => {
            let kind = tokens.required("an event type")?;
            let event_type = match kind {
                "state" => TYPE_WINDOW_STATE_CHANGED,
                "content" => TYPE_WINDOW_CONTENT_CHANGED,
                raw => raw.parse::<u32>().map_err(|_| tokens.invalid("event type", raw))?,
            };
            let package = tokens.optional().map(str::to_string);
            tokens.finish(Directive::Observe(RawObservation::Accessibility { event_type, package }))
        },

        "key" => {
            let key = tokens.required("a key")?;
            let key_code = match key {
                "back" => KEYCODE_BACK,
                "home" => KEYCODE_HOME,
                "app_switch" => KEYCODE_APP_SWITCH,
                raw => raw.parse::<i32>().map_err(|_| tokens.invalid("key", raw))?,
            };
            let action = match tokens.optional() {
                None | Some("down") => ACTION_DOWN,
                Some("up") => ACTION_UP,
                Some("multiple") => ACTION_MULTIPLE,
                Some(raw) => raw.parse::<i32>().map_err(|_| tokens.invalid("key action", raw))?,
            };
            tokens.finish(Directive::Observe(RawObservation::Key { key_code, action }))
        },

        "mode" => {
            let raw = tokens.required("none, pinned or locked")?;
            let mode = match raw {
                "none" => LockTaskMode::None,
                "pinned" => LockTaskMode::Pinned,
                "locked" => LockTaskMode::Locked,
                other => return Err(tokens.invalid("lock task mode", other)),
            };
            tokens.finish(Directive::Observe(RawObservation::LockTaskModeChanged { mode }))
        },

        "fail" => {
            let raw = tokens.required("a count")?;
            let n = raw.parse::<u32>().map_err(|_| tokens.invalid("count", raw))?;
            tokens.finish(Directive::Fail(n))
        },

        "command" => {
            let method = tokens.required("a method name")?;
            let command = method
                .parse::<Command>()
                .map_err(|source| ScriptError::Command { line, source })?;
            tokens.finish(Directive::Command(command))
        },

        other => Err(ScriptError::UnknownDirective { line, word: other.to_string() }),
    }
}
