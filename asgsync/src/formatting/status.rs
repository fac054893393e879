//! Status lines: a colored symbol followed by the message.

use asgsync_core::Tone;
use owo_colors::OwoColorize;

/// How a status line is marked and colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
}

impl Status {
    /// Status for a message raised while completing the config file.
    ///
    /// Plain informational text carries no status and is printed as is.
    pub fn for_tone(tone: Tone) -> Option<Self> {
        match tone {
            Tone::Info => None,
            Tone::Question => Some(Status::Info),
            Tone::Success => Some(Status::Success),
            Tone::Failure => Some(Status::Error),
        }
    }

    /// Returns the symbol for this status.
    pub fn symbol(&self) -> &'static str {
        match self {
            Status::Success => "✓",
            Status::Error => "✗",
            Status::Warning => "⚠",
            Status::Info => "→",
        }
    }

    /// Formats a status message with symbol and color.
    pub fn format(&self, message: &str) -> String {
        let (symbol, text) = match self {
            Status::Success => (self.symbol().green().to_string(), message.green().bold().to_string()),
            Status::Error => (self.symbol().red().to_string(), message.red().bold().to_string()),
            Status::Warning => (self.symbol().yellow().to_string(), message.yellow().bold().to_string()),
            Status::Info => (self.symbol().cyan().to_string(), message.cyan().to_string()),
        };
        format!("{} {}", symbol, text)
    }
}

/// Prints an indented status line. Errors go to stderr.
pub fn print_status(status: Status, message: &str) {
    let line = format!("  {}", status.format(message));
    match status {
        Status::Error => eprintln!("{}", line),
        _ => println!("{}", line),
    }
}

/// Prints a console message in the style of its tone.
pub fn print_tone(tone: Tone, message: &str) {
    match Status::for_tone(tone) {
        Some(status) => print_status(status, message),
        None => println!("{}", message),
    }
}

/// Prints a success message.
pub fn print_success(message: &str) {
    print_status(Status::Success, message);
}

/// Prints a warning message.
pub fn print_warning(message: &str) {
    print_status(Status::Warning, message);
}
