//! Status lines printed after a command finishes.

use colored::Colorize;

pub fn done(message: impl AsRef<str>) -> String {
    format!("{} {}", "✓".green(), message.as_ref())
}

pub fn warning(message: impl AsRef<str>) -> String {
    format!("{} {}", "!".yellow(), message.as_ref().yellow())
}

pub fn note(message: impl AsRef<str>) -> String {
    format!("{} {}", "ℹ".blue(), message.as_ref())
}
