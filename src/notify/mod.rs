use colored::Colorize;

/// User-visible notice severity, mirrored in the tag and color of the
/// printed line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

fn tag(level: Level) -> colored::ColoredString {
    match level {
        Level::Success => "OK!".bold().green(),
        Level::Info => "INF".bold().cyan(),
        Level::Warning => "WRN".bold().yellow(),
        Level::Error => "ERR".bold().red(),
    }
}

pub fn notify(level: Level, message: &str) {
    println!(
        "{}{}{} {}",
        "[".bold().white(),
        tag(level),
        "]".bold().white(),
        message
    );
}

pub fn success(message: &str) {
    notify(Level::Success, message);
}

pub fn info(message: &str) {
    notify(Level::Info, message);
}

pub fn warning(message: &str) {
    notify(Level::Warning, message);
}

pub fn error(message: &str) {
    notify(Level::Error, message);
}
