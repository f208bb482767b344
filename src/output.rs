use colored::*;

/// Prefix applied to every line of tool output in the build log.
pub const INDENT: &str = "       ";

/// Stage header, e.g. `[BUILD] Installing dependencies using pip version 1.2.1`.
pub fn step(message: &str) {
    println!("{} {}", "[BUILD]".green().bold(), message);
}

pub fn info(message: &str) {
    println!("{} {}", "[INFO]".cyan(), message);
}

/// Non-fatal problem the user should fix.
pub fn warn(message: &str) {
    println!("{} {}", "[WARN]".yellow(), message);
}

pub fn done(message: &str) {
    println!("{} {}", "[DONE]".green().bold(), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}

/// Indentation filter for a single line of tool output.
pub fn indent_line(line: &str) -> String {
    format!("{INDENT}{}", line.trim_end_matches(['\r', '\n']))
}

/// Indentation filter applied to a whole block of captured output.
pub fn indent(text: &str) -> String {
    text.lines().map(indent_line).collect::<Vec<_>>().join("\n")
}

/// Print captured output through the indentation filter.
///
/// Empty output prints nothing.
pub fn print_indented(text: &str) {
    if text.trim().is_empty() {
        return;
    }
    println!("{}", indent(text));
}
