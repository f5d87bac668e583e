//! Status message functions for terminal output.

use owo_colors::OwoColorize;

/// Print a success message to stderr.
pub fn success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Print an info message to stderr.
pub fn info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Print an error message to stderr.
///
/// Multi-line messages (compiler output) are printed verbatim after the
/// marker line so they stay copy-pasteable.
pub fn error(message: &str) {
    match message.split_once('\n') {
        Some((first, rest)) => {
            eprintln!("{} {}", "✗".red().bold(), first.red());
            eprintln!("{}", rest.trim_end());
        }
        None => eprintln!("{} {}", "✗".red().bold(), message.red()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages() {
        success("Build complete");
        info("Watching 3 paths");
        warning("Not in a module");
        error("Compilation failed\n./main.go:3:1: syntax error");
    }
}
