//! Terminal output. Results go to stdout, diagnostics to stderr.

use console::style;

pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

pub fn info(message: &str) {
    eprintln!("{} {}", style("→").blue(), message);
}

/// Bold section title
pub fn header(text: &str) -> String {
    style(text).bold().to_string()
}

/// Indented `key: value` line with a dimmed key
pub fn key_value(key: &str, value: &str) -> String {
    format!("  {}: {}", style(key).dim(), value)
}

/// Print a value as pretty JSON
pub fn json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
