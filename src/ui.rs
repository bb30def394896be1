//! Operator-facing console output. Diagnostics go through `tracing`;
//! this is what the person running the installer reads.

use console::style;

/// Numbered step banner, e.g. `[3/8] Rendering stack`.
pub fn step(n: u32, total: u32, title: &str) {
    eprintln!();
    eprintln!(
        "{} {}",
        style(format!("[{n}/{total}]")).cyan().bold(),
        style(title).bold()
    );
}

pub fn info(msg: &str) {
    eprintln!("  {msg}");
}

pub fn success(msg: &str) {
    eprintln!("  {} {msg}", style("✓").green());
}

pub fn warn(msg: &str) {
    eprintln!("  {} {msg}", style("!").yellow().bold());
}

pub fn error(msg: &str) {
    eprintln!("{} {msg}", style("error:").red().bold());
}

/// Print a block of captured output (e.g. container logs),
/// indented and dimmed.
pub fn block(title: &str, body: &str) {
    eprintln!("  --- {title} ---");
    for line in body.lines() {
        eprintln!("  {}", style(line).dim());
    }
}
