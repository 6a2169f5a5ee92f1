//! Console output.
//!
//! Results go to stdout, status and diagnostics to stderr.

use crossterm::style::Stylize;

#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Print a section header, e.g. a container name.
    pub fn section(&self, title: &str) {
        println!("{}", title.bold());
    }

    /// Print one line of a result listing.
    pub fn row(&self, line: &str) {
        println!("  {line}");
    }

    pub fn info(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{} {msg}", "•".dark_grey());
        }
    }

    pub fn success(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{} {msg}", "✓".green());
        }
    }

    pub fn warning(&self, msg: &str) {
        eprintln!("{} {msg}", "!".yellow());
    }

    pub fn error(&self, msg: &str) {
        eprintln!("{} {msg}", "✗".red());
    }
}
