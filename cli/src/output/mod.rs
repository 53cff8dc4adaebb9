//! Terminal output: styled status lines, key/value pairs, tables and spinners.
//!
//! Everything here writes to stdout and is silenced by `--quiet`. Errors are
//! not printed here; they propagate to `main`.

pub mod progress;
pub mod reporter;
pub mod styles;
pub mod table;

use console::Term;
use owo_colors::OwoColorize as _;
pub use reporter::TerminalReporter;
pub use styles::Styles;

/// Where and how to print.
pub struct OutputContext {
    pub styles: Styles,
    /// Whether stdout is a terminal; spinners are only drawn on one.
    pub is_tty: bool,
    pub quiet: bool,
}

impl OutputContext {
    /// Colors are used only on a terminal, and never with `--no-color` or
    /// `NO_COLOR` set.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let mut styles = Styles::default();
        if !no_color && is_tty && std::env::var_os("NO_COLOR").is_none() {
            styles.colorize();
        }
        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    pub fn line(&self, msg: &str) {
        if !self.quiet {
            println!("{msg}");
        }
    }

    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.style(self.styles.success));
        }
    }

    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.style(self.styles.warning));
        }
    }

    /// A default the CLI picked because the user left something out.
    pub fn notice(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.style(self.styles.notice));
        }
    }

    /// `key<TAB>value`, with the key styled.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("{}\t{value}", key.style(self.styles.key));
        }
    }

    /// Print an aligned table with a styled heading row.
    pub fn table<const N: usize>(&self, heading: [&str; N], rows: &[[String; N]]) {
        if self.quiet {
            return;
        }
        let mut lines = table::render(heading, rows).into_iter();
        if let Some(first) = lines.next() {
            println!("{}", first.style(self.styles.heading));
        }
        for line in lines {
            println!("{line}");
        }
    }
}
