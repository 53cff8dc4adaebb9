//! Stylesheet for terminal output, applied with owo-colors.

use owo_colors::Style;

/// One style per kind of line the CLI prints. All plain until
/// [`Styles::colorize`] is called.
#[derive(Default, Clone)]
pub struct Styles {
    /// Completed actions (green).
    pub success: Style,
    /// Recoverable problems, e.g. a build still running at the timeout (yellow).
    pub warning: Style,
    /// Defaults the CLI chose on the user's behalf (blue).
    pub notice: Style,
    /// Labels of `key value` lines.
    pub key: Style,
    /// Table headings.
    pub heading: Style,
}

impl Styles {
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.notice = Style::new().blue();
        self.key = Style::new().dimmed();
        self.heading = Style::new().bold();
    }
}
