//! `.cfignore` rules applied while archiving application bits.
//!
//! One glob per line, `#` starts a comment, `!` re-includes a path excluded
//! by an earlier rule, a leading `/` anchors the pattern to the archive root.
//! The last matching rule wins.

use anyhow::{Result, bail};
use regex::Regex;

/// Rules applied before any `.cfignore` content.
pub const DEFAULT_IGNORES: &[&str] = &[
    ".cfignore",
    ".git",
    ".gitignore",
    ".hg",
    ".svn",
    "_darcs",
    ".DS_Store",
    "/manifest.yml",
];

#[derive(Debug, Clone)]
struct Rule {
    pattern: Regex,
    exclude: bool,
}

/// Compiled ignore rules.
#[derive(Debug, Clone)]
pub struct CfIgnore {
    rules: Vec<Rule>,
}

impl Default for CfIgnore {
    fn default() -> Self {
        // Default rules are literal and always compile.
        Self::parse("").unwrap_or(Self { rules: Vec::new() })
    }
}

impl CfIgnore {
    /// Compile the default rules followed by the lines of `contents`.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending line if a glob is invalid.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut rules = Vec::new();
        let lines = DEFAULT_IGNORES.iter().copied().chain(contents.lines());
        for (idx, raw) in lines.enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (exclude, line) = match line.strip_prefix('!') {
                Some(rest) => (false, rest),
                None => (true, line),
            };
            let (anchored, glob) = match line.strip_prefix('/') {
                Some(rest) => (true, rest),
                None => (false, line),
            };
            let glob = glob.trim_end_matches('/');
            if glob.is_empty() {
                continue;
            }
            let Some(body) = glob_to_regex(glob) else {
                let line_no = idx.saturating_sub(DEFAULT_IGNORES.len()) + 1;
                bail!("invalid .cfignore pattern on line {line_no}: {raw}");
            };
            // Unanchored rules match at any depth.
            let prefix = if anchored { "^" } else { "^(?:.*/)?" };
            let pattern = Regex::new(&format!("{prefix}{body}$"))?;
            rules.push(Rule { pattern, exclude });
        }
        Ok(Self { rules })
    }

    /// Whether the `/`-separated path relative to the archive root is excluded.
    #[must_use]
    pub fn should_ignore(&self, relative_path: &str) -> bool {
        let mut ignored = false;
        for rule in &self.rules {
            if rule.pattern.is_match(relative_path) {
                ignored = rule.exclude;
            }
        }
        ignored
    }
}

/// Translate a shell glob into a regex fragment. `*` and `?` never cross a
/// `/`; `**` does. Returns `None` for an unterminated character class.
fn glob_to_regex(glob: &str) -> Option<String> {
    let mut out = String::with_capacity(glob.len() * 2);
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                let mut class = String::from("[");
                if matches!(chars.peek(), Some('!' | '^')) {
                    chars.next();
                    class.push('^');
                }
                let mut closed = false;
                let mut first = true;
                for inner in chars.by_ref() {
                    if inner == ']' && !first {
                        closed = true;
                        break;
                    }
                    first = false;
                    match inner {
                        '\\' | '[' | ']' | '&' | '~' => {
                            class.push('\\');
                            class.push(inner);
                        }
                        _ => class.push(inner),
                    }
                }
                if !closed {
                    return None;
                }
                class.push(']');
                out.push_str(&class);
            }
            _ => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    Some(out)
}
