//! Structural tests for layer boundary enforcement.
//!
//! These tests scan source files to verify that the domain, application and
//! infrastructure layers only depend inward.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

fn src_dir(parts: &[&str]) -> PathBuf {
    let mut dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    for part in parts {
        dir = dir.join(part);
    }
    dir
}

fn relative(file: &Path) -> String {
    file.strip_prefix(env!("CARGO_MANIFEST_DIR"))
        .unwrap_or(file)
        .display()
        .to_string()
}

/// Track brace depth and return whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    /// Process a line and return `true` if it's inside a `#[cfg(test)]` block.
    fn process_line(&mut self, line: &str) -> bool {
        if line.trim().contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

/// Non-comment lines outside `#[cfg(test)]` blocks, with 1-based line numbers.
fn production_lines(path: &Path) -> Vec<(usize, String)> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let mut tracker = CfgTestTracker::new();
    content
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            let comment =
                trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*');
            (!in_test && !comment).then(|| (i + 1, line.to_string()))
        })
        .collect()
}

/// Every production line in `dir` containing one of `needles`.
fn find_in(dir: &Path, needles: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for file in collect_rs_files(dir) {
        let rel = relative(&file);
        for (lineno, line) in production_lines(&file) {
            for needle in needles {
                if line.contains(needle) {
                    violations.push(format!("{rel}:{lineno}: `{needle}`: {}", line.trim()));
                }
            }
        }
    }
    violations
}

#[test]
fn domain_is_pure() {
    let violations = find_in(
        &src_dir(&["domain"]),
        &[
            "crate::infra",
            "crate::application",
            "crate::commands",
            "crate::output",
            "tokio",
            "std::fs",
            "std::process",
            "std::net",
        ],
    );
    assert!(
        violations.is_empty(),
        "domain/ must stay free of I/O and outer layers:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_depends_only_on_domain() {
    let violations = find_in(
        &src_dir(&["application"]),
        &["crate::infra", "crate::commands", "crate::output"],
    );
    assert!(
        violations.is_empty(),
        "application/ must not import from infra/, commands/ or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let violations = find_in(&src_dir(&["infra"]), &["crate::commands", "crate::output"]);
    assert!(
        violations.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_print_macros_outside_tests() {
    let violations = find_in(&src_dir(&["infra"]), &["println!", "eprintln!"]);
    assert!(
        violations.is_empty(),
        "infra/ must not use println!/eprintln! outside #[cfg(test)]:\n{}",
        violations.join("\n")
    );
}

#[test]
fn services_take_trait_bounds_not_adapters() {
    let adapters = [
        "DavBlobStore",
        "S3BlobStore",
        "AnyBlobStore",
        "ReceptorClient",
        "HttpProxyConfReader",
        "ZipArchiver",
        "SystemClock",
    ];
    let violations = find_in(&src_dir(&["application", "services"]), &adapters);
    assert!(
        violations.is_empty(),
        "application services must use port traits instead of concrete adapters:\n{}",
        violations.join("\n")
    );
}

/// Command handlers receive the unified `AppContext`.
#[test]
fn command_handlers_accept_app_context() {
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir(&["commands"])) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        if content.contains("pub async fn run(") && !content.contains("app: &AppContext") {
            violations.push(relative(&file));
        }
    }
    assert!(
        violations.is_empty(),
        "command handlers must take `app: &AppContext`:\n{}",
        violations.join("\n")
    );
}
