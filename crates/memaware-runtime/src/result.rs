//! Captured outcome of one container run.

use serde::Serialize;

/// Exit code and full output of a finished container run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    /// Exit code returned by the engine client.
    pub exit_code: i32,
    /// Standard output, untruncated.
    pub stdout: String,
    /// Standard error, untruncated.
    pub stderr: String,
}

impl RunResult {
    /// Creates a result from its parts.
    #[must_use]
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Returns stdout followed by stderr, the text assertions search.
    #[must_use]
    pub fn output(&self) -> String {
        let mut merged = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        merged.push_str(&self.stdout);
        if !self.stdout.is_empty() && !self.stdout.ends_with('\n') && !self.stderr.is_empty() {
            merged.push('\n');
        }
        merged.push_str(&self.stderr);
        merged
    }

    /// Returns the last `lines` lines of the merged output.
    #[must_use]
    pub fn tail(&self, lines: usize) -> String {
        let output = self.output();
        let all: Vec<&str> = output.lines().collect();
        let start = all.len().saturating_sub(lines);
        all[start..].join("\n")
    }
}
