use chrono::Local;
use serde::Serialize;

/// Append-only operations log shown to the user. Cleared only on reset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OpsLog {
    lines: Vec<String>,
}

impl OpsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl AsRef<str>) {
        let stamp = Local::now().format("%H:%M:%S");
        self.lines.push(format!("[{stamp}] {}", line.as_ref()));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines appended after the first `seen`.
    pub fn since(&self, seen: usize) -> &[String] {
        &self.lines[seen.min(self.lines.len())..]
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Count of lines whose message (after the timestamp) equals `message`.
    pub fn count(&self, message: &str) -> usize {
        self.lines
            .iter()
            .filter(|line| line.split_once("] ").map(|(_, msg)| msg) == Some(message))
            .count()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
