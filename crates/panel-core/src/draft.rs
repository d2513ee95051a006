//! The composer's unsent text. Typed input replaces it; dictation appends.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftBuffer {
    text: String,
}

impl DraftBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Append a recognized phrase, separated by one space.
    pub fn append_transcript(&mut self, fragment: &str) {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return;
        }
        self.text = format!("{} {}", self.text, fragment).trim().to_string();
    }

    /// Trimmed draft, or None if there is nothing to send
    pub fn submittable(&self) -> Option<String> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}
