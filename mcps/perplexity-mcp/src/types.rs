//! Search request and result types

use serde::{Deserialize, Serialize};

/// One search call's input
///
/// `model` and `system_message` fall back to the configured defaults when
/// absent or blank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub keyword: String,
    pub model: Option<String>,
    pub system_message: Option<String>,
}

impl SearchRequest {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = Some(system_message.into());
        self
    }
}

/// Normalized answer from the search API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Text of the first completion choice
    pub answer: String,
    /// Citation URLs exactly as returned: same order, duplicates kept
    pub citations: Vec<String>,
    /// Model name that was sent upstream
    pub model: String,
}

impl SearchResult {
    /// Answer followed by a numbered citation list
    ///
    /// ```text
    /// <answer>
    ///
    /// Citations:
    /// [1] https://a.example
    /// [2] https://b.example
    /// ```
    pub fn render(&self) -> String {
        if self.citations.is_empty() {
            return self.answer.clone();
        }

        let mut text = self.answer.clone();
        text.push_str("\n\nCitations:\n");
        for (index, url) in self.citations.iter().enumerate() {
            text.push_str(&format!("[{}] {}\n", index + 1, url));
        }
        text
    }
}
