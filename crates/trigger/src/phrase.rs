//! Whole-token trigger phrase matching.

use forgehand_core::{Error, Result};
use regex_lite::Regex;

/// Matches a literal phrase that stands on its own in free text.
///
/// The phrase must start the text or follow whitespace, and must end the
/// text or be followed by whitespace or `. , ! ? ; :`. So `@claude,` matches
/// while `@claudebot` and `email@claude` do not.
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    phrase: String,
    pattern: Option<Regex>,
}

impl PhraseMatcher {
    pub fn new(phrase: &str) -> Result<Self> {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            return Ok(Self {
                phrase: String::new(),
                pattern: None,
            });
        }

        let source = format!(r"(^|\s){}([\s.,!?;:]|$)", regex_lite::escape(phrase));
        let pattern = Regex::new(&source)
            .map_err(|e| Error::config(format!("invalid trigger phrase '{phrase}': {e}")))?;

        Ok(Self {
            phrase: phrase.to_string(),
            pattern: Some(pattern),
        })
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// An empty phrase never matches.
    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(text))
    }
}
