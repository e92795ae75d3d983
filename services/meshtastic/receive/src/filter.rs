//! Include/exclude substring filter over a flattened message.

use serde::{Deserialize, Serialize};

/// Comma separated include and exclude substrings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

fn split_terms(terms: Option<&str>) -> Vec<String> {
    terms
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

impl MessageFilter {
    /// Parse `"a, b"` style lists; `None` or empty means no constraint
    pub fn parse(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include: split_terms(include),
            exclude: split_terms(exclude),
        }
    }

    /// Include terms
    pub fn include(&self) -> &[String] {
        &self.include
    }

    /// Exclude terms
    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    /// No exclude term occurs and every include term does
    pub fn matches(&self, flat: &str) -> bool {
        self.exclude.iter().all(|term| !flat.contains(term.as_str()))
            && self.include.iter().all(|term| flat.contains(term.as_str()))
    }
}
