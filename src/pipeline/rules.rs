//! Scripted rule table — exact-match canned responses.
//!
//! Second stage of the pipeline. Patterns and incoming text are uppercased,
//! and matching is exact on the full normalized input, not substring or
//! fuzzy: the table is meant for a small set of scripted greetings and FAQs,
//! not intent detection.
//!
//! The table is loaded once at startup and read-only thereafter, so
//! concurrent lookups need no locking. If reload is ever added it must build
//! a fresh table and swap it in whole.

use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

/// Immutable pattern → response table, case-insensitive by construction.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: HashMap<String, String>,
}

impl RuleTable {
    /// Empty table — every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from pattern/response pairs. Patterns are uppercased.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let rules = pairs
            .into_iter()
            .map(|(pattern, response)| (pattern.to_uppercase(), response))
            .collect();
        Self { rules }
    }

    /// Load the table from a JSON rule-definition file (a single object
    /// mapping patterns to responses).
    ///
    /// A missing or malformed file degrades to an empty table so the
    /// generative fallback stays available without rules; startup never
    /// fails here.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Rule file not readable, starting with empty table"
                );
                return Self::empty();
            }
        };

        match serde_json::from_str::<HashMap<String, String>>(&raw) {
            Ok(map) => {
                let table = Self::from_pairs(map);
                info!(path = %path.display(), rules = table.len(), "Rule table loaded");
                table
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Rule file malformed, starting with empty table"
                );
                Self::empty()
            }
        }
    }

    /// Look up the full message against the table.
    ///
    /// Exact match on the uppercased input; a message that merely contains a
    /// pattern does not match. `None` means "continue to the next stage".
    pub fn lookup(&self, text: &str) -> Option<&str> {
        self.rules.get(&text.to_uppercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
