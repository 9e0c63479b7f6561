//! Canonical name allocation.
//!
//! Every declaration the session pulls in is emitted under a session-unique
//! canonical name. Root requests and entry-file locals keep their original
//! spelling when it is still free; everything else gets a prefixed synthetic
//! name, numbered on collision. Enums are always numbered even on first use
//! because their name may also appear in value position.

use std::collections::{HashMap, HashSet};

/// Prefix of synthesized canonical names.
pub const CANONICAL_PREFIX: &str = "_ITA_";

/// Allocator for session-unique type names.
#[derive(Debug, Default)]
pub struct CanonicalNames {
    used: HashSet<String>,
    counters: HashMap<String, usize>,
}

impl CanonicalNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name` verbatim. Returns `None` when it is already taken.
    pub fn claim(&mut self, name: &str) -> Option<String> {
        if self.used.contains(name) {
            return None;
        }
        self.used.insert(name.to_string());
        Some(name.to_string())
    }

    /// Allocate a prefixed name derived from `name`. The bare prefixed form
    /// is used when free unless `always_number` forces a numbered suffix;
    /// numbering counts per base name from zero.
    pub fn synthesize(&mut self, name: &str, always_number: bool) -> String {
        let base = format!("{CANONICAL_PREFIX}{name}");
        if !always_number && !self.used.contains(&base) {
            self.used.insert(base.clone());
            return base;
        }
        let counter = self.counters.entry(base.clone()).or_insert(0);
        loop {
            let candidate = format!("{base}{counter}");
            *counter += 1;
            if !self.used.contains(&candidate) {
                self.used.insert(candidate.clone());
                return candidate;
            }
        }
    }

}
