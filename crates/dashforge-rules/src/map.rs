//! Recording-rule deduplication map.
//!
//! Queries registered while a dashboard is built are keyed by a SHA-256
//! digest of their whitespace-normalized text. The first name registered for
//! an expression wins; later registrations of the same expression resolve
//! to that name.

use crate::document::{RecordingRule, RuleGroup, RuleGroups};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Content digest of a normalized expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleDigest([u8; 32]);

impl RuleDigest {
    /// Digest of an already normalized expression.
    pub fn of(normalized: &str) -> Self {
        Self(Sha256::digest(normalized.as_bytes()).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for RuleDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Collapse every run of whitespace (space, tab, newline, CR, form feed) to a
/// single space. Idempotent; leading and trailing runs are kept as one space.
pub fn normalize_expr(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut in_space = false;
    for c in expr.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Deduplicating store of recording rules for one build session.
#[derive(Debug, Default)]
pub struct RecordingMap {
    rules: HashMap<RuleDigest, RecordingRule>,
    /// First digest registered under each name.
    names: HashMap<String, RuleDigest>,
    /// Render raw queries instead of recorded names.
    debug: bool,
    aliases: usize,
}

impl RecordingMap {
    /// Create an empty map. With `debug` set, panels show the raw queries
    /// instead of the recorded rule names.
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            ..Self::default()
        }
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Register `expr` under `name` and return its digest.
    ///
    /// An expression that is already recorded keeps its original name.
    pub fn register(&mut self, name: &str, expr: &str) -> RuleDigest {
        let normalized = normalize_expr(expr);
        let digest = RuleDigest::of(&normalized);

        if let Some(existing) = self.rules.get(&digest) {
            if existing.name != name {
                self.aliases += 1;
                info!(
                    existing = %existing.name,
                    requested = %name,
                    "Same expression already recorded, reusing existing rule"
                );
            }
            return digest;
        }

        match self.names.get(name) {
            Some(other) if *other != digest => {
                warn!(
                    rule = %name,
                    "Rule name already used for a different expression; rule file will contain duplicate records"
                );
            }
            Some(_) => {}
            None => {
                self.names.insert(name.to_string(), digest);
            }
        }

        debug!(rule = %name, digest = %digest, "Recorded expression");
        self.rules.insert(
            digest,
            RecordingRule {
                name: name.to_string(),
                expr: normalized,
            },
        );
        digest
    }

    /// Register without keeping the digest.
    pub fn append_rule(&mut self, name: &str, expr: &str) {
        self.register(name, expr);
    }

    /// Name of the rule recorded under `digest`.
    ///
    /// # Panics
    /// Panics if `digest` was not returned by [`RecordingMap::register`] on
    /// this map.
    pub fn resolve(&self, digest: &RuleDigest) -> &str {
        match self.rules.get(digest) {
            Some(rule) => &rule.name,
            None => panic!("digest {digest} was not registered in this recording map"),
        }
    }

    pub fn get(&self, digest: &RuleDigest) -> Option<&RecordingRule> {
        self.rules.get(digest)
    }

    /// Number of distinct recorded expressions.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Registrations that were folded into an existing rule under another name.
    pub fn alias_count(&self) -> usize {
        self.aliases
    }

    /// All rules sorted by name, then expression.
    pub fn rules(&self) -> Vec<&RecordingRule> {
        let mut rules: Vec<_> = self.rules.values().collect();
        rules.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.expr.cmp(&b.expr)));
        rules
    }

    /// Single-group rule document holding every recorded rule.
    pub fn to_rule_group(&self, group_name: &str) -> RuleGroups {
        RuleGroups {
            groups: vec![RuleGroup {
                name: group_name.to_string(),
                interval: None,
                rules: self.rules().into_iter().cloned().collect(),
            }],
        }
    }
}
