//! Tagger - static tags and legacy tag migration
//!
//! Fills the envelope's unified `tags` map from two sources, never
//! overwriting a key that is already present:
//!
//! 1. static tags configured at construction
//! 2. `deprecated_tags`, rendered to strings
//!
//! Precedence on collision is therefore: existing tags > static tags >
//! migrated deprecated tags.

use std::collections::HashMap;

use conduit_protocol::Envelope;

use crate::{Processor, TransformError, TransformResult};

#[cfg(test)]
#[path = "tagger_test.rs"]
mod tests;

/// Applies static tags and migrates deprecated tags into `tags`
#[derive(Debug, Clone, Default)]
pub struct Tagger {
    /// Tags added to every envelope unless already present
    tags: HashMap<String, String>,
}

impl Tagger {
    /// Create a tagger with the given static tags
    pub fn new(tags: HashMap<String, String>) -> Self {
        Self { tags }
    }

    /// Create a tagger, rejecting empty tag names
    pub fn try_new(tags: HashMap<String, String>) -> TransformResult<Self> {
        if tags.keys().any(|k| k.is_empty()) {
            return Err(TransformError::config("static tag names must not be empty"));
        }
        Ok(Self::new(tags))
    }

    /// Static tags applied by this tagger
    #[inline]
    pub fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }
}

impl Processor for Tagger {
    fn process(&self, envelope: &mut Envelope) -> TransformResult<()> {
        for (key, value) in &self.tags {
            if !envelope.tags.contains_key(key) {
                envelope.tags.insert(key.clone(), value.clone());
            }
        }

        for (key, value) in &envelope.deprecated_tags {
            if !envelope.tags.contains_key(key) {
                envelope.tags.insert(key.clone(), value.render());
            }
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "tagger"
    }
}
