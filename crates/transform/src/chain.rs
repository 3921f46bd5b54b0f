//! Processor Chain - Sequential envelope processing
//!
//! The `Chain` applies multiple processors in sequence to every envelope
//! before it reaches the fan-out writer.
//!
//! # Design
//!
//! - **Zero-cost when empty**: Empty chain is a no-op with no overhead
//! - **Sequential execution**: Processors run in order on the same envelope
//! - **Fail-fast**: First error stops the chain and the envelope is dropped

use crate::{Processor, TransformResult};
use conduit_protocol::Envelope;

#[cfg(test)]
#[path = "chain_test.rs"]
mod tests;

/// Chain of processors applied sequentially
///
/// Processors are applied in the order they were added.
/// If any processor returns an error, the chain stops and
/// returns that error.
pub struct Chain {
    /// Ordered list of processors
    processors: Vec<Box<dyn Processor>>,

    /// Whether any processors are active
    enabled: bool,
}

impl Chain {
    /// Create a new processor chain
    ///
    /// Only enabled processors are included in the chain.
    pub fn new(processors: Vec<Box<dyn Processor>>) -> Self {
        let active: Vec<_> = processors.into_iter().filter(|p| p.enabled()).collect();
        let enabled = !active.is_empty();

        Self {
            processors: active,
            enabled,
        }
    }

    /// Create an empty chain (no-op)
    pub fn empty() -> Self {
        Self {
            processors: Vec::new(),
            enabled: false,
        }
    }

    /// Check if the chain has any active processors
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get the number of active processors
    #[inline]
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Check if the chain is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Get the names of all active processors
    pub fn names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Run the envelope through all processors in sequence
    ///
    /// If no processors are enabled, this returns immediately.
    pub fn process(&self, envelope: &mut Envelope) -> TransformResult<()> {
        if !self.enabled {
            return Ok(());
        }

        for processor in &self.processors {
            processor.process(envelope)?;
        }

        Ok(())
    }

    /// Get a processor by name
    pub fn get(&self, name: &str) -> Option<&dyn Processor> {
        self.processors
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("processors", &self.names())
            .finish()
    }
}
