//! In-memory binding fetcher

use std::sync::Arc;

use async_trait::async_trait;
use conduit_protocol::Binding;
use parking_lot::RwLock;

use crate::{BindingFetcher, Result};

/// Returns a fixed list that can be swapped at runtime
///
/// Clones share the same list, so a test can hand one clone to the agent and
/// keep another to change the desired set.
#[derive(Debug, Clone, Default)]
pub struct StaticBindingFetcher {
    bindings: Arc<RwLock<Vec<Binding>>>,
}

impl StaticBindingFetcher {
    /// Create a fetcher returning `bindings`
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self {
            bindings: Arc::new(RwLock::new(bindings)),
        }
    }

    /// Replace the list returned by subsequent fetches
    pub fn set(&self, bindings: Vec<Binding>) {
        *self.bindings.write() = bindings;
    }
}

#[async_trait]
impl BindingFetcher for StaticBindingFetcher {
    async fn fetch_bindings(&self) -> Result<Vec<Binding>> {
        Ok(self.bindings.read().clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
