//! Conduit - Binding discovery
//!
//! A binding pairs an application with a downstream drain. The agent polls a
//! [`BindingFetcher`] and reconciles its consumers against whatever the most
//! recent call returned.
//!
//! # Available Fetchers
//!
//! - **File** - `[[bindings]]` tables in a TOML file
//! - **Ingress ports** - one sub-directory per local downstream agent, each
//!   advertising its ingress port in `ingress_port.toml`
//! - **Static** - in-memory list, replaceable at runtime
//!
//! Fetchers report "no bindings" as an empty list. Errors are transient: the
//! caller keeps its previous set and retries on the next poll.

mod error;
mod file;
mod ports;
mod static_fetcher;

use async_trait::async_trait;
use conduit_protocol::Binding;

pub use error::{BindingError, Result};
pub use file::FileBindingFetcher;
pub use ports::{IngressPortFetcher, DEFAULT_HOSTNAME, PORT_FILE_NAME};
pub use static_fetcher::StaticBindingFetcher;

/// Source of the desired binding set
///
/// Implementations must be safe to call repeatedly and concurrently.
#[async_trait]
pub trait BindingFetcher: Send + Sync {
    /// Fetch the current desired bindings
    ///
    /// # Errors
    ///
    /// Returns `BindingError` when the backing store cannot be read or parsed.
    async fn fetch_bindings(&self) -> Result<Vec<Binding>>;

    /// Fetcher name for logging
    fn name(&self) -> &'static str;
}
