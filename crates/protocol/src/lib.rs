//! Conduit Protocol - Core types shared by every stage of the forwarder
//!
//! This crate provides the data that flows through the agent:
//! - `Envelope` - One observability event (log, counter or gauge)
//! - `Payload` - Explicit sum type over the envelope variants
//! - `Value` - Legacy typed tag value (text, integer, decimal)
//! - `Binding` - One downstream routing target discovered at runtime
//! - `DrainUrl` - Parsed connection target of a binding
//! - `FrameDecoder` / `encode_frame` / `encode_frames` - Length-prefixed batch framing
//!
//! # Wire Format
//!
//! Ingress and egress use the same framing, so the agent is both a server and
//! a client of one protocol:
//!
//! ```text
//! [4 bytes: length (big-endian)][N bytes: JSON EnvelopeBatch]
//! ```
//!
//! # Design Principles
//!
//! - **Mutate in place**: processors take `&mut Envelope`, no re-allocation per hop
//! - **Arc-friendly**: envelopes are wrapped in `Arc` once for multi-consumer fan-out
//! - **No unset payloads**: `Payload` is an enum, exactly one variant is populated

mod binding;
mod codec;
mod envelope;
mod error;

pub use binding::{Binding, DrainUrl};
pub use codec::{EncodedFrames, EnvelopeBatch, FrameDecoder, encode_frame, encode_frames};
pub use envelope::{Counter, Envelope, Gauge, GaugeValue, Log, LogType, Payload, Value};
pub use error::ProtocolError;

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Maximum frame body size (16MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Length prefix size (4 bytes, big-endian u32)
pub const LENGTH_PREFIX_SIZE: usize = 4;
