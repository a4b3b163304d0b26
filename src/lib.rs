//! # cachewire
//!
//! A synchronous client for memcached-compatible cache servers with:
//! - The fixed binary wire protocol (24-byte headers, CAS tokens)
//! - A self-describing value codec for booleans, 64-bit integers and
//!   floats, byte strings, and nested tables
//! - Back-references in the codec, so shared and cyclic structures
//!   round-trip with identity preserved
//! - Lazy connect and reconnect-on-next-command after socket failures
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Client                             │
//! │     get / set / add / replace / increment / decrement /     │
//! │                   flush / stats / close                     │
//! └──────────────┬───────────────────────────────┬──────────────┘
//!                │                               │
//! ┌──────────────▼──────────────┐ ┌──────────────▼──────────────┐
//! │            Codec            │ │          Protocol           │
//! │    Value graph <-> bytes    │ │    24-byte binary framing   │
//! │      (back-references)      │ │     opcodes + statuses      │
//! └──────────────┬──────────────┘ └──────────────┬──────────────┘
//!                │                               │
//! ┌──────────────▼──────────────┐ ┌──────────────▼──────────────┐
//! │           Buffer            │ │         Connection          │
//! │   growable, bounds-checked  │ │   lazy TCP with reconnect   │
//! └─────────────────────────────┘ └─────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use cachewire::{Client, ClientConfig, Value};
//!
//! fn main() -> cachewire::Result<()> {
//!     let mut client = Client::open(ClientConfig::default())?;
//!     client.set(b"greeting", Some(&Value::from("hello")), 0, 0)?;
//!     if let Some((value, cas)) = client.get(b"greeting")? {
//!         println!("{:?} (cas {})", value, cas);
//!     }
//!     Ok(())
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod buffer;
pub mod codec;
pub mod network;
pub mod protocol;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use buffer::Buffer;
pub use client::Client;
pub use codec::{decode, decode_slice, encode, DecodeFn, EncodeFn, Table, Value};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{CacheError, Result};
pub use network::ConnState;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of cachewire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
