//! Network Module
//!
//! Client-side TCP handling.
//!
//! ## Architecture
//! - One lazily opened socket per connection
//! - Blocking I/O; only the connect is bounded by a timeout
//! - Failed sockets are dropped and reopened on the next command

mod connection;

pub use connection::{ConnState, Connection};
