//! Client configuration
//!
//! Centralized configuration with sensible defaults.

use crate::codec;
use crate::codec::{DecodeFn, EncodeFn};

/// Configuration for a cache client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Server host name or address
    pub host: String,

    /// Server port. Must be numeric; service names are not resolved.
    pub port: String,

    /// Connect timeout in milliseconds (must be > 0)
    pub timeout_ms: u64,

    /// Reconnect on the next command after a connection failure. When
    /// false, the first failure closes the client for good.
    pub reconnect: bool,

    // -------------------------------------------------------------------------
    // Codec Configuration
    // -------------------------------------------------------------------------
    /// Serializer for stored values
    pub encode: EncodeFn,

    /// Deserializer for fetched values
    pub decode: DecodeFn,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: "11211".to_string(),
            timeout_ms: 1000,
            reconnect: true,
            encode: codec::encode,
            decode: codec::decode,
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.config.port = port.into();
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    /// Enable or disable reconnecting after a connection failure
    pub fn reconnect(mut self, reconnect: bool) -> Self {
        self.config.reconnect = reconnect;
        self
    }

    /// Replace the value codec with custom encode/decode functions
    pub fn codec(mut self, encode: EncodeFn, decode: DecodeFn) -> Self {
        self.config.encode = encode;
        self.config.decode = decode;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
