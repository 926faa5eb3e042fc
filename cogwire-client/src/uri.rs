//! # Connection Identifier Parsing
//!
//! Purpose: Resolve `cog://host[:port]/space` identifiers into their host,
//! port, and namespace parts without touching the network.
//!
//! ## Design Principles
//! 1. **Pure Parsing**: No I/O here; a missing scheme is the only failure.
//! 2. **Late Port Validation**: The port stays text and is checked during
//!    address resolution, so parsing has exactly one error kind.
//! 3. **Opaque Namespace**: The space name is passed through untouched.

use crate::client::{ClientError, ClientResult};

/// URI scheme identifying the CogServer shell protocol.
pub(crate) const COG_SCHEME: &str = "cog://";

/// Well-known CogServer port, used when the identifier omits one.
pub(crate) const DEFAULT_PORT: &str = "17001";

/// A parsed connection identifier.
///
/// Immutable once parsed; the session holds it for the lifetime of the
/// client and reports the original identifier in errors and stats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// The identifier exactly as given, e.g. `cog://localhost/my-space`.
    pub uri: String,
    /// Remote host name or address literal.
    pub host: String,
    /// Decimal port text; `17001` when the identifier names none.
    pub port: String,
    /// Logical space name on the server; opaque to this client.
    pub space: String,
}

impl Endpoint {
    /// Parses a `cog://host[:port]/space` identifier.
    ///
    /// The host runs to the first `:` or `/`. A port is taken only when the
    /// host's terminator is the colon itself, so colons inside the space
    /// name are never misread as port delimiters. The space is everything
    /// after the first `/` past the authority and may be empty.
    ///
    /// Returns [`ClientError::InvalidUri`] when the `cog://` prefix is
    /// missing; any other oddity (unknown host, non-numeric port) surfaces
    /// later, when the session resolves the address.
    pub fn parse(uri: &str) -> ClientResult<Endpoint> {
        let rest = uri
            .strip_prefix(COG_SCHEME)
            .ok_or_else(|| ClientError::InvalidUri(uri.to_string()))?;

        let host_end = rest.find([':', '/']).unwrap_or(rest.len());
        let host = &rest[..host_end];

        let mut port = DEFAULT_PORT;
        let mut space = "";
        match rest.as_bytes().get(host_end).copied() {
            Some(b':') => {
                let after_colon = &rest[host_end + 1..];
                let port_end = after_colon.find('/').unwrap_or(after_colon.len());
                port = &after_colon[..port_end];
                if port_end < after_colon.len() {
                    space = &after_colon[port_end + 1..];
                }
            }
            Some(b'/') => {
                space = &rest[host_end + 1..];
            }
            _ => {}
        }

        Ok(Endpoint {
            uri: uri.to_string(),
            host: host.to_string(),
            port: port.to_string(),
            space: space.to_string(),
        })
    }

    /// Host and port joined for address resolution.
    pub(crate) fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
