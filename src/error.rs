//! Error taxonomy for the crawl core.
//!
//! Mirrors the error kinds named in the design: network-transient conditions
//! are recovered locally by the engine, HTTP-terminal conditions end the
//! current URL, policy skips are silent, and fatal conditions abort the
//! whole crawl. `ReaperError` carries enough detail for the `Display`
//! dashboard and the log line that accompanies it; `ReaperErrorKind` is what
//! the engine actually matches on.

use std::fmt;

/// Coarse classification used by the engine's per-URL dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaperErrorKind {
    /// DNS failure, connect failure, peer-closed, 5xx, 400: reconnect and
    /// skip the current URL, crawl continues.
    NetworkTransient,
    /// 401/403/404/405/410: URL is abandoned. 404/410 are still archived.
    HttpTerminal,
    /// Cross-domain when disallowed, disallowed token, already archived,
    /// fragment URL: silently skipped.
    PolicySkip,
    /// DNS failure on the seed, socket creation failure, unknown HTTP
    /// status, arena growth failure: crawl aborts.
    Fatal,
    /// No end-of-header sentinel, malformed chunk size, no framing header
    /// and no `</body>` ever seen: response dropped, reconnect, URL skipped.
    ProtocolParse,
}

impl fmt::Display for ReaperErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReaperErrorKind::NetworkTransient => "network-transient",
            ReaperErrorKind::HttpTerminal => "http-terminal",
            ReaperErrorKind::PolicySkip => "policy-skip",
            ReaperErrorKind::Fatal => "fatal",
            ReaperErrorKind::ProtocolParse => "protocol-parse",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReaperError {
    #[error("dns resolution failed for {host}: {source}")]
    Dns {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("socket error: {0}")]
    Socket(#[source] std::io::Error),

    #[error("tls error: {0}")]
    Tls(#[source] rustls::Error),

    #[error("no end-of-header sentinel found within {scanned} bytes")]
    NoHeaderTerminator { scanned: usize },

    #[error("malformed chunk size at offset {offset}")]
    MalformedChunkSize { offset: usize },

    #[error("no Content-Length/Transfer-Encoding header and no </body> sentinel ever seen")]
    NoFramingSentinel,

    #[error("unknown or unparseable HTTP status line: {line:?}")]
    UnknownStatus { line: String },

    #[error("arena is at capacity and cannot grow further")]
    ArenaGrowthFailure,

    #[error("url exceeds HTTP_URL_MAX ({max} bytes): {len} bytes")]
    UrlTooLong { len: usize, max: usize },

    #[error("{0}")]
    Other(String),
}

impl ReaperError {
    /// Classify this error per the §7 taxonomy so the engine can dispatch
    /// on it without re-deriving the mapping at every call site.
    #[must_use]
    pub fn kind(&self) -> ReaperErrorKind {
        match self {
            ReaperError::Dns { .. } => ReaperErrorKind::Fatal,
            ReaperError::Socket(_) | ReaperError::Tls(_) => ReaperErrorKind::NetworkTransient,
            ReaperError::NoHeaderTerminator { .. }
            | ReaperError::MalformedChunkSize { .. }
            | ReaperError::NoFramingSentinel => ReaperErrorKind::ProtocolParse,
            ReaperError::UnknownStatus { .. } => ReaperErrorKind::Fatal,
            ReaperError::ArenaGrowthFailure => ReaperErrorKind::Fatal,
            ReaperError::UrlTooLong { .. } => ReaperErrorKind::PolicySkip,
            ReaperError::Other(_) => ReaperErrorKind::Fatal,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReaperError>;
