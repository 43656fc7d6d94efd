//! HTTP Client — request framing, header parsing, and a response reader
//! with Content-Length / chunked / sentinel framing modes
//! (`SPEC_FULL.md` §5.D).
//!
//! Hand-rolled over the raw socket rather than delegated to a framework —
//! consistent with the "HTTP/2" non-goal and the design's insistence on
//! explicit chunked/identity framing. The read-in-256-byte-blocks idiom and
//! byte-scanning style are grounded in `chopin::fast_http`'s raw HTTP/1.1
//! handling (this crate's role is client, not server, but the "scan for a
//! literal, no framework" approach carries over directly).

mod request;
mod response;

pub use request::{build_request, Verb};
pub use response::{read_response, Response};

use crate::connection::Connection;
use crate::error::Result;

/// Outcome of [`do_request`]'s HEAD-then-GET flow.
#[derive(Debug)]
pub enum DoRequestOutcome {
    /// Final GET status (200, 404, 410, ...), with the full response.
    Status(Response),
    /// The HEAD request alone settled the matter: non-200 status. Carries
    /// the full HEAD response (not just the status) so callers can still
    /// read its headers — a redirect's `Location`, most importantly.
    HeadStatus(Response),
    /// The local archive already exists for this URL.
    AlreadyExists,
}

/// HEAD first; if non-200, return that response without ever issuing a GET.
/// If the local archive already exists, short-circuit. Otherwise issue the
/// GET and return its response — reconnecting first if the HEAD round-trip
/// revealed the peer had closed the connection.
pub fn do_request(
    conn: &mut Connection,
    host: &str,
    target: &str,
    archive_exists: bool,
) -> Result<DoRequestOutcome> {
    let head = build_request(Verb::Head, host, target);
    conn.send(&head)?;
    let head_resp = read_response(conn)?;
    if head_resp.status != 200 {
        return Ok(DoRequestOutcome::HeadStatus(head_resp));
    }
    if archive_exists {
        return Ok(DoRequestOutcome::AlreadyExists);
    }
    if head_resp.peer_closed {
        conn.reconnect()?;
    }
    let get = build_request(Verb::Get, host, target);
    conn.send(&get)?;
    let get_resp = read_response(conn)?;
    Ok(DoRequestOutcome::Status(get_resp))
}
