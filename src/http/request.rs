//! Request line and header construction (`SPEC_FULL.md` §5.D, "Request
//! build").

/// `GET` fetches the body; `HEAD` is used first in `do_request` to check
/// status without paying for a body transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Head,
}

impl Verb {
    fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Head => "HEAD",
        }
    }
}

const USER_AGENT: &str = concat!("reaper/", env!("CARGO_PKG_VERSION"));

/// Build a complete HTTP/1.1 request:
///
/// ```text
/// VERB SP target SP HTTP/1.1 CRLF
/// User-Agent: ...
/// Accept: */*
/// Host: <host, trailing / stripped>
/// Connection: keep-alive
/// CRLFCRLF
/// ```
#[must_use]
pub fn build_request(verb: Verb, host: &str, target: &str) -> Vec<u8> {
    let host = host.trim_end_matches('/');
    let mut out = String::with_capacity(128 + target.len() + host.len());
    out.push_str(verb.as_str());
    out.push(' ');
    out.push_str(target);
    out.push_str(" HTTP/1.1\r\n");
    out.push_str("User-Agent: ");
    out.push_str(USER_AGENT);
    out.push_str("\r\n");
    out.push_str("Accept: */*\r\n");
    out.push_str("Host: ");
    out.push_str(host);
    out.push_str("\r\n");
    out.push_str("Connection: keep-alive\r\n");
    out.push_str("\r\n");
    out.into_bytes()
}
