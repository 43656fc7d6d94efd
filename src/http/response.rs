//! Response reading — header parsing and the three body-framing modes
//! (`SPEC_FULL.md` §5.D: Content-Length, chunked, and `</body>` sentinel).

use std::io::Read;

use crate::buf::Buf;
use crate::error::{ReaperError, Result};

/// How many bytes to pull off the wire per `recv` call while hunting for the
/// header terminator — small enough that we rarely overread past it.
const READ_BLOCK: usize = 256;

/// How far past a chunk size digit run we'll look for its terminating CR
/// before concluding the line is malformed.
const CHUNK_SIZE_LOOKAHEAD: usize = 20;

const SENTINEL: &[u8] = b"</body";

/// A fully read response: status, whether the peer signalled it would close
/// the connection, the raw header block (for on-demand header lookup), and
/// the body bytes (headers stripped).
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub peer_closed: bool,
    pub body: Vec<u8>,
    headers: Vec<u8>,
}

impl Response {
    /// Look up a header by name (case-insensitive), e.g. `Location` on a
    /// redirect. `Set-Cookie` is renormalized to `Cookie` on request, same
    /// as the internal parser used while framing the body.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        find_header(&self.headers, name, 0).map(|v| String::from_utf8_lossy(v).into_owned())
    }
}

enum Framing {
    ContentLength(usize),
    Chunked,
    Sentinel,
}

/// Read one full response off `stream`: headers first, then the body
/// framed according to whichever of the three modes the headers select.
///
/// Generic over any `Read` source rather than tied to [`crate::connection::
/// Connection`] — `do_request` calls it with a live connection, tests call
/// it with a plain loopback `TcpStream`.
pub fn read_response(stream: &mut impl Read) -> Result<Response> {
    let mut buf = Buf::new();
    let header_end = read_until_header_end(stream, &mut buf)?;

    let status = parse_status(&buf)?;
    let peer_closed = header_has_token(&buf, b"Connection", b"close");
    let framing = select_framing(&buf, header_end);
    let headers = buf.as_slice()[..header_end].to_vec();

    let mut overread = buf.as_slice()[header_end..].to_vec();
    buf.clear();

    let body = match framing {
        Framing::ContentLength(len) => read_content_length(stream, &mut overread, len)?,
        Framing::Chunked => read_chunked(stream, overread)?,
        Framing::Sentinel => read_sentinel(stream, overread)?,
    };

    Ok(Response {
        status,
        peer_closed,
        body,
        headers,
    })
}

/// Pull bytes in `READ_BLOCK`-sized chunks until `\r\n\r\n` is found,
/// returning the offset of the first body byte.
fn read_until_header_end(stream: &mut impl Read, buf: &mut Buf) -> Result<usize> {
    loop {
        if let Some(pos) = buf.find(b"\r\n\r\n", 0) {
            return Ok(pos + 4);
        }
        let before = buf.len();
        let n = buf.read_socket(stream, READ_BLOCK)?;
        if n == 0 {
            return Err(ReaperError::NoHeaderTerminator { scanned: before });
        }
    }
}

fn parse_status(buf: &Buf) -> Result<u16> {
    let bytes = buf.as_slice();
    let line_end = buf.find(b"\r\n", 0).unwrap_or(bytes.len());
    let line = &bytes[..line_end];
    let first_sp = line
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| ReaperError::UnknownStatus {
            line: String::from_utf8_lossy(line).into_owned(),
        })?;
    let rest = &line[first_sp + 1..];
    let second_sp = rest.iter().position(|&b| b == b' ').unwrap_or(rest.len());
    let code_bytes = &rest[..second_sp];
    std::str::from_utf8(code_bytes)
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| ReaperError::UnknownStatus {
            line: String::from_utf8_lossy(line).into_owned(),
        })
}

/// Find a header's value by name, scanning from `start` (the beginning of
/// the header block). `Set-Cookie` response headers are renormalized to the
/// `Cookie` name a client would send back, matching how the crawl engine
/// treats session cookies as opaque passthrough state.
fn find_header<'a>(buf: &'a [u8], name: &str, start: usize) -> Option<&'a [u8]> {
    let lower_name = name.to_ascii_lowercase();
    let mut offset = start;
    while let Some(line_start) = buf[offset..].windows(2).position(|w| w == b"\r\n").map(|p| offset + p + 2) {
        if line_start >= buf.len() || buf[line_start..].starts_with(b"\r\n") {
            break;
        }
        let line_end = buf[line_start..]
            .windows(2)
            .position(|w| w == b"\r\n")
            .map_or(buf.len(), |p| line_start + p);
        let line = &buf[line_start..line_end];
        if let Some(colon) = line.iter().position(|&b| b == b':') {
            let candidate = &line[..colon];
            if candidate.to_ascii_lowercase() == lower_name.as_bytes()
                || (lower_name == "cookie" && candidate.eq_ignore_ascii_case(b"Set-Cookie"))
            {
                let mut value_start = colon + 1;
                while value_start < line.len() && line[value_start] == b' ' {
                    value_start += 1;
                }
                return Some(&line[value_start..]);
            }
        }
        offset = line_end;
        if offset >= buf.len() {
            break;
        }
    }
    None
}

fn header_has_token(buf: &Buf, name: &str, token: &[u8]) -> bool {
    find_header(buf.as_slice(), name, 0)
        .map(|v| v.split(|&b| b == b',').any(|part| part.trim_ascii().eq_ignore_ascii_case(token)))
        .unwrap_or(false)
}

fn select_framing(buf: &Buf, header_end: usize) -> Framing {
    let bytes = buf.as_slice();
    if let Some(te) = find_header(bytes, "Transfer-Encoding", 0) {
        if te.to_ascii_lowercase().windows(7).any(|w| w == b"chunked") {
            return Framing::Chunked;
        }
    }
    if let Some(cl) = find_header(bytes, "Content-Length", 0) {
        if let Ok(s) = std::str::from_utf8(cl) {
            if let Ok(len) = s.trim().parse::<usize>() {
                return Framing::ContentLength(len);
            }
        }
    }
    let _ = header_end;
    Framing::Sentinel
}

/// Read the remainder of a Content-Length body, given whatever trailing
/// header-block overread we already have buffered.
fn read_content_length(stream: &mut impl Read, overread: &mut Vec<u8>, len: usize) -> Result<Vec<u8>> {
    let mut body = std::mem::take(overread);
    body.truncate(len.min(body.len()));
    let mut remaining = len.saturating_sub(body.len());
    let mut block = Buf::new();
    while remaining > 0 {
        let n = block.read_socket(stream, remaining.min(READ_BLOCK.max(4096)))?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(block.as_slice());
        remaining -= n;
        block.clear();
    }
    Ok(body)
}

/// The chunked-transfer reader: parse a hex chunk size line, ensure that
/// many bytes (plus its own framing) are buffered, collapse the size line
/// and its CRLF out of the buffer, append the chunk's data to the body, then
/// skip the chunk's trailing CRLF and loop until a zero-size chunk.
fn read_chunked(stream: &mut impl Read, overread: Vec<u8>) -> Result<Vec<u8>> {
    let mut buf = Buf::from(overread);
    let mut body = Vec::new();

    loop {
        let size_line_end = loop {
            if let Some(pos) = find_cr_within(buf.as_slice(), CHUNK_SIZE_LOOKAHEAD) {
                break pos;
            }
            let n = buf.read_socket(stream, READ_BLOCK)?;
            if n == 0 {
                return Err(ReaperError::MalformedChunkSize { offset: buf.len() });
            }
        };

        let size_text = std::str::from_utf8(&buf.as_slice()[..size_line_end])
            .map_err(|_| ReaperError::MalformedChunkSize { offset: 0 })?;
        let size_text = size_text.split(';').next().unwrap_or(size_text).trim();
        let chunk_size = usize::from_str_radix(size_text, 16)
            .map_err(|_| ReaperError::MalformedChunkSize { offset: 0 })?;

        // drop "<hex-size>\r\n"
        buf.collapse(0, size_line_end + 2);

        if chunk_size == 0 {
            // trailing CRLF (and any trailer headers, which this crawler
            // has no use for) terminate the body; we're done.
            break;
        }

        while buf.len() < chunk_size + 2 {
            let n = buf.read_socket(stream, (chunk_size + 2 - buf.len()).max(READ_BLOCK))?;
            if n == 0 {
                return Err(ReaperError::MalformedChunkSize { offset: buf.len() });
            }
        }

        body.extend_from_slice(&buf.as_slice()[..chunk_size]);
        // drop the chunk data plus its trailing CRLF
        buf.collapse(0, chunk_size + 2);
    }

    Ok(body)
}

/// Locate a `\r\n` within `limit` bytes of the start of `data`, for chunk
/// size lines which are expected to be short.
fn find_cr_within(data: &[u8], limit: usize) -> Option<usize> {
    let scan = data.len().min(limit);
    data[..scan].windows(2).position(|w| w == b"\r\n")
}

/// Sentinel-framed body: no length is known in advance, so keep reading
/// until the literal `</body` marker appears (or the peer closes).
fn read_sentinel(stream: &mut impl Read, overread: Vec<u8>) -> Result<Vec<u8>> {
    let mut buf = Buf::from(overread);
    loop {
        if buf.find(SENTINEL, 0).is_some() {
            return Ok(buf.as_slice().to_vec());
        }
        let n = buf.read_socket(stream, READ_BLOCK)?;
        if n == 0 {
            if buf.is_empty() {
                return Err(ReaperError::NoFramingSentinel);
            }
            return Ok(buf.as_slice().to_vec());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_status_reads_numeric_code() {
        let mut buf = Buf::new();
        buf.append(b"HTTP/1.1 404 Not Found\r\n\r\n");
        assert_eq!(parse_status(&buf).unwrap(), 404);
    }

    #[test]
    fn find_header_is_case_insensitive() {
        let raw = b"HTTP/1.1 200 OK\r\ncontent-length: 42\r\n\r\n";
        let v = find_header(raw, "Content-Length", 0).unwrap();
        assert_eq!(v, b"42");
    }

    #[test]
    fn find_header_renormalizes_set_cookie_to_cookie() {
        let raw = b"HTTP/1.1 200 OK\r\nSet-Cookie: sid=abc\r\n\r\n";
        let v = find_header(raw, "Cookie", 0).unwrap();
        assert_eq!(v, b"sid=abc");
    }

    #[test]
    fn select_framing_prefers_chunked_over_content_length() {
        let mut buf = Buf::new();
        buf.append(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nContent-Length: 10\r\n\r\n");
        assert!(matches!(select_framing(&buf, 0), Framing::Chunked));
    }

    #[test]
    fn find_cr_within_respects_limit() {
        let data = b"aaaaaaaaaaaaaaaaaaaaaaaaaa\r\n";
        assert!(find_cr_within(data, 20).is_none());
        assert!(find_cr_within(data, 30).is_some());
    }
}
