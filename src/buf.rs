//! `Buf` — growable byte buffer used as the read/write scratch space for
//! sockets, TLS sessions, and the in-place link rewriter.
//!
//! The distilled design names this an external collaborator and specifies
//! only the operations it must expose (`SPEC_FULL.md` §6): `append`,
//! `append_ex`, `clear`, `snip`, `collapse`, `shift`, the socket/TLS
//! read/write adapters, and offset↔pointer conversion. This module is the
//! one concrete realization this crate needs — intentionally thin, not a
//! general-purpose library.
//!
//! Offsets, not pointers: every caller in this crate (the chunked reader,
//! the link rewriter) holds a `usize` offset across a call that may grow or
//! splice the buffer, then re-derives a `&[u8]`/`&mut [u8]` from
//! `buf.as_slice()`/`buf.as_mut_slice()` afterwards. A `Vec<u8>` backs the
//! buffer, so growth is an ordinary reallocation — offsets remain valid by
//! construction, the same way arena indices do.

use std::io::{self, Read, Write};

use rustls::ClientConnection;
use rustls::StreamOwned;

/// Growable byte buffer with the splice primitives the HTTP client and link
/// rewriter need.
#[derive(Debug, Default, Clone)]
pub struct Buf {
    data: Vec<u8>,
}

impl Buf {
    #[must_use]
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    #[must_use]
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            data: Vec::with_capacity(cap),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Append a full string/byte slice to the tail of the buffer.
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Append exactly `n` bytes from `src`, truncating or zero-extending as
    /// needed — named to mirror the C `append_ex(src, n)` signature that
    /// lets a caller append a prefix of a larger source buffer.
    pub fn append_ex(&mut self, src: &[u8], n: usize) {
        let n = n.min(src.len());
        self.data.extend_from_slice(&src[..n]);
    }

    /// Drop every byte, keeping the allocation for reuse.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Drop the first `n` bytes from the tail (truncate).
    pub fn snip(&mut self, n: usize) {
        let new_len = self.data.len().saturating_sub(n);
        self.data.truncate(new_len);
    }

    /// Remove `n` bytes starting at `offset`, closing the gap. Used to strip
    /// chunk-size lines and trailing CRLFs out of the middle of the buffer
    /// without disturbing the bytes that follow.
    ///
    /// # Panics
    ///
    /// Panics if `offset + n` exceeds the buffer length.
    pub fn collapse(&mut self, offset: usize, n: usize) {
        assert!(offset + n <= self.data.len(), "collapse out of bounds");
        self.data.drain(offset..offset + n);
    }

    /// Insert `replacement` at `offset`, shifting the bytes that were there
    /// to the right. Paired with `collapse` for the link-rewrite splice:
    /// `collapse(url_start, url_len)` then `shift(url_start, local_path)`.
    ///
    /// # Panics
    ///
    /// Panics if `offset` exceeds the buffer length.
    pub fn shift(&mut self, offset: usize, replacement: &[u8]) {
        assert!(offset <= self.data.len(), "shift out of bounds");
        self.data.splice(offset..offset, replacement.iter().copied());
    }

    /// Read up to `max` bytes from a plain TCP socket, appending to the
    /// tail. Returns the number of bytes read (0 means the peer closed the
    /// connection).
    pub fn read_socket(&mut self, socket: &mut impl Read, max: usize) -> io::Result<usize> {
        let start = self.data.len();
        self.data.resize(start + max, 0);
        let n = socket.read(&mut self.data[start..])?;
        self.data.truncate(start + n);
        Ok(n)
    }

    /// Read up to `max` bytes from a TLS session, appending to the tail.
    pub fn read_tls(
        &mut self,
        tls: &mut StreamOwned<ClientConnection, std::net::TcpStream>,
        max: usize,
    ) -> io::Result<usize> {
        self.read_socket(tls, max)
    }

    /// Write the full buffer contents to a plain TCP socket.
    pub fn write_socket(&self, socket: &mut impl Write) -> io::Result<()> {
        socket.write_all(&self.data)
    }

    /// Write the full buffer contents to a TLS session.
    pub fn write_tls(
        &self,
        tls: &mut StreamOwned<ClientConnection, std::net::TcpStream>,
    ) -> io::Result<()> {
        tls.write_all(&self.data)
    }

    /// Find the first occurrence of `needle` at or after `from`, if any.
    #[must_use]
    pub fn find(&self, needle: &[u8], from: usize) -> Option<usize> {
        if from >= self.data.len() {
            return None;
        }
        self.data[from..]
            .windows(needle.len().max(1))
            .position(|w| w == needle)
            .map(|p| p + from)
    }
}

impl From<Vec<u8>> for Buf {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_find() {
        let mut buf = Buf::new();
        buf.append(b"hello world");
        assert_eq!(buf.find(b"world", 0), Some(6));
        assert_eq!(buf.find(b"xyz", 0), None);
    }

    #[test]
    fn collapse_removes_middle_span() {
        let mut buf = Buf::new();
        buf.append(b"abcXXXdef");
        buf.collapse(3, 3);
        assert_eq!(buf.as_slice(), b"abcdef");
    }

    #[test]
    fn shift_inserts_at_offset() {
        let mut buf = Buf::new();
        buf.append(b"abcdef");
        buf.shift(3, b"XXX");
        assert_eq!(buf.as_slice(), b"abcXXXdef");
    }

    #[test]
    fn collapse_then_shift_splices_replacement() {
        let mut buf = Buf::new();
        buf.append(b"href=\"/a\" more");
        // splice "/a" (offset 6, len 2) for "/archive/a.html"
        buf.collapse(6, 2);
        buf.shift(6, b"/archive/a.html");
        assert_eq!(buf.as_slice(), b"href=\"/archive/a.html\" more");
    }

    #[test]
    fn append_ex_truncates_to_n() {
        let mut buf = Buf::new();
        buf.append_ex(b"abcdef", 3);
        assert_eq!(buf.as_slice(), b"abc");
    }

    #[test]
    fn snip_truncates_tail() {
        let mut buf = Buf::new();
        buf.append(b"abcdef");
        buf.snip(2);
        assert_eq!(buf.as_slice(), b"abcd");
    }
}
