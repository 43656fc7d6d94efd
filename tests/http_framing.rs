//! Loopback-socket tests for the three response body-framing modes, grounded
//! in the raw-`TcpStream` test style used for HTTP protocol checks elsewhere
//! in the retrieval pack: stand up a listener on an ephemeral port, write a
//! canned response by hand, and drive the real reader against it.

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::thread;

use reaper::http::read_response;

fn serve_once(response: &'static [u8]) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut sock, _) = listener.accept().expect("accept connection");
        sock.write_all(response).expect("write canned response");
    });

    let mut client = TcpStream::connect(("127.0.0.1", port)).expect("connect to loopback");
    let resp = read_response(&mut client).expect("read_response should succeed");
    handle.join().unwrap();
    resp.status
}

#[test]
fn content_length_framing_reads_exact_body() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut sock, _) = listener.accept().unwrap();
        sock.write_all(
            b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: keep-alive\r\n\r\nhello",
        )
        .unwrap();
    });

    let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let resp = read_response(&mut client).unwrap();
    handle.join().unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, b"hello");
    assert!(!resp.peer_closed);
}

#[test]
fn chunked_framing_reassembles_three_chunks() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut sock, _) = listener.accept().unwrap();
        let mut out = Vec::new();
        out.extend_from_slice(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n");
        out.extend_from_slice(b"5\r\nhello\r\n");
        out.extend_from_slice(b"a\r\n0123456789\r\n");
        out.extend_from_slice(b"0\r\n\r\n");
        sock.write_all(&out).unwrap();
    });

    let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let resp = read_response(&mut client).unwrap();
    handle.join().unwrap();

    assert_eq!(resp.body, b"hello0123456789");
    assert_eq!(resp.body.len(), 15);
}

#[test]
fn sentinel_framing_reads_until_body_close_tag() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut sock, _) = listener.accept().unwrap();
        sock.write_all(b"HTTP/1.1 200 OK\r\n\r\n<html><body>hi</body>").unwrap();
    });

    let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let resp = read_response(&mut client).unwrap();
    handle.join().unwrap();

    assert!(resp.body.ends_with(b"</body"));
}

#[test]
fn connection_close_header_is_reported() {
    let status = serve_once(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    assert_eq!(status, 404);
}

#[test]
fn location_header_is_queryable_for_redirects() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut sock, _) = listener.accept().unwrap();
        sock.write_all(
            b"HTTP/1.1 301 Moved Permanently\r\nLocation: https://t.test/\r\nContent-Length: 0\r\n\r\n",
        )
        .unwrap();
    });

    let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let resp = read_response(&mut client).unwrap();
    handle.join().unwrap();

    assert_eq!(resp.status, 301);
    assert_eq!(resp.header("Location").as_deref(), Some("https://t.test/"));
}
