//! Recursive web archiver core: BFS crawl over HTTP/1.1 (plain or TLS),
//! mirroring pages and rewriting their links to a local archive tree.

pub mod arena;
pub mod buf;
pub mod connection;
pub mod display;
pub mod engine;
pub mod error;
pub mod extract;
pub mod frontier;
pub mod http;
pub mod options;
pub mod robots;
pub mod urlutil;
