//! Connection — TCP + optional TLS session, DNS resolution, reconnect, TLS
//! upgrade (`SPEC_FULL.md` §5.C).
//!
//! TLS is `rustls`, reused verbatim from the teacher crate's own dependency
//! on `rustls 0.23` (`ring` crypto provider) plus `rustls-native-certs` for
//! the system trust store — no certificate pinning, matching the design's
//! TLS paragraph. The "TLS library initialised once per process" rule maps
//! to a `OnceLock<Arc<ClientConfig>>` built from the native root store on
//! first use.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, OnceLock};

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, StreamOwned};

use crate::error::{ReaperError, Result};

static TLS_CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();

fn tls_config() -> Arc<ClientConfig> {
    TLS_CONFIG
        .get_or_init(|| {
            let mut roots = rustls::RootCertStore::empty();
            for cert in rustls_native_certs::load_native_certs().certs {
                let _ = roots.add(cert);
            }
            let config = ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth();
            Arc::new(config)
        })
        .clone()
}

enum Wire {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

/// A live socket to one host, plain or TLS, with enough state to reconnect
/// or upgrade in place.
pub struct Connection {
    wire: Wire,
    host: String,
    primary_host: String,
    secure: bool,
}

fn resolve_and_connect(host: &str, port: u16) -> Result<TcpStream> {
    let addr = format!("{host}:{port}");
    let mut addrs = addr
        .to_socket_addrs()
        .map_err(|e| ReaperError::Dns {
            host: host.to_string(),
            source: e,
        })?;
    let target = addrs
        .next()
        .ok_or_else(|| ReaperError::Dns {
            host: host.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses resolved"),
        })?;
    TcpStream::connect(target).map_err(ReaperError::Socket)
}

impl Connection {
    /// Open a fresh connection to `host`. `primary_host` is recorded as the
    /// crawl's original seed host, so a later `reconnect` can fall back to
    /// it even if `host` has since been redirected elsewhere.
    pub fn open(host: &str, primary_host: &str, secure: bool) -> Result<Self> {
        let port = if secure { 443 } else { 80 };
        let tcp = resolve_and_connect(host, port)?;
        let wire = if secure {
            Wire::Tls(Box::new(open_tls(tcp, host)?))
        } else {
            Wire::Plain(tcp)
        };
        Ok(Self {
            wire,
            host: host.to_string(),
            primary_host: primary_host.to_string(),
            secure,
        })
    }

    /// Wrap an already-connected plain TCP stream as a `Connection`. Used by
    /// tests that stand up a loopback listener on an ephemeral port, since
    /// `open` always dials the fixed HTTP/HTTPS port and real DNS.
    #[cfg(test)]
    pub(crate) fn from_plain_stream(stream: TcpStream, host: &str, primary_host: &str) -> Self {
        Self {
            wire: Wire::Plain(stream),
            host: host.to_string(),
            primary_host: primary_host.to_string(),
            secure: false,
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Close and reopen against `primary_host`, not the possibly-redirected
    /// `host` — so a bad redirect leaves the engine able to return to the
    /// seed origin.
    pub fn reconnect(&mut self) -> Result<()> {
        let fresh = Connection::open(&self.primary_host.clone(), &self.primary_host.clone(), self.secure)?;
        *self = fresh;
        Ok(())
    }

    /// Close and reopen the same host with `secure = true`.
    pub fn upgrade_to_tls(&mut self) -> Result<()> {
        let fresh = Connection::open(&self.host.clone(), &self.primary_host.clone(), true)?;
        *self = fresh;
        Ok(())
    }

    pub fn send(&mut self, buf: &[u8]) -> Result<()> {
        match &mut self.wire {
            Wire::Plain(tcp) => tcp.write_all(buf).map_err(ReaperError::Socket),
            Wire::Tls(tls) => tls.write_all(buf).map_err(ReaperError::Socket),
        }
    }

    pub fn recv(&mut self, out: &mut [u8]) -> Result<usize> {
        match &mut self.wire {
            Wire::Plain(tcp) => tcp.read(out).map_err(ReaperError::Socket),
            Wire::Tls(tls) => tls.read(out).map_err(ReaperError::Socket),
        }
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.wire {
            Wire::Plain(tcp) => tcp.read(buf),
            Wire::Tls(tls) => tls.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.wire {
            Wire::Plain(tcp) => tcp.write(buf),
            Wire::Tls(tls) => tls.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.wire {
            Wire::Plain(tcp) => tcp.flush(),
            Wire::Tls(tls) => tls.flush(),
        }
    }
}

fn open_tls(tcp: TcpStream, host: &str) -> Result<StreamOwned<ClientConnection, TcpStream>> {
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| ReaperError::Other(format!("invalid TLS server name: {host}")))?;
    let conn = ClientConnection::new(tls_config(), server_name).map_err(ReaperError::Tls)?;
    // The handshake happens implicitly on first read/write, matching the
    // "client role set without yet performing a handshake" semantics.
    Ok(StreamOwned::new(conn, tcp))
}
