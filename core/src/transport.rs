//! Blocking socket transport for one request/response cycle.
//!
//! # Design
//! `Transport::send` walks the fixed sequence resolve → connect → (TLS
//! handshake) → write → read-until-close, and each step maps its failure to
//! its own `ClientError` variant. The connected socket lives in a `Channel`;
//! once a TLS session exists every byte goes through it, and dropping the
//! channel closes the session and the socket on every exit path.
//!
//! Nothing survives a call. Each `send` opens a fresh socket and, for
//! `https`, a fresh TLS session; the shared `ClientConfig` only holds the
//! root store and has session resumption turned off.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;

use rustls::client::Resumption;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use tracing::{debug, info, trace, warn};

use crate::config::TransportConfig;
use crate::error::{ClientError, Result, Step};
use crate::http::{HttpRequest, HttpResponse, HttpTarget};
use crate::wire::{build_message, split_response};

/// Sends requests over plain TCP or TLS, one connection per call.
#[derive(Debug, Clone)]
pub struct Transport {
    config: TransportConfig,
    tls: Arc<ClientConfig>,
}

impl Transport {
    /// Build a transport trusting the Mozilla root set from `webpki-roots`.
    pub fn new(config: TransportConfig) -> Result<Self> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Self::with_roots(config, roots)
    }

    /// Build a transport trusting only `roots`.
    pub fn with_roots(config: TransportConfig, roots: RootCertStore) -> Result<Self> {
        config.validate()?;
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut tls = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(ClientError::tls)?
            .with_root_certificates(roots)
            .with_no_client_auth();
        tls.resumption = Resumption::disabled();

        Ok(Self {
            config,
            tls: Arc::new(tls),
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Send `request` and collect the whole response.
    ///
    /// Blocks until the peer closes the connection or a configured timeout
    /// fires. Any failure aborts the call; no partial response is returned.
    pub fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let message = build_message(request);
        let target = &request.target;
        debug!(
            "Sending to {}:{}:\n{}",
            target.host,
            target.port,
            String::from_utf8_lossy(&message)
        );

        let mut channel = self.open(target)?;
        write_all(&mut channel, &message)?;
        let raw = read_to_close(&mut channel, self.config.buffer_size)?;
        drop(channel);

        debug!(bytes = raw.len(), "response received");
        Ok(split_response(raw))
    }

    fn open(&self, target: &HttpTarget) -> Result<Channel> {
        let addrs = resolve(target)?;
        let socket = self.connect(&addrs)?;
        socket
            .set_read_timeout(self.config.read_timeout())
            .and_then(|()| socket.set_write_timeout(self.config.write_timeout()))
            .and_then(|()| socket.set_nodelay(true))
            .map_err(ClientError::SocketFailed)?;

        if !target.use_tls {
            return Ok(Channel::Plain(socket));
        }
        self.handshake(&target.host, socket)
    }

    fn connect(&self, addrs: &[SocketAddr]) -> Result<TcpStream> {
        let timeout = self.config.connect_timeout();
        let mut last_err = None;
        for addr in addrs {
            let attempt = match timeout {
                Some(timeout) => TcpStream::connect_timeout(addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(socket) => {
                    debug!(%addr, "connected");
                    return Ok(socket);
                }
                Err(e) => {
                    debug!(%addr, error = %e, "connect attempt failed");
                    last_err = Some(e);
                }
            }
        }
        let err = last_err
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no address to connect to"));
        Err(ClientError::io(Step::Connect, err))
    }

    fn handshake(&self, host: &str, mut socket: TcpStream) -> Result<Channel> {
        let name = ServerName::try_from(host)
            .map_err(|e| ClientError::tls(format!("invalid server name '{host}': {e}")))?
            .to_owned();
        let mut conn = ClientConnection::new(Arc::clone(&self.tls), name).map_err(ClientError::tls)?;

        // On failure the socket is dropped here, which closes it.
        while conn.is_handshaking() {
            conn.complete_io(&mut socket).map_err(ClientError::tls)?;
        }
        if let Some(suite) = conn.negotiated_cipher_suite() {
            info!("SSL connection using {:?}", suite.suite());
        }

        Ok(Channel::Tls(Box::new(StreamOwned::new(conn, socket))))
    }
}

fn resolve(target: &HttpTarget) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (target.host.as_str(), target.port)
        .to_socket_addrs()
        .map_err(|e| ClientError::HostNotFound {
            host: target.host.clone(),
            source: Some(e),
        })?
        .collect();
    if addrs.is_empty() {
        return Err(ClientError::HostNotFound {
            host: target.host.clone(),
            source: None,
        });
    }
    Ok(addrs)
}

/// Write every byte, retrying partial writes. A write that accepts nothing
/// means the peer stopped reading, so the request could never complete.
fn write_all(channel: &mut Channel, message: &[u8]) -> Result<()> {
    let mut sent = 0;
    while sent < message.len() {
        match channel.write(&message[sent..]) {
            Ok(0) => {
                let err = io::Error::new(io::ErrorKind::WriteZero, "peer accepted no bytes");
                return Err(ClientError::io(Step::Write, err));
            }
            Ok(n) => sent += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(ClientError::io(Step::Write, e)),
        }
    }
    channel.flush().map_err(|e| ClientError::io(Step::Write, e))
}

/// Read until the peer closes, appending exactly the bytes each read
/// returned.
fn read_to_close(channel: &mut Channel, buffer_size: usize) -> Result<Vec<u8>> {
    let mut buffer = vec![0u8; buffer_size];
    let mut received = Vec::with_capacity(buffer_size);
    loop {
        match channel.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                trace!(n, "read chunk");
                received.extend_from_slice(&buffer[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) if channel.is_tls() && e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!("peer closed the TLS session without close_notify");
                break;
            }
            Err(e) => return Err(ClientError::io(Step::Read, e)),
        }
    }
    Ok(received)
}

/// A connected socket, optionally wrapped in a TLS session.
enum Channel {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl Channel {
    fn is_tls(&self) -> bool {
        matches!(self, Channel::Tls(_))
    }
}

impl Read for Channel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Channel::Plain(socket) => socket.read(buf),
            Channel::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for Channel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Channel::Plain(socket) => socket.write(buf),
            Channel::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Channel::Plain(socket) => socket.flush(),
            Channel::Tls(stream) => stream.flush(),
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        let socket = match self {
            Channel::Plain(socket) => socket,
            Channel::Tls(stream) => {
                stream.conn.send_close_notify();
                while stream.conn.wants_write() {
                    match stream.conn.write_tls(&mut stream.sock) {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
                &mut stream.sock
            }
        };
        // Errors only mean the peer is already gone.
        let _ = socket.shutdown(Shutdown::Both);
    }
}
