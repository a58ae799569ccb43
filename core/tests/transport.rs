//! Byte-level transport tests against a raw loopback stub.
//!
//! The stub reads the request up to its header terminator (plus any
//! `Content-Length` body), records it, then replays a scripted response in
//! the chunks it is given before closing the connection. `TlsStub` does the
//! same inside a rustls session with a fresh self-signed certificate.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::{RootCertStore, ServerConfig, ServerConnection, StreamOwned};
use tinyweb_core::{
    attach_form, ClientError, FormFields, HttpMethod, HttpRequest, HttpTarget, Transport,
    TransportConfig,
};

struct Stub {
    port: u16,
    handle: JoinHandle<Vec<u8>>,
}

impl Stub {
    /// Serve one connection, writing each chunk separately with a pause in
    /// between so the client sees several short reads.
    fn serve(chunks: Vec<Vec<u8>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let request = read_request(&mut socket);
            for chunk in chunks {
                if socket.write_all(&chunk).and_then(|()| socket.flush()).is_err() {
                    break;
                }
                thread::sleep(Duration::from_millis(20));
            }
            request
        });
        Self { port, handle }
    }

    /// Answer with `reply` as soon as the connection opens, then drain
    /// whatever the client sends until it hangs up.
    fn blurt(reply: Vec<u8>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let _ = socket.write_all(&reply);
            let mut seen = Vec::new();
            let _ = socket.read_to_end(&mut seen);
            seen
        });
        Self { port, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    fn request_bytes(self) -> Vec<u8> {
        self.handle.join().unwrap()
    }
}

/// How the TLS stub ends its side of the session.
#[derive(Debug, Clone, Copy)]
enum Hangup {
    CloseNotify,
    DropSocket,
}

struct TlsStub {
    port: u16,
    roots: RootCertStore,
    /// The request bytes, and whether the client closed with `close_notify`.
    handle: JoinHandle<(Vec<u8>, bool)>,
}

impl TlsStub {
    fn serve(reply: Vec<u8>, hangup: Hangup) -> Self {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert = certified.cert.der().clone();
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der()));
        let mut roots = RootCertStore::empty();
        roots.add(cert.clone()).unwrap();

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![cert], key)
            .unwrap();
        let config = Arc::new(config);

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            let conn = ServerConnection::new(config).unwrap();
            let mut tls = StreamOwned::new(conn, socket);
            let request = read_request(&mut tls);
            if tls.write_all(&reply).and_then(|()| tls.flush()).is_err() {
                return (request, false);
            }

            match hangup {
                Hangup::CloseNotify => {
                    tls.conn.send_close_notify();
                    if tls.flush().is_err() {
                        return (request, false);
                    }
                    // A clean EOF means the client answered with close_notify.
                    let clean = tls.read_to_end(&mut Vec::new()).is_ok();
                    (request, clean)
                }
                Hangup::DropSocket => {
                    let _ = tls.sock.shutdown(Shutdown::Write);
                    let _ = tls.sock.read_to_end(&mut Vec::new());
                    (request, false)
                }
            }
        });
        Self { port, roots, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("https://localhost:{}{path}", self.port)
    }

    fn finish(self) -> (Vec<u8>, bool) {
        self.handle.join().unwrap()
    }
}

fn read_request(socket: &mut impl Read) -> Vec<u8> {
    let mut request = Vec::new();
    let mut byte = [0u8; 1];
    while !request.ends_with(b"\r\n\r\n") {
        match socket.read(&mut byte) {
            Ok(1) => request.push(byte[0]),
            _ => return request,
        }
    }
    let head = String::from_utf8_lossy(&request).to_ascii_lowercase();
    let body_len = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .map_or(0, |n| n.trim().parse::<usize>().unwrap());
    let mut body = vec![0u8; body_len];
    socket.read_exact(&mut body).unwrap();
    request.extend_from_slice(&body);
    request
}

fn config(buffer_size: usize) -> TransportConfig {
    TransportConfig {
        buffer_size,
        read_timeout_secs: 5,
        ..TransportConfig::default()
    }
}

fn transport(buffer_size: usize) -> Transport {
    Transport::new(config(buffer_size)).unwrap()
}

fn get(url: &str) -> HttpRequest {
    HttpRequest::new(HttpMethod::Get, HttpTarget::parse(url).unwrap())
}

#[test]
fn reads_shorter_than_the_buffer_are_collected_in_full() {
    let response = b"HTTP/1.0 200 OK\r\nContent-Type: application/json\r\n\r\n{\"a\":1,\"b\":[1,2,3]}".to_vec();
    let chunks = response.chunks(5).map(<[u8]>::to_vec).collect();
    let stub = Stub::serve(chunks);

    let reply = transport(4096).send(&get(&stub.url("/p"))).unwrap();
    assert_eq!(reply.raw, response);
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "{\"a\":1,\"b\":[1,2,3]}");
    stub.request_bytes();
}

#[test]
fn response_that_exactly_fills_the_buffer_is_not_duplicated() {
    let head = b"HTTP/1.0 200 OK\r\n\r\n".to_vec();
    let mut response = head.clone();
    // Pad the body so the whole reply is exactly four 16-byte buffers.
    response.resize(64, b'x');
    let chunks = response.chunks(16).map(<[u8]>::to_vec).collect();
    let stub = Stub::serve(chunks);

    let reply = transport(16).send(&get(&stub.url("/"))).unwrap();
    assert_eq!(reply.raw.len(), 64);
    assert_eq!(reply.raw, response);
    assert_eq!(reply.body.len(), 64 - head.len());
    stub.request_bytes();
}

#[test]
fn final_partial_read_is_kept() {
    let response = b"HTTP/1.0 200 OK\r\n\r\n0123456789abcdefXYZ".to_vec();
    let stub = Stub::serve(vec![response.clone()]);

    let reply = transport(16).send(&get(&stub.url("/"))).unwrap();
    assert_eq!(reply.raw, response);
    assert_eq!(reply.body, "0123456789abcdefXYZ");
    stub.request_bytes();
}

#[test]
fn get_request_bytes_are_exact() {
    let stub = Stub::serve(vec![b"HTTP/1.0 204 No Content\r\n\r\n".to_vec()]);

    let request = get(&stub.url("/p?x=1"));
    let reply = transport(4096).send(&request).unwrap();
    assert_eq!(reply.status, 204);
    assert!(reply.body.is_empty());

    let sent = stub.request_bytes();
    let expected = format!("GET /p?x=1 HTTP/1.0\r\nHOST: 127.0.0.1:{}\r\n\r\n", request.target.port);
    assert_eq!(String::from_utf8(sent).unwrap(), expected);
}

#[test]
fn post_body_follows_the_blank_line() {
    let stub = Stub::serve(vec![b"HTTP/1.0 200 OK\r\n\r\nok".to_vec()]);

    let mut request = HttpRequest::new(HttpMethod::Post, HttpTarget::parse(&stub.url("/token")).unwrap());
    let fields: FormFields = [("code", "a b"), ("state", "xyz")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    attach_form(&mut request, &fields).unwrap();
    let reply = transport(4096).send(&request).unwrap();
    assert_eq!(reply.body, "ok");

    let sent = String::from_utf8(stub.request_bytes()).unwrap();
    assert!(sent.starts_with("POST /token HTTP/1.0\r\n"));
    assert!(sent.contains("\r\nContent-Type: application/x-www-form-urlencoded\r\n"));
    assert!(sent.contains("\r\nContent-Length: 18\r\n"));
    assert!(sent.ends_with("\r\n\r\ncode=a+b&state=xyz"));
}

#[test]
fn peer_closing_without_reply_gives_an_empty_response() {
    let stub = Stub::serve(Vec::new());

    let reply = transport(4096).send(&get(&stub.url("/"))).unwrap();
    assert!(reply.raw.is_empty());
    assert_eq!(reply.status, 0);
    assert!(reply.headers.is_empty());
    stub.request_bytes();
}

#[test]
fn tls_handshake_against_a_plain_peer_fails() {
    let stub = Stub::blurt(b"HTTP/1.0 400 Bad Request\r\n\r\nnot tls".to_vec());
    let url = format!("https://127.0.0.1:{}/", stub.port);

    let err = transport(4096).send(&get(&url)).unwrap_err();
    assert_eq!(err.code(), 1100, "got {err:?}");
    assert!(err.is_transport_error());
    // The stub only sees the ClientHello, never an HTTP request line.
    let seen = stub.request_bytes();
    assert!(!seen.starts_with(b"GET"));
}

#[test]
fn tls_exchange_ends_with_close_notify_both_ways() {
    let reply = b"HTTP/1.0 200 OK\r\nContent-Type: application/json\r\n\r\n{\"secure\":true}".to_vec();
    let stub = TlsStub::serve(reply.clone(), Hangup::CloseNotify);
    let transport = Transport::with_roots(config(4096), stub.roots.clone()).unwrap();

    let response = transport.send(&get(&stub.url("/secure"))).unwrap();
    assert_eq!(response.raw, reply);
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, "application/json");
    assert_eq!(response.body, "{\"secure\":true}");

    let port = stub.port;
    let (sent, clean) = stub.finish();
    assert_eq!(
        String::from_utf8(sent).unwrap(),
        format!("GET /secure HTTP/1.0\r\nHOST: localhost:{port}\r\n\r\n")
    );
    assert!(clean, "client dropped the session without close_notify");
}

#[test]
fn tls_peer_dropping_the_socket_still_ends_the_response() {
    let reply = b"HTTP/1.0 200 OK\r\n\r\n0123456789abcdefghijklmnopqrstuvwxyz".to_vec();
    let stub = TlsStub::serve(reply.clone(), Hangup::DropSocket);
    let transport = Transport::with_roots(config(16), stub.roots.clone()).unwrap();

    let response = transport.send(&get(&stub.url("/"))).unwrap();
    assert_eq!(response.raw, reply);
    assert_eq!(response.body, "0123456789abcdefghijklmnopqrstuvwxyz");
    stub.finish();
}

#[test]
fn tls_certificate_outside_the_root_store_is_rejected() {
    let stub = TlsStub::serve(b"HTTP/1.0 200 OK\r\n\r\n".to_vec(), Hangup::DropSocket);
    let transport = Transport::with_roots(config(4096), RootCertStore::empty()).unwrap();

    let err = transport.send(&get(&stub.url("/"))).unwrap_err();
    assert!(matches!(err, ClientError::TlsHandshake { .. }), "got {err:?}");
    let (sent, _) = stub.finish();
    assert!(sent.is_empty());
}
