//! Minimal HTTP(S) client on raw sockets plus a lenient JSON parser.
//!
//! # Overview
//! A request is built as plain data (`HttpRequest`), serialized byte-exact
//! as HTTP/1.0 (`wire`), sent over a fresh TCP or TLS connection
//! (`transport`), and the raw reply is framed back into an `HttpResponse`.
//! Response bodies are decoded with `json::parse` into a `JsonValue` tree.
//!
//! # Design
//! - One blocking request per call: no pooling, keep-alive, chunked
//!   encoding, redirects or retries.
//! - Serialization and framing are pure functions, so the wire format is
//!   testable without a socket.
//! - JSON errors are values (`JsonValue::Error`), not `Err`; transport and
//!   caller errors are `ClientError` with a numeric `code()`.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod json;
mod parser;
pub mod transport;
pub mod wire;

pub use client::HttpClient;
pub use config::TransportConfig;
pub use error::{ClientError, Result, Step};
pub use http::{FormFields, HttpMethod, HttpRequest, HttpResponse, HttpTarget};
pub use json::{parse, JsonError, JsonValue};
pub use transport::Transport;
pub use wire::{attach_form, build_message, split_response};
