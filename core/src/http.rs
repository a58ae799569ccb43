//! HTTP request and response types.
//!
//! # Design
//! These types describe one HTTP/1.0 exchange as plain data. `HttpTarget` is
//! resolved once from a URL and never changes; `HttpRequest` only grows
//! header lines while it is being constructed; `HttpResponse` is filled in
//! exactly once by the framer. Headers are kept as raw lines (duplicates
//! allowed, original case preserved) because that is what goes on, and comes
//! off, the wire.

use std::collections::BTreeMap;

use url::Url;

use crate::error::{ClientError, Result};

/// Form fields for a body-bearing request. Key order is body order.
pub type FormFields = BTreeMap<String, String>;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether requests with this verb carry a form-encoded body.
    pub fn has_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(format!("unknown method: {other}")),
        }
    }
}

/// Resolved coordinates of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTarget {
    pub use_tls: bool,
    pub host: String,
    pub port: u16,
    /// Absolute path, always starting with `/`.
    pub path: String,
    /// Encoded query string without the leading `?`. Empty means none.
    pub query: String,
    pub protocol: String,
    pub version: String,
}

impl HttpTarget {
    /// Parse a URL string and resolve it into a target.
    pub fn parse(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        Self::from_url(&url)
    }

    /// Resolve an already parsed URL. The fragment is dropped.
    pub fn from_url(url: &Url) -> Result<Self> {
        let use_tls = match url.scheme() {
            "http" => false,
            "https" => true,
            other => return Err(ClientError::UnsupportedScheme(other.to_string())),
        };
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ClientError::MissingHost(url.to_string()))?;
        let port = url.port().unwrap_or(if use_tls { 443 } else { 80 });
        let path = match url.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        Ok(Self {
            use_tls,
            // IPv6 literals come back bracketed; the resolver wants them bare.
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port,
            path,
            query: url.query().unwrap_or_default().to_string(),
            protocol: "HTTP".to_string(),
            version: "1.0".to_string(),
        })
    }

    fn default_port(&self) -> u16 {
        if self.use_tls {
            443
        } else {
            80
        }
    }

    /// Value of the `Host` header: the host, plus `:port` when the port is
    /// not the scheme default.
    pub fn authority(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        if self.port == self.default_port() {
            host
        } else {
            format!("{host}:{}", self.port)
        }
    }

    /// Path plus `?query` when a query is present.
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub target: HttpTarget,
    /// Raw header lines without the trailing CRLF.
    pub headers: Vec<String>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Start a request for `target`, already carrying its `HOST` header.
    pub fn new(method: HttpMethod, target: HttpTarget) -> Self {
        let host = format!("HOST: {}", target.authority());
        Self {
            method,
            target,
            headers: vec![host],
            body: None,
        }
    }

    /// Append one raw header line, e.g. `"Authorization: Bearer abc"`.
    pub fn push_header(&mut self, line: impl Into<String>) {
        self.headers.push(line.into());
    }

    /// Builder-style variant of [`push_header`](Self::push_header).
    #[must_use]
    pub fn with_header(mut self, line: impl Into<String>) -> Self {
        self.push_header(line);
        self
    }
}

/// An HTTP response as received.
///
/// `Default` is the empty, not yet populated response; a transport cycle
/// fills it once and it is never reused.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// Numeric status, 0 when the status line could not be read.
    pub status: u16,
    /// Raw header lines; the first one is the status line.
    pub headers: Vec<String>,
    /// Lower-cased media type without parameters, empty when absent.
    pub content_type: String,
    /// Every byte received, headers and body.
    pub raw: Vec<u8>,
    /// Text after the header terminator.
    pub body: String,
}

impl HttpResponse {
    pub fn status_line(&self) -> Option<&str> {
        self.headers.first().map(String::as_str)
    }

    /// Value of the first header called `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim())
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type.ends_with("json")
    }
}
