//! One-call HTTP client over the blocking transport.
//!
//! # Design
//! `HttpClient` holds only a `Transport` and carries no state between
//! calls. Each call builds its request, attaches the form body when the
//! verb carries one, and runs exactly one send/receive cycle. Parsing the
//! body is left to the caller (`json::parse`), because not every endpoint
//! answers with JSON.

use tracing::debug;
use url::Url;

use crate::config::TransportConfig;
use crate::error::Result;
use crate::http::{FormFields, HttpMethod, HttpRequest, HttpResponse, HttpTarget};
use crate::transport::Transport;
use crate::wire::attach_form;

/// Synchronous, stateless client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    transport: Transport,
}

impl HttpClient {
    pub fn new(config: TransportConfig) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(config)?,
        })
    }

    pub fn with_transport(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Start a request for `url`; add headers before passing it to `send`.
    pub fn request(&self, method: HttpMethod, url: &Url) -> Result<HttpRequest> {
        let target = HttpTarget::from_url(url)?;
        Ok(HttpRequest::new(method, target))
    }

    pub fn get(&self, url: &Url) -> Result<HttpResponse> {
        let request = self.request(HttpMethod::Get, url)?;
        self.send(request, &FormFields::new())
    }

    pub fn post_form(&self, url: &Url, fields: &FormFields) -> Result<HttpResponse> {
        let request = self.request(HttpMethod::Post, url)?;
        self.send(request, fields)
    }

    /// Attach `fields` as the form body and run one request/response cycle.
    ///
    /// POST and PUT need at least one field; GET and DELETE take none.
    pub fn send(&self, mut request: HttpRequest, fields: &FormFields) -> Result<HttpResponse> {
        attach_form(&mut request, fields)?;
        let target = &request.target;
        debug!(
            "Target: {}://{}{}",
            if target.use_tls { "https" } else { "http" },
            target.authority(),
            target.path_and_query()
        );
        self.transport.send(&request)
    }
}
