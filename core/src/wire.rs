//! HTTP/1.0 wire format: request serialization and response framing.
//!
//! Both directions are pure functions over bytes, so everything the
//! transport sends or receives can be checked without a socket.

use tracing::debug;
use url::form_urlencoded;

use crate::error::{ClientError, Result};
use crate::http::{FormFields, HttpRequest, HttpResponse};

const CRLF: &[u8] = b"\r\n";
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Encode `fields` as the request's form body.
///
/// Appends `Content-Type` and `Content-Length` so they are serialized with
/// the other headers. A body-bearing verb needs at least one field; any
/// other verb must not be given fields at all.
pub fn attach_form(request: &mut HttpRequest, fields: &FormFields) -> Result<()> {
    let method = request.method;
    if !method.has_body() {
        if fields.is_empty() {
            return Ok(());
        }
        return Err(ClientError::UnexpectedFormFields(method.as_str()));
    }
    if fields.is_empty() {
        return Err(ClientError::MissingFormFields(method.as_str()));
    }

    let content = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields.iter())
        .finish();
    debug!("{method} data: {content}");

    request.push_header("Content-Type: application/x-www-form-urlencoded");
    request.push_header(format!("Content-Length: {}", content.len()));
    request.body = Some(content.into_bytes());
    Ok(())
}

/// Serialize a request into the exact bytes sent on the wire.
pub fn build_message(request: &HttpRequest) -> Vec<u8> {
    let target = &request.target;
    let request_line = format!(
        "{} {} {}/{}",
        request.method,
        target.path_and_query(),
        target.protocol,
        target.version
    );

    let body_len = request.body.as_ref().map_or(0, Vec::len);
    let mut message = Vec::with_capacity(request_line.len() + 64 * request.headers.len() + body_len);
    message.extend_from_slice(request_line.as_bytes());
    message.extend_from_slice(CRLF);
    for header in &request.headers {
        message.extend_from_slice(header.as_bytes());
        message.extend_from_slice(CRLF);
    }
    message.extend_from_slice(CRLF);
    if let Some(body) = &request.body {
        message.extend_from_slice(body);
    }
    message
}

/// Split raw response bytes into status, headers and body.
///
/// Never fails: a missing header terminator leaves the body empty and an
/// unreadable status line leaves the status at 0.
pub fn split_response(raw: Vec<u8>) -> HttpResponse {
    let (head, body) = match find(&raw, HEADER_TERMINATOR) {
        Some(at) => (&raw[..at], &raw[at + HEADER_TERMINATOR.len()..]),
        None => (&raw[..], &raw[raw.len()..]),
    };

    let head = String::from_utf8_lossy(head);
    let mut response = HttpResponse {
        body: String::from_utf8_lossy(body).into_owned(),
        ..HttpResponse::default()
    };

    for header in head.split("\r\n").filter(|line| !line.is_empty()) {
        debug!("HEADER: {header}");
        if response.headers.is_empty() {
            response.status = parse_status(header);
        } else if let Some(content_type) = parse_content_type(header) {
            response.content_type = content_type;
        }
        response.headers.push(header.to_string());
    }

    response.raw = raw;
    response
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Leading digits of the token after the first space, e.g. `404` from
/// `HTTP/1.1 404 Not Found`.
fn parse_status(status_line: &str) -> u16 {
    let Some((_, rest)) = status_line.split_once(' ') else {
        return 0;
    };
    let digits: String = rest
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(0)
}

fn parse_content_type(header: &str) -> Option<String> {
    let lower = header.to_ascii_lowercase();
    let value = lower.strip_prefix("content-type:")?;
    let media_type = value.split(';').next().unwrap_or_default();
    Some(media_type.trim().to_string())
}
