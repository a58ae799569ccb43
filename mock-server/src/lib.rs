use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const CLIENT_ID: &str = "tinyweb-client";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub code: String,
    pub redirect_uri: String,
    pub client_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: Uuid,
    pub token_type: String,
    pub expires_in: u64,
}

/// What an issued access token was granted for.
#[derive(Clone, Debug)]
pub struct Grant {
    pub client_id: String,
    pub code: String,
}

pub type Tokens = Arc<RwLock<HashMap<Uuid, Grant>>>;

pub fn app() -> Router {
    let tokens: Tokens = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/authtest/GetApplicationEndpoint", get(application_endpoint))
        .route("/oauth/openid", get(openid_metadata))
        .route("/oauth/token", post(issue_token))
        .route("/oauth/userinfo", get(userinfo))
        .route("/private/hello", get(hello))
        .with_state(tokens)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

/// `http://<Host header>`, so advertised URLs point back at this server.
fn base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}

async fn application_endpoint(headers: HeaderMap) -> Json<Value> {
    let base = base_url(&headers);
    Json(json!({
        "openid": format!("{base}/oauth/openid"),
        "clientId": CLIENT_ID,
    }))
}

async fn openid_metadata(headers: HeaderMap) -> Json<Value> {
    let base = base_url(&headers);
    Json(json!({
        "issuer": base,
        "authorization_endpoint": format!("{base}/oauth/authorization"),
        "token_endpoint": format!("{base}/oauth/token"),
        "userinfo_endpoint": format!("{base}/oauth/userinfo"),
        "scopes_supported": ["openid"],
    }))
}

async fn issue_token(
    State(tokens): State<Tokens>,
    Form(input): Form<TokenRequest>,
) -> Result<Json<TokenResponse>, (StatusCode, Json<Value>)> {
    if input.grant_type != "authorization_code" {
        return Err(oauth_error(StatusCode::BAD_REQUEST, "unsupported_grant_type"));
    }
    if input.client_id != CLIENT_ID {
        return Err(oauth_error(StatusCode::UNAUTHORIZED, "invalid_client"));
    }
    if !is_redirect_uri(&input.redirect_uri) {
        return Err(oauth_error(StatusCode::BAD_REQUEST, "invalid_request"));
    }

    let access_token = Uuid::new_v4();
    tokens.write().await.insert(
        access_token,
        Grant {
            client_id: input.client_id,
            code: input.code,
        },
    );
    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: 3600,
    }))
}

async fn userinfo(
    State(tokens): State<Tokens>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    let grant = authorize(&tokens, &headers).await?;
    Ok(Json(json!({
        "sub": grant.code,
        "name": "Tiny Web",
        "client_id": grant.client_id,
    })))
}

async fn hello(State(tokens): State<Tokens>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    authorize(&tokens, &headers).await?;
    Ok(Json(json!({ "message": "Hello" })))
}

async fn authorize(tokens: &Tokens, headers: &HeaderMap) -> Result<Grant, StatusCode> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .and_then(|t| Uuid::parse_str(t.trim()).ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    tokens
        .read()
        .await
        .get(&token)
        .cloned()
        .ok_or(StatusCode::UNAUTHORIZED)
}

/// An absolute `http` or `https` URL with a host.
fn is_redirect_uri(uri: &str) -> bool {
    uri.strip_prefix("https://")
        .or_else(|| uri.strip_prefix("http://"))
        .is_some_and(|rest| !rest.is_empty() && !rest.starts_with('/'))
}

fn oauth_error(status: StatusCode, error: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": error })))
}
