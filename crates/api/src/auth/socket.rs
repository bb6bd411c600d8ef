// WebSocket chat routes with handshake-time authentication
// Decision: Verification happens once, before the upgrade is accepted. A
// connection is either admitted with identity attached for its lifetime or
// refused outright; never admitted anonymously.
// Decision: Same TokenService as the HTTP middleware; no parallel verifier.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, Query, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use std::{collections::HashMap, net::SocketAddr, sync::Arc};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::error::AuthError;
use super::jwt::{AccessClaims, TokenService};
use super::middleware::{AuthState, FromRef};
use super::policy::{enforce, Policy};

/// State for the chat routes: auth plus the shared relay channel.
#[derive(Clone)]
pub struct ChatState {
    pub auth: AuthState,
    pub hub: broadcast::Sender<String>,
}

impl ChatState {
    pub fn new(auth: AuthState) -> Self {
        let (hub, _) = broadcast::channel(256);
        Self { auth, hub }
    }
}

impl FromRef<ChatState> for AuthState {
    fn from_ref(input: &ChatState) -> Self {
        input.auth.clone()
    }
}

/// Create chat routes
pub fn routes(state: ChatState) -> Router {
    Router::new()
        .route("/chat/ws", get(chat_ws))
        .route("/chat/business/ws", get(business_chat_ws))
        .with_state(state)
}

/// GET /chat/ws - Live chat socket (any authenticated customer)
pub async fn chat_ws(
    State(state): State<ChatState>,
    Query(params): Query<HashMap<String, String>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let claims = match authenticate_handshake(&state.auth.tokens, &headers, &params) {
        Ok(claims) => claims,
        Err(err) => return refuse_handshake(err, addr, "/chat/ws"),
    };

    admit(ws, state, claims)
}

/// GET /chat/business/ws - Dedicated support channel for business accounts
pub async fn business_chat_ws(
    State(state): State<ChatState>,
    Query(params): Query<HashMap<String, String>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let claims = match authenticate_handshake(&state.auth.tokens, &headers, &params) {
        Ok(claims) => claims,
        Err(err) => return refuse_handshake(err, addr, "/chat/business/ws"),
    };

    if let Err(err) = enforce(&[Policy::BusinessOnly], &claims, "/chat/business/ws") {
        return refuse_handshake(err, addr, "/chat/business/ws");
    }

    admit(ws, state, claims)
}

/// Extract and verify the access token from a connection attempt.
///
/// Browsers cannot attach cookies or custom headers to every WebSocket
/// client, so the token rides in the `Authorization` header when possible
/// and the `token` query parameter otherwise.
pub fn authenticate_handshake(
    tokens: &TokenService,
    headers: &HeaderMap,
    params: &HashMap<String, String>,
) -> Result<AccessClaims, AuthError> {
    if let Some(auth_str) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return tokens.verify_access(token);
        }
    }

    match params.get("token") {
        Some(token) => tokens.verify_access(token),
        None => Err(AuthError::TokenMissing),
    }
}

/// Refuse the upgrade with a machine-readable payload so the client can tell
/// bad credentials from a transport failure, and audit-log the attempt.
fn refuse_handshake(err: AuthError, addr: SocketAddr, path: &str) -> Response {
    let connection_id = Uuid::now_v7();
    tracing::warn!(
        %connection_id,
        remote = %addr,
        code = err.code(),
        path,
        "chat handshake refused"
    );
    err.into_response()
}

fn admit(ws: WebSocketUpgrade, state: ChatState, claims: AccessClaims) -> Response {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| chat_session(socket, Arc::new(claims), hub))
}

/// One admitted connection. The verified claims live as long as the
/// connection; messages are not re-verified because the transport drops
/// idle connections well inside the token lifetime.
async fn chat_session(socket: WebSocket, claims: Arc<AccessClaims>, hub: broadcast::Sender<String>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = hub.subscribe();

    tracing::info!(subject = %claims.sub, "chat connection admitted");

    // Forward relayed messages to this client
    let send_task = tokio::spawn(async move {
        while let Ok(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    let display_name = format!("{} {}", claims.first_name, claims.last_name);
    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Text(text) = msg {
            let _ = hub.send(format!("{display_name}: {text}"));
        }
    }

    send_task.abort();
    tracing::info!(subject = %claims.sub, "chat connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::config::AuthConfig;
    use crate::storage::{AccountType, InMemoryUserStore, UserRow};
    use axum::{body::Body, extract::connect_info::MockConnectInfo, http::Request, http::StatusCode};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::Value;
    use std::time::Duration as StdDuration;
    use tower::ServiceExt;

    fn test_state() -> ChatState {
        let config = AuthConfig {
            access_secret: "socket-access-secret".to_string(),
            refresh_secret: "socket-refresh-secret".to_string(),
            access_ttl: StdDuration::from_secs(3600),
            refresh_ttl: StdDuration::from_secs(604_800),
            secure_cookies: false,
        };
        ChatState::new(AuthState::new(config, Arc::new(InMemoryUserStore::new())))
    }

    fn user(account_type: AccountType) -> UserRow {
        let now = Utc::now();
        UserRow {
            id: Uuid::now_v7(),
            email: "chat@veridian.test".to_string(),
            password_hash: "$argon2id$fake".to_string(),
            first_name: "Cleo".to_string(),
            last_name: "Chatham".to_string(),
            is_admin: false,
            account_type,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn expired_token(state: &ChatState) -> String {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: Uuid::now_v7(),
            email: "chat@veridian.test".to_string(),
            first_name: "Cleo".to_string(),
            last_name: "Chatham".to_string(),
            is_admin: false,
            account_type: AccountType::Personal,
            token_type: "access".to_string(),
            iat: now - 7200,
            exp: now - 1,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(state.auth.config.access_secret.as_bytes()),
        )
        .unwrap()
    }

    fn test_app(state: ChatState) -> Router {
        routes(state).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))))
    }

    fn upgrade_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("connection", "upgrade")
            .header("upgrade", "websocket")
            .header("sec-websocket-version", "13")
            .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
            .body(Body::empty())
            .unwrap()
    }

    async fn body_code(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        json["code"].as_str().unwrap_or_default().to_string()
    }

    #[test]
    fn test_handshake_token_sources() {
        let state = test_state();
        let token = state
            .auth
            .tokens
            .issue_access(&user(AccountType::Personal))
            .unwrap()
            .token;

        // Bearer header
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        let claims =
            authenticate_handshake(&state.auth.tokens, &headers, &HashMap::new()).unwrap();
        assert_eq!(claims.email, "chat@veridian.test");

        // Query parameter fallback
        let params = HashMap::from([("token".to_string(), token)]);
        assert!(authenticate_handshake(&state.auth.tokens, &HeaderMap::new(), &params).is_ok());

        // Nothing at all
        let err = authenticate_handshake(&state.auth.tokens, &HeaderMap::new(), &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenMissing));
    }

    #[tokio::test]
    async fn test_upgrade_admitted_with_valid_token() {
        let state = test_state();
        let token = state
            .auth
            .tokens
            .issue_access(&user(AccountType::Personal))
            .unwrap()
            .token;

        let response = test_app(state)
            .oneshot(upgrade_request(&format!("/chat/ws?token={token}")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
    }

    #[tokio::test]
    async fn test_upgrade_refused_with_expired_token() {
        let state = test_state();
        let stale = expired_token(&state);

        let response = test_app(state)
            .oneshot(upgrade_request(&format!("/chat/ws?token={stale}")))
            .await
            .unwrap();

        // Refused at the handshake with a distinguishable payload, never
        // admitted-then-unauthenticated
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_code(response).await, "TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn test_upgrade_refused_without_token() {
        let state = test_state();
        let response = test_app(state)
            .oneshot(upgrade_request("/chat/ws"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_code(response).await, "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn test_business_channel_gated_by_account_type() {
        let state = test_state();
        let personal = state
            .auth
            .tokens
            .issue_access(&user(AccountType::Personal))
            .unwrap()
            .token;
        let business = state
            .auth
            .tokens
            .issue_access(&user(AccountType::Business))
            .unwrap()
            .token;

        let response = test_app(state.clone())
            .oneshot(upgrade_request(&format!(
                "/chat/business/ws?token={personal}"
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_code(response).await, "FORBIDDEN");

        let response = test_app(state)
            .oneshot(upgrade_request(&format!(
                "/chat/business/ws?token={business}"
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
    }
}
