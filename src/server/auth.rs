use crate::server::error::ApiError;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

/// Shared API key guarding the control routes
///
/// When no key is configured the middleware passes every request through.
#[derive(Debug, Clone, Default)]
pub struct ApiKey(Option<Arc<str>>);

impl ApiKey {
    pub fn new(key: Option<String>) -> Self {
        Self(key.filter(|k| !k.is_empty()).map(Arc::from))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }
}

/// Rejects requests whose `?api_key=` does not match the configured key
pub async fn api_key_middleware(State(key): State<ApiKey>, req: Request, next: Next) -> Response {
    let Some(expected) = key.0.as_deref() else {
        return next.run(req).await;
    };

    let provided = req.uri().query().and_then(extract_api_key);
    if provided.as_deref() == Some(expected) {
        next.run(req).await
    } else {
        tracing::warn!(path = %req.uri().path(), "request rejected, bad or missing api key");
        ApiError::Unauthorized.into_response()
    }
}

fn extract_api_key(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name == "api_key")
        .map(|(_, value)| value.into_owned())
}
