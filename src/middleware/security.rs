use axum::{
    extract::{Request, State},
    http::header::HOST,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::AppError, state::AppState};

/// Rejects requests whose `Host` is not in `TRUSTED_HOSTS`. A `*` entry
/// disables the check.
pub async fn enforce_trusted_hosts(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let trusted = &state.config.trusted_hosts;
    if trusted.iter().any(|host| host == "*") {
        return next.run(request).await;
    }

    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(strip_port)
        .unwrap_or_default();
    if trusted.iter().any(|allowed| allowed.eq_ignore_ascii_case(host)) {
        return next.run(request).await;
    }

    tracing::warn!(host = %host, "Rejected request from untrusted host");
    AppError::BadRequest("Invalid host header.".to_string()).into_response()
}

fn strip_port(host: &str) -> &str {
    let host = host.trim();
    if host.starts_with('[') {
        return host
            .split_once(']')
            .map(|(address, _)| address.trim_start_matches('['))
            .unwrap_or(host);
    }
    host.split_once(':').map(|(name, _)| name).unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    use super::{enforce_trusted_hosts, strip_port};
    use crate::{config::AppConfig, state::AppState};

    #[test]
    fn strips_ports() {
        assert_eq!(strip_port("localhost:8000"), "localhost");
        assert_eq!(strip_port("[::1]:8000"), "::1");
        assert_eq!(strip_port("api.example.com"), "api.example.com");
    }

    fn app(trusted_hosts: &[&str]) -> Router {
        let mut config = AppConfig::for_tests();
        config.trusted_hosts = trusted_hosts.iter().map(|host| host.to_string()).collect();
        let state = AppState::with_store(config, None);
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(from_fn_with_state(state.clone(), enforce_trusted_hosts))
            .with_state(state)
    }

    async fn status_for(app: Router, host: &str) -> StatusCode {
        app.oneshot(
            Request::builder()
                .uri("/")
                .header("host", host)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
    }

    #[tokio::test]
    async fn allows_listed_hosts_only() {
        assert_eq!(status_for(app(&["localhost"]), "localhost:8000").await, StatusCode::OK);
        assert_eq!(
            status_for(app(&["localhost"]), "evil.example.com").await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn wildcard_disables_the_check() {
        assert_eq!(status_for(app(&["*"]), "anything.example.com").await, StatusCode::OK);
    }
}
