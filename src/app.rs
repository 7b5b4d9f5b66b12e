use std::net::SocketAddr;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::{config::AppConfig, graphql, state::AppState};

pub fn build_app(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(graphql::graphql_routes())
        .route("/health", get(|| async { "ok" }));

    // production: everything else is the client bundle, routed client-side
    if let Some(dist) = &state.config.client_dist {
        let index = ServeFile::new(dist.join("index.html"));
        router = router.fallback_service(ServeDir::new(dist).not_found_service(index));
    }

    let cors = cors_layer(&state.config);
    router
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let Some(origin) = &config.cors_origin else {
        return CorsLayer::permissive();
    };
    match origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true),
        Err(e) => {
            tracing::warn!(error = %e, %origin, "invalid CORS_ORIGIN; allowing any origin");
            CorsLayer::permissive()
        }
    }
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.app_host, config.app_port).parse()?;

    tracing::info!("listening on http://{}{}", addr, graphql::GRAPHQL_PATH);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::client::api::{ADD_USER, ME};

    fn graphql_request(body: Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/graphql")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(AppState::fake());
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn header_token_authenticates_each_request() {
        let app = build_app(AppState::fake());

        let resp = app
            .clone()
            .oneshot(graphql_request(
                json!({
                    "query": ADD_USER,
                    "variables": {"username": "alice", "email": "alice@example.com", "password": "secret123"}
                }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        let token = body["data"]["addUser"]["token"].as_str().unwrap().to_string();

        let anonymous = json_body(
            app.clone()
                .oneshot(graphql_request(json!({"query": ME}), None))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(anonymous["errors"][0]["extensions"]["code"], "UNAUTHENTICATED");

        let me = json_body(
            app.oneshot(graphql_request(json!({"query": ME}), Some(&token)))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(me["data"]["me"]["username"], "alice");
        assert_eq!(me["data"]["me"]["savedBooks"], json!([]));
    }
}
