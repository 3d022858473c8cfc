//! Read-only status surface: fixed GET paths over the engine's query
//! interface, returned as JSON. Pure read path; never touches the proxies'
//! rendezvous machinery. Errors surface as HTTP 500 with the error text as
//! body.

use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Accessors the engine (or whatever stands in for it) exposes to the status
/// surface. Each call maps to exactly one route.
pub trait EngineQuery: Send + Sync + 'static {
    fn stats(&self) -> Value;
    fn participants(&self) -> Result<Value, String>;
    fn event(&self, id: &str) -> Result<Value, String>;
    fn block(&self, index: u64) -> Result<Value, String>;
    fn round(&self, index: u64) -> Result<Value, String>;
    fn last_round(&self) -> Result<Value, String>;
}

pub struct Service {
    bind_addr: String,
    engine: Arc<dyn EngineQuery>,
}

impl Service {
    pub fn new(bind_addr: impl Into<String>, engine: Arc<dyn EngineQuery>) -> Self {
        Self { bind_addr: bind_addr.into(), engine }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/stats", get(get_stats))
            .route("/participants", get(get_participants))
            .route("/event/:id", get(get_event))
            .route("/block/:index", get(get_block))
            .route("/round/:index", get(get_round))
            .route("/lastround", get(get_last_round))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(Extension(self.engine.clone())),
            )
    }

    pub async fn serve(self) -> anyhow::Result<()> {
        let addr: SocketAddr = self.bind_addr.parse()?;
        info!("status service serving on {}", addr);
        axum::Server::bind(&addr)
            .serve(self.router().into_make_service())
            .await?;
        Ok(())
    }
}

fn json_or_500(res: Result<Value, String>) -> Response {
    match res {
        Ok(v) => Json(v).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e).into_response(),
    }
}

async fn get_stats(Extension(engine): Extension<Arc<dyn EngineQuery>>) -> Response {
    Json(engine.stats()).into_response()
}

async fn get_participants(Extension(engine): Extension<Arc<dyn EngineQuery>>) -> Response {
    json_or_500(engine.participants())
}

async fn get_event(
    Path(id): Path<String>,
    Extension(engine): Extension<Arc<dyn EngineQuery>>,
) -> Response {
    json_or_500(engine.event(&id))
}

async fn get_block(
    Path(index): Path<u64>,
    Extension(engine): Extension<Arc<dyn EngineQuery>>,
) -> Response {
    json_or_500(engine.block(index))
}

async fn get_round(
    Path(index): Path<u64>,
    Extension(engine): Extension<Arc<dyn EngineQuery>>,
) -> Response {
    json_or_500(engine.round(index))
}

async fn get_last_round(Extension(engine): Extension<Arc<dyn EngineQuery>>) -> Response {
    json_or_500(engine.last_round())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    struct FakeEngine;

    impl EngineQuery for FakeEngine {
        fn stats(&self) -> Value {
            json!({"last_block_index": 9, "consensus_rounds": 4})
        }
        fn participants(&self) -> Result<Value, String> {
            Ok(json!(["alice", "bob"]))
        }
        fn event(&self, id: &str) -> Result<Value, String> {
            Err(format!("no such event: {}", id))
        }
        fn block(&self, index: u64) -> Result<Value, String> {
            if index <= 9 {
                Ok(json!({"index": index, "round_received": 1, "transactions": []}))
            } else {
                Err(format!("no such block: {}", index))
            }
        }
        fn round(&self, index: u64) -> Result<Value, String> {
            Ok(json!({"index": index, "witnesses": []}))
        }
        fn last_round(&self) -> Result<Value, String> {
            Ok(json!(4))
        }
    }

    fn router() -> Router {
        Service::new("127.0.0.1:0", Arc::new(FakeEngine)).router()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn stats_returns_engine_snapshot() {
        let response = router()
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        assert_eq!(v["last_block_index"], 9);
    }

    #[tokio::test]
    async fn block_path_parses_index() {
        let response = router()
            .oneshot(Request::builder().uri("/block/5").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        assert_eq!(v["index"], 5);
    }

    #[tokio::test]
    async fn accessor_error_becomes_500_with_text() {
        let response = router()
            .oneshot(Request::builder().uri("/block/10").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&bytes[..], &b"no such block: 10"[..]);
    }
}
