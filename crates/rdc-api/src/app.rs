use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use rdc_bus::MessageBus;
use tower_http::trace::TraceLayer;

use crate::auth::require_bearer_token;
use crate::handlers;
use crate::state::AppState;

pub fn build_app<B: MessageBus + 'static>(state: AppState<B>) -> Router {
    Router::new()
        .route("/lifecycle/execute", post(handlers::execute_lifecycle::<B>))
        .route("/references/find", post(handlers::find_reference::<B>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer_token::<B>,
        ))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rdc_bus::InMemoryBus;
    use rdc_core::{DispatchMode, ResourceDriverService};
    use rdc_driver::LocalHandler;
    use rdc_workspace::DriverFilesWorkspace;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_state(auth_token: Option<String>) -> AppState<InMemoryBus> {
        let dir = tempfile::tempdir().unwrap();
        // Leak the tempdir so it outlives the test's router; acceptable in
        // a short-lived test process.
        let path = dir.into_path();
        let bus = Arc::new(InMemoryBus::new());
        let workspace = Arc::new(DriverFilesWorkspace::new(path).unwrap());
        let handler: Arc<dyn rdc_driver::Handler> = Arc::new(LocalHandler::new());
        let messaging = Arc::new(rdc_core::LifecycleMessaging::new(bus.clone(), "completion").unwrap());
        let job_queue = Arc::new(rdc_bus::JobQueue::new(bus.clone(), "monitor"));
        let monitor = Arc::new(
            rdc_core::ExecutionMonitor::new(job_queue, handler.clone(), messaging)
                .await
                .unwrap(),
        );
        let service = Arc::new(
            ResourceDriverService::new(
                DispatchMode {
                    async_requests_enabled: false,
                    async_enabled: false,
                },
                workspace,
                handler,
                monitor,
                None,
            )
            .unwrap(),
        );
        AppState { service, auth_token }
    }

    fn empty_zip_body() -> serde_json::Value {
        use base64::Engine;
        use std::io::Cursor;
        let mut buf = Cursor::new(Vec::new());
        {
            let writer = zip::ZipWriter::<&mut Cursor<Vec<u8>>>::new(&mut buf);
            writer.finish().unwrap();
        }
        let driver_files = base64::engine::general_purpose::STANDARD.encode(buf.into_inner());
        serde_json::json!({
            "lifecycleName": "Install",
            "driverFiles": driver_files,
            "deploymentLocation": {"region": "eu"},
        })
    }

    #[tokio::test]
    async fn execute_lifecycle_returns_202() {
        let app = build_app(test_state(None).await);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/lifecycle/execute")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&empty_zip_body()).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn missing_bearer_token_is_rejected() {
        let app = build_app(test_state(Some("secret".to_string())).await);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/lifecycle/execute")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&empty_zip_body()).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_check_does_not_require_auth() {
        let app = build_app(test_state(Some("secret".to_string())).await);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
