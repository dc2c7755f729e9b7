use crate::proxy;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Request},
    routing::{get, post},
    Router,
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Numbers requests sequentially for the `x-request-id` header.
#[derive(Clone, Default)]
struct RequestCounter(Arc<AtomicU64>);

impl MakeRequestId for RequestCounter {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = self.0.fetch_add(1, Ordering::Relaxed);
        Some(RequestId::new(HeaderValue::from(id)))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/api/cmd", post(proxy::cmd_handler))
        .route("/api/isochrone", get(proxy::isochrone_handler))
        .route("/api/finder_chart", get(proxy::finder_chart_handler))
        .route("/health", get(proxy::health_handler))
        .route_service("/", proxy::index_page(&state.index_file))
        .nest_service("/static", proxy::static_files(&state.static_dir))
        .with_state(state.clone());

    if state.allow_any_origin {
        info!("CORS enabled for any origin");
        app = app.layer(CorsLayer::permissive());
    }

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(RequestCounter::default()))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id()),
    )
}
