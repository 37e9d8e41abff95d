use axum::{Router, middleware, routing::put};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;

use filestore_observability::EventLog;

use crate::handlers;
use crate::middleware::{access_log, correlation};

/// Shared per-request state.
#[derive(Clone)]
pub struct AppState {
    pub event_log: Arc<EventLog>,
    pub storage: PathBuf,
}

/// Build the application router.
///
/// The wildcard route takes uploads on `PUT` and serves downloads on `GET`
/// (and `HEAD`) through `ServeDir` rooted at the storage directory.
pub fn build_router(state: AppState) -> Router {
    let routes = Router::new().route(
        "/{*path}",
        put(handlers::upload).get_service(ServeDir::new(state.storage.clone())),
    );
    apply_layers(routes, state)
}

/// Correlation is the outermost layer so that responses the router produces
/// without reaching a handler (404s included) still carry a request id, and
/// the access-log layer inside it still sees them. The panic-catching layer
/// sits between the routes and the access log: a panicking handler becomes
/// an ordinary 500 response, so both middleware observe it like any other
/// outcome.
fn apply_layers(routes: Router<AppState>, state: AppState) -> Router {
    routes
        .layer(CatchPanicLayer::new())
        .layer(middleware::from_fn_with_state(state.clone(), access_log))
        .layer(middleware::from_fn(correlation))
        .with_state(state)
}
