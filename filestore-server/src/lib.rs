pub mod app;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod middleware;

pub use app::{AppState, build_router};
pub use error::ApiError;
pub use lifecycle::{HttpServer, LifecycleState};
