use std::sync::Arc;

use axum::Router;

use crate::main_lib::AppState;

mod proxy;
mod worker;

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(worker::router())
        .fallback(proxy::handle)
        .with_state(state)
}
