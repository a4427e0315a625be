use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use mtl_chain::protocol::endpoints;

use crate::handler::{self, AppState};

/// Build the axum router with all node endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(handler::health_handler))
        .route(endpoints::ACCOUNTS, get(handler::accounts_handler))
        .route(endpoints::CONTRACT, get(handler::contract_handler))
        .route(endpoints::CALL, post(handler::call_handler))
        .route(endpoints::SEND, post(handler::send_handler))
        .route(endpoints::MINE, post(handler::mine_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
