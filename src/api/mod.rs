//! HTTP surface: router, shared state and handlers.

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::core::upload::ProfileImageService;

pub const UPLOAD_PATH: &str = "/api/profile/profileimage";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ProfileImageService>,
}

impl AppState {
    pub fn new(service: ProfileImageService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(UPLOAD_PATH, post(handlers::upload_profile_image))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
