use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;

pub const GENERIC_ERROR_MESSAGE: &str = "Internal server error";

type Panic = Box<dyn Any + Send + 'static>;

/// Last line of defence: a handler panic becomes a logged 500.
pub fn catch_panic_layer() -> CatchPanicLayer<fn(Panic) -> Response> {
    CatchPanicLayer::custom(catch_panic as fn(Panic) -> Response)
}

fn catch_panic(err: Panic) -> Response {
    let message = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic type");

    tracing::error!("❌ Unexpected server error: {}", message);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": GENERIC_ERROR_MESSAGE })),
    )
        .into_response()
}
