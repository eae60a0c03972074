use axum::Json;
use serde_json::{Value, json};

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "app": litmeta_core::APP_NAME,
        "version": litmeta_core::VERSION,
    }))
}
