//! AWS Lambda handler for lump-sum calculation requests
//!
//! `POST` takes a calculation request and returns the requested cells;
//! `GET` is a liveness check. Supports Lambda Function URLs for direct HTTP access.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::Serialize;
use serde_json::json;

use lumpsum_model::{calculate, CalculationConfig, CalculationRequest};

/// Serialized straight from `body` so map keys keep their order
fn json_response<T: Serialize + ?Sized>(status: u16, body: &T) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type")
        .body(Body::Text(serde_json::to_string(body)?))?)
}

fn error_response(status: u16, message: &str) -> Result<Response<Body>, Error> {
    json_response(status, &json!({ "status": "error", "message": message }))
}

async fn handler(event: Request) -> Result<Response<Body>, Error> {
    match event.method().as_str() {
        "OPTIONS" => {
            return Ok(Response::builder()
                .status(200)
                .header("Access-Control-Allow-Origin", "*")
                .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
                .header("Access-Control-Allow-Headers", "Content-Type")
                .body(Body::Empty)?);
        }
        "GET" => return json_response(200, &json!({ "msg": "works" })),
        "POST" => {}
        other => return error_response(405, &format!("Method {} not allowed", other)),
    }

    let body_str = match event.body() {
        Body::Text(s) => s.clone(),
        Body::Binary(b) => String::from_utf8_lossy(b).to_string(),
        Body::Empty => "{}".to_string(),
    };

    let request: CalculationRequest = match serde_json::from_str(&body_str) {
        Ok(r) => r,
        Err(e) => return error_response(400, &format!("Invalid JSON: {}", e)),
    };

    let start = std::time::Instant::now();
    let config = CalculationConfig::from_env();
    let result = tokio::task::spawn_blocking(move || calculate(&request, &config)).await?;
    log::info!("Calculated request in {:?}", start.elapsed());

    match result {
        Ok(response) => json_response(200, &response),
        Err(e) => {
            log::error!("Calculation failed: {}", e);
            error_response(500, &e.to_string())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    run(service_fn(handler)).await
}
