//! Dispatch demo
//!
//! Sends a couple of requests to httpbin.org with a logging delegate attached.
//! Run with `BUCKO_LOG_LEVEL=debug` for request-level detail.

use bucko_config::ConfigLoader;
use bucko_http::logging::init_logging;
use bucko_http::{Bucko, Endpoint, ErrorHandler, HttpError, HttpMethod, Parameters, RequestEcho};
use serde_json::json;
use std::sync::Arc;

enum HttpBin {
    Echo { message: String },
    Status { code: u16 },
}

impl Endpoint for HttpBin {
    fn base_url(&self) -> String {
        "https://httpbin.org".to_string()
    }

    fn path(&self) -> String {
        match self {
            HttpBin::Echo { .. } => "/anything".to_string(),
            HttpBin::Status { code } => format!("/status/{}", code),
        }
    }

    fn method(&self) -> HttpMethod {
        match self {
            HttpBin::Echo { .. } => HttpMethod::Post,
            HttpBin::Status { .. } => HttpMethod::Get,
        }
    }

    fn parameters(&self) -> Option<Parameters> {
        match self {
            HttpBin::Echo { message } => json!({ "message": message }).as_object().cloned(),
            HttpBin::Status { .. } => None,
        }
    }
}

struct PrintingDelegate;

impl ErrorHandler for PrintingDelegate {
    fn request_failed(&self, request: &RequestEcho, error: &HttpError) {
        eprintln!("delegate: {} failed: {}", request, error);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new().from_env()?;
    init_logging(&config.logging)?;

    let delegate = Arc::new(PrintingDelegate);
    let mut bucko = Bucko::with_config(&config.http)?;
    bucko.set_delegate(&delegate);

    let echo = bucko.send_with_completion(
        &HttpBin::Echo {
            message: "hello".to_string(),
        },
        |response| match response.value() {
            Some(body) => println!("echoed: {}", body["json"]),
            None => println!("echo failed: {}", response.description()),
        },
    );
    echo.await?;

    let teapot = bucko.send_json(&HttpBin::Status { code: 418 }).await?;
    println!("status endpoint: {}", teapot.description());

    Ok(())
}
