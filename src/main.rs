use std::env;
use std::process::ExitCode;

use authclient::config::{load_config, print_schema};
use authclient::startup::build_client;
use authclient::utils::logger::init_logging;
use authclient::{ApiRequest, SessionEvent};
use http::Method;
use tracing::error;

const USAGE: &str = "usage: authclient [--schema] <METHOD> <PATH> [JSON_BODY]

Configuration is read from $AUTHCLIENT_CONFIG (default ./config.yaml).";

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.first().map(String::as_str) == Some("--schema") {
        return match print_schema() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Failed to render schema: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let (method, path, body) = match args.as_slice() {
        [method, path] => (method, path, None),
        [method, path, body] => (method, path, Some(body)),
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };
    let method = match Method::from_bytes(method.to_uppercase().as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            eprintln!("Invalid HTTP method '{}'\n\n{}", method, USAGE);
            return ExitCode::from(2);
        }
    };

    let config_path = env::var("AUTHCLIENT_CONFIG").unwrap_or_else(|_| "./config.yaml".into());
    let config = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let client = match build_client(&config).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut session_events = client.subscribe();

    let mut request = ApiRequest::new(method, client.url(path));
    if let Some(body) = body {
        request = match request.with_header("content-type", "application/json") {
            Ok(r) => r.with_body(body.clone()),
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        };
    }

    match client.execute(request).await {
        Ok(response) => {
            println!("{}", response.status);
            println!("{}", response.text());
            if let Ok(SessionEvent::Expired { reason }) = session_events.try_recv() {
                eprintln!("{}", reason);
            }
            if response.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("Request failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
