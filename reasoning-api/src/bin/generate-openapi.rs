//! OpenAPI spec generator.
//!
//! Usage:
//!   cargo run -p reasoning-api --bin generate-openapi --features openapi > openapi.json

use reasoning_api::ApiDoc;
use utoipa::OpenApi;

fn main() {
    let spec = ApiDoc::openapi();

    match serde_json::to_string_pretty(&spec) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize OpenAPI spec: {}", e);
            std::process::exit(1);
        }
    }
}
