// Infrastructure layer - External dependencies and adapters
pub mod chunked_json;
pub mod config;
pub mod gateway_client;
pub mod http_response;
pub mod json_store;
pub mod simulation;
