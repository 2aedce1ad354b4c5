// Application layer - engine, registry and the services around them
pub mod chart_registry;
pub mod chart_store;
pub mod effects;
pub mod engine;
pub mod heartbeat;
pub mod ingestion;
pub mod retention;
pub mod subscription;
pub mod workspace_service;
