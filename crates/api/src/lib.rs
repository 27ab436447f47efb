//! HTTP API: catalog routes, request/response mapping, process wiring.

pub mod app;
pub mod middleware;
