//! HTTP API
//!
//! Thin axum layer over the betting and query services, plus a WebSocket
//! feed of round events.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod websocket;

pub use server::ApiServer;
