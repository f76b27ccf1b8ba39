//! API Module
//!
//! Admin HTTP surface for inspecting and invalidating the cache.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Cache statistics
//! - `GET /entries/:key` - Inspect a live entry
//! - `PUT /entries` - Store a JSON value
//! - `DELETE /entries/:key` - Invalidate one key
//! - `DELETE /entries` - Clear the cache
//! - `POST /invalidate` - Invalidate every key matching a pattern

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
