//! API Module
//!
//! HTTP handlers and routing for the logo comparison REST API.
//!
//! # Endpoints
//! - `POST /compare` - Compare one original/replacement pair
//! - `POST /batch` - Compare a range or list of pairs
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
