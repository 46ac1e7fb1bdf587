//! Request and Response models for the comparison API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{BatchRequest, CompareRequest};
pub use responses::{BatchResponse, HealthResponse, MissingTeam, PairResponse, StatsResponse};
