//! Request and Response models for the repository API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{QueryParams, UpdateByParamsRequest};
pub use responses::{
    CountResponse, DeleteResponse, HealthResponse, IdResponse, RecordsResponse, StatsResponse,
    UpdatedResponse,
};
