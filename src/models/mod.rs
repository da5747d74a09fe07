//! Data models
//!
//! Domain entities cached by the wrappers, and the DTOs of the admin API.

pub mod entities;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use entities::{
    Alert, AlertSeverity, Crop, CropStatus, DashboardStats, Observation, Operation, Plot,
    Producer, Visit, VisitStatus,
};
pub use requests::InvalidateRequest;
pub use responses::{
    ClearResponse, DeleteResponse, EntryResponse, ErrorResponse, HealthResponse,
    InvalidateResponse, KeysResponse, StatsResponse,
};
