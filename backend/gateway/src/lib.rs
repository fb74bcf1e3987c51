//! Pantry HTTP gateway.
//!
//! Accepts receipt uploads and meal-suggestion requests and hands them to the
//! [`ReceiptPipeline`](pantry_pipeline::ReceiptPipeline).

pub mod error;
pub mod health_api;
pub mod planning;
pub mod server;
pub mod uploads;

pub use error::ApiError;
pub use server::{build_router, start_server, GatewayState};
