// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod api;
pub mod availability;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod guardrail;
pub mod intent;
pub mod metrics;
pub mod narrative;
pub mod respond;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::availability::{BestEffort, Unavailable};
pub use crate::catalog::{Catalog, CatalogHandle, ContentKind, ContentRecord};
pub use crate::intent::AnalyticIntent;
