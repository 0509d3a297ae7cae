//! Shared domain crate for the receipt recognition gateway: data model,
//! error taxonomy, configuration, the C1 engine clients, the C2 persistence
//! facade, the C3 event publisher, the job queue, and the image/QR
//! primitives C5 drives through its recognition pipeline.

pub mod clients;
pub mod config;
pub mod error;
pub mod events;
pub mod image_ops;
pub mod persistence;
pub mod qr;
pub mod queue;
pub mod types;

pub use config::AppConfig;
pub use error::{GatewayError, Result};
pub use events::EventPublisher;
pub use queue::JobQueue;
