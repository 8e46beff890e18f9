//! Delivery of object batches to the tracking service

pub mod client;
pub mod payload;

pub use client::HttpIngestClient;
pub use payload::{Classification, ClassificationSuggestion, IngestBatch, ObjectRecord, RadarPoint, RemovalRecord};

use async_trait::async_trait;

use crate::core::error::DeliveryError;

/// Destination for per-tick batches.
///
/// A send is attempted once. Callers log failures and move on to the next
/// tick; nothing is retried or buffered.
#[async_trait]
pub trait IngestSink: Send + Sync {
    async fn send(&self, batch: &IngestBatch) -> Result<(), DeliveryError>;

    /// Sent once per object, after a batch carrying it was accepted
    async fn suggest(&self, _suggestion: &ClassificationSuggestion) -> Result<(), DeliveryError> {
        Ok(())
    }

    async fn radar_point(&self, _point: &RadarPoint) -> Result<(), DeliveryError> {
        Ok(())
    }
}
