//! Reverse geocoding collaborator.

use crate::error::ReceiveError;
use async_trait::async_trait;
use serde_json::Value;

/// Looks up a place description for coordinates in degrees
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Describe the location at `lat`, `lon`
    async fn search(&self, lat: f64, lon: f64) -> Result<Value, ReceiveError>;
}
