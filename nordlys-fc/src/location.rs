//! Observer location
//!
//! A position provider may be slow, refuse, or not exist at all. Scoring
//! never waits on it for longer than the configured timeout and falls back
//! to the reference location (Tromsø).

use async_trait::async_trait;
use nordlys_common::GeoPosition;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Default wait for a position fix
pub const DEFAULT_LOCATE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("location permission denied")]
    Denied,

    #[error("location not supported")]
    Unsupported,

    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Source of the observer position
#[async_trait]
pub trait PositionProvider: Send + Sync {
    async fn locate(&self) -> Result<GeoPosition, LocationError>;
}

/// Provider answering with a configured position
pub struct FixedPosition(pub GeoPosition);

#[async_trait]
impl PositionProvider for FixedPosition {
    async fn locate(&self) -> Result<GeoPosition, LocationError> {
        self.0
            .validate()
            .map_err(|e| LocationError::Unavailable(e.to_string()))?;
        Ok(self.0)
    }
}

/// Ask `provider` for a position, falling back to Tromsø
///
/// Denial, an unsupported platform, any error and a timeout all resolve to
/// [`GeoPosition::TROMSO`]; `None` means no provider exists.
pub async fn locate_or_default(
    provider: Option<&dyn PositionProvider>,
    timeout: Duration,
) -> GeoPosition {
    let Some(provider) = provider else {
        info!("No position provider, using Tromsø");
        return GeoPosition::TROMSO;
    };

    match tokio::time::timeout(timeout, provider.locate()).await {
        Ok(Ok(position)) => {
            info!(lat = position.lat, lon = position.lon, "Position located");
            position
        }
        Ok(Err(e)) => {
            warn!("{} - using Tromsø", e);
            GeoPosition::TROMSO
        }
        Err(_) => {
            warn!("No position within {:?} - using Tromsø", timeout);
            GeoPosition::TROMSO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Refusing(LocationError);

    #[async_trait]
    impl PositionProvider for Refusing {
        async fn locate(&self) -> Result<GeoPosition, LocationError> {
            Err(self.0.clone())
        }
    }

    struct Hanging;

    #[async_trait]
    impl PositionProvider for Hanging {
        async fn locate(&self) -> Result<GeoPosition, LocationError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(GeoPosition::new(0.0, 0.0))
        }
    }

    #[tokio::test]
    async fn test_fixed_position_is_used() {
        let abisko = GeoPosition::new(68.35, 18.83);
        let position =
            locate_or_default(Some(&FixedPosition(abisko)), DEFAULT_LOCATE_TIMEOUT).await;
        assert_eq!(position, abisko);
    }

    #[tokio::test]
    async fn test_errors_fall_back_to_tromso() {
        for error in [
            LocationError::Denied,
            LocationError::Unsupported,
            LocationError::Unavailable("no fix".to_string()),
        ] {
            let position =
                locate_or_default(Some(&Refusing(error)), DEFAULT_LOCATE_TIMEOUT).await;
            assert_eq!(position, GeoPosition::TROMSO);
        }
    }

    #[tokio::test]
    async fn test_invalid_fixed_position_falls_back() {
        let provider = FixedPosition(GeoPosition::new(95.0, 0.0));
        let position = locate_or_default(Some(&provider), DEFAULT_LOCATE_TIMEOUT).await;
        assert_eq!(position, GeoPosition::TROMSO);
    }

    #[tokio::test]
    async fn test_no_provider_is_tromso() {
        assert_eq!(
            locate_or_default(None, DEFAULT_LOCATE_TIMEOUT).await,
            GeoPosition::TROMSO
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back() {
        let position = locate_or_default(Some(&Hanging), DEFAULT_LOCATE_TIMEOUT).await;
        assert_eq!(position, GeoPosition::TROMSO);
    }
}
