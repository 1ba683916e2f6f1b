use super::PositionUpdate;
use crate::geo;
use std::fmt;

/// Validation errors for a PositionUpdate
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    MissingAgentId,
    InvalidLatitude(f64),
    InvalidLongitude(f64),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingAgentId => write!(f, "agent id is required"),
            ValidationError::InvalidLatitude(lat) => {
                write!(f, "latitude must be within [-90, 90], got {}", lat)
            }
            ValidationError::InvalidLongitude(lon) => {
                write!(f, "longitude must be within [-180, 180], got {}", lon)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates a PositionUpdate before it reaches any store.
///
/// Validation rules:
/// - agent_id must be non-empty
/// - latitude within [-90, 90], finite
/// - longitude within [-180, 180], finite
pub fn validate(update: &PositionUpdate) -> Result<(), ValidationError> {
    if update.agent_id.is_empty() {
        return Err(ValidationError::MissingAgentId);
    }
    if !geo::valid_latitude(update.latitude) {
        return Err(ValidationError::InvalidLatitude(update.latitude));
    }
    if !geo::valid_longitude(update.longitude) {
        return Err(ValidationError::InvalidLongitude(update.longitude));
    }
    Ok(())
}
