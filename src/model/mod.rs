// Typed domain model for the upstream JSON payloads
//
// Required fields are plain struct fields so a missing one fails the decode;
// fields the service may omit are Option and default to absent.

mod badge;
mod scores;
mod trip;

pub use badge::{Badge, BadgeLevel, BadgeType};
pub use scores::{ScoreEntry, Scores, TripScores};
pub(crate) use scores::RawScoreEntry;
pub use trip::{EventData, Events, SnappedGeometry, Trip, User, Vehicle};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::BonusdriveError;

/// Decodes a raw payload into its typed model, naming the endpoint in the
/// error when the upstream contract is violated.
pub(crate) fn decode_value<T: DeserializeOwned>(
    value: Value,
    context: &str,
) -> Result<T, BonusdriveError> {
    serde_json::from_value(value).map_err(|e| BonusdriveError::MalformedResponse {
        context: context.to_string(),
        reason: e.to_string(),
    })
}
