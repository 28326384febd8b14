// Library interface for bonusdrive
// This allows integration tests to access internal modules

pub mod client;
pub mod config;
pub mod errors;
pub mod geocode;
pub mod geometry;
pub mod model;
pub mod print;

// Re-export commonly used types
pub use client::{BonusdriveClient, Credentials, Session};
pub use errors::BonusdriveError;
pub use model::{Badge, BadgeLevel, BadgeType, ScoreEntry, Scores, Trip, TripScores};
