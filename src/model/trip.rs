use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TripScores;

/// One recorded drive from the logbook.
///
/// Fields the upstream service always delivers are plain; fields it may
/// omit (expansions, diagnostics, enrichment results) are `Option`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    /// Violation events, present only when fetched with the events expansion
    pub events: Option<Events>,
    pub trip_id: String,
    /// Trip start, UTC epoch milliseconds
    pub trip_start_timestamp_utc: i64,
    /// Trip end, UTC epoch milliseconds
    pub trip_end_timestamp_utc: i64,
    /// Trip start in local wall-clock time, epoch milliseconds
    pub trip_start_timestamp_local: i64,
    /// Trip end in local wall-clock time, epoch milliseconds
    pub trip_end_timestamp_local: i64,
    pub trip_processing_end_timestamp_utc: i64,
    /// Distance driven in kilometers
    pub kilometers: f64,
    /// Average speed in km/h
    pub avg_kilometers_per_hour: f64,
    /// Maximum speed in km/h
    pub max_kilometers_per_hour: f64,
    /// Driving time in seconds
    pub seconds: i64,
    /// Idling time in seconds
    pub seconds_of_idling: i64,
    pub time_zone_offset_millis: i64,
    pub trip_status: String,
    pub pois: Option<Vec<Value>>,
    pub transport_mode: String,
    pub transport_mode_message_key: String,
    pub transport_mode_reason: Option<String>,
    /// Polyline-encoded route, precision 1e6
    pub geometry: String,
    pub snapped_geometry: Vec<SnappedGeometry>,
    pub reconstructed_start_geometry: String,
    pub trip_start_status: String,
    pub verified: bool,
    pub has_alerts: bool,
    pub alerts: Option<Vec<Value>>,
    pub vehicle: Vehicle,
    pub user: User,
    pub device: Option<String>,
    pub trip_scores: TripScores,
    pub mil_status: Option<String>,
    pub dtc_count: Option<String>,
    pub trip_score: f64,
    pub events_count: i64,
    pub private: bool,
    #[serde(rename = "tripUUID")]
    pub trip_uuid: String,
    pub purpose: String,

    // Enrichment attached after geometry decoding; absent on plain fetches
    #[serde(rename = "decoded_geometry", default)]
    pub decoded_geometry: Option<Vec<(f64, f64)>>,
    #[serde(rename = "start_point_string", default)]
    pub start_point_string: Option<String>,
    #[serde(rename = "end_point_string", default)]
    pub end_point_string: Option<String>,
}

/// Violation events grouped by kind, keyed upstream in PascalCase.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Events {
    #[serde(default)]
    pub multi_level_acceleration_violation: Option<Vec<EventData>>,
    #[serde(default)]
    pub multi_level_braking_violation: Option<Vec<EventData>>,
    #[serde(default)]
    pub multi_level_cornering_violation: Option<Vec<EventData>>,
    #[serde(default)]
    pub posted_speed_limit_violation: Option<Vec<EventData>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    #[serde(rename = "timeStamp")]
    pub time_stamp: i64,
    /// Violation severity level
    pub level: i64,
    /// Speed at the event in km/h
    pub km_per_hour: f64,
    pub average_km_per_hour: Option<f64>,
    pub geometry: String,
    pub seconds_of_driving: Option<f64>,
    /// Posted limit in km/h, speeding violations only
    pub km_speed_limit: Option<f64>,
    pub time_zone_offset_millis: i64,
    pub transport_mode: String,
}

/// A map-matched slice of the recorded route.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnappedGeometry {
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    pub geometry: String,
    pub confidence: f64,
    pub unsnappable_ratio: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub vehicle_id: String,
    pub make: String,
    pub model: String,
    pub nickname: Option<String>,
    pub year: Option<i32>,
    pub plate: Option<String>,
    pub avatar: Option<String>,
    pub account_id: Option<String>,
    pub account_number: Option<String>,
    pub policy_inception_date: Option<i64>,
    pub policy_start_date: Option<i64>,
    pub extra_account_id: Option<String>,
    pub extra_account_number: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub public_display_name: String,
    pub avatar: Option<String>,
    pub shared_information: Option<String>,
    pub associated_users: Option<Vec<Value>>,
    pub account: Option<String>,
    pub user_role: Option<String>,
    pub account_role: Option<String>,
    pub first_name: String,
    pub last_name: String,
}
