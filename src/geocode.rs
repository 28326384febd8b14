// Reverse geocoding against a Photon instance
//
// Photon answers GeoJSON-like payloads. Every property is optional, so the
// response model defaults everything and place composition works from
// whatever attributes came back.

use itertools::Itertools;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Deserialize;

use crate::errors::BonusdriveError;

const GEOCODER_USER_AGENT: &str = concat!("bonusdrive/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
pub struct PhotonResponse {
    #[serde(default)]
    pub features: Vec<PhotonFeature>,
}

#[derive(Debug, Deserialize)]
pub struct PhotonFeature {
    #[serde(default)]
    pub properties: PhotonProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PhotonProperties {
    pub name: Option<String>,
    pub street: Option<String>,
    pub housenumber: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

pub struct PhotonClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl PhotonClient {
    pub fn new(base_url: &str) -> Result<Self, BonusdriveError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let http = reqwest::blocking::Client::builder()
            .user_agent(GEOCODER_USER_AGENT)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<PhotonResponse, BonusdriveError> {
        let response = self
            .http
            .get(format!("{}/reverse", self.base_url))
            .query(&[("lat", latitude), ("lon", longitude)])
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(BonusdriveError::UpstreamRejected {
                status: status.as_u16(),
                context: "reverse geocoding".to_string(),
            });
        }
        response
            .json()
            .map_err(|e| BonusdriveError::MalformedResponse {
                context: "reverse geocoding".to_string(),
                reason: e.to_string(),
            })
    }
}

/// Builds a display string from the first feature of a geocoding response.
///
/// The string is `{name | street housenumber}, {city}, {country}` with empty
/// parts dropped. Returns `None` when no feature carries a usable attribute.
pub fn compose_place(response: &PhotonResponse) -> Option<String> {
    let properties = &response.features.first()?.properties;
    let name = non_empty(&properties.name);
    let primary = if name.is_empty() {
        [
            non_empty(&properties.street),
            non_empty(&properties.housenumber),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .join(" ")
    } else {
        name.to_string()
    };

    let composed = [
        primary.as_str(),
        non_empty(&properties.city),
        non_empty(&properties.country),
    ]
    .iter()
    .filter(|part| !part.is_empty())
    .join(", ");

    if composed.is_empty() {
        None
    } else {
        Some(composed)
    }
}

/// Formats a coordinate pair for display when no geocoder is configured,
/// e.g. `N48.137154, E11.576124`.
pub fn format_coordinates(latitude: f64, longitude: f64) -> String {
    let ns = if latitude < 0.0 { 'S' } else { 'N' };
    let ew = if longitude < 0.0 { 'W' } else { 'E' };
    format!("{ns}{:.6}, {ew}{:.6}", latitude.abs(), longitude.abs())
}

fn non_empty(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or("")
}
