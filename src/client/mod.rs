// API client for the BonusDrive mobile-app endpoints

mod auth;
mod session;

pub use session::Session;

use std::sync::Arc;

use chrono::NaiveDate;
use log::{debug, warn};
use reqwest::blocking::Response;
use reqwest::cookie::Jar;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url, redirect};
use serde_json::{Value, json};

use crate::errors::BonusdriveError;
use crate::geocode::{self, PhotonClient};
use crate::geometry;
use crate::model::{self, Badge, RawScoreEntry, ScoreEntry, Trip};

// The upstream only answers requests that look like its mobile app.
const MOBILE_APP_VERSION: &str = "4.1.0";
const CAS_USER_AGENT: &str = "Dalvik/2.1.0 (Linux; U; Android 13; Pixel 5 Build/TQ3A.230901.001)";
const API_USER_AGENT: &str = "okhttp/4.12.0";

const DATE_FORMAT: &str = "%Y-%m-%d";
const BADGE_PERIODS: [&str; 2] = ["daily", "monthly"];

/// Login credentials used when a ticket-granting ticket must be issued.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Blocking client for the driving-score service.
///
/// Holds the session state and the cookie jar shared by every request.
/// All endpoint calls require a prior [`authenticate`](Self::authenticate);
/// an expired session is recovered transparently, with the failed request
/// replayed exactly once.
pub struct BonusdriveClient {
    base_url: String,
    origin: Url,
    credentials: Option<Credentials>,
    photon: Option<PhotonClient>,
    http: reqwest::blocking::Client,
    jar: Arc<Jar>,
    session: Session,
}

impl BonusdriveClient {
    /// Creates an unauthenticated client.
    ///
    /// `ticket_granting_ticket` may carry a ticket persisted from an
    /// earlier run; credentials are only needed once the service stops
    /// accepting it. Without `photon_url`, place names fall back to
    /// formatted coordinates.
    pub fn new(
        base_url: &str,
        credentials: Option<Credentials>,
        ticket_granting_ticket: Option<String>,
        photon_url: Option<&str>,
    ) -> Result<Self, BonusdriveError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let origin = Url::parse(&base_url).map_err(|e| BonusdriveError::InvalidArgument {
            field: "base_url".to_string(),
            reason: e.to_string(),
        })?;
        let jar = Arc::new(Jar::default());
        // Redirects stay disabled: the ticket redemption step answers with
        // a redirect whose cookies must be captured, and no API endpoint
        // redirects on the happy path.
        let http = reqwest::blocking::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .redirect(redirect::Policy::none())
            .build()?;
        let photon = photon_url.map(PhotonClient::new).transpose()?;
        Ok(Self {
            base_url,
            origin,
            credentials,
            photon,
            http,
            jar,
            session: Session::new(ticket_granting_ticket),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Most recent trips, unwrapped from their envelopes and decoded.
    pub fn list_trips(&mut self, amount: usize, offset: usize) -> Result<Vec<Trip>, BonusdriveError> {
        self.list_trips_raw(amount, offset)?
            .into_iter()
            .map(|item| {
                let trip = unwrap_trip_envelope(item)?;
                model::decode_value(trip, "logbook trips")
            })
            .collect()
    }

    /// Most recent trips as delivered: a list of `{"trip": {...}}` items
    /// sorted by descending local start date.
    pub fn list_trips_raw(
        &mut self,
        amount: usize,
        offset: usize,
    ) -> Result<Vec<Value>, BonusdriveError> {
        self.authenticated_user()?;
        self.with_reauth(|c| c.fetch_trips(amount, offset))
    }

    /// Identifier of the first vehicle on the account. Accounts with more
    /// than one vehicle are not supported; only the first is addressed.
    pub fn resolve_vehicle_id(&mut self) -> Result<String, BonusdriveError> {
        self.authenticated_user()?;
        self.with_reauth(|c| c.fetch_vehicle_id())
    }

    /// Badges for one scoring period, `"daily"` or `"monthly"`.
    pub fn list_badges(
        &mut self,
        period: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<Badge>, BonusdriveError> {
        self.list_badges_raw(period, start_date, end_date)?
            .into_iter()
            .map(|badge| model::decode_value(badge, "badges"))
            .collect()
    }

    pub fn list_badges_raw(
        &mut self,
        period: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<Value>, BonusdriveError> {
        self.authenticated_user()?;
        validate_period(period)?;
        validate_date_range(start_date, end_date)?;
        self.with_reauth(|c| c.fetch_badges(period, start_date, end_date))
    }

    /// Per-day scores in the date range, in upstream order. Days without
    /// computed scores normalize to an empty list, not an error.
    pub fn list_scores(
        &mut self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<ScoreEntry>, BonusdriveError> {
        self.list_scores_raw(start_date, end_date)?
            .into_iter()
            .map(|entry| {
                model::decode_value::<RawScoreEntry>(entry, "scores").map(ScoreEntry::from)
            })
            .collect()
    }

    pub fn list_scores_raw(
        &mut self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<Value>, BonusdriveError> {
        self.authenticated_user()?;
        validate_date_range(start_date, end_date)?;
        self.with_reauth(|c| c.fetch_scores(start_date, end_date))
    }

    /// Fully expanded record of one trip, or of the most recent trip when
    /// no id is given. Geometry is decoded and, where possible, the start
    /// and end points are resolved to place names.
    pub fn trip_details(&mut self, trip_id: Option<&str>) -> Result<Trip, BonusdriveError> {
        let payload = self.trip_details_raw(trip_id)?;
        model::decode_value(payload, "trip details")
    }

    /// Raw twin of [`trip_details`](Self::trip_details); the enrichment
    /// lands in the payload under `decoded_geometry`, `start_point_string`
    /// and `end_point_string`.
    pub fn trip_details_raw(&mut self, trip_id: Option<&str>) -> Result<Value, BonusdriveError> {
        self.authenticated_user()?;
        let trip_id = match trip_id {
            Some(id) => id.to_string(),
            None => self.latest_trip_id()?,
        };
        let mut payload = self.with_reauth(|c| c.fetch_trip_details(&trip_id))?;
        self.enrich_trip(&mut payload)?;
        Ok(payload)
    }

    /// Runs an endpoint operation, recovering an expired session once.
    ///
    /// On an unauthorized response the session is invalidated,
    /// authentication runs again and the operation is replayed a single
    /// time. A failure of the replay propagates.
    fn with_reauth<T>(
        &mut self,
        operation: impl Fn(&mut Self) -> Result<T, BonusdriveError>,
    ) -> Result<T, BonusdriveError> {
        match operation(self) {
            Err(BonusdriveError::SessionExpired) => {
                warn!("session expired, re-authenticating and replaying the request");
                self.session.invalidate();
                self.authenticate()?;
                operation(self)
            }
            result => result,
        }
    }

    fn authenticated_user(&self) -> Result<String, BonusdriveError> {
        if !self.session.is_authenticated() {
            return Err(BonusdriveError::NotAuthenticated);
        }
        self.session
            .user_id()
            .map(str::to_string)
            .ok_or(BonusdriveError::NotAuthenticated)
    }

    fn latest_trip_id(&mut self) -> Result<String, BonusdriveError> {
        let mut items = self.with_reauth(|c| c.fetch_trips(1, 0))?;
        if items.is_empty() {
            return Err(BonusdriveError::NoTrips);
        }
        let trip = unwrap_trip_envelope(items.remove(0))?;
        trip.get("tripId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| malformed("logbook trips", "tripId missing"))
    }

    fn fetch_trips(&mut self, amount: usize, offset: usize) -> Result<Vec<Value>, BonusdriveError> {
        let user_id = self.authenticated_user()?;
        debug!("fetching {amount} trips at offset {offset}");
        let response = self
            .http
            .get(format!(
                "{}/ipaid/api/v2/users/{user_id}/logbook/trips",
                self.base_url
            ))
            .headers(api_headers())
            .query(&[("offset", offset), ("limit", amount)])
            .query(&[
                ("sort", "local_startdate;desc"),
                ("expand", "vehicle"),
                ("expand", "user"),
            ])
            .send()?;
        let mut payload: Value = decode_json(check_response(response, "logbook trips")?, "logbook trips")?;
        let items = payload
            .get_mut("items")
            .map(Value::take)
            .ok_or_else(|| malformed("logbook trips", "items missing"))?;
        match items {
            Value::Array(items) => Ok(items),
            _ => Err(malformed("logbook trips", "items is not an array")),
        }
    }

    fn fetch_vehicle_id(&mut self) -> Result<String, BonusdriveError> {
        let user_id = self.authenticated_user()?;
        let response = self
            .http
            .get(format!(
                "{}/ipaid/api/v2/users/{user_id}/vehicles",
                self.base_url
            ))
            .headers(api_headers())
            .send()?;
        let vehicles: Vec<Value> = decode_json(check_response(response, "vehicles")?, "vehicles")?;
        let first = vehicles.into_iter().next().ok_or(BonusdriveError::NoVehicles)?;
        first
            .get("vehicleId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| malformed("vehicles", "vehicleId missing"))
    }

    fn fetch_badges(
        &mut self,
        period: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<Value>, BonusdriveError> {
        let vehicle_id = self.fetch_vehicle_id()?;
        debug!("fetching {period} badges from {start_date} to {end_date}");
        let response = self
            .http
            .get(format!(
                "{}/ipaid/api/v2/vehicles/{vehicle_id}/badges",
                self.base_url
            ))
            .headers(api_headers())
            .query(&[
                ("endDate", end_date),
                ("startDate", start_date),
                ("type", period),
            ])
            .send()?;
        decode_json(check_response(response, "badges")?, "badges")
    }

    fn fetch_scores(
        &mut self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<Value>, BonusdriveError> {
        let vehicle_id = self.fetch_vehicle_id()?;
        debug!("fetching scores from {start_date} to {end_date}");
        let response = self
            .http
            .get(format!(
                "{}/ipaid/api/v2/vehicles/{vehicle_id}/scores",
                self.base_url
            ))
            .headers(api_headers())
            .query(&[("endDate", end_date), ("startDate", start_date)])
            .send()?;
        let response = check_response(response, "scores")?;

        // an empty range answers 204 or an empty body instead of []
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        let body = response.text()?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&body).map_err(|e| malformed("scores", e.to_string()))
    }

    fn fetch_trip_details(&mut self, trip_id: &str) -> Result<Value, BonusdriveError> {
        let vehicle_id = self.fetch_vehicle_id()?;
        debug!("fetching details for trip {trip_id}");
        let response = self
            .http
            .get(format!(
                "{}/ipaid/api/v2/vehicles/{vehicle_id}/trips/{trip_id}",
                self.base_url
            ))
            .headers(api_headers())
            .query(&[
                ("expand", "events"),
                ("expand", "points"),
                ("expand", "scores"),
                ("expand", "user"),
                ("expand", "vehicle"),
                ("expand", "alerts"),
            ])
            .send()?;
        decode_json(check_response(response, "trip details")?, "trip details")
    }

    /// Decodes the polyline geometry and attaches the decoded points plus
    /// resolved start and end place names to the payload.
    fn enrich_trip(&mut self, payload: &mut Value) -> Result<(), BonusdriveError> {
        let Some(encoded) = payload.get("geometry").and_then(Value::as_str) else {
            return Ok(());
        };
        if encoded.is_empty() {
            return Ok(());
        }
        let points = geometry::decode(encoded)?;
        let start = points.first().copied();
        let end = points.last().copied();
        payload["decoded_geometry"] = Value::Array(
            points
                .iter()
                .map(|(lat, lon)| json!([lat, lon]))
                .collect(),
        );
        if let Some((lat, lon)) = start {
            if let Some(place) = self.resolve_place(lat, lon) {
                payload["start_point_string"] = Value::String(place);
            }
        }
        if let Some((lat, lon)) = end {
            if let Some(place) = self.resolve_place(lat, lon) {
                payload["end_point_string"] = Value::String(place);
            }
        }
        Ok(())
    }

    /// Resolves a coordinate pair to a display string.
    ///
    /// A failing or unhelpful geocoder yields an absent place, never an
    /// error: geocoding must not fail a trip fetch that already succeeded.
    fn resolve_place(&self, latitude: f64, longitude: f64) -> Option<String> {
        let Some(photon) = &self.photon else {
            return Some(geocode::format_coordinates(latitude, longitude));
        };
        match photon.reverse_geocode(latitude, longitude) {
            Ok(response) => {
                let place = geocode::compose_place(&response);
                if place.is_none() {
                    warn!("no usable place attributes for {latitude:.6}, {longitude:.6}");
                }
                place
            }
            Err(e) => {
                warn!("reverse geocoding failed for {latitude:.6}, {longitude:.6}: {e}");
                None
            }
        }
    }
}

pub(crate) fn cas_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));
    headers.insert("App-Version", HeaderValue::from_static(MOBILE_APP_VERSION));
    headers.insert("Platform", HeaderValue::from_static("Android"));
    headers.insert(header::USER_AGENT, HeaderValue::from_static(CAS_USER_AGENT));
    headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
    headers
}

pub(crate) fn api_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));
    headers.insert("Platform", HeaderValue::from_static("Android"));
    headers.insert(header::USER_AGENT, HeaderValue::from_static(API_USER_AGENT));
    headers
}

/// Maps a non-success status to its error: 401 is the session-expiry
/// signal the retry wrapper watches for, everything else rejects hard.
pub(crate) fn check_response(
    response: Response,
    context: &str,
) -> Result<Response, BonusdriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(BonusdriveError::SessionExpired);
    }
    Err(BonusdriveError::UpstreamRejected {
        status: status.as_u16(),
        context: context.to_string(),
    })
}

fn decode_json<T: serde::de::DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, BonusdriveError> {
    response.json().map_err(|e| malformed(context, e.to_string()))
}

fn unwrap_trip_envelope(item: Value) -> Result<Value, BonusdriveError> {
    match item {
        Value::Object(mut envelope) => envelope
            .remove("trip")
            .ok_or_else(|| malformed("logbook trips", "item without a trip")),
        _ => Err(malformed("logbook trips", "item is not an object")),
    }
}

fn validate_period(period: &str) -> Result<(), BonusdriveError> {
    if BADGE_PERIODS.contains(&period) {
        return Ok(());
    }
    Err(BonusdriveError::InvalidArgument {
        field: "period".to_string(),
        reason: format!("must be \"daily\" or \"monthly\", got \"{period}\""),
    })
}

fn validate_date_range(start_date: &str, end_date: &str) -> Result<(), BonusdriveError> {
    let start = parse_date("start_date", start_date)?;
    let end = parse_date("end_date", end_date)?;
    if start > end {
        return Err(BonusdriveError::InvalidArgument {
            field: "start_date".to_string(),
            reason: format!("{start_date} is after {end_date}"),
        });
    }
    Ok(())
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, BonusdriveError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| BonusdriveError::InvalidArgument {
        field: field.to_string(),
        reason: format!("{value} is not a calendar date: {e}"),
    })
}

fn malformed(context: &str, reason: impl Into<String>) -> BonusdriveError {
    BonusdriveError::MalformedResponse {
        context: context.to_string(),
        reason: reason.into(),
    }
}
