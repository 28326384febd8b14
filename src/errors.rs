// Error types for bonusdrive

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum BonusdriveError {
    // Errors for the ticket handshake
    #[snafu(display("Missing credentials: an email and password are required to request a ticket-granting ticket"))]
    MissingCredentials,
    #[snafu(display("Failed to obtain ticket-granting ticket: {reason}"))]
    TgtAcquisitionFailed { reason: String },
    #[snafu(display("Failed to obtain service ticket: {reason}"))]
    ServiceTicketFailed { reason: String },

    // Endpoint precondition errors
    #[snafu(display("Client is not authenticated, call authenticate() first"))]
    NotAuthenticated,
    #[snafu(display("Invalid argument: {field} - {reason}"))]
    InvalidArgument { field: String, reason: String },

    // Errors reported by the upstream service
    #[snafu(display("No vehicles found for the authenticated user"))]
    NoVehicles,
    #[snafu(display("No trips found for the authenticated user"))]
    NoTrips,
    #[snafu(display("Malformed {context} response: {reason}"))]
    MalformedResponse { context: String, reason: String },
    #[snafu(display("Session rejected as unauthorized by the upstream service"))]
    SessionExpired,
    #[snafu(display("Upstream rejected the {context} request with status {status}"))]
    UpstreamRejected { status: u16, context: String },
    #[snafu(display("HTTP transport error: {source}"))]
    TransportError { source: reqwest::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },
}

impl From<reqwest::Error> for BonusdriveError {
    fn from(value: reqwest::Error) -> Self {
        BonusdriveError::TransportError { source: value }
    }
}
