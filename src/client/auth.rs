// Three-step CAS-style ticket handshake
//
// 1. credentials -> ticket-granting ticket (TGT)
// 2. TGT + service -> service ticket (ST), renewing a rejected TGT once
// 3. ST redeemed at the application entry point for session cookies
// followed by resolving the user identity from the session endpoint.

use log::{debug, warn};
use reqwest::StatusCode;
use serde_json::Value;

use super::{BonusdriveClient, cas_headers};
use crate::errors::BonusdriveError;

const TICKETS_PATH: &str = "/cas/rest/v1/rbtickets";
const APP_ENTRY_PATH: &str = "/ipaid/";
const SESSION_INFO_PATH: &str = "/ipaid/api/v2/session";

impl BonusdriveClient {
    /// Establishes a usable session or fails.
    ///
    /// Reuses a stored ticket-granting ticket when one is present and only
    /// falls back to the configured credentials when the service rejects
    /// it. On success the session is authenticated and carries the
    /// resolved user id.
    pub fn authenticate(&mut self) -> Result<(), BonusdriveError> {
        let service_ticket = self.obtain_service_ticket()?;
        self.redeem_service_ticket(&service_ticket)?;
        self.resolve_identity()
    }

    /// Requests a fresh ticket-granting ticket from the credentials.
    fn request_ticket_granting_ticket(&self) -> Result<String, BonusdriveError> {
        let Some(credentials) = &self.credentials else {
            return Err(BonusdriveError::MissingCredentials);
        };
        if credentials.email.is_empty() || credentials.password.is_empty() {
            return Err(BonusdriveError::MissingCredentials);
        }

        debug!("requesting ticket-granting ticket");
        let response = self
            .http
            .post(format!("{}{}", self.base_url, TICKETS_PATH))
            .headers(cas_headers())
            .form(&[
                ("username", credentials.email.as_str()),
                ("password", credentials.password.as_str()),
                ("rememberMe", "true"),
            ])
            .send()
            .map_err(|e| BonusdriveError::TgtAcquisitionFailed {
                reason: e.to_string(),
            })?;

        if response.status() != StatusCode::CREATED {
            return Err(BonusdriveError::TgtAcquisitionFailed {
                reason: format!("unexpected status {}", response.status()),
            });
        }
        let ticket = response
            .text()
            .map_err(|e| BonusdriveError::TgtAcquisitionFailed {
                reason: e.to_string(),
            })?
            .trim()
            .to_string();
        if ticket.is_empty() {
            return Err(BonusdriveError::TgtAcquisitionFailed {
                reason: "empty response body".to_string(),
            });
        }
        Ok(ticket)
    }

    /// Exchanges the ticket-granting ticket for a service ticket.
    ///
    /// A 404 means the service no longer recognizes the ticket. The stored
    /// ticket is cleared and the exchange restarts with a freshly issued
    /// one, at most once: a second 404 against a fresh ticket fails hard
    /// instead of looping.
    fn obtain_service_ticket(&mut self) -> Result<String, BonusdriveError> {
        let mut renewed = false;
        loop {
            let ticket = match self.session.ticket_granting_ticket() {
                Some(ticket) => ticket.to_string(),
                None => {
                    let fresh = self.request_ticket_granting_ticket()?;
                    self.session.store_ticket(fresh.clone());
                    fresh
                }
            };

            debug!("exchanging ticket-granting ticket for a service ticket");
            let service = format!("{}{}", self.base_url, APP_ENTRY_PATH);
            let response = self
                .http
                .post(format!("{}{}/{}", self.base_url, TICKETS_PATH, ticket))
                .headers(cas_headers())
                .form(&[
                    ("ticketGrantingTicketId", ticket.as_str()),
                    ("service", service.as_str()),
                ])
                .send()
                .map_err(|e| BonusdriveError::ServiceTicketFailed {
                    reason: e.to_string(),
                })?;

            match response.status() {
                StatusCode::OK => {
                    let service_ticket = response
                        .text()
                        .map_err(|e| BonusdriveError::ServiceTicketFailed {
                            reason: e.to_string(),
                        })?
                        .trim()
                        .to_string();
                    if service_ticket.is_empty() {
                        return Err(BonusdriveError::ServiceTicketFailed {
                            reason: "empty response body".to_string(),
                        });
                    }
                    return Ok(service_ticket);
                }
                StatusCode::NOT_FOUND if !renewed => {
                    warn!("stored ticket-granting ticket was rejected, requesting a fresh one");
                    self.session.clear_ticket();
                    renewed = true;
                }
                StatusCode::NOT_FOUND => {
                    return Err(BonusdriveError::ServiceTicketFailed {
                        reason: "freshly issued ticket-granting ticket was rejected".to_string(),
                    });
                }
                status => {
                    return Err(BonusdriveError::ServiceTicketFailed {
                        reason: format!("unexpected status {status}"),
                    });
                }
            }
        }
    }

    /// Redeems the service ticket at the application entry point.
    ///
    /// The response is normally a redirect; the session cookies it sets are
    /// the payload and land in the cookie jar no matter the status, so the
    /// status itself is not checked. Redirects stay disabled so the cookies
    /// are captured from this response rather than a followed location.
    fn redeem_service_ticket(&mut self, service_ticket: &str) -> Result<(), BonusdriveError> {
        debug!("redeeming service ticket for session cookies");
        self.http
            .post(format!("{}{}", self.base_url, APP_ENTRY_PATH))
            .headers(cas_headers())
            .form(&[("ticket", service_ticket)])
            .send()?;
        Ok(())
    }

    /// Resolves the user identity and marks the session authenticated.
    fn resolve_identity(&mut self) -> Result<(), BonusdriveError> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, SESSION_INFO_PATH))
            .headers(super::api_headers())
            .send()?;
        let response = super::check_response(response, "session")?;
        let payload: Value =
            response
                .json()
                .map_err(|e| BonusdriveError::MalformedResponse {
                    context: "session".to_string(),
                    reason: e.to_string(),
                })?;

        // userId arrives as a number or a string depending on the account
        let user_id = match payload.get("userId") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(BonusdriveError::MalformedResponse {
                    context: "session".to_string(),
                    reason: "userId missing".to_string(),
                });
            }
        };

        // some endpoints expect the user id as a cookie as well
        self.jar
            .add_cookie_str(&format!("User-ID={user_id}"), &self.origin);
        self.session.establish(user_id);
        debug!(
            "session established for user {}",
            self.session.user_id().unwrap_or_default()
        );
        Ok(())
    }
}
