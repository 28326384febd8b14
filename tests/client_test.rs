// End-to-end client tests against a local mock of the BonusDrive service.

use bonusdrive::client::{BonusdriveClient, Credentials};
use bonusdrive::errors::BonusdriveError;
use bonusdrive::model::BadgeType;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{Value, json};

fn credentials() -> Credentials {
    Credentials {
        email: "driver@example.com".to_string(),
        password: "secret".to_string(),
    }
}

fn client(server: &ServerGuard) -> BonusdriveClient {
    BonusdriveClient::new(&server.url(), Some(credentials()), None, None).unwrap()
}

fn client_with_ticket(server: &ServerGuard, ticket: &str) -> BonusdriveClient {
    BonusdriveClient::new(
        &server.url(),
        Some(credentials()),
        Some(ticket.to_string()),
        None,
    )
    .unwrap()
}

struct AuthMocks {
    issue_tgt: Mock,
    exchange: Mock,
    redeem: Mock,
    session_info: Mock,
}

impl AuthMocks {
    fn assert(&self) {
        self.issue_tgt.assert();
        self.exchange.assert();
        self.redeem.assert();
        self.session_info.assert();
    }
}

/// Mocks the full ticket handshake. `handshakes` is the number of times the
/// exchange, redemption and session steps are expected to run; the ticket
/// issuance is expected exactly once since renewed sessions keep their
/// ticket-granting ticket.
fn mock_auth(server: &mut ServerGuard, handshakes: usize) -> AuthMocks {
    let issue_tgt = server
        .mock("POST", "/cas/rest/v1/rbtickets")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("username".into(), "driver@example.com".into()),
            Matcher::UrlEncoded("password".into(), "secret".into()),
            Matcher::UrlEncoded("rememberMe".into(), "true".into()),
        ]))
        .with_status(201)
        .with_body("TGT-1-abc")
        .expect(1)
        .create();
    let exchange = server
        .mock("POST", "/cas/rest/v1/rbtickets/TGT-1-abc")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("ticketGrantingTicketId".into(), "TGT-1-abc".into()),
            Matcher::UrlEncoded("service".into(), format!("{}/ipaid/", server.url())),
        ]))
        .with_status(200)
        .with_body("ST-77-xyz")
        .expect(handshakes)
        .create();
    let redeem = server
        .mock("POST", "/ipaid/")
        .match_body(Matcher::UrlEncoded("ticket".into(), "ST-77-xyz".into()))
        .with_status(302)
        .with_header("location", "/ipaid/home")
        .with_header("set-cookie", "SESSION=9f8e7d; Path=/")
        .expect(handshakes)
        .create();
    let session_info = server
        .mock("GET", "/ipaid/api/v2/session")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"userId": 4711}"#)
        .expect(handshakes)
        .create();
    AuthMocks {
        issue_tgt,
        exchange,
        redeem,
        session_info,
    }
}

fn mock_vehicles(server: &mut ServerGuard, hits: usize) -> Mock {
    server
        .mock("GET", "/ipaid/api/v2/users/4711/vehicles")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"vehicleId": "v-100", "make": "Volkswagen", "model": "Golf"}]"#)
        .expect(hits)
        .create()
}

fn trip_payload(trip_id: &str) -> Value {
    json!({
        "tripId": trip_id,
        "tripStartTimestampUtc": 1724252400000i64,
        "tripEndTimestampUtc": 1724254200000i64,
        "tripStartTimestampLocal": 1724259600000i64,
        "tripEndTimestampLocal": 1724261400000i64,
        "tripProcessingEndTimestampUtc": 1724254260000i64,
        "kilometers": 23.7,
        "avgKilometersPerHour": 47.4,
        "maxKilometersPerHour": 93.0,
        "seconds": 1800,
        "secondsOfIdling": 120,
        "timeZoneOffsetMillis": 7200000,
        "tripStatus": "PROCESSED",
        "transportMode": "CAR_DRIVER",
        "transportModeMessageKey": "transportmode.cardriver",
        "geometry": "_izlhA~rlgdF_{geC~ywl@_kwzCn`{nI",
        "snappedGeometry": [],
        "reconstructedStartGeometry": "",
        "tripStartStatus": "OK",
        "verified": true,
        "hasAlerts": false,
        "vehicle": {
            "vehicleId": "v-100",
            "make": "Volkswagen",
            "model": "Golf"
        },
        "user": {
            "userId": "4711",
            "publicDisplayName": "M. Mustermann",
            "firstName": "Max",
            "lastName": "Mustermann"
        },
        "tripScores": {
            "scoreType": 1,
            "scores": {
                "over.speeding": 88.0,
                "speeding": 90.5,
                "distracted.driving": 100.0,
                "payd": 76.0,
                "overall": 91.2,
                "harsh.cornering": 95.0,
                "harsh.acceleration": 89.0,
                "harsh.braking": 92.5,
                "mileage": 80.0
            }
        },
        "tripScore": 91.2,
        "eventsCount": 2,
        "private": false,
        "tripUUID": "c0ffee00-7f3f-71ee",
        "purpose": "PRIVATE"
    })
}

#[test]
fn test_authentication_happy_path() {
    let mut server = Server::new();
    let mocks = mock_auth(&mut server, 1);

    let mut client = client(&server);
    client.authenticate().unwrap();

    assert!(client.session().is_authenticated());
    assert_eq!(client.session().user_id(), Some("4711"));
    assert_eq!(client.session().ticket_granting_ticket(), Some("TGT-1-abc"));
    mocks.assert();
}

#[test]
fn test_missing_credentials_fail_before_any_request() {
    let mut server = Server::new();
    let posts = server.mock("POST", Matcher::Any).expect(0).create();
    let gets = server.mock("GET", Matcher::Any).expect(0).create();

    let mut client = BonusdriveClient::new(&server.url(), None, None, None).unwrap();
    assert!(matches!(
        client.authenticate(),
        Err(BonusdriveError::MissingCredentials)
    ));

    let blank = Credentials {
        email: String::new(),
        password: "secret".to_string(),
    };
    let mut client = BonusdriveClient::new(&server.url(), Some(blank), None, None).unwrap();
    assert!(matches!(
        client.authenticate(),
        Err(BonusdriveError::MissingCredentials)
    ));

    posts.assert();
    gets.assert();
}

#[test]
fn test_stale_ticket_renewed_once() {
    let mut server = Server::new();
    let stale = server
        .mock("POST", "/cas/rest/v1/rbtickets/TGT-stale")
        .with_status(404)
        .expect(1)
        .create();
    let issue = server
        .mock("POST", "/cas/rest/v1/rbtickets")
        .with_status(201)
        .with_body("TGT-fresh")
        .expect(1)
        .create();
    let exchange = server
        .mock("POST", "/cas/rest/v1/rbtickets/TGT-fresh")
        .with_status(200)
        .with_body("ST-2-abc")
        .expect(1)
        .create();
    let redeem = server
        .mock("POST", "/ipaid/")
        .with_status(302)
        .with_header("set-cookie", "SESSION=1a2b; Path=/")
        .create();
    let session_info = server
        .mock("GET", "/ipaid/api/v2/session")
        .with_status(200)
        .with_body(r#"{"userId": "u-900"}"#)
        .create();

    let mut client = client_with_ticket(&server, "TGT-stale");
    client.authenticate().unwrap();

    assert_eq!(client.session().ticket_granting_ticket(), Some("TGT-fresh"));
    assert_eq!(client.session().user_id(), Some("u-900"));
    stale.assert();
    issue.assert();
    exchange.assert();
    redeem.assert();
    session_info.assert();
}

#[test]
fn test_fresh_ticket_rejected_again_fails_hard() {
    let mut server = Server::new();
    let stale = server
        .mock("POST", "/cas/rest/v1/rbtickets/TGT-stale")
        .with_status(404)
        .expect(1)
        .create();
    let issue = server
        .mock("POST", "/cas/rest/v1/rbtickets")
        .with_status(201)
        .with_body("TGT-fresh")
        .expect(1)
        .create();
    let exchange = server
        .mock("POST", "/cas/rest/v1/rbtickets/TGT-fresh")
        .with_status(404)
        .expect(1)
        .create();
    let redeem = server.mock("POST", "/ipaid/").expect(0).create();

    let mut client = client_with_ticket(&server, "TGT-stale");
    let result = client.authenticate();

    assert!(matches!(
        result,
        Err(BonusdriveError::ServiceTicketFailed { .. })
    ));
    stale.assert();
    issue.assert();
    exchange.assert();
    redeem.assert();
}

#[test]
fn test_ticket_renewal_with_failing_issuance() {
    let mut server = Server::new();
    let stale = server
        .mock("POST", "/cas/rest/v1/rbtickets/TGT-stale")
        .with_status(404)
        .expect(1)
        .create();
    let issue = server
        .mock("POST", "/cas/rest/v1/rbtickets")
        .with_status(500)
        .expect(1)
        .create();

    let mut client = client_with_ticket(&server, "TGT-stale");
    let result = client.authenticate();

    assert!(matches!(
        result,
        Err(BonusdriveError::TgtAcquisitionFailed { .. })
    ));
    stale.assert();
    issue.assert();
}

#[test]
fn test_endpoints_require_authentication() {
    let mut server = Server::new();
    let posts = server.mock("POST", Matcher::Any).expect(0).create();
    let gets = server.mock("GET", Matcher::Any).expect(0).create();

    let mut client = client(&server);
    assert!(matches!(
        client.list_trips_raw(8, 0),
        Err(BonusdriveError::NotAuthenticated)
    ));
    assert!(matches!(
        client.list_badges_raw("daily", "2024-08-01", "2024-08-21"),
        Err(BonusdriveError::NotAuthenticated)
    ));
    assert!(matches!(
        client.list_scores_raw("2024-08-01", "2024-08-21"),
        Err(BonusdriveError::NotAuthenticated)
    ));
    assert!(matches!(
        client.trip_details_raw(None),
        Err(BonusdriveError::NotAuthenticated)
    ));
    assert!(matches!(
        client.resolve_vehicle_id(),
        Err(BonusdriveError::NotAuthenticated)
    ));

    posts.assert();
    gets.assert();
}

#[test]
fn test_invalid_arguments_fail_before_any_endpoint_request() {
    let mut server = Server::new();
    let mocks = mock_auth(&mut server, 1);
    let api = server
        .mock(
            "GET",
            Matcher::Regex("/ipaid/api/v2/(users|vehicles)/".into()),
        )
        .expect(0)
        .create();

    let mut client = client(&server);
    client.authenticate().unwrap();

    assert!(matches!(
        client.list_badges_raw("weekly", "2024-08-01", "2024-08-21"),
        Err(BonusdriveError::InvalidArgument { .. })
    ));
    assert!(matches!(
        client.list_badges_raw("daily", "2024-08-21", "2024-08-01"),
        Err(BonusdriveError::InvalidArgument { .. })
    ));
    assert!(matches!(
        client.list_scores_raw("not-a-date", "2024-08-21"),
        Err(BonusdriveError::InvalidArgument { .. })
    ));

    api.assert();
    mocks.assert();
}

#[test]
fn test_trips_decode_from_envelopes() {
    let mut server = Server::new();
    let mocks = mock_auth(&mut server, 1);
    let trips = server
        .mock("GET", "/ipaid/api/v2/users/4711/logbook/trips")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("offset".into(), "0".into()),
            Matcher::UrlEncoded("limit".into(), "8".into()),
            Matcher::UrlEncoded("sort".into(), "local_startdate;desc".into()),
            Matcher::UrlEncoded("expand".into(), "vehicle".into()),
            Matcher::UrlEncoded("expand".into(), "user".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"items": [{"trip": trip_payload("t-1")}, {"trip": trip_payload("t-2")}]})
                .to_string(),
        )
        .expect(1)
        .create();

    let mut client = client(&server);
    client.authenticate().unwrap();
    let listed = client.list_trips(8, 0).unwrap();

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].trip_id, "t-1");
    assert_eq!(listed[1].trip_id, "t-2");
    assert!((listed[0].trip_scores.scores.overall - 91.2).abs() < f64::EPSILON);
    trips.assert();
    mocks.assert();
}

#[test]
fn test_empty_score_ranges_normalize_to_empty_lists() {
    let mut server = Server::new();
    let mocks = mock_auth(&mut server, 1);
    let vehicles = mock_vehicles(&mut server, 3);
    let no_content = server
        .mock("GET", "/ipaid/api/v2/vehicles/v-100/scores")
        .match_query(Matcher::UrlEncoded("startDate".into(), "2024-07-01".into()))
        .with_status(204)
        .expect(1)
        .create();
    let blank_body = server
        .mock("GET", "/ipaid/api/v2/vehicles/v-100/scores")
        .match_query(Matcher::UrlEncoded("startDate".into(), "2024-08-01".into()))
        .with_status(200)
        .with_body("  \n")
        .expect(1)
        .create();
    let empty_list = server
        .mock("GET", "/ipaid/api/v2/vehicles/v-100/scores")
        .match_query(Matcher::UrlEncoded("startDate".into(), "2024-08-10".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .expect(1)
        .create();

    let mut client = client(&server);
    client.authenticate().unwrap();

    assert!(client.list_scores_raw("2024-07-01", "2024-07-31").unwrap().is_empty());
    assert!(client.list_scores_raw("2024-08-01", "2024-08-09").unwrap().is_empty());
    assert!(client.list_scores_raw("2024-08-10", "2024-08-21").unwrap().is_empty());

    no_content.assert();
    blank_body.assert();
    empty_list.assert();
    vehicles.assert();
    mocks.assert();
}

#[test]
fn test_no_vehicles_is_a_distinct_error() {
    let mut server = Server::new();
    let mocks = mock_auth(&mut server, 1);
    let vehicles = server
        .mock("GET", "/ipaid/api/v2/users/4711/vehicles")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .expect(1)
        .create();

    let mut client = client(&server);
    client.authenticate().unwrap();

    assert!(matches!(
        client.resolve_vehicle_id(),
        Err(BonusdriveError::NoVehicles)
    ));
    vehicles.assert();
    mocks.assert();
}

#[test]
fn test_expired_session_recovered_once() {
    let mut server = Server::new();
    // One re-authentication is expected, reusing the stored ticket.
    let mocks = mock_auth(&mut server, 2);
    let trips = server
        .mock("GET", Matcher::Regex("/logbook/trips".into()))
        .with_status(401)
        .expect(2)
        .create();

    let mut client = client(&server);
    client.authenticate().unwrap();
    let result = client.list_trips_raw(8, 0);

    // The replayed request failed again, so the expiry propagates; the
    // request ran exactly twice and the handshake exactly twice.
    assert!(matches!(result, Err(BonusdriveError::SessionExpired)));
    assert!(client.session().is_authenticated());
    trips.assert();
    mocks.assert();
}

#[test]
fn test_latest_trip_details_enriched_with_coordinate_fallback() {
    let mut server = Server::new();
    let mocks = mock_auth(&mut server, 1);
    let vehicles = mock_vehicles(&mut server, 1);
    let trips = server
        .mock("GET", "/ipaid/api/v2/users/4711/logbook/trips")
        .match_query(Matcher::UrlEncoded("limit".into(), "1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"items": [{"trip": {"tripId": "t-900"}}]}).to_string())
        .expect(1)
        .create();
    let details = server
        .mock("GET", "/ipaid/api/v2/vehicles/v-100/trips/t-900")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("expand".into(), "events".into()),
            Matcher::UrlEncoded("expand".into(), "scores".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(trip_payload("t-900").to_string())
        .expect(1)
        .create();

    let mut client = client(&server);
    client.authenticate().unwrap();
    let trip = client.trip_details(None).unwrap();

    assert_eq!(trip.trip_id, "t-900");
    assert_eq!(trip.decoded_geometry.as_ref().unwrap().len(), 3);
    assert_eq!(
        trip.start_point_string.as_deref(),
        Some("N38.500000, W120.200000")
    );
    assert_eq!(
        trip.end_point_string.as_deref(),
        Some("N43.252000, W126.453000")
    );
    trips.assert();
    details.assert();
    vehicles.assert();
    mocks.assert();
}

#[test]
fn test_place_resolution_uses_photon() {
    let mut server = Server::new();
    let mocks = mock_auth(&mut server, 1);
    let vehicles = mock_vehicles(&mut server, 1);
    let details = server
        .mock("GET", "/ipaid/api/v2/vehicles/v-100/trips/t-901")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(trip_payload("t-901").to_string())
        .expect(1)
        .create();
    let start_lookup = server
        .mock("GET", "/reverse")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("lat".into(), "38.5".into()),
            Matcher::UrlEncoded("lon".into(), "-120.2".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"features": [{"properties": {
                "name": "Marienplatz",
                "city": "München",
                "country": "Deutschland"
            }}]})
            .to_string(),
        )
        .expect(1)
        .create();
    let end_lookup = server
        .mock("GET", "/reverse")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("lat".into(), "43.252".into()),
            Matcher::UrlEncoded("lon".into(), "-126.453".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"features": [{"properties": {
                "street": "Hauptstraße",
                "housenumber": "5"
            }}]})
            .to_string(),
        )
        .expect(1)
        .create();

    let mut client = BonusdriveClient::new(
        &server.url(),
        Some(credentials()),
        None,
        Some(&server.url()),
    )
    .unwrap();
    client.authenticate().unwrap();
    let trip = client.trip_details(Some("t-901")).unwrap();

    assert_eq!(
        trip.start_point_string.as_deref(),
        Some("Marienplatz, München, Deutschland")
    );
    assert_eq!(trip.end_point_string.as_deref(), Some("Hauptstraße 5"));
    details.assert();
    start_lookup.assert();
    end_lookup.assert();
    vehicles.assert();
    mocks.assert();
}

#[test]
fn test_failing_geocoder_does_not_fail_the_fetch() {
    let mut server = Server::new();
    let mocks = mock_auth(&mut server, 1);
    let vehicles = mock_vehicles(&mut server, 1);
    let details = server
        .mock("GET", "/ipaid/api/v2/vehicles/v-100/trips/t-902")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(trip_payload("t-902").to_string())
        .expect(1)
        .create();
    let reverse = server
        .mock("GET", "/reverse")
        .match_query(Matcher::Any)
        .with_status(500)
        .expect(2)
        .create();

    let mut client = BonusdriveClient::new(
        &server.url(),
        Some(credentials()),
        None,
        Some(&server.url()),
    )
    .unwrap();
    client.authenticate().unwrap();
    let trip = client.trip_details(Some("t-902")).unwrap();

    assert!(trip.decoded_geometry.is_some());
    assert!(trip.start_point_string.is_none());
    assert!(trip.end_point_string.is_none());
    details.assert();
    reverse.assert();
    vehicles.assert();
    mocks.assert();
}

#[test]
fn test_badges_fetch_scoped_to_first_vehicle() {
    let mut server = Server::new();
    let mocks = mock_auth(&mut server, 1);
    let vehicles = mock_vehicles(&mut server, 1);
    let badges = server
        .mock("GET", "/ipaid/api/v2/vehicles/v-100/badges")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("endDate".into(), "2024-08-21".into()),
            Matcher::UrlEncoded("startDate".into(), "2024-08-01".into()),
            Matcher::UrlEncoded("type".into(), "daily".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                {
                    "badgeType": "DAY",
                    "level": 1,
                    "pointsAwarded": 25,
                    "date": 1724198400000i64,
                    "state": "AWARDED"
                },
                {
                    "badgeType": "DAY",
                    "level": 3,
                    "pointsAwarded": 10,
                    "date": 1724284800000i64,
                    "state": "AWARDED"
                }
            ])
            .to_string(),
        )
        .expect(1)
        .create();

    let mut client = client(&server);
    client.authenticate().unwrap();
    let listed = client.list_badges("daily", "2024-08-01", "2024-08-21").unwrap();

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].badge_type, BadgeType::Day);
    assert_eq!(listed[0].level, 1);
    assert_eq!(listed[1].level, 3);
    badges.assert();
    vehicles.assert();
    mocks.assert();
}
