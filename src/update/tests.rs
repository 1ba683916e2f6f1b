use super::*;
use chrono::Utc;

fn make_update(agent_id: &str, lat: f64, lon: f64) -> PositionUpdate {
    PositionUpdate {
        agent_id: agent_id.to_string(),
        latitude: lat,
        longitude: lon,
        observed_at: Utc::now(),
        order_id: None,
    }
}

#[test]
fn test_valid_update() {
    assert!(make_update("d1", 40.7128, -74.0060).validate().is_ok());
}

#[test]
fn test_boundary_coordinates_valid() {
    assert!(make_update("d1", 90.0, 180.0).validate().is_ok());
    assert!(make_update("d1", -90.0, -180.0).validate().is_ok());
    assert!(make_update("d1", 0.0, 0.0).validate().is_ok());
}

#[test]
fn test_latitude_out_of_range() {
    assert_eq!(
        make_update("d1", 91.0, 0.0).validate(),
        Err(ValidationError::InvalidLatitude(91.0))
    );
    assert_eq!(
        make_update("d1", -90.5, 0.0).validate(),
        Err(ValidationError::InvalidLatitude(-90.5))
    );
}

#[test]
fn test_longitude_out_of_range() {
    assert_eq!(
        make_update("d1", 0.0, 180.1).validate(),
        Err(ValidationError::InvalidLongitude(180.1))
    );
    assert_eq!(
        make_update("d1", 0.0, -181.0).validate(),
        Err(ValidationError::InvalidLongitude(-181.0))
    );
}

#[test]
fn test_non_finite_coordinates_rejected() {
    assert!(make_update("d1", f64::NAN, 0.0).validate().is_err());
    assert!(make_update("d1", 0.0, f64::INFINITY).validate().is_err());
}

#[test]
fn test_empty_agent_id_rejected() {
    assert_eq!(
        make_update("", 40.0, -74.0).validate(),
        Err(ValidationError::MissingAgentId)
    );
}

#[test]
fn test_serde_wire_format() {
    let json = r#"{
        "agentId": "d1",
        "latitude": 40.7128,
        "longitude": -74.0060,
        "observedAt": "2025-06-01T12:00:00Z",
        "orderId": "o1"
    }"#;

    let update: PositionUpdate = serde_json::from_str(json).unwrap();
    assert_eq!(update.agent_id, "d1");
    assert_eq!(update.order_id.as_deref(), Some("o1"));

    let out = serde_json::to_value(&update).unwrap();
    assert_eq!(out["agentId"], "d1");
    assert_eq!(out["orderId"], "o1");
}

#[test]
fn test_order_id_omitted_when_absent() {
    let update = make_update("d1", 40.0, -74.0);
    let out = serde_json::to_value(&update).unwrap();
    assert!(out.get("orderId").is_none());
}
