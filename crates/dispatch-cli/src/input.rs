//! Loading planner input from disk and parsing command-line conditions.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use dispatch_core::{AttributeQuery, DeliveryRequest, FleetSnapshot};
use serde::Deserialize;

/// Read and validate a fleet snapshot.
pub fn load_snapshot(path: &Path) -> Result<FleetSnapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let snapshot = FleetSnapshot::from_json(&raw)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
    snapshot.validate().context("Snapshot failed validation")?;

    tracing::info!(
        "Loaded snapshot: {} drones, {} service points, {} restricted areas",
        snapshot.drones.len(),
        snapshot.service_points.len(),
        snapshot.restricted_areas.len()
    );
    Ok(snapshot)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RequestBatch {
    Many(Vec<DeliveryRequest>),
    One(DeliveryRequest),
}

/// Read a delivery batch; a file holding one request is a batch of one.
pub fn load_requests(path: &Path) -> Result<Vec<DeliveryRequest>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read requests {}", path.display()))?;
    let batch: RequestBatch = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse requests {}", path.display()))?;
    Ok(match batch {
        RequestBatch::Many(requests) => requests,
        RequestBatch::One(request) => vec![request],
    })
}

const OPERATOR_CHARS: [char; 4] = ['<', '>', '=', '!'];

/// Parse `<attribute><operator><value>`, e.g. `capacity>=4` or `cooling=true`.
pub fn parse_condition(raw: &str) -> Result<AttributeQuery> {
    let Some(start) = raw.find(|c: char| OPERATOR_CHARS.contains(&c)) else {
        bail!("Expected <attribute><operator><value>, got '{raw}'");
    };
    let rest = &raw[start..];
    let op_len = rest
        .find(|c: char| !OPERATOR_CHARS.contains(&c))
        .unwrap_or(rest.len());

    let attribute = raw[..start].trim();
    let value = rest[op_len..].trim();
    if attribute.is_empty() || value.is_empty() {
        bail!("Expected <attribute><operator><value>, got '{raw}'");
    }
    Ok(AttributeQuery::new(attribute, &rest[..op_len], value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("dispatch-cli-{}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn conditions_split_on_operator() {
        assert_eq!(
            parse_condition("capacity>=4").unwrap(),
            AttributeQuery::new("capacity", ">=", "4")
        );
        assert_eq!(
            parse_condition("cooling = true").unwrap(),
            AttributeQuery::new("cooling", "=", "true")
        );
        assert_eq!(
            parse_condition("maxMoves!=2000").unwrap(),
            AttributeQuery::new("maxMoves", "!=", "2000")
        );
        assert!(parse_condition("capacity").is_err());
        assert!(parse_condition(">=4").is_err());
        assert!(parse_condition("capacity<").is_err());
    }

    #[test]
    fn requests_load_as_batch_or_single() {
        let one = r#"{
            "id": 1,
            "requirements": {"capacity": 0.75},
            "delivery": {"lng": -3.18, "lat": 55.94}
        }"#;
        let path = temp_file("single.json", one);
        let requests = load_requests(&path).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, 1);

        let two = r#"{
            "id": 2,
            "date": "2025-12-22",
            "time": "14:30:00",
            "requirements": {"capacity": 1.0, "maxCost": 13.5},
            "delivery": {"lng": -3.19, "lat": 55.94}
        }"#;
        let many = format!("[{one}, {two}]");
        let path = temp_file("batch.json", &many);
        let requests = load_requests(&path).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].requirements.max_cost, Some(13.5));
        assert!(requests[1].time.is_some());
    }

    #[test]
    fn invalid_snapshot_is_rejected() {
        let open_ring = r#"{"restrictedAreas": [{"name": "open", "vertices": [
            {"lng": 0.0, "lat": 0.0}, {"lng": 1.0, "lat": 0.0},
            {"lng": 1.0, "lat": 1.0}, {"lng": 0.0, "lat": 1.0}
        ]}]}"#;
        let path = temp_file("open-ring.json", open_ring);
        let err = load_snapshot(&path).unwrap_err();
        assert!(format!("{err:#}").contains("open"), "{err:#}");

        let missing = std::env::temp_dir().join("dispatch-cli-does-not-exist.json");
        assert!(load_snapshot(&missing).is_err());
    }
}
