//! Core data models for delivery planning.

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};

/// Tolerance under which two coordinates are treated as the same position.
pub const POINT_EPSILON: f64 = 1e-6;

/// A position in longitude/latitude degrees.
///
/// Equality is tolerance based: two points closer than [`POINT_EPSILON`] on
/// both axes compare equal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Point {
    pub lng: f64,
    pub lat: f64,
}

impl Point {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        (self.lng - other.lng).abs() < POINT_EPSILON && (self.lat - other.lat).abs() < POINT_EPSILON
    }
}

// ========== NO-FLY REGIONS ==========

/// A named no-fly polygon stored as a closed ring (first vertex == last).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub vertices: Vec<Point>,
}

impl Region {
    pub fn new(name: impl Into<String>, vertices: Vec<Point>) -> Self {
        Self {
            name: name.into(),
            vertices,
        }
    }

    /// Check the ring is closed and has at least 3 distinct vertices.
    pub fn validate(&self) -> Result<()> {
        if self.vertices.len() < 4 {
            return Err(self.invalid(format!(
                "ring needs at least 4 stored points, got {}",
                self.vertices.len()
            )));
        }

        let (Some(first), Some(last)) = (self.vertices.first(), self.vertices.last()) else {
            return Err(self.invalid("ring is empty".to_string()));
        };
        if first != last {
            return Err(self.invalid(
                "ring is not closed (first vertex must equal last)".to_string(),
            ));
        }

        let mut distinct: Vec<Point> = Vec::new();
        for vertex in &self.vertices[..self.vertices.len() - 1] {
            if !distinct.contains(vertex) {
                distinct.push(*vertex);
            }
        }
        if distinct.len() < 3 {
            return Err(self.invalid(format!(
                "ring needs at least 3 distinct vertices, got {}",
                distinct.len()
            )));
        }

        Ok(())
    }

    /// Consecutive ring edges as `(start, end)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (&Point, &Point)> {
        self.vertices.windows(2).map(|pair| (&pair[0], &pair[1]))
    }

    fn invalid(&self, reason: String) -> PlanError {
        PlanError::InvalidRegion {
            name: self.name.clone(),
            reason,
        }
    }
}

// ========== FLEET ==========

/// Fixed capabilities and pricing of a drone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    #[serde(default)]
    pub cooling: bool,
    #[serde(default)]
    pub heating: bool,
    pub capacity: f64,
    pub max_moves: u32,
    pub cost_per_move: f64,
    pub cost_initial: f64,
    pub cost_final: f64,
}

impl Capability {
    /// Total cost of a flight of `moves` steps.
    pub fn flight_cost(&self, moves: u32) -> f64 {
        self.cost_initial + f64::from(moves) * self.cost_per_move + self.cost_final
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drone {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub capability: Capability,
}

/// A base location drones take off from and return to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicePoint {
    pub id: u32,
    #[serde(default)]
    pub name: Option<String>,
    pub location: Point,
}

/// A weekly window during which a drone can fly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub day_of_week: Weekday,
    pub from: NaiveTime,
    pub until: NaiveTime,
}

impl Availability {
    pub fn covers_time(&self, time: NaiveTime) -> bool {
        time >= self.from && time <= self.until
    }
}

/// Availability windows of one drone stationed at a service point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroneAvailability {
    pub id: String,
    #[serde(default)]
    pub availability: Vec<Availability>,
}

/// The drones stationed at one service point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePointDrones {
    pub service_point_id: u32,
    #[serde(default)]
    pub drones: Vec<DroneAvailability>,
}

/// Read-only view of everything the external data provider supplies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSnapshot {
    #[serde(default)]
    pub drones: Vec<Drone>,
    #[serde(default)]
    pub service_points: Vec<ServicePoint>,
    #[serde(default)]
    pub drones_for_service_points: Vec<ServicePointDrones>,
    #[serde(default)]
    pub restricted_areas: Vec<Region>,
}

impl FleetSnapshot {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn drone(&self, id: &str) -> Option<&Drone> {
        self.drones.iter().find(|drone| drone.id == id)
    }

    pub fn service_point(&self, id: u32) -> Option<&ServicePoint> {
        self.service_points.iter().find(|sp| sp.id == id)
    }

    /// Windows of `drone_id` as stationed at `service_point_id`.
    pub fn availability_at(
        &self,
        service_point_id: u32,
        drone_id: &str,
    ) -> Option<&[Availability]> {
        self.drones_for_service_points
            .iter()
            .filter(|group| group.service_point_id == service_point_id)
            .flat_map(|group| group.drones.iter())
            .find(|stationed| stationed.id == drone_id)
            .map(|stationed| stationed.availability.as_slice())
    }

    /// Validate geometry and cross references before planning.
    pub fn validate(&self) -> Result<()> {
        for region in &self.restricted_areas {
            region.validate()?;
        }
        for group in &self.drones_for_service_points {
            if self.service_point(group.service_point_id).is_none() {
                return Err(PlanError::UnknownServicePoint(group.service_point_id));
            }
        }
        Ok(())
    }
}

// ========== DELIVERIES ==========

/// What a delivery needs from the drone carrying it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirements {
    pub capacity: f64,
    #[serde(default)]
    pub cooling: bool,
    #[serde(default)]
    pub heating: bool,
    #[serde(default)]
    pub max_cost: Option<f64>,
}

/// A single delivery to plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRequest {
    pub id: u32,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    pub requirements: Requirements,
    pub delivery: Point,
}

// ========== PLAN OUTPUT ==========

/// One contiguous flown segment. `delivery_id == None` marks a return to base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightLeg {
    pub delivery_id: Option<u32>,
    pub flight_path: Vec<Point>,
}

impl FlightLeg {
    pub fn delivery(delivery_id: u32, flight_path: Vec<Point>) -> Self {
        Self {
            delivery_id: Some(delivery_id),
            flight_path,
        }
    }

    pub fn return_to_base(flight_path: Vec<Point>) -> Self {
        Self {
            delivery_id: None,
            flight_path,
        }
    }

    /// Moves flown on this leg (points minus one).
    pub fn moves(&self) -> u32 {
        self.flight_path.len().saturating_sub(1) as u32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DronePath {
    pub drone_id: String,
    pub deliveries: Vec<FlightLeg>,
}

/// Result of planning a batch of deliveries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPlan {
    pub total_cost: f64,
    pub total_moves: u32,
    pub drone_paths: Vec<DronePath>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub undeliverable: Vec<u32>,
}

impl DeliveryPlan {
    pub fn is_empty(&self) -> bool {
        self.drone_paths.is_empty()
    }
}
