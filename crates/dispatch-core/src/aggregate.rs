//! Reduction of a flight plan to one route and its totals.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::PlannerConfig;
use crate::geometry::point_in_polygon;
use crate::models::{DeliveryPlan, DeliveryRequest, FleetSnapshot, FlightLeg, Point, Region};
use crate::scheduler::plan_single_flight;

/// One drone's flight reduced to a single polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub drone_id: String,
    pub total_moves: u32,
    pub total_cost: f64,
    pub route: Vec<Point>,
}

impl RouteSummary {
    /// GeoJSON `FeatureCollection` holding the route as a `LineString`.
    pub fn to_geojson(&self) -> Value {
        let coordinates: Vec<[f64; 2]> = self.route.iter().map(|p| [p.lng, p.lat]).collect();
        json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {
                    "droneID": self.drone_id,
                    "totalMoves": self.total_moves,
                    "totalCost": self.total_cost,
                },
                "geometry": {
                    "type": "LineString",
                    "coordinates": coordinates,
                },
            }],
        })
    }
}

/// GeoJSON for an optional route; no route is an empty collection.
pub fn route_geojson(summary: Option<&RouteSummary>) -> Value {
    match summary {
        Some(summary) => summary.to_geojson(),
        None => json!({ "type": "FeatureCollection", "features": [] }),
    }
}

/// Concatenate legs into one continuous route.
///
/// Consecutive legs share a waypoint, so every leg but the last drops its
/// final point and only the last leg's final point closes the route.
pub fn build_route(legs: &[FlightLeg]) -> Vec<Point> {
    let mut route = Vec::new();
    for leg in legs {
        if let Some((_, body)) = leg.flight_path.split_last() {
            route.extend_from_slice(body);
        }
    }
    if let Some(end) = legs.last().and_then(|leg| leg.flight_path.last()) {
        route.push(*end);
    }
    route
}

/// Summary of the first drone in `plan`, `None` for an empty plan.
pub fn summarize(plan: &DeliveryPlan) -> Option<RouteSummary> {
    let path = plan.drone_paths.first()?;
    Some(RouteSummary {
        drone_id: path.drone_id.clone(),
        total_moves: plan.total_moves,
        total_cost: plan.total_cost,
        route: build_route(&path.deliveries),
    })
}

/// Single-flight plan for the batch reduced to one route.
pub fn plan_single_flight_route(
    requests: &[DeliveryRequest],
    snapshot: &FleetSnapshot,
    config: &PlannerConfig,
) -> Option<RouteSummary> {
    summarize(&plan_single_flight(requests, snapshot, config))
}

/// True iff `point` lies in no region.
///
/// Uses the plain containment test, so points on a region's boundary may
/// count as accessible.
pub fn is_accessible(point: &Point, regions: &[Region]) -> bool {
    !regions.iter().any(|region| point_in_polygon(point, region))
}
