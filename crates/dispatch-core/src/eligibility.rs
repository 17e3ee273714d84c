//! Matching of delivery batches to drones that can serve them.
//!
//! Eligibility is judged per service point using a straight-line move
//! estimate, which is cheap and never larger than the real path.

use std::collections::HashMap;

use chrono::Datelike;

use crate::config::PlannerConfig;
use crate::geometry::distance;
use crate::models::{
    Availability, Capability, DeliveryRequest, Drone, FleetSnapshot, Point, Requirements,
    ServicePoint, ServicePointDrones,
};

/// Drones eligible for one batch and where they are based.
///
/// Built fresh for every call and owned by it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EligibilityContext {
    /// Eligible drone ids in the order they were matched
    pub eligible_drones: Vec<String>,
    /// Drone id -> service point it was first matched at
    pub drone_service_points: HashMap<String, u32>,
    /// Service point id -> location
    pub service_point_locations: HashMap<u32, Point>,
}

impl EligibilityContext {
    pub fn is_empty(&self) -> bool {
        self.eligible_drones.is_empty()
    }

    /// Service point id and location the drone was matched at.
    pub fn base_of(&self, drone_id: &str) -> Option<(u32, Point)> {
        let service_point_id = *self.drone_service_points.get(drone_id)?;
        let location = *self.service_point_locations.get(&service_point_id)?;
        Some((service_point_id, location))
    }
}

/// Sum of straight-line moves from `base` to every delivery.
pub fn estimate_total_moves(base: &Point, requests: &[DeliveryRequest], step_size: f64) -> u32 {
    requests
        .iter()
        .map(|request| (distance(base, &request.delivery) / step_size).round() as u32)
        .sum()
}

/// Whether one of the drone's windows covers the delivery's date and time.
///
/// Requests without date and time can be served at any time. A date alone
/// only has to match a window's weekday.
pub fn available_for(request: &DeliveryRequest, windows: &[Availability]) -> bool {
    if request.date.is_none() && request.time.is_none() {
        return true;
    }

    windows.iter().any(|window| match (request.date, request.time) {
        (Some(date), time) => {
            date.weekday() == window.day_of_week
                && time.map_or(true, |time| window.covers_time(time))
        }
        (None, Some(time)) => window.covers_time(time),
        (None, None) => true,
    })
}

/// Whether the drone can keep the delivery cooled or heated as needed.
pub fn meets_handling(requirements: &Requirements, capability: &Capability) -> bool {
    (!requirements.cooling || capability.cooling) && (!requirements.heating || capability.heating)
}

/// Whether the drone meets the delivery's handling needs and budget.
pub fn meets_requirements(
    requirements: &Requirements,
    capability: &Capability,
    cost_per_delivery: f64,
) -> bool {
    if !meets_handling(requirements, capability) {
        return false;
    }
    requirements
        .max_cost
        .map_or(true, |max_cost| cost_per_delivery <= max_cost)
}

/// Find drones able to serve every request in the batch.
///
/// Service points are visited in snapshot order and a drone is bound to the
/// first one it qualifies at; later groupings of the same drone are ignored.
pub fn match_eligible_drones(
    requests: &[DeliveryRequest],
    fleet: &[Drone],
    service_points: &[ServicePoint],
    availability: &[ServicePointDrones],
    config: &PlannerConfig,
) -> EligibilityContext {
    let mut context = EligibilityContext::default();
    let total_capacity: f64 = requests.iter().map(|r| r.requirements.capacity).sum();

    for group in availability {
        let Some(service_point) = service_points
            .iter()
            .find(|sp| sp.id == group.service_point_id)
        else {
            tracing::warn!(
                "Skipping drones at unknown service point {}",
                group.service_point_id
            );
            continue;
        };
        let base = service_point.location;
        context
            .service_point_locations
            .insert(service_point.id, base);

        let est_moves = estimate_total_moves(&base, requests, config.step_size);

        for stationed in &group.drones {
            if context.drone_service_points.contains_key(&stationed.id) {
                continue;
            }
            let Some(drone) = fleet.iter().find(|d| d.id == stationed.id) else {
                tracing::warn!(
                    "Drone '{}' listed at service point {} is not in the fleet",
                    stationed.id,
                    service_point.id
                );
                continue;
            };
            let capability = &drone.capability;

            if total_capacity > capability.capacity {
                tracing::debug!("Drone '{}' rejected: capacity", drone.id);
                continue;
            }

            let cost_per_delivery = if requests.is_empty() {
                0.0
            } else {
                capability.flight_cost(est_moves) / requests.len() as f64
            };

            let qualifies = requests.iter().all(|request| {
                available_for(request, &stationed.availability)
                    && meets_requirements(&request.requirements, capability, cost_per_delivery)
            });
            if !qualifies {
                tracing::debug!(
                    "Drone '{}' rejected at service point {}: availability or requirements",
                    drone.id,
                    service_point.id
                );
                continue;
            }

            context.eligible_drones.push(drone.id.clone());
            context
                .drone_service_points
                .insert(drone.id.clone(), service_point.id);
        }
    }

    context
}

/// Eligibility against a whole snapshot.
pub fn match_snapshot(
    requests: &[DeliveryRequest],
    snapshot: &FleetSnapshot,
    config: &PlannerConfig,
) -> EligibilityContext {
    match_eligible_drones(
        requests,
        &snapshot.drones,
        &snapshot.service_points,
        &snapshot.drones_for_service_points,
        config,
    )
}

/// Ids of drones that could serve the whole batch.
pub fn available_drones(
    requests: &[DeliveryRequest],
    snapshot: &FleetSnapshot,
    config: &PlannerConfig,
) -> Vec<String> {
    match_snapshot(requests, snapshot, config).eligible_drones
}
