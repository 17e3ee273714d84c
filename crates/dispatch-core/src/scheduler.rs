//! Assignment of delivery batches to drone flights.
//!
//! Two strategies share one [`FlightScheduler`]:
//!
//! - [`FlightScheduler::single_flight`] tries to serve the whole batch with
//!   one drone in one flight.
//! - [`FlightScheduler::plan`] splits the batch by date and time slot and
//!   greedily packs consecutive deliveries into flights, falling back to the
//!   next ranked drone when a flight breaks a delivery's cost limit.
//!
//! Every lookup table lives on the stack of the call that builds it.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveTime};

use crate::config::PlannerConfig;
use crate::eligibility::{available_for, match_snapshot, meets_handling, EligibilityContext};
use crate::geometry::distance;
use crate::models::{
    Capability, DeliveryPlan, DeliveryRequest, DronePath, FleetSnapshot, FlightLeg, Point,
};
use crate::pathfinding::PathFinder;

/// Coarse time-of-day bucket deliveries are grouped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeSlot {
    /// Before 12:00
    Morning,
    /// Before 17:00
    Afternoon,
    Evening,
    /// No time requested
    AnyTime,
}

impl TimeSlot {
    pub fn of(time: Option<NaiveTime>) -> Self {
        let Some(time) = time else {
            return TimeSlot::AnyTime;
        };
        if time < hour(12) {
            TimeSlot::Morning
        } else if time < hour(17) {
            TimeSlot::Afternoon
        } else {
            TimeSlot::Evening
        }
    }
}

fn hour(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// A drone that may carry a delivery, with the base it flies from.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    drone_id: String,
    service_point_id: u32,
    base: Point,
}

/// Legs of one flight from base and back, with the moves they take.
#[derive(Debug, Clone)]
struct Flight {
    legs: Vec<FlightLeg>,
    moves: u32,
    /// Deliveries carried on this flight
    folded: usize,
}

/// Accumulates flights into a [`DeliveryPlan`], keeping drones in the order
/// they were first assigned.
#[derive(Debug, Default)]
struct PlanBuilder {
    total_cost: f64,
    total_moves: u32,
    drone_paths: Vec<DronePath>,
    path_index: HashMap<String, usize>,
    undeliverable: Vec<u32>,
}

impl PlanBuilder {
    fn assign(&mut self, drone_id: &str, flight: Flight, cost: f64) {
        self.total_cost += cost;
        self.total_moves += flight.moves;

        match self.path_index.get(drone_id) {
            Some(&index) => self.drone_paths[index].deliveries.extend(flight.legs),
            None => {
                self.path_index
                    .insert(drone_id.to_string(), self.drone_paths.len());
                self.drone_paths.push(DronePath {
                    drone_id: drone_id.to_string(),
                    deliveries: flight.legs,
                });
            }
        }
    }

    fn finish(self) -> DeliveryPlan {
        DeliveryPlan {
            total_cost: self.total_cost,
            total_moves: self.total_moves,
            drone_paths: self.drone_paths,
            undeliverable: self.undeliverable,
        }
    }
}

/// Cost each delivery pays when `deliveries` share one flight.
fn cost_per_delivery(capability: &Capability, moves: u32, deliveries: usize) -> f64 {
    capability.flight_cost(moves) / deliveries.max(1) as f64
}

fn over_budget(request: &DeliveryRequest, cost_per_delivery: f64) -> bool {
    request
        .requirements
        .max_cost
        .is_some_and(|max_cost| cost_per_delivery > max_cost)
}

fn sort_by_time(requests: &mut [DeliveryRequest]) {
    requests.sort_by_key(|request| (request.time.is_none(), request.time));
}

/// Candidate drones for one delivery, nearest base first.
fn rank_candidates(context: &EligibilityContext, request: &DeliveryRequest) -> Vec<Candidate> {
    let mut ranked: Vec<Candidate> = context
        .eligible_drones
        .iter()
        .filter_map(|drone_id| {
            let (service_point_id, base) = context.base_of(drone_id)?;
            Some(Candidate {
                drone_id: drone_id.clone(),
                service_point_id,
                base,
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        distance(&a.base, &request.delivery).total_cmp(&distance(&b.base, &request.delivery))
    });
    ranked
}

pub struct FlightScheduler<'a> {
    snapshot: &'a FleetSnapshot,
    config: &'a PlannerConfig,
    path_finder: PathFinder<'a>,
}

impl<'a> FlightScheduler<'a> {
    pub fn new(snapshot: &'a FleetSnapshot, config: &'a PlannerConfig) -> Self {
        Self {
            snapshot,
            config,
            path_finder: PathFinder::new(&snapshot.restricted_areas, config),
        }
    }

    /// Path to a delivery, ending with one hover at the drop-off point.
    fn delivery_leg(&self, from: &Point, to: &Point) -> Option<Vec<Point>> {
        let mut path = self.path_finder.find(from, to).path;
        let last = *path.last()?;
        path.push(last);
        Some(path)
    }

    fn return_leg(&self, from: &Point, base: &Point) -> Option<Vec<Point>> {
        let path = self.path_finder.find(from, base).path;
        (!path.is_empty()).then_some(path)
    }

    /// Fly every request in order from `base` and back again.
    ///
    /// `None` when some leg has no path.
    fn fly_batch(&self, base: &Point, ordered: &[DeliveryRequest]) -> Option<Flight> {
        let mut legs = Vec::with_capacity(ordered.len() + 1);
        let mut moves = 0u32;
        let mut from = *base;

        for request in ordered {
            let Some(path) = self.delivery_leg(&from, &request.delivery) else {
                tracing::info!("Delivery {} can't be reached", request.id);
                return None;
            };
            let leg = FlightLeg::delivery(request.id, path);
            moves += leg.moves();
            from = *leg.flight_path.last()?;
            legs.push(leg);
        }

        let Some(path) = self.return_leg(&from, base) else {
            tracing::info!("No return path from the last delivery");
            return None;
        };
        let leg = FlightLeg::return_to_base(path);
        moves += leg.moves();
        legs.push(leg);

        Some(Flight {
            legs,
            moves,
            folded: ordered.len(),
        })
    }

    /// Serve the whole batch with one drone in one flight.
    pub fn single_flight(&self, requests: &[DeliveryRequest]) -> DeliveryPlan {
        let context = match_snapshot(requests, self.snapshot, self.config);
        self.single_flight_with(requests, &context)
    }

    /// Like [`Self::single_flight`] over an already matched context.
    ///
    /// Drones are tried in match order. The flown legs depend only on the
    /// base, so they are computed once per service point.
    pub fn single_flight_with(
        &self,
        requests: &[DeliveryRequest],
        context: &EligibilityContext,
    ) -> DeliveryPlan {
        if requests.is_empty() || context.is_empty() {
            tracing::info!("No drone can do these deliveries in one flight");
            return DeliveryPlan::default();
        }

        let mut ordered = requests.to_vec();
        sort_by_time(&mut ordered);
        let total_capacity: f64 = ordered.iter().map(|r| r.requirements.capacity).sum();

        let mut flights_from: HashMap<u32, Option<Flight>> = HashMap::new();

        for drone_id in &context.eligible_drones {
            tracing::debug!("Trying drone '{}' for all deliveries in one flight", drone_id);
            let Some(drone) = self.snapshot.drone(drone_id) else {
                continue;
            };
            let capability = &drone.capability;
            if total_capacity > capability.capacity {
                continue;
            }
            let Some((service_point_id, base)) = context.base_of(drone_id) else {
                continue;
            };

            let flight = flights_from
                .entry(service_point_id)
                .or_insert_with(|| self.fly_batch(&base, &ordered));
            let Some(flight) = flight else {
                continue;
            };

            if flight.moves > capability.max_moves {
                tracing::debug!(
                    "Drone '{}' rejected: {} moves exceeds limit {}",
                    drone_id,
                    flight.moves,
                    capability.max_moves
                );
                continue;
            }
            let per_delivery = cost_per_delivery(capability, flight.moves, ordered.len());
            if let Some(request) = ordered.iter().find(|r| over_budget(r, per_delivery)) {
                tracing::debug!(
                    "Drone '{}' rejected: delivery {} can't afford {:.2}",
                    drone_id,
                    request.id,
                    per_delivery
                );
                continue;
            }

            tracing::info!(
                "Drone '{}' takes all {} deliveries in {} moves",
                drone_id,
                ordered.len(),
                flight.moves
            );
            let mut plan = PlanBuilder::default();
            plan.assign(drone_id, flight.clone(), capability.flight_cost(flight.moves));
            return plan.finish();
        }

        tracing::info!("No drone can do these deliveries in one flight");
        DeliveryPlan::default()
    }

    /// Plan every request across as many flights and drones as needed.
    ///
    /// Requests that no drone can serve are listed in
    /// [`DeliveryPlan::undeliverable`].
    pub fn plan(&self, requests: &[DeliveryRequest]) -> DeliveryPlan {
        let mut by_date: BTreeMap<(bool, Option<NaiveDate>), Vec<DeliveryRequest>> =
            BTreeMap::new();
        for request in requests {
            by_date
                .entry((request.date.is_none(), request.date))
                .or_default()
                .push(request.clone());
        }

        let mut plan = PlanBuilder::default();
        for (_, mut day) in by_date {
            sort_by_time(&mut day);

            let mut by_slot: BTreeMap<TimeSlot, Vec<DeliveryRequest>> = BTreeMap::new();
            for request in day {
                by_slot
                    .entry(TimeSlot::of(request.time))
                    .or_default()
                    .push(request);
            }

            for (slot, bucket) in by_slot {
                tracing::debug!("Planning {} deliveries in slot {:?}", bucket.len(), slot);
                self.plan_bucket(&bucket, &mut plan);
            }
        }

        let plan = plan.finish();
        tracing::info!(
            "Planned {} drones, {} moves, cost {:.2}, {} undeliverable",
            plan.drone_paths.len(),
            plan.total_moves,
            plan.total_cost,
            plan.undeliverable.len()
        );
        plan
    }

    fn plan_bucket(&self, bucket: &[DeliveryRequest], plan: &mut PlanBuilder) {
        let context = match_snapshot(bucket, self.snapshot, self.config);

        // Working copy of each delivery's ranking; drones are struck from it
        // when a flight they fly breaks that delivery's cost limit.
        let mut ranked: Vec<Vec<Candidate>> = if context.is_empty() {
            bucket
                .iter()
                .map(|request| {
                    let own =
                        match_snapshot(std::slice::from_ref(request), self.snapshot, self.config);
                    rank_candidates(&own, request)
                })
                .collect()
        } else {
            bucket
                .iter()
                .map(|request| rank_candidates(&context, request))
                .collect()
        };

        let mut i = 0;
        while i < bucket.len() {
            let candidates = ranked[i].clone();
            let mut assigned = false;

            for candidate in &candidates {
                let Some(drone) = self.snapshot.drone(&candidate.drone_id) else {
                    continue;
                };
                let capability = &drone.capability;
                let Some(flight) = self.extend_flight(bucket, i, candidate, capability) else {
                    continue;
                };

                let folded = &bucket[i..i + flight.folded];
                let per_delivery = cost_per_delivery(capability, flight.moves, flight.folded);
                if let Some(offset) = folded.iter().position(|r| over_budget(r, per_delivery)) {
                    tracing::debug!(
                        "Drone '{}' struck for delivery {}: {:.2} over budget",
                        candidate.drone_id,
                        folded[offset].id,
                        per_delivery
                    );
                    ranked[i + offset].retain(|c| c.drone_id != candidate.drone_id);
                    continue;
                }

                tracing::info!(
                    "Drone '{}' from service point {} takes {} deliveries in {} moves",
                    candidate.drone_id,
                    candidate.service_point_id,
                    flight.folded,
                    flight.moves
                );
                let cost = capability.flight_cost(flight.moves);
                let folded_count = flight.folded;
                plan.assign(&candidate.drone_id, flight, cost);
                i += folded_count;
                assigned = true;
                break;
            }

            if !assigned {
                tracing::info!("Delivery {} can't be delivered, skipping it", bucket[i].id);
                plan.undeliverable.push(bucket[i].id);
                i += 1;
            }
        }
    }

    /// Greedily fold deliveries from `start` onwards into one flight.
    ///
    /// A delivery is added while the drone is available for it, can handle
    /// it, can still carry it and can reach it with enough moves left to fly
    /// home. `None` when not even the first delivery fits.
    fn extend_flight(
        &self,
        bucket: &[DeliveryRequest],
        start: usize,
        candidate: &Candidate,
        capability: &Capability,
    ) -> Option<Flight> {
        let base = candidate.base;
        let mut moves_left = capability.max_moves;
        let mut capacity_left = capability.capacity;
        let mut legs = Vec::new();
        let mut forward_moves = 0u32;
        let mut current = base;
        let mut way_home: Option<Vec<Point>> = None;
        let windows = self
            .snapshot
            .availability_at(candidate.service_point_id, &candidate.drone_id)
            .unwrap_or_default();

        for request in &bucket[start..] {
            let servable = meets_handling(&request.requirements, capability)
                && available_for(request, windows);
            if !servable {
                tracing::debug!(
                    "Drone '{}' can't serve delivery {}, flight ends",
                    candidate.drone_id,
                    request.id
                );
                break;
            }
            let load = request.requirements.capacity;
            if load > capacity_left {
                break;
            }
            let Some(path) = self.delivery_leg(&current, &request.delivery) else {
                break;
            };
            let Some(&arrival) = path.last() else {
                break;
            };
            let Some(back) = self.return_leg(&arrival, &base) else {
                break;
            };

            let moves_needed = path.len() as u32 - 1;
            let return_moves = back.len() as u32 - 1;
            if moves_needed + return_moves > moves_left {
                break;
            }

            legs.push(FlightLeg::delivery(request.id, path));
            moves_left -= moves_needed;
            forward_moves += moves_needed;
            capacity_left -= load;
            current = arrival;
            way_home = Some(back);
        }

        let back = way_home?;
        let folded = legs.len();
        let home = FlightLeg::return_to_base(back);
        let moves = forward_moves + home.moves();
        legs.push(home);

        Some(Flight {
            legs,
            moves,
            folded,
        })
    }
}

/// Serve the whole batch with a single drone flight, or return an empty plan.
pub fn plan_single_flight(
    requests: &[DeliveryRequest],
    snapshot: &FleetSnapshot,
    config: &PlannerConfig,
) -> DeliveryPlan {
    FlightScheduler::new(snapshot, config).single_flight(requests)
}

/// Plan the batch across as many drones and flights as needed.
pub fn plan_flights(
    requests: &[DeliveryRequest],
    snapshot: &FleetSnapshot,
    config: &PlannerConfig,
) -> DeliveryPlan {
    FlightScheduler::new(snapshot, config).plan(requests)
}
