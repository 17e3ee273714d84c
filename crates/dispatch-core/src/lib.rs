pub mod aggregate;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod geometry;
pub mod models;
pub mod pathfinding;
pub mod query;
pub mod scheduler;

pub use aggregate::{
    build_route, is_accessible, plan_single_flight_route, route_geojson, summarize, RouteSummary,
};
pub use config::{PlannerConfig, DIRECTION_COUNT, DIRECTION_STEP_DEG, STEP_SIZE};
pub use eligibility::{
    available_drones, available_for, estimate_total_moves, match_eligible_drones, match_snapshot,
    EligibilityContext,
};
pub use error::{PlanError, Result};
pub use geometry::{
    distance, is_blocked, is_close, next_position, next_position_checked, point_in_polygon,
    point_on_segment, segments_intersect,
};
pub use models::{
    Availability, Capability, DeliveryPlan, DeliveryRequest, Drone, DroneAvailability, DronePath,
    FleetSnapshot, FlightLeg, Point, Region, Requirements, ServicePoint, ServicePointDrones,
    POINT_EPSILON,
};
pub use pathfinding::{find_path, PathFinder, PathResult, SearchTermination};
pub use query::{
    drone_details, drones_with_attribute, drones_with_cooling, query_drones, AttributeQuery,
    AttributeValue, ComparisonOp, ATTRIBUTE_NAMES,
};
pub use scheduler::{plan_flights, plan_single_flight, FlightScheduler, TimeSlot};
