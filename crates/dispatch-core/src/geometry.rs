//! Planar geometry over longitude/latitude degrees.
//!
//! Distances are flat Euclidean norms in degree space. This is only accurate
//! over small local extents, which is all the planner needs.

use crate::config::DIRECTION_STEP_DEG;
use crate::error::{PlanError, Result};
use crate::models::{Point, Region};

/// Collinearity tolerance for boundary checks.
const COLLINEAR_EPS: f64 = 1e-9;

/// Orientation tolerance for segment crossing tests. Coordinates are degrees,
/// so cross products of step-sized vectors are around 1e-8.
const ORIENT_EPS: f64 = 1e-15;

/// Euclidean distance between two points in degrees.
pub fn distance(a: &Point, b: &Point) -> f64 {
    let dx = a.lng - b.lng;
    let dy = a.lat - b.lat;
    (dx * dx + dy * dy).sqrt()
}

/// True if the two points are less than one step apart.
pub fn is_close(a: &Point, b: &Point, step_size: f64) -> bool {
    distance(a, b) < step_size
}

/// Ray-casting containment test over the closed ring.
///
/// A horizontal ray is cast towards +lng and edge crossings are counted; an
/// odd count means inside. Points on the boundary are not treated specially.
pub fn point_in_polygon(point: &Point, region: &Region) -> bool {
    let xp = point.lng;
    let yp = point.lat;
    let mut crossings = 0usize;

    for (a, b) in region.edges() {
        let (x1, y1) = (a.lng, a.lat);
        let (x2, y2) = (b.lng, b.lat);
        if ((yp <= y1) != (yp <= y2)) && (xp <= x1 + ((yp - y1) / (y2 - y1)) * (x2 - x1)) {
            crossings += 1;
        }
    }

    crossings % 2 == 1
}

/// True if `p` lies on segment `a`-`b`, endpoints included.
pub fn point_on_segment(p: &Point, a: &Point, b: &Point) -> bool {
    let abx = b.lng - a.lng;
    let aby = b.lat - a.lat;
    let apx = p.lng - a.lng;
    let apy = p.lat - a.lat;

    let cross = abx * apy - aby * apx;
    if cross.abs() > COLLINEAR_EPS {
        return false;
    }

    let dot = abx * apx + aby * apy;
    if dot < 0.0 {
        return false;
    }

    let len_sq = abx * abx + aby * aby;
    dot <= len_sq
}

/// General segment intersection, including touching and collinear overlap.
pub fn segments_intersect(p1: &Point, p2: &Point, q1: &Point, q2: &Point) -> bool {
    fn orient(p: &Point, q: &Point, r: &Point) -> f64 {
        (q.lng - p.lng) * (r.lat - p.lat) - (q.lat - p.lat) * (r.lng - p.lng)
    }

    fn within(a: f64, b: f64, value: f64) -> bool {
        value >= a.min(b) && value <= a.max(b)
    }

    fn on_segment(p: &Point, q: &Point, r: &Point) -> bool {
        within(p.lng, q.lng, r.lng) && within(p.lat, q.lat, r.lat)
    }

    let o1 = orient(p1, p2, q1);
    let o2 = orient(p1, p2, q2);
    let o3 = orient(q1, q2, p1);
    let o4 = orient(q1, q2, p2);

    if o1.abs() <= ORIENT_EPS && on_segment(p1, p2, q1) {
        return true;
    }
    if o2.abs() <= ORIENT_EPS && on_segment(p1, p2, q2) {
        return true;
    }
    if o3.abs() <= ORIENT_EPS && on_segment(q1, q2, p1) {
        return true;
    }
    if o4.abs() <= ORIENT_EPS && on_segment(q1, q2, p2) {
        return true;
    }

    let p_crosses = (o1 > ORIENT_EPS && o2 < -ORIENT_EPS) || (o1 < -ORIENT_EPS && o2 > ORIENT_EPS);
    let q_crosses = (o3 > ORIENT_EPS && o4 < -ORIENT_EPS) || (o3 < -ORIENT_EPS && o4 > ORIENT_EPS);
    p_crosses && q_crosses
}

/// Unit heading vector. Axis-aligned angles are returned exactly.
fn heading(angle_deg: f64) -> (f64, f64) {
    let normalized = angle_deg.rem_euclid(360.0);
    if normalized == 0.0 {
        (1.0, 0.0)
    } else if normalized == 90.0 {
        (0.0, 1.0)
    } else if normalized == 180.0 {
        (-1.0, 0.0)
    } else if normalized == 270.0 {
        (0.0, -1.0)
    } else {
        let rad = normalized.to_radians();
        (rad.cos(), rad.sin())
    }
}

/// Move one step from `start` along `angle_deg` (0 = east, 90 = north).
pub fn next_position(start: &Point, angle_deg: f64, step_size: f64) -> Point {
    let (dx, dy) = heading(angle_deg);
    Point::new(start.lng + dx * step_size, start.lat + dy * step_size)
}

/// Like [`next_position`] but only accepts the 16 compass directions in
/// `[0, 360]`.
pub fn next_position_checked(start: &Point, angle_deg: f64, step_size: f64) -> Result<Point> {
    if !angle_deg.is_finite()
        || !(0.0..=360.0).contains(&angle_deg)
        || angle_deg % DIRECTION_STEP_DEG != 0.0
    {
        return Err(PlanError::InvalidAngle(angle_deg));
    }
    Ok(next_position(start, angle_deg, step_size))
}

fn point_on_boundary(point: &Point, region: &Region) -> bool {
    region.edges().any(|(a, b)| point_on_segment(point, a, b))
}

/// Boundary-inclusive containment used by the path search.
///
/// Unlike [`point_in_polygon`], horizontal edges are skipped during ray
/// casting and the crossing test uses `>=`, matching the search's view that
/// touching a region is as bad as entering it.
fn inside_or_on(point: &Point, region: &Region) -> bool {
    if point_on_boundary(point, region) {
        return true;
    }

    let xp = point.lng;
    let yp = point.lat;
    let mut crossings = 0usize;
    for (a, b) in region.edges() {
        let dy = b.lat - a.lat;
        if dy.abs() < 1e-12 {
            continue;
        }
        if (yp <= a.lat) != (yp <= b.lat) {
            let x_intersect = a.lng + (yp - a.lat) * (b.lng - a.lng) / dy;
            if x_intersect >= xp {
                crossings += 1;
            }
        }
    }
    crossings % 2 == 1
}

/// True if moving from `current` to `candidate` would enter or touch `region`.
pub fn is_blocked(current: &Point, candidate: &Point, region: &Region) -> bool {
    if inside_or_on(candidate, region) {
        return true;
    }
    region
        .edges()
        .any(|(a, b)| segments_intersect(current, candidate, a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    const STEP: f64 = 0.00015;

    fn zone_a() -> Region {
        Region::new(
            "No-fly Zone A",
            vec![
                Point::new(-3.1925, 55.9435),
                Point::new(-3.1925, 55.9415),
                Point::new(-3.1865, 55.9415),
                Point::new(-3.1865, 55.9435),
                Point::new(-3.1925, 55.9435),
            ],
        )
    }

    fn campus_square() -> Region {
        Region::new(
            "square",
            vec![
                Point::new(-3.192473, 55.946233),
                Point::new(-3.192473, 55.942617),
                Point::new(-3.184319, 55.942617),
                Point::new(-3.184319, 55.946233),
                Point::new(-3.192473, 55.946233),
            ],
        )
    }

    fn rotate(region: &Region, by: usize) -> Region {
        let ring = &region.vertices[..region.vertices.len() - 1];
        let mut vertices: Vec<Point> = ring[by..].iter().chain(&ring[..by]).copied().collect();
        vertices.push(vertices[0]);
        Region::new(region.name.clone(), vertices)
    }

    // Start of a search step that sits just outside the bottom-right corner.
    fn corner_start() -> Point {
        Point::new(-3.1865001, 55.94149995)
    }

    #[test]
    fn distance_between_known_points() {
        let a = Point::new(-3.192473, 55.946233);
        let b = Point::new(-3.192473, 55.942617);
        assert!((distance(&a, &b) - 0.003616).abs() < STEP);
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let a = Point::new(rng.random_range(-4.0..-3.0), rng.random_range(55.0..56.0));
            let b = Point::new(rng.random_range(-4.0..-3.0), rng.random_range(55.0..56.0));
            assert_eq!(distance(&a, &b), distance(&b, &a));
            assert_eq!(distance(&a, &a), 0.0);
        }
    }

    #[test]
    fn is_close_uses_step_size() {
        let a = Point::new(-3.192473, 55.946233);
        assert!(is_close(&a, &Point::new(-3.192473, 55.946300), STEP));
        assert!(!is_close(&a, &Point::new(-3.192473, 55.946533), STEP));
    }

    #[test]
    fn square_contains_interior_point() {
        let region = campus_square();
        assert!(point_in_polygon(&Point::new(-3.189123, 55.945123), &region));
        assert!(!point_in_polygon(&Point::new(-3.189123, 55.946300), &region));
    }

    #[test]
    fn containment_ignores_ring_rotation() {
        let region = campus_square();
        let mut rng = rand::rng();
        for _ in 0..100 {
            let p = Point::new(
                rng.random_range(-3.195..-3.182),
                rng.random_range(55.940..55.948),
            );
            let expected = point_in_polygon(&p, &region);
            for by in 1..4 {
                assert_eq!(
                    point_in_polygon(&p, &rotate(&region, by)),
                    expected,
                    "rotation by {by} changed result for {p:?}"
                );
            }
        }
    }

    #[test]
    fn concave_region_excludes_notch() {
        let region = Region::new(
            "u-shape",
            vec![
                Point::new(0.0, 0.0),
                Point::new(3.0, 0.0),
                Point::new(3.0, 3.0),
                Point::new(2.0, 3.0),
                Point::new(2.0, 1.0),
                Point::new(1.0, 1.0),
                Point::new(1.0, 3.0),
                Point::new(0.0, 3.0),
                Point::new(0.0, 0.0),
            ],
        );
        assert!(point_in_polygon(&Point::new(0.5, 2.0), &region));
        assert!(!point_in_polygon(&Point::new(1.5, 2.0), &region));
        assert!(point_in_polygon(&Point::new(1.5, 0.5), &region));
    }

    #[test]
    fn next_position_is_exact_on_axes() {
        let start = Point::new(-3.192473, 55.946233);
        let north = next_position(&start, 90.0, STEP);
        assert_eq!(north.lng, start.lng);
        assert!((north.lat - 55.946383).abs() < STEP);

        let east = next_position(&start, 0.0, STEP);
        assert_eq!(east.lat, start.lat);
        assert_eq!(east.lng, start.lng + STEP);

        let west = next_position(&start, 180.0, STEP);
        assert_eq!(west.lat, start.lat);
        let south = next_position(&start, 270.0, STEP);
        assert_eq!(south.lng, start.lng);
        assert_eq!(south.lat, start.lat - STEP);
    }

    #[test]
    fn next_position_diagonal_covers_one_step() {
        let start = Point::new(-3.192473, 55.946233);
        let next = next_position(&start, 45.0, STEP);
        assert!((distance(&start, &next) - STEP).abs() < 1e-12);
        assert!(next.lng > start.lng && next.lat > start.lat);
    }

    #[test]
    fn checked_next_position_rejects_off_compass_angles() {
        let start = Point::new(-3.192473, 55.946233);
        assert!(next_position_checked(&start, 22.5, STEP).is_ok());
        assert!(next_position_checked(&start, 360.0, STEP).is_ok());
        assert!(matches!(
            next_position_checked(&start, 10.0, STEP),
            Err(PlanError::InvalidAngle(_))
        ));
        assert!(next_position_checked(&start, -22.5, STEP).is_err());
        assert!(next_position_checked(&start, 382.5, STEP).is_err());
    }

    #[test]
    fn point_on_segment_includes_endpoints() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(2.0, 2.0);
        assert!(point_on_segment(&a, &a, &b));
        assert!(point_on_segment(&b, &a, &b));
        assert!(point_on_segment(&Point::new(1.0, 1.0), &a, &b));
        assert!(!point_on_segment(&Point::new(3.0, 3.0), &a, &b));
        assert!(!point_on_segment(&Point::new(1.0, 1.5), &a, &b));
    }

    #[test]
    fn segments_intersect_handles_crossing_touching_and_disjoint() {
        let p1 = Point::new(0.0, 0.0);
        let p2 = Point::new(2.0, 2.0);
        assert!(segments_intersect(&p1, &p2, &Point::new(0.0, 2.0), &Point::new(2.0, 0.0)));
        // T-junction
        assert!(segments_intersect(&p1, &p2, &Point::new(1.0, 1.0), &Point::new(3.0, 0.0)));
        // collinear overlap
        assert!(segments_intersect(&p1, &p2, &Point::new(1.0, 1.0), &Point::new(3.0, 3.0)));
        // collinear but apart
        assert!(!segments_intersect(&p1, &p2, &Point::new(3.0, 3.0), &Point::new(4.0, 4.0)));
        // parallel
        assert!(!segments_intersect(&p1, &p2, &Point::new(1.0, 0.0), &Point::new(3.0, 2.0)));
    }

    #[test]
    fn candidate_on_vertex_is_blocked() {
        let candidate = Point::new(-3.1865, 55.9435);
        assert!(is_blocked(&corner_start(), &candidate, &zone_a()));
    }

    #[test]
    fn candidate_inside_is_blocked() {
        let candidate = Point::new(-3.18655, 55.9417);
        assert!(is_blocked(&corner_start(), &candidate, &zone_a()));
    }

    #[test]
    fn step_clipping_corner_is_blocked() {
        let candidate = Point::new(-3.186394034, 55.94160602);
        assert!(is_blocked(&corner_start(), &candidate, &zone_a()));
    }

    #[test]
    fn step_away_from_region_is_clear() {
        let candidate = Point::new(-3.18649, 55.9414);
        assert!(!is_blocked(&corner_start(), &candidate, &zone_a()));
    }

    #[test]
    fn candidate_on_edge_is_blocked() {
        let candidate = Point::new(-3.1905, 55.9415);
        assert!(is_blocked(&corner_start(), &candidate, &zone_a()));
    }

    #[test]
    fn candidate_collinear_beyond_edge_is_clear() {
        let beyond = Point::new(-3.18645, 55.9415);
        assert!(!is_blocked(&corner_start(), &beyond, &zone_a()));
        let before = Point::new(-3.193, 55.9415);
        assert!(!is_blocked(&corner_start(), &before, &zone_a()));
    }

    #[test]
    fn boundary_point_differs_between_containment_tests() {
        // The plain test treats the bottom edge as outside; the search does not.
        let region = zone_a();
        let on_edge = Point::new(-3.1905, 55.9415);
        assert!(is_blocked(&Point::new(-3.1905, 55.9413), &on_edge, &region));
        assert!(!point_in_polygon(&on_edge, &region));
    }
}
