//! Obstacle-avoiding A* search over fixed-length compass moves.
//!
//! States are points reachable from the start by repeated moves of
//! `step_size` in one of 16 directions. Every move costs 1 and the heuristic
//! is the straight-line distance measured in steps, so it never overestimates.
//! The search stops at the first expanded node within one step of the goal;
//! the returned path may therefore end short of the literal goal coordinates.

use crate::config::{PlannerConfig, DIRECTION_COUNT, DIRECTION_STEP_DEG};
use crate::geometry::{distance, is_blocked, next_position};
use crate::models::{Point, Region, POINT_EPSILON};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::Instant;

/// How often (in expansions) the wall-clock deadline is checked.
const DEADLINE_CHECK_INTERVAL: usize = 256;

/// Why a search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTermination {
    /// A node within one step of the goal was expanded
    Reached,
    /// Every reachable state was expanded without reaching the goal
    Exhausted,
    /// The expanded-node budget ran out
    NodeBudget,
    /// The wall-clock deadline passed
    Timeout,
}

#[derive(Debug, Clone)]
pub struct PathResult {
    /// Points from start to the reached node; empty unless `Reached`
    pub path: Vec<Point>,
    pub nodes_visited: usize,
    pub termination: SearchTermination,
}

impl PathResult {
    pub fn found(&self) -> bool {
        self.termination == SearchTermination::Reached
    }

    /// Steps flown along the path.
    pub fn moves(&self) -> u32 {
        self.path.len().saturating_sub(1) as u32
    }
}

/// Quantized point identity so float drift does not create duplicate states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct NodeKey {
    lng: i64,
    lat: i64,
}

impl NodeKey {
    fn of(point: &Point) -> Self {
        Self {
            lng: (point.lng / POINT_EPSILON).round() as i64,
            lat: (point.lat / POINT_EPSILON).round() as i64,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    key: NodeKey,
    g_score: u32,
    f_score: FloatOrd,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| self.g_score.cmp(&other.g_score))
            .then_with(|| self.key.cmp(&other.key))
    }
}

#[derive(Debug, Clone, Copy)]
struct SearchNode {
    point: Point,
    g_score: u32,
    parent: Option<NodeKey>,
}

/// Path search bound to one set of no-fly regions.
///
/// All bookkeeping is allocated per [`PathFinder::find`] call.
#[derive(Debug, Clone, Copy)]
pub struct PathFinder<'a> {
    regions: &'a [Region],
    config: &'a PlannerConfig,
}

impl<'a> PathFinder<'a> {
    pub fn new(regions: &'a [Region], config: &'a PlannerConfig) -> Self {
        Self { regions, config }
    }

    /// Moves from `current` that do not enter or touch any region.
    pub fn neighbours(&self, current: &Point) -> Vec<Point> {
        (0..DIRECTION_COUNT)
            .map(|i| next_position(current, i as f64 * DIRECTION_STEP_DEG, self.config.step_size))
            .filter(|candidate| {
                !self
                    .regions
                    .iter()
                    .any(|region| is_blocked(current, candidate, region))
            })
            .collect()
    }

    fn heuristic(&self, from: &Point, goal: &Point) -> f64 {
        distance(from, goal) / self.config.step_size
    }

    fn is_goal(&self, point: &Point, goal: &Point) -> bool {
        distance(point, goal) < self.config.step_size
    }

    pub fn find(&self, start: &Point, goal: &Point) -> PathResult {
        let deadline = self.config.search_timeout().map(|limit| Instant::now() + limit);

        let start_key = NodeKey::of(start);
        let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
        let mut closed_set: HashSet<NodeKey> = HashSet::new();
        let mut nodes: HashMap<NodeKey, SearchNode> = HashMap::new();

        nodes.insert(
            start_key,
            SearchNode {
                point: *start,
                g_score: 0,
                parent: None,
            },
        );
        open_set.push(Reverse(OpenNode {
            key: start_key,
            g_score: 0,
            f_score: FloatOrd(self.heuristic(start, goal)),
        }));

        let mut nodes_visited = 0usize;

        while let Some(Reverse(current)) = open_set.pop() {
            if closed_set.contains(&current.key) {
                continue;
            }
            let Some(node) = nodes.get(&current.key).copied() else {
                continue;
            };
            if current.g_score > node.g_score {
                continue;
            }

            if nodes_visited >= self.config.max_expanded_nodes {
                tracing::debug!(
                    "Path search gave up after {} expansions ({:?} -> {:?})",
                    nodes_visited,
                    start,
                    goal
                );
                return self.failure(nodes_visited, SearchTermination::NodeBudget);
            }
            if let Some(deadline) = deadline {
                if nodes_visited % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                    tracing::debug!("Path search timed out after {} expansions", nodes_visited);
                    return self.failure(nodes_visited, SearchTermination::Timeout);
                }
            }
            nodes_visited += 1;

            if self.is_goal(&node.point, goal) {
                return PathResult {
                    path: reconstruct_path(&nodes, current.key),
                    nodes_visited,
                    termination: SearchTermination::Reached,
                };
            }

            closed_set.insert(current.key);
            let tentative_g = node.g_score + 1;

            for neighbour in self.neighbours(&node.point) {
                let key = NodeKey::of(&neighbour);
                if closed_set.contains(&key) {
                    continue;
                }

                let point = match nodes.get(&key) {
                    Some(existing) if tentative_g >= existing.g_score => continue,
                    Some(existing) => existing.point,
                    None => neighbour,
                };

                nodes.insert(
                    key,
                    SearchNode {
                        point,
                        g_score: tentative_g,
                        parent: Some(current.key),
                    },
                );
                open_set.push(Reverse(OpenNode {
                    key,
                    g_score: tentative_g,
                    f_score: FloatOrd(f64::from(tentative_g) + self.heuristic(&point, goal)),
                }));
            }
        }

        tracing::debug!(
            "No route from {:?} to {:?} ({} nodes expanded)",
            start,
            goal,
            nodes_visited
        );
        self.failure(nodes_visited, SearchTermination::Exhausted)
    }

    fn failure(&self, nodes_visited: usize, termination: SearchTermination) -> PathResult {
        PathResult {
            path: Vec::new(),
            nodes_visited,
            termination,
        }
    }
}

fn reconstruct_path(nodes: &HashMap<NodeKey, SearchNode>, end: NodeKey) -> Vec<Point> {
    let mut path = Vec::new();
    let mut current = Some(end);
    while let Some(key) = current {
        let Some(node) = nodes.get(&key) else {
            break;
        };
        path.push(node.point);
        current = node.parent;
    }
    path.reverse();
    path
}

/// Shortest compass-move path from `start` to within one step of `goal`.
///
/// Returns an empty path when no route exists or the search budget runs out.
pub fn find_path(
    start: &Point,
    goal: &Point,
    regions: &[Region],
    config: &PlannerConfig,
) -> Vec<Point> {
    PathFinder::new(regions, config).find(start, goal).path
}
