//! String-based fleet queries over drone capabilities.
//!
//! Attribute names resolve through a fixed registry of typed accessors, so a
//! query can only reach the capability fields listed in [`ATTRIBUTE_NAMES`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};
use crate::models::{Capability, Drone};

/// Attributes a query may name.
pub const ATTRIBUTE_NAMES: [&str; 7] = [
    "cooling",
    "heating",
    "capacity",
    "maxMoves",
    "costPerMove",
    "costInitial",
    "costFinal",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeValue {
    Flag(bool),
    Number(f64),
}

pub type Accessor = fn(&Capability) -> AttributeValue;

/// Accessor for a registered attribute name.
pub fn accessor(name: &str) -> Option<Accessor> {
    let accessor: Accessor = match name {
        "cooling" => |c: &Capability| AttributeValue::Flag(c.cooling),
        "heating" => |c: &Capability| AttributeValue::Flag(c.heating),
        "capacity" => |c: &Capability| AttributeValue::Number(c.capacity),
        "maxMoves" => |c: &Capability| AttributeValue::Number(f64::from(c.max_moves)),
        "costPerMove" => |c: &Capability| AttributeValue::Number(c.cost_per_move),
        "costInitial" => |c: &Capability| AttributeValue::Number(c.cost_initial),
        "costFinal" => |c: &Capability| AttributeValue::Number(c.cost_final),
        _ => return None,
    };
    Some(accessor)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl ComparisonOp {
    pub fn apply(self, actual: f64, expected: f64) -> bool {
        match self {
            ComparisonOp::Eq => actual == expected,
            ComparisonOp::Ne => actual != expected,
            ComparisonOp::Lt => actual < expected,
            ComparisonOp::Gt => actual > expected,
            ComparisonOp::Le => actual <= expected,
            ComparisonOp::Ge => actual >= expected,
        }
    }
}

impl FromStr for ComparisonOp {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "=" => Ok(ComparisonOp::Eq),
            "!=" => Ok(ComparisonOp::Ne),
            "<" => Ok(ComparisonOp::Lt),
            ">" => Ok(ComparisonOp::Gt),
            "<=" => Ok(ComparisonOp::Le),
            ">=" => Ok(ComparisonOp::Ge),
            other => Err(PlanError::InvalidQuery(format!("unknown operator '{other}'"))),
        }
    }
}

/// One `{attribute, operator, value}` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeQuery {
    pub attribute: String,
    #[serde(default = "default_operator")]
    pub operator: String,
    pub value: String,
}

fn default_operator() -> String {
    "=".to_string()
}

impl AttributeQuery {
    pub fn new(
        attribute: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// A parsed condition ready to test drones against.
#[derive(Clone, Copy)]
enum Condition {
    /// Unknown attribute
    Never,
    Flag { accessor: Accessor, expected: bool },
    Number {
        accessor: Accessor,
        op: ComparisonOp,
        expected: f64,
    },
}

impl Condition {
    fn parse(query: &AttributeQuery) -> Result<Self> {
        let op: ComparisonOp = query.operator.parse()?;
        let Some(accessor) = accessor(&query.attribute) else {
            tracing::debug!("Query names unknown attribute '{}'", query.attribute);
            return Ok(Condition::Never);
        };
        let raw = query.value.trim();

        if query.attribute == "cooling" || query.attribute == "heating" {
            if op != ComparisonOp::Eq {
                return Err(PlanError::InvalidQuery(format!(
                    "'{}' only supports =",
                    query.attribute
                )));
            }
            let expected = match raw.to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => {
                    return Err(PlanError::InvalidQuery(format!(
                        "'{raw}' is not a boolean value for '{}'",
                        query.attribute
                    )))
                }
            };
            return Ok(Condition::Flag { accessor, expected });
        }

        let expected: f64 = raw.parse().map_err(|_| {
            PlanError::InvalidQuery(format!("'{raw}' is not a number for '{}'", query.attribute))
        })?;
        Ok(Condition::Number {
            accessor,
            op,
            expected,
        })
    }

    fn matches(&self, capability: &Capability) -> bool {
        match *self {
            Condition::Never => false,
            Condition::Flag { accessor, expected } => match accessor(capability) {
                AttributeValue::Flag(actual) => actual == expected,
                AttributeValue::Number(_) => false,
            },
            Condition::Number {
                accessor,
                op,
                expected,
            } => match accessor(capability) {
                AttributeValue::Number(actual) => op.apply(actual, expected),
                AttributeValue::Flag(_) => false,
            },
        }
    }
}

/// Ids of drones whose cooling flag equals `state`.
pub fn drones_with_cooling(fleet: &[Drone], state: bool) -> Vec<String> {
    fleet
        .iter()
        .filter(|drone| drone.capability.cooling == state)
        .map(|drone| drone.id.clone())
        .collect()
}

pub fn drone_details<'a>(fleet: &'a [Drone], id: &str) -> Option<&'a Drone> {
    fleet.iter().find(|drone| drone.id == id)
}

/// Ids of drones whose `attribute` equals `value`.
pub fn drones_with_attribute(fleet: &[Drone], attribute: &str, value: &str) -> Result<Vec<String>> {
    query_drones(fleet, &[AttributeQuery::new(attribute, "=", value)])
}

/// Ids of drones matching every query.
///
/// Malformed operators or values are errors; an unknown attribute simply
/// matches no drone.
pub fn query_drones(fleet: &[Drone], queries: &[AttributeQuery]) -> Result<Vec<String>> {
    let conditions = queries
        .iter()
        .map(Condition::parse)
        .collect::<Result<Vec<_>>>()?;

    Ok(fleet
        .iter()
        .filter(|drone| conditions.iter().all(|c| c.matches(&drone.capability)))
        .map(|drone| drone.id.clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drone(id: &str, cooling: bool, heating: bool, capacity: f64, max_moves: u32) -> Drone {
        Drone {
            id: id.to_string(),
            name: Some(format!("Drone {id}")),
            capability: Capability {
                cooling,
                heating,
                capacity,
                max_moves,
                cost_per_move: 0.01,
                cost_initial: 4.3,
                cost_final: 6.5,
            },
        }
    }

    fn fleet() -> Vec<Drone> {
        vec![
            drone("1", true, false, 4.0, 2000),
            drone("2", false, true, 8.0, 1000),
            drone("3", true, true, 20.0, 4000),
            drone("4", false, false, 8.0, 1500),
        ]
    }

    #[test]
    fn every_registered_attribute_resolves() {
        for name in ATTRIBUTE_NAMES {
            assert!(accessor(name).is_some(), "missing accessor for {name}");
        }
        assert!(accessor("max_moves").is_none());
        assert!(accessor("").is_none());
    }

    #[test]
    fn cooling_filter_matches_state() {
        assert_eq!(drones_with_cooling(&fleet(), true), vec!["1", "3"]);
        assert_eq!(drones_with_cooling(&fleet(), false), vec!["2", "4"]);
        assert!(drones_with_cooling(&[], true).is_empty());
    }

    #[test]
    fn details_lookup_by_id() {
        let fleet = fleet();
        assert_eq!(drone_details(&fleet, "3").map(|d| d.capability.capacity), Some(20.0));
        assert!(drone_details(&fleet, "99").is_none());
    }

    #[test]
    fn attribute_equality_on_numbers_and_flags() {
        let fleet = fleet();
        assert_eq!(drones_with_attribute(&fleet, "capacity", "8").unwrap(), vec!["2", "4"]);
        assert_eq!(drones_with_attribute(&fleet, "maxMoves", "4000.0").unwrap(), vec!["3"]);
        assert_eq!(drones_with_attribute(&fleet, "heating", "TRUE").unwrap(), vec!["2", "3"]);
    }

    #[test]
    fn unknown_attribute_matches_nothing() {
        let result = drones_with_attribute(&fleet(), "colour", "red").unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn queries_are_conjunctive() {
        let queries = vec![
            AttributeQuery::new("capacity", ">=", "8"),
            AttributeQuery::new("maxMoves", "<", "2000"),
            AttributeQuery::new("cooling", "=", "false"),
        ];
        assert_eq!(query_drones(&fleet(), &queries).unwrap(), vec!["2", "4"]);

        let none: Vec<AttributeQuery> = Vec::new();
        assert_eq!(query_drones(&fleet(), &none).unwrap().len(), 4);
    }

    #[test]
    fn every_operator_compares_numbers() {
        let cases = [
            ("=", 8.0, true),
            ("!=", 8.0, false),
            ("<", 9.0, true),
            (">", 7.0, true),
            ("<=", 8.0, true),
            (">=", 8.5, false),
        ];
        for (op, expected, outcome) in cases {
            let op: ComparisonOp = op.parse().unwrap();
            assert_eq!(op.apply(8.0, expected), outcome, "{op:?} {expected}");
        }
    }

    #[test]
    fn malformed_queries_are_rejected() {
        let fleet = fleet();
        let bad_op = query_drones(&fleet, &[AttributeQuery::new("capacity", "=~", "4")]);
        assert!(matches!(bad_op, Err(PlanError::InvalidQuery(_))));

        let bad_number = drones_with_attribute(&fleet, "capacity", "lots");
        assert!(matches!(bad_number, Err(PlanError::InvalidQuery(_))));

        let bad_flag = drones_with_attribute(&fleet, "cooling", "yes");
        assert!(matches!(bad_flag, Err(PlanError::InvalidQuery(_))));

        for op in ["!=", "<", ">="] {
            let flag = query_drones(&fleet, &[AttributeQuery::new("heating", op, "true")]);
            assert!(matches!(flag, Err(PlanError::InvalidQuery(_))), "heating {op}");
        }
    }

    #[test]
    fn query_deserializes_with_default_operator() {
        let query: AttributeQuery =
            serde_json::from_str(r#"{"attribute": "capacity", "value": "4"}"#).unwrap();
        assert_eq!(query, AttributeQuery::new("capacity", "=", "4"));
    }
}
