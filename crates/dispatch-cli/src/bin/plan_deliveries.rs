use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dispatch_cli::{load_requests, load_snapshot, parse_condition, Config};
use dispatch_core::{
    available_drones, drone_details, find_path, is_accessible, plan_flights, plan_single_flight,
    plan_single_flight_route, query_drones, route_geojson, AttributeQuery, Point,
};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Fleet snapshot JSON (drones, service points, availability, restricted areas)
    #[arg(long)]
    snapshot: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan every delivery across as many drones and flights as needed
    Plan {
        #[arg(long)]
        requests: PathBuf,
    },
    /// Deliver the whole batch with one drone in a single flight
    Single {
        #[arg(long)]
        requests: PathBuf,
        /// Print the route as GeoJSON instead of the full plan
        #[arg(long)]
        geojson: bool,
    },
    /// List drones able to serve the whole batch
    Available {
        #[arg(long)]
        requests: PathBuf,
    },
    /// Find drones by capability, e.g. --where "capacity>=4" --where "cooling=true"
    Query {
        #[arg(long = "where", value_parser = parse_where)]
        conditions: Vec<AttributeQuery>,
    },
    /// Show one drone's details
    Drone { id: String },
    /// Check that a point lies outside every restricted area
    Accessible {
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
    },
    /// Find a flight path between two points
    Path {
        #[arg(long, allow_hyphen_values = true)]
        from_lng: f64,
        #[arg(long, allow_hyphen_values = true)]
        from_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        to_lng: f64,
        #[arg(long, allow_hyphen_values = true)]
        to_lat: f64,
    },
}

fn parse_where(raw: &str) -> Result<AttributeQuery, String> {
    parse_condition(raw).map_err(|e| e.to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("dispatch_cli=info".parse()?)
        .add_directive("dispatch_core=info".parse()?);

    // stdout carries the result, logs go to stderr
    let json_layer = config
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json().with_writer(io::stderr));
    let text_layer = (!config.log_json)
        .then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env();
    init_tracing(&config)?;

    let planner = config.planner();
    let snapshot = load_snapshot(&args.snapshot)?;

    match args.command {
        Command::Plan { requests } => {
            let requests = load_requests(&requests)?;
            tracing::info!("Planning {} deliveries", requests.len());
            let plan =
                tokio::task::spawn_blocking(move || plan_flights(&requests, &snapshot, &planner))
                    .await
                    .context("Planning task failed")?;
            print_json(&plan)?;
        }
        Command::Single { requests, geojson } => {
            let requests = load_requests(&requests)?;
            if geojson {
                let summary = tokio::task::spawn_blocking(move || {
                    plan_single_flight_route(&requests, &snapshot, &planner)
                })
                .await
                .context("Planning task failed")?;
                print_json(&route_geojson(summary.as_ref()))?;
            } else {
                let plan = tokio::task::spawn_blocking(move || {
                    plan_single_flight(&requests, &snapshot, &planner)
                })
                .await
                .context("Planning task failed")?;
                print_json(&plan)?;
            }
        }
        Command::Available { requests } => {
            let requests = load_requests(&requests)?;
            print_json(&available_drones(&requests, &snapshot, &planner))?;
        }
        Command::Query { conditions } => {
            let ids = query_drones(&snapshot.drones, &conditions).context("Invalid query")?;
            print_json(&ids)?;
        }
        Command::Drone { id } => match drone_details(&snapshot.drones, &id) {
            Some(drone) => print_json(drone)?,
            None => {
                tracing::warn!("No drone with id '{}'", id);
                print_json(&serde_json::Value::Null)?;
            }
        },
        Command::Accessible { lng, lat } => {
            let point = Point::new(lng, lat);
            print_json(&json!({
                "point": point,
                "accessible": is_accessible(&point, &snapshot.restricted_areas),
            }))?;
        }
        Command::Path {
            from_lng,
            from_lat,
            to_lng,
            to_lat,
        } => {
            let start = Point::new(from_lng, from_lat);
            let goal = Point::new(to_lng, to_lat);
            let path = tokio::task::spawn_blocking(move || {
                find_path(&start, &goal, &snapshot.restricted_areas, &planner)
            })
            .await
            .context("Path search failed")?;
            if path.is_empty() {
                tracing::warn!("No path found");
            }
            print_json(&json!({
                "moves": path.len().saturating_sub(1),
                "path": path,
            }))?;
        }
    }

    Ok(())
}
