//! One-off batch tool that precomputes driving distances for a catalog
//! dataset.
//!
//! Reads a JSON file of crags with GPS coordinates, queries the
//! OpenRouteService directions API for the driving distance from a fixed
//! origin to each crag, and writes the resulting distance dataset for the
//! catalog data directory. Rate limits are respected with retries and a
//! pause every 30 calls. This tool is never invoked by the server.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};

const ORS_DIRECTIONS_URL: &str = "https://api.openrouteservice.org/v2/directions/driving-car";
const RETRIES: u32 = 3;
const CALLS_PER_PAUSE: u32 = 30;
const PAUSE_SECS: u64 = 70;

#[derive(Debug, Parser)]
#[clap(name = "distance-fetcher", version = clap::crate_version!())]
struct DistanceFetcherApplication {
    /// Input JSON file of crags with GPS coordinates
    #[clap(long)]
    input: PathBuf,

    /// Output distance dataset file
    #[clap(long)]
    output: PathBuf,

    /// Origin latitude
    #[clap(long)]
    origin_lat: f64,

    /// Origin longitude
    #[clap(long)]
    origin_lon: f64,

    /// OpenRouteService API key; defaults to the ORS_API_KEY environment
    /// variable
    #[clap(long)]
    api_key: Option<String>,
}

/// Input crag entry: coordinates without a distance
#[derive(Debug, Deserialize)]
struct CragLocation {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    climbs: i64,
}

/// Output dataset entry, catalog-compatible
#[derive(Debug, Serialize)]
struct CragDistance {
    name: String,
    lat: f64,
    lon: f64,
    climbs: i64,
    distance: f64,
}

#[derive(Debug, Serialize)]
struct DirectionsRequest {
    coordinates: [[f64; 2]; 2],
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    summary: RouteSummary,
}

#[derive(Debug, Deserialize)]
struct RouteSummary {
    /// Driving distance in metres
    distance: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "distance_fetcher=info".into()),
        )
        .init();

    let args = DistanceFetcherApplication::parse();
    let api_key = match args.api_key {
        Some(key) => key,
        None => std::env::var("ORS_API_KEY")
            .context("no --api-key given and ORS_API_KEY is not set")?,
    };

    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("cannot read input file {}", args.input.display()))?;
    let crags: Vec<CragLocation> =
        serde_json::from_str(&raw).context("input file is not a JSON array of crags")?;

    let client = reqwest::Client::new();
    let mut distances = Vec::new();
    let mut api_call_count = 0u32;

    for crag in crags {
        match fetch_distance_km(&client, &api_key, (args.origin_lat, args.origin_lon), &crag).await
        {
            Ok(distance_km) => {
                api_call_count += 1;
                distances.push(CragDistance {
                    name: crag.name,
                    lat: crag.lat,
                    lon: crag.lon,
                    climbs: crag.climbs,
                    distance: (distance_km * 100.0).round() / 100.0,
                });

                if api_call_count % CALLS_PER_PAUSE == 0 {
                    tracing::info!("Rate limit budget reached, pausing for {}s", PAUSE_SECS);
                    tokio::time::sleep(Duration::from_secs(PAUSE_SECS)).await;
                }
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {}", crag.name, e);
            }
        }
    }

    let output = serde_json::to_string_pretty(&distances)?;
    std::fs::write(&args.output, output)
        .with_context(|| format!("cannot write output file {}", args.output.display()))?;

    tracing::info!(
        "Saved {} crag distances to {}",
        distances.len(),
        args.output.display()
    );
    Ok(())
}

/// Fetch the driving distance from the origin to one crag, retrying on
/// rate-limit responses with growing backoff.
async fn fetch_distance_km(
    client: &reqwest::Client,
    api_key: &str,
    origin: (f64, f64),
    crag: &CragLocation,
) -> anyhow::Result<f64> {
    // ORS expects [lon, lat] pairs
    let request = DirectionsRequest {
        coordinates: [[origin.1, origin.0], [crag.lon, crag.lat]],
    };

    for attempt in 0..RETRIES {
        let response = client
            .post(ORS_DIRECTIONS_URL)
            .header("Authorization", api_key)
            .json(&request)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            if attempt + 1 < RETRIES {
                let backoff = Duration::from_secs(5 * (attempt as u64 + 1));
                tracing::warn!(
                    "Rate limit exceeded for {}, retrying in {:?} ({}/{})",
                    crag.name,
                    backoff,
                    attempt + 1,
                    RETRIES
                );
                tokio::time::sleep(backoff).await;
                continue;
            }
            anyhow::bail!("rate limit exceeded after {} attempts", RETRIES);
        }

        if !response.status().is_success() {
            anyhow::bail!("directions API returned {}", response.status());
        }

        let data: DirectionsResponse = response.json().await?;
        let route = data
            .routes
            .first()
            .context("directions response contains no routes")?;
        return Ok(route.summary.distance / 1000.0);
    }

    anyhow::bail!("rate limit exceeded after {} attempts", RETRIES)
}
