mod reading;

use chrono::Utc;
use clap::Parser;
use reading::Reading;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

const SENSOR_TYPES: [&str; 2] = ["temperature", "humidity"];
const BURST_SIZE: u64 = 50;

/// Posts synthetic sensor readings to a running readings API.
#[derive(Debug, Parser)]
struct Args {
    /// Base URL of the readings API
    #[arg(long, env = "API_URL", default_value = "http://127.0.0.1:5000")]
    url: String,

    /// Number of simulated devices
    #[arg(long, env = "DEVICES", default_value_t = 10)]
    devices: usize,

    /// Target readings per second
    #[arg(long, env = "RATE", default_value_t = 100)]
    rate: u64,

    /// Stop after this many readings; 0 runs until interrupted
    #[arg(long, env = "COUNT", default_value_t = 0)]
    count: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    anyhow::ensure!(args.devices > 0, "--devices must be at least 1");
    anyhow::ensure!(args.rate > 0, "--rate must be at least 1");

    info!("Starting readings simulator");
    info!(
        "Target: {}, Rate: {} readings/s, Devices: {}",
        args.url, args.rate, args.devices
    );

    let devices: Vec<String> = (0..args.devices)
        .map(|_| Uuid::new_v4().to_string())
        .collect();
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let burst_interval = Duration::from_millis((BURST_SIZE * 1000) / args.rate);
    info!(
        "Posting in bursts of {} readings every {:?}",
        BURST_SIZE, burst_interval
    );

    let mut rng = rand::thread_rng();
    let mut sent = 0u64;
    let mut failed = 0u64;
    let mut counter = 0u64;

    loop {
        let burst_start = Instant::now();

        for _ in 0..BURST_SIZE {
            if args.count > 0 && counter >= args.count {
                info!("Done: {} readings posted, {} failed", sent, failed);
                return Ok(());
            }

            let device = &devices[(counter % args.devices as u64) as usize];
            let sensor_type = SENSOR_TYPES[(counter / args.devices as u64) as usize % SENSOR_TYPES.len()];
            let reading = Reading::random(&mut rng, sensor_type, Utc::now().timestamp());
            counter += 1;

            let endpoint = format!("{}/devices/{}/readings/", args.url.trim_end_matches('/'), device);
            match client.post(&endpoint).json(&reading).send().await {
                Ok(resp) if resp.status() == reqwest::StatusCode::CREATED => sent += 1,
                Ok(resp) => {
                    failed += 1;
                    warn!("Unexpected status {} from {}", resp.status(), endpoint);
                }
                Err(e) => {
                    failed += 1;
                    error!("Failed to post reading: {}", e);
                }
            }
        }

        if counter % 1000 == 0 {
            info!("Posted {} readings ({} failed)", sent, failed);
        }

        let elapsed = burst_start.elapsed();
        if elapsed < burst_interval {
            tokio::time::sleep(burst_interval - elapsed).await;
        } else if elapsed > burst_interval * 2 {
            warn!(
                "Burst took {:?}, target was {:?} - API may be overloaded",
                elapsed, burst_interval
            );
        }
    }
}
