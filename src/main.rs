use std::thread;
use std::time::Duration;

use clap::Parser;
use rand::Rng;
use tracing::{info, Level};

use ratekeeper::config::LimiterConfig;
use ratekeeper::limiter::{self, Algorithm, Limiter};

/// Demo driver: constructs one limiter and pushes simulated traffic for a
/// single key through it, printing the outcome of every request.
#[derive(Parser, Debug)]
#[command(name = "ratekeeper", version, about = "Per-key rate limiter demo")]
struct Args {
    /// Policy to demonstrate: fixed_window, sliding_window, or token_bucket
    #[arg(long, default_value = "fixed_window")]
    algorithm: String,

    /// Admissions per window (fixed/sliding window)
    #[arg(long, default_value_t = 2)]
    limit: u64,

    /// Window duration in milliseconds (fixed/sliding window)
    #[arg(long, default_value_t = 500)]
    window_ms: u64,

    /// Bucket capacity (token bucket)
    #[arg(long, default_value_t = 5)]
    capacity: u64,

    /// Tokens per refill step (token bucket)
    #[arg(long, default_value_t = 1)]
    refill_amount: u64,

    /// Refill step duration in milliseconds (token bucket)
    #[arg(long, default_value_t = 1000)]
    refill_duration_ms: u64,

    /// Number of requests in each burst
    #[arg(long, default_value_t = 10)]
    requests: u32,

    /// Key the simulated traffic is attributed to
    #[arg(long, default_value = "user123")]
    key: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let args = Args::parse();
    let algorithm: Algorithm = args.algorithm.parse()?;

    let config = LimiterConfig {
        limit: args.limit,
        window_ms: args.window_ms,
        capacity: args.capacity,
        refill_amount: args.refill_amount,
        refill_duration_ms: args.refill_duration_ms,
    };
    let limiter = limiter::build(algorithm, &config)?;

    info!(%algorithm, rate = limiter.rate(), "Limiter constructed");

    let mut rng = rand::thread_rng();

    info!("--- First burst ---");
    run_burst(limiter.as_ref(), &args.key, args.requests, &mut rng);

    // Let windows expire and buckets refill before the second burst.
    info!("--- Idling to let the limiter recover ---");
    thread::sleep(Duration::from_millis(args.window_ms.max(args.refill_duration_ms) * 2));

    info!("--- Second burst ---");
    run_burst(limiter.as_ref(), &args.key, args.requests.min(3), &mut rng);

    info!("--- Blocking until one more admission is possible ---");
    limiter.wait(&args.key);
    info!(admitted = limiter.allow(&args.key), "Post-wait request");

    Ok(())
}

fn run_burst(limiter: &dyn Limiter, key: &str, requests: u32, rng: &mut impl Rng) {
    for i in 1..=requests {
        let admitted = limiter.allow(key);
        info!(
            request = i,
            admitted,
            rate = limiter.rate(),
            tokens = limiter.token(key),
            "Request processed"
        );
        if !admitted {
            info!(request = i, "Rate limited");
        }

        // Jittered arrival spacing, roughly every 200ms.
        thread::sleep(Duration::from_millis(150 + rng.gen_range(0..100)));
    }
}
