pub mod alerts;
pub mod backtest;
pub mod calibration;
pub mod config;
pub mod danger;
pub mod engine;
pub mod error;
pub mod historical_dataset;
pub mod ingest;
pub mod intervals;
pub mod live_context;
pub mod live_events;
pub mod match_log;
pub mod momentum;
pub mod recommend;
pub mod recurrence;
pub mod saturation;
pub mod team_names;

pub use config::EngineConfig;
pub use engine::{PredictionResult, PredictionStatus, Predictor};
pub use live_context::{LiveMatchContext, LiveSnapshot, MatchStatus};
pub use match_log::{MatchLog, MatchRecord, VenueSide};
pub use recurrence::{HistorySnapshot, SnapshotStore, Window};

/// `RUST_LOG`-driven fmt subscriber for the binaries. Safe to call twice.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
