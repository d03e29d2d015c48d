pub mod damage;
pub mod events;
pub mod identity;
pub mod log_line;
pub mod pipeline;
pub mod sessions;
pub mod stats;

pub use damage::{classify_damage_source, DamageSource};
pub use events::{classify_event, CheatFlagKind, GameEvent};
pub use identity::{IdentityMap, PlayerKey};
pub use pipeline::{run_analysis, validate_run, AnalysisInputs, AnalysisOutcome, ParseSummary};
pub use sessions::{PlaytimeDocument, PlaytimeRecord};
pub use stats::merge::{FieldDiff, ValidationFinding, ValidationReport};
pub use stats::model::{CheatFlag, PlayerRecord, PlayerStatsDocument};
pub use stats::StatsAccumulator;

// Embedding programs (CLI, scheduler) opt into log output; the core only
// emits through the `tracing` macros.
pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
}
