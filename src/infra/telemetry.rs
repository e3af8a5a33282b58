use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "piazza_answer_generated_total",
            Unit::Count,
            "Total number of automated answers persisted."
        );
        describe_counter!(
            "piazza_answer_skipped_total",
            Unit::Count,
            "Total number of candidates that produced no answer, by reason."
        );
        describe_counter!(
            "piazza_model_attempt_total",
            Unit::Count,
            "Total number of completion calls, by outcome."
        );
        describe_counter!(
            "piazza_model_fallback_total",
            Unit::Count,
            "Total number of times the secondary model was tried."
        );
        describe_histogram!(
            "piazza_answer_generation_ms",
            Unit::Milliseconds,
            "Model time per generation, both attempts included."
        );
        describe_counter!(
            "piazza_cache_hit_total",
            Unit::Count,
            "Total number of item view cache hits."
        );
        describe_counter!(
            "piazza_cache_miss_total",
            Unit::Count,
            "Total number of item view cache misses."
        );
        describe_counter!(
            "piazza_cache_evict_total",
            Unit::Count,
            "Total number of item view cache evictions due to capacity."
        );
        describe_counter!(
            "piazza_cache_invalidate_total",
            Unit::Count,
            "Total number of item view cache invalidations."
        );
    });
}
