//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use apalis_cron::Schedule;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;
use uuid::Uuid;

use crate::domain::category::DEFAULT_QA_KEYWORDS;

pub use cli::{BatchArgs, CliArgs, Command, GlobalOverrides, ItemArgs, RenderArgs};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "piazza";
const ENV_PREFIX: &str = "PIAZZA";
const DEFAULT_COMPLETION_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_PRIMARY_MODEL: &str = "gpt-4o";
const DEFAULT_SECONDARY_MODEL: &str = "gpt-4o-mini";
const DEFAULT_COMPLETION_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TEMPERATURE: f32 = 0.4;
const DEFAULT_BOT_USER_ID: Uuid = Uuid::from_u128(0x5f0c_1e0a_0000_4000_8000_0000_0000_0001);
const DEFAULT_BOT_DISPLAY_NAME: &str = "Piazza Assistant";
const DEFAULT_MAX_COMMENT_LENGTH: usize = 5000;
const DEFAULT_LANGUAGE: &str = "English";
const DEFAULT_MAX_SOURCE_CHARS: usize = 4000;
const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_CANDIDATE_WINDOW: usize = 50;
const DEFAULT_BATCH_DELAY_MS: u64 = 2_000;
const DEFAULT_PERSISTENCE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_SCHEDULE: &str = "0 */15 * * * *";
const DEFAULT_CACHE_CAPACITY: usize = 500;
const DEFAULT_CACHE_NAMESPACE: &str = "item-view";
const DEFAULT_STORE_PATH: &str = "data/piazza.toml";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub completion: CompletionSettings,
    pub answers: AnswerSettings,
    pub cache: CacheSettings,
    pub store: StoreSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub endpoint: Url,
    pub api_key: Option<String>,
    pub primary_model: String,
    pub secondary_model: String,
    pub timeout: Duration,
    pub max_tokens: NonZeroU32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct AnswerSettings {
    pub bot_user_id: Uuid,
    pub bot_display_name: String,
    pub max_comment_length: NonZeroUsize,
    pub language: String,
    pub max_source_chars: NonZeroUsize,
    pub keywords: Vec<String>,
    pub batch_size: NonZeroUsize,
    pub candidate_window: NonZeroUsize,
    pub batch_delay: Duration,
    pub persistence_timeout: Duration,
    pub schedule: Schedule,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub capacity: NonZeroUsize,
    pub namespace: String,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub path: PathBuf,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("answers.keywords")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_global_overrides(&cli.overrides);
    if let Some(Command::Batch(args)) = cli.command.as_ref() {
        raw.apply_batch_overrides(args);
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    completion: RawCompletionSettings,
    answers: RawAnswerSettings,
    cache: RawCacheSettings,
    store: RawStoreSettings,
}

impl RawSettings {
    fn apply_global_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(path) = overrides.store_path.as_ref() {
            self.store.path = Some(path.clone());
        }
        if let Some(endpoint) = overrides.completion_endpoint.as_ref() {
            self.completion.endpoint = Some(endpoint.clone());
        }
        if let Some(model) = overrides.primary_model.as_ref() {
            self.completion.primary_model = Some(model.clone());
        }
        if let Some(model) = overrides.secondary_model.as_ref() {
            self.completion.secondary_model = Some(model.clone());
        }
        if let Some(ms) = overrides.completion_timeout_ms {
            self.completion.timeout_ms = Some(ms);
        }
        if let Some(ms) = overrides.batch_delay_ms {
            self.answers.batch_delay_ms = Some(ms);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
    }

    fn apply_batch_overrides(&mut self, args: &BatchArgs) {
        if let Some(max) = args.max {
            self.answers.batch_size = Some(max);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            completion,
            answers,
            cache,
            store,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let completion = build_completion_settings(completion)?;
        let answers = build_answer_settings(answers)?;
        let cache = build_cache_settings(cache)?;
        let store = build_store_settings(store)?;

        Ok(Self {
            logging,
            completion,
            answers,
            cache,
            store,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_completion_settings(
    completion: RawCompletionSettings,
) -> Result<CompletionSettings, LoadError> {
    let endpoint = completion
        .endpoint
        .unwrap_or_else(|| DEFAULT_COMPLETION_ENDPOINT.to_string());
    let endpoint = Url::parse(endpoint.trim())
        .map_err(|err| LoadError::invalid("completion.endpoint", format!("invalid URL: {err}")))?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "completion.endpoint",
            "scheme must be http or https",
        ));
    }

    let api_key = completion.api_key.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let primary_model = non_blank(
        completion.primary_model,
        DEFAULT_PRIMARY_MODEL,
        "completion.primary_model",
    )?;
    let secondary_model = non_blank(
        completion.secondary_model,
        DEFAULT_SECONDARY_MODEL,
        "completion.secondary_model",
    )?;

    let timeout = positive_millis(
        completion.timeout_ms.unwrap_or(DEFAULT_COMPLETION_TIMEOUT_MS),
        "completion.timeout_ms",
    )?;

    let max_tokens = NonZeroU32::new(completion.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS))
        .ok_or_else(|| LoadError::invalid("completion.max_tokens", "must be greater than zero"))?;

    let temperature = completion.temperature.unwrap_or(DEFAULT_TEMPERATURE);
    if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
        return Err(LoadError::invalid(
            "completion.temperature",
            "must be between 0.0 and 2.0",
        ));
    }

    Ok(CompletionSettings {
        endpoint,
        api_key,
        primary_model,
        secondary_model,
        timeout,
        max_tokens,
        temperature,
    })
}

fn build_answer_settings(answers: RawAnswerSettings) -> Result<AnswerSettings, LoadError> {
    let bot_user_id = answers.bot_user_id.unwrap_or(DEFAULT_BOT_USER_ID);
    if bot_user_id.is_nil() {
        return Err(LoadError::invalid(
            "answers.bot_user_id",
            "must not be the nil UUID",
        ));
    }

    let bot_display_name = non_blank(
        answers.bot_display_name,
        DEFAULT_BOT_DISPLAY_NAME,
        "answers.bot_display_name",
    )?;
    let language = non_blank(answers.language, DEFAULT_LANGUAGE, "answers.language")?;

    let keywords: Vec<String> = answers
        .keywords
        .unwrap_or_else(|| DEFAULT_QA_KEYWORDS.iter().map(|k| k.to_string()).collect())
        .into_iter()
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect();
    if keywords.is_empty() {
        return Err(LoadError::invalid(
            "answers.keywords",
            "at least one keyword is required",
        ));
    }

    let schedule_expr = answers
        .schedule
        .unwrap_or_else(|| DEFAULT_SCHEDULE.to_string());
    let schedule = Schedule::from_str(schedule_expr.trim()).map_err(|err| {
        LoadError::invalid("answers.schedule", format!("invalid cron expression: {err}"))
    })?;

    Ok(AnswerSettings {
        bot_user_id,
        bot_display_name,
        max_comment_length: non_zero_usize(
            answers
                .max_comment_length
                .unwrap_or(DEFAULT_MAX_COMMENT_LENGTH),
            "answers.max_comment_length",
        )?,
        language,
        max_source_chars: non_zero_usize(
            answers.max_source_chars.unwrap_or(DEFAULT_MAX_SOURCE_CHARS),
            "answers.max_source_chars",
        )?,
        keywords,
        batch_size: non_zero_usize(
            answers.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            "answers.batch_size",
        )?,
        candidate_window: non_zero_usize(
            answers.candidate_window.unwrap_or(DEFAULT_CANDIDATE_WINDOW),
            "answers.candidate_window",
        )?,
        batch_delay: Duration::from_millis(
            answers.batch_delay_ms.unwrap_or(DEFAULT_BATCH_DELAY_MS),
        ),
        persistence_timeout: positive_millis(
            answers
                .persistence_timeout_ms
                .unwrap_or(DEFAULT_PERSISTENCE_TIMEOUT_MS),
            "answers.persistence_timeout_ms",
        )?,
        schedule,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let capacity = non_zero_usize(
        cache.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
        "cache.capacity",
    )?;
    let namespace = non_blank(cache.namespace, DEFAULT_CACHE_NAMESPACE, "cache.namespace")?;

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        capacity,
        namespace,
    })
}

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let path = store
        .path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));
    if path.as_os_str().is_empty() {
        return Err(LoadError::invalid("store.path", "path must not be empty"));
    }
    Ok(StoreSettings { path })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCompletionSettings {
    endpoint: Option<String>,
    api_key: Option<String>,
    primary_model: Option<String>,
    secondary_model: Option<String>,
    timeout_ms: Option<u64>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAnswerSettings {
    bot_user_id: Option<Uuid>,
    bot_display_name: Option<String>,
    max_comment_length: Option<usize>,
    language: Option<String>,
    max_source_chars: Option<usize>,
    keywords: Option<Vec<String>>,
    batch_size: Option<usize>,
    candidate_window: Option<usize>,
    batch_delay_ms: Option<u64>,
    persistence_timeout_ms: Option<u64>,
    schedule: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    capacity: Option<usize>,
    namespace: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    path: Option<PathBuf>,
}

fn non_blank(
    value: Option<String>,
    default: &str,
    key: &'static str,
) -> Result<String, LoadError> {
    let value = value.unwrap_or_else(|| default.to_string());
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LoadError::invalid(key, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn non_zero_usize(value: usize, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn positive_millis(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_millis(value))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
