use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use uuid::Uuid;

/// Command-line arguments for the Piazza binary.
#[derive(Debug, Parser)]
#[command(
    name = "piazza",
    version,
    about = "Piazza markdown renderer and automated answer worker"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PIAZZA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render markdown from a file or stdin and print the HTML.
    Render(RenderArgs),
    /// Generate and store an automated answer for one item.
    Answer(ItemArgs),
    /// Run one answer batch over the most recent items.
    Batch(BatchArgs),
    /// Print the rendered view of one item, answers included.
    Show(ItemArgs),
    /// Run the scheduled answer worker until interrupted.
    Work,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderArgs {
    /// Markdown file to render; stdin when omitted.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub input: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ItemArgs {
    /// Identifier of the content item.
    #[arg(value_name = "ITEM_ID")]
    pub item_id: Uuid,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BatchArgs {
    /// Override the maximum number of candidates processed in this run.
    #[arg(long = "max", value_name = "COUNT")]
    pub max: Option<usize>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Force JSON log output.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the snapshot file backing the content store.
    #[arg(long = "store-path", value_name = "PATH", global = true)]
    pub store_path: Option<PathBuf>,

    /// Override the completion service base URL.
    #[arg(long = "completion-endpoint", value_name = "URL", global = true)]
    pub completion_endpoint: Option<String>,

    /// Override the primary model identifier.
    #[arg(long = "primary-model", value_name = "MODEL", global = true)]
    pub primary_model: Option<String>,

    /// Override the secondary model identifier.
    #[arg(long = "secondary-model", value_name = "MODEL", global = true)]
    pub secondary_model: Option<String>,

    /// Override the per-attempt model timeout in milliseconds.
    #[arg(long = "completion-timeout-ms", value_name = "MS", global = true)]
    pub completion_timeout_ms: Option<u64>,

    /// Override the delay between batch candidates in milliseconds.
    #[arg(long = "batch-delay-ms", value_name = "MS", global = true)]
    pub batch_delay_ms: Option<u64>,

    /// Enable or disable the item view cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub cache_enabled: Option<bool>,
}
