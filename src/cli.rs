use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_API_URL: &str = "https://xkcd.com";
pub const DEFAULT_EXPLAIN_URL: &str = "https://www.explainxkcd.com/wiki/index.php";
pub const DEFAULT_RENDERER: &str = "w3m -dump -T text/html -O ascii";

#[derive(Debug, Parser)]
#[command(
    name = "xkcd",
    version,
    about = "A command line xkcd client: browse, explain, save and search comics"
)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Base URL of the comic JSON API
    #[arg(long, env = "XKCD_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Base URL of the explanation wiki
    #[arg(long, env = "XKCD_EXPLAIN_URL", default_value = DEFAULT_EXPLAIN_URL)]
    pub explain_url: String,

    /// HTML-to-text renderer command, reading HTML on stdin
    #[arg(long, env = "XKCD_RENDERER", default_value = DEFAULT_RENDERER)]
    pub renderer: String,

    /// Pager used for transcripts and explanations
    #[arg(long, env = "PAGER", default_value = "less")]
    pub pager: String,

    /// Print long output instead of paging it
    #[arg(long)]
    pub no_pager: bool,

    /// Image viewer command, invoked with the image path
    #[arg(long, env = "XKCD_VIEWER", default_value = "display")]
    pub viewer: String,

    /// Directory for downloaded images, removed on exit
    #[arg(long, env = "XKCD_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory holding the offline title/transcript database
    #[arg(long, env = "XKCD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Default directory for `save`
    #[arg(long, env = "XKCD_SAVE_DIR")]
    pub save_dir: Option<PathBuf>,

    /// Network timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Attempts per request for retryable failures
    #[arg(long, default_value_t = 2)]
    pub retries: usize,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive shell (default)
    Shell,
    /// Run one semicolon-separated command line and exit
    Run {
        #[arg(required = true, num_args = 1..)]
        line: Vec<String>,
    },
    /// Backfill the offline search database and exit
    UpdateDb,
}
