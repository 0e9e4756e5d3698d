use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "mia-romagna")]
#[command(about = "Query Romagna points of interest with shareable filter URLs")]
pub struct CliConfig {
    /// Filter state as a URL query string, e.g. "categories=cibo&zone=rimini"
    #[arg(short, long, default_value = "")]
    pub query: String,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Read POIs from a local JSON file instead of the remote store
    #[arg(long)]
    pub data: Option<String>,

    /// Show the canonical URL state and store query without fetching
    #[arg(long)]
    pub dry_run: bool,

    /// Print the resulting view model as JSON
    #[arg(long)]
    pub json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}
