use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a story's chapter list as an HTML fragment.
    Render(RenderArgs),
    /// Print the grouped and folded chapter rows as JSON.
    Inspect(InspectArgs),
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Input path to `story.yaml` (story context and chapter posts).
    #[arg(long)]
    pub story: String,

    /// Site configuration file (YAML). Defaults apply when omitted.
    #[arg(long)]
    pub config: Option<String>,

    /// Directory for cached fragments. Without it the cache lives only for this run.
    #[arg(long)]
    pub cache_dir: Option<String>,

    /// Output file for the fragment (default: stdout).
    #[arg(long)]
    pub out: Option<String>,

    /// Overwrite `--out` if it exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Input path to `story.yaml`.
    #[arg(long)]
    pub story: String,

    /// Site configuration file (YAML).
    #[arg(long)]
    pub config: Option<String>,
}
