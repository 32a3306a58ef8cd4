use clap::{Parser, Subcommand, Args};

#[derive(Parser)]
#[command(name = "flowscope", version, about = "Multi-agent workflow execution and visualization engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress bars
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit diagnostics as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a workflow task to completion
    Run(RunArgs),
    /// Run the pre-meeting preparation sequencer
    Sequence(SequenceArgs),
    /// List available tasks
    Tasks(TasksArgs),
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct RunArgs {
    /// Task identifier (see `flowscope tasks`)
    pub task: String,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Document to upload for file-gated tasks
    #[arg(short, long)]
    pub file: Option<String>,

    /// Override the simulation scale factor
    #[arg(long)]
    pub scale: Option<u32>,

    /// Override the backend base URL
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Append every log line to this file
    #[arg(long)]
    pub transcript: Option<String>,

    /// Do not echo workflow log lines
    #[arg(long)]
    pub no_logs: bool,

    /// Print the final execution view as JSON
    #[arg(long)]
    pub json: bool,

    /// Give up after this many seconds
    #[arg(long, default_value = "600")]
    pub timeout: u64,
}

#[derive(Args, Clone)]
pub struct SequenceArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Print the final sequencer state as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct TasksArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Listen port
    #[arg(long, default_value = "8080")]
    pub port: u16,

    /// Listen address
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
