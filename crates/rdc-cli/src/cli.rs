use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "rdc", about = "Resource driver core")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Start the HTTP API, the execution monitor, and (if enabled) the
    /// request queue consumer. Configuration is read entirely from the
    /// environment; see `rdc_config::ResourceDriverConfig`.
    Serve,
}
