use clap::Subcommand;

use super::parse::ParseArgs;
use super::send::SendArgs;
use super::serve::ServeArgs;

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Send one email through the given providers and wait for the result
    Send(SendArgs),

    /// Start the HTTP API
    Serve(ServeArgs),

    /// Show how an instruction is interpreted without sending anything
    Parse(ParseArgs),

    /// List configured providers
    Providers,

    /// Show build and environment information
    Info,
}
