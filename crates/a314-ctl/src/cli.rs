use clap::{Parser, Subcommand};

/// Operator tool for a314 mailboxes: bring one up, inspect it, or run an
/// in-process demo exchange.
#[derive(Parser, Debug)]
#[command(name = "a314-ctl", version, about = "a314 mailbox operator tool")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Application name a mailbox's shared-memory file is namespaced under.
    #[arg(long, global = true)]
    pub app_name: Option<String>,

    /// Emit machine-readable JSON instead of a table, where supported.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create (or attach to) a mailbox and run the protocol engine until
    /// interrupted.
    Serve {
        /// Name of the mailbox (namespaces the shared-memory file).
        #[arg(long, default_value = "default")]
        mailbox: String,

        /// Main-loop iterations a freed stream id waits before reuse.
        #[arg(long)]
        grace_iterations: Option<u64>,

        /// How often to tick the main loop, standing in for the
        /// interrupt-driven wake-up this tool has no real ISR to install for.
        #[arg(long, default_value_t = 50)]
        poll_interval_ms: u64,
    },
    /// Attach read-only to a mailbox and print ring occupancy.
    Status {
        #[arg(long, default_value = "default")]
        mailbox: String,
    },
    /// Run a full connect/write/read/eos exchange against an in-process
    /// echo peer, with no shared memory involved, to sanity-check a build.
    Demo {
        /// Service name the demo client connects to.
        #[arg(long, default_value = "echo")]
        service: String,
    },
}
