//! CLI command definitions for the `parley` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod chat;
pub mod chats;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use uuid::Uuid;

/// Chat web backend: HTTP server and local tools.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also export spans to stdout through OpenTelemetry.
    #[arg(long, global = true, env = "PARLEY_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Inspect stored chats.
    Chats {
        #[command(subcommand)]
        action: ChatsCommand,
    },

    /// Chat in the terminal through the configured turn transport.
    Chat {
        /// Continue this chat instead of starting a new one.
        #[arg(long)]
        chat: Option<Uuid>,

        /// Act as this user. A guest is created when omitted.
        #[arg(long)]
        user: Option<Uuid>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ChatsCommand {
    /// List a user's chats, newest first.
    #[command(alias = "ls")]
    List {
        /// Owner of the chats.
        #[arg(long)]
        user: Uuid,

        /// Page size.
        #[arg(long, default_value = "20")]
        limit: u32,

        /// Only chats newer than this chat.
        #[arg(long, conflicts_with = "before")]
        after: Option<Uuid>,

        /// Only chats older than this chat.
        #[arg(long)]
        before: Option<Uuid>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_chats_list() {
        let id = Uuid::now_v7();
        let cli = Cli::try_parse_from([
            "parley",
            "chats",
            "list",
            "--user",
            &id.to_string(),
            "--limit",
            "5",
        ])
        .unwrap();
        let Commands::Chats {
            action: ChatsCommand::List { user, limit, after, before },
        } = cli.command
        else {
            panic!("expected chats list");
        };
        assert_eq!(user, id);
        assert_eq!(limit, 5);
        assert!(after.is_none() && before.is_none());
    }

    #[test]
    fn after_and_before_conflict() {
        let id = Uuid::now_v7().to_string();
        let result = Cli::try_parse_from([
            "parley", "chats", "list", "--user", &id, "--after", &id, "--before", &id,
        ]);
        assert!(result.is_err());
    }
}
