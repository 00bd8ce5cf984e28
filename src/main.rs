use clap::{Parser, Subcommand};
use std::process::ExitCode;

use tix::commands::{
    CreateOptions, ListOptions, Outcome, cmd_block, cmd_cache_clear, cmd_cache_path,
    cmd_cache_rebuild, cmd_cache_status, cmd_close, cmd_create, cmd_ls, cmd_ready, cmd_reopen,
    cmd_show, cmd_start, cmd_unblock,
};
use tix::config::Config;
use tix::error::Result;
use tix::query::Filter;
use tix::store::TicketStore;
use tix::types::{TicketPriority, TicketStatus, TicketType};

#[derive(Parser)]
#[command(name = "tix")]
#[command(about = "Plain-text ticket store")]
#[command(version)]
struct Cli {
    /// More diagnostic output on stderr (repeat for debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new ticket and print its id
    #[command(visible_alias = "c")]
    Create {
        /// Ticket title
        title: String,

        /// Description text
        #[arg(short, long)]
        description: Option<String>,

        /// Priority 1-4 (default: 2, or default_priority from config)
        #[arg(short, long, value_parser = parse_priority)]
        priority: Option<TicketPriority>,

        /// Type: bug, feature, task, epic, chore (default: task)
        #[arg(short = 't', long = "type", value_parser = parse_type)]
        ticket_type: Option<TicketType>,

        /// Assignee (default: default_assignee from config)
        #[arg(short, long)]
        assignee: Option<String>,

        /// Parent ticket ID
        #[arg(long)]
        parent: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a ticket
    #[command(visible_alias = "s")]
    Show {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Mark a ticket as in progress
    Start {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Close an in-progress ticket
    Close {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Reopen a closed ticket
    Reopen {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Mark a ticket as blocked by another
    Block {
        /// Ticket to block
        id: String,

        /// Ticket that must be closed first
        blocker: String,

        #[arg(long)]
        json: bool,
    },

    /// Remove a blocker from a ticket
    Unblock {
        id: String,

        blocker: String,

        #[arg(long)]
        json: bool,
    },

    /// List tickets in id order
    Ls {
        /// Filter by status
        #[arg(long, value_parser = parse_status)]
        status: Option<TicketStatus>,

        /// Filter by priority
        #[arg(short, long, value_parser = parse_priority)]
        priority: Option<TicketPriority>,

        /// Filter by type
        #[arg(short = 't', long = "type", value_parser = parse_type)]
        ticket_type: Option<TicketType>,

        /// Only direct children of this ticket
        #[arg(long)]
        parent: Option<String>,

        /// Only tickets without a parent
        #[arg(long)]
        roots: bool,

        #[command(flatten)]
        output: OutputArgs,

        /// Skip this many matching tickets
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// List open tickets whose blockers are closed and whose parent is started
    Ready {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Manage the ticket cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,

        #[arg(long, global = true)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Maximum number of tickets to print (0 = no limit)
    #[arg(short = 'n', long, default_value_t = 0)]
    limit: usize,

    /// Print only this field
    #[arg(long)]
    field: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl OutputArgs {
    fn into_options(self, offset: usize) -> ListOptions {
        ListOptions {
            limit: self.limit,
            offset,
            field: self.field,
            output_json: self.json,
        }
    }
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cache status
    Status,
    /// Delete the cache file
    Clear,
    /// Force a full cache rebuild
    Rebuild,
    /// Print path to the cache file
    Path,
}

fn parse_priority(s: &str) -> std::result::Result<TicketPriority, String> {
    s.parse().map_err(|e: tix::error::TixError| e.to_string())
}

fn parse_type(s: &str) -> std::result::Result<TicketType, String> {
    s.parse().map_err(|e: tix::error::TixError| e.to_string())
}

fn parse_status(s: &str) -> std::result::Result<TicketStatus, String> {
    s.parse().map_err(|e: tix::error::TixError| e.to_string())
}

fn run(command: Commands) -> Result<Outcome> {
    let store = TicketStore::open(tix::paths::tickets_items_dir())?;

    match command {
        Commands::Create {
            title,
            description,
            priority,
            ticket_type,
            assignee,
            parent,
            json,
        } => {
            let config = Config::load(&tix::paths::config_path())?;
            let options = CreateOptions {
                title,
                description,
                ticket_type: ticket_type.unwrap_or_else(|| config.ticket_type()),
                priority: priority.unwrap_or_else(|| config.priority()),
                assignee: assignee.or(config.default_assignee),
                parent,
            };
            cmd_create(&store, options, json)
        }
        Commands::Show { id, json } => cmd_show(&store, &id, json),
        Commands::Start { id, json } => cmd_start(&store, &id, json),
        Commands::Close { id, json } => cmd_close(&store, &id, json),
        Commands::Reopen { id, json } => cmd_reopen(&store, &id, json),
        Commands::Block { id, blocker, json } => cmd_block(&store, &id, &blocker, json),
        Commands::Unblock { id, blocker, json } => cmd_unblock(&store, &id, &blocker, json),
        Commands::Ls {
            status,
            priority,
            ticket_type,
            parent,
            roots,
            output,
            offset,
        } => {
            let filter = Filter {
                status,
                priority,
                ticket_type,
                parent,
                roots,
            };
            cmd_ls(&store, &filter, &output.into_options(offset))
        }
        Commands::Ready { output } => cmd_ready(&store, &output.into_options(0)),
        Commands::Cache { action, json } => match action {
            CacheAction::Status => cmd_cache_status(&store, json),
            CacheAction::Clear => cmd_cache_clear(&store, json),
            CacheAction::Rebuild => cmd_cache_rebuild(&store, json),
            CacheAction::Path => cmd_cache_path(&store, json),
        },
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tix::logging::init(cli.verbose);

    match run(cli.command) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
