use std::fmt::{self, Formatter};

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub(crate) enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Parser)]
/// Help desk ticket utility - list, accept, assign, track the work on and resolve tickets
///
/// Which tickets are listed depends on the role of the logged in user: administrators
/// see every ticket, project managers the tickets of their projects, collaborators the
/// tickets assigned to them and clients the tickets they reported.
///
/// Changes are shown at once and kept locally if the ticket service cannot be reached.
/// Use `tickets flush` to send them again.
#[command(author, version, about)] // Read from Cargo.toml
pub(crate) struct Opts {
    #[command(subcommand)]
    pub cmd: Command,

    #[arg(global = true, short, long)]
    pub verbosity: Option<LogLevel>,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Subcommands for configuration
    Config(Config),
    /// Log in to the ticket service
    Login(Login),
    /// Log out and forget the session
    Logout,
    /// Change, forget or reset the password
    Password(Password),
    /// List the tickets visible to you
    List(List),
    /// Show a single ticket with its comment log
    Show(TicketRef),
    /// Report a new ticket
    Create(Create),
    /// Change the title, description or classification of a ticket
    Update(Update),
    /// Delete a ticket
    Delete(TicketRef),
    /// Accept a new ticket
    Accept(TicketRef),
    /// Refuse a ticket, optionally with a reason
    Refuse(Refuse),
    /// Assign a ticket to a collaborator
    Assign(Assign),
    /// Append a line to the comment log of a ticket
    Comment(Comment),
    /// Set the status of a ticket
    Status(SetStatus),
    /// Track the work on a ticket
    Work(Work),
    /// Send the changes kept locally to the ticket service
    Flush,
    /// Show the requests which recently failed
    Problems(Problems),
}

#[derive(Args)]
pub(crate) struct Config {
    #[command(subcommand)]
    pub cmd: ConfigCommand,
}

/// Create, modify or list the configuration file.
#[derive(Subcommand, Clone)]
pub(crate) enum ConfigCommand {
    /// Update the configuration file, creating it if needed
    Update(UpdateConfiguration),
    /// write current configuration to standard output
    List,
    /// Remove the current configuration
    Remove,
}

#[derive(Args, Clone)]
pub(crate) struct UpdateConfiguration {
    /// The base url of the ticket service, i.e. <https://helpdesk.example.org>
    #[arg(long)]
    pub url: Option<String>,
    /// Timeout in seconds of requests
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Seconds between two saves of the duration of the work in progress
    #[arg(long)]
    pub autosave: Option<u64>,
    /// Path to the local database
    #[arg(long)]
    pub local_db: Option<String>,
}

#[derive(Args)]
pub(crate) struct Login {
    /// Your email address, i.e. me@whereever.com
    #[arg(short, long, required = true)]
    pub email: String,
    #[arg(short, long, required = true)]
    pub password: String,
}

#[derive(Args)]
pub(crate) struct Password {
    #[command(subcommand)]
    pub cmd: PasswordCommand,
}

#[derive(Subcommand)]
pub(crate) enum PasswordCommand {
    /// Change the password of the logged in user
    Change {
        #[arg(long, required = true)]
        current: String,
        #[arg(long, required = true)]
        new: String,
    },
    /// Ask for a password reset email
    Forgot {
        #[arg(short, long, required = true)]
        email: String,
    },
    /// Set a new password with the token received by email
    Reset {
        #[arg(long, required = true)]
        token: String,
        #[arg(long, required = true)]
        new: String,
    },
}

#[derive(Args)]
pub(crate) struct List {
    /// Only tickets in this status, any spelling is accepted: -s "en cours"
    #[arg(short, long)]
    pub status: Option<String>,
    /// Presentation of the list, remembered for the next time
    #[arg(long, value_parser = ["list", "cards"])]
    pub view: Option<String>,
    /// Print the ticket counts per status
    #[arg(long)]
    pub summary: bool,
}

#[derive(Args)]
pub(crate) struct TicketRef {
    #[arg(required = true)]
    pub id: i64,
}

#[derive(Args)]
pub(crate) struct Create {
    #[arg(short, long, required = true)]
    pub title: String,
    #[arg(short, long, default_value = "")]
    pub description: String,
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long)]
    pub qualification: Option<String>,
    #[arg(long)]
    pub project: Option<i64>,
    #[arg(long)]
    pub category: Option<i64>,
}

#[derive(Args)]
pub(crate) struct Update {
    #[arg(required = true)]
    pub id: i64,
    #[arg(short, long)]
    pub title: Option<String>,
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long)]
    pub qualification: Option<String>,
    #[arg(long)]
    pub project: Option<i64>,
    #[arg(long)]
    pub category: Option<i64>,
}

#[derive(Args)]
pub(crate) struct Refuse {
    #[arg(required = true)]
    pub id: i64,
    #[arg(short, long)]
    pub reason: Option<String>,
}

#[derive(Args)]
pub(crate) struct Assign {
    #[arg(required = true)]
    pub id: i64,
    /// Id of the collaborator
    #[arg(short, long, required = true)]
    pub user: i64,
}

#[derive(Args)]
pub(crate) struct Comment {
    #[arg(required = true)]
    pub id: i64,
    #[arg(required = true, num_args(1..))]
    pub text: Vec<String>,
}

#[derive(Args)]
pub(crate) struct SetStatus {
    #[arg(required = true)]
    pub id: i64,
    /// The new status, any spelling is accepted: "IN_PROGRESS", "en cours"
    #[arg(required = true)]
    pub status: String,
}

#[derive(Args)]
pub(crate) struct Work {
    #[command(subcommand)]
    pub cmd: WorkCommand,
}

#[derive(Subcommand)]
pub(crate) enum WorkCommand {
    /// Start the work on a ticket
    Start(TicketRef),
    /// Pause the work, the time paused is not counted
    Pause(TicketRef),
    Resume(TicketRef),
    /// Stop the work for good, the ticket may then be resolved
    Finish(TicketRef),
    /// Resolve a ticket on which the work is finished
    Resolve(Resolve),
    /// Show the elapsed time of the tracked tickets
    Status,
    /// Show the elapsed time every second, saving it regularly, until Ctrl-C
    Watch(TicketRef),
}

#[derive(Args)]
pub(crate) struct Resolve {
    #[arg(required = true)]
    pub id: i64,
    /// The problem could not be solved
    #[arg(long)]
    pub unresolved: bool,
    /// What was done, required
    #[arg(short, long, required = true)]
    pub report: String,
}

#[derive(Args)]
pub(crate) struct Problems {
    /// Number of entries to show
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,
    /// Empty the list
    #[arg(long)]
    pub clear: bool,
}
