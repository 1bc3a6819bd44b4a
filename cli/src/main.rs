//! # The Help Desk Ticket Command Line Utility
//!
//! A command-line client of the help desk ticket service. Lists the tickets visible
//! to the logged in user, performs the workflow actions and tracks the time spent
//! working on a ticket.
//!
//! ## Configuration
//! Before using the tool, tell it where the ticket service is:
//! ```bash
//! tickets config update --url https://helpdesk.example.org
//! tickets login -e me@example.org -p secret
//! ```
//!
//! ## Usage Examples
//!
//! ### Listing tickets
//! ```bash
//! tickets list
//! tickets list --status "en cours" --view cards
//! tickets list --summary
//! ```
//!
//! ### Workflow
//! ```bash
//! tickets accept 42
//! tickets assign 42 --user 7
//! tickets comment 42 Toner commandé
//! ```
//!
//! ### Tracking the work
//! ```bash
//! tickets work start 42
//! tickets work pause 42
//! tickets work resume 42
//! tickets work finish 42
//! tickets work resolve 42 --report "Toner remplacé"
//! ```
//!
//! Changes which could not be sent are kept locally, send them again with:
//! ```bash
//! tickets flush
//! ```
use clap::Parser;
use cli::{Command, LogLevel, Opts};
use commands::{configuration, session, tickets, work};
use env_logger::Env;
use log::debug;
use std::env;
use std::fs::File;
use std::process::exit;

use ticketing::{error::TicketingError, ApplicationRuntime};

mod cli;
mod commands;
mod table_report;

#[tokio::main]
async fn main() {
    let opts: Opts = Opts::parse();

    configure_logging(&opts); // Handles the -v option

    if let Err(err) = run(opts.cmd).await {
        if err.requires_login() {
            eprintln!("ERROR: {err}\nUse 'tickets login' to log in");
            exit(3);
        }
        eprintln!("ERROR: {err}");
        exit(1);
    }
}

async fn run(cmd: Command) -> Result<(), TicketingError> {
    match cmd {
        Command::Config(config) => configuration::execute(config.cmd),
        Command::Login(login) => session::login(login).await?,
        Command::Logout => session::logout()?,
        Command::Password(password) => session::password(password.cmd).await?,
        Command::List(list) => tickets::list(list).await?,
        Command::Show(ticket) => tickets::show(ticket.id).await?,
        Command::Create(create) => tickets::create(create).await?,
        Command::Update(update) => tickets::update(update).await?,
        Command::Delete(ticket) => tickets::delete(ticket.id).await?,
        Command::Accept(ticket) => tickets::accept(ticket.id).await?,
        Command::Refuse(refuse) => tickets::refuse(refuse).await?,
        Command::Assign(assign) => tickets::assign(assign).await?,
        Command::Comment(comment) => tickets::comment(comment).await?,
        Command::Status(status) => tickets::set_status(status).await?,
        Command::Work(w) => work::execute(w.cmd).await?,
        Command::Flush => tickets::flush().await?,
        Command::Problems(problems) => tickets::problems(&problems)?,
    }
    Ok(())
}

/// Creates the application runtime from the configuration file
fn get_runtime() -> ApplicationRuntime {
    match ApplicationRuntime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            match err {
                TicketingError::ApplicationConfig { .. } => {
                    eprintln!(
                        "Configuration file not found. Use 'tickets config update' to create it"
                    );
                }
                _ => {
                    eprintln!("Failed to create runtime: '{err}'");
                }
            }

            exit(1);
        }
    }
}

fn configure_logging(opts: &Opts) {
    let mut tmp_dir = env::temp_dir();
    tmp_dir.push("tickets.log");

    if opts.verbosity.is_some() {
        println!("Logging to {}", &tmp_dir.to_string_lossy());
    }

    let target = match File::create(&tmp_dir) {
        Ok(file) => env_logger::Target::Pipe(Box::new(file)),
        Err(_) => env_logger::Target::Stderr,
    };

    // If nothing else was specified in RUST_LOG, use 'warn'
    env_logger::Builder::from_env(Env::default().default_filter_or(opts.verbosity.map_or(
        "warn",
        |lvl| match lvl {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        },
    )))
    .target(target)
    .init();
    debug!("Logging started");
}
