use std::io::Write;
use std::time::Duration;

use log::{debug, info, warn};
use ticket_api::models::core::TicketId;
use ticket_api::models::workflow::Resolution;
use ticketing::error::TicketingError;
use ticketing::service::timer_service::TimerService;
use ticketing::types::{WorkState, WorkTimer};

use crate::cli::{Resolve, WorkCommand};
use crate::get_runtime;

pub async fn execute(cmd: WorkCommand) -> Result<(), TicketingError> {
    let runtime = get_runtime();
    let timers = runtime.timer_service();

    match cmd {
        WorkCommand::Start(t) => print_timer("Started", &timers.start(t.id).await?),
        WorkCommand::Pause(t) => print_timer("Paused", &timers.pause(t.id).await?),
        WorkCommand::Resume(t) => print_timer("Resumed", &timers.resume(t.id).await?),
        WorkCommand::Finish(t) => {
            let timer = timers.finish(t.id).await?;
            print_timer("Finished", &timer);
            println!(
                "To resolve it: tickets work resolve {} --report \"what was done\"",
                t.id
            );
        }
        WorkCommand::Resolve(resolve) => resolve_ticket(resolve).await?,
        WorkCommand::Status => {
            let all = timers.timers()?;
            if all.is_empty() {
                println!("No work tracked");
            }
            for timer in &all {
                let elapsed = timers.elapsed_of(timer);
                println!("{:>6} {:>9} {}", elapsed.ticket_id, elapsed.hms, elapsed.state);
            }
        }
        WorkCommand::Watch(t) => watch(t.id).await?,
    }
    Ok(())
}

async fn resolve_ticket(resolve: Resolve) -> Result<(), TicketingError> {
    let resolution = if resolve.unresolved {
        Resolution::Unresolved
    } else {
        Resolution::Resolved
    };
    get_runtime()
        .timer_service()
        .resolve(resolve.id, resolution, &resolve.report)
        .await?;
    println!("Ticket {} marked '{}'", resolve.id, resolution.status());
    Ok(())
}

/// Prints the elapsed time every second. The duration is saved every
/// `autosave_interval_secs` while running, and once more on Ctrl-C.
async fn watch(id: TicketId) -> Result<(), TicketingError> {
    let runtime = get_runtime();
    let timers = runtime.timer_service();
    let autosave_every = runtime.config().server.autosave_interval_secs.max(1);
    debug!("Watching ticket {id}, autosave every {autosave_every}s");

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut since_save = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let elapsed = timers.elapsed(id)?;
                print!("\rTicket {id} {} ({})   ", elapsed.hms, elapsed.state);
                if let Err(e) = std::io::stdout().flush() {
                    warn!("Unable to write to stdout: {e}");
                }
                if !matches!(elapsed.state, WorkState::Running { .. }) {
                    println!();
                    break;
                }
                since_save += 1;
                if since_save >= autosave_every {
                    since_save = 0;
                    // A slow service must not hold up Ctrl-C
                    tokio::select! {
                        saved = timers.autosave(id) => {
                            saved?;
                        }
                        _ = &mut ctrl_c => {
                            save_on_exit(&timers).await?;
                            break;
                        }
                    }
                }
            }
            _ = &mut ctrl_c => {
                save_on_exit(&timers).await?;
                break;
            }
        }
    }
    Ok(())
}

async fn save_on_exit(timers: &TimerService) -> Result<(), TicketingError> {
    println!();
    let saved = timers.autosave_all().await?;
    info!("Saved {saved} running timers on exit");
    println!("Saved the elapsed time of {saved} running tickets");
    Ok(())
}

fn print_timer(what: &str, timer: &WorkTimer) {
    println!(
        "{what} work on ticket {}, elapsed {} ({})",
        timer.ticket_id,
        timer.elapsed_hms(timer.updated_at),
        timer.state
    );
}
