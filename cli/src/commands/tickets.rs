use std::collections::HashMap;

use log::debug;
use ticket_api::models::core::TicketId;
use ticket_api::models::status::TicketStatus;
use ticket_api::models::ticket::{NewTicket, Ticket, TicketUpdate};
use ticketing::date::{format_hms, to_local_string};
use ticketing::error::TicketingError;
use ticketing::service::ticket_service::{TicketList, WriteOutcome};
use ticketing::service::timer_service::Elapsed;
use ticketing::types::ViewMode;
use ticketing::ApplicationRuntime;

use crate::cli::{Assign, Comment, Create, List, Problems, Refuse, SetStatus, Update};
use crate::get_runtime;
use crate::table_report::{print_cards, print_summary, print_table};

pub async fn list(list: List) -> Result<(), TicketingError> {
    let runtime = get_runtime();
    let user = runtime.session_service().current_user()?;
    let dashboard = runtime.dashboard_service();

    let view = match list.view {
        Some(view) => {
            let mode: ViewMode = view.parse()?;
            dashboard.set_view_mode(mode)?;
            mode
        }
        None => dashboard.view_mode()?,
    };

    let TicketList { tickets, stale } = runtime.ticket_service().load_tickets(&user).await?;
    if stale {
        eprintln!("WARNING: The ticket service could not be reached, showing the tickets known locally");
    }

    if list.summary {
        print_summary(&dashboard.summary(&tickets));
        println!();
    }

    let wanted = list.status.as_deref().map(TicketStatus::normalize);
    debug!("Listing {} tickets, status filter {wanted:?}", tickets.len());
    let shown: Vec<Ticket> = tickets
        .into_iter()
        .filter(|t| wanted.as_ref().map_or(true, |s| &t.status == s))
        .collect();
    if shown.is_empty() {
        println!("No tickets");
        return Ok(());
    }

    let elapsed = elapsed_by_ticket(&runtime)?;
    match view {
        ViewMode::List => print_table(&shown, &elapsed),
        ViewMode::Cards => print_cards(&shown, &elapsed),
    }
    Ok(())
}

pub async fn show(id: TicketId) -> Result<(), TicketingError> {
    let runtime = get_runtime();
    let ticket = runtime.ticket_service().get_ticket(id).await?;

    println!("Ticket {}: {}", ticket.id, ticket.title);
    println!("{:14} {}", "Status", ticket.status);
    if let Some(priority) = &ticket.priority {
        println!("{:14} {priority}", "Priority");
    }
    if let Some(qualification) = &ticket.qualification {
        println!("{:14} {qualification}", "Qualification");
    }
    if let Some(assignee) = ticket.assignee_name() {
        println!("{:14} {assignee}", "Assigned to");
    }
    if let Some(created) = ticket.created_at {
        println!("{:14} {}", "Created", to_local_string(created));
    }
    match runtime.timer_service().elapsed(id) {
        Ok(elapsed) => println!("{:14} {} ({})", "Work", elapsed.hms, elapsed.state),
        Err(TicketingError::NoTimer(_)) if ticket.work_duration > 0 => {
            println!("{:14} {}", "Work", format_hms(ticket.work_duration));
        }
        Err(TicketingError::NoTimer(_)) => {}
        Err(e) => return Err(e),
    }
    if let Some(report) = &ticket.report {
        println!("{:14} {report}", "Report");
    }
    if !ticket.description.is_empty() {
        println!("\n{}", ticket.description);
    }
    let comments: Vec<&str> = ticket.comment_lines().collect();
    if !comments.is_empty() {
        println!("\nComments:");
        for line in comments {
            println!("  {line}");
        }
    }
    Ok(())
}

pub async fn create(create: Create) -> Result<(), TicketingError> {
    let ticket = NewTicket {
        title: create.title,
        description: create.description,
        priority: create.priority,
        qualification: create.qualification,
        project_id: create.project,
        category_id: create.category,
        attachment: None,
    };
    let created = get_runtime().ticket_service().create(&ticket).await?;
    println!("Created ticket {} '{}'", created.id, created.title);
    Ok(())
}

pub async fn update(update: Update) -> Result<(), TicketingError> {
    let changes = TicketUpdate {
        title: update.title,
        description: update.description,
        priority: update.priority,
        qualification: update.qualification,
        project_id: update.project,
        category_id: update.category,
    };
    get_runtime()
        .ticket_service()
        .update(update.id, &changes)
        .await?;
    println!("Ticket {} updated", update.id);
    Ok(())
}

pub async fn delete(id: TicketId) -> Result<(), TicketingError> {
    get_runtime().ticket_service().delete(id).await?;
    println!("Ticket {id} deleted");
    Ok(())
}

pub async fn accept(id: TicketId) -> Result<(), TicketingError> {
    let outcome = get_runtime().ticket_service().accept(id).await?;
    print_outcome(id, "accepted", outcome);
    Ok(())
}

pub async fn refuse(refuse: Refuse) -> Result<(), TicketingError> {
    get_runtime()
        .ticket_service()
        .refuse(refuse.id, refuse.reason)
        .await?;
    println!("Ticket {} refused", refuse.id);
    Ok(())
}

pub async fn assign(assign: Assign) -> Result<(), TicketingError> {
    let outcome = get_runtime()
        .ticket_service()
        .assign(assign.id, assign.user)
        .await?;
    print_outcome(assign.id, &format!("assigned to user {}", assign.user), outcome);
    Ok(())
}

pub async fn comment(comment: Comment) -> Result<(), TicketingError> {
    let runtime = get_runtime();
    let author = runtime.session_service().current_user()?.display_name();
    let outcome = runtime
        .ticket_service()
        .add_comment(comment.id, &author, &comment.text.join(" "))
        .await?;
    print_outcome(comment.id, "commented", outcome);
    Ok(())
}

pub async fn set_status(set: SetStatus) -> Result<(), TicketingError> {
    let status = TicketStatus::normalize(&set.status);
    if let TicketStatus::Other(raw) = &status {
        return Err(TicketingError::BadInput(format!("unknown status '{raw}'")));
    }
    let outcome = get_runtime()
        .ticket_service()
        .change_status(set.id, status.clone())
        .await?;
    print_outcome(set.id, &format!("set to '{status}'"), outcome);
    Ok(())
}

pub async fn flush() -> Result<(), TicketingError> {
    let report = get_runtime().ticket_service().flush_pending().await?;
    if report.confirmed == 0 && report.failed == 0 {
        println!("Nothing to send");
    } else {
        println!(
            "{} changes sent, {} still pending",
            report.confirmed, report.failed
        );
    }
    Ok(())
}

pub fn problems(problems: &Problems) -> Result<(), TicketingError> {
    let log = get_runtime().problem_log();
    if problems.clear {
        log.clear()?;
        println!("Problem list emptied");
        return Ok(());
    }
    let recent = log.recent(problems.limit)?;
    if recent.is_empty() {
        println!("No problems recorded");
        return Ok(());
    }
    println!("{:16} {:7} {:8} Message", "When", "Ticket", "Action");
    for problem in recent {
        println!(
            "{:16} {:7} {:8} {}",
            to_local_string(problem.occurred_at),
            problem.ticket_id.map(|id| id.to_string()).unwrap_or_default(),
            problem.action,
            problem.message
        );
    }
    Ok(())
}

fn print_outcome(id: TicketId, what: &str, outcome: WriteOutcome) {
    match outcome {
        WriteOutcome::Confirmed => println!("Ticket {id} {what}"),
        WriteOutcome::Pending => println!(
            "Ticket {id} {what} locally. The ticket service could not be reached, use 'tickets flush' to send the change again"
        ),
    }
}

fn elapsed_by_ticket(
    runtime: &ApplicationRuntime,
) -> Result<HashMap<TicketId, Elapsed>, TicketingError> {
    let timers = runtime.timer_service();
    Ok(timers
        .timers()?
        .iter()
        .map(|timer| (timer.ticket_id, timers.elapsed_of(timer)))
        .collect())
}
