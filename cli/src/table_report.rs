use std::collections::HashMap;

use ticket_api::models::core::TicketId;
use ticket_api::models::ticket::Ticket;
use ticketing::date::format_hms;
use ticketing::service::dashboard::DashboardSummary;
use ticketing::service::timer_service::Elapsed;

const TITLE_WIDTH: usize = 40;

pub fn print_table(tickets: &[Ticket], elapsed: &HashMap<TicketId, Elapsed>) {
    println!(
        "{:>6} {:<width$} {:12} {:8} {:20} {:>9}",
        "Id",
        "Title",
        "Status",
        "Priority",
        "Assigned to",
        "Work",
        width = TITLE_WIDTH
    );
    print_single_dashed_line();
    for ticket in tickets {
        println!(
            "{:>6} {:<width$} {:12} {:8} {:20} {:>9}",
            ticket.id,
            truncate(&ticket.title, TITLE_WIDTH),
            ticket.status.to_string(),
            ticket.priority.as_deref().unwrap_or(""),
            truncate(&ticket.assignee_name().unwrap_or_default(), 20),
            work_column(ticket, elapsed),
            width = TITLE_WIDTH
        );
    }
}

pub fn print_cards(tickets: &[Ticket], elapsed: &HashMap<TicketId, Elapsed>) {
    for ticket in tickets {
        println!("+{}+", "-".repeat(TITLE_WIDTH + 10));
        println!("| #{:<6} {:<width$} |", ticket.id, truncate(&ticket.title, TITLE_WIDTH), width = TITLE_WIDTH);
        println!("| {:<width$} |", ticket.status.to_string(), width = TITLE_WIDTH + 8);
        if let Some(assignee) = ticket.assignee_name() {
            println!("| {:<width$} |", truncate(&assignee, TITLE_WIDTH + 8), width = TITLE_WIDTH + 8);
        }
        let work = work_column(ticket, elapsed);
        if !work.is_empty() {
            println!("| {:<width$} |", format!("Work {work}"), width = TITLE_WIDTH + 8);
        }
        println!("+{}+", "-".repeat(TITLE_WIDTH + 10));
    }
}

pub fn print_summary(summary: &DashboardSummary) {
    println!("{:14} {:>5}", "Tickets", summary.total);
    print_single_dashed_line_of(20);
    for (status, count) in &summary.by_status {
        println!("{:14} {:>5}", status.to_string(), count);
    }
    print_single_dashed_line_of(20);
    println!("{:14} {:>5}", "Running", summary.running);
    println!("{:14} {:>5}", "Paused", summary.paused);
    println!("{:14} {:>5}", "Finished", summary.finished);
    println!("{:14} {:>9}", "Tracked", format_hms(summary.tracked_secs));
}

/// The locally tracked time if there is a timer, else the duration known to the service
fn work_column(ticket: &Ticket, elapsed: &HashMap<TicketId, Elapsed>) -> String {
    match elapsed.get(&ticket.id) {
        Some(e) => e.hms.clone(),
        None if ticket.work_duration > 0 => format_hms(ticket.work_duration),
        None => String::new(),
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut cut: String = s.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

fn print_single_dashed_line() {
    print_single_dashed_line_of(TITLE_WIDTH + 62);
}

fn print_single_dashed_line_of(width: usize) {
    println!("{}", "-".repeat(width));
}
