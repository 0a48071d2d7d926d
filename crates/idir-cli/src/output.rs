//! Output formatting utilities.

use idir_core::CertificateEvent;
use idir_issuance::bulk::{PlanEntry, RowOutcome, RowResult};
use serde::Serialize;

/// Formats a value as pretty JSON.
pub fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Prints the audit history table header.
#[allow(clippy::print_literal)]
pub fn print_history_header() {
    println!("{:<26} {:<10} {:<32} {}", "CREATED_AT", "EVENT", "ACTOR", "DETAILS");
    println!("{}", "-".repeat(100));
}

/// Formats one audit event as a table row.
pub fn format_event_row(event: &CertificateEvent) -> String {
    let actor = match &event.actor_email {
        Some(email) => format!("{}:{}", event.actor_type, email),
        None => event.actor_type.to_string(),
    };
    let details = event
        .metadata
        .as_object()
        .map(|m| {
            m.iter()
                .filter(|(k, _)| k.as_str() != "student_email")
                .map(|(k, v)| match v.as_str() {
                    Some(s) => format!("{}={}", k, s),
                    None => format!("{}={}", k, v),
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    format!(
        "{:<26} {:<10} {:<32} {}",
        event.created_at,
        event.event_type,
        truncate(&actor, 32),
        details
    )
}

/// Prints the dry-run plan table header.
#[allow(clippy::print_literal)]
pub fn print_plan_header() {
    println!("{:<6} {:<28} {:<32} {}", "LINE", "STUDENT", "COURSE", "ID_PREFIX");
    println!("{}", "-".repeat(100));
}

/// Formats one plan entry as a table row.
pub fn format_plan_row(entry: &PlanEntry) -> String {
    format!(
        "{:<6} {:<28} {:<32} {}",
        entry.line,
        truncate(&entry.student_full_name, 28),
        truncate(&entry.course_title, 32),
        entry.id_prefix
    )
}

/// Prints the import report table header.
#[allow(clippy::print_literal)]
pub fn print_report_header() {
    println!("{:<6} {:<28} {:<8} {}", "LINE", "STUDENT", "RESULT", "DETAIL");
    println!("{}", "-".repeat(100));
}

/// Formats one import outcome as a table row.
pub fn format_report_row(outcome: &RowOutcome) -> String {
    let (result, detail) = match &outcome.result {
        RowResult::Issued { certificate_id, .. } => ("issued", certificate_id.to_string()),
        RowResult::Failed { category, message } => ("failed", format!("[{}] {}", category, message)),
    };
    format!(
        "{:<6} {:<28} {:<8} {}",
        outcome.line,
        truncate(&outcome.student_full_name, 28),
        result,
        detail
    )
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("Ana", 10), "Ana");
        assert_eq!(truncate("Fundamentos de Nutrición", 10), "Fundame...");
        assert_eq!(truncate("ñññññññññññ", 5), "ññ...");
    }
}
