//! Renders a finished call record into the email body.

use crate::store::{CallRecord, Category, Urgency};

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() {
        placeholder
    } else {
        value
    }
}

/// Render a call record as a fixed-order, human-readable summary.
///
/// Pure function of the record: unset fields render their placeholder text,
/// Work-only and CanWait-only lines are omitted on other branches, and the
/// same record always renders byte-identical output.
pub fn render(record: &CallRecord) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "Caller name: {}",
        or_placeholder(&record.name, "(not provided)")
    ));

    if record.from_hidden {
        let number = if record.callback_number.is_empty() {
            "Hidden (caller did not provide)".to_string()
        } else {
            format!("Provided by caller: {}", record.callback_number)
        };
        lines.push(format!("Caller number: {number}"));
    } else {
        lines.push(format!(
            "Caller number: {}",
            or_placeholder(&record.from, "(not provided)")
        ));
    }

    lines.push(format!(
        "Type: {}",
        record.category.label().unwrap_or("(unknown)")
    ));

    if record.category == Category::Work {
        lines.push(format!(
            "Topic: {}",
            or_placeholder(&record.topic, "(not provided)")
        ));
        lines.push(format!(
            "Urgency (caller words): \"{}\"",
            or_placeholder(&record.urgency_raw, "(not provided)")
        ));
        lines.push(format!(
            "Urgency class: {}",
            record.urgency.label().unwrap_or("(unknown)")
        ));
        if record.urgency == Urgency::CanWait {
            lines.push(format!(
                "Callback time (caller words): \"{}\"",
                or_placeholder(&record.callback_time_raw, "(not provided)")
            ));
        }
    }

    lines.push(format!(
        "Action: {}",
        or_placeholder(&record.final_action, "(none)")
    ));

    lines.join("\n")
}
