//! `parley chats` commands.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use uuid::Uuid;

use parley_types::chat::Visibility;
use parley_types::page::PageRequest;

use crate::state::AppState;

/// Print one page of a user's chats.
pub async fn list_chats(
    state: &AppState,
    user: Uuid,
    limit: u32,
    after: Option<Uuid>,
    before: Option<Uuid>,
    json: bool,
) -> Result<()> {
    let request = PageRequest {
        limit,
        starting_after: after,
        ending_before: before,
    };
    let page = state.chat_service.list_chats(&user, &request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.chats.is_empty() {
        println!();
        println!("  {} No chats found.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Title").fg(Color::White),
        Cell::new("ID").fg(Color::White),
        Cell::new("Visibility").fg(Color::White),
        Cell::new("Created").fg(Color::White),
    ]);

    for chat in &page.chats {
        let visibility_cell = match chat.visibility {
            Visibility::Public => Cell::new("● public").fg(Color::Green),
            Visibility::Private => Cell::new("○ private").fg(Color::DarkGrey),
        };
        table.add_row(vec![
            Cell::new(truncate(&chat.title, 50)).fg(Color::Cyan),
            Cell::new(chat.id.to_string()).fg(Color::White),
            visibility_cell,
            Cell::new(format_relative_time(&chat.created_at)).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} chat{}{}",
        style(page.chats.len()).bold(),
        if page.chats.len() == 1 { "" } else { "s" },
        if page.has_more {
            format!(
                " {}",
                style("(more available, page with --before <last id>)").dim()
            )
        } else {
            String::new()
        }
    );
    println!();

    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars - 3).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

pub(crate) fn format_relative_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    let now = chrono::Utc::now();
    let diff = now - *dt;

    if diff.num_minutes() < 1 {
        "just now".to_string()
    } else if diff.num_hours() < 1 {
        format!("{}m ago", diff.num_minutes())
    } else if diff.num_days() < 1 {
        format!("{}h ago", diff.num_hours())
    } else if diff.num_days() < 30 {
        format!("{}d ago", diff.num_days())
    } else {
        dt.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("short", 50), "short");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn relative_time_buckets() {
        let now = Utc::now();
        assert_eq!(format_relative_time(&now), "just now");
        assert_eq!(format_relative_time(&(now - Duration::minutes(5))), "5m ago");
        assert_eq!(format_relative_time(&(now - Duration::hours(3))), "3h ago");
        assert_eq!(format_relative_time(&(now - Duration::days(2))), "2d ago");
    }
}
