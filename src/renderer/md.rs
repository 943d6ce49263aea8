use crate::report::*;
use crate::timefmt::{format_date, format_date_opt};
use anyhow::Result;

/// Render a report to Markdown: header, summary, ranked chats, then activity.
pub fn render(report: &Report) -> Result<String> {
    let mut output = String::new();

    // 1. Title and archive details
    render_header(&mut output, report);

    // 2. Summary
    render_summary(&mut output, report);

    // 3. Ranked chats
    if !report.chats.is_empty() {
        render_chats(&mut output, report);
    }

    // 4. Activity (only when buckets were requested)
    if report.chats.iter().any(|c| c.timebuckets.is_some()) {
        render_activity(&mut output, &report.chats);
    }

    Ok(output)
}

fn render_header(output: &mut String, report: &Report) {
    output.push_str(&format!("# 💬 Total messages for {}\n", report.owner_name));
    output.push_str(&format!(
        "- **Archive as of:** {}\n",
        format_date_opt(report.archive_as_of)
    ));
    output.push('\n');
}

fn render_summary(output: &mut String, report: &Report) {
    let global = &report.global;
    output.push_str("### 📊 Summary\n");
    output.push_str(&format!(
        "- 💬 **Messages:** {}\n",
        format_number(global.count_messages_total)
    ));
    output.push_str(&format!(
        "- 📤 **Sent by you:** {}\n",
        format_number(global.count_messages_outgoing)
    ));

    if report.warnings.contains(&Warning::EmptyResult) {
        output.push_str("\n*No messages to report.*\n");
    }
    output.push('\n');
}

fn render_chats(output: &mut String, report: &Report) {
    output.push_str("### 🏆 Top chats\n\n");
    output.push_str("| Rank | Name | Messages | % out | % of total | Median length |\n");
    output.push_str("| ---- | ---- | -------- | ----- | ---------- | ------------- |\n");

    for (i, chat) in report.chats.iter().enumerate() {
        output.push_str(&format!(
            "| {} | {} | {} | {:.1} | {:.1} | {} |\n",
            i + 1,
            escape_cell(&chat.name),
            format_number(chat.count_messages_total),
            chat.outgoing_percentage(),
            chat.share_of_total(&report.global),
            chat.median_message_length
        ));
    }
    output.push('\n');
}

fn render_activity(output: &mut String, chats: &[ChatStats]) {
    output.push_str("### 📅 Activity\n");

    for chat in chats {
        let Some(ref buckets) = chat.timebuckets else {
            continue;
        };
        // The seeded anchor bucket is often empty; only show windows with messages
        let active: Vec<&TimeBucket> = buckets.iter().filter(|b| b.count > 0).collect();
        if active.is_empty() {
            continue;
        }

        output.push_str(&format!("\n**{}**\n\n", escape_cell(&chat.name)));
        let peak = active.iter().map(|b| b.count).max().unwrap_or(1);
        for bucket in active {
            let bar_len = (bucket.count * 20).div_ceil(peak);
            output.push_str(&format!(
                "- `{}` {} {}\n",
                format_date(bucket.start),
                "█".repeat(bar_len),
                format_number(bucket.count)
            ));
        }
    }
    output.push('\n');
}

/// Keep chat names from breaking table rows.
fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

fn format_number(n: usize) -> String {
    let digits = n.to_string();
    let mut grouped_rev = String::new();

    // Insert commas every three digits, starting from the right
    for (count, ch) in digits.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            grouped_rev.push(',');
        }
        grouped_rev.push(ch);
    }

    grouped_rev.chars().rev().collect()
}
