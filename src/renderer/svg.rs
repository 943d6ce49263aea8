use crate::report::*;
use anyhow::Result;

const PLOT_HEIGHT: f64 = 400.0;
const TOP_MARGIN: f64 = 50.0;
const BOTTOM_MARGIN: f64 = 20.0;
const LEFT_MARGIN: f64 = 60.0;
const RIGHT_MARGIN: f64 = 20.0;
const SLOT_WIDTH: f64 = 28.0;
const BAR_WIDTH: f64 = 20.0;
const LABEL_SIZE: f64 = 8.25;

const TOTAL_COLOR: &str = "#1f77b4";
const OUTGOING_COLOR: &str = "khaki";

/// Render the ranked chats as a bar chart: total messages per chat with the
/// outgoing share overlaid, one rotated label per bar.
pub fn render(report: &Report) -> Result<String> {
    let slots = report.chats.len().max(1) as f64;
    let width = LEFT_MARGIN + slots * SLOT_WIDTH + RIGHT_MARGIN;
    let height = TOP_MARGIN + PLOT_HEIGHT + BOTTOM_MARGIN;
    let baseline = TOP_MARGIN + PLOT_HEIGHT;
    let peak = report
        .chats
        .iter()
        .map(|c| c.count_messages_total)
        .max()
        .unwrap_or(0)
        .max(1) as f64;
    let scale = |count: usize| count as f64 / peak * PLOT_HEIGHT;

    let mut output = String::new();
    output.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" font-family=\"sans-serif\">\n",
        w = width,
        h = height
    ));
    output.push_str(&format!(
        "  <rect width=\"{}\" height=\"{}\" fill=\"white\"/>\n",
        width, height
    ));
    output.push_str(&format!(
        "  <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"16\">Total messages for {}</text>\n",
        width / 2.0,
        TOP_MARGIN / 2.0,
        escape_xml(&report.owner_name)
    ));

    render_axis(&mut output, peak, baseline);

    for (i, chat) in report.chats.iter().enumerate() {
        let x = LEFT_MARGIN + i as f64 * SLOT_WIDTH + (SLOT_WIDTH - BAR_WIDTH) / 2.0;
        let total_h = scale(chat.count_messages_total);
        let out_h = scale(chat.count_messages_outgoing);

        output.push_str(&format!(
            "  <rect x=\"{:.1}\" y=\"{:.1}\" width=\"{}\" height=\"{:.1}\" fill=\"{}\"/>\n",
            x,
            baseline - total_h,
            BAR_WIDTH,
            total_h,
            TOTAL_COLOR
        ));
        output.push_str(&format!(
            "  <rect x=\"{:.1}\" y=\"{:.1}\" width=\"{}\" height=\"{:.1}\" fill=\"{}\"/>\n",
            x,
            baseline - out_h,
            BAR_WIDTH,
            out_h,
            OUTGOING_COLOR
        ));

        render_bar_label(&mut output, i, chat, x + BAR_WIDTH / 2.0, baseline - total_h);
    }

    output.push_str("</svg>\n");
    Ok(output)
}

fn render_axis(output: &mut String, peak: f64, baseline: f64) {
    output.push_str(&format!(
        "  <line x1=\"{x}\" y1=\"{top}\" x2=\"{x}\" y2=\"{bottom}\" stroke=\"black\"/>\n",
        x = LEFT_MARGIN,
        top = TOP_MARGIN,
        bottom = baseline
    ));
    for step in 0..=4 {
        let value = peak * step as f64 / 4.0;
        let y = baseline - PLOT_HEIGHT * step as f64 / 4.0;
        output.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\" font-size=\"10\">{:.0}</text>\n",
            LEFT_MARGIN - 6.0,
            y + 3.0,
            value
        ));
    }
}

/// The tallest bar (rank 1) has no room above it, so its label runs down inside the bar.
fn render_bar_label(output: &mut String, index: usize, chat: &ChatStats, cx: f64, top: f64) {
    let text = format!(
        " {}. {} ({}, {:.1}% out)",
        index + 1,
        chat.name,
        chat.count_messages_total,
        chat.outgoing_percentage()
    );
    let (anchor, y) = if index == 0 {
        ("end", top + 4.0)
    } else {
        ("start", top - 4.0)
    };
    output.push_str(&format!(
        "  <text x=\"{cx:.1}\" y=\"{y:.1}\" transform=\"rotate(-90 {cx:.1} {y:.1})\" text-anchor=\"{anchor}\" dominant-baseline=\"middle\" font-size=\"{size}\">{text}</text>\n",
        cx = cx,
        y = y,
        anchor = anchor,
        size = LABEL_SIZE,
        text = escape_xml(&text)
    ));
}

fn escape_xml(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(name: &str, total: usize, outgoing: usize) -> ChatStats {
        ChatStats {
            key: name.to_string(),
            name: name.to_string(),
            count_messages_total: total,
            count_messages_outgoing: outgoing,
            median_message_length: 0.0,
            timebuckets: None,
        }
    }

    fn report(chats: Vec<ChatStats>) -> Report {
        let global = GlobalStats {
            count_messages_total: chats.iter().map(|c| c.count_messages_total).sum(),
            count_messages_outgoing: chats.iter().map(|c| c.count_messages_outgoing).sum(),
        };
        Report {
            schema_version: SCHEMA_VERSION,
            owner_name: "Jane <Doe>".to_string(),
            archive_as_of: None,
            global,
            chats,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a & <b> \"c\""), "a &amp; &lt;b&gt; &quot;c&quot;");
    }

    #[test]
    fn test_render_bars_and_labels() {
        let svg = render(&report(vec![chat("Bob Smith", 100, 25), chat("Tom & Jerry", 50, 10)]))
            .unwrap();

        assert!(svg.starts_with("<svg "));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("Total messages for Jane &lt;Doe&gt;"));
        assert!(svg.contains(" 1. Bob Smith (100, 25.0% out)"));
        assert!(svg.contains(" 2. Tom &amp; Jerry (50, 20.0% out)"));
        assert!(svg.contains("fill=\"khaki\""));
        // Background plus two bars per chat
        assert_eq!(svg.matches("<rect").count(), 5);
        // Tallest bar spans the whole plot
        assert!(svg.contains("height=\"400.0\" fill=\"#1f77b4\""));
    }

    #[test]
    fn test_render_empty_report() {
        let svg = render(&report(Vec::new())).unwrap();
        assert_eq!(svg.matches("<rect").count(), 1);
        assert!(svg.contains("Total messages for"));
    }
}
