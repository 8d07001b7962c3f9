use std::fmt::Write;

use crate::models::{AggregateSnapshot, WordCount};

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

fn bar(count: usize) -> String {
    "█".repeat(count.min(40))
}

const SPARKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const TREND_WIDTH: usize = 60;

/// One glyph per record over the latest `TREND_WIDTH` records, low is negative.
fn sparkline(trend: &[f64]) -> String {
    let start = trend.len().saturating_sub(TREND_WIDTH);
    trend[start..]
        .iter()
        .map(|value| {
            let level = ((value.clamp(-1.0, 1.0) + 1.0) / 2.0 * 7.0).round() as usize;
            SPARKS[level.min(SPARKS.len() - 1)]
        })
        .collect()
}

pub fn build_dashboard(snapshot: &AggregateSnapshot, words: &[WordCount]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# LivePulse Dashboard");
    let _ = writeln!(output);

    if snapshot.total == 0 {
        let _ = writeln!(output, "No feedback yet. Ask the audience to submit some!");
        return output;
    }

    let buckets = &snapshot.buckets;
    let _ = writeln!(output, "## Quick Stats");
    let _ = writeln!(output, "- Total feedbacks: {}", snapshot.total);
    let _ = writeln!(output, "- Average rating: {:.2}", snapshot.mean_rating);
    let _ = writeln!(
        output,
        "- Sentiment: 👍 {} | 😐 {} | 👎 {}",
        buckets.positive, buckets.neutral, buckets.negative
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "**Overall Mood:** {}", snapshot.mood.label());

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sentiment Distribution");
    for (label, count) in [
        ("😃 Happy", buckets.positive),
        ("😐 Neutral", buckets.neutral),
        ("😔 Sad", buckets.negative),
    ] {
        let _ = writeln!(
            output,
            "- {}: {} ({:.1}%)",
            label,
            count,
            share(count, buckets.total())
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sentiment Trend");
    let _ = writeln!(output, "`{}`", sparkline(&snapshot.sentiment_trend));
    let _ = writeln!(
        output,
        "oldest to newest, last {} of {} submissions",
        snapshot.sentiment_trend.len().min(TREND_WIDTH),
        snapshot.sentiment_trend.len()
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Ratings Distribution");
    for (index, count) in snapshot.rating_histogram.iter().enumerate() {
        let _ = writeln!(output, "- {} ⭐ {:>3} {}", index + 1, count, bar(*count));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Emoji Reactions");
    for entry in &snapshot.emoji_counts {
        let _ = writeln!(output, "- {}: {}", entry.emoji, entry.count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Ratings per Emoji");
    let _ = writeln!(output, "| Emoji | 1 | 2 | 3 | 4 | 5 |");
    let _ = writeln!(output, "|---|---|---|---|---|---|");
    for entry in &snapshot.rating_by_emoji {
        let cells: Vec<String> = entry.histogram.iter().map(|c| c.to_string()).collect();
        let _ = writeln!(output, "| {} | {} |", entry.emoji, cells.join(" | "));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Live Comments Feed");
    for record in &snapshot.recent {
        let comment = if record.comment.is_empty() {
            "_(no comment)_".to_string()
        } else {
            record.comment.replace('\n', " ")
        };
        let _ = writeln!(
            output,
            "- **{} ({})**: {}  \n  ⭐ {} | 🕒 {} | sentiment {:.2}",
            record.name, record.emoji, comment, record.rating, record.timestamp, record.sentiment
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Audience Word Cloud");
    if words.is_empty() {
        let _ = writeln!(output, "No comment words yet.");
    } else {
        let cloud: Vec<String> = words
            .iter()
            .map(|w| format!("{} ({})", w.word, w.count))
            .collect();
        let _ = writeln!(output, "{}", cloud.join(", "));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Simple Insights");
    let _ = writeln!(output, "Average sentiment: {:.3}", snapshot.mean_sentiment);

    output
}
