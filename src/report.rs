use std::fmt::Write;

use crate::models::WordCount;
use crate::views::{percent, AnalysisView, BarChart, MoverRow, Table};

fn write_words(output: &mut String, heading: &str, table: &Table<WordCount>) {
    let _ = writeln!(output, "### {heading}");
    if table.rows.is_empty() {
        let _ = writeln!(output, "No reviews in this group.");
    } else {
        for row in &table.rows {
            let _ = writeln!(output, "- {}: {}", row.word, row.count);
        }
    }
    let _ = writeln!(output);
}

fn write_movers(output: &mut String, heading: &str, table: &Table<MoverRow>) {
    let _ = writeln!(output, "### {heading}");
    if table.rows.is_empty() {
        let _ = writeln!(output, "No vendors with enough reviews in both months.");
    } else {
        for row in &table.rows {
            let _ = writeln!(output, "- {}: {}", row.vendor_id, percent(Some(row.change), 1));
        }
    }
    let _ = writeln!(output);
}

fn write_weekly(output: &mut String, chart: &BarChart, as_percent: bool) {
    if chart.bars.is_empty() {
        let _ = writeln!(output, "No reviews recorded.");
        return;
    }
    for bar in &chart.bars {
        let value = if as_percent {
            percent(Some(bar.y), 2)
        } else {
            format!("{:.2}", bar.y)
        };
        let _ = writeln!(output, "- Week of {}: {}", bar.x, value);
    }
    if let Some(reference) = &chart.reference {
        let _ = writeln!(output);
        let _ = writeln!(output, "{}", reference.label);
    }
}

pub fn build_report(view: &AnalysisView, review_count: usize, vendor_count: usize) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Analysis of Consumer Reviews");
    let _ = writeln!(
        output,
        "Generated over {} reviews from {} vendors",
        review_count, vendor_count
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Positive Reviews by Week");
    write_weekly(&mut output, &view.weekly_rating, true);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Simple Frequency");
    write_words(&mut output, "Frequent words in positive reviews", &view.positive_words);
    write_words(&mut output, "Frequent words in negative reviews", &view.negative_words);

    let _ = writeln!(output, "## Topic Modeling");
    if view.topics.rows.is_empty() {
        let _ = writeln!(output, "No topic table loaded.");
    } else {
        for topic in &view.topics.rows {
            let _ = writeln!(output, "- Topic {}: {}", topic.topic_id, topic.words.join(", "));
        }
    }
    let _ = writeln!(output);
    for bar in &view.topic_distribution.bars {
        let _ = writeln!(output, "- Topic {}: {} reviews", bar.x, bar.y);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sentiment Analysis");
    match &view.sentiment.mean {
        Some(mean) => {
            let _ = writeln!(output, "{}", mean.label);
        }
        None => {
            let _ = writeln!(output, "No sentiment scores recorded.");
        }
    }
    let _ = writeln!(output);
    write_weekly(&mut output, &view.weekly_sentiment, false);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Movers and Shakers");
    if let (Some(from), Some(to)) = (view.movers_from, view.movers_to) {
        let _ = writeln!(
            output,
            "Change in average rating from {} to {}.",
            from.format("%B %Y"),
            to.format("%B %Y")
        );
        let _ = writeln!(output);
    }
    write_movers(&mut output, "Getting Better", &view.improvers);
    write_movers(&mut output, "Having Trouble", &view.decliners);

    output
}
