//! Typed view models handed to the browser, plus the page assemblies that build them.

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate;
use crate::filter::{ReviewClass, ReviewFilter};
use crate::models::{
    HeadlineStats, ItemRanking, Metric, Review, SentimentBin, SentimentSummary, Tone,
    TopicCount, TopicWords, VendorDelta, WeeklyRatio, WordCount, WordWeight,
};
use crate::store::ReviewStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Numeric,
    Percent,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub header: &'static str,
    pub field: &'static str,
    pub kind: ColumnKind,
    pub sortable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

impl ColumnDef {
    pub const fn new(header: &'static str, field: &'static str, kind: ColumnKind) -> Self {
        Self {
            header,
            field,
            kind,
            sortable: true,
            width: None,
        }
    }

    pub const fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Table<R> {
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<R>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisFormat {
    Number,
    Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub x: String,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceLine {
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub x_title: &'static str,
    pub y_title: &'static str,
    pub y_format: AxisFormat,
    pub bars: Vec<Point>,
    pub reference: Option<ReferenceLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterChart {
    pub title: &'static str,
    pub x_title: &'static str,
    pub y_title: &'static str,
    pub points: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub title: &'static str,
    pub bins: Vec<SentimentBin>,
    pub mean: Option<ReferenceLine>,
    /// Height of the mean annotation: the busiest bin's count.
    pub annotation_height: usize,
}

/// Word weights for the comments cloud. The server does not rasterize an
/// image; the page lays the words out itself, sized by `weight`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordCloud {
    pub words: Vec<WordWeight>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Headline {
    pub week_label: String,
    pub current: String,
    pub week_over_week: String,
    pub week_over_week_tone: Option<Tone>,
    pub versus_mean: String,
    pub versus_mean_tone: Option<Tone>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewRow {
    pub order_date: NaiveDate,
    pub item_id: String,
    pub rating: u8,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoverRow {
    pub vendor_id: String,
    pub change: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentsView {
    pub class: ReviewClass,
    pub word_cloud: WordCloud,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub vendor_id: Option<String>,
    pub headline: Headline,
    pub weekly_rating: BarChart,
    pub weekly_sentiment: BarChart,
    pub sentiment: Histogram,
    pub items: ScatterChart,
    pub comments: CommentsView,
    pub reviews: Table<ReviewRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisView {
    pub weekly_rating: BarChart,
    pub positive_words: Table<WordCount>,
    pub negative_words: Table<WordCount>,
    pub positive_cloud: WordCloud,
    pub negative_cloud: WordCloud,
    pub topics: Table<TopicWords>,
    pub topic_distribution: BarChart,
    pub sentiment: Histogram,
    pub weekly_sentiment: BarChart,
    pub movers_from: Option<NaiveDate>,
    pub movers_to: Option<NaiveDate>,
    pub improvers: Table<MoverRow>,
    pub decliners: Table<MoverRow>,
}

const REVIEW_COLUMNS: [ColumnDef; 4] = [
    ColumnDef::new("Date", "order_date", ColumnKind::Date),
    ColumnDef::new("Food Item", "item_id", ColumnKind::Text),
    ColumnDef::new("Rating", "rating", ColumnKind::Numeric),
    ColumnDef::new("Comment", "comment", ColumnKind::Text).width(500),
];

const WORD_COLUMNS: [ColumnDef; 2] = [
    ColumnDef::new("word", "word", ColumnKind::Text),
    ColumnDef::new("count", "count", ColumnKind::Numeric),
];

const MOVER_COLUMNS: [ColumnDef; 2] = [
    ColumnDef::new("Vendor ID", "vendor_id", ColumnKind::Text),
    ColumnDef::new("Change in Rating", "change", ColumnKind::Percent),
];

const NO_DATA: &str = "n/a";

pub fn percent(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}%", decimals, v * 100.0),
        None => NO_DATA.to_string(),
    }
}

pub fn weekly_chart(ratio: &WeeklyRatio) -> BarChart {
    let (title, y_format, reference_label) = match ratio.metric {
        Metric::Rating => (
            "Weekly Ratings",
            AxisFormat::Percent,
            format!("Overall Average Rating: {}", percent(ratio.overall_mean, 2)),
        ),
        Metric::Sentiment => (
            "Weekly Sentiment",
            AxisFormat::Number,
            match ratio.overall_mean {
                Some(v) => format!("Overall Average Sentiment: {v:.2}"),
                None => format!("Overall Average Sentiment: {NO_DATA}"),
            },
        ),
    };

    BarChart {
        title: title.to_string(),
        x_title: "Week",
        y_title: ratio.metric.label(),
        y_format,
        bars: ratio
            .buckets
            .iter()
            .map(|b| Point {
                x: b.week_start.to_string(),
                y: b.mean,
            })
            .collect(),
        reference: ratio.overall_mean.map(|value| ReferenceLine {
            value,
            label: reference_label,
        }),
    }
}

pub fn sentiment_histogram(summary: SentimentSummary) -> Histogram {
    Histogram {
        title: "Sentiment Distribution",
        annotation_height: summary.peak.as_ref().map_or(0, |p| p.count),
        mean: summary.mean.map(|value| ReferenceLine {
            value,
            label: format!("Mean Sentiment: {value:.2}"),
        }),
        bins: summary.bins,
    }
}

pub fn items_chart(items: Vec<ItemRanking>) -> ScatterChart {
    ScatterChart {
        title: "Ratings for the 20 Most Reviewed Items",
        x_title: "Total Ratings",
        y_title: "Average Rating",
        points: items
            .into_iter()
            .map(|item| ScatterPoint {
                label: item.item_id,
                x: item.positive as f64,
                y: item.mean,
                size: item.marker_size,
            })
            .collect(),
    }
}

pub fn topic_chart(counts: &[TopicCount]) -> BarChart {
    BarChart {
        title: "Topic Distribution".to_string(),
        x_title: "Topic",
        y_title: "Count",
        y_format: AxisFormat::Number,
        bars: counts
            .iter()
            .map(|c| Point {
                x: c.topic_id.to_string(),
                y: c.count as f64,
            })
            .collect(),
        reference: None,
    }
}

pub fn headline(stats: &HeadlineStats) -> Headline {
    Headline {
        week_label: stats
            .latest_week
            .map_or_else(|| NO_DATA.to_string(), |w| w.format("%Y-%m-%d").to_string()),
        current: percent(stats.latest_mean, 1),
        week_over_week: percent(stats.week_over_week, 2),
        week_over_week_tone: stats.week_over_week.map(Tone::of),
        versus_mean: percent(stats.versus_overall, 2),
        versus_mean_tone: stats.versus_overall.map(Tone::of),
    }
}

fn mover_table(deltas: &[VendorDelta]) -> Table<MoverRow> {
    Table {
        columns: MOVER_COLUMNS.to_vec(),
        rows: deltas
            .iter()
            .map(|d| MoverRow {
                vendor_id: d.vendor_id.clone(),
                change: d.change,
            })
            .collect(),
    }
}

fn word_table(reviews: &[&Review]) -> Table<WordCount> {
    Table {
        columns: WORD_COLUMNS.to_vec(),
        rows: aggregate::word_frequency(reviews, aggregate::TOP_WORDS),
    }
}

fn review_table(reviews: &[&Review], max_rows: usize) -> Table<ReviewRow> {
    let mut newest: Vec<&Review> = reviews.to_vec();
    newest.sort_by(|a, b| b.order_date.cmp(&a.order_date));

    Table {
        columns: REVIEW_COLUMNS.to_vec(),
        rows: newest
            .into_iter()
            .take(max_rows)
            .map(|r| ReviewRow {
                order_date: r.order_date,
                item_id: r.item_id.clone(),
                rating: r.rating,
                comment: r.comment.clone(),
            })
            .collect(),
    }
}

/// Word cloud for the vendor and review-type selection.
pub fn comments(store: &ReviewStore, filter: &ReviewFilter) -> CommentsView {
    let reviews = filter.apply(store.reviews());
    CommentsView {
        class: filter.class,
        word_cloud: WordCloud {
            words: aggregate::word_weights(&reviews, aggregate::WORD_CLOUD_WORDS),
        },
    }
}

/// Every dashboard view for one selection, computed together.
pub fn dashboard(store: &ReviewStore, filter: &ReviewFilter, max_rows: usize) -> DashboardView {
    let vendor_only = ReviewFilter::vendor(filter.vendor_id.clone());
    let reviews = vendor_only.apply(store.reviews());

    DashboardView {
        vendor_id: filter.vendor_id.clone(),
        headline: headline(&aggregate::headline(&reviews)),
        weekly_rating: weekly_chart(&aggregate::weekly_ratio(&reviews, Metric::Rating)),
        weekly_sentiment: weekly_chart(&aggregate::weekly_ratio(&reviews, Metric::Sentiment)),
        sentiment: sentiment_histogram(aggregate::sentiment_summary(&reviews)),
        items: items_chart(aggregate::item_ranking(&reviews, aggregate::TOP_ITEMS)),
        comments: comments(store, filter),
        reviews: review_table(&reviews, max_rows),
    }
}

/// The static report page over the whole store.
pub fn analysis(store: &ReviewStore) -> AnalysisView {
    let all = ReviewFilter::default().apply(store.reviews());
    let positive = ReviewFilter::default()
        .with_class(ReviewClass::Positive)
        .apply(store.reviews());
    let negative = ReviewFilter::default()
        .with_class(ReviewClass::Negative)
        .apply(store.reviews());
    let movers = aggregate::vendor_movers(&all, None);

    AnalysisView {
        weekly_rating: weekly_chart(&aggregate::weekly_ratio(&all, Metric::Rating)),
        positive_words: word_table(&positive),
        negative_words: word_table(&negative),
        positive_cloud: WordCloud {
            words: aggregate::word_weights(&positive, aggregate::WORD_CLOUD_WORDS),
        },
        negative_cloud: WordCloud {
            words: aggregate::word_weights(&negative, aggregate::WORD_CLOUD_WORDS),
        },
        topics: Table {
            columns: vec![
                ColumnDef::new("Topic", "topic_id", ColumnKind::Numeric),
                ColumnDef::new("Top Words", "words", ColumnKind::Text),
            ],
            rows: store.topics().to_vec(),
        },
        topic_distribution: topic_chart(&aggregate::topic_distribution(&all)),
        sentiment: sentiment_histogram(aggregate::sentiment_summary(&all)),
        weekly_sentiment: weekly_chart(&aggregate::weekly_ratio(&all, Metric::Sentiment)),
        movers_from: movers.from_month,
        movers_to: movers.to_month,
        improvers: mover_table(&movers.improvers),
        decliners: mover_table(&movers.decliners),
    }
}

pub const HOME_HTML: &str = r#"<!doctype html>
<html>
<head><meta name="viewport" content="width=device-width"><title>Consumer Review Analysis</title></head>
<body>
<h1>Consumer Review Analysis</h1>
<p>Explore consumer reviews of restaurant vendors to find trends and topics that can improve the business.</p>
<ul>
<li>Proactively identify potential issues with service and restaurants</li>
<li>Coach restaurants more effectively, both positively and negatively</li>
<li>Understand consumer sentiment to improve client programs</li>
</ul>
<p><a href="/analysis">Analysis</a>: a report with static findings.</p>
<p><a href="/dashboard">Dashboard</a>: ratings, sentiment and comments per vendor.</p>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn review(vendor: &str, day: u32, rating: u8, tokens: &[&str]) -> Review {
        Review {
            order_id: format!("{vendor}-{day}"),
            vendor_id: vendor.to_string(),
            item_id: format!("item-{}", day % 2),
            order_date: NaiveDate::from_ymd_opt(2023, 7, day).unwrap(),
            rating,
            comment: tokens.join(" "),
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            sentiment: if rating == 1 { 0.4 } else { -0.3 },
            topic: Some(i32::from(rating)),
        }
    }

    fn store() -> ReviewStore {
        ReviewStore::new(
            vec![
                review("a", 3, 1, &["great", "tacos"]),
                review("a", 4, 0, &["cold", "chicken"]),
                review("a", 11, 1, &["great"]),
                review("b", 12, 0, &["cold", "late"]),
            ],
            vec![TopicWords {
                topic_id: 0,
                words: vec!["cold".to_string()],
            }],
        )
    }

    #[test]
    fn percent_formats_missing_values() {
        assert_eq!(percent(Some(0.615), 1), "61.5%");
        assert_eq!(percent(Some(-0.0231), 2), "-2.31%");
        assert_eq!(percent(None, 2), "n/a");
    }

    #[test]
    fn dashboard_for_vendor_only_uses_its_reviews() {
        let store = store();
        let filter = ReviewFilter::vendor(Some("a".to_string()));
        let view = dashboard(&store, &filter, 10);

        assert_eq!(view.reviews.rows.len(), 3);
        assert_eq!(view.weekly_rating.bars.len(), 2);
        assert_eq!(view.weekly_rating.bars[0].y, 0.5);
        assert_eq!(view.headline.current, "100.0%");
        assert_eq!(view.headline.week_over_week_tone, Some(Tone::Up));
        assert_eq!(view.comments.word_cloud.words[0].word, "great");
    }

    #[test]
    fn dashboard_for_unknown_vendor_is_empty_not_an_error() {
        let store = store();
        let view = dashboard(&store, &ReviewFilter::vendor(Some("zzz".to_string())), 10);

        assert!(view.weekly_rating.bars.is_empty());
        assert_eq!(view.weekly_rating.reference, None);
        assert_eq!(view.sentiment.mean, None);
        assert_eq!(view.headline.current, "n/a");
        assert!(view.reviews.rows.is_empty());
        assert!(view.comments.word_cloud.words.is_empty());
    }

    #[test]
    fn class_only_narrows_the_comments() {
        let store = store();
        let filter = ReviewFilter::default().with_class(ReviewClass::Negative);
        let view = dashboard(&store, &filter, 10);

        assert_eq!(view.reviews.rows.len(), 4);
        assert_eq!(view.comments.class, ReviewClass::Negative);
        assert_eq!(view.comments.word_cloud.words[0].word, "cold");
        assert_eq!(view.comments.word_cloud.words[0].count, 2);
    }

    #[test]
    fn review_table_is_newest_first_and_capped() {
        let store = store();
        let view = dashboard(&store, &ReviewFilter::default(), 2);
        assert_eq!(view.reviews.rows.len(), 2);
        assert_eq!(view.reviews.rows[0].order_date.to_string(), "2023-07-12");
    }

    #[test]
    fn analysis_splits_words_by_rating() {
        let view = analysis(&store());
        assert_eq!(view.positive_words.rows[0].word, "great");
        assert_eq!(view.negative_words.rows[0].word, "cold");
        assert_eq!(view.topics.rows.len(), 1);
        assert_eq!(view.topic_distribution.bars.len(), 2);
    }

    #[test]
    fn views_serialize_typed_columns() {
        let view = analysis(&store());
        let json = serde_json::to_value(&view.improvers).unwrap();
        assert_eq!(json["columns"][1]["kind"], "percent");
        assert_eq!(json["columns"][1]["header"], "Change in Rating");
    }
}
