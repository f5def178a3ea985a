use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub order_id: String,
    pub vendor_id: String,
    pub item_id: String,
    pub order_date: NaiveDate,
    pub rating: u8,
    pub comment: String,
    pub tokens: Vec<String>,
    pub sentiment: f64,
    pub topic: Option<i32>,
}

impl Review {
    pub fn week_start(&self) -> NaiveDate {
        week_start(self.order_date)
    }

    pub fn month_start(&self) -> NaiveDate {
        month_start(self.order_date)
    }
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicWords {
    pub topic_id: i32,
    pub words: Vec<String>,
}

/// Field a bucketed summary is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Rating,
    Sentiment,
}

impl Metric {
    pub fn value(self, review: &Review) -> f64 {
        match self {
            Metric::Rating => f64::from(review.rating),
            Metric::Sentiment => review.sentiment,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Rating => "Average Rating",
            Metric::Sentiment => "Average Sentiment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub week_start: NaiveDate,
    pub sum: f64,
    pub count: usize,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyRatio {
    pub metric: Metric,
    pub buckets: Vec<WeeklySummary>,
    /// Count-weighted mean over every row; `None` for an empty set.
    pub overall_mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorDelta {
    pub vendor_id: String,
    pub from_rating: f64,
    pub to_rating: f64,
    pub change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorMovers {
    pub from_month: Option<NaiveDate>,
    pub to_month: Option<NaiveDate>,
    pub improvers: Vec<VendorDelta>,
    pub decliners: Vec<VendorDelta>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordWeight {
    pub word: String,
    pub count: usize,
    /// `count` relative to the most frequent word, in (0, 1].
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRanking {
    pub item_id: String,
    pub positive: usize,
    pub count: usize,
    pub mean: f64,
    pub marker_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentSummary {
    pub mean: Option<f64>,
    pub bins: Vec<SentimentBin>,
    pub peak: Option<SentimentBin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicCount {
    pub topic_id: i32,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Up,
    Down,
}

impl Tone {
    pub fn of(delta: f64) -> Self {
        if delta > 0.0 {
            Tone::Up
        } else {
            Tone::Down
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadlineStats {
    pub latest_week: Option<NaiveDate>,
    pub latest_mean: Option<f64>,
    pub week_over_week: Option<f64>,
    pub versus_overall: Option<f64>,
}
