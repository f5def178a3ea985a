//! The immutable review set every view is derived from.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::{Review, TopicWords};
use crate::tokenize::tokenize;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("row {row}: unrecognized order_date {value:?}")]
    BadDate { row: usize, value: String },
    #[error("row {row}: item_rating must be 0 or 1, got {value}")]
    BadRating { row: usize, value: i32 },
    #[error("row {row}: sentiment {value} outside [-1, 1]")]
    BadSentiment { row: usize, value: f64 },
    #[error("row {row}: topic_id must be an integer, got {value:?}")]
    BadTopicId { row: usize, value: String },
}

#[derive(Debug, Clone, Default)]
pub struct ReviewStore {
    reviews: Vec<Review>,
    topics: Vec<TopicWords>,
}

impl ReviewStore {
    pub fn new(reviews: Vec<Review>, topics: Vec<TopicWords>) -> Self {
        Self { reviews, topics }
    }

    pub fn from_csv(reviews: &Path, topics: Option<&Path>) -> Result<Self, StoreError> {
        let reviews = read_reviews_csv(reviews)?;
        let topics = match topics {
            Some(path) => read_topics_csv(path)?,
            None => Vec::new(),
        };
        Ok(Self::new(reviews, topics))
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn topics(&self) -> &[TopicWords] {
        &self.topics
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    /// Vendor ids ordered by review count, busiest first.
    pub fn vendor_options(&self) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for review in &self.reviews {
            *counts.entry(review.vendor_id.as_str()).or_insert(0) += 1;
        }

        let mut vendors: Vec<(&str, usize)> = counts.into_iter().collect();
        vendors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        vendors.into_iter().map(|(id, _)| id.to_string()).collect()
    }
}

#[derive(Debug, Deserialize)]
struct ReviewCsvRow {
    order_id: String,
    vendor_id: String,
    item_id: String,
    order_date: String,
    item_rating: i32,
    #[serde(default)]
    consumer_comment: String,
    #[serde(default)]
    tokens: Option<String>,
    #[serde(default)]
    sentiment: Option<f64>,
    #[serde(default)]
    topic: Option<i32>,
}

impl ReviewCsvRow {
    fn into_review(self, row: usize) -> Result<Review, StoreError> {
        let order_date = parse_order_date(&self.order_date).ok_or_else(|| StoreError::BadDate {
            row,
            value: self.order_date.clone(),
        })?;
        let rating = match self.item_rating {
            0 => 0,
            1 => 1,
            value => return Err(StoreError::BadRating { row, value }),
        };
        let sentiment = self.sentiment.unwrap_or(0.0);
        if !(-1.0..=1.0).contains(&sentiment) {
            return Err(StoreError::BadSentiment {
                row,
                value: sentiment,
            });
        }

        let comment = self.consumer_comment.to_lowercase();
        let tokens = match self.tokens.as_deref().map(str::trim) {
            Some(joined) if !joined.is_empty() => {
                joined.split_whitespace().map(str::to_string).collect()
            }
            _ => tokenize(&comment),
        };

        Ok(Review {
            order_id: self.order_id,
            vendor_id: self.vendor_id,
            item_id: self.item_id,
            order_date,
            rating,
            comment,
            tokens,
            sentiment,
            topic: self.topic,
        })
    }
}

/// Accepts ISO dates and the `MM/DD/YY` form of the raw export.
pub fn parse_order_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%y"))
        .ok()
}

fn csv_error(path: &Path, source: csv::Error) -> StoreError {
    StoreError::Csv {
        path: path.display().to_string(),
        source,
    }
}

fn read_review_rows(path: &Path) -> Result<Vec<ReviewCsvRow>, StoreError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let mut rows = Vec::new();
    for result in reader.deserialize::<ReviewCsvRow>() {
        rows.push(result.map_err(|e| csv_error(path, e))?);
    }
    Ok(rows)
}

pub fn read_reviews_csv(path: &Path) -> Result<Vec<Review>, StoreError> {
    read_review_rows(path)?
        .into_iter()
        .enumerate()
        // header is line 1
        .map(|(index, row)| row.into_review(index + 2))
        .collect()
}

pub fn read_topics_csv(path: &Path) -> Result<Vec<TopicWords>, StoreError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let mut topics = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| csv_error(path, e))?;
        let mut fields = record.iter();
        let raw = fields.next().unwrap_or_default();
        let topic_id = raw.trim().parse::<i32>().map_err(|_| StoreError::BadTopicId {
            row: index + 2,
            value: raw.to_string(),
        })?;
        let words = fields
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        topics.push(TopicWords { topic_id, words });
    }

    topics.sort_by_key(|t| t.topic_id);
    Ok(topics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_reviews_and_derives_missing_tokens() {
        let file = write_file(
            "order_id,vendor_id,item_id,order_date,item_rating,consumer_comment,tokens,sentiment,topic\n\
             o1,v1,i1,2023-07-05,1,Great tacos,great tacos,0.8,2\n\
             o2,v1,i2,07/06/23,0,The chicken was cold,,-0.6,\n",
        );

        let store = ReviewStore::from_csv(file.path(), None).unwrap();
        assert_eq!(store.len(), 2);

        let second = &store.reviews()[1];
        assert_eq!(
            second.order_date,
            NaiveDate::from_ymd_opt(2023, 7, 6).unwrap()
        );
        assert_eq!(second.tokens, vec!["chicken", "cold"]);
        assert_eq!(second.topic, None);
        assert_eq!(store.reviews()[0].topic, Some(2));
    }

    #[test]
    fn rejects_out_of_range_rating() {
        let file = write_file(
            "order_id,vendor_id,item_id,order_date,item_rating,consumer_comment\n\
             o1,v1,i1,2023-07-05,5,ok\n",
        );

        let err = ReviewStore::from_csv(file.path(), None).unwrap_err();
        assert!(matches!(err, StoreError::BadRating { row: 2, value: 5 }));
    }

    #[test]
    fn rejects_unparseable_date() {
        let file = write_file(
            "order_id,vendor_id,item_id,order_date,item_rating,consumer_comment\n\
             o1,v1,i1,yesterday,1,ok\n",
        );

        let err = ReviewStore::from_csv(file.path(), None).unwrap_err();
        assert!(matches!(err, StoreError::BadDate { row: 2, .. }));
    }

    #[test]
    fn loads_topic_table_sorted() {
        let reviews = write_file(
            "order_id,vendor_id,item_id,order_date,item_rating,consumer_comment\n",
        );
        let topics = write_file(
            "topic_id,word_0,word_1,word_2\n\
             1,cold,late,soggy\n\
             0,great,tasty,\n",
        );

        let store = ReviewStore::from_csv(reviews.path(), Some(topics.path())).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.topics().len(), 2);
        assert_eq!(store.topics()[0].topic_id, 0);
        assert_eq!(store.topics()[0].words, vec!["great", "tasty"]);
    }

    #[test]
    fn rejects_non_integer_topic_id() {
        let reviews = write_file(
            "order_id,vendor_id,item_id,order_date,item_rating,consumer_comment\n",
        );
        let topics = write_file(
            "topic_id,word_0\n\
             0,great\n\
             x1,cold\n\
             2.0,late\n",
        );

        let err = ReviewStore::from_csv(reviews.path(), Some(topics.path())).unwrap_err();
        assert!(matches!(
            err,
            StoreError::BadTopicId { row: 3, ref value } if value == "x1"
        ));
    }

    #[test]
    fn vendor_options_are_ordered_by_volume() {
        let make = |vendor: &str| Review {
            order_id: "o".to_string(),
            vendor_id: vendor.to_string(),
            item_id: "i".to_string(),
            order_date: NaiveDate::from_ymd_opt(2023, 7, 3).unwrap(),
            rating: 1,
            comment: String::new(),
            tokens: Vec::new(),
            sentiment: 0.0,
            topic: None,
        };
        let store = ReviewStore::new(
            vec![make("b"), make("a"), make("c"), make("c"), make("b")],
            Vec::new(),
        );

        assert_eq!(store.vendor_options(), vec!["b", "c", "a"]);
    }
}
