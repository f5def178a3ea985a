use serde::{Deserialize, Serialize};

use crate::models::Review;

/// Review-type radio selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewClass {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "pos", alias = "positive")]
    Positive,
    #[serde(rename = "neg", alias = "negative")]
    Negative,
}

impl ReviewClass {
    pub fn matches(self, review: &Review) -> bool {
        match self {
            ReviewClass::All => true,
            ReviewClass::Positive => review.rating == 1,
            ReviewClass::Negative => review.rating == 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    pub vendor_id: Option<String>,
    pub class: ReviewClass,
}

impl ReviewFilter {
    pub fn vendor(vendor_id: Option<String>) -> Self {
        Self {
            vendor_id,
            class: ReviewClass::All,
        }
    }

    pub fn with_class(mut self, class: ReviewClass) -> Self {
        self.class = class;
        self
    }

    pub fn matches(&self, review: &Review) -> bool {
        let vendor_ok = self
            .vendor_id
            .as_deref()
            .map_or(true, |vendor| review.vendor_id == vendor);
        vendor_ok && self.class.matches(review)
    }

    pub fn apply<'a>(&self, reviews: &'a [Review]) -> Vec<&'a Review> {
        reviews.iter().filter(|r| self.matches(r)).collect()
    }
}
