//! Pure summaries over an already-filtered slice of reviews.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::models::{
    HeadlineStats, ItemRanking, Metric, Review, SentimentBin, SentimentSummary, TopicCount,
    VendorDelta, VendorMovers, WeeklyRatio, WeeklySummary, WordCount, WordWeight,
};

pub const MIN_VENDOR_MONTH_REVIEWS: usize = 3;
pub const TOP_MOVERS: usize = 10;
pub const TOP_WORDS: usize = 10;
pub const WORD_CLOUD_WORDS: usize = 100;
pub const TOP_ITEMS: usize = 20;
pub const SENTIMENT_BINS: usize = 20;

const MARKER_MIN: f64 = 10.0;
const MARKER_SPAN: f64 = 40.0;

pub fn mean(sum: f64, count: usize) -> Option<f64> {
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

pub fn weekly_ratio(reviews: &[&Review], metric: Metric) -> WeeklyRatio {
    let mut weeks: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    let mut total = 0.0;

    for review in reviews {
        let value = metric.value(review);
        let entry = weeks.entry(review.week_start()).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
        total += value;
    }

    let buckets = weeks
        .into_iter()
        .map(|(week_start, (sum, count))| WeeklySummary {
            week_start,
            sum,
            count,
            mean: sum / count as f64,
        })
        .collect();

    WeeklyRatio {
        metric,
        buckets,
        overall_mean: mean(total, reviews.len()),
    }
}

/// Vendor x month table of mean ratings. Cells below the sample-size floor are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorMonthPivot {
    pub months: Vec<NaiveDate>,
    pub rows: BTreeMap<String, Vec<Option<f64>>>,
}

impl VendorMonthPivot {
    pub fn cell(&self, vendor_id: &str, month: NaiveDate) -> Option<f64> {
        let column = self.months.iter().position(|m| *m == month)?;
        self.rows.get(vendor_id)?.get(column).copied().flatten()
    }
}

pub fn vendor_month_pivot(reviews: &[&Review]) -> VendorMonthPivot {
    let mut cells: HashMap<(&str, NaiveDate), (usize, usize)> = HashMap::new();
    let mut months = BTreeSet::new();

    for review in reviews {
        let month = review.month_start();
        months.insert(month);
        let entry = cells
            .entry((review.vendor_id.as_str(), month))
            .or_insert((0, 0));
        entry.0 += usize::from(review.rating);
        entry.1 += 1;
    }

    let months: Vec<NaiveDate> = months.into_iter().collect();
    let mut rows: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();

    for ((vendor_id, month), (positive, count)) in cells {
        if count < MIN_VENDOR_MONTH_REVIEWS {
            continue;
        }
        let Some(column) = months.iter().position(|m| *m == month) else {
            continue;
        };
        let row = rows
            .entry(vendor_id.to_string())
            .or_insert_with(|| vec![None; months.len()]);
        row[column] = Some(positive as f64 / count as f64);
    }

    VendorMonthPivot { months, rows }
}

fn by_change(a: &VendorDelta, b: &VendorDelta) -> Ordering {
    a.change
        .partial_cmp(&b.change)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.vendor_id.cmp(&b.vendor_id))
}

/// Ranks vendors by rating change between two months, earliest and latest by default.
pub fn vendor_movers(reviews: &[&Review], months: Option<(NaiveDate, NaiveDate)>) -> VendorMovers {
    let pivot = vendor_month_pivot(reviews);
    let (from_month, to_month) = match months {
        Some((from, to)) => (Some(from), Some(to)),
        None => (pivot.months.first().copied(), pivot.months.last().copied()),
    };

    let deltas: Vec<VendorDelta> = match (from_month, to_month) {
        (Some(from), Some(to)) => pivot
            .rows
            .keys()
            .filter_map(|vendor_id| {
                let from_rating = pivot.cell(vendor_id, from)?;
                let to_rating = pivot.cell(vendor_id, to)?;
                Some(VendorDelta {
                    vendor_id: vendor_id.clone(),
                    from_rating,
                    to_rating,
                    change: to_rating - from_rating,
                })
            })
            .collect(),
        _ => Vec::new(),
    };

    let mut improvers: Vec<VendorDelta> =
        deltas.iter().filter(|d| d.change > 0.0).cloned().collect();
    improvers.sort_by(|a, b| {
        b.change
            .partial_cmp(&a.change)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.vendor_id.cmp(&b.vendor_id))
    });
    improvers.truncate(TOP_MOVERS);

    let mut decliners: Vec<VendorDelta> = deltas.into_iter().filter(|d| d.change < 0.0).collect();
    decliners.sort_by(by_change);
    decliners.truncate(TOP_MOVERS);

    VendorMovers {
        from_month,
        to_month,
        improvers,
        decliners,
    }
}

/// Token counts in descending order; ties keep first-seen order.
fn token_counts(reviews: &[&Review]) -> Vec<WordCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<WordCount> = Vec::new();

    for token in reviews.iter().flat_map(|r| r.tokens.iter()) {
        match index.get(token.as_str()) {
            Some(&at) => counts[at].count += 1,
            None => {
                index.insert(token.as_str(), counts.len());
                counts.push(WordCount {
                    word: token.clone(),
                    count: 1,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

pub fn word_frequency(reviews: &[&Review], top: usize) -> Vec<WordCount> {
    let mut counts = token_counts(reviews);
    counts.truncate(top);
    counts
}

pub fn word_weights(reviews: &[&Review], limit: usize) -> Vec<WordWeight> {
    let counts = word_frequency(reviews, limit);
    let max = counts.first().map_or(0, |c| c.count);

    counts
        .into_iter()
        .map(|c| WordWeight {
            weight: c.count as f64 / max as f64,
            word: c.word,
            count: c.count,
        })
        .collect()
}

pub fn item_ranking(reviews: &[&Review], top: usize) -> Vec<ItemRanking> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut items: Vec<(String, usize, usize)> = Vec::new();

    for review in reviews {
        let at = *index.entry(review.item_id.as_str()).or_insert_with(|| {
            items.push((review.item_id.clone(), 0, 0));
            items.len() - 1
        });
        items[at].1 += usize::from(review.rating);
        items[at].2 += 1;
    }

    items.sort_by(|a, b| b.2.cmp(&a.2));
    items.truncate(top);

    let max = items.first().map_or(0, |i| i.2);
    items
        .into_iter()
        .map(|(item_id, positive, count)| ItemRanking {
            item_id,
            positive,
            count,
            mean: positive as f64 / count as f64,
            marker_size: count as f64 / max as f64 * MARKER_SPAN + MARKER_MIN,
        })
        .collect()
}

pub fn sentiment_summary(reviews: &[&Review]) -> SentimentSummary {
    let width = 2.0 / SENTIMENT_BINS as f64;
    let mut bins: Vec<SentimentBin> = (0..SENTIMENT_BINS)
        .map(|i| SentimentBin {
            lower: -1.0 + i as f64 * width,
            upper: -1.0 + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();

    let mut total = 0.0;
    for review in reviews {
        let slot = ((review.sentiment + 1.0) / width).floor() as usize;
        bins[slot.min(SENTIMENT_BINS - 1)].count += 1;
        total += review.sentiment;
    }

    let peak = bins
        .iter()
        .filter(|b| b.count > 0)
        .fold(None::<&SentimentBin>, |best, bin| match best {
            Some(best) if best.count >= bin.count => Some(best),
            _ => Some(bin),
        })
        .cloned();

    SentimentSummary {
        mean: mean(total, reviews.len()),
        bins,
        peak,
    }
}

pub fn topic_distribution(reviews: &[&Review]) -> Vec<TopicCount> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for topic in reviews.iter().filter_map(|r| r.topic) {
        *counts.entry(topic).or_insert(0) += 1;
    }

    let mut values: Vec<TopicCount> = counts
        .into_iter()
        .map(|(topic_id, count)| TopicCount { topic_id, count })
        .collect();
    values.sort_by(|a, b| b.count.cmp(&a.count));
    values
}

pub fn headline(reviews: &[&Review]) -> HeadlineStats {
    let weekly = weekly_ratio(reviews, Metric::Rating);
    let latest = weekly.buckets.last();
    let previous = weekly
        .buckets
        .len()
        .checked_sub(2)
        .and_then(|i| weekly.buckets.get(i));

    let latest_mean = latest.map(|b| b.mean);
    HeadlineStats {
        latest_week: latest.map(|b| b.week_start),
        latest_mean,
        week_over_week: latest_mean.zip(previous.map(|b| b.mean)).map(|(l, p)| l - p),
        versus_overall: latest_mean.zip(weekly.overall_mean).map(|(l, o)| l - o),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn review(vendor: &str, order_date: NaiveDate, rating: u8) -> Review {
        Review {
            order_id: format!("{vendor}-{order_date}"),
            vendor_id: vendor.to_string(),
            item_id: "taco".to_string(),
            order_date,
            rating,
            comment: String::new(),
            tokens: Vec::new(),
            sentiment: 0.0,
            topic: None,
        }
    }

    fn with_tokens(words: &[&str]) -> Review {
        let mut r = review("v", date(2023, 7, 3), 1);
        r.tokens = words.iter().map(|w| w.to_string()).collect();
        r
    }

    fn refs(reviews: &[Review]) -> Vec<&Review> {
        reviews.iter().collect()
    }

    fn vendor_month(vendor: &str, month: u32, positive: usize, total: usize) -> Vec<Review> {
        (0..total)
            .map(|i| review(vendor, date(2023, month, 3), u8::from(i < positive)))
            .collect()
    }

    #[test]
    fn weekly_ratio_matches_worked_example() {
        let w1 = date(2023, 7, 3);
        let w2 = date(2023, 7, 10);
        let reviews = vec![
            review("A", w1, 1),
            review("A", date(2023, 7, 5), 0),
            review("A", w2, 1),
        ];

        let ratio = weekly_ratio(&refs(&reviews), Metric::Rating);
        assert_eq!(ratio.buckets.len(), 2);
        assert_eq!(ratio.buckets[0].week_start, w1);
        assert_eq!(ratio.buckets[0].count, 2);
        assert!((ratio.buckets[0].mean - 0.5).abs() < 1e-9);
        assert_eq!(ratio.buckets[1].week_start, w2);
        assert!((ratio.buckets[1].mean - 1.0).abs() < 1e-9);
        assert!((ratio.overall_mean.unwrap() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn overall_mean_is_count_weighted() {
        let mut reviews = Vec::new();
        // week 1: 4 reviews, 1 positive; week 2: 1 positive; week 3: 5 reviews, 5 positive
        for i in 0..4 {
            reviews.push(review("v", date(2023, 7, 3), u8::from(i == 0)));
        }
        reviews.push(review("v", date(2023, 7, 11), 1));
        for _ in 0..5 {
            reviews.push(review("v", date(2023, 7, 18), 1));
        }

        let ratio = weekly_ratio(&refs(&reviews), Metric::Rating);
        let weighted: f64 = ratio
            .buckets
            .iter()
            .map(|b| b.mean * b.count as f64)
            .sum::<f64>()
            / reviews.len() as f64;
        let overall = ratio.overall_mean.unwrap();
        assert!((overall - weighted).abs() < 1e-9);
        assert!((overall - 0.7).abs() < 1e-9);
    }

    #[test]
    fn weekly_ratio_over_sentiment() {
        let mut a = review("v", date(2023, 7, 3), 1);
        a.sentiment = 0.5;
        let mut b = review("v", date(2023, 7, 4), 0);
        b.sentiment = -0.1;
        let reviews = vec![a, b];

        let ratio = weekly_ratio(&refs(&reviews), Metric::Sentiment);
        assert_eq!(ratio.buckets.len(), 1);
        assert!((ratio.buckets[0].mean - 0.2).abs() < 1e-9);
    }

    #[test]
    fn empty_set_yields_no_data() {
        let ratio = weekly_ratio(&[], Metric::Rating);
        assert!(ratio.buckets.is_empty());
        assert_eq!(ratio.overall_mean, None);

        let sentiment = sentiment_summary(&[]);
        assert_eq!(sentiment.mean, None);
        assert_eq!(sentiment.peak, None);

        let movers = vendor_movers(&[], None);
        assert!(movers.improvers.is_empty());
        assert!(movers.decliners.is_empty());

        let stats = headline(&[]);
        assert_eq!(stats.latest_mean, None);
        assert_eq!(stats.week_over_week, None);
        assert!(item_ranking(&[], TOP_ITEMS).is_empty());
        assert!(word_weights(&[], WORD_CLOUD_WORDS).is_empty());
    }

    #[test]
    fn thin_vendor_months_never_rank() {
        let mut reviews = Vec::new();
        reviews.extend(vendor_month("steady", 7, 1, 4));
        reviews.extend(vendor_month("steady", 9, 3, 4));
        // extreme swing, but only two reviews in September
        reviews.extend(vendor_month("thin", 7, 0, 5));
        reviews.extend(vendor_month("thin", 9, 2, 2));

        let pivot = vendor_month_pivot(&refs(&reviews));
        assert_eq!(pivot.cell("thin", date(2023, 9, 1)), None);
        assert_eq!(pivot.cell("thin", date(2023, 7, 1)), Some(0.0));

        let movers = vendor_movers(&refs(&reviews), None);
        assert_eq!(movers.from_month, Some(date(2023, 7, 1)));
        assert_eq!(movers.to_month, Some(date(2023, 9, 1)));
        assert_eq!(movers.improvers.len(), 1);
        assert_eq!(movers.improvers[0].vendor_id, "steady");
        assert!((movers.improvers[0].change - 0.5).abs() < 1e-9);
        assert!(movers.decliners.is_empty());
    }

    #[test]
    fn zero_mean_is_not_treated_as_missing() {
        let mut reviews = Vec::new();
        reviews.extend(vendor_month("fallen", 7, 3, 3));
        reviews.extend(vendor_month("fallen", 9, 0, 3));

        let movers = vendor_movers(&refs(&reviews), None);
        assert_eq!(movers.decliners.len(), 1);
        assert!((movers.decliners[0].change + 1.0).abs() < 1e-9);
    }

    #[test]
    fn mover_lists_are_disjoint_and_capped() {
        let mut reviews = Vec::new();
        for i in 0..15 {
            let vendor = format!("up{i:02}");
            reviews.extend(vendor_month(&vendor, 7, 0, 4));
            reviews.extend(vendor_month(&vendor, 9, 1 + i % 4, 4));
        }
        for i in 0..4 {
            let vendor = format!("down{i}");
            reviews.extend(vendor_month(&vendor, 7, 4, 4));
            reviews.extend(vendor_month(&vendor, 9, i, 4));
        }

        let movers = vendor_movers(&refs(&reviews), None);
        assert_eq!(movers.improvers.len(), TOP_MOVERS);
        assert_eq!(movers.decliners.len(), 4);
        for up in &movers.improvers {
            assert!(movers.decliners.iter().all(|d| d.vendor_id != up.vendor_id));
        }
        assert!(movers
            .improvers
            .windows(2)
            .all(|w| w[0].change >= w[1].change));
        assert!(movers
            .decliners
            .windows(2)
            .all(|w| w[0].change <= w[1].change));
        assert_eq!(movers.decliners[0].vendor_id, "down0");
    }

    #[test]
    fn explicit_months_override_defaults() {
        let mut reviews = Vec::new();
        reviews.extend(vendor_month("v", 7, 0, 3));
        reviews.extend(vendor_month("v", 8, 3, 3));
        reviews.extend(vendor_month("v", 9, 0, 3));

        let movers = vendor_movers(
            &refs(&reviews),
            Some((date(2023, 7, 1), date(2023, 8, 1))),
        );
        assert_eq!(movers.improvers.len(), 1);
        assert!(movers.decliners.is_empty());
    }

    #[test]
    fn word_frequency_breaks_ties_by_first_seen() {
        let reviews = vec![
            with_tokens(&["dry", "cold"]),
            with_tokens(&["chicken", "cold"]),
            with_tokens(&["dry"]),
        ];

        let top = word_frequency(&refs(&reviews), TOP_WORDS);
        let words: Vec<&str> = top.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(words, vec!["dry", "cold", "chicken"]);
        assert_eq!(top[0].count, 2);
    }

    #[test]
    fn word_frequency_ignores_row_order_without_ties() {
        let reviews = vec![
            with_tokens(&["cold", "cold", "cold"]),
            with_tokens(&["late", "late"]),
            with_tokens(&["great"]),
        ];
        let forward = word_frequency(&refs(&reviews), TOP_WORDS);

        let reversed: Vec<&Review> = reviews.iter().rev().collect();
        assert_eq!(word_frequency(&reversed, TOP_WORDS), forward);
    }

    #[test]
    fn word_frequency_keeps_top_k() {
        let words: Vec<String> = (0..15).map(|i| format!("w{i}")).collect();
        let tokens: Vec<&str> = words.iter().map(String::as_str).collect();
        let reviews = vec![with_tokens(&tokens)];
        assert_eq!(word_frequency(&refs(&reviews), TOP_WORDS).len(), TOP_WORDS);
    }

    #[test]
    fn word_weights_are_relative_to_max() {
        let reviews = vec![with_tokens(&["cold", "cold", "dry"])];
        let weights = word_weights(&refs(&reviews), WORD_CLOUD_WORDS);
        assert_eq!(weights[0].weight, 1.0);
        assert_eq!(weights[1].weight, 0.5);
    }

    #[test]
    fn items_rank_by_volume_with_scaled_markers() {
        let mut reviews = Vec::new();
        for i in 0..4 {
            let mut r = review("v", date(2023, 7, 3), u8::from(i < 3));
            r.item_id = "burrito".to_string();
            reviews.push(r);
        }
        let mut r = review("v", date(2023, 7, 3), 0);
        r.item_id = "salad".to_string();
        reviews.push(r);

        let items = item_ranking(&refs(&reviews), TOP_ITEMS);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].item_id, "burrito");
        assert_eq!(items[0].positive, 3);
        assert!((items[0].mean - 0.75).abs() < 1e-9);
        assert!((items[0].marker_size - 50.0).abs() < 1e-9);
        assert!((items[1].marker_size - 20.0).abs() < 1e-9);
    }

    #[test]
    fn sentiment_peak_tracks_busiest_bin() {
        let reviews: Vec<Review> = [0.0, 0.01, 0.02, -0.95, 1.0]
            .iter()
            .map(|s| {
                let mut r = review("v", date(2023, 7, 3), 1);
                r.sentiment = *s;
                r
            })
            .collect();

        let summary = sentiment_summary(&refs(&reviews));
        assert_eq!(summary.bins.len(), SENTIMENT_BINS);
        assert_eq!(summary.bins.iter().map(|b| b.count).sum::<usize>(), 5);
        let peak = summary.peak.unwrap();
        assert_eq!(peak.count, 3);
        assert!(peak.lower <= 0.0 && 0.0 < peak.upper);
        assert_eq!(summary.bins[SENTIMENT_BINS - 1].count, 1);
        assert!((summary.mean.unwrap() - 0.016).abs() < 1e-9);
    }

    #[test]
    fn topic_distribution_orders_by_count() {
        let reviews: Vec<Review> = [Some(2), Some(1), Some(2), None]
            .iter()
            .map(|t| {
                let mut r = review("v", date(2023, 7, 3), 1);
                r.topic = *t;
                r
            })
            .collect();

        let topics = topic_distribution(&refs(&reviews));
        assert_eq!(
            topics,
            vec![
                TopicCount { topic_id: 2, count: 2 },
                TopicCount { topic_id: 1, count: 1 },
            ]
        );
    }

    #[test]
    fn headline_compares_latest_two_weeks() {
        let reviews = vec![
            review("v", date(2023, 7, 3), 1),
            review("v", date(2023, 7, 4), 1),
            review("v", date(2023, 7, 10), 1),
            review("v", date(2023, 7, 11), 0),
        ];

        let stats = headline(&refs(&reviews));
        assert_eq!(stats.latest_week, Some(date(2023, 7, 10)));
        assert_eq!(stats.latest_mean, Some(0.5));
        assert_eq!(stats.week_over_week, Some(-0.5));
        assert_eq!(stats.versus_overall, Some(-0.25));
    }

    #[test]
    fn headline_with_single_week_has_no_wow() {
        let reviews = vec![review("v", date(2023, 7, 3), 1)];
        let stats = headline(&refs(&reviews));
        assert_eq!(stats.latest_mean, Some(1.0));
        assert_eq!(stats.week_over_week, None);
        assert_eq!(stats.versus_overall, Some(0.0));
    }
}
