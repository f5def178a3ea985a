use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::{Review, TopicWords};
use crate::store::{self, ReviewStore};
use crate::tokenize::tokenize;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn upsert_review(pool: &PgPool, review: &Review) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO review_dashboard.reviews
        (order_id, vendor_id, item_id, order_date, item_rating, consumer_comment, tokens, sentiment, topic)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (order_id, item_id) DO NOTHING
        "#,
    )
    .bind(&review.order_id)
    .bind(&review.vendor_id)
    .bind(&review.item_id)
    .bind(review.order_date)
    .bind(i16::from(review.rating))
    .bind(&review.comment)
    .bind(&review.tokens)
    .bind(review.sentiment)
    .bind(review.topic)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

async fn upsert_topic(pool: &PgPool, topic: &TopicWords) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO review_dashboard.topics (topic_id, words)
        VALUES ($1, $2)
        ON CONFLICT (topic_id) DO UPDATE SET words = EXCLUDED.words
        "#,
    )
    .bind(topic.topic_id)
    .bind(&topic.words)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let reviews = vec![
        ("seed-001", "9150", "1201", (2023, 7, 3), 1, "Tacos were hot and fresh", 0.3, 0),
        ("seed-002", "9150", "1202", (2023, 7, 12), 1, "Great burrito, friendly driver", 0.8, 0),
        ("seed-003", "9687", "2210", (2023, 7, 18), 0, "Chicken was cold and dry", -0.6, 1),
        ("seed-004", "9687", "2210", (2023, 8, 2), 0, "Cold fries again", -0.6, 1),
        ("seed-005", "10251", "3105", (2023, 8, 21), 1, "Perfect salad", 1.0, 0),
        ("seed-006", "10251", "3105", (2023, 9, 5), 0, "Missing dressing", -0.2, 1),
        ("seed-007", "9150", "1201", (2023, 9, 11), 1, "Delicious as always", 1.0, 0),
        ("seed-008", "9687", "2211", (2023, 9, 25), 1, "Much better this time", 0.5, 0),
    ];

    for (order_id, vendor_id, item_id, (y, m, d), rating, comment, sentiment, topic) in reviews {
        let comment = comment.to_lowercase();
        let review = Review {
            order_id: order_id.to_string(),
            vendor_id: vendor_id.to_string(),
            item_id: item_id.to_string(),
            order_date: NaiveDate::from_ymd_opt(y, m, d).context("invalid date")?,
            rating,
            tokens: tokenize(&comment),
            comment,
            sentiment,
            topic: Some(topic),
        };
        upsert_review(pool, &review).await?;
    }

    let topics = [
        (0, ["great", "fresh", "hot", "delicious", "perfect"]),
        (1, ["cold", "dry", "chicken", "missing", "fries"]),
    ];
    for (topic_id, words) in topics {
        let topic = TopicWords {
            topic_id,
            words: words.iter().map(|w| w.to_string()).collect(),
        };
        upsert_topic(pool, &topic).await?;
    }

    Ok(())
}

pub async fn fetch_reviews(pool: &PgPool) -> anyhow::Result<Vec<Review>> {
    let rows = sqlx::query(
        "SELECT order_id, vendor_id, item_id, order_date, item_rating, consumer_comment, \
         tokens, sentiment, topic \
         FROM review_dashboard.reviews \
         ORDER BY order_date, order_id",
    )
    .fetch_all(pool)
    .await?;

    let mut reviews = Vec::with_capacity(rows.len());
    for row in rows {
        let rating: i16 = row.get("item_rating");
        reviews.push(Review {
            order_id: row.get("order_id"),
            vendor_id: row.get("vendor_id"),
            item_id: row.get("item_id"),
            order_date: row.get("order_date"),
            rating: u8::try_from(rating).context("item_rating out of range")?,
            comment: row.get("consumer_comment"),
            tokens: row.get("tokens"),
            sentiment: row.get("sentiment"),
            topic: row.get("topic"),
        });
    }

    Ok(reviews)
}

pub async fn fetch_topics(pool: &PgPool) -> anyhow::Result<Vec<TopicWords>> {
    let rows = sqlx::query("SELECT topic_id, words FROM review_dashboard.topics ORDER BY topic_id")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| TopicWords {
            topic_id: row.get("topic_id"),
            words: row.get("words"),
        })
        .collect())
}

pub async fn load_store(pool: &PgPool) -> anyhow::Result<ReviewStore> {
    let reviews = fetch_reviews(pool).await?;
    let topics = fetch_topics(pool).await?;
    info!(reviews = reviews.len(), topics = topics.len(), "loaded review store from Postgres");
    Ok(ReviewStore::new(reviews, topics))
}

pub async fn import_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
    topics_path: Option<&std::path::Path>,
) -> anyhow::Result<usize> {
    let reviews = store::read_reviews_csv(csv_path)
        .with_context(|| format!("failed to load reviews from {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for review in &reviews {
        if upsert_review(pool, review).await? {
            inserted += 1;
        }
    }

    if let Some(path) = topics_path {
        let topics = store::read_topics_csv(path)
            .with_context(|| format!("failed to load topics from {}", path.display()))?;
        for topic in &topics {
            upsert_topic(pool, topic).await?;
        }
        info!(topics = topics.len(), "imported topic table");
    }

    Ok(inserted)
}
