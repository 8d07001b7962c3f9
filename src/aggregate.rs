use std::collections::HashMap;

use crate::models::{
    AggregateSnapshot, EmojiCount, EmojiRatings, EmojiTag, FeedbackRecord, Mood, SentimentBucket,
    SentimentBuckets, WordCount,
};

/// Per-record deadband around zero.
pub const BUCKET_THRESHOLD: f64 = 0.1;
/// Deadband for the aggregate mood, wider than the per-record one.
pub const MOOD_THRESHOLD: f64 = 0.2;

const MIN_WORD_LEN: usize = 3;

const STOP_WORDS: &[&str] = &[
    "about", "after", "all", "also", "and", "are", "but", "can", "for", "from", "had", "has",
    "have", "her", "his", "how", "its", "just", "more", "much", "our", "out", "she", "that",
    "the", "their", "them", "then", "there", "they", "this", "too", "very", "was", "were",
    "what", "when", "which", "who", "will", "with", "you", "your",
];

pub fn bucket_for(sentiment: f64) -> SentimentBucket {
    if sentiment > BUCKET_THRESHOLD {
        SentimentBucket::Positive
    } else if sentiment < -BUCKET_THRESHOLD {
        SentimentBucket::Negative
    } else {
        SentimentBucket::Neutral
    }
}

pub fn mood_for(mean_sentiment: f64) -> Mood {
    if mean_sentiment > MOOD_THRESHOLD {
        Mood::Positive
    } else if mean_sentiment < -MOOD_THRESHOLD {
        Mood::Negative
    } else {
        Mood::Neutral
    }
}

/// Derives dashboard statistics from the records in insertion order.
pub fn compute_snapshot(records: &[FeedbackRecord], recent_limit: usize) -> AggregateSnapshot {
    let total = records.len();
    if total == 0 {
        return AggregateSnapshot::default();
    }

    let mut buckets = SentimentBuckets::default();
    let mut rating_histogram = [0usize; 5];
    let mut per_emoji: HashMap<EmojiTag, [usize; 5]> = HashMap::new();
    let mut rating_sum = 0u64;
    let mut sentiment_sum = 0.0;

    for record in records {
        rating_sum += u64::from(record.rating);
        sentiment_sum += record.sentiment;

        match bucket_for(record.sentiment) {
            SentimentBucket::Positive => buckets.positive += 1,
            SentimentBucket::Neutral => buckets.neutral += 1,
            SentimentBucket::Negative => buckets.negative += 1,
        }

        // Ratings are validated on the way in; anything else is ignored here.
        if let Some(slot) = rating_slot(record.rating) {
            rating_histogram[slot] += 1;
            per_emoji.entry(record.emoji).or_insert([0; 5])[slot] += 1;
        }
    }

    let mean_sentiment = sentiment_sum / total as f64;

    let rating_by_emoji: Vec<EmojiRatings> = EmojiTag::ALL
        .into_iter()
        .filter_map(|emoji| {
            per_emoji
                .get(&emoji)
                .map(|histogram| EmojiRatings { emoji, histogram: *histogram })
        })
        .collect();

    let emoji_counts = rating_by_emoji
        .iter()
        .map(|entry| EmojiCount {
            emoji: entry.emoji,
            count: entry.histogram.iter().sum(),
        })
        .collect();

    AggregateSnapshot {
        total,
        mean_rating: rating_sum as f64 / total as f64,
        mean_sentiment,
        buckets,
        emoji_counts,
        rating_histogram,
        rating_by_emoji,
        recent: most_recent(records, recent_limit),
        sentiment_trend: records.iter().map(|record| record.sentiment).collect(),
        mood: mood_for(mean_sentiment),
    }
}

/// Newest first.
pub fn most_recent(records: &[FeedbackRecord], limit: usize) -> Vec<FeedbackRecord> {
    records.iter().rev().take(limit).cloned().collect()
}

/// Word-cloud input: the most frequent meaningful words across all comments.
pub fn word_frequencies(records: &[FeedbackRecord], limit: usize) -> Vec<WordCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for record in records {
        for word in record
            .comment
            .split(|c: char| !c.is_alphabetic())
            .filter(|word| word.chars().count() >= MIN_WORD_LEN)
            .map(str::to_lowercase)
            .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        {
            *counts.entry(word).or_insert(0) += 1;
        }
    }

    let mut words: Vec<WordCount> = counts
        .into_iter()
        .map(|(word, count)| WordCount { word, count })
        .collect();
    words.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    words.truncate(limit);
    words
}

fn rating_slot(rating: u8) -> Option<usize> {
    match rating {
        1..=5 => Some(usize::from(rating - 1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample(index: u32, rating: u8, emoji: EmojiTag, sentiment: f64) -> FeedbackRecord {
        FeedbackRecord {
            timestamp: NaiveDate::from_ymd_opt(2026, 10, 14)
                .unwrap()
                .and_hms_opt(10, index / 60, index % 60)
                .unwrap(),
            name: format!("Attendee {index}"),
            rating,
            emoji,
            comment: String::new(),
            sentiment,
        }
    }

    fn with_comment(comment: &str) -> FeedbackRecord {
        FeedbackRecord {
            comment: comment.to_string(),
            ..sample(0, 3, EmojiTag::Neutral, 0.0)
        }
    }

    #[test]
    fn empty_input_yields_neutral_zero_snapshot() {
        let snapshot = compute_snapshot(&[], 10);
        assert_eq!(snapshot.total, 0);
        assert_eq!(snapshot.mean_rating, 0.0);
        assert_eq!(snapshot.mean_sentiment, 0.0);
        assert_eq!(snapshot.mood, Mood::Neutral);
        assert_eq!(snapshot.rating_histogram, [0; 5]);
        assert!(snapshot.emoji_counts.is_empty());
        assert!(snapshot.recent.is_empty());
        assert!(snapshot.sentiment_trend.is_empty());
    }

    #[test]
    fn deadband_scenario_buckets_and_mood() {
        let records: Vec<_> = [0.5, -0.5, 0.0, 0.05]
            .into_iter()
            .enumerate()
            .map(|(i, s)| sample(i as u32, 3, EmojiTag::Neutral, s))
            .collect();

        let snapshot = compute_snapshot(&records, 10);
        assert_eq!(
            snapshot.buckets,
            SentimentBuckets { positive: 1, neutral: 2, negative: 1 }
        );
        assert!((snapshot.mean_sentiment - 0.0125).abs() < 1e-12);
        assert_eq!(snapshot.mood, Mood::Neutral);
        assert_eq!(snapshot.sentiment_trend, vec![0.5, -0.5, 0.0, 0.05]);
    }

    #[test]
    fn thresholds_are_exclusive() {
        assert_eq!(bucket_for(0.1), SentimentBucket::Neutral);
        assert_eq!(bucket_for(-0.1), SentimentBucket::Neutral);
        assert_eq!(bucket_for(0.11), SentimentBucket::Positive);
        assert_eq!(bucket_for(-0.11), SentimentBucket::Negative);
        assert_eq!(mood_for(0.2), Mood::Neutral);
        assert_eq!(mood_for(0.15), Mood::Neutral);
        assert_eq!(mood_for(0.21), Mood::Positive);
        assert_eq!(mood_for(-0.21), Mood::Negative);
    }

    #[test]
    fn counts_sum_to_total() {
        let emojis = EmojiTag::ALL;
        let records: Vec<_> = (0..37u32)
            .map(|i| {
                let sentiment = (i as f64 / 18.0) - 1.0;
                sample(i, (i % 5 + 1) as u8, emojis[i as usize % 3], sentiment)
            })
            .collect();

        let snapshot = compute_snapshot(&records, 10);
        assert_eq!(snapshot.total, 37);
        assert_eq!(snapshot.buckets.total(), 37);
        assert_eq!(snapshot.rating_histogram.iter().sum::<usize>(), 37);
        assert_eq!(snapshot.emoji_counts.iter().map(|e| e.count).sum::<usize>(), 37);
        let cross: usize = snapshot
            .rating_by_emoji
            .iter()
            .flat_map(|e| e.histogram.iter())
            .sum();
        assert_eq!(cross, 37);
    }

    #[test]
    fn histogram_includes_unseen_ratings() {
        let records = vec![
            sample(0, 5, EmojiTag::Happy, 0.8),
            sample(1, 5, EmojiTag::Happy, 0.6),
            sample(2, 2, EmojiTag::Sad, -0.4),
        ];
        let snapshot = compute_snapshot(&records, 10);
        assert_eq!(snapshot.rating_histogram, [0, 1, 0, 0, 2]);
        assert!((snapshot.mean_rating - 4.0).abs() < 1e-12);
        assert_eq!(snapshot.mood, Mood::Positive);
    }

    #[test]
    fn emoji_counts_follow_tag_order_and_skip_unseen() {
        let records = vec![
            sample(0, 3, EmojiTag::Sad, 0.0),
            sample(1, 4, EmojiTag::Happy, 0.0),
            sample(2, 1, EmojiTag::Sad, 0.0),
        ];
        let snapshot = compute_snapshot(&records, 10);
        assert_eq!(
            snapshot.emoji_counts,
            vec![
                EmojiCount { emoji: EmojiTag::Happy, count: 1 },
                EmojiCount { emoji: EmojiTag::Sad, count: 2 },
            ]
        );
        assert_eq!(snapshot.rating_by_emoji[1].histogram, [1, 0, 1, 0, 0]);
    }

    #[test]
    fn recent_view_returns_last_n_newest_first() {
        let records: Vec<_> = (0..12u32)
            .map(|i| sample(i, 4, EmojiTag::Happy, 0.3))
            .collect();

        let snapshot = compute_snapshot(&records, 10);
        let names: Vec<&str> = snapshot.recent.iter().map(|r| r.name.as_str()).collect();
        let expected: Vec<String> = (2..12).rev().map(|i| format!("Attendee {i}")).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn snapshot_is_repeatable() {
        let records = vec![
            sample(0, 2, EmojiTag::Sad, -0.6),
            sample(1, 3, EmojiTag::Neutral, 0.0),
        ];
        assert_eq!(compute_snapshot(&records, 5), compute_snapshot(&records, 5));
        assert_eq!(compute_snapshot(&records, 5).mood, Mood::Negative);
    }

    #[test]
    fn word_frequencies_drop_stop_words_and_short_tokens() {
        let records = vec![
            with_comment("The demo was great, great pacing"),
            with_comment("Great slides and a clear demo!"),
            with_comment(""),
        ];
        let words = word_frequencies(&records, 3);
        assert_eq!(
            words,
            vec![
                WordCount { word: "great".to_string(), count: 3 },
                WordCount { word: "demo".to_string(), count: 2 },
                WordCount { word: "clear".to_string(), count: 1 },
            ]
        );
    }
}
