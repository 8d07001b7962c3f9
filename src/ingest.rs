use chrono::{Local, NaiveDateTime, Timelike};
use tracing::{debug, warn};

use crate::error::FeedbackError;
use crate::models::{EmojiTag, FeedbackRecord, MAX_RATING, MIN_RATING};
use crate::sentiment::SentimentScorer;
use crate::store::RecordStore;

pub const MAX_COMMENT_CHARS: usize = 250;
pub const ANONYMOUS: &str = "Anonymous";

/// Raw form input, before validation.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub name: String,
    pub rating: i64,
    pub emoji: String,
    pub comment: String,
}

/// Validates, scores and stores one submission.
///
/// The submission is only borrowed, so after a failure the caller still holds
/// everything the user typed.
pub fn submit(
    store: &impl RecordStore,
    scorer: &impl SentimentScorer,
    submission: &Submission,
) -> Result<FeedbackRecord, FeedbackError> {
    let record = build_record(scorer, submission, now_to_the_second())?;
    store.append(&record)?;
    Ok(record)
}

fn build_record(
    scorer: &impl SentimentScorer,
    submission: &Submission,
    timestamp: NaiveDateTime,
) -> Result<FeedbackRecord, FeedbackError> {
    let rating = validate_rating(submission.rating)?;
    let emoji: EmojiTag = submission.emoji.parse()?;
    let comment = truncate_comment(&submission.comment);

    let name = match submission.name.trim() {
        "" => ANONYMOUS.to_string(),
        name => name.to_string(),
    };

    Ok(FeedbackRecord {
        timestamp,
        name,
        rating,
        emoji,
        sentiment: score_comment(scorer, &comment),
        comment,
    })
}

fn validate_rating(rating: i64) -> Result<u8, FeedbackError> {
    u8::try_from(rating)
        .ok()
        .filter(|value| (MIN_RATING..=MAX_RATING).contains(value))
        .ok_or_else(|| {
            FeedbackError::validation(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
            ))
        })
}

fn truncate_comment(comment: &str) -> String {
    match comment.char_indices().nth(MAX_COMMENT_CHARS) {
        Some((cut, _)) => {
            debug!(chars = comment.chars().count(), "truncating long comment");
            comment[..cut].to_string()
        }
        None => comment.to_string(),
    }
}

/// Scorer failures never block a submission; they count as neutral.
fn score_comment(scorer: &impl SentimentScorer, comment: &str) -> f64 {
    if comment.trim().is_empty() {
        return 0.0;
    }

    match scorer.score(comment) {
        Ok(value) if value.is_finite() => value.clamp(-1.0, 1.0),
        Ok(value) => {
            warn!(value, "scorer returned a non-finite polarity, using neutral");
            0.0
        }
        Err(err) => {
            warn!(error = %err, "sentiment scoring failed, using neutral");
            0.0
        }
    }
}

fn now_to_the_second() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct MemoryStore {
        records: RefCell<Vec<FeedbackRecord>>,
        read_only: Cell<bool>,
    }

    impl RecordStore for MemoryStore {
        fn append(&self, record: &FeedbackRecord) -> Result<(), FeedbackError> {
            if self.read_only.get() {
                return Err(FeedbackError::write(
                    "memory",
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                ));
            }
            self.records.borrow_mut().push(record.clone());
            Ok(())
        }

        fn read_all(&self) -> Result<Vec<FeedbackRecord>, FeedbackError> {
            Ok(self.records.borrow().clone())
        }
    }

    fn fixed(value: f64) -> impl Fn(&str) -> anyhow::Result<f64> {
        move |_: &str| Ok(value)
    }

    fn submission(rating: i64) -> Submission {
        Submission {
            name: "Priya".to_string(),
            rating,
            emoji: "happy".to_string(),
            comment: "Loved the demo".to_string(),
        }
    }

    #[test]
    fn valid_submission_is_stored_and_returned() {
        let store = MemoryStore::default();
        for rating in 1..=5 {
            let record = submit(&store, &fixed(0.4), &submission(rating)).unwrap();
            assert_eq!(i64::from(record.rating), rating);
            assert_eq!(record.emoji, EmojiTag::Happy);
            assert_eq!(record.sentiment, 0.4);
            assert_eq!(record.timestamp.nanosecond(), 0);
        }
        assert_eq!(store.read_all().unwrap().len(), 5);
    }

    #[test]
    fn out_of_range_rating_is_rejected_without_append() {
        let store = MemoryStore::default();
        for rating in [0, 6, -1, 256, i64::MAX] {
            let err = submit(&store, &fixed(0.0), &submission(rating)).unwrap_err();
            assert!(matches!(err, FeedbackError::Validation(_)));
        }
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn unknown_emoji_is_rejected_without_append() {
        let store = MemoryStore::default();
        let input = Submission {
            emoji: "🤖 Robot".to_string(),
            ..submission(3)
        };
        let err = submit(&store, &fixed(0.0), &input).unwrap_err();
        assert!(matches!(err, FeedbackError::Validation(_)));
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn blank_name_becomes_anonymous() {
        let store = MemoryStore::default();
        let input = Submission {
            name: "   ".to_string(),
            ..submission(4)
        };
        let record = submit(&store, &fixed(0.0), &input).unwrap();
        assert_eq!(record.name, ANONYMOUS);
    }

    #[test]
    fn long_comment_is_truncated_by_characters() {
        let store = MemoryStore::default();
        let input = Submission {
            comment: "é".repeat(300),
            ..submission(4)
        };
        let record = submit(&store, &fixed(0.0), &input).unwrap();
        assert_eq!(record.comment.chars().count(), MAX_COMMENT_CHARS);
    }

    #[test]
    fn empty_comment_skips_the_scorer() {
        let store = MemoryStore::default();
        let called = Cell::new(false);
        let scorer = |_: &str| -> anyhow::Result<f64> {
            called.set(true);
            Ok(0.9)
        };
        let input = Submission {
            comment: String::new(),
            ..submission(2)
        };
        let record = submit(&store, &scorer, &input).unwrap();
        assert_eq!(record.sentiment, 0.0);
        assert!(!called.get());
    }

    #[test]
    fn scorer_failure_defaults_to_neutral() {
        let store = MemoryStore::default();
        let failing = |_: &str| -> anyhow::Result<f64> { anyhow::bail!("model unavailable") };
        let record = submit(&store, &failing, &submission(5)).unwrap();
        assert_eq!(record.sentiment, 0.0);
        assert_eq!(store.read_all().unwrap().len(), 1);
    }

    #[test]
    fn scorer_output_is_kept_in_range() {
        let store = MemoryStore::default();
        assert_eq!(submit(&store, &fixed(3.0), &submission(5)).unwrap().sentiment, 1.0);
        assert_eq!(submit(&store, &fixed(-7.0), &submission(5)).unwrap().sentiment, -1.0);
        assert_eq!(submit(&store, &fixed(f64::NAN), &submission(5)).unwrap().sentiment, 0.0);
    }

    #[test]
    fn write_failure_surfaces_and_keeps_prior_records() {
        let store = MemoryStore::default();
        submit(&store, &fixed(0.5), &submission(4)).unwrap();
        store.read_only.set(true);

        let input = submission(3);
        let err = submit(&store, &fixed(0.5), &input).unwrap_err();
        assert!(matches!(err, FeedbackError::StoreWrite { .. }));
        assert_eq!(input.comment, "Loved the demo");

        let records = store.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rating, 4);
    }

    #[test]
    fn submissions_reach_a_csv_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = crate::store::CsvFeedbackStore::open(dir.path().join("feedback.csv")).unwrap();
        let record = submit(&store, &crate::sentiment::LexiconScorer, &submission(5)).unwrap();

        assert!(record.sentiment > 0.1);
        assert_eq!(store.read_all().unwrap(), vec![record]);
    }

    #[test]
    fn read_only_csv_store_rejects_submit_and_keeps_history() {
        use crate::store::CsvFeedbackStore;
        use std::fs::{self, OpenOptions};

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("feedback.csv");
        let store = CsvFeedbackStore::open(&path).unwrap();
        let first = submit(&store, &fixed(0.5), &submission(4)).unwrap();
        let second = submit(&store, &fixed(-0.2), &submission(2)).unwrap();

        let mut permissions = fs::metadata(&path).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&path, permissions).unwrap();
        if OpenOptions::new().append(true).open(&path).is_ok() {
            // Privileged users ignore file permissions.
            return;
        }

        let input = submission(3);
        let err = submit(&store, &fixed(0.5), &input).unwrap_err();
        assert!(matches!(err, FeedbackError::StoreWrite { .. }));
        assert_eq!(input.comment, "Loved the demo");

        let fresh = CsvFeedbackStore::open(&path).unwrap();
        assert_eq!(fresh.read_all().unwrap(), vec![first, second]);
    }
}
