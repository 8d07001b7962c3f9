use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::FeedbackError;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// One stored submission. Field order is the persisted column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub timestamp: NaiveDateTime,
    pub name: String,
    pub rating: u8,
    pub emoji: EmojiTag,
    pub comment: String,
    pub sentiment: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EmojiTag {
    Happy,
    Neutral,
    Sad,
}

impl EmojiTag {
    pub const ALL: [EmojiTag; 3] = [EmojiTag::Happy, EmojiTag::Neutral, EmojiTag::Sad];

    pub fn label(self) -> &'static str {
        match self {
            EmojiTag::Happy => "😊 Happy",
            EmojiTag::Neutral => "😐 Neutral",
            EmojiTag::Sad => "😞 Sad",
        }
    }

    fn name(self) -> &'static str {
        match self {
            EmojiTag::Happy => "happy",
            EmojiTag::Neutral => "neutral",
            EmojiTag::Sad => "sad",
        }
    }
}

impl fmt::Display for EmojiTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EmojiTag {
    type Err = FeedbackError;

    /// Accepts the stored label (`"😊 Happy"`) or the bare tag name (`"happy"`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        EmojiTag::ALL
            .into_iter()
            .find(|tag| value == tag.label() || value.eq_ignore_ascii_case(tag.name()))
            .ok_or_else(|| {
                FeedbackError::validation(format!(
                    "unrecognized mood tag '{value}' (expected happy, neutral or sad)"
                ))
            })
    }
}

impl TryFrom<String> for EmojiTag {
    type Error = FeedbackError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EmojiTag> for String {
    fn from(tag: EmojiTag) -> Self {
        tag.label().to_string()
    }
}

/// Per-record sentiment class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentBucket {
    Positive,
    Neutral,
    Negative,
}

/// Overall audience mood, derived from the mean sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Mood {
    pub fn label(self) -> &'static str {
        match self {
            Mood::Positive => "😊 Positive",
            Mood::Neutral => "😐 Neutral",
            Mood::Negative => "😞 Negative",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SentimentBuckets {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentBuckets {
    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmojiCount {
    pub emoji: EmojiTag,
    pub count: usize,
}

/// Rating histogram restricted to one mood tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmojiRatings {
    pub emoji: EmojiTag,
    pub histogram: [usize; 5],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// Everything the dashboard shows, derived fresh from the full record list.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AggregateSnapshot {
    pub total: usize,
    pub mean_rating: f64,
    pub mean_sentiment: f64,
    pub buckets: SentimentBuckets,
    pub emoji_counts: Vec<EmojiCount>,
    /// Index 0 holds rating 1.
    pub rating_histogram: [usize; 5],
    pub rating_by_emoji: Vec<EmojiRatings>,
    /// Newest first.
    pub recent: Vec<FeedbackRecord>,
    /// Per-record sentiment in insertion order.
    pub sentiment_trend: Vec<f64>,
    pub mood: Mood,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Student {
    pub regno: String,
    pub name: String,
    pub department: String,
    pub year: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emoji_parses_label_and_bare_name() {
        assert_eq!("😊 Happy".parse::<EmojiTag>().unwrap(), EmojiTag::Happy);
        assert_eq!(" NEUTRAL ".parse::<EmojiTag>().unwrap(), EmojiTag::Neutral);
        assert_eq!("sad".parse::<EmojiTag>().unwrap(), EmojiTag::Sad);
    }

    #[test]
    fn unknown_emoji_is_a_validation_error() {
        let err = "ecstatic".parse::<EmojiTag>().unwrap_err();
        assert!(matches!(err, FeedbackError::Validation(_)));
    }

    #[test]
    fn emoji_serializes_as_label() {
        let json = serde_json::to_string(&EmojiTag::Sad).unwrap();
        assert_eq!(json, "\"😞 Sad\"");
    }
}
