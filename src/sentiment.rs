/// Maps comment text to a polarity in `[-1.0, 1.0]`.
pub trait SentimentScorer {
    fn score(&self, text: &str) -> anyhow::Result<f64>;
}

impl<F> SentimentScorer for F
where
    F: Fn(&str) -> anyhow::Result<f64>,
{
    fn score(&self, text: &str) -> anyhow::Result<f64> {
        self(text)
    }
}

const POLARITY: &[(&str, f64)] = &[
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("bad", -0.7),
    ("best", 1.0),
    ("boring", -1.0),
    ("brilliant", 0.9),
    ("clear", 0.1),
    ("confusing", -0.4),
    ("difficult", -0.5),
    ("disappointing", -0.6),
    ("dull", -0.5),
    ("easy", 0.4),
    ("engaging", 0.5),
    ("enjoyed", 0.5),
    ("excellent", 1.0),
    ("fantastic", 0.4),
    ("fun", 0.3),
    ("good", 0.7),
    ("great", 0.8),
    ("happy", 0.8),
    ("hard", -0.3),
    ("helpful", 0.5),
    ("horrible", -1.0),
    ("informative", 0.5),
    ("interesting", 0.5),
    ("like", 0.2),
    ("love", 0.5),
    ("loved", 0.7),
    ("nice", 0.6),
    ("ok", 0.1),
    ("okay", 0.1),
    ("perfect", 1.0),
    ("poor", -0.4),
    ("sad", -0.5),
    ("slow", -0.3),
    ("terrible", -1.0),
    ("useful", 0.3),
    ("useless", -0.5),
    ("waste", -0.6),
    ("wonderful", 1.0),
    ("worst", -1.0),
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("extremely", 1.5),
    ("quite", 1.1),
    ("really", 1.3),
    ("so", 1.3),
    ("super", 1.4),
    ("very", 1.3),
];

const NEGATORS: &[&str] = &[
    "arent", "cant", "didnt", "doesnt", "dont", "hardly", "isnt", "never", "no", "not", "wasnt",
    "wont",
];

const NEGATION_FACTOR: f64 = -0.5;

/// Word-list polarity scorer used when no external analyzer is wired in.
///
/// Each polarity word contributes its score, scaled by a directly preceding
/// intensifier and flipped and damped by a preceding negator. The result is
/// the mean over contributing words, clamped to `[-1.0, 1.0]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconScorer;

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> anyhow::Result<f64> {
        let tokens: Vec<String> = text
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|token| !token.is_empty())
            .map(|token| token.to_lowercase().replace('\'', ""))
            .collect();

        let mut total = 0.0;
        let mut matched = 0usize;

        for (index, token) in tokens.iter().enumerate() {
            let Some(polarity) = lookup(POLARITY, token) else {
                continue;
            };

            let mut value = polarity;
            let mut cursor = index;
            if let Some(factor) = cursor
                .checked_sub(1)
                .and_then(|prev| lookup(INTENSIFIERS, &tokens[prev]))
            {
                value *= factor;
                cursor -= 1;
            }
            if let Some(prev) = cursor.checked_sub(1) {
                let word = tokens[prev].as_str();
                if NEGATORS.contains(&word) {
                    value *= NEGATION_FACTOR;
                }
            }

            total += value;
            matched += 1;
        }

        if matched == 0 {
            return Ok(0.0);
        }
        Ok((total / matched as f64).clamp(-1.0, 1.0))
    }
}

fn lookup(table: &[(&str, f64)], word: &str) -> Option<f64> {
    table
        .binary_search_by(|(entry, _)| (*entry).cmp(word))
        .ok()
        .map(|index| table[index].1)
}
