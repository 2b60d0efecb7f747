//! Behavior profiling — rolling per-agent statistics and anomaly scoring.
//!
//! A score is only produced once five messages have been observed. It is
//! the unweighted mean of whichever sub-scores have enough samples:
//!
//! | signal          | needs           | score                                            |
//! |-----------------|-----------------|--------------------------------------------------|
//! | length          | 5 lengths       | `min(|len - mean| / stdev / 3, 1)`               |
//! | special chars   | 5 ratios        | `> 2x mean` 0.8, `> 1.5x mean` 0.5, else 0.1     |
//! | uppercase       | 5 ratios        | `> 0.5` 0.9, `> 2x mean` 0.6, else 0.1           |
//! | interval        | 5 intervals     | `< 0.2x mean` 0.7, else 0.1                      |
//! | repetition      | 1 token         | top token share `> 0.3` 0.8, else 0.1            |

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

const SAMPLE_CAPACITY: usize = 50;
const SCORE_CAPACITY: usize = 20;
const MIN_SAMPLES: usize = 5;
const KEYWORD_CAP: usize = 512;

/// Fixed-capacity ring buffer. Pushing into a full window evicts the oldest.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a value, returning the evicted one if the window was full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(value);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl RollingWindow<f64> {
    pub fn mean(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        self.items.iter().sum::<f64>() / self.items.len() as f64
    }

    /// Sample standard deviation (n - 1). Zero with fewer than two samples.
    pub fn sample_stdev(&self) -> f64 {
        let n = self.items.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let var = self.items.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    }
}

/// Token counts across all observed messages.
///
/// When the number of distinct tokens passes the cap, every count is halved
/// and tokens that reach zero are dropped.
#[derive(Debug, Clone, Default)]
pub struct KeywordCounter {
    counts: HashMap<String, u32>,
}

impl KeywordCounter {
    pub fn feed<I: IntoIterator<Item = String>>(&mut self, tokens: I) {
        for token in tokens {
            *self.counts.entry(token).or_insert(0) += 1;
        }
        if self.counts.len() > KEYWORD_CAP {
            self.counts.retain(|_, n| {
                *n /= 2;
                *n > 0
            });
        }
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn count(&self, token: &str) -> u32 {
        self.counts.get(token).copied().unwrap_or(0)
    }

    /// The `n` most frequent tokens, ties broken alphabetically.
    pub fn top(&self, n: usize) -> Vec<(String, u32)> {
        let mut all: Vec<(String, u32)> = self.counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
        all.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        all.truncate(n);
        all
    }
}

/// Rolling statistics for one conversation.
#[derive(Debug, Clone)]
pub struct BehaviorProfile {
    pub lengths: RollingWindow<f64>,
    pub special_ratios: RollingWindow<f64>,
    pub uppercase_ratios: RollingWindow<f64>,
    /// Seconds between consecutive messages.
    pub intervals: RollingWindow<f64>,
    pub keywords: KeywordCounter,
    pub scores: RollingWindow<f64>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub total_messages: u64,
}

impl Default for BehaviorProfile {
    fn default() -> Self {
        Self {
            lengths: RollingWindow::new(SAMPLE_CAPACITY),
            special_ratios: RollingWindow::new(SAMPLE_CAPACITY),
            uppercase_ratios: RollingWindow::new(SAMPLE_CAPACITY),
            intervals: RollingWindow::new(SAMPLE_CAPACITY),
            keywords: KeywordCounter::default(),
            scores: RollingWindow::new(SCORE_CAPACITY),
            last_message_at: None,
            total_messages: 0,
        }
    }
}

impl BehaviorProfile {
    pub fn last_score(&self) -> Option<f64> {
        self.scores.last().copied()
    }
}

/// Per-message features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MessageFeatures {
    pub length: f64,
    pub special_ratio: f64,
    pub uppercase_ratio: f64,
}

impl MessageFeatures {
    pub fn of(text: &str) -> Self {
        let mut length = 0usize;
        let mut special = 0usize;
        let mut upper = 0usize;
        for c in text.chars() {
            length += 1;
            if !c.is_alphanumeric() && !c.is_whitespace() {
                special += 1;
            }
            if c.is_uppercase() {
                upper += 1;
            }
        }
        if length == 0 {
            return Self {
                length: 0.0,
                special_ratio: 0.0,
                uppercase_ratio: 0.0,
            };
        }
        Self {
            length: length as f64,
            special_ratio: special as f64 / length as f64,
            uppercase_ratio: upper as f64 / length as f64,
        }
    }
}

/// Maximal runs of alphanumeric or `_` characters, lowercased.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Stateless scorer over a [`BehaviorProfile`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BehaviorProfiler;

impl BehaviorProfiler {
    /// Anomaly score in `[0, 1]` for `text` against the profile as it stands.
    /// A computed score is recorded in the profile's score history.
    pub fn score(&self, text: &str, profile: &mut BehaviorProfile, now: DateTime<Utc>) -> f64 {
        if profile.total_messages < MIN_SAMPLES as u64 {
            return 0.0;
        }

        let features = MessageFeatures::of(text);
        let mut parts: Vec<f64> = Vec::with_capacity(5);

        if profile.lengths.len() >= MIN_SAMPLES {
            let mean = profile.lengths.mean();
            let stdev = profile.lengths.sample_stdev();
            let z = if stdev > 0.0 {
                (features.length - mean).abs() / stdev
            } else {
                0.0
            };
            parts.push((z / 3.0).min(1.0));
        }

        if profile.special_ratios.len() >= MIN_SAMPLES {
            let mean = profile.special_ratios.mean();
            parts.push(if features.special_ratio > mean * 2.0 {
                0.8
            } else if features.special_ratio > mean * 1.5 {
                0.5
            } else {
                0.1
            });
        }

        if profile.uppercase_ratios.len() >= MIN_SAMPLES {
            let mean = profile.uppercase_ratios.mean();
            parts.push(if features.uppercase_ratio > 0.5 {
                0.9
            } else if features.uppercase_ratio > mean * 2.0 {
                0.6
            } else {
                0.1
            });
        }

        if profile.intervals.len() >= MIN_SAMPLES {
            if let Some(last) = profile.last_message_at {
                let mean = profile.intervals.mean();
                let current = seconds_between(last, now);
                parts.push(if current < mean * 0.2 { 0.7 } else { 0.1 });
            }
        }

        let tokens = tokenize(text);
        if !tokens.is_empty() {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for t in &tokens {
                *counts.entry(t.as_str()).or_insert(0) += 1;
            }
            let top = counts.values().copied().max().unwrap_or(0);
            let share = top as f64 / tokens.len() as f64;
            parts.push(if share > 0.3 { 0.8 } else { 0.1 });
        }

        if parts.is_empty() {
            return 0.0;
        }
        let score = parts.iter().sum::<f64>() / parts.len() as f64;
        profile.scores.push(score);
        score
    }

    /// Fold `text` into the profile. Runs after [`score`](Self::score) for
    /// every admitted message.
    pub fn update(&self, text: &str, profile: &mut BehaviorProfile, now: DateTime<Utc>) {
        let features = MessageFeatures::of(text);
        profile.lengths.push(features.length);
        profile.special_ratios.push(features.special_ratio);
        profile.uppercase_ratios.push(features.uppercase_ratio);

        if let Some(last) = profile.last_message_at {
            profile.intervals.push(seconds_between(last, now));
        }
        profile.last_message_at = Some(now);
        profile.total_messages += 1;
        profile.keywords.feed(tokenize(text));
    }
}

fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    const BASELINE: [&str; 5] = [
        "hi there",
        "what are your hours today",
        "can you help me track my order please",
        "i would like to know about the return policy for shoes",
        "thanks that answers my question about shipping times and costs",
    ];

    fn warmed_profile() -> (BehaviorProfile, DateTime<Utc>) {
        let profiler = BehaviorProfiler;
        let mut profile = BehaviorProfile::default();
        let mut now = t0();
        for text in BASELINE {
            assert_eq!(profiler.score(text, &mut profile, now), 0.0);
            profiler.update(text, &mut profile, now);
            now += Duration::seconds(30);
        }
        (profile, now)
    }

    #[test]
    fn ring_buffer_evicts_oldest() {
        let mut window = RollingWindow::new(3);
        assert_eq!(window.push(1), None);
        assert_eq!(window.push(2), None);
        assert_eq!(window.push(3), None);
        assert_eq!(window.push(4), Some(1));
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(window.len(), window.capacity());
    }

    #[test]
    fn sample_stdev_matches_hand_computation() {
        let mut window = RollingWindow::new(10);
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            window.push(x);
        }
        assert!((window.mean() - 5.0).abs() < 1e-9);
        // Population stdev is 2.0; sample stdev is sqrt(32/7).
        assert!((window.sample_stdev() - (32.0f64 / 7.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn no_score_before_five_messages() {
        let profiler = BehaviorProfiler;
        let mut profile = BehaviorProfile::default();
        for i in 0..4 {
            let text = "AAAAAAAAAAAAAAAAAAAA!!!!!!!!";
            assert_eq!(profiler.score(text, &mut profile, t0() + Duration::seconds(i)), 0.0);
            profiler.update(text, &mut profile, t0() + Duration::seconds(i));
        }
        assert!(profile.scores.is_empty());
        assert_eq!(profile.total_messages, 4);
    }

    #[test]
    fn shouting_repetition_after_baseline_is_anomalous() {
        let (mut profile, now) = warmed_profile();
        let attack = "HACKED! ".repeat(63);
        assert!(attack.chars().count() >= 500);

        let score = BehaviorProfiler.score(&attack, &mut profile, now);
        assert!(score > 0.7, "score was {score}");
        assert_eq!(profile.last_score(), Some(score));
    }

    #[test]
    fn ordinary_message_after_baseline_is_calm() {
        let (mut profile, now) = warmed_profile();
        let score = BehaviorProfiler.score("could you check on my refund status", &mut profile, now);
        assert!(score < 0.5, "score was {score}");
    }

    #[test]
    fn update_tracks_intervals_and_counts() {
        let (profile, _) = warmed_profile();
        assert_eq!(profile.total_messages, 5);
        assert_eq!(profile.lengths.len(), 5);
        // First message has no predecessor.
        assert_eq!(profile.intervals.len(), 4);
        assert!((profile.intervals.mean() - 30.0).abs() < 1e-9);
        assert_eq!(profile.keywords.count("my"), 2);
    }

    #[test]
    fn rapid_fire_scores_interval_signal() {
        let profiler = BehaviorProfiler;
        let mut profile = BehaviorProfile::default();
        let mut now = t0();
        for text in BASELINE.iter().chain(BASELINE.iter().take(1)) {
            profiler.update(text, &mut profile, now);
            now += Duration::seconds(60);
        }
        // Six messages, five intervals of 60s. One second later is rapid.
        let last = profile.last_message_at.unwrap();
        let calm = profiler.score("what are your hours today", &mut profile.clone(), last + Duration::seconds(60));
        let rapid = profiler.score("what are your hours today", &mut profile, last + Duration::seconds(1));
        assert!(rapid > calm);
    }

    #[test]
    fn tokenizer_splits_on_non_word_chars() {
        assert_eq!(tokenize("Hello, WORLD! snake_case 42x"), vec!["hello", "world", "snake_case", "42x"]);
        assert!(tokenize("?!...").is_empty());
    }

    #[test]
    fn keyword_counter_decays_past_cap() {
        let mut counter = KeywordCounter::default();
        counter.feed(vec!["refund".to_string(); 4]);
        counter.feed((0..KEYWORD_CAP).map(|i| format!("w{i}")));
        assert!(counter.distinct() <= KEYWORD_CAP);
        assert_eq!(counter.count("refund"), 2);
        assert_eq!(counter.count("w0"), 0);
        assert_eq!(counter.top(1), vec![("refund".to_string(), 2)]);
    }

    #[test]
    fn features_count_chars_not_bytes() {
        let f = MessageFeatures::of("Café!");
        assert_eq!(f.length, 5.0);
        assert!((f.special_ratio - 0.2).abs() < 1e-9);
        assert!((f.uppercase_ratio - 0.2).abs() < 1e-9);
        assert_eq!(MessageFeatures::of("").length, 0.0);
    }
}
