use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Progress document: topic name to performance statistics.
///
/// Ordered by topic name, which makes iteration (and every tie-break derived from
/// it) deterministic.
pub type ProgressDocument = BTreeMap<String, TopicPerformanceRecord>;

/// Schedule document: topic name to spaced repetition state.
pub type ScheduleDocument = BTreeMap<String, ReviewScheduleRecord>;

/// Maximum length of a student identifier (it names files on disk).
const MAX_STUDENT_ID_LEN: usize = 64;

/// Student identifier, restricted to `[A-Za-z0-9_-]{1,64}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        if raw.is_empty() || raw.len() > MAX_STUDENT_ID_LEN {
            return Err(StoreError::InvalidArgument(format!(
                "student id must be 1 to {MAX_STUDENT_ID_LEN} characters long"
            )));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(StoreError::InvalidArgument(format!(
                "student id '{raw}' may only contain letters, digits, '_' and '-'"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-topic quiz statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicPerformanceRecord {
    /// Number of quizzes taken on this topic
    pub attempts: u32,
    /// Most recent score, percentage in [0, 100]
    pub last_score: f64,
    /// Best score so far, percentage in [0, 100]
    pub best_score: f64,
    /// Cumulative number of questions answered
    #[serde(alias = "total_answered")]
    pub total_questions_answered: u64,
    /// Free text, last non-empty write wins
    #[serde(default)]
    pub notes: String,
    /// The `last_score` before the most recent quiz, used for the trend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_score: Option<f64>,
    /// When this record was last changed
    #[serde(with = "timestamp")]
    pub last_updated: DateTime<Utc>,
}

impl TopicPerformanceRecord {
    /// Zero-initialized record, as created on a topic's first quiz.
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            attempts: 0,
            last_score: 0.0,
            best_score: 0.0,
            total_questions_answered: 0,
            notes: String::new(),
            previous_score: None,
            last_updated: now,
        }
    }

    /// Check the invariants a loaded record must satisfy.
    pub fn validate(&self) -> Result<(), String> {
        for (name, score) in [("last_score", self.last_score), ("best_score", self.best_score)]
            .into_iter()
            .chain(self.previous_score.map(|s| ("previous_score", s)))
        {
            if !is_percentage(score) {
                return Err(format!("{name} must be within [0, 100], got {score}"));
            }
        }
        if self.attempts > 0 && self.best_score < self.last_score {
            return Err(format!(
                "best_score {} is below last_score {}",
                self.best_score, self.last_score
            ));
        }
        Ok(())
    }
}

/// One review outcome in a topic's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceEntry {
    #[serde(with = "timestamp")]
    pub date: DateTime<Utc>,
    /// Normalized score in [0, 1]
    pub score: f64,
}

/// Spaced repetition state for one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewScheduleRecord {
    /// Completed review cycles
    pub repetition_number: u32,
    #[serde(with = "timestamp")]
    pub last_review: DateTime<Utc>,
    /// Absent until the first advancement
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::option"
    )]
    pub next_review: Option<DateTime<Utc>>,
    /// Append-only, in insertion order
    #[serde(default)]
    pub performance_history: Vec<PerformanceEntry>,
}

impl ReviewScheduleRecord {
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            repetition_number: 0,
            last_review: now,
            next_review: None,
            performance_history: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(entry) = self
            .performance_history
            .iter()
            .find(|entry| !(0.0..=1.0).contains(&entry.score))
        {
            return Err(format!(
                "performance history score must be within [0, 1], got {}",
                entry.score
            ));
        }
        Ok(())
    }
}

fn is_percentage(score: f64) -> bool {
    (0.0..=100.0).contains(&score)
}

/// A quiz outcome reported by the content provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub topic: String,
    /// Percentage in [0, 100]
    pub score: f64,
    pub total_questions: u32,
    #[serde(default)]
    pub notes: String,
}

/// Direction of a topic's score compared with the previous quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    FirstAttempt,
    Improving,
    Declining,
    Stable,
}

impl Trend {
    pub fn between(previous: Option<f64>, current: f64) -> Self {
        match previous {
            None => Self::FirstAttempt,
            Some(previous) if current > previous => Self::Improving,
            Some(previous) if current < previous => Self::Declining,
            Some(_) => Self::Stable,
        }
    }
}

/// Next step suggested after a single quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Score of 90 or more: move on or try harder questions
    Mastered,
    /// Score of 70 or more: review weak areas and retry soon
    GoodProgress,
    /// Score of 50 or more after three or more attempts: go back to basics
    RevisitFundamentals,
    /// Score of 50 or more: focus on the missed concepts
    KeepPracticing,
    /// Below 50: study the material again before the next quiz
    Restudy,
}

impl Recommendation {
    pub fn for_result(score: f64, attempts: u32) -> Self {
        if score >= 90.0 {
            Self::Mastered
        } else if score >= 70.0 {
            Self::GoodProgress
        } else if score >= 50.0 {
            if attempts >= 3 {
                Self::RevisitFundamentals
            } else {
                Self::KeepPracticing
            }
        } else {
            Self::Restudy
        }
    }
}

/// Study advice derived from the whole progress document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverallRecommendation {
    /// Average of 80 or more: keep up regular reviews
    Maintain,
    /// Average of 60 or more with weak topics: work on these first
    PrioritizeWeaknesses { topics: Vec<String> },
    /// Average of 60 or more and no weak topic
    IncreaseDifficulty,
    /// Average below 60
    BuildFundamentals,
}

impl OverallRecommendation {
    pub fn for_summary(average_score: f64, weaknesses: &[String]) -> Self {
        if average_score >= 80.0 {
            Self::Maintain
        } else if average_score >= 60.0 {
            if weaknesses.is_empty() {
                Self::IncreaseDifficulty
            } else {
                Self::PrioritizeWeaknesses {
                    topics: weaknesses.iter().take(2).cloned().collect(),
                }
            }
        } else {
            Self::BuildFundamentals
        }
    }
}

/// Result of recording a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOutcome {
    pub topic: String,
    pub topic_stats: TopicPerformanceRecord,
    pub trend: Trend,
    pub recommendation: Recommendation,
}

/// Result of advancing a topic's review schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleUpdate {
    pub topic: String,
    #[serde(with = "timestamp")]
    pub next_review: DateTime<Utc>,
    /// Whole days from now, floored
    pub days_until_review: i64,
    pub repetition_number: u32,
}

/// One line of the review schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub topic: String,
    #[serde(with = "timestamp")]
    pub next_review: DateTime<Utc>,
    pub days_until: i64,
    pub times_reviewed: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overdue_days: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSchedule {
    /// Most overdue first
    pub due_reviews: Vec<ReviewEntry>,
    /// Soonest first, at most five
    pub upcoming_reviews: Vec<ReviewEntry>,
    pub total_due: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub topics_studied: usize,
    pub total_attempts: u64,
    pub total_questions_answered: u64,
    /// Mean of the latest scores, one decimal
    pub average_score: f64,
    /// Up to three best topics scoring 70 or more
    pub strengths: Vec<String>,
    /// The bottom three topics scoring below 70, best first
    pub weaknesses: Vec<String>,
    /// Absent when nothing has been recorded yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<OverallRecommendation>,
}

/// ISO-8601 timestamps.
///
/// Written as RFC 3339 in UTC. Naive timestamps without an offset, as found in
/// older documents, are read as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(ts) => Ok(ts.with_timezone(&Utc)),
            Err(_) => NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT).map(|ts| ts.and_utc()),
        }
    }

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(|e| de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer, de};

        pub fn serialize<S>(ts: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match ts {
                Some(ts) => super::serialize(ts, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| {
                    super::parse(&raw)
                        .map_err(|e| de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
                })
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_student_id_validation() {
        assert!(StudentId::parse("alice").is_ok());
        assert!(StudentId::parse("demo_user-2").is_ok());
        assert!(StudentId::parse("").is_err());
        assert!(StudentId::parse("../etc").is_err());
        assert!(StudentId::parse("with space").is_err());
        assert!(StudentId::parse(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_trend() {
        assert_eq!(Trend::between(None, 50.0), Trend::FirstAttempt);
        assert_eq!(Trend::between(Some(60.0), 85.0), Trend::Improving);
        assert_eq!(Trend::between(Some(85.0), 60.0), Trend::Declining);
        assert_eq!(Trend::between(Some(70.0), 70.0), Trend::Stable);
    }

    #[test]
    fn test_recommendation_thresholds() {
        assert_eq!(Recommendation::for_result(95.0, 1), Recommendation::Mastered);
        assert_eq!(Recommendation::for_result(90.0, 1), Recommendation::Mastered);
        assert_eq!(Recommendation::for_result(75.0, 1), Recommendation::GoodProgress);
        assert_eq!(Recommendation::for_result(55.0, 2), Recommendation::KeepPracticing);
        assert_eq!(
            Recommendation::for_result(55.0, 3),
            Recommendation::RevisitFundamentals
        );
        assert_eq!(Recommendation::for_result(20.0, 5), Recommendation::Restudy);
    }

    #[test]
    fn test_overall_recommendation() {
        let weak = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert_eq!(
            OverallRecommendation::for_summary(85.0, &weak),
            OverallRecommendation::Maintain
        );
        assert_eq!(
            OverallRecommendation::for_summary(65.0, &weak),
            OverallRecommendation::PrioritizeWeaknesses {
                topics: vec!["A".to_string(), "B".to_string()]
            }
        );
        assert_eq!(
            OverallRecommendation::for_summary(65.0, &[]),
            OverallRecommendation::IncreaseDifficulty
        );
        assert_eq!(
            OverallRecommendation::for_summary(40.0, &weak),
            OverallRecommendation::BuildFundamentals
        );
    }

    #[test]
    fn test_timestamp_accepts_naive_and_offset_forms() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(timestamp::parse("2025-01-15T10:30:00").unwrap(), expected);
        assert_eq!(timestamp::parse("2025-01-15T10:30:00Z").unwrap(), expected);
        assert_eq!(timestamp::parse("2025-01-15T12:30:00+02:00").unwrap(), expected);
        assert!(timestamp::parse("yesterday").is_err());
    }

    #[test]
    fn test_legacy_progress_record_loads() {
        let json = r#"{
            "attempts": 2,
            "last_score": 80.0,
            "best_score": 85.0,
            "total_answered": 10,
            "notes": "struggles with base cases",
            "last_updated": "2025-01-15T10:30:00.123456"
        }"#;

        let record: TopicPerformanceRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.total_questions_answered, 10);
        assert_eq!(record.previous_score, None);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_record_validation() {
        let now = Utc::now();
        let mut record = TopicPerformanceRecord::new(now);
        assert!(record.validate().is_ok());

        record.attempts = 1;
        record.last_score = 150.0;
        record.best_score = 150.0;
        assert!(record.validate().is_err());

        record.last_score = 80.0;
        record.best_score = 70.0;
        assert!(record.validate().is_err());

        let mut schedule = ReviewScheduleRecord::new(now);
        schedule.performance_history.push(PerformanceEntry {
            date: now,
            score: 2.0,
        });
        assert!(schedule.validate().is_err());
    }

    #[test]
    fn test_malformed_timestamp_is_rejected() {
        let json = r#"{
            "repetition_number": 1,
            "last_review": "not a date",
            "performance_history": []
        }"#;
        assert!(serde_json::from_str::<ReviewScheduleRecord>(json).is_err());
    }
}
