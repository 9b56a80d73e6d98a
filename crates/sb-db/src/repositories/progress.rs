use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{
    OverallRecommendation, ProgressDocument, ProgressSummary, QuizOutcome, QuizResult,
    Recommendation, TopicPerformanceRecord, Trend,
};
use crate::repositories::validate_topic;

/// Scores at or above this count as a strength, below it as a weakness.
const STRENGTH_THRESHOLD: f64 = 70.0;

/// How many strengths and weaknesses a summary lists.
const SUMMARY_TOPIC_LIMIT: usize = 3;

/// Apply a quiz result to the topic's statistics.
///
/// Fails with [`StoreError::InvalidArgument`] before touching the document when the
/// topic is blank or the score is not a percentage.
pub fn record_quiz_result(
    doc: &mut ProgressDocument,
    quiz: &QuizResult,
    now: DateTime<Utc>,
) -> Result<QuizOutcome, StoreError> {
    let topic = validate_topic(&quiz.topic)?;
    if !(0.0..=100.0).contains(&quiz.score) {
        return Err(StoreError::InvalidArgument(format!(
            "score must be within [0, 100], got {}",
            quiz.score
        )));
    }

    let stats = doc
        .entry(topic.to_string())
        .or_insert_with(|| TopicPerformanceRecord::new(now));

    let previous = (stats.attempts > 0).then_some(stats.last_score);
    stats.attempts = stats.attempts.saturating_add(1);
    stats.last_score = quiz.score;
    stats.best_score = stats.best_score.max(quiz.score);
    stats.total_questions_answered = stats
        .total_questions_answered
        .saturating_add(u64::from(quiz.total_questions));
    if !quiz.notes.is_empty() {
        stats.notes.clone_from(&quiz.notes);
    }
    stats.previous_score = previous;
    stats.last_updated = now;

    tracing::debug!(
        topic,
        attempts = stats.attempts,
        score = quiz.score,
        "Recorded quiz result"
    );

    Ok(QuizOutcome {
        topic: topic.to_string(),
        trend: Trend::between(previous, quiz.score),
        recommendation: Recommendation::for_result(quiz.score, stats.attempts),
        topic_stats: stats.clone(),
    })
}

/// Look up a single topic.
pub fn get_topic<'a>(
    doc: &'a ProgressDocument,
    topic: &str,
) -> Result<&'a TopicPerformanceRecord, StoreError> {
    let topic = validate_topic(topic)?;
    doc.get(topic).ok_or_else(|| StoreError::NotFound {
        kind: "progress",
        topic: topic.to_string(),
    })
}

/// Summarize a student's progress across all topics.
pub fn summarize(doc: &ProgressDocument) -> ProgressSummary {
    if doc.is_empty() {
        return ProgressSummary::default();
    }

    let total_attempts: u64 = doc.values().map(|t| u64::from(t.attempts)).sum();
    let total_questions_answered: u64 = doc.values().map(|t| t.total_questions_answered).sum();
    let score_sum: f64 = doc.values().map(|t| t.last_score).sum();
    let average_score = round_one_decimal(score_sum / doc.len() as f64);

    // Best first; the document is ordered by name, and the sort is stable, so ties
    // stay in name order.
    let mut ranking: Vec<(&String, f64)> = doc.iter().map(|(k, t)| (k, t.last_score)).collect();
    ranking.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let strengths: Vec<String> = ranking
        .iter()
        .take(SUMMARY_TOPIC_LIMIT)
        .filter(|(_, score)| *score >= STRENGTH_THRESHOLD)
        .map(|(topic, _)| (*topic).clone())
        .collect();

    // The bottom of the ranking, still best first.
    let bottom = ranking.len().saturating_sub(SUMMARY_TOPIC_LIMIT);
    let weaknesses: Vec<String> = ranking[bottom..]
        .iter()
        .filter(|(_, score)| *score < STRENGTH_THRESHOLD)
        .map(|(topic, _)| (*topic).clone())
        .collect();

    let recommendation = OverallRecommendation::for_summary(average_score, &weaknesses);

    ProgressSummary {
        topics_studied: doc.len(),
        total_attempts,
        total_questions_answered,
        average_score,
        strengths,
        weaknesses,
        recommendation: Some(recommendation),
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
