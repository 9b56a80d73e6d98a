use chrono::{DateTime, Utc};
use sb_srs::{ReviewScheduler, estimate_retention, select_due_topics, validate_performance};

use crate::error::StoreError;
use crate::models::{
    PerformanceEntry, ProgressDocument, ReviewEntry, ReviewSchedule, ReviewScheduleRecord,
    ScheduleDocument, ScheduleUpdate,
};
use crate::repositories::validate_topic;

/// Upcoming reviews listed by [`review_schedule`].
const UPCOMING_LIMIT: usize = 5;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Record a review and move the topic to its next review date.
///
/// The next date is computed from the stored `last_review` and the counter before
/// it is incremented. Nothing is changed when the computation fails.
pub fn advance(
    doc: &mut ScheduleDocument,
    scheduler: &ReviewScheduler,
    topic: &str,
    performance: f64,
    now: DateTime<Utc>,
) -> Result<ScheduleUpdate, StoreError> {
    let topic = validate_topic(topic)?;
    validate_performance(performance)?;

    let (last_review, repetition_number) = doc
        .get(topic)
        .map_or((now, 0), |r| (r.last_review, r.repetition_number));
    let next_review = scheduler.compute_next_review(last_review, repetition_number, performance)?;

    let record = doc
        .entry(topic.to_string())
        .or_insert_with(|| ReviewScheduleRecord::new(now));
    record.performance_history.push(PerformanceEntry {
        date: now,
        score: performance,
    });
    record.repetition_number = record.repetition_number.saturating_add(1);
    record.last_review = now;
    record.next_review = Some(next_review);

    tracing::debug!(
        topic,
        performance,
        repetition_number = record.repetition_number,
        next_review = %next_review,
        "Advanced review schedule"
    );

    Ok(ScheduleUpdate {
        topic: topic.to_string(),
        next_review,
        days_until_review: whole_days_until(next_review, now),
        repetition_number: record.repetition_number,
    })
}

/// Look up a single topic's schedule.
pub fn get_schedule<'a>(
    doc: &'a ScheduleDocument,
    topic: &str,
) -> Result<&'a ReviewScheduleRecord, StoreError> {
    let topic = validate_topic(topic)?;
    doc.get(topic).ok_or_else(|| StoreError::NotFound {
        kind: "schedule",
        topic: topic.to_string(),
    })
}

/// Split scheduled topics into due and upcoming reviews.
///
/// Topics that were never advanced have no `next_review` and are left out.
pub fn review_schedule(doc: &ScheduleDocument, now: DateTime<Utc>) -> ReviewSchedule {
    let mut due_reviews = Vec::new();
    let mut upcoming_reviews = Vec::new();

    for (topic, record) in doc {
        let Some(next_review) = record.next_review else {
            continue;
        };
        let days_until = whole_days_until(next_review, now);
        let is_due = next_review <= now;
        let entry = ReviewEntry {
            topic: topic.clone(),
            next_review,
            days_until,
            times_reviewed: record.repetition_number,
            overdue_days: is_due.then(|| days_until.abs()),
        };
        if is_due {
            due_reviews.push(entry);
        } else {
            upcoming_reviews.push(entry);
        }
    }

    due_reviews.sort_by_key(|e| e.next_review);
    upcoming_reviews.sort_by_key(|e| e.next_review);
    upcoming_reviews.truncate(UPCOMING_LIMIT);

    ReviewSchedule {
        total_due: due_reviews.len(),
        due_reviews,
        upcoming_reviews,
    }
}

/// Topics to review now, most urgent first.
///
/// Quizzed topics without a schedule count as due immediately.
pub fn due_topics(
    progress: &ProgressDocument,
    schedule: &ScheduleDocument,
    now: DateTime<Utc>,
) -> Vec<String> {
    let scheduled = schedule
        .iter()
        .map(|(topic, record)| (topic.clone(), record.next_review));
    let unscheduled = progress
        .keys()
        .filter(|topic| !schedule.contains_key(*topic))
        .map(|topic| (topic.clone(), None));

    select_due_topics(scheduled.chain(unscheduled), now)
}

/// Estimated retention of a topic, based on the time since its last review.
pub fn retention(
    doc: &ScheduleDocument,
    topic: &str,
    strength: f64,
    now: DateTime<Utc>,
) -> Result<f64, StoreError> {
    let record = get_schedule(doc, topic)?;
    let elapsed_ms = (now - record.last_review).num_milliseconds().max(0);
    let days = elapsed_ms as f64 / MILLIS_PER_DAY as f64;
    Ok(estimate_retention(days, strength)?)
}

/// Whole days from `now` until `target`, floored (so one hour overdue is -1).
pub fn whole_days_until(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (target - now).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}
