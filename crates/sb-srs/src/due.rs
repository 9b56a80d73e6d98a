use chrono::{DateTime, Utc};

/// Get all topics that are due for review, most urgent first.
///
/// A topic is due when it has never been scheduled (`None`) or its next review is
/// at or before `now`. Unscheduled topics sort as if due exactly at `now`; the sort
/// is stable so equal timestamps keep their input order.
pub fn select_due_topics<K, I>(topics: I, now: DateTime<Utc>) -> Vec<K>
where
    I: IntoIterator<Item = (K, Option<DateTime<Utc>>)>,
{
    let mut due: Vec<(DateTime<Utc>, K)> = topics
        .into_iter()
        .filter_map(|(id, next_review)| {
            let key = next_review.unwrap_or(now);
            (key <= now).then_some((key, id))
        })
        .collect();

    due.sort_by_key(|(key, _)| *key);
    due.into_iter().map(|(_, id)| id).collect()
}
