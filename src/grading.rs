use chrono::{DateTime, NaiveDate, Utc};

/// Score as a percentage of the maximum. Max scores are validated positive
/// at creation, but a zero guard keeps this total.
pub fn percentage(score: f64, max_score: f64) -> f64 {
    if max_score == 0.0 {
        return 0.0;
    }
    (score / max_score) * 100.0
}

/// Letter on the fixed scale: A >= 90, B >= 80, C >= 70, D >= 60, else F.
pub fn letter_for(percentage: f64) -> &'static str {
    if percentage >= 90.0 {
        "A"
    } else if percentage >= 80.0 {
        "B"
    } else if percentage >= 70.0 {
        "C"
    } else if percentage >= 60.0 {
        "D"
    } else {
        "F"
    }
}

/// A submission is late when it lands strictly after midnight UTC of the
/// due date. Work submitted any time on the due day itself counts as late.
pub fn is_late(submitted_at: DateTime<Utc>, due_date: NaiveDate) -> bool {
    let Some(deadline) = due_date.and_hms_opt(0, 0, 0) else {
        return false;
    };
    submitted_at.naive_utc() > deadline
}
