//! Type coercion shared by both backends.
//!
//! Whatever a backend returns, the rows leaving this module satisfy the
//! [`ExpenseRecord`] contract: labels are non-empty, the distribution base is
//! classified, the amount is a finite number or `None` and the period is a
//! date or `None`. Coercion never fails.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::{
    ADMINISTRATION_DEPARTMENT, DistributionBase, ExpenseRecord, OTHER_DEPARTMENT, RawRecord,
    UNSPECIFIED,
};

/// Normalizes raw rows. Running the output (via [`ExpenseRecord::to_raw`])
/// through this function again yields the same records.
pub fn normalize(records: Vec<RawRecord>) -> Vec<ExpenseRecord> {
    let normalized: Vec<ExpenseRecord> = records.iter().map(normalize_record).collect();

    let missing_period = normalized.iter().filter(|r| r.period.is_none()).count();
    let missing_sum = normalized.iter().filter(|r| r.sum.is_none()).count();
    if missing_period > 0 || missing_sum > 0 {
        tracing::debug!(
            rows = normalized.len(),
            missing_period,
            missing_sum,
            "normalized rows with unparseable values"
        );
    }
    normalized
}

fn normalize_record(raw: &RawRecord) -> ExpenseRecord {
    let department = match label(raw.get("Department")) {
        Some(name) if !name.eq_ignore_ascii_case(ADMINISTRATION_DEPARTMENT) => name,
        _ => OTHER_DEPARTMENT.to_string(),
    };

    ExpenseRecord {
        period: raw.get("Period").and_then(coerce_period),
        department,
        type_of_expense: label(raw.get("Type_of_expense")).unwrap_or_else(|| UNSPECIFIED.to_string()),
        parent_description: label(raw.get("Parent_Description"))
            .unwrap_or_else(|| UNSPECIFIED.to_string()),
        sum: raw.get("Sum").and_then(coerce_sum),
        distribution_base: raw
            .get("DistributionBase")
            .and_then(Value::as_str)
            .map(DistributionBase::classify)
            .unwrap_or_default(),
    }
}

/// Trimmed, non-empty text of a cell.
fn label(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Numeric coercion: numbers and numeric strings, anything else is missing.
pub fn coerce_sum(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Date coercion: accepts the date and date-time shapes both backends emit.
pub fn coerce_period(value: &Value) -> Option<NaiveDate> {
    parse_period(value.as_str()?)
}

pub fn parse_period(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    // `YY-MM-DD`, the relational period key. Checked first: `%Y` would
    // happily read "24" as the year 24.
    if is_short_period_key(text) {
        return NaiveDate::parse_from_str(text, "%y-%m-%d").ok();
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime.date());
        }
    }
    NaiveDate::parse_from_str(text, "%d.%m.%Y").ok()
}

fn is_short_period_key(text: &str) -> bool {
    let parts: Vec<&str> = text.split('-').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit()))
}
