//! Aggregations behind the report: KPIs, the monthly series and the
//! group-by tables.
//!
//! Every aggregate reads a missing amount as zero and every time-based
//! grouping skips records without a period.

use std::collections::HashMap;

use chrono::Datelike;
use serde::Serialize;

use crate::{DistributionBase, ExpenseRecord};

/// Headline figures of a (filtered) table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Kpis {
    pub total: f64,
    /// Mean of the per-month totals.
    pub monthly_average: f64,
    /// Department with the largest total.
    pub top_department: String,
    /// Share of [`DistributionBase::Direct`] in the total, in percent.
    pub direct_share: f64,
}

impl Kpis {
    /// `None` for an empty table.
    pub fn compute(records: &[ExpenseRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let total: f64 = records.iter().map(ExpenseRecord::amount).sum();
        let months = monthly_series(records);
        let monthly_average = if months.is_empty() {
            0.0
        } else {
            months.iter().map(|m| m.total).sum::<f64>() / months.len() as f64
        };
        let top_department = totals_by(records, Dimension::Department)
            .into_iter()
            .next()
            .map(|group| group.key)
            .unwrap_or_default();
        let direct: f64 = records
            .iter()
            .filter(|r| r.distribution_base == DistributionBase::Direct)
            .map(ExpenseRecord::amount)
            .sum();
        let direct_share = if total != 0.0 {
            direct * 100.0 / total
        } else {
            0.0
        };

        Some(Self {
            total,
            monthly_average,
            top_department,
            direct_share,
        })
    }
}

/// Total of one calendar month.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthTotal {
    pub year: i32,
    pub month: u32,
    pub total: f64,
}

impl MonthTotal {
    /// `YYYY-MM`.
    pub fn label(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

/// Per-month totals in chronological order.
pub fn monthly_series(records: &[ExpenseRecord]) -> Vec<MonthTotal> {
    let mut totals: HashMap<(i32, u32), f64> = HashMap::new();
    for record in records {
        if let Some(period) = record.period {
            *totals.entry((period.year(), period.month())).or_default() += record.amount();
        }
    }
    let mut series: Vec<MonthTotal> = totals
        .into_iter()
        .map(|((year, month), total)| MonthTotal { year, month, total })
        .collect();
    series.sort_by_key(|m| (m.year, m.month));
    series
}

/// A column to group by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dimension {
    Department,
    ParentDescription,
    TypeOfExpense,
    DistributionBase,
}

impl Dimension {
    fn key(self, record: &ExpenseRecord) -> &str {
        match self {
            Dimension::Department => &record.department,
            Dimension::ParentDescription => &record.parent_description,
            Dimension::TypeOfExpense => &record.type_of_expense,
            Dimension::DistributionBase => record.distribution_base.label(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub total: f64,
}

/// Totals per value of `dimension`, largest first (ties by key).
pub fn totals_by(records: &[ExpenseRecord], dimension: Dimension) -> Vec<GroupTotal> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for record in records {
        *totals.entry(dimension.key(record)).or_default() += record.amount();
    }
    let mut groups: Vec<GroupTotal> = totals
        .into_iter()
        .map(|(key, total)| GroupTotal {
            key: key.to_string(),
            total,
        })
        .collect();
    groups.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.key.cmp(&b.key)));
    groups
}

/// The `n` largest groups of `dimension`.
pub fn top(records: &[ExpenseRecord], dimension: Dimension, n: usize) -> Vec<GroupTotal> {
    let mut groups = totals_by(records, dimension);
    groups.truncate(n);
    groups
}

/// One leaf of the department / category / distribution hierarchy.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub department: String,
    pub parent_description: String,
    pub distribution_base: DistributionBase,
    pub total: f64,
}

/// Totals per (department, parent category, distribution base), sorted by
/// the three keys.
pub fn breakdown(records: &[ExpenseRecord]) -> Vec<BreakdownRow> {
    let mut totals: HashMap<(&str, &str, DistributionBase), f64> = HashMap::new();
    for record in records {
        let key = (
            record.department.as_str(),
            record.parent_description.as_str(),
            record.distribution_base,
        );
        *totals.entry(key).or_default() += record.amount();
    }
    let mut rows: Vec<BreakdownRow> = totals
        .into_iter()
        .map(|((department, parent, base), total)| BreakdownRow {
            department: department.to_string(),
            parent_description: parent.to_string(),
            distribution_base: base,
            total,
        })
        .collect();
    rows.sort_by(|a, b| {
        (&a.department, &a.parent_description, a.distribution_base.label()).cmp(&(
            &b.department,
            &b.parent_description,
            b.distribution_base.label(),
        ))
    });
    rows
}

/// Records newest first; records without a period go last.
pub fn detail(records: &[ExpenseRecord]) -> Vec<ExpenseRecord> {
    let mut rows = records.to_vec();
    rows.sort_by(|a, b| match (a.period, b.period) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    rows
}
