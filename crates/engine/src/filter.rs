//! Client-side filtering of the expenses table.

use std::collections::BTreeSet;

use chrono::Datelike;

use crate::{DistributionBase, ExpenseRecord};

/// Allow-lists applied to a table. An empty list means "everything".
///
/// Year and month filters need a period, so records without one are dropped
/// as soon as either list is non-empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    pub years: Vec<i32>,
    pub months: Vec<u32>,
    pub departments: Vec<String>,
    pub distribution_bases: Vec<DistributionBase>,
}

impl ExpenseFilter {
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
            && self.months.is_empty()
            && self.departments.is_empty()
            && self.distribution_bases.is_empty()
    }

    pub fn matches(&self, record: &ExpenseRecord) -> bool {
        if !self.years.is_empty() || !self.months.is_empty() {
            let Some(period) = record.period else {
                return false;
            };
            if !self.years.is_empty() && !self.years.contains(&period.year()) {
                return false;
            }
            if !self.months.is_empty() && !self.months.contains(&period.month()) {
                return false;
            }
        }
        if !self.departments.is_empty() && !self.departments.contains(&record.department) {
            return false;
        }
        self.distribution_bases.is_empty()
            || self.distribution_bases.contains(&record.distribution_base)
    }

    /// Copies of the matching records, in table order.
    pub fn apply(&self, records: &[ExpenseRecord]) -> Vec<ExpenseRecord> {
        records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }
}

/// Years present in the table, newest first.
pub fn available_years(records: &[ExpenseRecord]) -> Vec<i32> {
    let years: BTreeSet<i32> = records
        .iter()
        .filter_map(|record| record.period.map(|p| p.year()))
        .collect();
    years.into_iter().rev().collect()
}

/// Departments present in the table, sorted.
pub fn available_departments(records: &[ExpenseRecord]) -> Vec<String> {
    let departments: BTreeSet<&str> = records.iter().map(|r| r.department.as_str()).collect();
    departments.into_iter().map(str::to_string).collect()
}

/// Distribution bases present in the table, sorted by label.
pub fn available_distribution_bases(records: &[ExpenseRecord]) -> Vec<DistributionBase> {
    let mut bases: Vec<DistributionBase> = records
        .iter()
        .map(|r| r.distribution_base)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    bases.sort_by_key(|base| base.label());
    bases
}
