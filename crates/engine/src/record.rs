use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A row as it comes out of a backend, before normalization: field name to
/// JSON value.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Label used for the department when the source has none, or when the
/// source reports the administration pseudo-department.
pub const OTHER_DEPARTMENT: &str = "Other";
/// Department label the source uses for overhead that is reported as
/// [`OTHER_DEPARTMENT`].
pub const ADMINISTRATION_DEPARTMENT: &str = "Administration";
/// Label used for an expense type or parent category with no reference.
pub const UNSPECIFIED: &str = "Unspecified";

/// How an expense is allocated across cost centers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DistributionBase {
    #[serde(rename = "Direct")]
    Direct,
    #[serde(rename = "Do-not-distribute")]
    DoNotDistribute,
    #[serde(rename = "To-profit-centers")]
    ToProfitCenters,
    #[default]
    #[serde(rename = "Undefined")]
    Undefined,
}

impl DistributionBase {
    pub const ALL: [DistributionBase; 4] = [
        DistributionBase::Direct,
        DistributionBase::DoNotDistribute,
        DistributionBase::ToProfitCenters,
        DistributionBase::Undefined,
    ];

    /// Canonical label, as written in the output table.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            DistributionBase::Direct => "Direct",
            DistributionBase::DoNotDistribute => "Do-not-distribute",
            DistributionBase::ToProfitCenters => "To-profit-centers",
            DistributionBase::Undefined => "Undefined",
        }
    }

    /// Classifies a label coming from a backend. Anything unknown is
    /// [`DistributionBase::Undefined`].
    ///
    /// The semantic model labels direct expenses in Ukrainian ("Прямий"),
    /// so that label is accepted too.
    pub fn classify(value: &str) -> Self {
        let value = value.trim().to_lowercase();
        match value.as_str() {
            "direct" | "прямий" => DistributionBase::Direct,
            "do-not-distribute" | "do not distribute" => DistributionBase::DoNotDistribute,
            "to-profit-centers" | "to profit centers" => DistributionBase::ToProfitCenters,
            _ => DistributionBase::Undefined,
        }
    }
}

impl fmt::Display for DistributionBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the normalized operating-expenses table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// Transaction day. `None` when the source value could not be parsed;
    /// such records are skipped by every time-based grouping.
    #[serde(rename = "Period")]
    pub period: Option<NaiveDate>,
    #[serde(rename = "Department")]
    pub department: String,
    #[serde(rename = "Type_of_expense")]
    pub type_of_expense: String,
    #[serde(rename = "Parent_Description")]
    pub parent_description: String,
    /// Amount. `None` when the source value is not numeric.
    #[serde(rename = "Sum")]
    pub sum: Option<f64>,
    #[serde(rename = "DistributionBase")]
    pub distribution_base: DistributionBase,
}

impl ExpenseRecord {
    /// Output column names, in table order.
    pub const COLUMNS: [&'static str; 6] = [
        "Period",
        "Department",
        "Type_of_expense",
        "Parent_Description",
        "Sum",
        "DistributionBase",
    ];

    /// The amount as aggregations see it: missing counts as zero.
    #[must_use]
    pub fn amount(&self) -> f64 {
        self.sum.unwrap_or(0.0)
    }

    /// Turns the record back into a raw row, e.g. to feed it through the
    /// normalizer again.
    pub fn to_raw(&self) -> RawRecord {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => RawRecord::new(),
        }
    }
}

/// Which backend produced a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    PowerBi,
    Sql,
}

impl Backend {
    pub const fn as_str(self) -> &'static str {
        match self {
            Backend::PowerBi => "power_bi",
            Backend::Sql => "sql",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The normalized result of one fetch. This is the unit the dashboard caches.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpenseTable {
    pub records: Vec<ExpenseRecord>,
    pub backend: Backend,
    pub fetched_at: DateTime<Utc>,
    /// Set when the backend failed and its policy turned the failure into an
    /// empty table.
    pub degraded: bool,
}

impl ExpenseTable {
    pub fn new(backend: Backend, records: Vec<ExpenseRecord>) -> Self {
        Self {
            records,
            backend,
            fetched_at: Utc::now(),
            degraded: false,
        }
    }

    pub fn degraded(backend: Backend) -> Self {
        Self {
            degraded: true,
            ..Self::new(backend, Vec::new())
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
