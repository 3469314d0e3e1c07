//! Plain-text rendering of the report.

use std::io::{self, Write};

use engine::{
    DistributionBase, ExpenseRecord, ExpenseTable,
    report::{self, Dimension, Kpis},
};

const TOP_CATEGORIES: usize = 10;

/// `1234567.8` -> `1,234,568`.
pub fn amount(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn header<W: Write>(out: &mut W, table: &ExpenseTable, shown: usize) -> io::Result<()> {
    writeln!(
        out,
        "source: {} (fetched {})",
        table.backend,
        table.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    if table.degraded {
        writeln!(out, "warning: the backend failed, showing an empty table")?;
    }
    writeln!(out, "showing {shown} of {} records", table.len())
}

pub fn kpis<W: Write>(out: &mut W, records: &[ExpenseRecord]) -> io::Result<()> {
    let Some(kpis) = Kpis::compute(records) else {
        return writeln!(out, "no data for the selected filters");
    };
    writeln!(out, "total expenses:   {}", amount(kpis.total))?;
    writeln!(out, "monthly average:  {}", amount(kpis.monthly_average))?;
    writeln!(out, "top department:   {}", kpis.top_department)?;
    writeln!(out, "direct share:     {:.1}%", kpis.direct_share)
}

pub fn report<W: Write>(out: &mut W, records: &[ExpenseRecord]) -> io::Result<()> {
    kpis(out, records)?;
    if records.is_empty() {
        return Ok(());
    }

    writeln!(out, "\nby month")?;
    for month in report::monthly_series(records) {
        writeln!(out, "  {}  {:>16}", month.label(), amount(month.total))?;
    }

    writeln!(out, "\nby department")?;
    for group in report::totals_by(records, Dimension::Department) {
        writeln!(out, "  {:<32}  {:>16}", group.key, amount(group.total))?;
    }

    writeln!(out, "\ntop {TOP_CATEGORIES} categories")?;
    for group in report::top(records, Dimension::ParentDescription, TOP_CATEGORIES) {
        writeln!(out, "  {:<32}  {:>16}", group.key, amount(group.total))?;
    }

    writeln!(out, "\nby distribution base")?;
    let total: f64 = records.iter().map(ExpenseRecord::amount).sum();
    for group in report::totals_by(records, Dimension::DistributionBase) {
        let share = if total != 0.0 {
            group.total * 100.0 / total
        } else {
            0.0
        };
        writeln!(
            out,
            "  {:<32}  {:>16}  {share:>5.1}%",
            group.key,
            amount(group.total)
        )?;
    }
    Ok(())
}

/// Accepts the canonical labels in any case.
pub fn parse_distribution(value: &str) -> Result<DistributionBase, String> {
    DistributionBase::ALL
        .into_iter()
        .find(|base| base.label().eq_ignore_ascii_case(value.trim()))
        .ok_or_else(|| {
            let labels: Vec<&str> = DistributionBase::ALL.iter().map(|b| b.label()).collect();
            format!("expected one of: {}", labels.join(", "))
        })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use engine::Backend;

    use super::*;

    fn record(month: u32, department: &str, sum: f64, base: DistributionBase) -> ExpenseRecord {
        ExpenseRecord {
            period: NaiveDate::from_ymd_opt(2024, month, 1),
            department: department.to_string(),
            type_of_expense: "Fuel".to_string(),
            parent_description: "Transport".to_string(),
            sum: Some(sum),
            distribution_base: base,
        }
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn amounts_are_grouped_by_thousands() {
        assert_eq!(amount(0.0), "0");
        assert_eq!(amount(999.4), "999");
        assert_eq!(amount(1234567.8), "1,234,568");
        assert_eq!(amount(-1500.0), "-1,500");
    }

    #[test]
    fn empty_table_prints_a_notice() {
        let text = render(|out| report(out, &[]));
        assert_eq!(text, "no data for the selected filters\n");
    }

    #[test]
    fn report_lists_every_section() {
        let records = vec![
            record(1, "Ops", 3000.0, DistributionBase::Direct),
            record(2, "Sales", 1000.0, DistributionBase::Undefined),
        ];
        let text = render(|out| report(out, &records));
        assert!(text.contains("total expenses:   4,000"));
        assert!(text.contains("top department:   Ops"));
        assert!(text.contains("direct share:     75.0%"));
        assert!(text.contains("2024-02"));
        assert!(text.contains("top 10 categories"));
        assert!(text.contains(" 25.0%"));
    }

    #[test]
    fn degraded_table_is_flagged() {
        let table = ExpenseTable::degraded(Backend::Sql);
        let text = render(|out| header(out, &table, 0));
        assert!(text.contains("source: sql"));
        assert!(text.contains("warning: the backend failed"));
    }

    #[test]
    fn distribution_labels_parse_case_insensitively() {
        assert_eq!(
            parse_distribution("do-not-distribute"),
            Ok(DistributionBase::DoNotDistribute)
        );
        assert!(parse_distribution("sideways").is_err());
    }
}
