use std::collections::BTreeMap;
use std::str::FromStr;

use analysis_core::{AnalysisError, AnalysisResult};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// The four regulator statement tables the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    /// Income statement (DRE).
    IncomeStatement,
    /// Balance sheet, asset side (BPA).
    AssetSide,
    /// Balance sheet, liabilities and equity side (BPP).
    LiabilitySide,
    /// Cash-flow statement, indirect method (DFC_MI).
    CashFlow,
}

impl StatementKind {
    pub fn code(&self) -> &'static str {
        match self {
            StatementKind::IncomeStatement => "DRE",
            StatementKind::AssetSide => "BPA",
            StatementKind::LiabilitySide => "BPP",
            StatementKind::CashFlow => "DFC_MI",
        }
    }
}

/// Which filing a figure comes from. Only `Last` rows are definitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExerciseOrder {
    #[serde(rename = "ÚLTIMO")]
    Last,
    #[serde(rename = "PENÚLTIMO")]
    Penultimate,
}

impl FromStr for ExerciseOrder {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .map(|c| match c {
                'Ú' | 'ú' => 'U',
                'Ù' | 'ù' => 'U',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        match folded.as_str() {
            "ULTIMO" => Ok(ExerciseOrder::Last),
            "PENULTIMO" => Ok(ExerciseOrder::Penultimate),
            _ => Err(AnalysisError::InvalidData(format!("unknown exercise order '{}'", s.trim()))),
        }
    }
}

/// One line of a regulator statement table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRow {
    pub company_id: u32,
    pub account_code: String,
    pub fiscal_year_end: NaiveDate,
    pub exercise_order: ExerciseOrder,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementTable {
    pub rows: Vec<StatementRow>,
}

impl StatementTable {
    pub fn new(rows: Vec<StatementRow>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows of a single company, in their original order.
    pub fn for_company(&self, company_id: u32) -> StatementTable {
        StatementTable {
            rows: self
                .rows
                .iter()
                .filter(|r| r.company_id == company_id)
                .cloned()
                .collect(),
        }
    }

    /// Yearly series of one account code. See [`align_series`].
    pub fn series(&self, account_code: &str) -> AccountSeries {
        align_series(&self.rows, account_code)
    }
}

/// The statement tables of one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyStatements {
    pub company_id: u32,
    pub income: StatementTable,
    pub assets: StatementTable,
    pub liabilities: StatementTable,
    pub cash_flow: StatementTable,
}

impl CompanyStatements {
    /// Slice the full regulator tables down to one company.
    ///
    /// Fails with `DataUnavailable` when the company has no rows in any of
    /// the four tables.
    pub fn for_company(
        company_id: u32,
        income: &StatementTable,
        assets: &StatementTable,
        liabilities: &StatementTable,
        cash_flow: &StatementTable,
    ) -> AnalysisResult<Self> {
        let statements = Self {
            company_id,
            income: income.for_company(company_id),
            assets: assets.for_company(company_id),
            liabilities: liabilities.for_company(company_id),
            cash_flow: cash_flow.for_company(company_id),
        };

        let missing: Vec<&str> = [
            (StatementKind::IncomeStatement, &statements.income),
            (StatementKind::AssetSide, &statements.assets),
            (StatementKind::LiabilitySide, &statements.liabilities),
            (StatementKind::CashFlow, &statements.cash_flow),
        ]
        .iter()
        .filter(|(_, table)| table.is_empty())
        .map(|(kind, _)| kind.code())
        .collect();

        if !missing.is_empty() {
            return Err(AnalysisError::DataUnavailable(format!(
                "company {company_id} has no {} rows",
                missing.join("/")
            )));
        }
        Ok(statements)
    }

    pub fn table(&self, kind: StatementKind) -> &StatementTable {
        match kind {
            StatementKind::IncomeStatement => &self.income,
            StatementKind::AssetSide => &self.assets,
            StatementKind::LiabilitySide => &self.liabilities,
            StatementKind::CashFlow => &self.cash_flow,
        }
    }
}

/// Yearly values of one account for one company, years ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountSeries(BTreeMap<i32, f64>);

impl AccountSeries {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, year: i32, value: f64) {
        self.0.insert(year, value);
    }

    pub fn get(&self, year: i32) -> Option<f64> {
        self.0.get(&year).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn years(&self) -> Vec<i32> {
        self.0.keys().copied().collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.0.values().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.0.iter().map(|(y, v)| (*y, *v))
    }

    pub fn first(&self) -> Option<(i32, f64)> {
        self.0.first_key_value().map(|(y, v)| (*y, *v))
    }

    pub fn last(&self) -> Option<(i32, f64)> {
        self.0.last_key_value().map(|(y, v)| (*y, *v))
    }

    pub fn last_value(&self) -> Option<f64> {
        self.last().map(|(_, v)| v)
    }

    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> AccountSeries {
        Self(self.0.iter().map(|(y, v)| (*y, f(*v))).collect())
    }

    pub fn abs(&self) -> AccountSeries {
        self.map(f64::abs)
    }

    /// Year-by-year combination over the union of years, missing side as 0.
    pub fn zip_filled(&self, other: &AccountSeries, f: impl Fn(f64, f64) -> f64) -> AccountSeries {
        let mut out = BTreeMap::new();
        for year in self.0.keys().chain(other.0.keys()) {
            let a = self.get(*year).unwrap_or(0.0);
            let b = other.get(*year).unwrap_or(0.0);
            out.insert(*year, f(a, b));
        }
        Self(out)
    }

    pub fn add_filled(&self, other: &AccountSeries) -> AccountSeries {
        self.zip_filled(other, |a, b| a + b)
    }

    pub fn sub_filled(&self, other: &AccountSeries) -> AccountSeries {
        self.zip_filled(other, |a, b| a - b)
    }

    /// Raw growth between the last two years as a fraction, `last / prev - 1`.
    /// Infinite from a zero base and NaN from 0 to 0. `None` with fewer than
    /// two years.
    pub fn last_growth(&self) -> Option<f64> {
        let mut rev = self.0.values().rev();
        let last = *rev.next()?;
        let prev = *rev.next()?;
        Some(last / prev - 1.0)
    }

    /// Like [`last_growth`](Self::last_growth) but `None` when not finite.
    pub fn last_pct_change(&self) -> Option<f64> {
        self.last_growth().filter(|g| g.is_finite())
    }
}

impl FromIterator<(i32, f64)> for AccountSeries {
    fn from_iter<T: IntoIterator<Item = (i32, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Build the yearly series of `account_code` from statement rows.
///
/// Keeps only definitive (`ÚLTIMO`) rows, groups them by the calendar year of
/// their fiscal-year-end date and keeps the latest date per year; when two
/// rows share that date the later one wins. An empty series means the
/// account is not reported.
pub fn align_series(rows: &[StatementRow], account_code: &str) -> AccountSeries {
    let mut by_year: BTreeMap<i32, (NaiveDate, f64)> = BTreeMap::new();

    for row in rows
        .iter()
        .filter(|r| r.account_code == account_code && r.exercise_order == ExerciseOrder::Last)
    {
        let year = row.fiscal_year_end.year();
        match by_year.get(&year) {
            Some((date, _)) if *date > row.fiscal_year_end => {}
            _ => {
                by_year.insert(year, (row.fiscal_year_end, row.value));
            }
        }
    }

    by_year.into_iter().map(|(year, (_, value))| (year, value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(code: &str, y: i32, m: u32, d: u32, order: ExerciseOrder, value: f64) -> StatementRow {
        StatementRow {
            company_id: 9512,
            account_code: code.to_string(),
            fiscal_year_end: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            exercise_order: order,
            value,
        }
    }

    #[test]
    fn test_exercise_order_parsing() {
        assert_eq!("ÚLTIMO".parse::<ExerciseOrder>().unwrap(), ExerciseOrder::Last);
        assert_eq!(" último ".parse::<ExerciseOrder>().unwrap(), ExerciseOrder::Last);
        assert_eq!("PENÚLTIMO".parse::<ExerciseOrder>().unwrap(), ExerciseOrder::Penultimate);
        assert!("PRIMEIRO".parse::<ExerciseOrder>().is_err());
    }

    #[test]
    fn test_align_keeps_latest_definitive_row_per_year() {
        let rows = vec![
            row("3.05", 2022, 12, 31, ExerciseOrder::Last, 150.0),
            row("3.05", 2021, 12, 31, ExerciseOrder::Last, 120.0),
            row("3.05", 2021, 12, 31, ExerciseOrder::Penultimate, 999.0),
            row("3.05", 2020, 6, 30, ExerciseOrder::Last, 80.0),
            row("3.05", 2020, 12, 31, ExerciseOrder::Last, 100.0),
            row("3.01", 2022, 12, 31, ExerciseOrder::Last, 1_000.0),
        ];
        let series = align_series(&rows, "3.05");
        assert_eq!(series.years(), vec![2020, 2021, 2022]);
        assert_eq!(series.values(), vec![100.0, 120.0, 150.0]);
    }

    #[test]
    fn test_align_restatement_on_same_date_supersedes() {
        let rows = vec![
            row("2.03", 2023, 12, 31, ExerciseOrder::Last, 500.0),
            row("2.03", 2023, 12, 31, ExerciseOrder::Last, 520.0),
        ];
        assert_eq!(align_series(&rows, "2.03").get(2023), Some(520.0));
    }

    #[test]
    fn test_align_unknown_account_is_empty() {
        let rows = vec![row("3.05", 2022, 12, 31, ExerciseOrder::Last, 1.0)];
        assert!(align_series(&rows, "9.99").is_empty());
    }

    #[test]
    fn test_filled_arithmetic_uses_year_union() {
        let a: AccountSeries = [(2020, 10.0), (2021, 20.0)].into_iter().collect();
        let b: AccountSeries = [(2021, 5.0), (2022, 7.0)].into_iter().collect();
        let sum = a.add_filled(&b);
        assert_eq!(sum.years(), vec![2020, 2021, 2022]);
        assert_eq!(sum.values(), vec![10.0, 25.0, 7.0]);
        assert_eq!(a.sub_filled(&b).values(), vec![10.0, 15.0, -7.0]);
    }

    #[test]
    fn test_last_pct_change() {
        let s: AccountSeries = [(2020, 100.0), (2021, 125.0)].into_iter().collect();
        assert!((s.last_pct_change().unwrap() - 0.25).abs() < 1e-12);

        let single: AccountSeries = [(2021, 125.0)].into_iter().collect();
        assert!(single.last_pct_change().is_none());

        let from_zero: AccountSeries = [(2020, 0.0), (2021, 125.0)].into_iter().collect();
        assert!(from_zero.last_pct_change().is_none());
        assert_eq!(from_zero.last_growth(), Some(f64::INFINITY));

        let flat_zero: AccountSeries = [(2020, 0.0), (2021, 0.0)].into_iter().collect();
        assert!(flat_zero.last_growth().unwrap().is_nan());
        assert!(single.last_growth().is_none());
    }

    #[test]
    fn test_company_statements_require_every_table() {
        let table = |code: &str| {
            StatementTable::new(vec![row(code, 2022, 12, 31, ExerciseOrder::Last, 1.0)])
        };
        let income = table("3.05");
        let assets = table("1");
        let liabilities = table("2");
        let empty = StatementTable::default();
        let bundle = |id: u32, cash_flow: &StatementTable| {
            CompanyStatements::for_company(id, &income, &assets, &liabilities, cash_flow)
        };

        let err = bundle(9512, &empty).unwrap_err();
        assert!(matches!(err, AnalysisError::DataUnavailable(ref msg) if msg.contains("DFC_MI")));

        let err = bundle(1, &income).unwrap_err();
        assert!(matches!(err, AnalysisError::DataUnavailable(_)));

        let ok = bundle(9512, &income).unwrap();
        assert_eq!(ok.table(StatementKind::AssetSide).rows.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_aligned_series_has_one_value_per_year(
            entries in proptest::collection::vec(
                (2010i32..2025, 1u32..13, any::<bool>(), -1e9f64..1e9),
                0..60,
            )
        ) {
            let rows: Vec<StatementRow> = entries
                .iter()
                .map(|(y, m, last, v)| {
                    let order = if *last {
                        ExerciseOrder::Last
                    } else {
                        ExerciseOrder::Penultimate
                    };
                    row("3.01", *y, *m, 28, order, *v)
                })
                .collect();
            let series = align_series(&rows, "3.01");
            let years = series.years();
            prop_assert!(years.windows(2).all(|w| w[0] < w[1]));

            let definitive_years: std::collections::BTreeSet<i32> = entries
                .iter()
                .filter(|(_, _, last, _)| *last)
                .map(|(y, _, _, _)| *y)
                .collect();
            prop_assert_eq!(years, definitive_years.into_iter().collect::<Vec<_>>());
        }
    }
}
