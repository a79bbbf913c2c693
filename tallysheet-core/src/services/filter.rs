//! Filter engine - narrows a Dataset by period and categorical selections

use std::collections::BTreeSet;

use chrono::{Local, NaiveDate};
use tracing::debug;

use crate::domain::parse::client_base_name;
use crate::domain::{ColumnRef, Dataset, FilterSpec, RawRow};

/// One categorical restriction resolved against a dataset
struct ColumnFilter<'a> {
    column: ColumnRef,
    accepted: &'a BTreeSet<String>,
    by_client: bool,
}

impl ColumnFilter<'_> {
    fn keeps(&self, dataset: &Dataset, row: &RawRow) -> bool {
        if self.by_client {
            let base = dataset.client_base(row).unwrap_or_default();
            self.accepted.iter().any(|v| client_base_name(v) == base)
        } else {
            self.accepted.contains(row.cell(self.column.index).trim())
        }
    }
}

/// Applies a [`FilterSpec`] relative to a fixed "today"
pub struct FilterEngine {
    today: NaiveDate,
}

impl FilterEngine {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Engine anchored at the local date
    pub fn today() -> Self {
        Self::new(Local::now().date_naive())
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.today
    }

    /// Filtered view of `dataset`; the input is left untouched
    ///
    /// Each restriction is an independent per-row predicate, so the order of
    /// columns never changes the result. Restrictions on columns the dataset
    /// does not have are ignored.
    pub fn apply(&self, dataset: &Dataset, spec: &FilterSpec) -> Dataset {
        let filters: Vec<ColumnFilter> = spec
            .active_columns()
            .filter_map(|(name, accepted)| {
                let Some(column) = dataset.column(name) else {
                    debug!(column = name, "Filter column not in sheet, ignoring");
                    return None;
                };
                let by_client = dataset.is_client_column(&column);
                Some(ColumnFilter {
                    column,
                    accepted,
                    by_client,
                })
            })
            .collect();

        let view = dataset.retain(|row| {
            spec.period.contains(dataset.date(row), self.today)
                && filters.iter().all(|f| f.keeps(dataset, row))
        });
        debug!(
            period = %spec.period,
            before = dataset.len(),
            after = view.len(),
            "Applied filters"
        );
        view
    }

    /// Distinct trimmed values of a column, sorted, for building selections
    ///
    /// The client column yields canonical names.
    pub fn options(&self, dataset: &Dataset, column: &str) -> Vec<String> {
        let Some(column) = dataset.column(column) else {
            return Vec::new();
        };
        let by_client = dataset.is_client_column(&column);
        let values: BTreeSet<String> = dataset
            .rows()
            .iter()
            .map(|row| {
                if by_client {
                    dataset.client_base(row).unwrap_or_default().to_string()
                } else {
                    row.cell(column.index).trim().to_string()
                }
            })
            .filter(|v| !v.is_empty())
            .collect();
        values.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Period;

    fn dataset() -> Dataset {
        let grid: Vec<Vec<String>> = [
            ["Data", "Cliente", "UF", "Tecnico"],
            ["05/01/2026", "Acme 01", "SP", "Ana"],
            ["20/01/2026", "Acme-02", " RJ ", "Bruno"],
            ["03/02/2026", "Beta", "SP", "Ana"],
            ["10/12/2025", "Beta 2", "MG", "Ana"],
            ["sem data", "Gama", "SP", "Bruno"],
        ]
        .iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect();
        Dataset::from_grid(Some("2026".into()), &grid)
    }

    fn engine() -> FilterEngine {
        FilterEngine::new(NaiveDate::from_ymd_opt(2026, 1, 25).unwrap())
    }

    fn clients(ds: &Dataset) -> Vec<String> {
        ds.rows().iter().map(|r| r.cell(1).to_string()).collect()
    }

    #[test]
    fn test_period_all_keeps_undated_rows() {
        let ds = dataset();
        assert_eq!(engine().apply(&ds, &FilterSpec::default()).len(), 5);
    }

    #[test]
    fn test_this_month_and_this_year() {
        let ds = dataset();
        let month = engine().apply(&ds, &FilterSpec::new(Period::ThisMonth));
        assert_eq!(clients(&month), vec!["Acme 01", "Acme-02"]);
        let year = engine().apply(&ds, &FilterSpec::new(Period::ThisYear));
        assert_eq!(year.len(), 3);
        let custom = engine().apply(&ds, &FilterSpec::new(Period::Custom { year: 2025, month: 12 }));
        assert_eq!(clients(&custom), vec!["Beta 2"]);
    }

    #[test]
    fn test_period_filters_commute() {
        let ds = dataset();
        let e = engine();
        let month = FilterSpec::new(Period::ThisMonth);
        let year = FilterSpec::new(Period::ThisYear);
        let a = e.apply(&e.apply(&ds, &month), &year);
        let b = e.apply(&e.apply(&ds, &year), &month);
        assert_eq!(clients(&a), clients(&b));
    }

    #[test]
    fn test_client_filter_uses_canonical_names() {
        let ds = dataset();
        let spec = FilterSpec::default().with_values("Cliente", ["Acme"]);
        let view = engine().apply(&ds, &spec);
        assert_eq!(clients(&view), vec!["Acme 01", "Acme-02"]);

        let spec = FilterSpec::default().with_values("Cliente", ["Acme 07"]);
        assert_eq!(engine().apply(&ds, &spec).len(), 2);
    }

    #[test]
    fn test_values_compared_trimmed() {
        let ds = dataset();
        let spec = FilterSpec::default().with_values("UF", ["RJ"]);
        assert_eq!(clients(&engine().apply(&ds, &spec)), vec!["Acme-02"]);
    }

    #[test]
    fn test_alias_keys_and_missing_columns() {
        let ds = dataset();
        let spec = FilterSpec::default()
            .with_values("Técnico", ["Bruno"])
            .with_values("Cidade", ["Campinas"]);
        assert_eq!(clients(&engine().apply(&ds, &spec)), vec!["Acme-02", "Gama"]);
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let ds = dataset();
        let e = engine();
        let uf = FilterSpec::default().with_values("UF", ["SP"]);
        let tech = FilterSpec::default().with_values("Tecnico", ["Ana"]);
        let both = uf.with_values("Tecnico", ["Ana"]);
        let a = e.apply(&e.apply(&ds, &uf), &tech);
        let b = e.apply(&e.apply(&ds, &tech), &uf);
        assert_eq!(clients(&a), clients(&b));
        assert_eq!(clients(&a), clients(&e.apply(&ds, &both)));
        assert_eq!(clients(&a), vec!["Acme 01", "Beta"]);
    }

    #[test]
    fn test_input_untouched() {
        let ds = dataset();
        let _ = engine().apply(&ds, &FilterSpec::new(Period::ThisMonth));
        assert_eq!(ds.len(), 5);
    }

    #[test]
    fn test_options() {
        let ds = dataset();
        assert_eq!(engine().options(&ds, "Cliente"), vec!["Acme", "Beta", "Gama"]);
        assert_eq!(engine().options(&ds, "UF"), vec!["MG", "RJ", "SP"]);
        assert!(engine().options(&ds, "Cidade").is_empty());
    }
}
