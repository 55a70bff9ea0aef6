//! Record pipeline: deduplicate, filter, sort, identify, paginate.
//!
//! All stages borrow the caller's records; nothing here mutates them.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use super::filter::DropdownFilterSpec;
use super::record::{field_text, id_key, is_present, value_text, GridRecord};
use super::state::{PaginationModel, SortDirection, SortModel};

/// A record with its row identifier
#[derive(Debug, Clone, PartialEq)]
pub struct GridRow<'a> {
    pub id: String,
    pub record: &'a GridRecord,
}

/// Collapse records sharing the same `id_field` value.
///
/// A record keeps the position of its first occurrence but takes the
/// content of its last one. When any record lacks a usable id the input
/// is returned unchanged.
pub fn deduplicate<'a>(records: &'a [GridRecord], id_field: &str) -> Vec<&'a GridRecord> {
    if !records.iter().all(|r| is_present(r.get(id_field))) {
        return records.iter().collect();
    }

    let mut positions: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut unique: Vec<&GridRecord> = Vec::with_capacity(records.len());

    for record in records {
        let key = record.get(id_field).map(id_key).unwrap_or_default();
        match positions.get(&key) {
            Some(&index) => unique[index] = record,
            None => {
                positions.insert(key, unique.len());
                unique.push(record);
            }
        }
    }

    if unique.len() < records.len() {
        tracing::debug!(
            removed = records.len() - unique.len(),
            "Removed duplicate records"
        );
    }

    unique
}

/// Case-insensitive substring match over `fields`. An empty term matches everything.
pub fn matches_search(record: &GridRecord, term: &str, fields: &[String]) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    fields
        .iter()
        .any(|field| field_text(record, field).to_lowercase().contains(&needle))
}

pub fn matches_dropdowns(
    record: &GridRecord,
    filters: &[DropdownFilterSpec],
    selected: impl Fn(&str) -> String,
) -> bool {
    filters
        .iter()
        .all(|filter| filter.matches(record, &selected(&filter.field)))
}

pub fn matches_column_filters(record: &GridRecord, filters: &BTreeMap<String, String>) -> bool {
    filters.iter().all(|(field, value)| {
        value.is_empty()
            || field_text(record, field)
                .to_lowercase()
                .contains(&value.to_lowercase())
    })
}

/// Order two values: numerically when both are numbers, otherwise as
/// case-insensitive text. Missing values sort as empty text.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    if let (Some(Value::Number(x)), Some(Value::Number(y))) = (a, b) {
        if let (Some(x), Some(y)) = (x.as_f64(), y.as_f64()) {
            return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
        }
    }

    let x = a.map(value_text).unwrap_or_default().to_lowercase();
    let y = b.map(value_text).unwrap_or_default().to_lowercase();
    x.cmp(&y)
}

/// Stable sort by one field
pub fn sort_records(records: &mut [&GridRecord], sort: &SortModel) {
    records.sort_by(|a, b| {
        let ordering = compare_values(a.get(&sort.field), b.get(&sort.field));
        match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

/// Attach row identifiers: the unique id field, then `id`, then a
/// synthetic `row-{index}-{millis}` value.
pub fn assign_row_ids<'a>(records: &[&'a GridRecord], id_field: &str) -> Vec<GridRow<'a>> {
    let millis = chrono::Utc::now().timestamp_millis();

    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let id = [id_field, "id"]
                .iter()
                .map(|field| record.get(*field))
                .find(|value| is_present(*value))
                .flatten()
                .map(value_text)
                .unwrap_or_else(|| format!("row-{}-{}", index, millis));

            GridRow { id, record }
        })
        .collect()
}

/// Slice out the current page; out-of-range pages are empty
pub fn paginate<T>(items: &[T], pagination: PaginationModel) -> &[T] {
    let start = pagination.offset().min(items.len());
    let end = start.saturating_add(pagination.rows_per_page()).min(items.len());
    &items[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::filter::{FilterOption, ALL};
    use crate::grid::record::from_value;
    use serde_json::json;

    fn records(values: Vec<Value>) -> Vec<GridRecord> {
        values.into_iter().filter_map(from_value).collect()
    }

    #[test]
    fn test_dedup_first_position_last_content() {
        let rows = records(vec![
            json!({"id": 1, "name": "A"}),
            json!({"id": 2, "name": "B"}),
            json!({"id": 1, "name": "A2"}),
        ]);
        let unique = deduplicate(&rows, "id");
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0]["name"], "A2");
        assert_eq!(unique[1]["name"], "B");
    }

    #[test]
    fn test_dedup_skipped_when_an_id_is_missing() {
        let rows = records(vec![
            json!({"id": 1, "name": "A"}),
            json!({"id": 1, "name": "A2"}),
            json!({"name": "no id"}),
        ]);
        assert_eq!(deduplicate(&rows, "id").len(), 3);
    }

    #[test]
    fn test_dedup_custom_field() {
        let rows = records(vec![
            json!({"usersrecid": "u1", "n": 1}),
            json!({"usersrecid": "u1", "n": 2}),
        ]);
        let unique = deduplicate(&rows, "usersrecid");
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0]["n"], 2);
    }

    #[test]
    fn test_search() {
        let row = from_value(json!({"name": "Acme Labs", "city": "Pune"})).unwrap();
        let fields = vec!["name".to_string()];
        assert!(matches_search(&row, "acme", &fields));
        assert!(matches_search(&row, "", &fields));
        assert!(!matches_search(&row, "pune", &fields));
        assert!(!matches_search(&row, "acme", &[]));
    }

    #[test]
    fn test_dropdowns() {
        let row = from_value(json!({"sector": "Fintech", "stage": 2})).unwrap();
        let filters = vec![
            DropdownFilterSpec::new("sector", "Sectors", vec![FilterOption::new("Fintech", "Fintech")]),
            DropdownFilterSpec::new("stage", "Stages", vec![]),
        ];

        assert!(matches_dropdowns(&row, &filters, |_| ALL.to_string()));
        assert!(matches_dropdowns(&row, &filters, |f| {
            if f == "sector" { "fintech".into() } else { "2".into() }
        }));
        assert!(!matches_dropdowns(&row, &filters, |f| {
            if f == "sector" { "health".into() } else { ALL.into() }
        }));
    }

    #[test]
    fn test_column_filters() {
        let row = from_value(json!({"name": "Acme", "city": null})).unwrap();
        let mut filters = BTreeMap::new();
        filters.insert("name".to_string(), "CM".to_string());
        assert!(matches_column_filters(&row, &filters));

        filters.insert("city".to_string(), String::new());
        assert!(matches_column_filters(&row, &filters));

        filters.insert("city".to_string(), "x".to_string());
        assert!(!matches_column_filters(&row, &filters));
    }

    #[test]
    fn test_sorting_numeric_and_text() {
        let rows = records(vec![
            json!({"n": 10, "s": "beta"}),
            json!({"n": 9, "s": "Alpha"}),
            json!({"n": 100, "s": "gamma"}),
        ]);
        let mut refs: Vec<&GridRecord> = rows.iter().collect();

        sort_records(&mut refs, &SortModel::new("n", SortDirection::Asc));
        let order: Vec<i64> = refs.iter().map(|r| r["n"].as_i64().unwrap()).collect();
        assert_eq!(order, vec![9, 10, 100]);

        sort_records(&mut refs, &SortModel::new("s", SortDirection::Desc));
        assert_eq!(refs[0]["s"], "gamma");
        assert_eq!(refs[2]["s"], "Alpha");
    }

    #[test]
    fn test_sort_is_stable() {
        let rows = records(vec![
            json!({"k": "a", "i": 0}),
            json!({"k": "a", "i": 1}),
            json!({"k": "A", "i": 2}),
        ]);
        let mut refs: Vec<&GridRecord> = rows.iter().collect();
        sort_records(&mut refs, &SortModel::new("k", SortDirection::Asc));
        let order: Vec<i64> = refs.iter().map(|r| r["i"].as_i64().unwrap()).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_row_ids() {
        let rows = records(vec![
            json!({"usersrecid": 7, "id": 1}),
            json!({"id": "x"}),
            json!({"name": "anon"}),
        ]);
        let refs: Vec<&GridRecord> = rows.iter().collect();
        let ids = assign_row_ids(&refs, "usersrecid");
        assert_eq!(ids[0].id, "7");
        assert_eq!(ids[1].id, "x");
        assert!(ids[2].id.starts_with("row-2-"));
    }

    #[test]
    fn test_paginate() {
        let items: Vec<usize> = (0..25).collect();
        let page = |page, page_size| paginate(&items, PaginationModel { page, page_size }).to_vec();

        assert_eq!(page(0, 10), (0..10).collect::<Vec<_>>());
        assert_eq!(page(2, 10), vec![20, 21, 22, 23, 24]);
        assert!(page(10, 10).is_empty());
        assert_eq!(page(3, 0), vec![3]);
    }
}
