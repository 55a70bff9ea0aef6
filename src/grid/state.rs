//! Interactive grid state
//!
//! Every change to the search term, a dropdown or a column filter moves
//! the grid back to the first page.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::filter::{DropdownFilterSpec, ALL};

/// Current page (0-based) and page size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationModel {
    pub page: usize,
    pub page_size: usize,
}

impl PaginationModel {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 0,
            page_size: page_size.max(1),
        }
    }

    /// Page size used for slicing; a deserialized zero counts as one row
    pub fn rows_per_page(&self) -> usize {
        self.page_size.max(1)
    }

    /// Offset of the first row on the current page
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.rows_per_page())
    }

    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.rows_per_page())
    }
}

impl Default for PaginationModel {
    fn default() -> Self {
        Self::new(10)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("Unknown sort direction '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortModel {
    pub field: String,
    pub direction: SortDirection,
}

impl SortModel {
    pub fn new(field: &str, direction: SortDirection) -> Self {
        Self {
            field: field.to_string(),
            direction,
        }
    }
}

/// Search, filter, sort and pagination state of one grid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridState {
    search_term: String,
    dropdown_values: BTreeMap<String, String>,
    column_filters: BTreeMap<String, String>,
    open_filter: Option<String>,
    sort: Option<SortModel>,
    pagination: PaginationModel,
}

impl GridState {
    /// Fresh state: every dropdown on "all", nothing searched
    pub fn new(dropdowns: &[DropdownFilterSpec], page_size: usize) -> Self {
        Self {
            dropdown_values: dropdowns
                .iter()
                .map(|d| (d.field.clone(), ALL.to_string()))
                .collect(),
            pagination: PaginationModel::new(page_size),
            ..Default::default()
        }
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn set_search(&mut self, term: &str) {
        self.search_term = term.to_string();
        self.reset_page();
    }

    /// Selected value of a dropdown (`"all"` when untouched)
    pub fn dropdown_value(&self, field: &str) -> &str {
        self.dropdown_values.get(field).map(String::as_str).unwrap_or(ALL)
    }

    pub fn select_dropdown(&mut self, field: &str, value: &str) {
        self.dropdown_values.insert(field.to_string(), value.to_string());
        self.reset_page();
    }

    pub fn column_filter(&self, field: &str) -> &str {
        self.column_filters.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn column_filters(&self) -> &BTreeMap<String, String> {
        &self.column_filters
    }

    /// Set the substring filter of a column; an empty value removes it
    pub fn set_column_filter(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            self.column_filters.remove(field);
        } else {
            self.column_filters.insert(field.to_string(), value.to_string());
        }
        self.reset_page();
    }

    /// Column whose filter popover is open
    pub fn open_filter(&self) -> Option<&str> {
        self.open_filter.as_deref()
    }

    pub fn open_column_filter(&mut self, field: &str) {
        self.open_filter = Some(field.to_string());
    }

    pub fn close_column_filter(&mut self) {
        self.open_filter = None;
    }

    /// Edit the filter of the open column; no-op when none is open
    pub fn edit_open_filter(&mut self, value: &str) {
        if let Some(field) = self.open_filter.clone() {
            self.set_column_filter(&field, value);
        }
    }

    /// Clear the open column's filter and close the popover
    pub fn clear_open_filter(&mut self) {
        if let Some(field) = self.open_filter.take() {
            self.set_column_filter(&field, "");
        }
    }

    /// Reset search, dropdowns and column filters
    pub fn clear_all(&mut self) {
        self.search_term.clear();
        for value in self.dropdown_values.values_mut() {
            *value = ALL.to_string();
        }
        self.column_filters.clear();
        self.open_filter = None;
        self.reset_page();
    }

    pub fn has_active_filters(&self) -> bool {
        !self.search_term.is_empty()
            || self.dropdown_values.values().any(|v| v != ALL)
            || self.column_filters.values().any(|v| !v.is_empty())
    }

    pub fn sort(&self) -> Option<&SortModel> {
        self.sort.as_ref()
    }

    pub fn set_sort(&mut self, sort: Option<SortModel>) {
        self.sort = sort;
    }

    pub fn pagination(&self) -> PaginationModel {
        self.pagination
    }

    pub fn set_page(&mut self, page: usize) {
        self.pagination.page = page;
    }

    /// Change the page size and return to the first page
    pub fn set_page_size(&mut self, page_size: usize) {
        self.pagination = PaginationModel::new(page_size);
    }

    fn reset_page(&mut self) {
        self.pagination.page = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GridState {
        let dropdowns = vec![DropdownFilterSpec::new("sector", "Sectors", vec![])];
        GridState::new(&dropdowns, 10)
    }

    #[test]
    fn test_initial_state() {
        let s = state();
        assert_eq!(s.dropdown_value("sector"), ALL);
        assert_eq!(s.dropdown_value("unknown"), ALL);
        assert!(!s.has_active_filters());
        assert_eq!(s.pagination(), PaginationModel { page: 0, page_size: 10 });
    }

    #[test]
    fn test_zero_page_size_from_serde() {
        let model: PaginationModel = serde_json::from_str(r#"{"page": 2, "page_size": 0}"#).unwrap();
        assert_eq!(model.rows_per_page(), 1);
        assert_eq!(model.offset(), 2);
        assert_eq!(model.page_count(5), 5);
        assert_eq!(model.page_count(0), 0);
    }

    #[test]
    fn test_filter_changes_reset_page() {
        let mut s = state();

        s.set_page(3);
        s.set_search("acme");
        assert_eq!(s.pagination().page, 0);

        s.set_page(3);
        s.select_dropdown("sector", "Fintech");
        assert_eq!(s.pagination().page, 0);

        s.set_page(3);
        s.set_column_filter("name", "ac");
        assert_eq!(s.pagination().page, 0);
        assert!(s.has_active_filters());
    }

    #[test]
    fn test_popover_flow() {
        let mut s = state();
        s.edit_open_filter("ignored");
        assert!(s.column_filters().is_empty());

        s.open_column_filter("name");
        s.edit_open_filter("ac");
        assert_eq!(s.column_filter("name"), "ac");
        s.close_column_filter();
        assert_eq!(s.column_filter("name"), "ac");

        s.open_column_filter("name");
        s.set_page(2);
        s.clear_open_filter();
        assert_eq!(s.column_filter("name"), "");
        assert_eq!(s.open_filter(), None);
        assert_eq!(s.pagination().page, 0);
    }

    #[test]
    fn test_clear_all() {
        let mut s = state();
        s.set_search("x");
        s.select_dropdown("sector", "Health");
        s.set_column_filter("name", "y");
        s.set_page(4);
        s.clear_all();

        assert!(!s.has_active_filters());
        assert_eq!(s.dropdown_value("sector"), ALL);
        assert_eq!(s.pagination().page, 0);
    }

    #[test]
    fn test_page_size_change() {
        let mut s = state();
        s.set_page(2);
        s.set_page_size(25);
        assert_eq!(s.pagination(), PaginationModel { page: 0, page_size: 25 });
        s.set_page_size(0);
        assert_eq!(s.pagination().page_size, 1);
    }

    #[test]
    fn test_pagination_math() {
        let p = PaginationModel { page: 2, page_size: 10 };
        assert_eq!(p.offset(), 20);
        assert_eq!(p.page_count(25), 3);
        assert_eq!(p.page_count(0), 0);
    }

    #[test]
    fn test_sort_direction_parse() {
        assert_eq!("DESC".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert!("up".parse::<SortDirection>().is_err());
    }
}
