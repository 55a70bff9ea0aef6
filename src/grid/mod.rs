//! Tabular data engine
//!
//! Takes an arbitrary list of records plus a declarative grid
//! configuration and produces the rows to display: duplicates collapsed,
//! searched, filtered, sorted, given stable row ids, paginated and
//! rendered per column type. The same filtered set can be exported.

mod column;
mod export;
mod filter;
mod layout;
mod pipeline;
mod record;
mod render;
mod state;

pub use column::{
    ActionDef, CellRenderer, ChipColor, ColumnDef, ColumnKind, ColumnSpec, ColumnType, FieldMatch,
    RowAction, RowPredicate, DEFAULT_WIDTH,
};
pub use export::{
    export_rows, file_name, to_csv, to_xlsx, ExportArtifact, ExportFormat, ExportRow,
    ExportTransform,
};
pub use filter::{
    extract_list, options_from_list, options_from_records, options_from_response, DropdownFilterSpec,
    FilterOption, ALL,
};
pub use layout::GridLayout;
pub use pipeline::{assign_row_ids, deduplicate, paginate, sort_records, GridRow};
pub use record::{field_text, from_value, read_records, value_text, GridRecord};
pub use render::{
    format_date, parse_date, render_cell, ActionButton, CellValue, DATE_FORMAT, EMPTY_CELL,
    EMPTY_CHIP,
};
pub use state::{GridState, PaginationModel, SortDirection, SortModel};

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Shown when no rows survive filtering
pub const EMPTY_MESSAGE: &str = "No data found matching your criteria.";

/// Everything that defines a grid apart from its data
#[derive(Clone)]
pub struct GridSpec {
    pub title: Option<String>,
    pub columns: Vec<ColumnSpec>,
    pub dropdown_filters: Vec<DropdownFilterSpec>,
    pub search_fields: Vec<String>,
    pub search_placeholder: String,
    /// Field used for deduplication and row ids
    pub unique_id_field: String,
    pub enable_export: bool,
    pub enable_column_filters: bool,
    pub export_filename: String,
    pub sheet_name: String,
    pub default_page_size: usize,
    pub page_size_options: Vec<usize>,
    pub export_transform: Option<ExportTransform>,
}

impl GridSpec {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self {
            title: None,
            columns,
            dropdown_filters: Vec::new(),
            search_fields: Vec::new(),
            search_placeholder: "Search...".to_string(),
            unique_id_field: "id".to_string(),
            enable_export: true,
            enable_column_filters: true,
            export_filename: "data".to_string(),
            sheet_name: "Data".to_string(),
            default_page_size: 10,
            page_size_options: vec![5, 10, 25, 50],
            export_transform: None,
        }
    }

    pub fn unique_id_field(mut self, field: &str) -> Self {
        self.unique_id_field = field.to_string();
        self
    }

    pub fn search_fields(mut self, fields: Vec<String>) -> Self {
        self.search_fields = fields;
        self
    }

    pub fn dropdown_filters(mut self, filters: Vec<DropdownFilterSpec>) -> Self {
        self.dropdown_filters = filters;
        self
    }

    pub fn page_sizes(mut self, default_page_size: usize, options: Vec<usize>) -> Self {
        self.default_page_size = default_page_size;
        self.page_size_options = options;
        self
    }

    pub fn export_transform(
        mut self,
        transform: impl Fn(&[&GridRecord]) -> Vec<ExportRow> + Send + Sync + 'static,
    ) -> Self {
        self.export_transform = Some(Arc::new(transform));
        self
    }

    fn column(&self, field: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.field == field)
    }
}

impl fmt::Debug for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridSpec")
            .field("title", &self.title)
            .field("columns", &self.columns)
            .field("dropdown_filters", &self.dropdown_filters)
            .field("search_fields", &self.search_fields)
            .field("unique_id_field", &self.unique_id_field)
            .field("export_filename", &self.export_filename)
            .field("custom_export", &self.export_transform.is_some())
            .finish_non_exhaustive()
    }
}

/// Column header as presented
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnHeader {
    pub field: String,
    pub header_name: String,
    pub width: u32,
    pub sortable: bool,
    pub filterable: bool,
    pub filter_active: bool,
    pub sort: Option<SortDirection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedRow<'a> {
    pub id: String,
    #[serde(skip)]
    pub record: &'a GridRecord,
    pub cells: Vec<CellValue>,
}

/// One page of the grid, ready to display
#[derive(Debug, Clone, Serialize)]
pub struct GridView<'a> {
    pub columns: Vec<ColumnHeader>,
    pub rows: Vec<RenderedRow<'a>>,
    /// Rows surviving the filters, across all pages
    pub total: usize,
    pub pagination: PaginationModel,
    pub has_active_filters: bool,
}

impl GridView<'_> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.pagination.page_count(self.total)
    }

    /// "Showing A to B of N entries"
    pub fn summary(&self) -> String {
        if self.rows.is_empty() {
            return format!("Showing 0 to 0 of {} entries", self.total);
        }
        let start = self.pagination.offset() + 1;
        let end = self.pagination.offset() + self.rows.len();
        format!("Showing {} to {} of {} entries", start, end, self.total)
    }
}

/// Records plus grid configuration plus interactive state
#[derive(Debug, Clone)]
pub struct DataGrid {
    spec: GridSpec,
    records: Vec<GridRecord>,
    state: GridState,
}

impl DataGrid {
    pub fn new(spec: GridSpec, records: Vec<GridRecord>) -> Self {
        let state = GridState::new(&spec.dropdown_filters, spec.default_page_size);
        Self {
            spec,
            records,
            state,
        }
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn records(&self) -> &[GridRecord] {
        &self.records
    }

    /// Replace the data, keeping search, filters and pagination
    pub fn set_records(&mut self, records: Vec<GridRecord>) {
        self.records = records;
    }

    pub fn state(&self) -> &GridState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GridState {
        &mut self.state
    }

    /// The filter with its options filled in. Filters configured without
    /// options are offered the distinct values found in the data.
    pub fn resolved_filter(&self, filter: &DropdownFilterSpec) -> DropdownFilterSpec {
        if !filter.options.is_empty() {
            return filter.clone();
        }
        let unique = deduplicate(&self.records, &self.spec.unique_id_field);
        DropdownFilterSpec {
            options: options_from_records(unique, &filter.field),
            ..filter.clone()
        }
    }

    /// Menu of a dropdown filter, led by the "all" entry
    pub fn dropdown_menu(&self, filter: &DropdownFilterSpec) -> Vec<FilterOption> {
        self.resolved_filter(filter).menu()
    }

    /// Deduplicated, filtered and sorted records (all pages)
    pub fn filtered(&self) -> Vec<&GridRecord> {
        let spec = &self.spec;
        let state = &self.state;

        let mut rows: Vec<&GridRecord> = deduplicate(&self.records, &spec.unique_id_field)
            .into_iter()
            .filter(|r| pipeline::matches_search(r, state.search_term(), &spec.search_fields))
            .filter(|r| {
                pipeline::matches_dropdowns(r, &spec.dropdown_filters, |field| {
                    state.dropdown_value(field).to_string()
                })
            })
            .filter(|r| pipeline::matches_column_filters(r, state.column_filters()))
            .collect();

        if let Some(sort) = state.sort() {
            match spec.column(&sort.field) {
                Some(column) if column.is_sortable() => sort_records(&mut rows, sort),
                _ => tracing::debug!(field = %sort.field, "Ignoring sort on a non-sortable field"),
            }
        }

        rows
    }

    /// Current page, rendered
    pub fn view(&self) -> GridView<'_> {
        let filtered = self.filtered();
        let total = filtered.len();
        let with_ids = assign_row_ids(&filtered, &self.spec.unique_id_field);
        let pagination = self.state.pagination();

        let rows = paginate(&with_ids, pagination)
            .iter()
            .map(|row| RenderedRow {
                id: row.id.clone(),
                record: row.record,
                cells: self
                    .spec
                    .columns
                    .iter()
                    .map(|c| render_cell(c, row.record))
                    .collect(),
            })
            .collect();

        let sort = self.state.sort();
        let columns = self
            .spec
            .columns
            .iter()
            .map(|c| ColumnHeader {
                field: c.field.clone(),
                header_name: c.header_name.clone(),
                width: c.width,
                sortable: c.is_sortable(),
                filterable: self.spec.enable_column_filters && c.is_filterable(),
                filter_active: !self.state.column_filter(&c.field).is_empty(),
                sort: sort.filter(|s| s.field == c.field).map(|s| s.direction),
            })
            .collect();

        GridView {
            columns,
            rows,
            total,
            pagination,
            has_active_filters: self.state.has_active_filters(),
        }
    }

    /// Export rows for the whole filtered set, not just the current page
    pub fn export_rows(&self) -> Vec<ExportRow> {
        let filtered = self.filtered();
        match &self.spec.export_transform {
            Some(transform) => transform(&filtered),
            None => export_rows(&filtered, &self.spec.columns),
        }
    }

    /// Encode the filtered set; spreadsheet failures fall back to CSV
    pub fn export(&self, format: ExportFormat, date: NaiveDate) -> ExportArtifact {
        let rows = self.export_rows();
        tracing::info!(rows = rows.len(), format = ?format, "Exporting grid");
        export::export(
            &rows,
            format,
            &self.spec.export_filename,
            &self.spec.sheet_name,
            date,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn records(values: Vec<Value>) -> Vec<GridRecord> {
        values.into_iter().filter_map(from_value).collect()
    }

    fn company_grid() -> DataGrid {
        let spec = GridSpec::new(vec![
            ColumnSpec::text("name", "Name"),
            ColumnSpec::text("sector", "Sector"),
            ColumnSpec::date("created", "Created"),
            ColumnSpec::actions("actions", "Actions", vec![RowAction::new("View")]),
        ])
        .search_fields(vec!["name".into()])
        .dropdown_filters(vec![DropdownFilterSpec::new("sector", "Sectors", vec![])]);

        let data = records(vec![
            json!({"id": 1, "name": "Acme", "sector": "Fintech", "created": "2024-01-15"}),
            json!({"id": 2, "name": "Beta", "sector": "Health", "created": "2024-02-01"}),
            json!({"id": 1, "name": "Acme Corp", "sector": "Fintech", "created": "2024-01-15"}),
        ]);

        DataGrid::new(spec, data)
    }

    #[test]
    fn test_end_to_end_search_and_filter() {
        let mut grid = company_grid();
        grid.state_mut().set_search("ac");
        grid.state_mut().select_dropdown("sector", "Fintech");

        let view = grid.view();
        assert_eq!(view.total, 1);
        assert_eq!(view.rows[0].id, "1");
        assert_eq!(view.rows[0].cells[0].display_text(), "Acme Corp");
        assert_eq!(view.rows[0].cells[2].display_text(), "01/15/2024");
        assert_eq!(view.summary(), "Showing 1 to 1 of 1 entries");
        assert!(view.has_active_filters);
    }

    #[test]
    fn test_stage_filter_over_duplicates() {
        let spec = GridSpec::new(vec![
            ColumnSpec::text("name", "Name"),
            ColumnSpec::chip("stage", "Stage"),
        ])
        .dropdown_filters(vec![DropdownFilterSpec::new(
            "stage",
            "Stages",
            vec![FilterOption::new("1", "Idea"), FilterOption::new("2", "Growth")],
        )]);
        let data = records(vec![
            json!({"id": 1, "name": "Acme", "stage": 2}),
            json!({"id": 1, "name": "Acme", "stage": 2}),
            json!({"id": 2, "name": "Beta", "stage": 1}),
        ]);
        let mut grid = DataGrid::new(spec, data);

        let ids: Vec<String> = grid.view().rows.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["1", "2"]);

        grid.state_mut().select_dropdown("stage", "2");
        let ids: Vec<String> = grid.view().rows.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[test]
    fn test_dedup_preserves_first_position() {
        let grid = company_grid();
        let view = grid.view();
        assert_eq!(view.total, 2);
        assert_eq!(view.rows[0].record["name"], "Acme Corp");
        assert_eq!(view.rows[1].record["name"], "Beta");
    }

    #[test]
    fn test_pagination_summary_and_out_of_range() {
        let data = records((0..25).map(|i| json!({"id": i, "name": format!("Co {}", i)})).collect());
        let mut grid = DataGrid::new(GridSpec::new(vec![ColumnSpec::text("name", "Name")]), data);

        grid.state_mut().set_page(2);
        let view = grid.view();
        assert_eq!(view.rows.len(), 5);
        assert_eq!(view.summary(), "Showing 21 to 25 of 25 entries");
        assert_eq!(view.page_count(), 3);

        grid.state_mut().set_page(10);
        let view = grid.view();
        assert!(view.is_empty());
        assert_eq!(view.summary(), "Showing 0 to 0 of 25 entries");
    }

    #[test]
    fn test_sorting_only_on_sortable_columns() {
        let mut grid = company_grid();
        grid.state_mut()
            .set_sort(Some(SortModel::new("name", SortDirection::Desc)));
        let view = grid.view();
        assert_eq!(view.rows[0].record["name"], "Beta");
        assert_eq!(view.columns[0].sort, Some(SortDirection::Desc));

        grid.state_mut()
            .set_sort(Some(SortModel::new("actions", SortDirection::Desc)));
        assert_eq!(grid.view().rows[0].record["name"], "Acme Corp");
    }

    #[test]
    fn test_column_headers() {
        let mut grid = company_grid();
        grid.state_mut().set_column_filter("sector", "fin");
        let view = grid.view();

        assert!(view.columns[1].filter_active);
        assert!(!view.columns[3].sortable);
        assert!(!view.columns[3].filterable);
        assert_eq!(view.total, 1);
    }

    #[test]
    fn test_derived_dropdown_menu() {
        let grid = company_grid();
        let filter = &grid.spec().dropdown_filters[0];
        let menu = grid.dropdown_menu(filter);

        let labels: Vec<String> = menu.iter().map(FilterOption::display_label).collect();
        assert_eq!(labels, vec!["All Sectors", "Fintech (1)", "Health (1)"]);
    }

    #[test]
    fn test_resolved_filter_accepts_derived_values() {
        let grid = company_grid();
        let resolved = grid.resolved_filter(&grid.spec().dropdown_filters[0]);
        assert!(resolved.accepts("health"));
        assert!(resolved.accepts(ALL));
        assert!(!resolved.accepts("Energy"));
    }

    #[test]
    fn test_empty_result() {
        let mut grid = company_grid();
        grid.state_mut().set_search("zzz");
        let view = grid.view();
        assert!(view.is_empty());
        assert_eq!(view.total, 0);
        assert_eq!(view.summary(), "Showing 0 to 0 of 0 entries");
    }

    #[test]
    fn test_export_covers_all_pages() {
        let data = records((0..12).map(|i| json!({"id": i, "name": format!("Co {}", i)})).collect());
        let mut grid = DataGrid::new(GridSpec::new(vec![ColumnSpec::text("name", "Name")]), data);
        grid.state_mut().set_page_size(5);

        assert_eq!(grid.view().rows.len(), 5);
        assert_eq!(grid.export_rows().len(), 12);
    }

    #[test]
    fn test_export_transform_and_naming() {
        let spec = GridSpec::new(vec![ColumnSpec::text("name", "Name")]).export_transform(|rows| {
            rows.iter()
                .map(|r| vec![("Company".to_string(), field_text(r, "name").to_uppercase())])
                .collect()
        });
        let mut spec = spec;
        spec.export_filename = "companies".into();

        let grid = DataGrid::new(spec, records(vec![json!({"id": 1, "name": "acme"})]));
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let artifact = grid.export(ExportFormat::Csv, date);

        assert_eq!(artifact.file_name, "companies_2024-03-05.csv");
        assert_eq!(String::from_utf8(artifact.bytes).unwrap(), "Company\nACME");
    }

    #[test]
    fn test_filters_survive_new_records() {
        let mut grid = company_grid();
        grid.state_mut().set_search("beta");
        grid.set_records(records(vec![
            json!({"id": 9, "name": "Beta Two"}),
            json!({"id": 8, "name": "Gamma"}),
        ]));
        assert_eq!(grid.view().total, 1);
    }
}
