use client::TestQuery;

/// Columns shown when the user has not picked any.
pub const DEFAULT_COLUMNS: [&str; 5] = ["id", "summary", "outcome", "analysis", "resolution"];

/// Session state shared between the table and the action handlers: which
/// rows are selected, which query the table was rendered with, and which
/// columns are visible.
///
/// The frontend equivalents are process-wide observable stores; here the
/// state is one value passed explicitly by reference, which keeps the table
/// logic pure and testable. The selection contract is unchanged: readable
/// synchronously at any time, and reset on every table refresh.
#[derive(Debug, Clone)]
pub struct SessionState {
    selected_ids: Vec<u64>,
    active_query: Option<TestQuery>,
    columns: Vec<String>,
    refresh_pending: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            selected_ids: Vec::new(),
            active_query: None,
            columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            refresh_pending: true,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the ids currently selected in the rendered table.
    pub fn selected_ids(&self) -> &[u64] {
        &self.selected_ids
    }

    pub fn set_selection(&mut self, ids: Vec<u64>) {
        self.selected_ids = ids;
    }

    pub fn toggle_selected(&mut self, id: u64) {
        if let Some(position) = self.selected_ids.iter().position(|&selected| selected == id) {
            self.selected_ids.remove(position);
        } else {
            self.selected_ids.push(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected_ids.clear();
    }

    pub fn active_query(&self) -> Option<&TestQuery> {
        self.active_query.as_ref()
    }

    pub fn set_active_query(&mut self, query: Option<TestQuery>) {
        self.active_query = query;
        self.refresh_pending = true;
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn set_columns(&mut self, columns: Vec<String>) {
        if !columns.is_empty() {
            self.columns = columns;
            self.refresh_pending = true;
        }
    }

    /// Marks the table as stale so the next render re-fetches.
    pub fn request_refresh(&mut self) {
        self.refresh_pending = true;
    }

    /// Consumes the pending-refresh flag.
    pub fn take_refresh(&mut self) -> bool {
        std::mem::take(&mut self.refresh_pending)
    }
}
