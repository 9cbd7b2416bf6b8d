use crate::api::models::Row;
use crate::charts::ChartSet;
use serde::Serialize;

/// One independent query session: its question, generated SQL, results and
/// chart payloads live here and survive while another tab is active.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tab {
    pub id: u64,
    pub name: String,
    pub question: String,
    pub sql: String,
    /// Whether the last executed statement returned rows (as opposed to a
    /// mutation reporting affected rows).
    pub select_query: bool,
    pub rows: Vec<Row>,
    pub status_message: Option<String>,
    pub charts: ChartSet,
    pub show_results: bool,
    pub show_visualizations: bool,
    pub is_editing_sql: bool,
    pub is_loading: bool,
}

impl Tab {
    fn new(id: u64) -> Tab {
        Tab {
            id,
            name: format!("Query {}", id),
            question: String::new(),
            sql: String::new(),
            select_query: false,
            rows: Vec::new(),
            status_message: None,
            charts: ChartSet::default(),
            show_results: false,
            show_visualizations: false,
            is_editing_sql: false,
            is_loading: false,
        }
    }
}

/// The ordered tab collection. Exactly one tab is active, ids are assigned
/// from a counter that never goes backwards, and the collection never
/// becomes empty.
#[derive(Debug, Clone, Serialize)]
pub struct Tabs {
    tabs: Vec<Tab>,
    active_id: u64,
    #[serde(skip)]
    next_id: u64,
}

impl Tabs {
    pub fn new() -> Tabs {
        Tabs {
            tabs: vec![Tab::new(1)],
            active_id: 1,
            next_id: 2,
        }
    }

    /// Appends a tab with a fresh id and makes it active.
    pub fn add(&mut self) -> Tab {
        let id = self.next_id;
        self.next_id += 1;
        let tab = Tab::new(id);
        self.tabs.push(tab.clone());
        self.active_id = id;
        tab
    }

    /// Removes a tab. Closing the sole remaining tab (or an unknown id) is
    /// a no-op. When the active tab goes away, the last remaining tab
    /// takes over.
    pub fn close(&mut self, id: u64) -> bool {
        if self.tabs.len() == 1 {
            return false;
        }
        let Some(index) = self.tabs.iter().position(|tab| tab.id == id) else {
            return false;
        };
        self.tabs.remove(index);
        if self.active_id == id {
            if let Some(last) = self.tabs.last() {
                self.active_id = last.id;
            }
        }
        true
    }

    /// Moves the active pointer. Unknown ids leave it where it was.
    pub fn activate(&mut self, id: u64) -> bool {
        if self.tabs.iter().any(|tab| tab.id == id) {
            self.active_id = id;
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: u64) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.id == id)
    }

    /// Applies a mutation to the tab with the given id. Returns false when
    /// the tab no longer exists, so callers holding an id captured before
    /// an await point can drop their result instead of touching another
    /// tab's state.
    pub fn update<F>(&mut self, id: u64, apply: F) -> bool
    where
        F: FnOnce(&mut Tab),
    {
        match self.tabs.iter_mut().find(|tab| tab.id == id) {
            Some(tab) => {
                apply(tab);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }
}

impl Default for Tabs {
    fn default() -> Self {
        Tabs::new()
    }
}
