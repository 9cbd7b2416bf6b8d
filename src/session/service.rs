use crate::api::models::{
    DbConfig, ExecuteSqlRequest, ExecuteSqlResponse, GenerateSqlRequest, Row, SchemaSnapshot,
    VisualizationRequest,
};
use crate::api::sqltext::sanitize_generated_sql;
use crate::api::InsightsApi;
use crate::charts::ChartSet;
use crate::connection::ConnectionStore;
use crate::export::rows_to_csv;
use crate::session::tabs::{Tab, Tabs};
use crate::session::ConsoleError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Fields a tab edit request may carry. Absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
pub struct TabPatch {
    pub question: Option<String>,
    pub sql: Option<String>,
    pub is_editing_sql: Option<bool>,
    pub show_visualizations: Option<bool>,
}

/// What a finished execution call amounted to.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The statement returned rows.
    RowSet { row_count: usize },
    /// The statement mutated data and reported a count.
    Mutation { affected_rows: u64, notice: String },
    /// The service acknowledged the statement without rows or a count.
    Acknowledged { notice: String },
    /// The statement hit a missing schema object and a corrected query was
    /// generated in its place; nothing was executed.
    Regenerated { notice: String },
}

#[derive(Debug, Serialize)]
pub struct ExecutionReport {
    #[serde(flatten)]
    pub outcome: ExecutionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization_error: Option<String>,
    pub tab: Tab,
}

/// The session state manager. Owns the tab collection and the shared
/// schema snapshot, and sequences every interaction with the remote
/// generation, execution and visualization contracts.
///
/// Results coming back from a remote call are applied through the tab id
/// captured before the call went out, so a slow response for a tab the
/// user has since closed is dropped instead of landing on whichever tab
/// happens to be active.
pub struct QueryConsole {
    backend: Arc<dyn InsightsApi>,
    connections: Arc<ConnectionStore>,
    tabs: RwLock<Tabs>,
    schema: RwLock<SchemaSnapshot>,
}

impl QueryConsole {
    pub fn new(backend: Arc<dyn InsightsApi>, connections: Arc<ConnectionStore>) -> QueryConsole {
        QueryConsole {
            backend,
            connections,
            tabs: RwLock::new(Tabs::new()),
            schema: RwLock::new(SchemaSnapshot::new()),
        }
    }

    pub async fn tabs_view(&self) -> Tabs {
        self.tabs.read().await.clone()
    }

    pub async fn tab_count(&self) -> usize {
        self.tabs.read().await.len()
    }

    pub async fn schema(&self) -> SchemaSnapshot {
        self.schema.read().await.clone()
    }

    pub async fn add_tab(&self) -> Tab {
        self.tabs.write().await.add()
    }

    pub async fn close_tab(&self, id: u64) -> bool {
        self.tabs.write().await.close(id)
    }

    pub async fn activate_tab(&self, id: u64) -> bool {
        self.tabs.write().await.activate(id)
    }

    pub async fn patch_tab(&self, id: u64, patch: TabPatch) -> Result<Tab, ConsoleError> {
        let mut tabs = self.tabs.write().await;
        let applied = tabs.update(id, |tab| {
            if let Some(question) = patch.question {
                tab.question = question;
            }
            if let Some(sql) = patch.sql {
                tab.sql = sql;
            }
            if let Some(editing) = patch.is_editing_sql {
                tab.is_editing_sql = editing;
            }
            if let Some(show) = patch.show_visualizations {
                tab.show_visualizations = show;
            }
        });
        if !applied {
            return Err(ConsoleError::TabNotFound(id));
        }
        tabs.get(id).cloned().ok_or(ConsoleError::TabNotFound(id))
    }

    /// Turns a natural-language question into SQL on the given tab.
    pub async fn generate(&self, tab_id: u64, question: String) -> Result<Tab, ConsoleError> {
        self.generate_with_context(tab_id, question, None).await
    }

    async fn generate_with_context(
        &self,
        tab_id: u64,
        question: String,
        error_context: Option<String>,
    ) -> Result<Tab, ConsoleError> {
        let db_config = self.require_connection()?;

        let started = {
            let mut tabs = self.tabs.write().await;
            tabs.update(tab_id, |tab| {
                tab.question = question.clone();
                tab.is_loading = true;
            })
        };
        if !started {
            return Err(ConsoleError::TabNotFound(tab_id));
        }

        let request = GenerateSqlRequest {
            natural_language: question,
            db_config,
            error: error_context,
        };

        match self.backend.generate_sql(&request).await {
            Ok(response) => {
                let sql = sanitize_generated_sql(&response.sql_query);
                info!("Generated SQL for tab {}: {}", tab_id, sql);
                *self.schema.write().await = response.schema;

                let mut tabs = self.tabs.write().await;
                let applied = tabs.update(tab_id, |tab| {
                    tab.sql = sql;
                    tab.show_results = true;
                    tab.is_loading = false;
                });
                if !applied {
                    debug!("Dropping generation result for closed tab {}", tab_id);
                    return Err(ConsoleError::TabNotFound(tab_id));
                }
                tabs.get(tab_id)
                    .cloned()
                    .ok_or(ConsoleError::TabNotFound(tab_id))
            }
            Err(e) => {
                // The tab keeps whatever SQL and results it had, but the
                // results pane opens so the user sees the empty state.
                let mut tabs = self.tabs.write().await;
                tabs.update(tab_id, |tab| {
                    tab.show_results = true;
                    tab.is_loading = false;
                });
                Err(ConsoleError::Generation(e))
            }
        }
    }

    /// Runs the tab's current SQL against the execution contract.
    pub async fn execute(&self, tab_id: u64) -> Result<ExecutionReport, ConsoleError> {
        let (sql, question) = {
            let tabs = self.tabs.read().await;
            let tab = tabs.get(tab_id).ok_or(ConsoleError::TabNotFound(tab_id))?;
            (tab.sql.trim().to_string(), tab.question.clone())
        };
        if sql.is_empty() {
            return Err(ConsoleError::NoQueryToRun);
        }
        let db_config = self.require_connection()?;

        {
            let mut tabs = self.tabs.write().await;
            tabs.update(tab_id, |tab| tab.is_loading = true);
        }

        let request = ExecuteSqlRequest {
            query: sql,
            db_config,
        };

        match self.backend.execute_sql(&request).await {
            Ok(response) => self.apply_execution(tab_id, response).await,
            Err(e) if e.is_missing_relation() => {
                // The statement named a schema object the database does not
                // have. Feed the error text back to generation once so it
                // can produce a corrected query; the user re-fires manually.
                warn!(
                    "Execution hit a missing relation, regenerating: {}",
                    e.message()
                );
                let error_text = e.message().to_string();
                {
                    let mut tabs = self.tabs.write().await;
                    tabs.update(tab_id, |tab| tab.is_loading = false);
                }
                let tab = self
                    .generate_with_context(tab_id, question, Some(error_text))
                    .await?;
                Ok(ExecutionReport {
                    outcome: ExecutionOutcome::Regenerated {
                        notice: "The query referenced an object that does not exist, so a \
                                 corrected query was generated. Review it and run again."
                            .to_string(),
                    },
                    visualization_error: None,
                    tab,
                })
            }
            Err(e) => {
                let mut tabs = self.tabs.write().await;
                tabs.update(tab_id, |tab| tab.is_loading = false);
                Err(ConsoleError::Execution(e))
            }
        }
    }

    async fn apply_execution(
        &self,
        tab_id: u64,
        response: ExecuteSqlResponse,
    ) -> Result<ExecutionReport, ConsoleError> {
        if let Some(rows) = response.results {
            let row_count = rows.len();
            let applied = {
                let mut tabs = self.tabs.write().await;
                tabs.update(tab_id, |tab| {
                    tab.rows = rows.clone();
                    tab.select_query = true;
                    tab.status_message = None;
                    tab.show_results = true;
                    tab.is_loading = false;
                })
            };
            if !applied {
                debug!("Dropping execution result for closed tab {}", tab_id);
                return Err(ConsoleError::TabNotFound(tab_id));
            }

            // Visualizations are best-effort: a failure here leaves the
            // rows in place and only surfaces a notice.
            let visualization_error = if row_count > 0 {
                self.refresh_visualizations(tab_id, &rows)
                    .await
                    .err()
                    .map(|e| e.to_string())
            } else {
                None
            };

            let tab = self.tab_snapshot(tab_id).await?;
            Ok(ExecutionReport {
                outcome: ExecutionOutcome::RowSet { row_count },
                visualization_error,
                tab,
            })
        } else if let Some(affected) = response.affected_rows {
            let notice = format!("Database updated: {} rows affected", affected);
            self.finish_without_rows(tab_id, notice.clone()).await?;
            let tab = self.tab_snapshot(tab_id).await?;
            Ok(ExecutionReport {
                outcome: ExecutionOutcome::Mutation {
                    affected_rows: affected,
                    notice,
                },
                visualization_error: None,
                tab,
            })
        } else {
            let notice = "Query executed successfully".to_string();
            self.finish_without_rows(tab_id, notice.clone()).await?;
            let tab = self.tab_snapshot(tab_id).await?;
            Ok(ExecutionReport {
                outcome: ExecutionOutcome::Acknowledged { notice },
                visualization_error: None,
                tab,
            })
        }
    }

    async fn finish_without_rows(
        &self,
        tab_id: u64,
        message: String,
    ) -> Result<(), ConsoleError> {
        let mut tabs = self.tabs.write().await;
        let applied = tabs.update(tab_id, |tab| {
            tab.rows = Vec::new();
            tab.select_query = false;
            tab.status_message = Some(message);
            tab.show_results = true;
            tab.is_loading = false;
        });
        if applied {
            Ok(())
        } else {
            debug!("Dropping execution result for closed tab {}", tab_id);
            Err(ConsoleError::TabNotFound(tab_id))
        }
    }

    /// Asks the visualization contract for chart payloads over a row set
    /// and replaces the tab's chart state with the response. Empty row
    /// sets are a no-op.
    pub async fn refresh_visualizations(
        &self,
        tab_id: u64,
        rows: &[Row],
    ) -> Result<(), ConsoleError> {
        if rows.is_empty() {
            return Ok(());
        }
        let request = VisualizationRequest {
            dataset: rows.to_vec(),
        };
        let response = self
            .backend
            .generate_visualizations(&request)
            .await
            .map_err(ConsoleError::Visualization)?;

        let charts = ChartSet::from_specs(&response.visualizations);
        if charts.is_empty() {
            debug!("Visualization response held no usable charts for tab {}", tab_id);
        }
        let mut tabs = self.tabs.write().await;
        if !tabs.update(tab_id, |tab| tab.charts = charts) {
            debug!("Dropping visualization result for closed tab {}", tab_id);
        }
        Ok(())
    }

    /// Renders the tab's current rows as a CSV document.
    pub async fn export_csv(&self, tab_id: u64) -> Result<Vec<u8>, ConsoleError> {
        let rows = {
            let tabs = self.tabs.read().await;
            let tab = tabs.get(tab_id).ok_or(ConsoleError::TabNotFound(tab_id))?;
            tab.rows.clone()
        };
        Ok(rows_to_csv(&rows)?)
    }

    async fn tab_snapshot(&self, tab_id: u64) -> Result<Tab, ConsoleError> {
        self.tabs
            .read()
            .await
            .get(tab_id)
            .cloned()
            .ok_or(ConsoleError::TabNotFound(tab_id))
    }

    fn require_connection(&self) -> Result<DbConfig, ConsoleError> {
        let profile = self
            .connections
            .current()?
            .ok_or(ConsoleError::ConfigurationMissing)?;
        Ok(profile.db_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{ExecuteSqlResponse, GenerateSqlResponse, VisualizationResponse};
    use crate::api::ApiError;
    use crate::connection::ConnectionProfile;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    #[derive(Debug, PartialEq)]
    enum Call {
        Generate { error_context: Option<String> },
        Execute,
        Visualize,
    }

    #[derive(Default)]
    struct ScriptedApi {
        generate: Mutex<VecDeque<Result<GenerateSqlResponse, ApiError>>>,
        execute: Mutex<VecDeque<Result<ExecuteSqlResponse, ApiError>>>,
        visualize: Mutex<VecDeque<Result<VisualizationResponse, ApiError>>>,
        log: Mutex<Vec<Call>>,
    }

    impl ScriptedApi {
        fn call_names(&self) -> Vec<&'static str> {
            self.log
                .lock()
                .unwrap()
                .iter()
                .map(|call| match call {
                    Call::Generate { .. } => "generate",
                    Call::Execute => "execute",
                    Call::Visualize => "visualize",
                })
                .collect()
        }
    }

    #[async_trait]
    impl InsightsApi for ScriptedApi {
        async fn generate_sql(
            &self,
            request: &GenerateSqlRequest,
        ) -> Result<GenerateSqlResponse, ApiError> {
            self.log.lock().unwrap().push(Call::Generate {
                error_context: request.error.clone(),
            });
            self.generate
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected generate_sql call")
        }

        async fn execute_sql(
            &self,
            _request: &ExecuteSqlRequest,
        ) -> Result<ExecuteSqlResponse, ApiError> {
            self.log.lock().unwrap().push(Call::Execute);
            self.execute
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected execute_sql call")
        }

        async fn generate_visualizations(
            &self,
            _request: &VisualizationRequest,
        ) -> Result<VisualizationResponse, ApiError> {
            self.log.lock().unwrap().push(Call::Visualize);
            self.visualize
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected generate_visualizations call")
        }
    }

    fn profile() -> ConnectionProfile {
        ConnectionProfile {
            name: "Local movies".to_string(),
            host: "localhost".to_string(),
            port: "5432".to_string(),
            database: "movies".to_string(),
            username: "reader".to_string(),
            password: "pw".to_string(),
            saved_at: Utc::now(),
        }
    }

    fn console(
        api: Arc<ScriptedApi>,
        connected: bool,
    ) -> (QueryConsole, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ConnectionStore::new(dir.path()));
        if connected {
            store.save(&profile()).unwrap();
        }
        (QueryConsole::new(api, store), dir)
    }

    fn generated(sql: &str) -> GenerateSqlResponse {
        serde_json::from_value(json!({
            "sql_query": sql,
            "schema": {"public": {"movies": [{"column_name": "title", "data_type": "text"}]}}
        }))
        .unwrap()
    }

    fn row_results(rows: serde_json::Value) -> ExecuteSqlResponse {
        serde_json::from_value(json!({ "results": rows })).unwrap()
    }

    fn bar_visualizations() -> VisualizationResponse {
        serde_json::from_value(json!({
            "visualizations": [{
                "type": "bar",
                "data": {"xlabel": "title", "ylabel": "count", "xvalues": ["a"], "yvalues": [1]}
            }]
        }))
        .unwrap()
    }

    fn no_visualizations() -> VisualizationResponse {
        serde_json::from_value(json!({ "visualizations": [] })).unwrap()
    }

    async fn seed_sql(console: &QueryConsole, tab_id: u64, sql: &str) {
        console
            .patch_tab(
                tab_id,
                TabPatch {
                    sql: Some(sql.to_string()),
                    ..TabPatch::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn generate_stores_sanitized_sql_and_replaces_schema() {
        let api = Arc::new(ScriptedApi::default());
        api.generate
            .lock()
            .unwrap()
            .push_back(Ok(generated("```sql\nSELECT \\_id FROM t\n```")));
        let (console, _dir) = console(api.clone(), true);

        let tab = console.generate(1, "count movies".to_string()).await.unwrap();

        assert_eq!(tab.sql, "SELECT _id FROM t");
        assert_eq!(tab.question, "count movies");
        assert!(tab.show_results);
        assert!(!tab.is_loading);
        assert!(console.schema().await.contains_key("public"));
    }

    #[tokio::test]
    async fn generation_leaves_edit_mode_untouched() {
        let api = Arc::new(ScriptedApi::default());
        api.generate.lock().unwrap().push_back(Ok(generated("SELECT 1")));
        let (console, _dir) = console(api.clone(), true);
        console
            .patch_tab(
                1,
                TabPatch {
                    is_editing_sql: Some(true),
                    ..TabPatch::default()
                },
            )
            .await
            .unwrap();

        let tab = console.generate(1, "count movies".to_string()).await.unwrap();

        assert_eq!(tab.sql, "SELECT 1");
        assert!(tab.is_editing_sql);
    }

    #[tokio::test]
    async fn generate_without_a_connection_makes_no_network_call() {
        let api = Arc::new(ScriptedApi::default());
        let (console, _dir) = console(api.clone(), false);

        let err = console
            .generate(1, "count movies".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, ConsoleError::ConfigurationMissing));
        assert!(api.call_names().is_empty());
    }

    #[tokio::test]
    async fn failed_generation_keeps_the_sql_and_still_shows_results() {
        let api = Arc::new(ScriptedApi::default());
        api.generate.lock().unwrap().push_back(Err(ApiError::ResponseError {
            status: 500,
            message: "model unavailable".to_string(),
        }));
        let (console, _dir) = console(api.clone(), true);
        seed_sql(&console, 1, "SELECT 1").await;

        let err = console.generate(1, "anything".to_string()).await.unwrap_err();

        assert!(matches!(err, ConsoleError::Generation(_)));
        let tabs = console.tabs_view().await;
        let tab = tabs.get(1).unwrap();
        assert_eq!(tab.sql, "SELECT 1");
        assert!(tab.show_results);
        assert!(!tab.is_loading);
    }

    #[tokio::test]
    async fn generate_for_an_unknown_tab_is_rejected() {
        let api = Arc::new(ScriptedApi::default());
        let (console, _dir) = console(api.clone(), true);

        let err = console.generate(99, "q".to_string()).await.unwrap_err();

        assert!(matches!(err, ConsoleError::TabNotFound(99)));
        assert!(api.call_names().is_empty());
    }

    #[tokio::test]
    async fn execute_with_empty_sql_is_rejected() {
        let api = Arc::new(ScriptedApi::default());
        let (console, _dir) = console(api.clone(), true);

        let err = console.execute(1).await.unwrap_err();

        assert!(matches!(err, ConsoleError::NoQueryToRun));
        assert!(api.call_names().is_empty());
    }

    #[tokio::test]
    async fn execute_stores_rows_and_requests_visualizations() {
        let api = Arc::new(ScriptedApi::default());
        api.execute
            .lock()
            .unwrap()
            .push_back(Ok(row_results(json!([{"title": "Heat"}, {"title": "Ronin"}]))));
        api.visualize.lock().unwrap().push_back(Ok(bar_visualizations()));
        let (console, _dir) = console(api.clone(), true);
        seed_sql(&console, 1, "SELECT title FROM movies").await;

        let report = console.execute(1).await.unwrap();

        assert!(matches!(
            report.outcome,
            ExecutionOutcome::RowSet { row_count: 2 }
        ));
        assert!(report.visualization_error.is_none());
        assert!(report.tab.select_query);
        assert_eq!(report.tab.rows.len(), 2);
        assert!(report.tab.charts.bar.is_some());
        assert_eq!(api.call_names(), vec!["execute", "visualize"]);
    }

    #[tokio::test]
    async fn execute_with_an_empty_row_set_skips_visualizations() {
        let api = Arc::new(ScriptedApi::default());
        api.execute.lock().unwrap().push_back(Ok(row_results(json!([]))));
        let (console, _dir) = console(api.clone(), true);
        seed_sql(&console, 1, "SELECT title FROM movies WHERE 1=0").await;

        let report = console.execute(1).await.unwrap();

        assert!(matches!(
            report.outcome,
            ExecutionOutcome::RowSet { row_count: 0 }
        ));
        assert!(report.tab.select_query);
        assert!(report.tab.rows.is_empty());
        assert_eq!(api.call_names(), vec!["execute"]);
    }

    #[tokio::test]
    async fn execute_reports_affected_rows() {
        let api = Arc::new(ScriptedApi::default());
        api.execute.lock().unwrap().push_back(Ok(serde_json::from_value(
            json!({ "affected_rows": 3 }),
        )
        .unwrap()));
        let (console, _dir) = console(api.clone(), true);
        seed_sql(&console, 1, "DELETE FROM movies WHERE year < 1950").await;

        let report = console.execute(1).await.unwrap();

        match report.outcome {
            ExecutionOutcome::Mutation { affected_rows, ref notice } => {
                assert_eq!(affected_rows, 3);
                assert!(notice.contains("3 rows affected"));
            }
            other => panic!("expected a mutation outcome, got {:?}", other),
        }
        assert!(!report.tab.select_query);
        assert_eq!(
            report.tab.status_message.as_deref(),
            Some("Database updated: 3 rows affected")
        );
        assert_eq!(api.call_names(), vec!["execute"]);
    }

    #[tokio::test]
    async fn execution_leaves_edit_mode_untouched() {
        let api = Arc::new(ScriptedApi::default());
        api.execute
            .lock()
            .unwrap()
            .push_back(Ok(row_results(json!([{"title": "Heat"}]))));
        api.execute.lock().unwrap().push_back(Ok(serde_json::from_value(
            json!({ "affected_rows": 1 }),
        )
        .unwrap()));
        api.visualize.lock().unwrap().push_back(Ok(no_visualizations()));
        let (console, _dir) = console(api.clone(), true);
        seed_sql(&console, 1, "SELECT title FROM movies").await;
        console
            .patch_tab(
                1,
                TabPatch {
                    is_editing_sql: Some(true),
                    ..TabPatch::default()
                },
            )
            .await
            .unwrap();

        let report = console.execute(1).await.unwrap();
        assert!(report.tab.is_editing_sql);

        let report = console.execute(1).await.unwrap();
        assert!(report.tab.is_editing_sql);
    }

    #[tokio::test]
    async fn execute_with_neither_shape_reports_generic_success() {
        let api = Arc::new(ScriptedApi::default());
        api.execute
            .lock()
            .unwrap()
            .push_back(Ok(ExecuteSqlResponse::default()));
        let (console, _dir) = console(api.clone(), true);
        seed_sql(&console, 1, "VACUUM").await;

        let report = console.execute(1).await.unwrap();

        assert!(matches!(report.outcome, ExecutionOutcome::Acknowledged { .. }));
        assert_eq!(
            report.tab.status_message.as_deref(),
            Some("Query executed successfully")
        );
    }

    #[tokio::test]
    async fn missing_relation_regenerates_exactly_once() {
        let api = Arc::new(ScriptedApi::default());
        api.execute.lock().unwrap().push_back(Err(ApiError::ResponseError {
            status: 400,
            message: "relation \"foo\" does not exist".to_string(),
        }));
        api.generate
            .lock()
            .unwrap()
            .push_back(Ok(generated("SELECT title FROM movies")));
        let (console, _dir) = console(api.clone(), true);
        console
            .patch_tab(
                1,
                TabPatch {
                    question: Some("list movie titles".to_string()),
                    sql: Some("SELECT title FROM foo".to_string()),
                    ..TabPatch::default()
                },
            )
            .await
            .unwrap();

        let report = console.execute(1).await.unwrap();

        assert!(matches!(report.outcome, ExecutionOutcome::Regenerated { .. }));
        assert_eq!(report.tab.sql, "SELECT title FROM movies");
        assert!(!report.tab.is_loading);
        assert_eq!(api.call_names(), vec!["execute", "generate"]);
        let log = api.log.lock().unwrap();
        match &log[1] {
            Call::Generate { error_context } => {
                assert!(error_context.as_deref().unwrap().contains("does not exist"));
            }
            other => panic!("expected a generate call, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn regeneration_failure_does_not_loop() {
        let api = Arc::new(ScriptedApi::default());
        api.execute.lock().unwrap().push_back(Err(ApiError::ResponseError {
            status: 400,
            message: "relation \"foo\" does not exist".to_string(),
        }));
        api.generate.lock().unwrap().push_back(Err(ApiError::ResponseError {
            status: 500,
            message: "model unavailable".to_string(),
        }));
        let (console, _dir) = console(api.clone(), true);
        seed_sql(&console, 1, "SELECT title FROM foo").await;

        let err = console.execute(1).await.unwrap_err();

        assert!(matches!(err, ConsoleError::Generation(_)));
        assert_eq!(api.call_names(), vec!["execute", "generate"]);
    }

    #[tokio::test]
    async fn other_execution_failures_leave_results_alone() {
        let api = Arc::new(ScriptedApi::default());
        api.execute
            .lock()
            .unwrap()
            .push_back(Ok(row_results(json!([{"title": "Heat"}]))));
        api.visualize.lock().unwrap().push_back(Ok(no_visualizations()));
        api.execute.lock().unwrap().push_back(Err(ApiError::ResponseError {
            status: 500,
            message: "backend exploded".to_string(),
        }));
        let (console, _dir) = console(api.clone(), true);
        seed_sql(&console, 1, "SELECT title FROM movies").await;
        console.execute(1).await.unwrap();

        let err = console.execute(1).await.unwrap_err();

        assert!(matches!(err, ConsoleError::Execution(_)));
        let tabs = console.tabs_view().await;
        let tab = tabs.get(1).unwrap();
        assert_eq!(tab.rows.len(), 1);
        assert!(!tab.is_loading);
    }

    #[tokio::test]
    async fn visualization_failure_keeps_rows_and_reports_a_notice() {
        let api = Arc::new(ScriptedApi::default());
        api.execute
            .lock()
            .unwrap()
            .push_back(Ok(row_results(json!([{"title": "Heat"}]))));
        api.visualize.lock().unwrap().push_back(Err(ApiError::ConnectionError(
            "connection refused".to_string(),
        )));
        let (console, _dir) = console(api.clone(), true);
        seed_sql(&console, 1, "SELECT title FROM movies").await;

        let report = console.execute(1).await.unwrap();

        assert!(matches!(
            report.outcome,
            ExecutionOutcome::RowSet { row_count: 1 }
        ));
        assert!(report
            .visualization_error
            .as_deref()
            .unwrap()
            .contains("Failed to generate visualizations"));
        assert_eq!(report.tab.rows.len(), 1);
        assert!(report.tab.charts.is_empty());
    }

    #[tokio::test]
    async fn export_requires_rows() {
        let api = Arc::new(ScriptedApi::default());
        let (console, _dir) = console(api, true);

        let err = console.export_csv(1).await.unwrap_err();

        assert!(matches!(
            err,
            ConsoleError::Export(crate::export::ExportError::EmptyDataset)
        ));
    }

    struct GatedApi {
        gate: Notify,
    }

    #[async_trait]
    impl InsightsApi for GatedApi {
        async fn generate_sql(
            &self,
            _request: &GenerateSqlRequest,
        ) -> Result<GenerateSqlResponse, ApiError> {
            unreachable!("generation is not part of this scenario")
        }

        async fn execute_sql(
            &self,
            _request: &ExecuteSqlRequest,
        ) -> Result<ExecuteSqlResponse, ApiError> {
            self.gate.notified().await;
            Ok(serde_json::from_value(json!({ "results": [{"a": 1}] })).unwrap())
        }

        async fn generate_visualizations(
            &self,
            _request: &VisualizationRequest,
        ) -> Result<VisualizationResponse, ApiError> {
            Ok(serde_json::from_value(json!({ "visualizations": [] })).unwrap())
        }
    }

    #[tokio::test]
    async fn a_response_for_a_closed_tab_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ConnectionStore::new(dir.path()));
        store.save(&profile()).unwrap();
        let api = Arc::new(GatedApi { gate: Notify::new() });
        let console = Arc::new(QueryConsole::new(api.clone(), store));

        seed_sql(&console, 1, "SELECT 1").await;
        let second = console.add_tab().await;

        let pending = {
            let console = console.clone();
            tokio::spawn(async move { console.execute(1).await })
        };
        tokio::task::yield_now().await;
        assert!(console.close_tab(1).await);
        api.gate.notify_one();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(ConsoleError::TabNotFound(1))));
        let tabs = console.tabs_view().await;
        assert_eq!(tabs.len(), 1);
        assert!(tabs.get(second.id).unwrap().rows.is_empty());
    }
}
