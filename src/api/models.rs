use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One result record: column name mapped to its JSON value, in the order
/// the execution service produced the columns.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Column descriptor inside a schema snapshot. The service sends more
/// fields than these; anything beyond name and type is dropped here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub column_name: String,
    #[serde(default)]
    pub data_type: Option<String>,
}

/// Nested description of everything the connected database exposes:
/// schema name -> table name -> ordered column list. Shared across all
/// tabs and replaced wholesale on each successful generation response.
pub type SchemaSnapshot = BTreeMap<String, BTreeMap<String, Vec<ColumnInfo>>>;

/// Credential bundle every generation/execution request carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub name: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateSqlRequest {
    pub natural_language: String,
    pub db_config: DbConfig,
    /// Error text from a failed execution, passed back so the service can
    /// regenerate a query that only references existing schema objects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateSqlResponse {
    pub sql_query: String,
    #[serde(default)]
    pub schema: SchemaSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecuteSqlRequest {
    pub query: String,
    pub db_config: DbConfig,
}

/// The execution service answers in one of three shapes: a row set for
/// select-style statements, an affected-row count for mutating ones, or
/// neither for statements that return nothing at all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecuteSqlResponse {
    #[serde(default)]
    pub results: Option<Vec<Row>>,
    #[serde(default)]
    pub affected_rows: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisualizationRequest {
    pub dataset: Vec<Row>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisualizationResponse {
    #[serde(default)]
    pub visualizations: Vec<VisualizationSpec>,
}

/// One suggested visualization. `kind` is matched against the known chart
/// types at the normalization boundary; unknown kinds are ignored there.
#[derive(Debug, Clone, Deserialize)]
pub struct VisualizationSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
}

/// Error payload the service attaches to non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}
