use std::borrow::Cow;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::catalog::{ARTIFACTS, ArtifactKind};

/// A row returned by the record store, keyed by column name.
pub type Row = Map<String, Value>;

/// Failure to turn a store row into a typed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub table: &'static str,
    pub message: String,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected {} row: {}", self.table, self.message)
    }
}

impl Error for DecodeError {}

/// Decodes every row of `table` into `T`, failing on the first bad row.
///
/// # Errors
/// Returns `DecodeError` when a row does not match the expected shape.
pub fn decode_rows<T: DeserializeOwned>(
    table: &'static str,
    rows: Vec<Row>,
) -> Result<Vec<T>, DecodeError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row)).map_err(|err| DecodeError {
                table,
                message: err.to_string(),
            })
        })
        .collect()
}

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Draft,
    Active,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub const ALL: [Self; 4] = [Self::Draft, Self::Active, Self::Completed, Self::Archived];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown project status '{}'. Valid values: 'DRAFT', 'ACTIVE', 'COMPLETED', 'ARCHIVED'",
            self.0
        )
    }
}

impl Error for UnknownStatus {}

impl FromStr for ProjectStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

/// Stored artifact body: text, or a JSON value when the column holds one natively.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactContent {
    Text(String),
    Json(Value),
}

impl ArtifactContent {
    /// Returns `None` for SQL null, which means "not generated yet".
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(text) => Some(Self::Text(text.clone())),
            other => Some(Self::Json(other.clone())),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Json(value) => Cow::Owned(
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
            ),
        }
    }
}

/// Tech stack preferences, stored either as a JSON object or JSON-encoded text.
#[derive(Debug, Clone, PartialEq)]
pub enum TechPreferences {
    Entries(Map<String, Value>),
    Other(Value),
}

impl TechPreferences {
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Object(map) => Some(Self::Entries(map.clone())),
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => Some(Self::Entries(map)),
                Ok(Value::Null) => None,
                Ok(other) => Some(Self::Other(other)),
                Err(_) => Some(Self::Other(Value::String(text.clone()))),
            },
            other => Some(Self::Other(other.clone())),
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Entries(map) => Value::Object(map.clone()),
            Self::Other(value) => value.clone(),
        }
    }
}

#[derive(Deserialize)]
struct ProjectHeader {
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    name: String,
    #[serde(default)]
    status: Option<ProjectStatus>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    updated_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    tech_preferences_saved_at: Option<String>,
}

/// A project row with its artifacts resolved through the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub status: Option<ProjectStatus>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub tech_preferences: Option<TechPreferences>,
    pub tech_preferences_saved_at: Option<String>,
    artifacts: BTreeMap<ArtifactKind, ArtifactContent>,
    generated_at: BTreeMap<ArtifactKind, String>,
}

impl Project {
    /// Decodes a `projects` row. Columns that were not selected read as absent.
    ///
    /// # Errors
    /// Returns `DecodeError` when `id` or `name` is missing or `status` is unknown.
    pub fn from_row(row: &Row) -> Result<Self, DecodeError> {
        let header: ProjectHeader =
            serde_json::from_value(Value::Object(row.clone())).map_err(|err| DecodeError {
                table: crate::schema::TABLE_PROJECTS,
                message: err.to_string(),
            })?;

        let mut artifacts = BTreeMap::new();
        let mut generated_at = BTreeMap::new();
        for spec in &ARTIFACTS {
            if let Some(content) = row.get(spec.column).and_then(ArtifactContent::from_value) {
                artifacts.insert(spec.kind, content);
            }
            if let Some(stamp) = spec
                .generated_at_column
                .and_then(|column| row.get(column))
                .and_then(value_to_string)
            {
                generated_at.insert(spec.kind, stamp);
            }
        }

        let tech_preferences = row
            .get(crate::schema::COL_TECH_PREFERENCES)
            .and_then(TechPreferences::from_value);

        Ok(Self {
            id: header.id,
            name: header.name,
            status: header.status,
            created_at: header.created_at,
            updated_at: header.updated_at,
            tech_preferences,
            tech_preferences_saved_at: header.tech_preferences_saved_at,
            artifacts,
            generated_at,
        })
    }

    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: None,
            created_at: None,
            updated_at: None,
            tech_preferences: None,
            tech_preferences_saved_at: None,
            artifacts: BTreeMap::new(),
            generated_at: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_artifact(mut self, kind: ArtifactKind, content: ArtifactContent) -> Self {
        self.artifacts.insert(kind, content);
        self
    }

    #[must_use]
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&ArtifactContent> {
        self.artifacts.get(&kind)
    }

    #[must_use]
    pub fn has_artifact(&self, kind: ArtifactKind) -> bool {
        self.artifacts.contains_key(&kind)
    }

    #[must_use]
    pub fn generated_at(&self, kind: ArtifactKind) -> Option<&str> {
        self.generated_at.get(&kind).map(String::as_str)
    }
}

/// A UI screen belonging to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screen {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub screen_type: Option<String>,
    #[serde(default)]
    pub epic_name: Option<String>,
    #[serde(default)]
    pub complexity: Option<String>,
    #[serde(default)]
    pub user_role: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub display_order: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub prototype_generated_at: Option<String>,
    #[serde(default)]
    pub prototype_content: Option<String>,
}

impl Screen {
    pub const UNGROUPED_EPIC: &'static str = "Ungrouped";

    /// Epic used for display grouping; blank or missing epics are "Ungrouped".
    #[must_use]
    pub fn epic(&self) -> &str {
        self.epic_name
            .as_deref()
            .filter(|epic| !epic.is_empty())
            .unwrap_or(Self::UNGROUPED_EPIC)
    }

    #[must_use]
    pub const fn has_prototype(&self) -> bool {
        self.prototype_generated_at.is_some()
    }
}

/// A file uploaded alongside a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub original_filename: Option<String>,
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_string(&value).ok_or_else(|| serde::de::Error::custom("expected a non-null value"))
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_string(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn project_row_resolves_artifacts_through_catalog() {
        let project = Project::from_row(&row(json!({
            "id": "p-1",
            "name": "Acme",
            "status": "ACTIVE",
            "created_at": "2025-01-01T00:00:00Z",
            "prd_content": "# PRD",
            "arch_overview_content": null,
            "design_system_content": {"colors": ["red"]},
            "data_model_generated_at": "2025-01-02T00:00:00Z",
        })))
        .expect("row should decode");

        assert_eq!(project.status, Some(ProjectStatus::Active));
        assert_eq!(
            project.artifact(ArtifactKind::Prd),
            Some(&ArtifactContent::Text("# PRD".to_string()))
        );
        assert!(!project.has_artifact(ArtifactKind::Architecture));
        assert_eq!(
            project.artifact(ArtifactKind::DesignSystem),
            Some(&ArtifactContent::Json(json!({"colors": ["red"]})))
        );
        assert_eq!(
            project.generated_at(ArtifactKind::DataModel),
            Some("2025-01-02T00:00:00Z")
        );
    }

    #[test]
    fn project_row_without_name_is_rejected() {
        let err = Project::from_row(&row(json!({"id": "p-1"}))).unwrap_err();
        assert_eq!(err.table, "projects");
    }

    #[test]
    fn unknown_status_is_rejected() {
        let result = Project::from_row(&row(json!({"id": "p", "name": "n", "status": "PAUSED"})));
        assert!(result.is_err());
    }

    #[test]
    fn tech_preferences_accept_encoded_text() {
        let prefs = TechPreferences::from_value(&json!(r#"{"frontend":"React"}"#));
        let Some(TechPreferences::Entries(map)) = prefs else {
            panic!("expected entries");
        };
        assert_eq!(map.get("frontend"), Some(&json!("React")));
        assert_eq!(TechPreferences::from_value(&Value::Null), None);
    }

    #[test]
    fn screens_default_to_ungrouped() {
        let screens: Vec<Screen> = decode_rows(
            "project_screens",
            vec![
                row(json!({"id": 7, "name": "Login", "epic_name": ""})),
                row(json!({"id": "s-2", "name": "Home", "epic_name": "Core"})),
            ],
        )
        .expect("screens decode");
        assert_eq!(screens[0].id, "7");
        assert_eq!(screens[0].epic(), "Ungrouped");
        assert_eq!(screens[1].epic(), "Core");
    }

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!("active".parse::<ProjectStatus>(), Ok(ProjectStatus::Active));
        assert!("paused".parse::<ProjectStatus>().is_err());
    }
}
