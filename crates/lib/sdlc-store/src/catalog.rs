//! Artifact catalog.
//!
//! Every artifact kind maps to exactly one column on the `projects` table and
//! one display label. [`ARTIFACTS`] is the only place that mapping lives;
//! [`validate`] checks it at startup.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::models::ArtifactContent;

/// Closed set of artifact kinds a project can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    Prd,
    DesignSystem,
    Architecture,
    DataModel,
    ApiContract,
    SequenceDiagrams,
    ImplementationPlan,
    ClaudeMd,
    CorporateGuidelines,
}

impl ArtifactKind {
    pub const ALL: [Self; 9] = [
        Self::Prd,
        Self::DesignSystem,
        Self::Architecture,
        Self::DataModel,
        Self::ApiContract,
        Self::SequenceDiagrams,
        Self::ImplementationPlan,
        Self::ClaudeMd,
        Self::CorporateGuidelines,
    ];

    /// Wire name accepted by the `get_artifact` tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prd => "prd",
            Self::DesignSystem => "design_system",
            Self::Architecture => "architecture",
            Self::DataModel => "data_model",
            Self::ApiContract => "api_contract",
            Self::SequenceDiagrams => "sequence_diagrams",
            Self::ImplementationPlan => "implementation_plan",
            Self::ClaudeMd => "claude_md",
            Self::CorporateGuidelines => "corporate_guidelines",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn spec(self) -> &'static ArtifactSpec {
        &ARTIFACTS[self.index()]
    }

    #[must_use]
    pub fn column(self) -> &'static str {
        self.spec().column
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        self.spec().label
    }

    /// Whether the stored text is expected to carry embedded JSON.
    #[must_use]
    pub fn is_structured(self) -> bool {
        self.spec().structured
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| CatalogError::UnknownKind(value.to_string()))
    }
}

/// One row of the artifact catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub kind: ArtifactKind,
    pub column: &'static str,
    pub label: &'static str,
    pub generated_at_column: Option<&'static str>,
    pub structured: bool,
    /// Counted toward the completion figure in the project listing.
    pub tracked: bool,
}

pub const ARTIFACTS: [ArtifactSpec; 9] = [
    ArtifactSpec {
        kind: ArtifactKind::Prd,
        column: "prd_content",
        label: "PRD",
        generated_at_column: None,
        structured: false,
        tracked: true,
    },
    ArtifactSpec {
        kind: ArtifactKind::DesignSystem,
        column: "design_system_content",
        label: "Design System",
        generated_at_column: Some("design_system_updated_at"),
        structured: true,
        tracked: true,
    },
    ArtifactSpec {
        kind: ArtifactKind::Architecture,
        column: "arch_overview_content",
        label: "Architecture Overview",
        generated_at_column: Some("arch_overview_generated_at"),
        structured: false,
        tracked: true,
    },
    ArtifactSpec {
        kind: ArtifactKind::DataModel,
        column: "data_model_content",
        label: "Data Model",
        generated_at_column: Some("data_model_generated_at"),
        structured: false,
        tracked: true,
    },
    ArtifactSpec {
        kind: ArtifactKind::ApiContract,
        column: "api_contract_content",
        label: "API Contract",
        generated_at_column: Some("api_contract_generated_at"),
        structured: false,
        tracked: true,
    },
    ArtifactSpec {
        kind: ArtifactKind::SequenceDiagrams,
        column: "sequence_diagrams_content",
        label: "Sequence Diagrams",
        generated_at_column: Some("sequence_diagrams_generated_at"),
        structured: false,
        tracked: true,
    },
    ArtifactSpec {
        kind: ArtifactKind::ImplementationPlan,
        column: "implementation_plan_content",
        label: "Implementation Plan",
        generated_at_column: Some("implementation_plan_generated_at"),
        structured: true,
        tracked: true,
    },
    ArtifactSpec {
        kind: ArtifactKind::ClaudeMd,
        column: "claude_md_content",
        label: "CLAUDE.md",
        generated_at_column: None,
        structured: false,
        tracked: true,
    },
    ArtifactSpec {
        kind: ArtifactKind::CorporateGuidelines,
        column: "corporate_guidelines_content",
        label: "Corporate Guidelines",
        generated_at_column: None,
        structured: false,
        tracked: false,
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    UnknownKind(String),
    OutOfOrder { position: usize, kind: ArtifactKind },
    EmptyField { kind: ArtifactKind, field: &'static str },
    DuplicateColumn(&'static str),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKind(value) => {
                let valid = ArtifactKind::ALL.map(ArtifactKind::as_str).join("', '");
                write!(f, "unknown artifact type '{value}'. Valid values: '{valid}'")
            }
            Self::OutOfOrder { position, kind } => {
                write!(f, "artifact catalog entry {position} should describe {kind}")
            }
            Self::EmptyField { kind, field } => {
                write!(f, "artifact catalog entry for {kind} has an empty {field}")
            }
            Self::DuplicateColumn(column) => {
                write!(f, "artifact catalog maps column {column} more than once")
            }
        }
    }
}

impl Error for CatalogError {}

/// Column holding the artifact body for `kind`.
#[must_use]
pub fn column_for(kind: ArtifactKind) -> &'static str {
    kind.column()
}

/// Display label for a physical column, if the column belongs to the catalog.
#[must_use]
pub fn label_for_column(column: &str) -> Option<&'static str> {
    ARTIFACTS
        .iter()
        .find(|spec| spec.column == column)
        .map(|spec| spec.label)
}

/// Kinds counted toward the listing completion figure.
pub fn tracked_kinds() -> impl Iterator<Item = ArtifactKind> {
    ARTIFACTS.iter().filter(|spec| spec.tracked).map(|spec| spec.kind)
}

/// Checks that the catalog covers every kind once, in declaration order.
///
/// # Errors
/// Returns the first inconsistency found.
pub fn validate() -> Result<(), CatalogError> {
    for (position, (spec, kind)) in ARTIFACTS.iter().zip(ArtifactKind::ALL).enumerate() {
        if spec.kind != kind {
            return Err(CatalogError::OutOfOrder { position, kind });
        }
        if spec.column.trim().is_empty() {
            return Err(CatalogError::EmptyField { kind, field: "column" });
        }
        if spec.label.trim().is_empty() {
            return Err(CatalogError::EmptyField { kind, field: "label" });
        }
        if ARTIFACTS[..position]
            .iter()
            .any(|earlier| earlier.column == spec.column)
        {
            return Err(CatalogError::DuplicateColumn(spec.column));
        }
    }
    Ok(())
}

/// Artifact body prepared for display.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedArtifact {
    Json(Value),
    Text(String),
}

/// Decodes the embedded JSON of structured kinds.
///
/// Text that fails to parse is returned unchanged; it is never an error.
#[must_use]
pub fn decode(kind: ArtifactKind, content: &ArtifactContent) -> DecodedArtifact {
    match content {
        ArtifactContent::Text(text) if kind.is_structured() => {
            serde_json::from_str::<Value>(text)
                .map_or_else(|_| DecodedArtifact::Text(text.clone()), DecodedArtifact::Json)
        }
        ArtifactContent::Text(text) => DecodedArtifact::Text(text.clone()),
        ArtifactContent::Json(value) if kind.is_structured() => DecodedArtifact::Json(value.clone()),
        ArtifactContent::Json(_) => DecodedArtifact::Text(content.as_text().into_owned()),
    }
}
