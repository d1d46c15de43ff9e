//! Domain types for the apivcs ledger.
//!
//! Everything here is plain data: serializable through serde + serde_yaml and
//! ordered deterministically (`BTreeMap`, derived `Ord`) so that persisted
//! ledgers and classification output are reproducible byte-for-byte.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed name for a remote environment (`dev`, `prod`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnvironmentName(pub String);

impl fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EnvironmentName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EnvironmentName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The kind of API-management artifact a tracked project represents.
///
/// Declaration order is the grouping order used everywhere output is sorted:
/// APIs, then API Products, then Applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Api,
    ApiProduct,
    Application,
}

impl ProjectType {
    /// All project types in grouping order.
    pub fn all() -> &'static [ProjectType] {
        &[
            ProjectType::Api,
            ProjectType::ApiProduct,
            ProjectType::Application,
        ]
    }

    /// The meta file whose presence marks a directory as a project of this type.
    pub fn meta_file_name(self) -> &'static str {
        match self {
            ProjectType::Api => "api_meta.yaml",
            ProjectType::ApiProduct => "api_product_meta.yaml",
            ProjectType::Application => "application_meta.yaml",
        }
    }

    /// Lowercase identifier used in paths and URLs.
    pub fn slug(self) -> &'static str {
        match self {
            ProjectType::Api => "api",
            ProjectType::ApiProduct => "api_product",
            ProjectType::Application => "application",
        }
    }

    /// Human-readable plural heading (`APIs`, `API Products`, `Applications`).
    pub fn plural_label(self) -> &'static str {
        match self {
            ProjectType::Api => "APIs",
            ProjectType::ApiProduct => "API Products",
            ProjectType::Application => "Applications",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectType::Api => write!(f, "API"),
            ProjectType::ApiProduct => write!(f, "APIProduct"),
            ProjectType::Application => write!(f, "Application"),
        }
    }
}

/// Which ledger slot a diff is computed against.
///
/// Serialized with the same spelling the CLI accepts (`last-successful`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RevType {
    LastSuccessful,
    #[default]
    LastAttempted,
}

impl fmt::Display for RevType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevType::LastSuccessful => write!(f, "last-successful"),
            RevType::LastAttempted => write!(f, "last-attempted"),
        }
    }
}

impl FromStr for RevType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "last-successful" => Ok(RevType::LastSuccessful),
            "last-attempted" => Ok(RevType::LastAttempted),
            other => Err(format!(
                "unknown revision type '{other}'; expected: last-successful, last-attempted"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Keys and outcomes
// ---------------------------------------------------------------------------

/// Identity of a project within a repository: `(projectType, name)`.
///
/// The derived ordering sorts by type first (grouping order), then by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectKey {
    pub project_type: ProjectType,
    pub name: String,
}

impl ProjectKey {
    pub fn new(project_type: ProjectType, name: impl Into<String>) -> Self {
        Self {
            project_type,
            name: name.into(),
        }
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project_type, self.name)
    }
}

/// Recorded state of one project at the time of a push attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectOutcome {
    /// `/`-separated path of the project directory, relative to the repository root.
    pub relative_path: String,
    pub fingerprint: String,
    /// Fingerprint of the project's deployment parameters, when it has any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params_fingerprint: Option<String>,
    /// The project was sent to the environment during this attempt.
    pub pushed: bool,
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Ledger documents
// ---------------------------------------------------------------------------

/// Per-type project table: `type -> name -> outcome`.
pub type ProjectTable = BTreeMap<ProjectType, BTreeMap<String, ProjectOutcome>>;

/// One ledger slot: the full project set of an environment at one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LedgerEntry {
    /// Monotonically increasing per environment; `0` for the empty entry.
    pub revision: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub projects: ProjectTable,
}

impl LedgerEntry {
    /// An entry for an environment that was never pushed to.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ProjectKey) -> Option<&ProjectOutcome> {
        self.projects
            .get(&key.project_type)
            .and_then(|by_name| by_name.get(&key.name))
    }

    pub fn contains(&self, key: &ProjectKey) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: ProjectKey, outcome: ProjectOutcome) {
        self.projects
            .entry(key.project_type)
            .or_default()
            .insert(key.name, outcome);
    }

    /// Iterate projects in grouping order (type, then name).
    pub fn iter(&self) -> impl Iterator<Item = (ProjectKey, &ProjectOutcome)> {
        self.projects.iter().flat_map(|(project_type, by_name)| {
            by_name
                .iter()
                .map(move |(name, outcome)| (ProjectKey::new(*project_type, name.clone()), outcome))
        })
    }

    pub fn len(&self) -> usize {
        self.projects.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` when any recorded outcome has `failed == true`.
    pub fn has_failures(&self) -> bool {
        self.iter().any(|(_, outcome)| outcome.failed)
    }

    /// Build an entry from a flat outcome map.
    pub fn from_outcomes(
        revision: u64,
        recorded_at: DateTime<Utc>,
        outcomes: BTreeMap<ProjectKey, ProjectOutcome>,
    ) -> Self {
        let mut entry = LedgerEntry {
            revision,
            recorded_at: Some(recorded_at),
            projects: BTreeMap::new(),
        };
        for (key, outcome) in outcomes {
            entry.insert(key, outcome);
        }
        entry
    }
}

/// Both slots recorded for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EnvironmentLedger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempted: Option<LedgerEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_successful: Option<LedgerEntry>,
}

/// Root of `vcs.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub version: u32,
    pub repo_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub environments: BTreeMap<EnvironmentName, EnvironmentLedger>,
}

/// Stable identity assigned to a repository by `init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    pub repo_id: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
