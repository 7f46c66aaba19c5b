//! Database targets and the naming convention they are classified by.

use std::fmt;
use std::sync::Arc;

use healthcheck_state::{SchemaSource, StorageResult, TargetConnection};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

/// Category of a schema, inferred from its name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseType {
    Core,
    OtherFeatures,
    Cdna,
    Vega,
    SangerVega,
    RnaSeq,
    EstGene,
    Variation,
    Funcgen,
    Compara,
    Ontology,
    Website,
    Unknown,
}

impl DatabaseType {
    /// Every known type, `Unknown` excluded.
    pub const KNOWN: [DatabaseType; 12] = [
        DatabaseType::Core,
        DatabaseType::OtherFeatures,
        DatabaseType::Cdna,
        DatabaseType::Vega,
        DatabaseType::SangerVega,
        DatabaseType::RnaSeq,
        DatabaseType::EstGene,
        DatabaseType::Variation,
        DatabaseType::Funcgen,
        DatabaseType::Compara,
        DatabaseType::Ontology,
        DatabaseType::Website,
    ];

    /// The token this type appears as inside schema names.
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::Core => "core",
            DatabaseType::OtherFeatures => "otherfeatures",
            DatabaseType::Cdna => "cdna",
            DatabaseType::Vega => "vega",
            DatabaseType::SangerVega => "sangervega",
            DatabaseType::RnaSeq => "rnaseq",
            DatabaseType::EstGene => "estgene",
            DatabaseType::Variation => "variation",
            DatabaseType::Funcgen => "funcgen",
            DatabaseType::Compara => "compara",
            DatabaseType::Ontology => "ontology",
            DatabaseType::Website => "website",
            DatabaseType::Unknown => "unknown",
        }
    }

    /// Parse a single name token. Returns `None` for anything that is not a
    /// known type.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::KNOWN
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Species a schema belongs to, as its lowercase binomial (`homo_sapiens`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Species(String);

impl Species {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(name: impl Into<String>) -> Self {
        Species(name.into().to_ascii_lowercase())
    }

    pub fn unknown() -> Self {
        Species(Self::UNKNOWN.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classification derived from a schema name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub db_type: DatabaseType,
    pub species: Species,
    pub release: Option<u32>,
}

impl SchemaInfo {
    /// Infer type, species and release from a schema name.
    ///
    /// Accepts `<genus>_<species>_<type>_<release>_<assembly>` and
    /// `ensembl_<type>_<release>`. The first token naming a known type wins.
    pub fn infer(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        let tokens: Vec<&str> = lower.split('_').filter(|t| !t.is_empty()).collect();

        let Some((idx, db_type)) = tokens
            .iter()
            .enumerate()
            .find_map(|(i, t)| DatabaseType::from_token(t).map(|ty| (i, ty)))
        else {
            return Self {
                db_type: DatabaseType::Unknown,
                species: Species::unknown(),
                release: None,
            };
        };

        let prefix = &tokens[..idx];
        let species = if prefix.is_empty() || prefix == ["ensembl"] {
            Species::unknown()
        } else {
            Species::new(prefix.join("_"))
        };
        let release = tokens[idx + 1..].iter().find_map(|t| t.parse::<u32>().ok());

        Self {
            db_type,
            species,
            release,
        }
    }
}

/// A schema under test.
///
/// Owns a connection that is opened on first use and then shared by every
/// check run against this target for the rest of the process.
pub struct Target {
    name: String,
    info: SchemaInfo,
    source: Arc<dyn SchemaSource>,
    connection: OnceCell<Arc<dyn TargetConnection>>,
}

impl Target {
    pub fn new(name: impl Into<String>, source: Arc<dyn SchemaSource>) -> Self {
        let name = name.into();
        let info = SchemaInfo::infer(&name);
        Self {
            name,
            info,
            source,
            connection: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn db_type(&self) -> DatabaseType {
        self.info.db_type
    }

    pub fn species(&self) -> &Species {
        &self.info.species
    }

    pub fn release(&self) -> Option<u32> {
        self.info.release
    }

    pub fn info(&self) -> &SchemaInfo {
        &self.info
    }

    /// The target's connection, opening it if this is the first use.
    pub async fn connection(&self) -> StorageResult<Arc<dyn TargetConnection>> {
        self.connection
            .get_or_try_init(|| self.source.connect(&self.name))
            .await
            .map(Arc::clone)
    }

    /// Whether the connection has been opened.
    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("info", &self.info)
            .field("connected", &self.is_connected())
            .finish()
    }
}
