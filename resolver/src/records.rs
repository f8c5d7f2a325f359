use serde::Deserialize;

/// Envelope returned by CKAN-style `datastore_search` endpoints.
#[derive(Debug, Deserialize)]
pub struct DatastoreResponse<T> {
    pub success: bool,
    pub result: Option<DatastoreResult<T>>,
}

#[derive(Debug, Deserialize)]
pub struct DatastoreResult<T> {
    pub records: Vec<T>,
}

/// One row of the agents table. The table mixes generators, traders
/// and distributors; only distribution agents are relevant here.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentRecord {
    #[serde(rename = "SigUF", default)]
    pub state: Option<String>,
    #[serde(rename = "SigAgente", default)]
    pub agent: Option<String>,
    #[serde(rename = "DscAtividade", default)]
    pub activity: Option<String>,
}

impl AgentRecord {
    /// Records without an activity column pass through unfiltered; the
    /// upstream query already narrows the search to distribution.
    pub fn is_distribution(&self) -> bool {
        self.activity.as_deref().is_none_or(|a| a.contains("Distribui"))
    }
}

/// One row of the homologated-tariffs table, upstream-sorted by
/// `DatVigencia` descending. Price components are quoted per MWh.
#[derive(Debug, Clone, Deserialize)]
pub struct TariffRecord {
    #[serde(rename = "SigAgente", default)]
    pub agent: Option<String>,
    #[serde(rename = "VlrTE", default)]
    pub energy: RawPrice,
    #[serde(rename = "VlrTUSD", default)]
    pub usage: RawPrice,
    #[serde(rename = "DatVigencia", default)]
    pub effective_date: Option<String>,
    // The column was renamed between dataset revisions.
    #[serde(rename = "DscSubGrupo", alias = "NomSubgrupo", default)]
    pub subgroup: Option<String>,
}

impl TariffRecord {
    /// Subgroup B1 is the residential conventional class. As with
    /// agents, a missing column does not reject the record.
    pub fn is_residential_conventional(&self) -> bool {
        self.subgroup.as_deref().is_none_or(|s| s.contains("B1"))
    }
}

/// Price fields arrive as strings or numbers depending on the dataset
/// revision. Malformed values count as zero rather than failing the
/// whole fetch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    Number(f64),
    Text(String),
    #[default]
    Absent,
}

impl RawPrice {
    pub fn as_mwh(&self) -> f64 {
        match self {
            RawPrice::Number(n) => *n,
            RawPrice::Text(s) => s.trim().parse().unwrap_or(0.0),
            RawPrice::Absent => 0.0,
        }
    }
}

/// Element of the municipality listing returned by the geographic API.
#[derive(Debug, Clone, Deserialize)]
pub struct Municipality {
    pub nome: String,
}
