use crate::client::{DataClient, FetchError};
use crate::config::{ResolverConfig, SourcesConfig};
use crate::index::ResolvedTariffs;
use crate::records::{AgentRecord, DatastoreResponse, Municipality, TariffRecord};
use std::fmt;

/// Which of the two initial data sources a failed load came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Agents,
    Tariffs,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Agents => write!(f, "agents"),
            DataSource::Tariffs => write!(f, "tariffs"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
#[error("{origin} fetch failed: {error}")]
pub struct ResolveError {
    pub origin: DataSource,
    #[source]
    pub error: FetchError,
}

/// Fetches the agent and tariff tables and folds them into the lookup
/// structure the selection UI consumes.
pub struct TariffResolver {
    client: DataClient,
    sources: SourcesConfig,
}

impl TariffResolver {
    pub fn new(config: ResolverConfig) -> Self {
        TariffResolver {
            client: DataClient::from_mode(&config.fetch),
            sources: config.sources,
        }
    }

    pub fn with_client(sources: SourcesConfig, client: DataClient) -> Self {
        TariffResolver { client, sources }
    }

    /// Loads both sources concurrently and publishes the indices only
    /// when both succeed. Both fetches are awaited to completion
    /// before the outcome is decided; a failure on either side means
    /// nothing is published.
    pub async fn resolve(&self) -> Result<ResolvedTariffs, ResolveError> {
        let (agents, tariffs) = tokio::join!(self.fetch_agents(), self.fetch_tariffs());

        let agents = agents.map_err(|error| failed(DataSource::Agents, error))?;
        let tariffs = tariffs.map_err(|error| failed(DataSource::Tariffs, error))?;

        let resolved = ResolvedTariffs::from_records(&agents, &tariffs);
        tracing::info!(
            states = resolved.states().len(),
            agents = agents.len(),
            tariffs = tariffs.len(),
            "tariff data resolved"
        );
        Ok(resolved)
    }

    /// Municipality names for a state, sorted. Independent of the
    /// initial load and never cached; a failure degrades to an empty
    /// list instead of invalidating anything already resolved.
    pub async fn municipalities(&self, state: &str) -> Vec<String> {
        match self.fetch_municipalities(state).await {
            Ok(names) => names,
            Err(error) => {
                tracing::warn!(%state, %error, "municipality lookup failed");
                Vec::new()
            }
        }
    }

    async fn fetch_agents(&self) -> Result<Vec<AgentRecord>, FetchError> {
        self.fetch_datastore(self.sources.agents_url()).await
    }

    async fn fetch_tariffs(&self) -> Result<Vec<TariffRecord>, FetchError> {
        self.fetch_datastore(self.sources.tariffs_url()).await
    }

    async fn fetch_datastore<T: serde::de::DeserializeOwned>(
        &self,
        url: url::Url,
    ) -> Result<Vec<T>, FetchError> {
        let response: DatastoreResponse<T> = self.client.get_json(url).await?;
        if !response.success {
            return Err(FetchError::UpstreamRejected);
        }
        match response.result {
            Some(result) => Ok(result.records),
            None => Err(FetchError::MalformedPayload(
                "successful response without a result field".into(),
            )),
        }
    }

    async fn fetch_municipalities(&self, state: &str) -> Result<Vec<String>, FetchError> {
        let url = self.sources.municipalities_url_for(state)?;
        let municipalities: Vec<Municipality> = self.client.get_json(url).await?;
        let mut names: Vec<String> = municipalities.into_iter().map(|m| m.nome).collect();
        names.sort();
        Ok(names)
    }
}

fn failed(origin: DataSource, error: FetchError) -> ResolveError {
    tracing::error!(source = %origin, %error, "initial data fetch failed");
    ResolveError { origin, error }
}
