use serde::Deserialize;
use url::Url;

/// Endpoints and dataset identifiers for the two open-data sources.
/// Defaults point at the live ANEEL and IBGE APIs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub datastore_url: Url,
    pub municipalities_url: Url,
    pub agents_resource_id: String,
    pub agents_query: String,
    pub agents_limit: u32,
    pub tariffs_resource_id: String,
    pub tariffs_query: String,
    pub tariffs_limit: u32,
}

const TARIFFS_SORT: &str = "DatVigencia desc";

impl Default for SourcesConfig {
    fn default() -> Self {
        SourcesConfig {
            datastore_url: Url::parse(
                "https://dadosabertos.aneel.gov.br/api/3/action/datastore_search",
            )
            .unwrap(),
            municipalities_url: Url::parse(
                "https://servicodados.ibge.gov.br/api/v1/localidades/estados",
            )
            .unwrap(),
            agents_resource_id: "57a78e73-7711-422f-87d4-037130d2e5b4".into(),
            agents_query: "Distribuição".into(),
            agents_limit: 500,
            tariffs_resource_id: "7f48a356-950c-4db3-94c7-1b033626245d".into(),
            tariffs_query: "\"Convencional B1 Residencial\"".into(),
            tariffs_limit: 1000,
        }
    }
}

impl SourcesConfig {
    pub fn agents_url(&self) -> Url {
        let mut url = self.datastore_url.clone();
        url.query_pairs_mut()
            .append_pair("resource_id", &self.agents_resource_id)
            .append_pair("q", &self.agents_query)
            .append_pair("limit", &self.agents_limit.to_string());
        url
    }

    /// The sort is applied upstream; the resolver relies on receiving
    /// tariff records in descending effective-date order.
    pub fn tariffs_url(&self) -> Url {
        let mut url = self.datastore_url.clone();
        url.query_pairs_mut()
            .append_pair("resource_id", &self.tariffs_resource_id)
            .append_pair("q", &self.tariffs_query)
            .append_pair("limit", &self.tariffs_limit.to_string())
            .append_pair("sort", TARIFFS_SORT);
        url
    }

    pub fn municipalities_url_for(&self, state: &str) -> Result<Url, url::ParseError> {
        let base = self.municipalities_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{state}/municipios"))
    }
}

/// How the resolver reaches the data sources: straight to the upstream
/// APIs, or through the CORS relay.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum FetchMode {
    #[default]
    Direct,
    Relayed {
        url: Url,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub sources: SourcesConfig,
    pub fetch: FetchMode,
}
