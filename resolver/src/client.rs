use crate::config::FetchMode;
use http::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    UpstreamStatus(StatusCode),
    #[error("upstream rejected the query")]
    UpstreamRejected,
    #[error("malformed upstream payload: {0}")]
    MalformedPayload(String),
    #[error("invalid source URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Outbound data client. Either hits the upstream APIs directly or
/// routes every request through the CORS relay, which expects the real
/// destination in its `targetUrl` parameter. Callers never care which.
#[derive(Clone)]
pub struct DataClient(Inner);

#[derive(Clone)]
enum Inner {
    Direct(reqwest::Client),
    Relayed { client: reqwest::Client, relay: Url },
}

impl DataClient {
    pub fn direct() -> Self {
        DataClient(Inner::Direct(reqwest::Client::new()))
    }

    pub fn relayed(relay: Url) -> Self {
        DataClient(Inner::Relayed {
            client: reqwest::Client::new(),
            relay,
        })
    }

    pub fn from_mode(mode: &FetchMode) -> Self {
        match mode {
            FetchMode::Direct => DataClient::direct(),
            FetchMode::Relayed { url } => DataClient::relayed(url.clone()),
        }
    }

    /// Single GET, no retries. Non-2xx statuses and bodies that do not
    /// deserialize into `T` become typed errors.
    pub async fn get_json<T: DeserializeOwned>(&self, target: Url) -> Result<T, FetchError> {
        let request_url = self.routed_url(target);
        tracing::debug!(url = %request_url, "fetching");

        let response = self.http().get(request_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamStatus(status));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| FetchError::MalformedPayload(e.to_string()))
    }

    fn http(&self) -> &reqwest::Client {
        match &self.0 {
            Inner::Direct(client) | Inner::Relayed { client, .. } => client,
        }
    }

    fn routed_url(&self, target: Url) -> Url {
        match &self.0 {
            Inner::Direct(_) => target,
            Inner::Relayed { relay, .. } => {
                let mut url = relay.clone();
                url.query_pairs_mut()
                    .append_pair("targetUrl", target.as_str());
                url
            }
        }
    }
}
