use crate::core::config::SourceConfig;
use crate::core::{FetchError, SourceFetcher};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Downloads the fund registry export over HTTP. A single attempt is made.
pub struct CvmProvider {
    url: String,
    client: reqwest::Client,
}

impl CvmProvider {
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent("cvm-fundos/0.1")
            .timeout(config.timeout())
            .build()
            .map_err(FetchError::Client)?;
        Ok(CvmProvider {
            url: config.url.clone(),
            client,
        })
    }
}

#[async_trait]
impl SourceFetcher for CvmProvider {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        debug!("Requesting fund registry from {}", self.url);

        let transport = |source: reqwest::Error| FetchError::Transport {
            url: self.url.clone(),
            source,
        };
        let response = self.client.get(&self.url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            warn!("Fund registry request returned {}", status);
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(transport)?;
        debug!("Received {} bytes from {}", bytes.len(), self.url);
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // Helper function to create a mock server for the registry export
    async fn create_cvm_mock_server(body: Vec<u8>, status_code: u16) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/dados/FI/CAD/DADOS/cad_fi.csv"))
            .respond_with(ResponseTemplate::new(status_code).set_body_bytes(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider_for(mock_server: &MockServer) -> CvmProvider {
        let config = SourceConfig {
            url: format!("{}/dados/FI/CAD/DADOS/cad_fi.csv", mock_server.uri()),
            ..Default::default()
        };
        CvmProvider::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_successful_fetch_returns_raw_bytes() {
        // Latin-1 bytes must come back untouched
        let body = b"CNPJ_FUNDO;DENOM_SOCIAL\n1;A\xC7\xD5ES\n".to_vec();
        let mock_server = create_cvm_mock_server(body.clone(), 200).await;

        let result = provider_for(&mock_server).fetch().await.unwrap();

        assert_eq!(result, body);
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let mock_server = create_cvm_mock_server(b"Not Found".to_vec(), 404).await;

        let result = provider_for(&mock_server).fetch().await;

        match result {
            Err(FetchError::Status { url, status }) => {
                assert_eq!(status, 404);
                assert!(url.ends_with("/cad_fi.csv"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = provider_for(&mock_server).fetch().await;

        assert!(matches!(result, Err(FetchError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let config = SourceConfig {
            url: "http://127.0.0.1:1/cad_fi.csv".to_string(),
            ..Default::default()
        };
        let result = CvmProvider::new(&config).unwrap().fetch().await;
        assert!(matches!(result, Err(FetchError::Transport { .. })));
    }
}
