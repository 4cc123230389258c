//! GitHub contents API transport
//!
//! Implements [`ContentApi`] over the REST endpoints:
//! - `GET  /repos/{owner}/{repo}/contents/{path}?ref={branch}`
//! - `PUT  /repos/{owner}/{repo}/contents/{path}`
//! - `GET  /repos/{owner}/{repo}`

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use super::api::{ContentApi, ContentLocation, PutContent, RemoteFile, RevisionToken};
use super::error::{classify_write_failure, RemoteError};
use crate::config::RemoteConfig;

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

/// The API rejects requests without a user agent
const USER_AGENT: &str = concat!("portal/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ContentResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutResponseContent,
}

#[derive(Debug, Deserialize)]
struct PutResponseContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Content API client for github.com or a GitHub Enterprise instance
pub struct GithubContentApi {
    client: Client,
    api_url: Url,
    token: Option<String>,
}

impl GithubContentApi {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let api_url = Url::parse(&config.api_url).map_err(|e| {
            RemoteError::Config(format!("invalid api_url '{}': {}", config.api_url, e))
        })?;
        if api_url.cannot_be_a_base() {
            return Err(RemoteError::Config(format!(
                "api_url '{}' cannot be used as a base URL",
                config.api_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(RemoteError::transport)?;

        Ok(Self {
            client,
            api_url,
            token: config.token.clone(),
        })
    }

    /// Base URL extended with percent-encoded path segments
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, RemoteError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Config("api_url cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn contents_url(&self, location: &ContentLocation) -> Result<Url, RemoteError> {
        let prefix = ["repos", location.owner.as_str(), location.repo.as_str(), "contents"];
        self.endpoint(prefix.into_iter().chain(location.path.split('/')))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(ACCEPT, GITHUB_MEDIA_TYPE);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Turn a non-success response into (status, message)
async fn failure(response: Response) -> (u16, String) {
    let status = response.status();
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    (status.as_u16(), message)
}

impl ContentApi for GithubContentApi {
    async fn get_content(
        &self,
        location: &ContentLocation,
    ) -> Result<Option<RemoteFile>, RemoteError> {
        let mut url = self.contents_url(location)?;
        url.query_pairs_mut().append_pair("ref", &location.branch);

        debug!("GET {}", url);
        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(RemoteError::transport)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let (status, message) = failure(response).await;
            return Err(RemoteError::Api { status, message });
        }

        let body: ContentResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidDocument(format!("unexpected response: {}", e)))?;

        // Files over 1 MB come back without inline content
        if body.encoding.as_deref().is_some_and(|enc| enc != "base64") {
            return Err(RemoteError::InvalidDocument(format!(
                "{} is too large to fetch inline",
                location.path
            )));
        }

        Ok(Some(RemoteFile {
            content: body.content,
            revision: RevisionToken::new(body.sha),
        }))
    }

    async fn put_content(
        &self,
        location: &ContentLocation,
        request: &PutContent,
    ) -> Result<RevisionToken, RemoteError> {
        let url = self.contents_url(location)?;

        debug!("PUT {} (sha: {:?})", url, request.sha);
        let response = self
            .request(Method::PUT, url)
            .json(request)
            .send()
            .await
            .map_err(RemoteError::transport)?;

        if !response.status().is_success() {
            let (status, message) = failure(response).await;
            return Err(classify_write_failure(status, message));
        }

        let body: PutResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidDocument(format!("unexpected response: {}", e)))?;

        Ok(RevisionToken::new(body.content.sha))
    }

    async fn get_repository(&self, location: &ContentLocation) -> Result<(), RemoteError> {
        let url = self.endpoint(["repos", location.owner.as_str(), location.repo.as_str()])?;

        debug!("GET {}", url);
        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(RemoteError::transport)?;

        if !response.status().is_success() {
            let (status, message) = failure(response).await;
            return Err(RemoteError::Api { status, message });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(api_url: &str) -> GithubContentApi {
        let mut config = RemoteConfig::new("octo/portal-data");
        config.api_url = api_url.to_string();
        GithubContentApi::new(&config).unwrap()
    }

    fn location(path: &str) -> ContentLocation {
        let mut config = RemoteConfig::new("octo/portal-data");
        config.path = path.to_string();
        ContentLocation::from_config(&config).unwrap()
    }

    #[test]
    fn test_contents_url() {
        let url = api("https://api.github.com")
            .contents_url(&location("data/database.json"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/octo/portal-data/contents/data/database.json"
        );
    }

    #[test]
    fn test_contents_url_with_enterprise_base() {
        let url = api("https://ghe.example.com/api/v3/")
            .contents_url(&location("my db.json"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/octo/portal-data/contents/my%20db.json"
        );
    }

    #[test]
    fn test_rejects_invalid_api_url() {
        let mut config = RemoteConfig::new("octo/portal-data");
        config.api_url = "not a url".to_string();
        assert!(matches!(
            GithubContentApi::new(&config),
            Err(RemoteError::Config(_))
        ));

        config.api_url = "mailto:someone@example.com".to_string();
        assert!(matches!(
            GithubContentApi::new(&config),
            Err(RemoteError::Config(_))
        ));
    }

    #[test]
    fn test_parses_content_response() {
        let body = r#"{
            "type": "file",
            "encoding": "base64",
            "size": 2,
            "name": "database.json",
            "path": "data/database.json",
            "content": "e30=\n",
            "sha": "3d21ec53a331a6f037a91c368710b99387d012c1"
        }"#;
        let parsed: ContentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.sha, "3d21ec53a331a6f037a91c368710b99387d012c1");
        assert_eq!(parsed.content, "e30=\n");
        assert_eq!(parsed.encoding.as_deref(), Some("base64"));
    }

    #[test]
    fn test_parses_put_response() {
        let body = r#"{
            "content": {"name": "database.json", "sha": "95b966ae1c166bd92f8ae7d1c313e738c731dfc3"},
            "commit": {"sha": "7638417db6d59f3c431d3e1f261cc637155684cd"}
        }"#;
        let parsed: PutResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.content.sha, "95b966ae1c166bd92f8ae7d1c313e738c731dfc3");
    }

    /// Serve one canned response per connection, returning the raw requests
    async fn serve_canned(
        responses: Vec<(u16, &'static str)>,
    ) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();

                let mut raw = Vec::new();
                let mut buf = [0u8; 4096];
                loop {
                    let n = socket.read(&mut buf).await.unwrap();
                    raw.extend_from_slice(&buf[..n]);
                    let text = String::from_utf8_lossy(&raw).to_string();
                    if let Some(end) = text.find("\r\n\r\n") {
                        let content_length = text[..end]
                            .lines()
                            .find_map(|line| {
                                let (name, value) = line.split_once(':')?;
                                name.eq_ignore_ascii_case("content-length")
                                    .then(|| value.trim().parse::<usize>().ok())
                                    .flatten()
                            })
                            .unwrap_or(0);
                        if raw.len() >= end + 4 + content_length || n == 0 {
                            break;
                        }
                    } else if n == 0 {
                        break;
                    }
                }
                requests.push(String::from_utf8_lossy(&raw).to_string());

                let response = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            requests
        });

        (base_url, handle)
    }

    #[tokio::test]
    async fn test_status_mapping_over_http() {
        let (base_url, server) = serve_canned(vec![
            (404, r#"{"message": "Not Found"}"#),
            (500, r#"{"message": "Server Error"}"#),
            (200, r#"{"sha": "abc123", "encoding": "base64", "content": "e30=\n"}"#),
            (409, r#"{"message": "database.json does not match abc123"}"#),
            (422, r#"{"message": "Invalid request.\n\n\"sha\" wasn't supplied."}"#),
            (403, r#"{"message": "Resource not accessible by integration"}"#),
            (201, r#"{"content": {"sha": "def456"}, "commit": {"sha": "c0ffee"}}"#),
        ])
        .await;

        let mut config = RemoteConfig::new("octo/portal-data");
        config.api_url = base_url;
        config.token = Some("t0ken".to_string());
        let mut api = GithubContentApi::new(&config).unwrap();
        // Loopback traffic must not go through a proxy from the environment
        api.client = Client::builder()
            .no_proxy()
            .user_agent(USER_AGENT)
            .build()
            .unwrap();
        let location = ContentLocation::from_config(&config).unwrap();
        let put = PutContent {
            message: "Update database".to_string(),
            content: "e30=".to_string(),
            branch: "main".to_string(),
            sha: Some(RevisionToken::new("abc123")),
        };

        assert_eq!(api.get_content(&location).await.unwrap(), None);
        assert_eq!(
            api.get_content(&location).await.unwrap_err(),
            RemoteError::Api {
                status: 500,
                message: "Server Error".to_string()
            }
        );
        let file = api.get_content(&location).await.unwrap().unwrap();
        assert_eq!(file.revision.as_str(), "abc123");
        assert_eq!(file.content, "e30=\n");

        assert!(matches!(
            api.put_content(&location, &put).await,
            Err(RemoteError::WriteConflict { status: 409, .. })
        ));
        assert!(matches!(
            api.put_content(&location, &put).await,
            Err(RemoteError::WriteConflict { status: 422, .. })
        ));
        assert!(matches!(
            api.put_content(&location, &put).await,
            Err(RemoteError::Api { status: 403, .. })
        ));
        assert_eq!(
            api.put_content(&location, &put).await.unwrap().as_str(),
            "def456"
        );

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 7);
        assert!(requests[0]
            .starts_with("GET /repos/octo/portal-data/contents/data/database.json?ref=main "));
        assert!(requests[3].starts_with("PUT /repos/octo/portal-data/contents/data/database.json "));
        assert!(requests[3].contains(r#""sha":"abc123""#));
        for request in &requests {
            let lower = request.to_lowercase();
            assert!(lower.contains("authorization: bearer t0ken"), "{request}");
            assert!(lower.contains("accept: application/vnd.github.v3+json"));
            assert!(lower.contains("user-agent: portal/"));
        }
    }
}
