//! IPFS HTTP RPC client.
//!
//! Talks to a local Kubo daemon through its `/api/v0` endpoints. Every RPC
//! call is a POST; arguments travel in the query string.

use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::{Bandwidth, BestEffort, ContentId, ContentStore};

/// Host of the local IPFS daemon.
pub const DEFAULT_HOST: &str = "localhost";

/// RPC port of the local IPFS daemon.
pub const DEFAULT_PORT: u16 = 5001;

/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(6);

const USER_AGENT: &str = concat!("mdtree/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize)]
struct AddEntry {
    #[serde(rename = "Hash", default)]
    hash: String,
}

#[derive(Deserialize)]
struct SwarmPeers {
    // Kubo sends null instead of an empty list
    #[serde(rename = "Peers", default)]
    peers: Option<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct BandwidthStats {
    #[serde(rename = "RateIn", default)]
    rate_in: f64,
    #[serde(rename = "RateOut", default)]
    rate_out: f64,
}

#[derive(Deserialize)]
struct RpcError {
    #[serde(rename = "Message")]
    message: String,
}

/// Blocking client for an IPFS node's HTTP RPC API.
#[derive(Debug, Clone)]
pub struct IpfsClient {
    base_url: String,
    http: Client,
}

impl IpfsClient {
    /// Client for the daemon at `host:port` with the default timeout.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::with_timeout(host, port, DEFAULT_TIMEOUT)
    }

    /// Client for the daemon at `localhost:5001`.
    pub fn local() -> Result<Self> {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }

    pub fn with_timeout(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        if host.trim().is_empty() {
            return Err(Error::InvalidConfig("IPFS host must not be empty".to_string()));
        }
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: format!("http://{}:{}", host.trim(), port),
            http,
        })
    }

    /// Root URL of the daemon, e.g. `http://localhost:5001`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, command: &str) -> String {
        format!("{}/api/v0/{}", self.base_url, command)
    }

    /// Turn a non-success status into an error carrying the daemon's message.
    fn check(command: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        let message = serde_json::from_str::<RpcError>(&body)
            .map(|err| err.message)
            .unwrap_or(body);
        Err(Error::Store(format!(
            "{} returned {}: {}",
            command,
            status,
            message.trim()
        )))
    }

    fn call(&self, command: &str, query: &[(&str, &str)]) -> Result<Response> {
        debug!(command, "IPFS RPC call");
        let response = self.http.post(self.endpoint(command)).query(query).send()?;
        Self::check(command, response)
    }

    fn try_publish(&self, name: &str, content: &[u8]) -> Result<ContentId> {
        let part = Part::bytes(content.to_vec()).file_name(name.to_string());
        let form = Form::new().part("file", part);

        debug!(name, bytes = content.len(), "IPFS RPC call: add");
        let response = self
            .http
            .post(self.endpoint("add"))
            .query(&[("pin", "true")])
            .multipart(form)
            .send()?;
        let body = Self::check("add", response)?.text()?;

        // One JSON object per line; the first one describes the uploaded file
        let first = body
            .lines()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| Error::Store("add returned an empty response".to_string()))?;
        let entry: AddEntry = serde_json::from_str(first)?;
        ContentId::new(entry.hash)
            .ok_or_else(|| Error::Store("add returned no hash".to_string()))
    }

    fn try_peer_count(&self) -> Result<usize> {
        let peers: SwarmPeers = self.call("swarm/peers", &[])?.json()?;
        Ok(peers.peers.map_or(0, |p| p.len()))
    }

    fn try_bandwidth(&self) -> Result<Bandwidth> {
        let stats: BandwidthStats = self.call("stats/bw", &[])?.json()?;
        Ok(Bandwidth {
            rate_in: stats.rate_in,
            rate_out: stats.rate_out,
        })
    }
}

fn best_effort<T>(what: &str, result: Result<T>) -> BestEffort<T> {
    match result {
        Ok(value) => BestEffort::Available(value),
        Err(err) => {
            warn!(error = %err, "IPFS {} unavailable", what);
            BestEffort::Unavailable
        }
    }
}

impl ContentStore for IpfsClient {
    fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let bytes = self.call("cat", &[("arg", path)])?.bytes()?;
        Ok(bytes.to_vec())
    }

    fn publish(&self, name: &str, content: &[u8]) -> BestEffort<ContentId> {
        best_effort("publish", self.try_publish(name, content))
    }

    fn peer_count(&self) -> BestEffort<usize> {
        best_effort("peer count", self.try_peer_count())
    }

    fn bandwidth(&self) -> BestEffort<Bandwidth> {
        best_effort("bandwidth", self.try_bandwidth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Run a blocking client call off the async test runtime.
    async fn blocking<T, F>(call: F) -> T
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        tokio::task::spawn_blocking(call).await.unwrap()
    }

    fn client_for(server: &MockServer) -> impl Fn() -> IpfsClient {
        let port = server.address().port();
        move || IpfsClient::new("127.0.0.1", port).unwrap()
    }

    async fn mount(server: &MockServer, command: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(format!("/api/v0/{}", command)))
            .respond_with(response)
            .mount(server)
            .await;
    }

    fn json_body(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/json")
    }

    #[test]
    fn test_default_endpoint() {
        let ipfs = IpfsClient::local().unwrap();
        assert_eq!(ipfs.base_url(), "http://localhost:5001");
        assert_eq!(ipfs.endpoint("cat"), "http://localhost:5001/api/v0/cat");
    }

    #[test]
    fn test_empty_host_rejected() {
        assert!(matches!(
            IpfsClient::new(" ", 5001),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v0/cat"))
            .and(query_param("arg", "/ipfs/QmTest/readme.md"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"# Hello\n".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let content = blocking(move || client().fetch("/ipfs/QmTest/readme.md"))
            .await
            .unwrap();
        assert_eq!(content, b"# Hello\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_reports_daemon_error() {
        let server = MockServer::start().await;
        mount(
            &server,
            "cat",
            ResponseTemplate::new(500).set_body_raw(
                r#"{"Message":"no link named \"missing\"","Code":0,"Type":"error"}"#,
                "application/json",
            ),
        )
        .await;

        let client = client_for(&server);
        let err = blocking(move || client().fetch("/ipfs/QmTest/missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert!(err.to_string().contains("no link named"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_publish_returns_hash() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v0/add"))
            .and(query_param("pin", "true"))
            .respond_with(json_body(
                "{\"Name\":\"doc.md\",\"Hash\":\"QmNew\",\"Size\":\"13\"}\n",
            ))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let id = blocking(move || client().publish("doc.md", b"hello, world!")).await;
        assert_eq!(id, BestEffort::Available(ContentId::new("QmNew").unwrap()));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("filename=\"doc.md\""));
        assert!(body.contains("hello, world!"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_publish_without_hash_is_unavailable() {
        let server = MockServer::start().await;
        mount(&server, "add", json_body("{\"Name\":\"doc.md\"}\n")).await;

        let client = client_for(&server);
        let id = blocking(move || client().publish("doc.md", b"x")).await;
        assert_eq!(id, BestEffort::Unavailable);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_peer_count() {
        let server = MockServer::start().await;
        mount(
            &server,
            "swarm/peers",
            json_body(
                r#"{"Peers":[{"Addr":"/ip4/1.2.3.4/tcp/4001","Peer":"Qm1"},{"Addr":"/ip4/5.6.7.8/tcp/4001","Peer":"Qm2"}]}"#,
            ),
        )
        .await;

        let client = client_for(&server);
        assert_eq!(
            blocking(move || client().peer_count()).await,
            BestEffort::Available(2)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_null_peer_list_counts_as_zero() {
        let server = MockServer::start().await;
        mount(&server, "swarm/peers", json_body(r#"{"Peers":null}"#)).await;

        let client = client_for(&server);
        assert_eq!(
            blocking(move || client().peer_count()).await,
            BestEffort::Available(0)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bandwidth() {
        let server = MockServer::start().await;
        mount(
            &server,
            "stats/bw",
            json_body(r#"{"TotalIn":100,"TotalOut":200,"RateIn":1.5,"RateOut":2.25}"#),
        )
        .await;

        let client = client_for(&server);
        let bw = blocking(move || client().bandwidth())
            .await
            .into_option()
            .unwrap();
        assert_eq!(bw.rate_in, 1.5);
        assert_eq!(bw.rate_out, 2.25);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unreachable_daemon() {
        // Outside the shared pool, so dropping it closes the port
        let server = MockServer::builder().start().await;
        let client = client_for(&server);
        drop(server);

        let (fetched, published, peers, bandwidth) = blocking(move || {
            let ipfs = client();
            (
                ipfs.fetch("/ipfs/QmTest").is_err(),
                ipfs.publish("doc.md", b"x"),
                ipfs.peer_count(),
                ipfs.bandwidth(),
            )
        })
        .await;
        assert!(fetched);
        assert_eq!(published, BestEffort::Unavailable);
        assert_eq!(peers.value_or_default(), 0);
        assert_eq!(bandwidth.value_or_default(), Bandwidth::default());
    }
}
