//! Test server harness for E2E testing.
//!
//! `TestShowtimeServer` runs the real router on a random port. A wiremock
//! server plays both the identity provider (serving the key set) and the
//! upstream movie database.

use crate::crypto_fixtures::TestKeypair;
use crate::token_builders::TestClaimsBuilder;
use showtime_api::config::Config;
use showtime_api::routes::{self, AppState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Audience configured for every test server.
pub const TEST_AUDIENCE: &str = "https://showtimes.example.com";

/// `kid` the primary fixture key is published under.
pub const TEST_KID: &str = "test-key-1";

/// API key configured for the mock movie database.
pub const TEST_MOVIE_API_KEY: &str = "test-movie-api-key";

/// Options for [`TestShowtimeServer::spawn_with`].
#[derive(Debug, Clone)]
pub struct SpawnOptions {
    /// Publish the primary key set on the mock identity provider.
    pub publish_jwks: bool,
    /// Extra or overriding environment variables. An empty value unsets.
    pub vars: Vec<(String, String)>,
}

impl Default for SpawnOptions {
    fn default() -> Self {
        Self {
            publish_jwks: true,
            vars: Vec::new(),
        }
    }
}

impl SpawnOptions {
    pub fn var(mut self, key: &str, value: &str) -> Self {
        self.vars.push((key.to_string(), value.to_string()));
        self
    }

    pub fn without_jwks(mut self) -> Self {
        self.publish_jwks = false;
        self
    }
}

/// Test harness for spawning the Showtimes API in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_me_flow() -> anyhow::Result<()> {
///     let server = TestShowtimeServer::spawn().await?;
///     let token = server.keypair().sign(&server.claims().build());
///
///     let response = reqwest::Client::new()
///         .get(format!("{}/api/me", server.url()))
///         .bearer_auth(token)
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestShowtimeServer {
    addr: SocketAddr,
    mock_server: MockServer,
    keypair: TestKeypair,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestShowtimeServer {
    /// Spawn a server whose identity provider publishes the primary key.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(SpawnOptions::default()).await
    }

    /// Spawn a server with custom options.
    ///
    /// The server binds to `127.0.0.1:0` and runs in the background until
    /// the harness is dropped.
    pub async fn spawn_with(options: SpawnOptions) -> Result<Self, anyhow::Error> {
        let mock_server = MockServer::start().await;
        let keypair = TestKeypair::primary(TEST_KID);

        if options.publish_jwks {
            Mock::given(method("GET"))
                .and(path("/.well-known/jwks.json"))
                .respond_with(ResponseTemplate::new(200).set_body_json(keypair.jwks_json()))
                .mount(&mock_server)
                .await;
        }

        let mut vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            (
                "AUTH_ISSUER_DOMAIN".to_string(),
                mock_server.address().to_string(),
            ),
            ("AUTH_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
            ("AUTH_JWKS_SCHEME".to_string(), "http".to_string()),
            ("MOVIE_API_BASE_URL".to_string(), mock_server.uri()),
            ("MOVIE_API_KEY".to_string(), TEST_MOVIE_API_KEY.to_string()),
        ]);
        vars.extend(options.vars);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(
            AppState::from_config(config.clone())
                .map_err(|e| anyhow::anyhow!("Failed to create app state: {}", e))?,
        );

        // A recorder may already be installed by an earlier server in this
        // process; fall back to a standalone one.
        let metrics_handle = routes::init_metrics_recorder().unwrap_or_else(|_| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .build_recorder()
                .handle()
        });

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            mock_server,
            keypair,
            config,
            _handle: handle,
        })
    }

    /// Base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The mock identity provider and movie database.
    pub fn mock_server(&self) -> &MockServer {
        &self.mock_server
    }

    /// The key published in the mock key set.
    pub fn keypair(&self) -> &TestKeypair {
        &self.keypair
    }

    /// Issuer domain (the mock server's `host:port`).
    pub fn issuer_domain(&self) -> String {
        self.mock_server.address().to_string()
    }

    /// Claims that this server accepts, valid for one hour.
    pub fn claims(&self) -> TestClaimsBuilder {
        TestClaimsBuilder::new(&self.issuer_domain(), TEST_AUDIENCE)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestShowtimeServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
