//! HTTP client for the remote debugging endpoint.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::ExtensionId;

use super::target::{BrowserVersion, ExtensionBackground, Target, TargetType};

// ============================================================================
// Constants
// ============================================================================

/// Default URL marker of the extension's UI frame.
pub const DEFAULT_FRONTEND_MARKER: &str = "frontend.html";

/// Timeout of one discovery request.
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Discovery
// ============================================================================

/// Lists and manages targets through the `/json` HTTP endpoints.
///
/// Every lookup re-queries the endpoint; nothing is cached, so targets
/// created or destroyed by a previous test are always seen as they are.
///
/// # Example
///
/// ```no_run
/// use cdp_harness::Discovery;
///
/// # async fn example() -> cdp_harness::Result<()> {
/// let discovery = Discovery::new("127.0.0.1", 9222)?;
/// let background = discovery.find_extension_background().await?;
/// println!("extension {}", background.extension_id);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Discovery {
    base: Url,
    http: Client,
    extension_id: Option<ExtensionId>,
    frontend_marker: String,
}

impl fmt::Debug for Discovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Discovery")
            .field("base", &self.base.as_str())
            .field("extension_id", &self.extension_id)
            .field("frontend_marker", &self.frontend_marker)
            .finish_non_exhaustive()
    }
}

impl Discovery {
    /// Creates a client for `http://{host}:{port}/`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if host and port do not form a valid URL
    /// - [`Error::Http`] if the HTTP client cannot be built
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::from_url(&format!("http://{host}:{port}/"))
    }

    /// Creates a client for an explicit base URL.
    ///
    /// # Errors
    ///
    /// Same as [`Discovery::new`].
    pub fn from_url(base: &str) -> Result<Self> {
        let mut base =
            Url::parse(base).map_err(|e| Error::config(format!("Invalid endpoint {base}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            base,
            http,
            extension_id: None,
            frontend_marker: DEFAULT_FRONTEND_MARKER.to_string(),
        })
    }

    /// Restricts background lookup to one extension.
    #[inline]
    #[must_use]
    pub fn with_extension_id(mut self, extension_id: ExtensionId) -> Self {
        self.extension_id = Some(extension_id);
        self
    }

    /// Sets the URL marker identifying the extension's UI frame.
    #[inline]
    #[must_use]
    pub fn with_frontend_marker(mut self, marker: impl Into<String>) -> Self {
        self.frontend_marker = marker.into();
        self
    }

    /// Returns the endpoint base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::config(format!("Invalid endpoint path {path}: {e}")))
    }
}

// ============================================================================
// Discovery - Listing
// ============================================================================

impl Discovery {
    /// Fetches the current target listing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the endpoint is unreachable or answers
    /// with a non-success status.
    pub async fn list_targets(&self) -> Result<Vec<Target>> {
        let url = self.endpoint("json")?;
        let targets: Vec<Target> = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(count = targets.len(), "Listed targets");
        Ok(targets)
    }

    /// Fetches the listing filtered to one target type.
    ///
    /// # Errors
    ///
    /// Same as [`Discovery::list_targets`].
    pub async fn targets_of_type(&self, target_type: &TargetType) -> Result<Vec<Target>> {
        Ok(self
            .list_targets()
            .await?
            .into_iter()
            .filter(|target| &target.target_type == target_type)
            .collect())
    }

    /// Fetches browser version information.
    ///
    /// # Errors
    ///
    /// Same as [`Discovery::list_targets`].
    pub async fn version(&self) -> Result<BrowserVersion> {
        let url = self.endpoint("json/version")?;
        let version = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(version)
    }
}

// ============================================================================
// Discovery - Lookup
// ============================================================================

impl Discovery {
    /// Finds the extension's background service worker or page.
    ///
    /// # Errors
    ///
    /// - [`Error::TargetNotFound`] if no background target matches
    /// - [`Error::Http`] if the listing cannot be fetched
    pub async fn find_extension_background(&self) -> Result<ExtensionBackground> {
        let targets = self.list_targets().await?;

        let found = targets.into_iter().find_map(|target| {
            if !target.target_type.is_background() {
                return None;
            }
            let extension_id = target.extension_id()?;
            match &self.extension_id {
                Some(expected) if expected != &extension_id => None,
                _ => Some(ExtensionBackground {
                    extension_id,
                    target,
                }),
            }
        });

        found.ok_or_else(|| {
            let criteria = match &self.extension_id {
                Some(id) => format!("background target of extension {id}"),
                None => "extension background target".to_string(),
            };
            Error::target_not_found(criteria)
        })
    }

    /// Finds the first page whose URL contains `url_substring`.
    ///
    /// The browser lists the most recently created or activated target
    /// first, so the first match is the freshest page. Pages without a
    /// debugger socket (another client is attached) are skipped when an
    /// openable match exists.
    ///
    /// # Errors
    ///
    /// - [`Error::TargetNotFound`] if no page matches
    /// - [`Error::Http`] if the listing cannot be fetched
    pub async fn find_content_page(&self, url_substring: &str) -> Result<Target> {
        let targets = self.list_targets().await?;
        let mut matches: Vec<Target> = targets
            .into_iter()
            .filter(|t| t.target_type == TargetType::Page && t.url.contains(url_substring))
            .collect();

        if matches.is_empty() {
            return Err(Error::target_not_found(format!(
                "page with URL containing {url_substring:?}"
            )));
        }

        // Falls back to the first match so attaching reports why it is busy.
        let index = matches
            .iter()
            .position(|t| t.web_socket_debugger_url.is_some())
            .unwrap_or(0);

        if matches.len() > 1 {
            debug!(
                url = %matches[index].url,
                skipped = index,
                others = matches.len() - 1,
                "Several pages matched, using the first openable one"
            );
        }

        Ok(matches.swap_remove(index))
    }

    /// Finds the extension's UI frame by its URL marker.
    ///
    /// # Errors
    ///
    /// - [`Error::TargetNotFound`] if no frontend target matches
    /// - [`Error::Http`] if the listing cannot be fetched
    pub async fn find_frontend_target(&self) -> Result<Target> {
        let targets = self.list_targets().await?;

        targets
            .into_iter()
            .find(|target| {
                matches!(
                    target.target_type,
                    TargetType::Iframe | TargetType::Page | TargetType::Other(_)
                ) && target.url.contains(&self.frontend_marker)
                    && target.extension_id().is_some_and(|id| {
                        self.extension_id.as_ref().is_none_or(|expected| expected == &id)
                    })
            })
            .ok_or_else(|| {
                Error::target_not_found(format!(
                    "extension frame with URL containing {:?}",
                    self.frontend_marker
                ))
            })
    }
}

// ============================================================================
// Discovery - Management
// ============================================================================

impl Discovery {
    /// Opens a new tab at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the browser refuses.
    pub async fn open_tab(&self, url: &str) -> Result<Target> {
        let endpoint = self.endpoint(&format!("json/new?{}", urlencoding::encode(url)))?;
        let target: Target = self
            .http
            .put(endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(id = %target.id, url, "Opened tab");
        Ok(target)
    }

    /// Brings a target to the foreground.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the target is unknown to the browser.
    pub async fn activate(&self, target: &Target) -> Result<()> {
        let endpoint = self.endpoint(&format!("json/activate/{}", target.id))?;
        self.http.get(endpoint).send().await?.error_for_status()?;
        debug!(id = %target.id, "Activated target");
        Ok(())
    }

    /// Closes a target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the target is unknown to the browser.
    pub async fn close_target(&self, target: &Target) -> Result<()> {
        let endpoint = self.endpoint(&format!("json/close/{}", target.id))?;
        self.http.get(endpoint).send().await?.error_for_status()?;
        debug!(id = %target.id, "Closed target");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listing() -> Value {
        json!([
            {
                "id": "P2",
                "type": "page",
                "title": "Other",
                "url": "http://localhost:8080/other.html",
                "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/P2"
            },
            {
                "id": "P1",
                "type": "page",
                "title": "Fixture",
                "url": "http://localhost:8080/fixture.html",
                "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/P1"
            },
            {
                "id": "SW",
                "type": "service_worker",
                "title": "Service Worker",
                "url": "chrome-extension://abcdefgh/background.js",
                "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/SW"
            },
            {
                "id": "FR",
                "type": "iframe",
                "url": "chrome-extension://abcdefgh/pages/frontend.html",
                "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/FR"
            }
        ])
    }

    async fn endpoint_with(listing: Value) -> (MockServer, Discovery) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing))
            .mount(&server)
            .await;
        let discovery = Discovery::from_url(&server.uri()).expect("discovery");
        (server, discovery)
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let discovery = Discovery::from_url("http://127.0.0.1:9222").expect("discovery");
        assert_eq!(discovery.base_url().as_str(), "http://127.0.0.1:9222/");
        assert_eq!(
            discovery.endpoint("json/version").expect("join").as_str(),
            "http://127.0.0.1:9222/json/version"
        );
    }

    #[test]
    fn test_invalid_base_is_config_error() {
        assert!(matches!(
            Discovery::from_url("not a url"),
            Err(Error::Config { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_content_page_selects_matching_target() {
        let (_server, discovery) = endpoint_with(listing()).await;

        let target = discovery
            .find_content_page("fixture.html")
            .await
            .expect("find");

        assert_eq!(target.id.as_str(), "P1");
        assert_eq!(
            target.debugger_url().expect("ws url"),
            "ws://127.0.0.1:9222/devtools/page/P1"
        );
    }

    #[tokio::test]
    async fn test_find_content_page_prefers_first_listed() {
        let (_server, discovery) = endpoint_with(listing()).await;

        let target = discovery.find_content_page("localhost").await.expect("find");
        assert_eq!(target.id.as_str(), "P2");
    }

    #[tokio::test]
    async fn test_find_content_page_skips_attached_page() {
        let (_server, discovery) = endpoint_with(json!([
            {"id": "BUSY", "type": "page", "url": "http://localhost/fixture.html"},
            {"id": "FREE", "type": "page", "url": "http://localhost/fixture.html",
             "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/FREE"}
        ]))
        .await;

        let target = discovery.find_content_page("fixture").await.expect("find");
        assert_eq!(target.id.as_str(), "FREE");
    }

    #[tokio::test]
    async fn test_find_content_page_all_attached_keeps_first() {
        let (_server, discovery) = endpoint_with(json!([
            {"id": "A", "type": "page", "url": "http://localhost/fixture.html"},
            {"id": "B", "type": "page", "url": "http://localhost/fixture.html"}
        ]))
        .await;

        let target = discovery.find_content_page("fixture").await.expect("find");
        assert_eq!(target.id.as_str(), "A");
        assert!(matches!(target.debugger_url(), Err(Error::TargetNotFound { .. })));
    }

    #[tokio::test]
    async fn test_find_content_page_without_match() {
        let (_server, discovery) = endpoint_with(listing()).await;

        let err = discovery
            .find_content_page("missing.html")
            .await
            .expect_err("should fail");
        assert!(matches!(err, Error::TargetNotFound { .. }));
    }

    #[tokio::test]
    async fn test_find_extension_background() {
        let (_server, discovery) = endpoint_with(listing()).await;

        let background = discovery.find_extension_background().await.expect("find");
        assert_eq!(background.extension_id.as_str(), "abcdefgh");
        assert_eq!(background.target.id.as_str(), "SW");
    }

    #[tokio::test]
    async fn test_find_extension_background_filters_by_id() {
        let (_server, discovery) = endpoint_with(listing()).await;
        let discovery = discovery.with_extension_id(ExtensionId::new("zzzz"));

        let err = discovery
            .find_extension_background()
            .await
            .expect_err("should fail");
        assert!(err.to_string().contains("zzzz"));
    }

    #[tokio::test]
    async fn test_find_frontend_target() {
        let (_server, discovery) = endpoint_with(listing()).await;

        let target = discovery.find_frontend_target().await.expect("find");
        assert_eq!(target.id.as_str(), "FR");

        let discovery = discovery.with_frontend_marker("options.html");
        assert!(discovery.find_frontend_target().await.is_err());
    }

    #[tokio::test]
    async fn test_targets_of_type() {
        let (_server, discovery) = endpoint_with(listing()).await;

        let pages = discovery
            .targets_of_type(&TargetType::Page)
            .await
            .expect("list");
        assert_eq!(pages.len(), 2);
    }

    #[tokio::test]
    async fn test_listing_is_requeried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
            .expect(2)
            .mount(&server)
            .await;
        let discovery = Discovery::from_url(&server.uri()).expect("discovery");

        discovery.list_targets().await.expect("first");
        discovery.list_targets().await.expect("second");
    }

    #[tokio::test]
    async fn test_version() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Browser": "Chrome/131.0",
                "Protocol-Version": "1.3"
            })))
            .mount(&server)
            .await;
        let discovery = Discovery::from_url(&server.uri()).expect("discovery");

        let version = discovery.version().await.expect("version");
        assert_eq!(version.browser, "Chrome/131.0");
    }

    #[tokio::test]
    async fn test_open_activate_close() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/json/new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "NEW",
                "type": "page",
                "url": "http://localhost:8080/a.html",
                "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/NEW"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/json/activate/NEW"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Target activated"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/json/close/NEW"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Target is closing"))
            .expect(1)
            .mount(&server)
            .await;
        let discovery = Discovery::from_url(&server.uri()).expect("discovery");

        let target = discovery
            .open_tab("http://localhost:8080/a.html")
            .await
            .expect("open");
        assert_eq!(target.id.as_str(), "NEW");

        discovery.activate(&target).await.expect("activate");
        discovery.close_target(&target).await.expect("close");
    }

    #[tokio::test]
    async fn test_error_status_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let discovery = Discovery::from_url(&server.uri()).expect("discovery");

        assert!(matches!(
            discovery.list_targets().await,
            Err(Error::Http(_))
        ));
    }
}
