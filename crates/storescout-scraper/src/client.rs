use std::time::Duration;

use reqwest::{Client, Url};
use storescout_core::Region;

use crate::error::ScraperError;
use crate::retry::retry_with_backoff;

/// HTTP client for regional storefront pages.
///
/// Search and detail pages are addressed as `{base}/{locale}/search/{query}`
/// and `{base}/{locale}/product/{id}`. 429, 404 and other non-2xx responses
/// become typed errors; transport failures are translated into
/// region-level conditions ([`ScraperError::Timeout`],
/// [`ScraperError::RegionUnavailable`]).
///
/// Transient errors are retried with exponential backoff up to
/// `max_retries` additional attempts.
#[derive(Debug, Clone)]
pub struct StorefrontClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl StorefrontClient {
    /// Creates a client for the storefront at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidInput`] if `base_url` is not an absolute
    /// HTTP(S) URL, or [`ScraperError::Http`] if the underlying
    /// `reqwest::Client` cannot be constructed.
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ScraperError::InvalidInput(format!("storefront base URL: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ScraperError::InvalidInput(format!(
                "storefront base URL must be http(s), got {base_url}"
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url,
            max_retries,
            backoff_base_secs,
        })
    }

    /// The underlying HTTP client, shared with the exchange-rate cache so
    /// both use the same timeout and `User-Agent`.
    #[must_use]
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Storefront origin, used to resolve relative links found in markup.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/{locale}/search/{query}` with the query percent-encoded as a
    /// single path segment.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidInput`] if the base URL cannot carry a path.
    pub fn search_url(&self, region: &Region, query: &str) -> Result<Url, ScraperError> {
        self.page_url(&[region.locale, "search", query.trim()])
    }

    /// `{base}/{locale}/product/{product_id}`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidInput`] if the base URL cannot carry a path.
    pub fn product_url(&self, region: &Region, product_id: &str) -> Result<Url, ScraperError> {
        self.page_url(&[region.locale, "product", product_id.trim()])
    }

    /// Fetches the search results page for `query` in `region`.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RateLimited`]: HTTP 429 after all retries.
    /// - [`ScraperError::NotFound`]: HTTP 404 (not retried).
    /// - [`ScraperError::UnexpectedStatus`]: any other non-2xx status.
    /// - [`ScraperError::Timeout`] / [`ScraperError::RegionUnavailable`]:
    ///   transport failure after all retries.
    pub async fn fetch_search_page(
        &self,
        region: &Region,
        query: &str,
    ) -> Result<String, ScraperError> {
        let url = self.search_url(region, query)?;
        self.fetch_html(url, region).await
    }

    /// Fetches the detail page for `product_id` in `region`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_search_page`].
    pub async fn fetch_product_page(
        &self,
        region: &Region,
        product_id: &str,
    ) -> Result<String, ScraperError> {
        let url = self.product_url(region, product_id)?;
        self.fetch_html(url, region).await
    }

    fn page_url(&self, segments: &[&str]) -> Result<Url, ScraperError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ScraperError::InvalidInput(format!("{} cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch_html(&self, url: Url, region: &Region) -> Result<String, ScraperError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.clone();
            async move {
                let url_str = url.to_string();
                tracing::debug!(url = %url_str, region = region.code, "fetching storefront page");

                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| ScraperError::from_transport(e, &url_str, region.code))?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(ScraperError::RateLimited {
                        domain: self.base_url.host_str().unwrap_or_default().to_owned(),
                        retry_after_secs,
                    });
                }

                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(ScraperError::NotFound { url: url_str });
                }

                if !status.is_success() {
                    return Err(ScraperError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url_str,
                    });
                }

                response
                    .text()
                    .await
                    .map_err(|e| ScraperError::from_transport(e, &url_str, region.code))
            }
        })
        .await
    }
}
