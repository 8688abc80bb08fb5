//! Document fetcher: one GET per page, bounded by a timeout, no retry.

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;

/// Anything that can return the text of a page
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch `url` and decode its body.
    ///
    /// `encoding` overrides whatever charset the response declares.
    async fn fetch(&self, url: &str, encoding: Option<&'static Encoding>) -> Result<String, FetchError>;
}

/// HTTP page source with a browser-like identity
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the given timeout and user agent
    pub fn new(timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch(&self, url: &str, encoding: Option<&'static Encoding>) -> Result<String, FetchError> {
        let parsed = validate_url(url)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type);

        let bytes = response.bytes().await.map_err(|e| FetchError::Request {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

        Ok(decode_body(&bytes, encoding.or(declared)))
    }
}

/// Pages held in memory, keyed by URL. Used for captured HTML and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPages {
    pages: HashMap<String, String>,
}

impl StaticPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, html: impl Into<String>) {
        self.pages.insert(url.into(), html.into());
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.insert(url, html);
        self
    }
}

#[async_trait]
impl PageSource for StaticPages {
    async fn fetch(&self, url: &str, _encoding: Option<&'static Encoding>) -> Result<String, FetchError> {
        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// Only absolute http(s) URLs are fetched
pub fn validate_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        detail: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            detail: format!("unsupported scheme {}", other),
        }),
    }
}

/// Encoding for a label such as "EUC-JP" or "Shift_JIS"
pub fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

fn charset_from_content_type(value: &str) -> Option<&'static Encoding> {
    value
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("charset="))
        .find_map(|label| encoding_for_label(label.trim_matches('"')))
}

/// Decode a body, falling back to UTF-8 when no encoding is known
pub fn decode_body(bytes: &[u8], encoding: Option<&'static Encoding>) -> String {
    let (text, _, had_errors) = encoding.unwrap_or(UTF_8).decode(bytes);
    if had_errors {
        debug!("Body contained malformed sequences; replacement characters inserted");
    }
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::EUC_JP;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://race.netkeiba.com/race/shutuba.html?race_id=202606010701").is_ok());
        assert!(matches!(
            validate_url("race/shutuba.html"),
            Err(FetchError::InvalidUrl { .. })
        ));
        assert!(matches!(
            validate_url("ftp://example.com/file"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_decode_legacy_encoding() {
        let (bytes, _, _) = EUC_JP.encode("稍重の芝1800m");
        assert_eq!(decode_body(&bytes, Some(EUC_JP)), "稍重の芝1800m");
        // Without the override the same bytes are not valid UTF-8
        assert_ne!(decode_body(&bytes, None), "稍重の芝1800m");
    }

    #[test]
    fn test_charset_from_content_type() {
        assert_eq!(charset_from_content_type("text/html; charset=EUC-JP"), Some(EUC_JP));
        assert_eq!(charset_from_content_type("text/html; charset=\"utf-8\""), Some(UTF_8));
        assert_eq!(charset_from_content_type("text/html"), None);
    }

    #[test]
    fn test_encoding_for_label() {
        assert_eq!(encoding_for_label("EUC-JP"), Some(EUC_JP));
        assert_eq!(encoding_for_label("euc-jp"), Some(EUC_JP));
        assert_eq!(encoding_for_label("klingon"), None);
    }

    #[tokio::test]
    async fn test_static_pages() {
        let pages = StaticPages::new().with_page("https://example.com/a", "<html></html>");
        assert_eq!(pages.fetch("https://example.com/a", None).await.unwrap(), "<html></html>");
        assert!(matches!(
            pages.fetch("https://example.com/b", None).await,
            Err(FetchError::Status { status: 404, .. })
        ));
    }
}
