//! Request builder for the university search endpoint.
//!
//! # Design
//! `SearchClient` holds only a validated base URL and an optional user agent
//! and carries no mutable state between calls. It produces plain
//! `HttpRequest` values; executing them is the job of a `TransportClient` or,
//! across the FFI boundary, of the host application.

use url::Url;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::http::HttpRequest;

pub const SEARCH_PATH: &str = "search";

#[derive(Debug, Clone)]
pub struct SearchClient {
    base_url: Url,
    user_agent: Option<String>,
}

impl SearchClient {
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let invalid = |reason: String| Error::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };
        let parsed = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("expected an http(s) URL".to_string()));
        }
        Ok(Self {
            base_url: parsed,
            user_agent: None,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        let mut client = Self::new(&config.base_url)?;
        client.user_agent = config.user_agent.clone();
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// `GET {base}/search?name=<query>`.
    pub fn build_search(&self, query: &str) -> HttpRequest {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(SEARCH_PATH);
        }
        url.set_query(None);
        url.query_pairs_mut().append_pair("name", query);

        let mut request =
            HttpRequest::get(String::from(url)).with_header("accept", "application/json");
        if let Some(agent) = &self.user_agent {
            request = request.with_header("user-agent", agent.clone());
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    fn client() -> SearchClient {
        SearchClient::new("http://localhost:3000").unwrap()
    }

    #[test]
    fn build_search_produces_get_with_query() {
        let req = client().build_search("san");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/search?name=san");
        assert!(req.body.is_none());
        assert_eq!(
            req.headers,
            vec![("accept".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn query_is_form_encoded() {
        let req = client().build_search("san josé & co");
        assert_eq!(
            req.url,
            "http://localhost:3000/search?name=san+jos%C3%A9+%26+co"
        );
    }

    #[test]
    fn trailing_slash_is_tolerated() {
        let client = SearchClient::new("http://localhost:3000/").unwrap();
        let req = client.build_search("x");
        assert_eq!(req.url, "http://localhost:3000/search?name=x");
    }

    #[test]
    fn base_path_is_kept() {
        let client = SearchClient::new("https://example.test/api/v1/").unwrap();
        let req = client.build_search("x");
        assert_eq!(req.url, "https://example.test/api/v1/search?name=x");
    }

    #[test]
    fn empty_query_is_sent_as_is() {
        let req = client().build_search("");
        assert_eq!(req.url, "http://localhost:3000/search?name=");
    }

    #[test]
    fn user_agent_from_config_is_attached() {
        let config = ClientConfig {
            user_agent: Some("unisearch/0.1".to_string()),
            ..ClientConfig::new("http://localhost:3000")
        };
        let req = SearchClient::from_config(&config).unwrap().build_search("x");
        assert!(req
            .headers
            .contains(&("user-agent".to_string(), "unisearch/0.1".to_string())));
    }

    #[test]
    fn rejects_unparseable_and_non_http_urls() {
        assert!(matches!(
            SearchClient::new("not a url"),
            Err(Error::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            SearchClient::new("mailto:someone@example.test"),
            Err(Error::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            SearchClient::new("ftp://example.test"),
            Err(Error::InvalidBaseUrl { .. })
        ));
    }
}
