//! Open Food Facts client.
//!
//! Uses the public JSON API: the legacy `cgi/search.pl` endpoint for free-text search and
//! `api/v0/product/<code>.json` for barcode lookup. Only the fields the normalizer reads
//! are requested. Every request carries the configured timeout.

use crate::{
    config::AppConfig,
    core::normalize::normalize_value,
    entities::ProductRecord,
    errors::{Error, Result},
    source::NutritionSource,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

const FIELDS: &str = "code,product_name,brands,image_front_small_url,nutriments";

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    products: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct LookupBody {
    #[serde(default)]
    product: Option<Value>,
}

/// HTTP client for the Open Food Facts API.
#[derive(Debug, Clone)]
pub struct OpenFoodFacts {
    client: Client,
    base_url: Url,
    page_size: u32,
}

impl OpenFoodFacts {
    /// Builds a client from the application configuration.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the base URL is invalid, or [`Error::Http`] if the
    /// HTTP client cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let base_url = Url::parse(&config.api_base_url).map_err(|e| Error::Config {
            message: format!("Invalid api_base_url '{}': {e}", config.api_base_url),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config {
                message: format!("api_base_url '{}' cannot be a base URL", config.api_base_url),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            base_url,
            page_size: config.page_size,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in from_config, so path_segments_mut always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn search_url(&self, term: &str) -> Url {
        let mut url = self.endpoint(&["cgi", "search.pl"]);
        url.query_pairs_mut()
            .append_pair("search_terms", term)
            .append_pair("search_simple", "1")
            .append_pair("action", "process")
            .append_pair("json", "1")
            .append_pair("page_size", &self.page_size.to_string())
            .append_pair("fields", FIELDS);
        url
    }

    fn lookup_url(&self, code: &str) -> Url {
        let file = format!("{code}.json");
        let mut url = self.endpoint(&["api", "v0", "product", &file]);
        url.query_pairs_mut().append_pair("fields", FIELDS);
        url
    }

    async fn get_text(&self, url: Url) -> Result<(StatusCode, String)> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!("Request to nutrition source failed: {}", e);
            Error::from(e)
        })?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl NutritionSource for OpenFoodFacts {
    async fn search_by_name(&self, term: &str) -> Result<Vec<ProductRecord>> {
        let (status, body) = self.get_text(self.search_url(term)).await?;
        if !status.is_success() {
            return Err(Error::Network {
                message: format!("search returned HTTP {status}"),
            });
        }
        let products = parse_search_body(&body)?;
        info!("Search '{}' returned {} products", term, products.len());
        Ok(products)
    }

    async fn lookup_by_code(&self, code: &str) -> Result<ProductRecord> {
        let (status, body) = self.get_text(self.lookup_url(code)).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                code: code.to_string(),
            });
        }
        if !status.is_success() {
            return Err(Error::Network {
                message: format!("lookup returned HTTP {status}"),
            });
        }
        let product = parse_lookup_body(&body, code)?;
        info!("Lookup {} matched '{}'", code, product.name);
        Ok(product)
    }
}

/// Parses a search response body into normalized products.
///
/// # Errors
/// Returns [`Error::Network`] if the body is not a JSON object.
pub fn parse_search_body(body: &str) -> Result<Vec<ProductRecord>> {
    let parsed: SearchBody = serde_json::from_str(body).map_err(|e| Error::Network {
        message: format!("unreadable search response: {e}"),
    })?;
    Ok(parsed.products.into_iter().map(normalize_value).collect())
}

/// Parses a lookup response body. An absent or null `product` means not found.
///
/// # Errors
/// Returns [`Error::NotFound`] if the body carries no product, or [`Error::Network`] if it
/// is not a JSON object.
pub fn parse_lookup_body(body: &str, code: &str) -> Result<ProductRecord> {
    let parsed: LookupBody = serde_json::from_str(body).map_err(|e| Error::Network {
        message: format!("unreadable lookup response: {e}"),
    })?;
    match parsed.product {
        Some(product) if product.is_object() => Ok(normalize_value(product)),
        _ => Err(Error::NotFound {
            code: code.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::errors::{MSG_NETWORK, MSG_NOT_FOUND};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    fn client(base: &str) -> OpenFoodFacts {
        let config = AppConfig {
            api_base_url: base.to_string(),
            ..AppConfig::default()
        };
        OpenFoodFacts::from_config(&config).unwrap()
    }

    /// Answers every connection with the same canned response. Returns the base URL.
    async fn serve(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        base
    }

    /// Accepts connections and never answers. Returns the base URL.
    async fn serve_silence() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        base
    }

    #[tokio::test]
    async fn test_lookup_ok_is_normalized() {
        let base = serve(
            "200 OK",
            r#"{"status":1,"product":{"code":"4000417025005","product_name":"Ritter Sport","nutriments":{"energy-kcal_100g":536}}}"#,
        )
        .await;

        let product = client(&base).lookup_by_code("4000417025005").await.unwrap();
        assert_eq!(product.name, "Ritter Sport");
        assert_eq!(product.macros_per_100g.calories, 536.0);
    }

    #[tokio::test]
    async fn test_lookup_http_404_is_not_found() {
        let base = serve("404 Not Found", r#"{"status":0}"#).await;

        let err = client(&base).lookup_by_code("4000417025005").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { ref code } if code == "4000417025005"));
        assert_eq!(err.user_message(), Some(MSG_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_search_server_error_is_network() {
        let base = serve("503 Service Unavailable", "busy").await;

        let err = client(&base).search_by_name("Apfel").await.unwrap_err();
        assert!(matches!(err, Error::Network { .. }));
        assert_eq!(err.user_message(), Some(MSG_NETWORK));
    }

    #[tokio::test]
    async fn test_unreachable_source_is_network_message() {
        let err = client("http://127.0.0.1:1")
            .search_by_name("Apfel")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)));
        assert_eq!(err.user_message(), Some(MSG_NETWORK));
    }

    #[tokio::test]
    async fn test_silent_source_times_out() {
        let base = serve_silence().await;
        let config = AppConfig {
            api_base_url: base,
            request_timeout_secs: 1,
            ..AppConfig::default()
        };
        let off = OpenFoodFacts::from_config(&config).unwrap();

        let err = off.search_by_name("Apfel").await.unwrap_err();
        assert!(matches!(err, Error::Http(ref e) if e.is_timeout()));
        assert_eq!(err.user_message(), Some(MSG_NETWORK));
    }

    #[test]
    fn test_parse_search_body() {
        let body = r#"{
            "count": 1,
            "products": [{
                "code": "123",
                "product_name": "Apfel",
                "nutriments": { "energy-kcal_100g": 52 }
            }]
        }"#;
        let products = parse_search_body(body).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Apfel");
        assert_eq!(products[0].macros_per_100g.calories, 52.0);
    }

    #[test]
    fn test_parse_search_body_zero_matches_is_empty() {
        assert!(parse_search_body(r#"{"count":0,"products":[]}"#).unwrap().is_empty());
        assert!(parse_search_body(r#"{"count":0}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_search_body_garbage_is_network_error() {
        let err = parse_search_body("<html>busy</html>").unwrap_err();
        assert!(matches!(err, Error::Network { .. }));
    }

    #[test]
    fn test_parse_lookup_body() {
        let found = parse_lookup_body(
            r#"{"status":1,"product":{"code":"4000417025005","product_name":"Ritter Sport"}}"#,
            "4000417025005",
        )
        .unwrap();
        assert_eq!(found.name, "Ritter Sport");

        let missing = parse_lookup_body(
            r#"{"status":0,"status_verbose":"product not found"}"#,
            "4000417025005",
        )
        .unwrap_err();
        assert!(matches!(missing, Error::NotFound { ref code } if code == "4000417025005"));

        let null_product = parse_lookup_body(r#"{"product":null}"#, "1").unwrap_err();
        assert!(matches!(null_product, Error::NotFound { .. }));
    }

    #[test]
    fn test_search_url_encodes_term() {
        let off = client("https://world.openfoodfacts.org");
        let url = off.search_url("Müsli & Joghurt");
        assert_eq!(url.path(), "/cgi/search.pl");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("search_terms".to_string(), "Müsli & Joghurt".to_string())));
        assert!(pairs.contains(&("page_size".to_string(), "20".to_string())));
        assert!(pairs.contains(&("fields".to_string(), FIELDS.to_string())));
    }

    #[test]
    fn test_lookup_url_with_base_path() {
        let off = client("http://localhost:8080/off/");
        let url = off.lookup_url("4000417025005");
        assert_eq!(url.path(), "/off/api/v0/product/4000417025005.json");
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let config = AppConfig {
            api_base_url: "not a url".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            OpenFoodFacts::from_config(&config),
            Err(Error::Config { .. })
        ));
    }
}
