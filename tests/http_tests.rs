//! Tests for HTTP module functionality.

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;
use trawl::http::client::{create_http_client, HttpClientConfig, DEFAULT_USER_AGENT};
use trawl::HttpTransport;

mod common;
use common::helpers::*;

fn headers_with_agent(agent: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(agent));
    headers
}

#[test]
fn test_default_config() {
    let config = HttpClientConfig::default();
    assert_eq!(config.retries, 3);
    assert!(config.proxy.is_none());
    assert!(config.headers.is_none());
    assert!(config.user_agent.is_none());
}

#[test]
fn test_create_http_client_default() {
    let client = create_http_client(HttpClientConfig::default());
    assert!(client.is_ok());
}

#[test]
fn test_create_http_client_with_everything() {
    let config = HttpClientConfig {
        retries: 5,
        proxy: Some(reqwest::Proxy::all("http://127.0.0.1:3128").unwrap()),
        headers: Some(headers_with_agent(TEST_USER_AGENT)),
        user_agent: Some(TEST_USER_AGENT.into()),
        connect_timeout: Some(Duration::from_secs(1)),
    };
    assert!(create_http_client(config).is_ok());
}

#[test]
fn test_http_config_with_custom_headers() {
    let config = HttpClientConfig {
        retries: 2,
        headers: Some(headers_with_agent("custom-test-agent")),
        ..HttpClientConfig::default()
    };

    assert_eq!(config.retries, 2);
    assert_eq!(
        config.headers.unwrap().get(USER_AGENT),
        Some(&HeaderValue::from_static("custom-test-agent"))
    );
}

#[test]
fn test_default_user_agent_names_the_crate() {
    assert_eq!(
        DEFAULT_USER_AGENT,
        format!("trawl/{}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn test_transport_from_config() {
    let transport = HttpTransport::new(HttpClientConfig::default()).unwrap();
    assert!(format!("{:?}", transport).starts_with("HttpTransport"));
}
