//! Minimal PokeAPI client.
//!
//! This crate provides a focused client for the numbered-ID resource
//! collections of <https://pokeapi.co> with:
//! - Plain JSON `GET` requests with transport and status errors kept apart
//! - A [`Transport`] seam so callers can script responses in tests
//! - Typed resource definitions for the fields the dex consumes

pub mod resources;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use std::time::Duration;
use thiserror::Error;

pub use resources::*;

/// Root of the public API.
pub const DEFAULT_API_BASE: &str = "https://pokeapi.co/api/v2/";

/// Errors that can occur when talking to the API.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}) for {url}")]
    Api { status: u16, url: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether the request never got an HTTP answer (DNS, connect, timeout).
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

/// Numbered collections exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Type,
    Move,
    Ability,
    PokemonSpecies,
}

impl Endpoint {
    /// Path segment of the collection, including the trailing slash.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Type => "type/",
            Endpoint::Move => "move/",
            Endpoint::Ability => "ability/",
            Endpoint::PokemonSpecies => "pokemon-species/",
        }
    }

    /// Absolute URL of resource `id` under `base`.
    pub fn url(self, base: &str, id: u32) -> String {
        let base = base.trim_end_matches('/');
        format!("{base}/{}{id}", self.path())
    }
}

/// Anything that can turn a URL into a JSON document.
///
/// Implemented by [`PokeApi`]; tests implement it with scripted responses.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a `GET` for `url` and decode the body as JSON.
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, Error>;
}

/// PokeAPI client.
#[derive(Clone)]
pub struct PokeApi {
    client: reqwest::Client,
    base_url: String,
}

impl PokeApi {
    /// Create a client against the public API.
    pub fn new() -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Create a client, honouring `POKEAPI_BASE_URL` when it is set.
    pub fn from_env() -> Result<Self, Error> {
        let client = Self::new()?;
        match std::env::var("POKEAPI_BASE_URL") {
            Ok(base) if !base.trim().is_empty() => Ok(client.with_base_url(base)),
            _ => Ok(client),
        }
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The API root this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch and decode resource `id` of `endpoint`.
    pub async fn resource<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        id: u32,
    ) -> Result<T, Error> {
        let value = self.get_json(&endpoint.url(&self.base_url, id)).await?;
        serde_json::from_value(value).map_err(|e| Error::Parse(e.to_string()))
    }
}

#[async_trait]
impl Transport for PokeApi {
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, Error> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        // Only the status is consulted; error bodies are discarded unread.
        if !response.status().is_success() {
            return Err(Error::Api {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        response.json().await.map_err(|e| {
            if e.is_decode() {
                Error::Parse(e.to_string())
            } else {
                Error::Network(e.to_string())
            }
        })
    }
}
