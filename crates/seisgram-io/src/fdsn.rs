//! FDSN dataselect web service client.

use crate::merge::acquire_from_bytes;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use seisgram_core::{Acquisition, WaveformRequest, WaveformSource};
use std::time::Duration;

/// GEOFON data centre.
pub const GEOFON_URL: &str = "https://geofon.gfz-potsdam.de";
/// IRIS data management center.
pub const IRIS_URL: &str = "https://service.iris.edu";
/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

const DATASELECT_PATH: &str = "fdsnws/dataselect/1/query";
const USER_AGENT: &str = concat!("seisgram/", env!("CARGO_PKG_VERSION"));

/// Map a provider short name to its base URL; anything else is taken as a URL.
pub fn resolve_provider(provider: &str) -> String {
    match provider.to_ascii_uppercase().as_str() {
        "GEOFON" | "GFZ" => GEOFON_URL.to_string(),
        "IRIS" => IRIS_URL.to_string(),
        _ => provider.trim_end_matches('/').to_string(),
    }
}

fn fdsn_time(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Blocking client for `fdsnws/dataselect`.
pub struct FdsnClient {
    client: Client,
    base_url: String,
}

impl FdsnClient {
    /// Client for a provider name (`GEOFON`, `IRIS`) or base URL.
    pub fn new(provider: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: resolve_provider(provider),
        })
    }

    /// Resolved base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full dataselect endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url, DATASELECT_PATH)
    }

    /// Query parameters for a request, covering the buffered window.
    pub fn query_params(request: &WaveformRequest) -> Vec<(&'static str, String)> {
        let location = if request.stream.location.is_empty() {
            "--".to_string()
        } else {
            request.stream.location.clone()
        };

        vec![
            ("net", request.stream.network.clone()),
            ("sta", request.stream.station.clone()),
            ("loc", location),
            ("cha", request.stream.channel.clone()),
            ("start", fdsn_time(request.padded_start())),
            ("end", fdsn_time(request.padded_end())),
            ("nodata", "404".to_string()),
        ]
    }

    /// Undecoded miniSEED bytes, or `None` when the service has no data.
    pub fn fetch_raw(&self, request: &WaveformRequest) -> Result<Option<Vec<u8>>> {
        let http_request = self
            .client
            .get(self.endpoint())
            .query(&Self::query_params(request))
            .build()?;
        let url = http_request.url().to_string();
        tracing::debug!(%url, "dataselect query");

        let response = self.client.execute(http_request)?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes()?;
        if body.is_empty() {
            return Ok(None);
        }
        Ok(Some(body.to_vec()))
    }
}

impl WaveformSource for FdsnClient {
    fn fetch(&self, request: &WaveformRequest) -> Acquisition {
        match self.fetch_raw(request) {
            Ok(Some(bytes)) => acquire_from_bytes(&bytes, request),
            Ok(None) => Acquisition::unavailable(format!("no data for {}", request.stream)),
            Err(e) => {
                tracing::warn!(error = %e, stream = %request.stream, "dataselect request failed");
                Acquisition::unavailable(e.to_string())
            }
        }
    }

    fn describe(&self) -> String {
        format!("FDSN dataselect at {}", self.base_url)
    }
}
