//! Last.fm `user.gettopartists` client.
//!
//! The payload is kept loosely typed (names may be missing, playcounts arrive
//! as strings) and normalized later by [`crate::processor`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Public Last.fm REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://ws.audioscrobbler.com/2.0/";
/// Whole-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum LastFmError {
    /// Transport failure (connect, timeout, body read)
    #[error("HTTP request to Last.fm failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response without an API error payload
    #[error("Last.fm returned HTTP {status}")]
    Status { status: u16 },

    /// Payload carried an `error` field
    #[error("Last.fm error {code}: {message}")]
    Api { code: i64, message: String },

    /// Body was not the expected JSON
    #[error("Failed to decode Last.fm response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unknown period '{0}' (expected overall, 7day, 1month, 3month, 6month or 12month)")]
    InvalidPeriod(String),
}

/// Time range a top-artists chart covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "overall")]
    Overall,
    #[serde(rename = "7day")]
    Week,
    #[default]
    #[serde(rename = "1month")]
    Month,
    #[serde(rename = "3month")]
    Quarter,
    #[serde(rename = "6month")]
    HalfYear,
    #[serde(rename = "12month")]
    Year,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overall => "overall",
            Self::Week => "7day",
            Self::Month => "1month",
            Self::Quarter => "3month",
            Self::HalfYear => "6month",
            Self::Year => "12month",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = LastFmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "overall" => Ok(Self::Overall),
            "7day" => Ok(Self::Week),
            "1month" => Ok(Self::Month),
            "3month" => Ok(Self::Quarter),
            "6month" => Ok(Self::HalfYear),
            "12month" => Ok(Self::Year),
            other => Err(LastFmError::InvalidPeriod(other.to_string())),
        }
    }
}

/// Top-level `user.gettopartists` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopArtistsResponse {
    #[serde(default)]
    pub topartists: TopArtists,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopArtists {
    #[serde(default)]
    pub artist: Vec<RawArtist>,
}

/// One artist entry as Last.fm sends it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawArtist {
    #[serde(default)]
    pub name: Option<String>,
    /// Usually a decimal string, occasionally a number.
    #[serde(default)]
    pub playcount: Option<serde_json::Value>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Parse a response body, surfacing `{"error": .., "message": ..}` payloads.
pub fn parse_response(body: &str) -> Result<TopArtistsResponse, LastFmError> {
    let value: serde_json::Value = serde_json::from_str(body)?;

    if let Some(code) = value.get("error") {
        return Err(LastFmError::Api {
            code: code.as_i64().unwrap_or_default(),
            message: value
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_string(),
        });
    }

    Ok(serde_json::from_value(value)?)
}

pub struct LastFmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    user: String,
}

impl LastFmClient {
    pub fn new(api_key: impl Into<String>, user: impl Into<String>) -> Result<Self, LastFmError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            user: user.into(),
        })
    }

    /// Point the client at another endpoint (local stubs in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Fetch one page of the user's top artists for `period`.
    pub async fn fetch_top_artists(
        &self,
        period: Period,
        limit: u32,
        page: u32,
    ) -> Result<TopArtistsResponse, LastFmError> {
        let limit = limit.to_string();
        let page = page.to_string();

        info!(user = %self.user, %period, %limit, %page, "Fetching top artists");

        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("method", "user.gettopartists"),
                ("user", self.user.as_str()),
                ("api_key", self.api_key.as_str()),
                ("period", period.as_str()),
                ("limit", limit.as_str()),
                ("page", page.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "Last.fm responded");

        if !status.is_success() {
            return match parse_response(&body) {
                Err(err @ LastFmError::Api { .. }) => Err(err),
                _ => Err(LastFmError::Status {
                    status: status.as_u16(),
                }),
            };
        }

        let parsed = parse_response(&body)?;
        info!(count = parsed.topartists.artist.len(), "Received top artists");
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_reads_artists() {
        let body = r#"{
            "topartists": {
                "artist": [
                    {"name": "Artist A", "playcount": "42", "url": "https://example.com/a"},
                    {"name": "Artist B", "playcount": 7}
                ],
                "@attr": {"user": "someone", "page": "1"}
            }
        }"#;

        let parsed = parse_response(body).unwrap();
        let artists = &parsed.topartists.artist;
        assert_eq!(artists.len(), 2);
        assert_eq!(artists[0].name.as_deref(), Some("Artist A"));
        assert_eq!(artists[0].url.as_deref(), Some("https://example.com/a"));
        assert_eq!(artists[1].playcount, Some(serde_json::json!(7)));
        assert!(artists[1].url.is_none());
    }

    #[test]
    fn test_parse_response_surfaces_api_error() {
        let body = r#"{"error": 6, "message": "User not found"}"#;
        match parse_response(body) {
            Err(LastFmError::Api { code, message }) => {
                assert_eq!(code, 6);
                assert_eq!(message, "User not found");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_response_tolerates_missing_sections() {
        let parsed = parse_response("{}").unwrap();
        assert!(parsed.topartists.artist.is_empty());

        assert!(matches!(
            parse_response("not json"),
            Err(LastFmError::Decode(_))
        ));
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!(" 7day ".parse::<Period>().unwrap(), Period::Week);
        assert_eq!(Period::default().as_str(), "1month");
        assert!(matches!(
            "fortnight".parse::<Period>(),
            Err(LastFmError::InvalidPeriod(p)) if p == "fortnight"
        ));
    }
}
