//! Music providers supported by TunePilot.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Error returned when a provider name or URL is not recognized.
#[derive(Debug, Clone, Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);

/// An external music source with its own downloader collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Apple Music.
    Apple,
    /// Tidal.
    Tidal,
    /// Deezer.
    Deezer,
    /// Qobuz.
    Qobuz,
}

impl Provider {
    /// All supported providers.
    pub const ALL: [Provider; 4] = [
        Provider::Apple,
        Provider::Tidal,
        Provider::Deezer,
        Provider::Qobuz,
    ];

    /// Returns the canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Apple => "apple",
            Provider::Tidal => "tidal",
            Provider::Deezer => "deezer",
            Provider::Qobuz => "qobuz",
        }
    }

    /// Detects the provider from a share URL.
    ///
    /// Recognizes the public link domains of each provider. Returns
    /// `UnknownProvider` for anything else, including unparseable URLs.
    pub fn detect(url: &str) -> Result<Self, UnknownProvider> {
        let parsed = Url::parse(url).map_err(|_| UnknownProvider(url.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| UnknownProvider(url.to_string()))?;

        let host = host.strip_prefix("www.").unwrap_or(host);
        match host {
            "music.apple.com" => Ok(Provider::Apple),
            "tidal.com" | "listen.tidal.com" => Ok(Provider::Tidal),
            "deezer.com" | "dzr.page.link" => Ok(Provider::Deezer),
            "qobuz.com" | "open.qobuz.com" | "play.qobuz.com" => Ok(Provider::Qobuz),
            _ => Err(UnknownProvider(url.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "apple" => Ok(Provider::Apple),
            "tidal" => Ok(Provider::Tidal),
            "deezer" => Ok(Provider::Deezer),
            "qobuz" => Ok(Provider::Qobuz),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_roundtrip() {
        for p in Provider::ALL {
            assert_eq!(p.as_str().parse::<Provider>().unwrap(), p);
        }
    }

    #[test]
    fn test_from_str_case_insensitive() {
        assert_eq!("Apple".parse::<Provider>().unwrap(), Provider::Apple);
        assert_eq!("TIDAL".parse::<Provider>().unwrap(), Provider::Tidal);
    }

    #[test]
    fn test_from_str_unknown() {
        assert!("spotify".parse::<Provider>().is_err());
    }

    #[test]
    fn test_detect_apple() {
        let p = Provider::detect("https://music.apple.com/us/album/example/1440833098").unwrap();
        assert_eq!(p, Provider::Apple);
    }

    #[test]
    fn test_detect_tidal_variants() {
        assert_eq!(
            Provider::detect("https://tidal.com/browse/album/12345").unwrap(),
            Provider::Tidal
        );
        assert_eq!(
            Provider::detect("https://listen.tidal.com/album/12345").unwrap(),
            Provider::Tidal
        );
    }

    #[test]
    fn test_detect_strips_www() {
        assert_eq!(
            Provider::detect("https://www.deezer.com/album/98765").unwrap(),
            Provider::Deezer
        );
    }

    #[test]
    fn test_detect_unknown_host() {
        assert!(Provider::detect("https://example.com/song/1").is_err());
    }

    #[test]
    fn test_detect_not_a_url() {
        assert!(Provider::detect("not a url").is_err());
    }

    #[test]
    fn test_serialization() {
        assert_eq!(
            serde_json::to_string(&Provider::Qobuz).unwrap(),
            "\"qobuz\""
        );
        let p: Provider = serde_json::from_str("\"deezer\"").unwrap();
        assert_eq!(p, Provider::Deezer);
    }
}
