use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("invalid address: {0}")]
    Invalid(#[from] url::ParseError),
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
    #[error("address has no host")]
    MissingHost,
}

/// Network location of a node
///
/// Accepts `host`, `host:port` or a full URL; anything after the authority
/// is dropped. A missing scheme means plain `http`, and plain-http
/// addresses display as bare `host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(Url);

impl Address {
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AddressError::Empty);
        }

        let mut url = if input.contains("://") {
            Url::parse(input)?
        } else {
            Url::parse(&format!("http://{}", input))?
        };

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(AddressError::UnsupportedScheme(url.scheme().to_string()));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(AddressError::MissingHost);
        }

        url.set_path("/");
        url.set_query(None);
        url.set_fragment(None);
        let _ = url.set_username("");
        let _ = url.set_password(None);

        Ok(Self(url))
    }

    /// `host[:port]`
    pub fn authority(&self) -> String {
        let host = self.0.host_str().unwrap_or_default();
        match self.0.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// Absolute URL for an endpoint on this node
    pub fn endpoint(&self, path: &str) -> Url {
        let mut url = self.0.clone();
        url.set_path(path);
        url
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.scheme() == "http" {
            f.write_str(&self.authority())
        } else {
            write!(f, "{}://{}", self.0.scheme(), self.authority())
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_normalization() {
        for (input, expected) in [
            ("example.com", "example.com"),
            ("example.com:1337", "example.com:1337"),
            ("http://example.com:1337/", "example.com:1337"),
            ("http://example.com:1337/api/feed?x=1", "example.com:1337"),
            ("  localhost:8080  ", "localhost:8080"),
            ("https://blade.example.org/", "https://blade.example.org"),
            ("https://blade.example.org:8443/x", "https://blade.example.org:8443"),
        ] {
            assert_eq!(Address::parse(input).unwrap().to_string(), expected);
        }
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(Address::parse(""), Err(AddressError::Empty)));
        assert!(matches!(
            Address::parse("ftp://example.com"),
            Err(AddressError::UnsupportedScheme(_))
        ));
        assert!(Address::parse("http://").is_err());
    }

    #[test]
    fn test_endpoint() {
        let address = Address::parse("example.com:1337").unwrap();
        assert_eq!(
            address.endpoint("/api/feed").as_str(),
            "http://example.com:1337/api/feed"
        );
        assert_eq!(Address::parse("http://example.com:1337").unwrap(), address);
    }
}
