//! Case-insensitive message headers, as delivered by the broker alongside
//! the raw payload.

/// A flat list of header name/value pairs. Broker client libraries
/// typically hand these back as a list rather than a map (repeated header
/// names are legal in AMQP/Kafka), so lookups scan linearly and compare
/// names case-insensitively per RFC 7230 semantics.
#[derive(Debug, Clone, Default)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Looks up a header by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over the raw name/value pairs, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("X-Correlation-ID", "abc-123");
        assert_eq!(headers.get("x-correlation-id"), Some("abc-123"));
        assert_eq!(headers.get("X-CORRELATION-ID"), Some("abc-123"));
    }

    #[test]
    fn get_missing_returns_none() {
        let headers = Headers::new();
        assert_eq!(headers.get("X-Correlation-ID"), None);
    }
}
