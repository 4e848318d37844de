use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Custom encode set for application/x-www-form-urlencoded allowing unreserved characters including hyphens
const FORM_URLENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Encodes a string for URL safety and returns an owned `String`
///
/// # Example
/// ```
/// use dropbox_oauth::encode_url_owned;
/// let encoded = encode_url_owned("Hello World!");
/// assert_eq!(encoded, "Hello%20World%21");
/// ```
pub fn encode_url_owned(input: &str) -> String {
    utf8_percent_encode(input, FORM_URLENCODE_SET).to_string()
}

/// Decodes a form-urlencoded string and returns an owned `String`.
///
/// `+` is read as a space, as browsers send it in query strings and form bodies.
/// Invalid UTF-8 sequences are replaced rather than rejected.
pub fn decode_url_owned(input: &str) -> String {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Ordered list of form-urlencoded key/value pairs.
///
/// Used both for the parameters of an incoming callback request and for the
/// body of the outgoing token request, where field order is kept as inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlEncodedForm {
    pairs: Vec<(String, String)>,
}

impl UrlEncodedForm {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Parses a query string or form body. A leading `?` is ignored, and a key
    /// without `=` is kept with an empty value.
    pub fn parse(input: &str) -> Self {
        let input = input.strip_prefix('?').unwrap_or(input);
        let pairs = input
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (decode_url_owned(key), decode_url_owned(value)),
                None => (decode_url_owned(pair), String::new()),
            })
            .collect();
        Self { pairs }
    }

    /// Parses raw body bytes, replacing invalid UTF-8.
    pub fn parse_bytes(body: &[u8]) -> Self {
        Self::parse(&String::from_utf8_lossy(body))
    }

    /// Appends a pair and returns the form, for chained construction.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// Gets the first value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Encodes the form as `k1=v1&k2=v2` bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for UrlEncodedForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{}={}", encode_url_owned(key), encode_url_owned(value))?;
        }
        Ok(())
    }
}
