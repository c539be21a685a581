use std::fmt;
use std::str::FromStr;

use crate::FetchRetryError;

const PREFIX: &str = "status_";

/// Key of a status-specific retry override.
///
/// Textual form matches configuration keys: `status_502` for an exact
/// status, `status_5xx` for every status sharing the leading digit.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StatusSelector {
    /// A single status code.
    Exact(u16),
    /// All statuses whose decimal form starts with this digit.
    Class(u8),
}

impl StatusSelector {
    /// Returns the class selector for `status`.
    ///
    /// Example: `502` → `Class(5)`.
    pub fn class_of(status: u16) -> Self {
        let mut digit = status;
        while digit >= 10 {
            digit /= 10;
        }
        Self::Class(digit as u8)
    }
}

impl fmt::Display for StatusSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(status) => write!(f, "{PREFIX}{status}"),
            Self::Class(digit) => write!(f, "{PREFIX}{digit}xx"),
        }
    }
}

impl FromStr for StatusSelector {
    type Err = FetchRetryError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let invalid = || FetchRetryError::Config(format!("invalid status selector '{key}'"));

        let rest = key.strip_prefix(PREFIX).ok_or_else(invalid)?;
        if let Some(digit) = rest.strip_suffix("xx") {
            let digit = match digit.as_bytes() {
                [d @ b'0'..=b'9'] => d - b'0',
                _ => return Err(invalid()),
            };
            return Ok(Self::Class(digit));
        }

        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        rest.parse().map(Self::Exact).map_err(|_| invalid())
    }
}
