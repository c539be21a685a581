//! `fetch-retry` wraps a single async HTTP request in a retry policy.
//!
//! Policies can be set per exact status (`status_502`), per status class
//! (`status_5xx`), or fall back to a base policy:
//! - [`fetch_retry`] sends a [`RequestDescriptor`] through `reqwest`
//! - [`FetchRetry::execute`] drives any [`Transport`]
//! - [`RetryOptions`] holds the base policy and overrides
//!
//! Failing statuses are never turned into errors: once the retry budget is
//! spent, the last response is returned and callers check its status.
//! Only transport failures surface as `Err`.

mod error;
mod executor;
mod options;
mod selector;
mod transport;
mod wire;

pub use error::FetchRetryError;
pub use executor::{fetch_retry, FetchRetry};
pub use options::{
    EffectivePolicy, RetryContext, RetryOptions, RetryPolicy, RetryTimeout, TransportOptions,
};
pub use selector::StatusSelector;
pub use transport::{FnTransport, HasStatus, ReqwestTransport, RequestDescriptor, Transport};

pub type Result<T> = std::result::Result<T, FetchRetryError>;
