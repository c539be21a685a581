use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};

use crate::{wire, FetchRetryError, Result, StatusSelector};

/// Outcome handed to a [`RetryTimeout::Dynamic`] callback.
#[derive(Debug)]
pub enum RetryContext<'a, Res, E> {
    /// A response whose status asked for a retry.
    Response(&'a Res),
    /// A transport failure.
    Error(&'a E),
}

type WaitFn<Res, E> = dyn Fn(RetryContext<'_, Res, E>) -> BoxFuture<'static, ()> + Send + Sync;

/// How long to wait before the next attempt.
pub enum RetryTimeout<Res = reqwest::Response, E = FetchRetryError> {
    /// Sleep for a fixed duration.
    Fixed(Duration),
    /// Await a caller-supplied future built from the last outcome.
    ///
    /// The retry loop has no timeout of its own around this future.
    Dynamic(Arc<WaitFn<Res, E>>),
}

impl<Res, E> RetryTimeout<Res, E> {
    pub fn fixed_ms(ms: u64) -> Self {
        Self::Fixed(Duration::from_millis(ms))
    }

    /// Wraps an async callback.
    ///
    /// The returned future must not borrow the context; copy what it needs
    /// (status, error message) before the `async move` block.
    pub fn dynamic<F, Fut>(callback: F) -> Self
    where
        Res: 'static,
        E: 'static,
        F: Fn(RetryContext<'_, Res, E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::Dynamic(Arc::new(move |ctx: RetryContext<'_, Res, E>| {
            callback(ctx).boxed()
        }))
    }

    /// A zero fixed timeout counts as unset.
    pub fn is_set(&self) -> bool {
        match self {
            Self::Fixed(delay) => !delay.is_zero(),
            Self::Dynamic(_) => true,
        }
    }
}

impl<Res, E> Clone for RetryTimeout<Res, E> {
    fn clone(&self) -> Self {
        match self {
            Self::Fixed(delay) => Self::Fixed(*delay),
            Self::Dynamic(callback) => Self::Dynamic(Arc::clone(callback)),
        }
    }
}

impl<Res, E> fmt::Debug for RetryTimeout<Res, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(delay) => f.debug_tuple("Fixed").field(delay).finish(),
            Self::Dynamic(_) => f.debug_tuple("Dynamic").field(&"<callback>").finish(),
        }
    }
}

impl<Res, E> fmt::Display for RetryTimeout<Res, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(delay) => write!(f, "{} ms", delay.as_millis()),
            Self::Dynamic(_) => f.write_str("callback"),
        }
    }
}

/// Retry budget and wait rule, used as the base policy or as an override.
pub struct RetryPolicy<Res = reqwest::Response, E = FetchRetryError> {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: Option<u32>,
    pub retry_timeout: Option<RetryTimeout<Res, E>>,
}

impl<Res, E> RetryPolicy<Res, E> {
    pub fn new(max_retries: u32, retry_timeout: RetryTimeout<Res, E>) -> Self {
        Self {
            max_retries: Some(max_retries),
            retry_timeout: Some(retry_timeout),
        }
    }

    /// A policy with no fields set. As an override it still marks its
    /// statuses retry-worthy and inherits budget and wait from the base.
    pub fn empty() -> Self {
        Self {
            max_retries: None,
            retry_timeout: None,
        }
    }
}

impl<Res, E> Default for RetryPolicy<Res, E> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<Res, E> Clone for RetryPolicy<Res, E> {
    fn clone(&self) -> Self {
        Self {
            max_retries: self.max_retries,
            retry_timeout: self.retry_timeout.clone(),
        }
    }
}

impl<Res, E> fmt::Debug for RetryPolicy<Res, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("retry_timeout", &self.retry_timeout)
            .finish()
    }
}

/// Policy fields resolved for one retry decision.
#[derive(Debug)]
pub struct EffectivePolicy<'a, Res, E> {
    pub max_retries: u32,
    pub retry_timeout: &'a RetryTimeout<Res, E>,
    /// Override that matched, `None` for the base policy.
    pub selector: Option<StatusSelector>,
}

/// Retry configuration for one call.
///
/// Retries engage only when the base policy is complete: a non-zero
/// `max_retries` and a set `retry_timeout`. Otherwise the request is sent
/// exactly once.
pub struct RetryOptions<Res = reqwest::Response, E = FetchRetryError> {
    pub base: RetryPolicy<Res, E>,
    pub overrides: HashMap<StatusSelector, RetryPolicy<Res, E>>,
    /// Raises retry diagnostics from `debug` to `info`/`warn`.
    pub verbose: bool,
}

impl<Res, E> RetryOptions<Res, E> {
    /// Creates options with a complete base policy.
    pub fn new(max_retries: u32, retry_timeout: RetryTimeout<Res, E>) -> Self {
        Self {
            base: RetryPolicy::new(max_retries, retry_timeout),
            overrides: HashMap::new(),
            verbose: false,
        }
    }

    pub fn with_override(mut self, selector: StatusSelector, policy: RetryPolicy<Res, E>) -> Self {
        self.overrides.insert(selector, policy);
        self
    }

    /// Adds an override for one exact status, e.g. `status_429`.
    pub fn with_status(self, status: u16, policy: RetryPolicy<Res, E>) -> Self {
        self.with_override(StatusSelector::Exact(status), policy)
    }

    /// Adds an override for a status class, e.g. `5` for `status_5xx`.
    pub fn with_class(self, digit: u8, policy: RetryPolicy<Res, E>) -> Self {
        self.with_override(StatusSelector::Class(digit), policy)
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Parses options from a JSON object in the `retryOptions` layout:
    ///
    /// ```json
    /// { "maxRetries": 3, "retryTimeout": 500, "status_429": { "maxRetries": 5 } }
    /// ```
    ///
    /// Timeouts are milliseconds. Keys other than `maxRetries`,
    /// `retryTimeout`, `verbose` and `status_*` selectors are rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc = serde_json::from_str::<wire::RetryOptionsDoc>(json)
            .map_err(|err| FetchRetryError::Decode(format!("invalid retry options JSON: {err}")))?;

        let overrides = doc
            .overrides
            .into_iter()
            .map(|(key, policy)| -> Result<(StatusSelector, RetryPolicy<Res, E>)> {
                Ok((key.parse()?, policy.into()))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(Self {
            base: RetryPolicy {
                max_retries: doc.max_retries,
                retry_timeout: doc.retry_timeout.map(RetryTimeout::fixed_ms),
            },
            overrides,
            verbose: doc.verbose,
        })
    }

    /// Returns the base policy when it is complete enough to enable retries.
    pub fn base_policy(&self) -> Option<EffectivePolicy<'_, Res, E>> {
        let max_retries = self.base.max_retries.filter(|&max| max > 0)?;
        let retry_timeout = self.base.retry_timeout.as_ref().filter(|t| t.is_set())?;
        Some(EffectivePolicy {
            max_retries,
            retry_timeout,
            selector: None,
        })
    }

    /// Finds the override for `status`: exact match first, then class.
    pub fn override_for(&self, status: u16) -> Option<(StatusSelector, &RetryPolicy<Res, E>)> {
        [StatusSelector::Exact(status), StatusSelector::class_of(status)]
            .into_iter()
            .find_map(|selector| self.overrides.get(&selector).map(|policy| (selector, policy)))
    }

    /// Resolves the policy governing a retry of a response with `status`.
    ///
    /// Returns `None` when the response should be accepted: no override
    /// matches and the status is in `200..400`. Missing override fields fall
    /// back to the base policy. Must only be called when [`base_policy`]
    /// is `Some`.
    ///
    /// [`base_policy`]: RetryOptions::base_policy
    pub fn retry_policy_for(&self, status: u16) -> Option<EffectivePolicy<'_, Res, E>> {
        let base = self.base_policy()?;
        match self.override_for(status) {
            Some((selector, policy)) => Some(EffectivePolicy {
                max_retries: policy.max_retries.unwrap_or(base.max_retries),
                retry_timeout: policy.retry_timeout.as_ref().unwrap_or(base.retry_timeout),
                selector: Some(selector),
            }),
            None if !(200..400).contains(&status) => Some(base),
            None => None,
        }
    }
}

impl<Res, E> Default for RetryOptions<Res, E> {
    fn default() -> Self {
        Self {
            base: RetryPolicy::empty(),
            overrides: HashMap::new(),
            verbose: false,
        }
    }
}

impl<Res, E> Clone for RetryOptions<Res, E> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            overrides: self.overrides.clone(),
            verbose: self.verbose,
        }
    }
}

impl<Res, E> fmt::Debug for RetryOptions<Res, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("base", &self.base)
            .field("overrides", &self.overrides)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl<Res, E> From<wire::RetryPolicyDoc> for RetryPolicy<Res, E> {
    fn from(doc: wire::RetryPolicyDoc) -> Self {
        Self {
            max_retries: doc.max_retries,
            retry_timeout: doc.retry_timeout.map(RetryTimeout::fixed_ms),
        }
    }
}

/// Options applied by [`ReqwestTransport`](crate::ReqwestTransport) to every attempt.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransportOptions {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}
