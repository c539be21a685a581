use std::fmt;

use tokio::time::sleep;

use crate::{
    HasStatus, ReqwestTransport, RequestDescriptor, Result, RetryContext, RetryOptions,
    RetryTimeout, Transport,
};

/// Sends a request through the default [`ReqwestTransport`], retrying per `options`.
///
/// Failing statuses are returned as responses; only transport errors are
/// returned as `Err`.
pub async fn fetch_retry(
    request: &RequestDescriptor,
    options: Option<&RetryOptions>,
) -> Result<reqwest::Response> {
    FetchRetry::new().execute(request, options).await
}

/// Retrying request executor around a [`Transport`].
///
/// Calls are independent: each [`execute`](FetchRetry::execute) keeps its
/// own retry counter. There is no overall deadline; wrap the call in
/// `tokio::time::timeout` when one is needed.
#[derive(Clone, Debug, Default)]
pub struct FetchRetry<T = ReqwestTransport> {
    transport: T,
}

impl FetchRetry {
    /// Creates an executor over a fresh `reqwest::Client`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T> FetchRetry<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `request`, retrying according to `options`.
    ///
    /// Without options, or when the base policy lacks a non-zero
    /// `max_retries` or a set `retry_timeout`, the transport is called
    /// exactly once and its outcome returned unchanged.
    ///
    /// Otherwise every response is checked against the policy resolved for
    /// its own status. Accepted responses return immediately; a retry-worthy
    /// response is returned as-is once the resolved budget is exhausted.
    /// Transport errors are retried under the base budget only, then
    /// returned as `Err`.
    pub async fn execute<Req>(
        &self,
        request: &Req,
        options: Option<&RetryOptions<T::Response, T::Error>>,
    ) -> std::result::Result<T::Response, T::Error>
    where
        T: Transport<Req>,
        T::Error: fmt::Display,
    {
        let Some((options, base)) = options.and_then(|o| o.base_policy().map(|base| (o, base)))
        else {
            return self.transport.send(request).await;
        };

        let target = Target(self.transport.describe(request));
        let mut retries = 0u32;
        loop {
            match self.transport.send(request).await {
                Ok(response) => {
                    let status = response.status_code();
                    let Some(policy) = options.retry_policy_for(status) else {
                        return Ok(response);
                    };

                    retries += 1;
                    if retries > policy.max_retries {
                        trace_give_up(options.verbose, &target, format_args!("status {status}"));
                        return Ok(response);
                    }

                    trace_retry(
                        options.verbose,
                        &target,
                        format_args!("status {status}"),
                        retries,
                        policy.retry_timeout,
                    );
                    wait_before_retry(policy.retry_timeout, RetryContext::Response(&response))
                        .await;
                }
                Err(err) => {
                    retries += 1;
                    if retries > base.max_retries {
                        trace_give_up(options.verbose, &target, &err);
                        return Err(err);
                    }

                    trace_retry(
                        options.verbose,
                        &target,
                        &err,
                        retries,
                        base.retry_timeout,
                    );
                    wait_before_retry(base.retry_timeout, RetryContext::Error(&err)).await;
                }
            }
        }
    }
}

async fn wait_before_retry<Res, E>(timeout: &RetryTimeout<Res, E>, ctx: RetryContext<'_, Res, E>) {
    match timeout {
        RetryTimeout::Fixed(delay) => sleep(*delay).await,
        RetryTimeout::Dynamic(callback) => callback(ctx).await,
    }
}

/// Request named in retry log lines.
struct Target<'a>(Option<&'a (dyn fmt::Display + Sync)>);

impl fmt::Display for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(request) => write!(f, "request ({request})"),
            None => f.write_str("request"),
        }
    }
}

#[cfg(feature = "tracing")]
fn trace_retry<Res, E>(
    verbose: bool,
    target: &Target<'_>,
    cause: impl fmt::Display,
    retries: u32,
    timeout: &RetryTimeout<Res, E>,
) {
    if verbose {
        tracing::info!("{target} failed, {cause}, retrying ({retries}) in {timeout}");
    } else {
        tracing::debug!("{target} failed, {cause}, retrying ({retries}) in {timeout}");
    }
}

#[cfg(not(feature = "tracing"))]
fn trace_retry<Res, E>(
    _verbose: bool,
    _target: &Target<'_>,
    _cause: impl fmt::Display,
    _retries: u32,
    _timeout: &RetryTimeout<Res, E>,
) {
}

#[cfg(feature = "tracing")]
fn trace_give_up(verbose: bool, target: &Target<'_>, cause: impl fmt::Display) {
    if verbose {
        tracing::warn!("{target} failed, {cause}, no more retries");
    } else {
        tracing::debug!("{target} failed, {cause}, no more retries");
    }
}

#[cfg(not(feature = "tracing"))]
fn trace_give_up(_verbose: bool, _target: &Target<'_>, _cause: impl fmt::Display) {}
