//! Processor configuration.
//!
//! Options carry everything a processor needs besides the anchor itself:
//! the content store, the DID method prefix, an optional DID-of-interest
//! filter, the per-fetch deadline, protocol parameters, and the fee hooks.
//!
//! Fee hooks are caller-supplied closures; when a hook is absent its check
//! is bypassed. They are plain trait objects on the options value, never
//! global registrations.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::cas::ContentStore;
use crate::protocol::ProtocolParameters;

/// Computes the base fee for a batch: `(op_count, sequence) -> base_fee`.
pub type BaseFeeFn = Box<dyn Fn(u64, &str) -> u64 + Send + Sync>;

/// Accepts or rejects the per-operation fee:
/// `(base_fee, op_count, sequence) -> accepted`.
pub type PerOperationFeeFn = Box<dyn Fn(u64, u64, &str) -> bool + Send + Sync>;

/// Accepts or rejects the writer's value lock:
/// `(writer_lock_id, op_count, base_fee, sequence) -> accepted`.
pub type ValueLockFn = Box<dyn Fn(&str, u64, u64, &str) -> bool + Send + Sync>;

/// The three optional fee hooks.
#[derive(Default)]
pub struct FeePolicy {
    /// Base-fee algorithm; absent means a base fee of zero.
    pub base_fee: Option<BaseFeeFn>,
    /// Per-operation fee predicate; absent means accepted.
    pub per_operation_fee: Option<PerOperationFeeFn>,
    /// Value-lock predicate; absent means accepted.
    pub value_lock: Option<ValueLockFn>,
}

impl std::fmt::Debug for FeePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeePolicy")
            .field("base_fee", &self.base_fee.is_some())
            .field("per_operation_fee", &self.per_operation_fee.is_some())
            .field("value_lock", &self.value_lock.is_some())
            .finish()
    }
}

/// Configuration shared by every processor in a batch run.
#[derive(Debug)]
pub struct ProcessorOptions {
    /// DID method prefix, e.g. `ion`. Must be non-empty.
    pub method: String,
    /// The content store serving batch files.
    pub cas: Option<Arc<dyn ContentStore>>,
    /// DID suffixes of interest; empty passes every DID through.
    pub did_filter: HashSet<String>,
    /// Per-fetch deadline handed to the content store.
    pub fetch_deadline: Option<Duration>,
    /// Protocol constants.
    pub protocol: ProtocolParameters,
    /// Fee hooks.
    pub fees: FeePolicy,
}

impl ProcessorOptions {
    /// Starts building options.
    #[must_use]
    pub fn builder() -> ProcessorOptionsBuilder {
        ProcessorOptionsBuilder::default()
    }
}

/// Builder for [`ProcessorOptions`].
#[derive(Debug, Default)]
pub struct ProcessorOptionsBuilder {
    method: String,
    cas: Option<Arc<dyn ContentStore>>,
    did_filter: HashSet<String>,
    fetch_deadline: Option<Duration>,
    protocol: ProtocolParameters,
    fees: FeePolicy,
}

impl ProcessorOptionsBuilder {
    /// Sets the DID method prefix.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Sets the content store.
    #[must_use]
    pub fn cas(mut self, cas: Arc<dyn ContentStore>) -> Self {
        self.cas = Some(cas);
        self
    }

    /// Restricts output to the given DID suffixes. An empty iterator
    /// leaves the output unfiltered.
    #[must_use]
    pub fn dids<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.did_filter = suffixes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the per-fetch deadline.
    #[must_use]
    pub fn fetch_deadline(mut self, deadline: Duration) -> Self {
        self.fetch_deadline = Some(deadline);
        self
    }

    /// Overrides the protocol parameters.
    #[must_use]
    pub fn protocol(mut self, protocol: ProtocolParameters) -> Self {
        self.protocol = protocol;
        self
    }

    /// Installs the base-fee algorithm.
    #[must_use]
    pub fn base_fee<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, &str) -> u64 + Send + Sync + 'static,
    {
        self.fees.base_fee = Some(Box::new(f));
        self
    }

    /// Installs the per-operation fee predicate.
    #[must_use]
    pub fn per_operation_fee<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, u64, &str) -> bool + Send + Sync + 'static,
    {
        self.fees.per_operation_fee = Some(Box::new(f));
        self
    }

    /// Installs the value-lock predicate.
    #[must_use]
    pub fn value_lock<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, u64, u64, &str) -> bool + Send + Sync + 'static,
    {
        self.fees.value_lock = Some(Box::new(f));
        self
    }

    /// Finishes the build.
    ///
    /// Preconditions (non-empty method, a configured store) are checked by
    /// the processor constructor, not here, so that a misconfiguration is
    /// reported per anchor in the processed-operations record.
    #[must_use]
    pub fn build(self) -> ProcessorOptions {
        ProcessorOptions {
            method: self.method,
            cas: self.cas,
            did_filter: self.did_filter,
            fetch_deadline: self.fetch_deadline,
            protocol: self.protocol,
            fees: self.fees,
        }
    }
}
