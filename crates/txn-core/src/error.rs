use std::fmt;
use thiserror::Error;

/// Which pipeline step of the ordered commit sequence failed.
///
/// Recorded for diagnostics only; it narrows within [`TxnError::Io`] and is
/// not itself a distinct externally observable error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStep {
    Writeback,
    AllocSegno,
    NewSegment,
    DrainItems,
    SubmitSegment,
    WritebackSubmit,
    WaitCompletion,
    RecordSegment,
    AdvanceSeq,
}

impl fmt::Display for CommitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommitStep::Writeback => "inode writeback start",
            CommitStep::AllocSegno => "segment number allocation",
            CommitStep::NewSegment => "segment instantiation",
            CommitStep::DrainItems => "drain dirty items into segment",
            CommitStep::SubmitSegment => "submit segment I/O",
            CommitStep::WritebackSubmit => "inode writeback submit",
            CommitStep::WaitCompletion => "wait for I/O completion",
            CommitStep::RecordSegment => "record segment in manifest",
            CommitStep::AdvanceSeq => "advance sequence number",
        };
        f.write_str(name)
    }
}

/// A collaborator-reported failure, as surfaced by the `txn-store` traits.
///
/// Kept string-based and `Clone` so that a single commit failure can be
/// handed to every waiter blocked on [`crate::SyncGate::sync`] without
/// needing the underlying collaborator error to itself be `Clone`.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Unified error taxonomy for the transaction commit core.
#[derive(Debug, Clone, Error)]
pub enum TxnError {
    /// Nonsensical `ItemCount` passed to `hold`, or a count that could
    /// never fit a single segment on its own.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Reservation bookkeeping allocation failed.
    #[error("reservation allocation failed")]
    OutOfMemory,

    /// A wait on the hold or sync waitqueue was cut short by shutdown.
    #[error("operation interrupted")]
    Interrupted,

    /// A commit pipeline step failed. Carries the first failing step.
    #[error("commit pipeline step failed ({step}): {source}")]
    Io {
        step: CommitStep,
        #[source]
        source: StoreError,
    },

    /// A control-plane RPC failed. A flavor of `Io` kept distinct because
    /// callers often want to retry control-plane errors differently than
    /// local I/O errors.
    #[error("control plane request failed: {0}")]
    ControlPlane(#[source] StoreError),
}

impl TxnError {
    pub(crate) fn io(step: CommitStep, source: StoreError) -> Self {
        TxnError::Io { step, source }
    }

    pub(crate) fn control(source: StoreError) -> Self {
        TxnError::ControlPlane(source)
    }

    /// `true` for errors the commit pipeline can simply retry on the next
    /// attempt without additional caller intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TxnError::Io { .. } | TxnError::ControlPlane(_))
    }
}

pub type Result<T> = std::result::Result<T, TxnError>;
