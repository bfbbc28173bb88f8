//! Error types shared across the engine.
//!
//! Nothing here is fatal for the page agent: every error is recovered
//! locally and the next re-evaluation retries.

/// A structural match-pattern that could not be parsed or evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected character {found:?} at offset {offset} in {pattern:?}")]
    Unexpected {
        pattern: String,
        offset: usize,
        found: char,
    },
    #[error("unterminated {what} in {pattern:?}")]
    Unterminated { pattern: String, what: &'static str },
    #[error("unsupported selector syntax {syntax:?} in {pattern:?}")]
    Unsupported { pattern: String, syntax: String },
    #[error("selector rejected by host: {0}")]
    Host(String),
}

/// The host refused to register or observe something.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    #[error("no document available")]
    NoDocument,
    #[error("failed to register {kind} listener: {reason}")]
    Listener { kind: &'static str, reason: String },
    #[error("failed to observe mutations: {0}")]
    Observer(String),
}

/// The external settings store could not be read or written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("extension storage is unavailable")]
    Unavailable,
    #[error("storage read failed: {0}")]
    Read(String),
    #[error("storage write failed: {0}")]
    Write(String),
}

/// The popup could not reach a page agent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("no active tab")]
    NoActiveTab,
    #[error("no receiver in target page: {0}")]
    NoReceiver(String),
    #[error("extension runtime is unavailable")]
    Unavailable,
}

/// An inbound message that is not a recognised notification.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown feature {0:?}")]
    UnknownFeature(String),
}
