use std::fmt;

use crate::value::Value;

/// A deferred transform registered with [`Signal::map_after`].
pub type PostMap = Box<dyn FnOnce(Value) -> anyhow::Result<Value>>;

/// The verdict a codec handler returns for a key.
///
/// Every variant may carry a replacement for the key's value. Where it is
/// [`None`], the current value is kept.
#[must_use]
pub enum Signal {
    /// Finalize the value: no further handlers run for this key and the walker
    /// does not descend into it.
    Done(Option<Value>),
    /// Accept the value and stop trying handlers, but still let the walker
    /// descend into it if it is a container.
    Recurse(Option<Value>),
    /// Decline. Optionally substitute the value, then try the next handler.
    Continue(Option<Value>),
    /// Decline like [`Signal::Continue`] without a replacement, but transform
    /// the key's value once it is final, that is, after the remaining handlers
    /// and any descent into it are finished.
    MapAfter(PostMap),
}

impl Signal {
    pub const fn done() -> Self {
        Self::Done(None)
    }

    pub fn done_with(value: impl Into<Value>) -> Self {
        Self::Done(Some(value.into()))
    }

    pub const fn recurse() -> Self {
        Self::Recurse(None)
    }

    pub fn recurse_with(value: impl Into<Value>) -> Self {
        Self::Recurse(Some(value.into()))
    }

    /// Declines without changing the value.
    pub const fn next() -> Self {
        Self::Continue(None)
    }

    /// Declines, replacing the value for the handlers that follow.
    pub fn next_with(value: impl Into<Value>) -> Self {
        Self::Continue(Some(value.into()))
    }

    /// Declines and registers a transform to apply to the final value.
    pub fn map_after<F>(map: F) -> Self
    where
        F: FnOnce(Value) -> anyhow::Result<Value> + 'static,
    {
        Self::MapAfter(Box::new(map))
    }

    /// Whether the signal lets the next handler run.
    pub const fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_) | Self::MapAfter(_))
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(value) => f.debug_tuple("Done").field(value).finish(),
            Self::Recurse(value) => f.debug_tuple("Recurse").field(value).finish(),
            Self::Continue(value) => f.debug_tuple("Continue").field(value).finish(),
            Self::MapAfter(_) => f.write_str("MapAfter(..)"),
        }
    }
}
