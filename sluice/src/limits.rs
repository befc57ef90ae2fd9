//! Message size limits.
//!
//! This module defines the two shapes a size limit takes in this crate:
//!
//! - [`Limit`]: the user-facing configuration value. It expresses whether a
//!   setting uses the library default, is explicitly bounded, or is disabled.
//! - [`MessageSizeLimit`]: the resolved value checked on every message.
//!   It is either a concrete bound in bytes or "unlimited".
//!
//! [`MessageSizeLimits`] pairs a send and a receive bound.
//!
//! ## Merge rule
//!
//! When two sources both constrain the same direction, the tighter bound wins.
//! An unlimited bound never wins over a concrete one:
//!
//! ```rust
//! use sluice::limits::MessageSizeLimit;
//!
//! let channel = MessageSizeLimit::limited(100);
//! let method = MessageSizeLimit::unlimited();
//!
//! assert_eq!(channel.tighter(method), channel);
//! assert_eq!(MessageSizeLimit::limited(10).tighter(channel), MessageSizeLimit::limited(10));
//! ```
//!
//! ⚠️ **Warning**
//!
//! Disabling limits removes protection against memory exhaustion from
//! oversized messages and should only be done between trusted peers.

use std::fmt;

/// Largest bound a [`MessageSizeLimit`] can hold.
pub const MAX_MESSAGE_SIZE: usize = i32::MAX as usize;

/// Represents a configurable resource limit.
///
/// # Variants
///
/// - [`Limit::Default`]: Uses the library default (recommended).
/// - [`Limit::Limited`]: Enforces an explicit upper bound.
/// - [`Limit::Unlimited`]: Disables the limit entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit<T> {
    /// Use the library default.
    Default,

    /// Enforce an explicit upper bound.
    Limited(T),

    /// Disable the limit entirely.
    Unlimited,
}

impl<T> Limit<T> {
    /// Returns `true` if this limit is disabled.
    #[inline(always)]
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }

    /// Returns `true` if this limit enforces an explicit bound.
    #[inline(always)]
    pub fn is_limited(&self) -> bool {
        matches!(self, Limit::Limited(_))
    }
}

impl Limit<usize> {
    /// Creates a [`Limit`] from a raw integer setting where `-1` means unlimited.
    ///
    /// Values below `-1` are not valid settings and fall back to [`Limit::Default`].
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            -1 => Limit::Unlimited,
            raw if raw < -1 => {
                #[cfg(feature = "tracing")]
                tracing::warn!("limit value {raw} ignored: it must be >= -1");
                Limit::Default
            },
            raw => match usize::try_from(raw) {
                Ok(value) => Limit::Limited(value),
                Err(_) => Limit::Default,
            }
        }
    }
}

/// A resolved message size limit.
///
/// Either a bound in bytes (at most [`MAX_MESSAGE_SIZE`]) or unlimited.
/// Its raw form is `-1` for unlimited and the bound otherwise.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageSizeLimit(Option<usize>);

impl MessageSizeLimit {
    /// Creates a limit that never rejects a message
    #[inline]
    pub const fn unlimited() -> Self {
        Self(None)
    }

    /// Creates a limit of `max` bytes, clamped to [`MAX_MESSAGE_SIZE`]
    #[inline]
    pub const fn limited(max: usize) -> Self {
        if max > MAX_MESSAGE_SIZE {
            Self(Some(MAX_MESSAGE_SIZE))
        } else {
            Self(Some(max))
        }
    }

    /// Creates a limit from its raw form. Any negative value means unlimited.
    #[inline]
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            Self::unlimited()
        } else {
            // clamped to MAX_MESSAGE_SIZE, fits usize on every supported target
            Self(Some(raw.min(MAX_MESSAGE_SIZE as i64) as usize))
        }
    }

    /// Returns the raw form: `-1` when unlimited, the bound otherwise
    #[inline]
    pub fn as_raw(&self) -> i64 {
        self.0.map_or(-1, |max| max as i64)
    }

    /// Returns the bound in bytes, or `None` when unlimited
    #[inline]
    pub fn get(&self) -> Option<usize> {
        self.0
    }

    /// Returns `true` if this limit never rejects a message
    #[inline]
    pub fn is_unlimited(&self) -> bool {
        self.0.is_none()
    }

    /// Returns `true` if a message of `len` bytes is over this limit.
    ///
    /// A message exactly at the limit is allowed.
    #[inline]
    pub fn is_exceeded_by(&self, len: usize) -> bool {
        matches!(self.0, Some(max) if len > max)
    }

    /// Returns the tighter of two limits.
    ///
    /// A concrete bound always wins over an unlimited one;
    /// two concrete bounds resolve to the smaller.
    #[inline]
    pub fn tighter(self, other: Self) -> Self {
        match (self.0, other.0) {
            (Some(a), Some(b)) => Self(Some(a.min(b))),
            (Some(a), None) => Self(Some(a)),
            (None, b) => Self(b),
        }
    }
}

impl fmt::Display for MessageSizeLimit {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(max) => write!(f, "{max}"),
            None => f.write_str("-1"),
        }
    }
}

/// A pair of send and receive message size limits
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageSizeLimits {
    /// Largest message that may be sent
    pub max_send_size: MessageSizeLimit,

    /// Largest message that may be received
    pub max_recv_size: MessageSizeLimit,
}

impl MessageSizeLimits {
    /// Creates a new pair of limits
    #[inline]
    pub const fn new(max_send_size: MessageSizeLimit, max_recv_size: MessageSizeLimit) -> Self {
        Self { max_send_size, max_recv_size }
    }

    /// Creates a pair where both directions are unlimited
    #[inline]
    pub const fn unlimited() -> Self {
        Self::new(MessageSizeLimit::unlimited(), MessageSizeLimit::unlimited())
    }

    /// Returns `true` if neither direction is bounded
    #[inline]
    pub fn is_unlimited(&self) -> bool {
        self.max_send_size.is_unlimited() && self.max_recv_size.is_unlimited()
    }

    /// Merges two pairs direction by direction, keeping the tighter bound of each
    #[inline]
    pub fn merge(self, other: Self) -> Self {
        Self {
            max_send_size: self.max_send_size.tighter(other.max_send_size),
            max_recv_size: self.max_recv_size.tighter(other.max_recv_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW_VALUES: [i64; 5] = [-1, 0, 1, 100, 4096];

    #[test]
    fn it_returns_true_for_unlimited_when_checks_is_unlimited() {
        let limit = Limit::<usize>::Unlimited;

        assert!(limit.is_unlimited())
    }

    #[test]
    fn it_returns_true_for_limited_when_checks_is_limited() {
        let limit = Limit::<usize>::Limited(100);

        assert!(limit.is_limited());
        assert!(!limit.is_unlimited());
    }

    #[test]
    fn it_creates_limit_from_raw_values() {
        assert_eq!(Limit::from_raw(-1), Limit::Unlimited);
        assert_eq!(Limit::from_raw(0), Limit::Limited(0));
        assert_eq!(Limit::from_raw(1024), Limit::Limited(1024));
        assert_eq!(Limit::from_raw(-7), Limit::Default);
    }

    #[test]
    fn it_normalizes_negative_raw_values_to_unlimited() {
        assert_eq!(MessageSizeLimit::from_raw(-1), MessageSizeLimit::unlimited());
        assert_eq!(MessageSizeLimit::from_raw(-42).as_raw(), -1);
        assert_eq!(MessageSizeLimit::from_raw(i64::MIN).as_raw(), -1);
    }

    #[test]
    fn it_clamps_raw_values_to_max_message_size() {
        let limit = MessageSizeLimit::from_raw(i64::MAX);

        assert_eq!(limit.get(), Some(MAX_MESSAGE_SIZE));
        assert_eq!(MessageSizeLimit::limited(usize::MAX).get(), Some(MAX_MESSAGE_SIZE));
    }

    #[test]
    fn it_allows_message_exactly_at_limit() {
        let limit = MessageSizeLimit::limited(100);

        assert!(!limit.is_exceeded_by(100));
        assert!(limit.is_exceeded_by(101));
        assert!(!limit.is_exceeded_by(0));
    }

    #[test]
    fn it_never_rejects_when_unlimited() {
        let limit = MessageSizeLimit::unlimited();

        assert!(!limit.is_exceeded_by(usize::MAX));
    }

    #[test]
    fn it_rejects_any_non_empty_message_with_zero_limit() {
        let limit = MessageSizeLimit::limited(0);

        assert!(!limit.is_exceeded_by(0));
        assert!(limit.is_exceeded_by(1));
    }

    #[test]
    fn it_merges_limits_with_tighter_bound_winning() {
        for a in RAW_VALUES {
            for b in RAW_VALUES {
                let merged = MessageSizeLimit::from_raw(a)
                    .tighter(MessageSizeLimit::from_raw(b))
                    .as_raw();

                let expected = if b == -1 {
                    a
                } else if a == -1 {
                    b
                } else {
                    a.min(b)
                };

                assert_eq!(merged, expected, "merge({a}, {b})");
            }
        }
    }

    #[test]
    fn it_keeps_unlimited_when_both_unlimited() {
        let merged = MessageSizeLimit::unlimited().tighter(MessageSizeLimit::unlimited());

        assert!(merged.is_unlimited());
        assert_eq!(merged.as_raw(), -1);
    }

    #[test]
    fn it_displays_raw_form() {
        assert_eq!(MessageSizeLimit::limited(4).to_string(), "4");
        assert_eq!(MessageSizeLimit::unlimited().to_string(), "-1");
    }

    #[test]
    fn it_merges_limit_pairs_per_direction() {
        let channel = MessageSizeLimits::new(
            MessageSizeLimit::unlimited(),
            MessageSizeLimit::limited(4096));
        let method = MessageSizeLimits::new(
            MessageSizeLimit::limited(10),
            MessageSizeLimit::limited(8192));

        let merged = channel.merge(method);

        assert_eq!(merged.max_send_size, MessageSizeLimit::limited(10));
        assert_eq!(merged.max_recv_size, MessageSizeLimit::limited(4096));
    }

    #[test]
    fn it_reports_unlimited_pair() {
        assert!(MessageSizeLimits::unlimited().is_unlimited());
        assert!(MessageSizeLimits::default().is_unlimited());
        assert!(!MessageSizeLimits::new(
            MessageSizeLimit::unlimited(),
            MessageSizeLimit::limited(1)).is_unlimited());
    }
}
