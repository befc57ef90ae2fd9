//! Error Handling tools
//!
//! [`Error`] is an immutable value that is cheap to clone. It carries a message,
//! an optional status [`Code`] and any number of child errors. Combining errors
//! never discards information: [`Error::with_child`] returns a new error that
//! keeps the parent and appends the child.
//!
//! Continuations pass `Option<Error>` around, where `None` means success.
//! [`add_child`] merges two such values.

use std::{
    borrow::Cow,
    error::Error as StdError,
    fmt,
    sync::Arc
};
use smallvec::SmallVec;

pub use self::code::Code;

pub mod code;

/// Generic error
#[derive(Clone)]
pub struct Error {
    inner: Arc<Inner>,
}

#[derive(Clone)]
struct Inner {
    message: Cow<'static, str>,
    status: Option<Code>,
    children: SmallVec<[Error; 1]>,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Error");
        dbg.field("message", &self.inner.message);
        if let Some(status) = self.inner.status {
            dbg.field("status", &status);
        }
        if !self.inner.children.is_empty() {
            dbg.field("children", &self.inner.children.as_slice());
        }
        dbg.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.message)?;
        if let Some((first, rest)) = self.inner.children.split_first() {
            write!(f, " [{first}")?;
            for child in rest {
                write!(f, "; {child}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.children
            .first()
            .map(|child| child as &(dyn StdError + 'static))
    }
}

impl From<&'static str> for Error {
    #[inline]
    fn from(message: &'static str) -> Self {
        Self::new(message)
    }
}

impl From<String> for Error {
    #[inline]
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl Error {
    /// Creates a new [`Error`] without a status code
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                message: message.into(),
                status: None,
                children: SmallVec::new(),
            })
        }
    }

    /// Creates an [`Error`] with the given status code
    #[inline]
    pub fn with_code(code: Code, message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(message).with_status(code)
    }

    /// Creates an aggregate [`Error`] holding all of `children`
    pub fn from_vec(message: impl Into<Cow<'static, str>>, children: Vec<Error>) -> Self {
        Self {
            inner: Arc::new(Inner {
                message: message.into(),
                status: None,
                children: SmallVec::from_vec(children),
            })
        }
    }

    /// Returns a copy of this error tagged with `code`
    pub fn with_status(self, code: Code) -> Self {
        let mut inner = self.inner;
        Arc::make_mut(&mut inner).status = Some(code);
        Self { inner }
    }

    /// Returns a new error that keeps this one and chains `child` under it
    pub fn with_child(self, child: Error) -> Self {
        let mut inner = self.inner;
        Arc::make_mut(&mut inner).children.push(child);
        Self { inner }
    }

    /// Returns the message of this error, without its children
    #[inline]
    pub fn message(&self) -> &str {
        &self.inner.message
    }

    /// Returns the status code set directly on this error
    #[inline]
    pub fn status(&self) -> Option<Code> {
        self.inner.status
    }

    /// Returns the status code of this error, or else the first one found
    /// among its children, depth first
    pub fn effective_status(&self) -> Option<Code> {
        self.inner.status.or_else(|| self.inner.children
            .iter()
            .find_map(Error::effective_status))
    }

    /// Returns the chained child errors
    #[inline]
    pub fn children(&self) -> &[Error] {
        &self.inner.children
    }

    /// Returns `true` if this error or any of its descendants
    /// has exactly `message`
    pub fn contains_message(&self, message: &str) -> bool {
        self.message() == message || self.inner.children
            .iter()
            .any(|child| child.contains_message(message))
    }
}

/// Merges two optional errors.
///
/// If both are present, `child` is chained under `parent`.
/// If only one is present it is returned as-is.
#[inline]
pub fn add_child(parent: Option<Error>, child: Option<Error>) -> Option<Error> {
    match (parent, child) {
        (parent, None) => parent,
        (None, child) => child,
        (Some(parent), Some(child)) => Some(parent.with_child(child)),
    }
}
