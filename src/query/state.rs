//! Query State Module

use crate::error::RequestError;

/// What a call site renders: the last good value, whether a fetch is
/// running, and the last failure.
///
/// A failed refetch keeps `data` from the previous success.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<RequestError>,
}

impl<T> QueryState<T> {
    /// State of a disabled or not yet activated query.
    pub fn idle() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.data.is_none() && !self.loading && self.error.is_none()
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self::idle()
    }
}
