//! Shared application state type.

use crate::bootstrap::AxumContext;
use std::sync::Arc;

/// Application state shared across all handlers.
///
/// An Arc-wrapped `AxumContext` holding the speech pipeline and the text
/// generator sessions stream from.
pub type AppState = Arc<AxumContext>;
