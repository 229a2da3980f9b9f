//! Shared application state type.

use crate::bootstrap::AxumContext;
use std::sync::Arc;

/// Application state shared by every handler and both listeners.
pub type AppState = Arc<AxumContext>;
