//! Engine-wide constants
//!
//! Single source of truth for layout distances, safety limits and
//! execution pacing. `EngineConfig` defaults are built from these.

/// Canvas layout distances (in world units)
pub mod layout {
    /// Horizontal distance between a source and a node inserted after it,
    /// and the amount downstream nodes are shifted to make room
    pub const INSERT_GAP: f64 = 250.0;
    /// A target closer than this to the left of its source counts as cramped
    pub const CRAMPED_MARGIN: f64 = 50.0;
    /// Offset applied to both axes when duplicating a node
    pub const DUPLICATE_OFFSET: f64 = 50.0;
    /// Position of the start node in a freshly created workflow
    pub const START_POSITION: (f64, f64) = (50.0, 100.0);
}

/// Safety limits
pub mod limits {
    /// Maximum dequeues performed by the downstream search
    pub const DOWNSTREAM_SEARCH_CAP: usize = 1000;
    /// Number of execution log lines retained
    pub const LOG_CAPACITY: usize = 20;
    /// Undo snapshots kept per workflow
    pub const UNDO_SNAPSHOTS: usize = 100;
}

/// Execution pacing (in milliseconds)
pub mod timing {
    /// Delay before every scheduled tick
    pub const TICK_DELAY_MS: u64 = 600;
    /// Delay between the last tick and the completion message
    pub const COMPLETION_DELAY_MS: u64 = 500;
}

/// Defaults for newly created workflow items
pub mod defaults {
    /// Name given to a parameter added without one
    pub const PARAMETER_NAME: &str = "new_param";
    /// Label suffix for duplicated nodes
    pub const COPY_SUFFIX: &str = " (Copy)";
}
