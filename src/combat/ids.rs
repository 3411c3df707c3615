//! Identifier allocation for projectiles and zones

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Failure to hand out a fresh identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("Identifier space exhausted for prefix {0}")]
    Exhausted(&'static str),
}

/// Source of unique ids for transient simulation objects
///
/// Called from inside the tick, so implementations must not block.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self, prefix: &'static str) -> Result<String, IdError>;
}

/// Random ids backed by UUID v4, e.g. `proj_1a2b3c4d`
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self, prefix: &'static str) -> Result<String, IdError> {
        let simple = Uuid::new_v4().simple().to_string();
        Ok(format!("{}_{}", prefix, &simple[..8]))
    }
}

/// Monotonic ids, e.g. `proj_1`, `aoe_2`
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
    limit: Option<u64>,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator that fails once `limit` ids have been issued
    pub fn with_limit(limit: u64) -> Self {
        Self {
            next: AtomicU64::new(0),
            limit: Some(limit),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self, prefix: &'static str) -> Result<String, IdError> {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        if self.limit.is_some_and(|limit| n > limit) {
            return Err(IdError::Exhausted(prefix));
        }
        Ok(format!("{}_{}", prefix, n))
    }
}
