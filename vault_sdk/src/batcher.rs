use crate::error::{Result, SdkError};
use crate::types::{Batch, MigrationEvent};

/// Batch size used by the reference migration (keeps each import under the block gas limit)
pub const DEFAULT_BATCH_SIZE: usize = 25;

/// Split events into consecutive batches of at most `capacity`, preserving order.
pub fn make_batches(events: &[MigrationEvent], capacity: usize) -> Result<Vec<Batch>> {
    if capacity == 0 {
        return Err(SdkError::InvalidConfig(
            "batch capacity must be a positive integer".into(),
        ));
    }

    Ok(events
        .chunks(capacity)
        .enumerate()
        .map(|(i, chunk)| Batch {
            index: i + 1,
            events: chunk.to_vec(),
        })
        .collect())
}

/// Number of batches `make_batches` produces for `n` events.
pub fn batch_count(n: usize, capacity: usize) -> usize {
    if capacity == 0 {
        0
    } else {
        n.div_ceil(capacity)
    }
}
