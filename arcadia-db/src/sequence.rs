//! Monotonic id counters, persisted apart from the collections they number.

use std::collections::BTreeMap;

use tracing::debug;

use crate::{Database, Result};

pub(crate) const SEQUENCES: &str = "sequences";

/// Last id issued per collection name.
type Sequences = BTreeMap<String, u64>;

impl Database {
  /// Reserve the next id for `collection`.
  ///
  /// `existing_max` is the highest id currently in the collection; taking the max of it
  /// and the stored counter keeps ids unique even if the sequences document was lost.
  /// Must be called while holding the collection's gate.
  pub(crate) async fn next_id(&self, collection: &'static str, existing_max: u64) -> Result<u64> {
    let _guard = self.sequence_gate.lock().await;

    let mut sequences: Sequences = self.store.load(SEQUENCES).await?;
    let last = sequences.get(collection).copied().unwrap_or(0);
    let id = last.max(existing_max) + 1;
    sequences.insert(collection.to_string(), id);
    self.store.save(SEQUENCES, &sequences).await?;

    debug!(collection, id, "reserved id");
    Ok(id)
  }
}
