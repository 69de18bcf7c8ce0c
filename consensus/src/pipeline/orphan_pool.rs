//! Orphan pool and pending-block selection
//!
//! Tracks blocks nothing links to yet and picks which of them a newly
//! assembled block should reference.

use consensus_core::errors::StoreResult;
use consensus_core::stores::{OrphanEntry, OrphanStore};
use consensus_core::{Address, Amount, FieldKind};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace;

/// Orphans chosen for one block, in link order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InclusionSelection {
    pub entries: Vec<OrphanEntry>,
    /// Lower bound on the send time of the next assembled block
    pub watermark: u64,
}

impl InclusionSelection {
    /// Zero-amount link fields referencing the selected orphans
    pub fn links(&self) -> Vec<Address> {
        self.entries.iter().map(|e| Address::block(FieldKind::Link, e.hash, Amount::ZERO)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read-side view over the orphan index. Writes happen only through the
/// fork-choice engine.
#[derive(Clone)]
pub struct OrphanPool {
    store: Arc<dyn OrphanStore>,
}

impl OrphanPool {
    pub fn new(store: Arc<dyn OrphanStore>) -> Self {
        Self { store }
    }

    pub fn len(&self) -> StoreResult<u64> {
        self.store.count()
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.store.count()? == 0)
    }

    pub fn contains(&self, entry: &OrphanEntry) -> StoreResult<bool> {
        self.store.contains(&entry.hash)
    }

    /// Picks at most `max_count` orphans with time not after `now`.
    ///
    /// Link orphans come first, oldest first. Transaction orphans follow by
    /// fee descending then time ascending, except that an account's lower
    /// nonces are always placed before its higher ones.
    pub fn select_for_inclusion(&self, max_count: usize, now: u64) -> StoreResult<InclusionSelection> {
        let (mut links, mut txs): (Vec<OrphanEntry>, Vec<OrphanEntry>) =
            self.store.entries()?.into_iter().filter(|e| e.time <= now).partition(|e| !e.is_tx);

        links.sort_by_key(|e| e.time);
        txs.sort_by(|a, b| b.fee.cmp(&a.fee).then(a.time.cmp(&b.time)));

        let mut candidates = links;
        candidates.extend(order_by_nonce(txs));
        candidates.truncate(max_count);

        let watermark = match candidates.iter().map(|e| e.time).max() {
            Some(latest) => latest.saturating_add(1).min(now),
            None => now,
        };
        trace!("selected {} orphans, watermark {}", candidates.len(), watermark);
        Ok(InclusionSelection { entries: candidates, watermark })
    }
}

/// Splices each account's lower-nonce transactions in front of the first
/// higher-nonce one the fee order puts ahead of them.
fn order_by_nonce(txs: Vec<OrphanEntry>) -> Vec<OrphanEntry> {
    let mut handled = vec![false; txs.len()];
    let mut ordered = Vec::with_capacity(txs.len());

    for i in 0..txs.len() {
        if handled[i] {
            continue;
        }
        let current = &txs[i];
        let mut inserts: Vec<usize> = Vec::new();
        if current.account.is_some() {
            for (j, later) in txs.iter().enumerate().skip(i + 1) {
                if handled[j] || later.account != current.account {
                    continue;
                }
                let precedes = later.nonce < current.nonce
                    || (later.nonce == current.nonce && later.time < current.time && later.fee < current.fee);
                if precedes {
                    inserts.push(j);
                    handled[j] = true;
                }
            }
        }
        inserts.sort_by_key(|&j| (txs[j].nonce, txs[j].time));
        ordered.extend(inserts.into_iter().map(|j| txs[j].clone()));
        ordered.push(current.clone());
        handled[i] = true;
    }

    let placed: HashSet<_> = ordered.iter().map(|e| e.hash).collect();
    ordered.extend(txs.iter().filter(|e| !placed.contains(&e.hash)).cloned());
    ordered
}
