//! Provenance tracing
//!
//! A tracer records, for every derived item, the operation that produced
//! it and the exact source items it was derived from. Records reference
//! snapshots held in the tracer's own arena, so a tracer outlives and
//! never blocks mutation of the stores it observed. The records form a
//! directed acyclic lineage graph walkable from any item back to its
//! un-derived ancestors.

use crate::model::ItemId;
use crate::pipeline::OpDescription;
use crate::store::DataItem;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::{HashSet, VecDeque};
use tracing::warn;

/// How a single item came to exist
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    /// The derived item, as it was when recorded
    pub data_item: DataItem,
    /// Description of the operation that produced it
    pub op_desc: OpDescription,
    /// The exact source items consumed to derive this item
    pub source_data_items: Vec<DataItem>,
    /// When the derivation was recorded
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct ProvRecord {
    op_desc: OpDescription,
    source_ids: Vec<ItemId>,
    recorded_at: DateTime<Utc>,
}

/// Lineage recorder for derived items.
///
/// Append-only: re-running a pipeline with the same tracer adds more
/// records, never replaces existing ones. Writes are serialized
/// internally, so one tracer may observe documents processed on different
/// worker threads.
#[derive(Debug, Default)]
pub struct ProvTracer {
    items: DashMap<ItemId, DataItem>,
    records: DashMap<ItemId, ProvRecord>,
}

impl ProvTracer {
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
            records: DashMap::new(),
        }
    }

    /// Record that `item` was produced by the described operation from
    /// exactly `sources`.
    ///
    /// Snapshots of the item and its sources are taken at this point; the
    /// first record for a uid wins.
    pub fn record(&self, item: &DataItem, op_desc: &OpDescription, sources: &[DataItem]) {
        let uid = item.uid();
        self.items.entry(uid).or_insert_with(|| item.clone());

        let mut source_ids = Vec::with_capacity(sources.len());
        for source in sources {
            self.items
                .entry(source.uid())
                .or_insert_with(|| source.clone());
            source_ids.push(source.uid());
        }

        match self.records.entry(uid) {
            Entry::Occupied(_) => {
                warn!(item = %uid, op = %op_desc.name, "provenance already recorded, keeping first record");
            }
            Entry::Vacant(slot) => {
                slot.insert(ProvRecord {
                    op_desc: op_desc.clone(),
                    source_ids,
                    recorded_at: Utc::now(),
                });
            }
        }
    }

    /// Look up the provenance of a derived item
    pub fn get_prov(&self, uid: &ItemId) -> Option<Provenance> {
        let record = self.records.get(uid)?;
        let data_item = self.items.get(uid).map(|r| r.clone())?;
        let source_data_items = record
            .source_ids
            .iter()
            .filter_map(|id| self.items.get(id).map(|r| r.clone()))
            .collect();
        Some(Provenance {
            data_item,
            op_desc: record.op_desc.clone(),
            source_data_items,
            recorded_at: record.recorded_at,
        })
    }

    /// True if a derivation was recorded for this uid
    pub fn has_prov(&self, uid: &ItemId) -> bool {
        self.records.contains_key(uid)
    }

    /// Walk the lineage graph from `uid` back to its ultimate un-derived
    /// ancestors (items that appear only as sources, never as products).
    /// Breadth-first discovery order; an un-derived query uid yields an
    /// empty list.
    pub fn ancestors(&self, uid: &ItemId) -> Vec<ItemId> {
        let mut roots = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([*uid]);
        visited.insert(*uid);

        while let Some(current) = queue.pop_front() {
            match self.records.get(&current) {
                Some(record) => {
                    for source in &record.source_ids {
                        if visited.insert(*source) {
                            queue.push_back(*source);
                        }
                    }
                }
                None if current != *uid => roots.push(current),
                None => {}
            }
        }
        roots
    }

    /// Number of recorded derivations
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
