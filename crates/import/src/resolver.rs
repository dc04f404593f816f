//! In-memory entity resolution and placeholder minting.
//!
//! Before any write, the pipeline loads the tenant's persisted entities
//! into an [`EntityIndex`] — read-only for the remainder of the run — and
//! resolves each row's reference against it. Unresolved references either
//! fail the row, or (when auto-creation is enabled) mint a deduplicated
//! [`PlaceholderSet`] entry that is persisted in bulk before the dependent
//! rows, after which the index is rebuilt and pending references rewritten.

use std::collections::{HashMap, HashSet};

use ledgerly_core::normalize::canonical_key;
use ledgerly_core::types::EntityId;
use ledgerly_db::models::IndexEntry;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// EntityIndex
// ---------------------------------------------------------------------------

/// Read-only lookup maps over a tenant's persisted entities.
#[derive(Debug, Default)]
pub struct EntityIndex {
    ids: HashSet<EntityId>,
    by_code: HashMap<String, EntityId>,
    by_name: HashMap<String, EntityId>,
    by_canonical_code: HashMap<String, EntityId>,
    by_canonical_name: HashMap<String, EntityId>,
}

impl EntityIndex {
    /// Build the index once per run. Later entries win on key collisions,
    /// matching upsert last-write semantics.
    pub fn build(entries: impl IntoIterator<Item = IndexEntry>) -> Self {
        let mut index = Self::default();
        for entry in entries {
            index.ids.insert(entry.id);
            if let Some(code) = entry.code {
                let canon = canonical_key(&code);
                if !canon.is_empty() {
                    index.by_canonical_code.insert(canon, entry.id);
                }
                index.by_code.insert(code, entry.id);
            }
            if let Some(name) = entry.name {
                let canon = canonical_key(&name);
                if !canon.is_empty() {
                    index.by_canonical_name.insert(canon, entry.id);
                }
                index.by_name.insert(name, entry.id);
            }
        }
        index
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Resolve a textual reference.
    ///
    /// Ladder: UUID-shaped identifier → exact code → exact name →
    /// canonicalized code → canonicalized name. Returns `None` when
    /// nothing matches.
    pub fn resolve(&self, reference: &str) -> Option<EntityId> {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(id) = Uuid::parse_str(trimmed) {
            if self.ids.contains(&id) {
                return Some(id);
            }
        }
        if let Some(id) = self.by_code.get(trimmed) {
            return Some(*id);
        }
        if let Some(id) = self.by_name.get(trimmed) {
            return Some(*id);
        }
        let canon = canonical_key(trimmed);
        if canon.is_empty() {
            return None;
        }
        if let Some(id) = self.by_canonical_code.get(&canon) {
            return Some(*id);
        }
        self.by_canonical_name.get(&canon).copied()
    }
}

// ---------------------------------------------------------------------------
// Placeholders
// ---------------------------------------------------------------------------

/// A minimal stand-in entity to be persisted for an unresolvable
/// reference.
#[derive(Debug, Clone)]
pub struct PendingPlaceholder {
    pub code: String,
    pub name: String,
}

/// Placeholders minted during one run, deduplicated by canonicalized
/// code-or-name before anything is written: many rows naming the same
/// unknown product collapse onto a single entry.
#[derive(Debug, Default)]
pub struct PlaceholderSet {
    pending: HashMap<String, PendingPlaceholder>,
}

impl PlaceholderSet {
    /// Register an unresolved reference. Returns the dedup key, or `None`
    /// when the reference has no canonical form at all.
    pub fn mint(&mut self, reference: &str) -> Option<String> {
        let canon = canonical_key(reference);
        if canon.is_empty() {
            return None;
        }
        self.pending
            .entry(canon.clone())
            .or_insert_with(|| PendingPlaceholder {
                code: placeholder_code(reference),
                name: reference.trim().to_string(),
            });
        Some(canon)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingPlaceholder> {
        self.pending.values()
    }
}

/// Deterministic SKU for an auto-created product, so re-importing the
/// same file finds the placeholder it minted last time.
fn placeholder_code(reference: &str) -> String {
    let mut canon = canonical_key(reference).to_ascii_uppercase();
    canon.truncate(24);
    format!("AUTO-{canon}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: Uuid, code: &str, name: &str) -> IndexEntry {
        IndexEntry {
            id,
            code: Some(code.to_string()),
            name: Some(name.to_string()),
        }
    }

    fn sample_index() -> (EntityIndex, Uuid, Uuid) {
        let rice = Uuid::from_u128(1);
        let soap = Uuid::from_u128(2);
        let index = EntityIndex::build(vec![
            entry(rice, "SKU-RICE", "Basmati Rice"),
            entry(soap, "SKU-SOAP", "Bath Soap"),
        ]);
        (index, rice, soap)
    }

    #[test]
    fn resolves_by_identifier() {
        let (index, rice, _) = sample_index();
        assert_eq!(index.resolve(&rice.to_string()), Some(rice));
    }

    #[test]
    fn unknown_identifier_falls_through() {
        let (index, _, _) = sample_index();
        assert_eq!(index.resolve(&Uuid::from_u128(99).to_string()), None);
    }

    #[test]
    fn resolves_by_exact_code_then_name() {
        let (index, rice, soap) = sample_index();
        assert_eq!(index.resolve("SKU-RICE"), Some(rice));
        assert_eq!(index.resolve("Bath Soap"), Some(soap));
    }

    #[test]
    fn resolves_by_canonical_forms() {
        let (index, rice, soap) = sample_index();
        assert_eq!(index.resolve("sku rice"), Some(rice));
        assert_eq!(index.resolve("BATH-SOAP"), Some(soap));
    }

    #[test]
    fn unresolvable_reference_is_none() {
        let (index, _, _) = sample_index();
        assert_eq!(index.resolve("Sunflower Oil"), None);
        assert_eq!(index.resolve(""), None);
        assert_eq!(index.resolve("   "), None);
    }

    #[test]
    fn placeholder_minting_deduplicates() {
        let mut set = PlaceholderSet::default();
        let a = set.mint("Sunflower Oil");
        let b = set.mint("SUNFLOWER-OIL");
        assert_eq!(a, b);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn placeholder_code_is_deterministic() {
        let mut set = PlaceholderSet::default();
        set.mint("Sunflower Oil");
        let placeholder = set.iter().next().unwrap();
        assert_eq!(placeholder.code, "AUTO-SUNFLOWEROIL");
        assert_eq!(placeholder.name, "Sunflower Oil");
    }

    #[test]
    fn symbol_only_reference_cannot_mint() {
        let mut set = PlaceholderSet::default();
        assert_eq!(set.mint("---"), None);
        assert!(set.is_empty());
    }

    #[test]
    fn minted_placeholder_resolves_after_reindex() {
        // Simulates the persist-then-reindex step: the placeholder's code
        // and name enter the index and the original reference resolves.
        let mut set = PlaceholderSet::default();
        set.mint("Sunflower Oil");
        let placeholder = set.iter().next().unwrap().clone();
        let id = Uuid::from_u128(7);
        let index = EntityIndex::build(vec![entry(id, &placeholder.code, &placeholder.name)]);
        assert_eq!(index.resolve("Sunflower Oil"), Some(id));
    }
}
