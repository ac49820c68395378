//! # Element Store
//!
//! The `ElementStore` trait and its in-memory implementation.
//!
//! Every insert checks for an existing node first and fails with
//! `AlchemyError::AlreadyExists` instead of writing a duplicate. Elements
//! keep a dense position in `[0, count)` so that sampling a random offset is
//! a single lookup; removing an element moves the last one into its slot.

use crate::{AlchemyError, Combo, ComboKey, Element, NodeType, StoreStats, validate_name};
use rand::{Rng, RngCore};
use std::collections::BTreeMap;

// =============================================================================
// ELEMENTSTORE TRAIT
// =============================================================================

/// Durable, deduplicated persistence and sampling over elements and combos.
///
/// Lookups never fail on "not found"; they only fail on transport errors.
pub trait ElementStore {
    /// Exact-match lookup on `name`.
    fn element_exists(&self, name: &str) -> Result<bool, AlchemyError>;

    /// Fetch an element by name.
    fn get_element(&self, name: &str) -> Result<Option<Element>, AlchemyError>;

    /// Insert an element, recomputing its derived fields.
    ///
    /// Fails with `AlreadyExists` if an element with that name is present.
    fn insert_element(&mut self, element: Element) -> Result<(), AlchemyError>;

    /// Remove an element by name. Fails with `NotFound` if absent.
    fn remove_element(&mut self, name: &str) -> Result<(), AlchemyError>;

    /// True if any combo exists for the unordered pair `{a, b}`.
    fn combo_exists(&self, a: &str, b: &str) -> Result<bool, AlchemyError>;

    /// True if a combo exists for the unordered pair `{a, b}` with `result`.
    fn combo_exists_with_result(&self, a: &str, b: &str, result: &str)
    -> Result<bool, AlchemyError>;

    /// Insert a combo edge. Fails with `AlreadyExists` on the same
    /// `({a, b}, result)`.
    fn insert_combo(&mut self, a: &str, b: &str, result: &str) -> Result<(), AlchemyError>;

    /// Remove a combo edge. Fails with `NotFound` if absent.
    fn remove_combo(&mut self, a: &str, b: &str, result: &str) -> Result<(), AlchemyError>;

    /// Total number of elements.
    fn count_elements(&self) -> Result<u64, AlchemyError>;

    /// Name of the element at `position` in the store's sampling order.
    fn element_at(&self, position: u64) -> Result<Option<String>, AlchemyError>;

    /// Aggregate counts.
    fn stats(&self) -> Result<StoreStats, AlchemyError>;

    /// Pick a uniformly random offset in `[0, bound)` and return the element
    /// name at that position.
    fn sample_element(&self, bound: u64, rng: &mut dyn RngCore) -> Result<String, AlchemyError> {
        if bound == 0 {
            return Err(AlchemyError::EmptyStore);
        }
        let offset = rng.gen_range(0..bound);
        self.element_at(offset)?
            .ok_or(AlchemyError::SampleMiss { offset, bound })
    }
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// An in-memory element store backed by `BTreeMap`s.
///
/// Same semantics as `RedbStore`; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// name -> (position, element)
    elements: BTreeMap<String, (u64, Element)>,
    /// Dense sampling order.
    order: Vec<String>,
    combos: BTreeMap<ComboKey, Combo>,
    next_combo_id: u64,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given plain elements.
    pub fn with_elements<'a>(
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, AlchemyError> {
        let mut store = Self::new();
        for name in names {
            store.insert_element(Element::new(name))?;
        }
        Ok(store)
    }

    /// All combo edges in key order.
    #[must_use]
    pub fn combos(&self) -> Vec<Combo> {
        self.combos.values().cloned().collect()
    }
}

impl ElementStore for MemoryStore {
    fn element_exists(&self, name: &str) -> Result<bool, AlchemyError> {
        Ok(self.elements.contains_key(name))
    }

    fn get_element(&self, name: &str) -> Result<Option<Element>, AlchemyError> {
        Ok(self.elements.get(name).map(|(_, e)| e.clone()))
    }

    fn insert_element(&mut self, element: Element) -> Result<(), AlchemyError> {
        validate_name(&element.name)?;
        if self.elements.contains_key(&element.name) {
            return Err(AlchemyError::AlreadyExists {
                kind: NodeType::Element,
                key: element.name,
            });
        }
        let element = element.normalized();
        let position = self.order.len() as u64;
        self.order.push(element.name.clone());
        self.elements
            .insert(element.name.clone(), (position, element));
        Ok(())
    }

    fn remove_element(&mut self, name: &str) -> Result<(), AlchemyError> {
        let Some((position, _)) = self.elements.remove(name) else {
            return Err(AlchemyError::NotFound {
                kind: NodeType::Element,
                key: name.to_string(),
            });
        };
        self.order.swap_remove(position as usize);
        if let Some(moved) = self.order.get(position as usize) {
            if let Some(entry) = self.elements.get_mut(moved) {
                entry.0 = position;
            }
        }
        Ok(())
    }

    fn combo_exists(&self, a: &str, b: &str) -> Result<bool, AlchemyError> {
        // The empty result sorts first among all keys of this pair
        let lower = ComboKey::new(a, b, "");
        Ok(self
            .combos
            .range(lower.clone()..)
            .next()
            .is_some_and(|(key, _)| key.lo == lower.lo && key.hi == lower.hi))
    }

    fn combo_exists_with_result(
        &self,
        a: &str,
        b: &str,
        result: &str,
    ) -> Result<bool, AlchemyError> {
        Ok(self.combos.contains_key(&ComboKey::new(a, b, result)))
    }

    fn insert_combo(&mut self, a: &str, b: &str, result: &str) -> Result<(), AlchemyError> {
        for name in [a, b, result] {
            validate_name(name)?;
        }
        let key = ComboKey::new(a, b, result);
        if self.combos.contains_key(&key) {
            return Err(AlchemyError::AlreadyExists {
                kind: NodeType::Combo,
                key: format!("{a} + {b} = {result}"),
            });
        }
        let combo = Combo {
            id: self.next_combo_id,
            a: a.to_string(),
            b: b.to_string(),
            result: result.to_string(),
        };
        self.next_combo_id = self.next_combo_id.saturating_add(1);
        self.combos.insert(key, combo);
        Ok(())
    }

    fn remove_combo(&mut self, a: &str, b: &str, result: &str) -> Result<(), AlchemyError> {
        match self.combos.remove(&ComboKey::new(a, b, result)) {
            Some(_) => Ok(()),
            None => Err(AlchemyError::NotFound {
                kind: NodeType::Combo,
                key: format!("{a} + {b} = {result}"),
            }),
        }
    }

    fn count_elements(&self) -> Result<u64, AlchemyError> {
        Ok(self.order.len() as u64)
    }

    fn element_at(&self, position: u64) -> Result<Option<String>, AlchemyError> {
        Ok(usize::try_from(position)
            .ok()
            .and_then(|p| self.order.get(p))
            .cloned())
    }

    fn stats(&self) -> Result<StoreStats, AlchemyError> {
        Ok(StoreStats {
            elements: self.elements.len() as u64,
            combos: self.combos.len() as u64,
            discoveries: self.elements.values().filter(|(_, e)| e.is_new).count() as u64,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn inserted_element_exists() {
        let mut store = MemoryStore::new();
        store.insert_element(Element::new("Water")).expect("insert");
        assert!(store.element_exists("Water").expect("exists"));
        assert!(!store.element_exists("water").expect("exists"));
    }

    #[test]
    fn duplicate_element_is_already_exists() {
        let mut store = MemoryStore::with_elements(["Water"]).expect("seed");
        let err = store
            .insert_element(Element::new("Water").discovered(true))
            .expect_err("duplicate");
        assert!(err.is_benign());
        assert_eq!(store.count_elements().expect("count"), 1);
        // The first write wins; is_new is never rewritten
        assert!(!store.get_element("Water").expect("get").expect("some").is_new);
    }

    #[test]
    fn remove_absent_element_is_not_found() {
        let mut store = MemoryStore::with_elements(["Fire"]).expect("seed");
        let err = store.remove_element("Steam").expect_err("absent");
        assert!(matches!(err, AlchemyError::NotFound { .. }));
        assert_eq!(store.count_elements().expect("count"), 1);
    }

    #[test]
    fn remove_keeps_positions_dense() {
        let mut store = MemoryStore::with_elements(["A", "B", "C", "D"]).expect("seed");
        store.remove_element("B").expect("remove");

        let mut sampled: Vec<String> = (0..store.count_elements().expect("count"))
            .filter_map(|p| store.element_at(p).expect("at"))
            .collect();
        sampled.sort();
        assert_eq!(sampled, vec!["A", "C", "D"]);
        assert_eq!(store.element_at(3).expect("at"), None);

        // The moved element can still be removed cleanly
        store.remove_element("D").expect("remove moved");
        assert_eq!(store.count_elements().expect("count"), 2);
    }

    #[test]
    fn combo_pair_lookup_ignores_result_and_order() {
        let mut store = MemoryStore::new();
        store.insert_combo("Water", "Fire", "Steam").expect("insert");

        assert!(store.combo_exists("Fire", "Water").expect("exists"));
        assert!(store.combo_exists("Water", "Fire").expect("exists"));
        assert!(!store.combo_exists("Fire", "Earth").expect("exists"));
        assert!(store
            .combo_exists_with_result("Fire", "Water", "Steam")
            .expect("exists"));
        assert!(!store
            .combo_exists_with_result("Fire", "Water", "Smoke")
            .expect("exists"));
    }

    #[test]
    fn combo_pair_lookup_does_not_match_prefix_names() {
        let mut store = MemoryStore::new();
        store.insert_combo("Fire", "Waterfall", "Mist").expect("insert");
        assert!(!store.combo_exists("Fire", "Water").expect("exists"));
    }

    #[test]
    fn duplicate_combo_in_either_order_is_rejected() {
        let mut store = MemoryStore::new();
        store.insert_combo("Water", "Fire", "Steam").expect("insert");
        let err = store
            .insert_combo("Fire", "Water", "Steam")
            .expect_err("duplicate");
        assert!(matches!(err, AlchemyError::AlreadyExists { .. }));
        assert_eq!(store.combos().len(), 1);
    }

    #[test]
    fn remove_combo_then_absent() {
        let mut store = MemoryStore::new();
        store.insert_combo("Water", "Fire", "Steam").expect("insert");
        store.remove_combo("Fire", "Water", "Steam").expect("remove");
        assert!(store.remove_combo("Fire", "Water", "Steam").is_err());
        assert!(!store.combo_exists("Fire", "Water").expect("exists"));
    }

    #[test]
    fn sample_single_element() {
        let store = MemoryStore::with_elements(["Water"]).expect("seed");
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..32 {
            assert_eq!(store.sample_element(1, &mut rng).expect("sample"), "Water");
        }
    }

    #[test]
    fn sample_empty_bound_fails() {
        let store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            store.sample_element(0, &mut rng),
            Err(AlchemyError::EmptyStore)
        ));
    }

    #[test]
    fn stats_count_discoveries() {
        let mut store = MemoryStore::with_elements(["Water", "Fire"]).expect("seed");
        store
            .insert_element(Element::new("Steam").discovered(true))
            .expect("insert");
        store.insert_combo("Water", "Fire", "Steam").expect("combo");

        let stats = store.stats().expect("stats");
        assert_eq!(stats.elements, 3);
        assert_eq!(stats.combos, 1);
        assert_eq!(stats.discoveries, 1);
    }
}
