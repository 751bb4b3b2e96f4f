//! In-memory collection of located stockists for one session.
//!
//! The registry is built once from the feed and never mutated afterwards.
//! Iteration order is feed order; every query in the locator preserves it.

use std::collections::HashMap;

use crate::stockist::{Stockist, StockistRecord};

#[derive(Debug, Clone, Default)]
pub struct StockistRegistry {
    stockists: Vec<Stockist>,
    index: HashMap<String, usize>,
}

impl StockistRegistry {
    /// Builds a registry from raw feed records.
    ///
    /// Records without a valid coordinate are dropped, as are later records
    /// repeating an id already seen. Drops are reported only as batch totals.
    #[must_use]
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = StockistRecord>,
    {
        let mut registry = Self::default();
        let mut invalid = 0usize;
        let mut duplicate = 0usize;

        for record in records {
            let Some(stockist) = Stockist::from_record(record) else {
                invalid += 1;
                continue;
            };
            if !registry.push(stockist) {
                duplicate += 1;
            }
        }

        tracing::debug!(
            loaded = registry.len(),
            invalid,
            duplicate,
            "built stockist registry"
        );
        registry
    }

    /// First record wins; returns `false` for a repeated id.
    fn push(&mut self, stockist: Stockist) -> bool {
        if self.index.contains_key(&stockist.id) {
            return false;
        }
        self.index.insert(stockist.id.clone(), self.stockists.len());
        self.stockists.push(stockist);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stockists.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stockists.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Stockist> {
        self.stockists.iter()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Stockist> {
        self.index.get(id).map(|&i| &self.stockists[i])
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }
}

impl<'a> IntoIterator for &'a StockistRegistry {
    type Item = &'a Stockist;
    type IntoIter = std::slice::Iter<'a, Stockist>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
