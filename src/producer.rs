//! Sources of per-round input populations.
//!
//! The engine never measures anything itself. Each round it asks a
//! [`RoundInputProducer`] for a feature table, passing the round index and
//! the identities the previous round selected as worth another look. Round
//! 0 passes an empty seed list and expects the full base population.
//!
//! Producers are registered by name in a [`ProducerRegistry`], so embedding
//! applications can wire measurement backends in without the engine
//! depending on any of them.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::table::FeatureTable;

/// Supplies the input population for each round.
pub trait RoundInputProducer {
    /// Produce the feature table for `round`.
    ///
    /// `seeds` lists the identities the engine wants represented; an empty
    /// list means the full base population. Implementations may return more
    /// rows than asked for, since the engine resamples to its budget, but
    /// every seed identity must be covered.
    fn produce(&mut self, round: usize, seeds: &[String]) -> Result<FeatureTable>;
}

/// Constructor for a named producer.
pub type ProducerFactory = Box<dyn Fn() -> Box<dyn RoundInputProducer> + Send + Sync>;

/// Name-keyed collection of producer factories.
#[derive(Default)]
pub struct ProducerRegistry {
    factories: BTreeMap<String, ProducerFactory>,
}

impl ProducerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, factory: ProducerFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Instantiate the producer registered under `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn RoundInputProducer>> {
        match self.factories.get(name) {
            Some(factory) => Ok(factory()),
            None => Err(Error::UnknownProducer { name: name.to_string() }),
        }
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// True when `name` has a registered factory.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl std::fmt::Debug for ProducerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerRegistry").field("names", &self.names()).finish()
    }
}

/// Producer that serves slices of a fixed in-memory table.
///
/// The common case for offline analysis: measurements were collected once,
/// and every round draws from that cache. Seeded rounds get the base rows
/// whose identity is in the seed set, in base row order.
#[derive(Debug, Clone)]
pub struct TableProducer {
    base: FeatureTable,
}

impl TableProducer {
    /// Wrap a base population.
    pub fn new(base: FeatureTable) -> Self {
        Self { base }
    }
}

impl RoundInputProducer for TableProducer {
    fn produce(&mut self, round: usize, seeds: &[String]) -> Result<FeatureTable> {
        if seeds.is_empty() {
            return Ok(self.base.clone());
        }

        let by_identity = self.base.rows_by_identity();
        for seed in seeds {
            if !by_identity.contains_key(seed) {
                return Err(Error::Producer {
                    round,
                    message: format!("identity `{}` is not in the base population", seed),
                });
            }
        }

        let keep: Vec<usize> = (0..self.base.len())
            .filter(|&r| seeds.contains(&self.base.identities()[r]))
            .collect();
        Ok(self.base.select_rows(&keep))
    }
}
