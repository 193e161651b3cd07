//! Finite control pools handed out as non-repeating random draws.
//!
//! The allocator owns every pool. Callers only ever see the drawn records,
//! never the remaining reservoir, so two expansions can not pull from the same
//! pool behind each other's back.

use log::debug;
use rand::seq::index;
use rand::Rng;

use crate::errors::{DualGuideError, Result};
use crate::guide::GuideRecord;

/// Handle to a pool registered with a [`ControlPoolAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolId(usize);

#[derive(Debug)]
struct ControlPool {
    name: String,
    original: Vec<GuideRecord>,
    available: Vec<GuideRecord>,
    resets: usize,
}

impl ControlPool {
    fn reset(&mut self) {
        self.available = self.original.clone();
        self.resets += 1;
    }
}

pub struct ControlPoolAllocator<R: Rng> {
    pools: Vec<ControlPool>,
    rng: R,
}

impl<R: Rng> ControlPoolAllocator<R> {
    pub fn new(rng: R) -> Self {
        Self {
            pools: Vec::new(),
            rng,
        }
    }

    pub fn register(&mut self, name: impl Into<String>, records: Vec<GuideRecord>) -> PoolId {
        let id = PoolId(self.pools.len());
        self.pools.push(ControlPool {
            name: name.into(),
            available: records.clone(),
            original: records,
            resets: 0,
        });
        id
    }

    /// Draw `n` distinct records from the pool, refilling it first if needed.
    ///
    /// Drawn records are removed from the pool until the next reset. Fails
    /// with `InsufficientPool` only when the full pool is smaller than `n`.
    pub fn sample(&mut self, id: PoolId, n: usize) -> Result<Vec<GuideRecord>> {
        self.sample_reserving(id, n, 0)
    }

    /// Like [`sample`](Self::sample), but the pool is also refilled whenever
    /// it holds `reuse_margin` records or fewer at the time of the draw.
    pub fn sample_reserving(
        &mut self,
        id: PoolId,
        n: usize,
        reuse_margin: usize,
    ) -> Result<Vec<GuideRecord>> {
        let pool = &mut self.pools[id.0];
        if n == 0 {
            return Ok(Vec::new());
        }
        if pool.original.len() < n {
            return Err(DualGuideError::InsufficientPool {
                pool: pool.name.clone(),
                available: pool.original.len(),
                requested: n,
            });
        }

        if pool.available.len() <= n || pool.available.len() <= reuse_margin {
            debug!(
                "Refilling control pool '{}' ({} left, {} requested)",
                pool.name,
                pool.available.len(),
                n
            );
            pool.reset();
        }

        let picks = index::sample(&mut self.rng, pool.available.len(), n).into_vec();

        let mut taken = vec![false; pool.available.len()];
        for &i in &picks {
            taken[i] = true;
        }
        let drawn: Vec<GuideRecord> = picks.iter().map(|&i| pool.available[i].clone()).collect();

        let mut flags = taken.iter();
        pool.available.retain(|_| !*flags.next().unwrap_or(&false));

        Ok(drawn)
    }

    /// Restore a pool to its full original contents.
    pub fn reset(&mut self, id: PoolId) {
        self.pools[id.0].reset();
    }

    /// Records currently left in the pool.
    pub fn available(&self, id: PoolId) -> usize {
        self.pools[id.0].available.len()
    }

    /// Size of the full pool.
    pub fn capacity(&self, id: PoolId) -> usize {
        self.pools[id.0].original.len()
    }

    pub fn name(&self, id: PoolId) -> &str {
        &self.pools[id.0].name
    }

    /// Number of times the pool has been refilled.
    pub fn resets(&self, id: PoolId) -> usize {
        self.pools[id.0].resets
    }
}
