use std::any::TypeId;
use std::cell::{RefCell, RefMut};
use std::collections::HashMap;

use log::trace;

use crate::hashing::hash_str;
use crate::rand::distr::Distribution;
use crate::rand::{Rng, SeedableRng};
use crate::random::{RngHolder, RngId};

/// A source of independent random streams sharing one base seed.
///
/// Each stream is keyed by an [`RngId`] declared with [`define_rng!`](crate::define_rng) and is
/// created lazily the first time it is sampled, from `base_seed + hash(name)`. Two sources built
/// with the same seed therefore produce the same draws on every stream, regardless of the order in
/// which the streams are first used.
pub struct RandomSource {
    base_seed: u64,
    // Stored in a RefCell so that sampling only needs a shared borrow of the source.
    rng_holders: RefCell<HashMap<TypeId, RngHolder>>,
}

impl RandomSource {
    #[must_use]
    pub fn new(base_seed: u64) -> Self {
        trace!("initializing random source (seed={base_seed})");
        RandomSource {
            base_seed,
            rng_holders: RefCell::new(HashMap::new()),
        }
    }

    /// Creates a source with a base seed drawn from the operating system's entropy. The seed is
    /// available from [`RandomSource::base_seed`] so the run can be reproduced.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(crate::rand::rng().random())
    }

    #[must_use]
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Sets a new base seed. Existing streams are dropped so they get re-seeded on next use.
    pub fn reseed(&mut self, base_seed: u64) {
        trace!("reseeding random source (seed={base_seed})");
        self.base_seed = base_seed;
        self.rng_holders.get_mut().clear();
    }

    /// Gets a mutable reference to the random number generator associated with the given
    /// [`RngId`], creating it if it has not been used before.
    ///
    /// Panics if a stream is already borrowed, which can only happen if a sampler closure tries
    /// to sample from the same source.
    fn get_rng<R: RngId>(&self) -> RefMut<R::RngType> {
        let rng_holders = self.rng_holders.borrow_mut();
        RefMut::map(rng_holders, |holders| {
            holders
                .entry(TypeId::of::<R>())
                // Create a new rng holder if it doesn't exist yet
                .or_insert_with(|| {
                    trace!(
                        "creating new RNG (seed={}) for {}",
                        self.base_seed,
                        R::get_name()
                    );
                    let seed_offset = hash_str(R::get_name());
                    RngHolder {
                        rng: Box::new(R::RngType::seed_from_u64(
                            self.base_seed.wrapping_add(seed_offset),
                        )),
                    }
                })
                .rng
                .downcast_mut::<R::RngType>()
                .expect("RngHolder keyed by TypeId holds a generator of that RngId's type")
        })
    }

    /// Gets a random sample from the stream associated with the given [`RngId`] by applying
    /// the specified sampler function.
    pub fn sample<R: RngId, T>(
        &self,
        _rng_type: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T {
        let mut rng = self.get_rng::<R>();
        sampler(&mut rng)
    }

    /// Gets a random sample from the specified distribution using the stream associated with
    /// the given [`RngId`].
    pub fn sample_distr<R: RngId, T>(&self, _rng_type: R, distribution: impl Distribution<T>) -> T
    where
        R::RngType: Rng,
    {
        let mut rng = self.get_rng::<R>();
        distribution.sample::<R::RngType>(&mut rng)
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}
