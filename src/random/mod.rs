mod macros;
mod source;

use std::any::Any;

pub use macros::define_rng;
pub use source::RandomSource;

use crate::rand::SeedableRng;

pub trait RngId: Copy + Clone + 'static {
    type RngType: SeedableRng;
    fn get_name() -> &'static str;
}

// This is a wrapper that allows for future support for different types of
// random number generators (anything that implements SeedableRng is valid).
struct RngHolder {
    rng: Box<dyn Any>,
}
