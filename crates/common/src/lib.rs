//! Shared types for the blockworld simulation: voxel ids, boxes, rays.
//!
//! # Invariants
//! - A `Voxel` always holds an id in `[-1, 15]`.
//! - `Ray` directions are unit length or exactly zero.

mod types;

pub use types::{Aabb, InvalidVoxel, Ray, Voxel};

/// Splitmix64 ... a fast, high-quality deterministic PRNG step function.
///
/// Used for reproducible terrain and simulation seeds without depending on
/// floating-point ordering.
pub fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splitmix_is_deterministic() {
        assert_eq!(splitmix64(42), splitmix64(42));
        assert_ne!(splitmix64(1), splitmix64(2));
    }
}
