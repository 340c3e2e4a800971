//! Deterministic hash-based identity for types, fields and methods.
//!
//! A [`TypeHash`] is computed from names and signatures, so the layout engine,
//! the registry and the compiler agree on identities without sharing tables.
//!
//! ```
//! use tern_core::TypeHash;
//!
//! let a = TypeHash::from_name("kernel.Thread");
//! assert_eq!(a, TypeHash::from_name("kernel.Thread"));
//!
//! let int = TypeHash::from_name("int");
//! let long = TypeHash::from_name("long");
//! assert_ne!(
//!     TypeHash::from_method(a, "sleep", &[int]),
//!     TypeHash::from_method(a, "sleep", &[long]),
//! );
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants.
///
/// Types, fields, methods and constructors with the same spelling must not
/// collide, so each domain is xor-ed with its own marker.
pub mod hash_constants {
    /// Separator constant for sequence mixing.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;
    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;
    /// Domain marker for field hashes.
    pub const FIELD: u64 = 0x1a095090689d4647;
    /// Domain marker for method hashes.
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;
    /// Domain marker for constructor hashes.
    pub const CONSTRUCTOR: u64 = 0x9a7f3d5e2b8c4601;

    /// Per-position parameter markers, so parameter order matters.
    pub const PARAM_MARKERS: [u64; 8] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
    ];
}

/// A deterministic 64-bit identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Hash of a fully qualified type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash of a field, scoped by its declaring type.
    #[inline]
    pub fn from_field(owner: TypeHash, name: &str) -> Self {
        TypeHash(hash_constants::FIELD ^ owner.0.rotate_left(17) ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash of a method from owner, name and parameter identities.
    #[inline]
    pub fn from_method(owner: TypeHash, name: &str, params: &[TypeHash]) -> Self {
        let seed = hash_constants::METHOD ^ owner.0 ^ xxh64(name.as_bytes(), 0);
        TypeHash(mix_params(seed, params))
    }

    /// Hash of a constructor. Constructors have no name of their own.
    #[inline]
    pub fn from_constructor(owner: TypeHash, params: &[TypeHash]) -> Self {
        TypeHash(mix_params(hash_constants::CONSTRUCTOR ^ owner.0, params))
    }

    /// Check if this is the empty hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

fn mix_params(seed: u64, params: &[TypeHash]) -> u64 {
    let mut hash = seed;
    for (i, param) in params.iter().enumerate() {
        let marker = hash_constants::PARAM_MARKERS
            .get(i)
            .copied()
            .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64));
        // wrapping_mul keeps the mix order-sensitive
        hash = hash
            .wrapping_mul(hash_constants::SEP)
            .wrapping_add(marker ^ param.0);
    }
    hash
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(TypeHash::from_name("Foo"), TypeHash::from_name("Foo"));
        assert_ne!(TypeHash::from_name("Foo"), TypeHash::from_name("Bar"));
    }

    #[test]
    fn domains_do_not_collide() {
        let owner = TypeHash::from_name("Foo");
        assert_ne!(TypeHash::from_field(owner, "x"), TypeHash::from_method(owner, "x", &[]));
        assert_ne!(TypeHash::from_method(owner, "x", &[]), TypeHash::from_constructor(owner, &[]));
    }

    #[test]
    fn parameter_order_matters() {
        let owner = TypeHash::from_name("Foo");
        let a = TypeHash::from_name("int");
        let b = TypeHash::from_name("long");
        assert_ne!(
            TypeHash::from_method(owner, "m", &[a, b]),
            TypeHash::from_method(owner, "m", &[b, a])
        );
    }

    #[test]
    fn many_parameters_still_hash() {
        let owner = TypeHash::from_name("Foo");
        let int = TypeHash::from_name("int");
        let params = vec![int; 12];
        assert_ne!(
            TypeHash::from_method(owner, "m", &params),
            TypeHash::from_method(owner, "m", &params[..11])
        );
    }
}
