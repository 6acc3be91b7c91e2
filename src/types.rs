use serde::Serialize;
use std::fmt;

// Fast hash maps / sets using AHash instead of the default SipHash.
// Lookup tables only: anything written to disk is ordered through a Vec.
pub type HashMap<K, V> = ahash::HashMap<K, V>;
pub type HashSet<K> = ahash::HashSet<K>;
pub use ahash::HashMapExt;
pub use ahash::HashSetExt;

/// Side of a two-gene fusion.
///
/// Before ordering this is the gene role (GeneA or GeneB of the chimera id);
/// after transcript selection it is the positional `Actual_order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Role {
    A,
    B,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::A => "A",
            Role::B => "B",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
