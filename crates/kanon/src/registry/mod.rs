//! Type registry for polymorphic (interface-typed) values.
//!
//! A polymorphic field carries a small globally-unique byte tag identifying
//! the concrete type of its value, so the bytes are self-describing without a
//! separate schema-compiler step. Tags are derived deterministically from the
//! registered name: 3 disambiguation bytes plus 4 prefix bytes, none of them
//! zero.
//!
//! On the wire, a non-nil polymorphic envelope opens with either the bare
//! 4-byte prefix or, when the long form is used, a `0x00` escape followed by
//! the 3 disambiguation bytes and the 4 prefix bytes. The two-byte all-zero
//! marker is reserved for a nil value; since derived tags never contain zero
//! bytes, the three forms cannot collide.
//!
//! Registration is schema construction and happens before first use; mistakes
//! there (duplicate names, prefix collisions, registering after [`Registry::seal`])
//! are programmer errors and panic rather than surfacing on the data path.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::schema::FieldType;

/// Disambiguation bytes: 3 non-zero bytes derived from the type name
pub type DisambBytes = [u8; 3];

/// Prefix bytes: 4 non-zero bytes derived from the type name
pub type PrefixBytes = [u8; 4];

/// Wire marker for a nil polymorphic value
pub const NIL_MARKER: [u8; 2] = [0x00, 0x00];

/// Leading escape byte announcing the long disamb+prefix tag form
pub const DISAMB_ESCAPE: u8 = 0x00;

/// Descriptor of one registered concrete type.
///
/// Immutable once the owning registry is sealed.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Globally-unique registered name
    pub name: String,
    /// Disambiguation bytes derived from the name
    pub disamb: DisambBytes,
    /// Prefix bytes derived from the name
    pub prefix: PrefixBytes,
    /// Structural description of the concrete type
    pub ty: FieldType,
}

/// Derive the disambiguation and prefix bytes for a registered name.
///
/// The derivation hashes the name with blake3 and takes the first 3 and next
/// 4 non-zero digest bytes; if a digest runs out of non-zero bytes it is
/// re-hashed and the walk continues. Pure function; exposed for external
/// tooling that wants to print tags without a registry.
pub fn name_to_disfix(name: &str) -> (DisambBytes, PrefixBytes) {
    let mut picked = [0u8; 7];
    let mut filled = 0;
    let mut digest = *blake3::hash(name.as_bytes()).as_bytes();
    loop {
        for &b in digest.iter() {
            if b != 0 {
                picked[filled] = b;
                filled += 1;
                if filled == picked.len() {
                    let disamb = [picked[0], picked[1], picked[2]];
                    let prefix = [picked[3], picked[4], picked[5], picked[6]];
                    return (disamb, prefix);
                }
            }
        }
        digest = *blake3::hash(&digest).as_bytes();
    }
}

/// Bidirectional mapping between interface categories, concrete types, and
/// their wire tags.
#[derive(Debug, Default)]
pub struct Registry {
    interfaces: HashSet<String>,
    descriptors: Vec<TypeDescriptor>,
    by_name: HashMap<String, usize>,
    by_prefix: HashMap<PrefixBytes, usize>,
    by_disfix: HashMap<(DisambBytes, PrefixBytes), usize>,
    sealed: bool,
}

impl Registry {
    /// Creates an empty, unsealed registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a polymorphic category with no implementations yet.
    ///
    /// # Panics
    ///
    /// Panics if the registry is sealed or the category already exists.
    pub fn register_interface(&mut self, category: &str) {
        if self.sealed {
            panic!("cannot register interface '{category}': registry is sealed");
        }
        if !self.interfaces.insert(category.to_owned()) {
            panic!("interface '{category}' is already registered");
        }
        debug!(category, "registered interface category");
    }

    /// Registers a concrete type under a globally-unique name.
    ///
    /// The wire tag is derived from the name via [`name_to_disfix`].
    ///
    /// # Panics
    ///
    /// Panics if the registry is sealed, the name is already taken, or the
    /// derived prefix bytes collide with an already-registered type. A prefix
    /// collision is a fatal configuration error here, never deferred to
    /// encode/decode time.
    pub fn register_concrete(&mut self, name: &str, ty: FieldType) {
        if self.sealed {
            panic!("cannot register concrete type '{name}': registry is sealed");
        }
        if self.by_name.contains_key(name) {
            panic!("concrete type '{name}' is already registered");
        }
        let (disamb, prefix) = name_to_disfix(name);
        if let Some(&idx) = self.by_prefix.get(&prefix) {
            panic!(
                "prefix bytes {prefix:02X?} for '{name}' collide with already-registered type '{}'",
                self.descriptors[idx].name
            );
        }

        let idx = self.descriptors.len();
        self.descriptors.push(TypeDescriptor {
            name: name.to_owned(),
            disamb,
            prefix,
            ty,
        });
        self.by_name.insert(name.to_owned(), idx);
        self.by_prefix.insert(prefix, idx);
        self.by_disfix.insert((disamb, prefix), idx);
        debug!(name, prefix = ?prefix, "registered concrete type");
    }

    /// Freezes the registry. One-way and idempotent; after sealing, every
    /// `register_*` call panics and the registry is safe to share across
    /// threads without locking.
    pub fn seal(&mut self) {
        if !self.sealed {
            self.sealed = true;
            debug!(
                concretes = self.descriptors.len(),
                interfaces = self.interfaces.len(),
                "sealed registry"
            );
        }
    }

    /// Returns true once [`Registry::seal`] has been called
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Returns true if the category has been declared
    pub fn has_interface(&self, category: &str) -> bool {
        self.interfaces.contains(category)
    }

    /// Looks up a concrete type by its registered name
    pub fn descriptor_by_name(&self, name: &str) -> Option<&TypeDescriptor> {
        self.by_name.get(name).map(|&idx| &self.descriptors[idx])
    }

    /// Looks up a concrete type by its prefix bytes (short tag form)
    pub fn descriptor_by_prefix(&self, prefix: &PrefixBytes) -> Option<&TypeDescriptor> {
        self.by_prefix.get(prefix).map(|&idx| &self.descriptors[idx])
    }

    /// Looks up a concrete type by its full disfix bytes (long tag form)
    pub fn descriptor_by_disfix(
        &self,
        disamb: &DisambBytes,
        prefix: &PrefixBytes,
    ) -> Option<&TypeDescriptor> {
        self.by_disfix
            .get(&(*disamb, *prefix))
            .map(|&idx| &self.descriptors[idx])
    }
}
