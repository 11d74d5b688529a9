//! Bond types and typed bond keys.
//!
//! A [`BondType`] is the opaque string naming a capability category. The
//! registry itself only ever sees bond types; consumers go through a
//! [`BondKey`] or [`MultiBondKey`], which pair the type with the trait object
//! stored under it and fix the entry's shape at the declaration site.

use std::borrow::{Borrow, Cow};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::analytics::Analytics;
use crate::cache::Cache;
use crate::logging::Logger;
use crate::storage::StorageProvider;

/// Identifier of a capability category such as `database` or `payments`.
///
/// Not an enum: packages introduce new bond types by declaring a constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BondType(Cow<'static, str>);

impl BondType {
    /// Create a bond type from a static name.
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BondType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for BondType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for BondType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for BondType {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl From<String> for BondType {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// Well-known bond types.
pub mod types {
    use super::BondType;

    pub const DATABASE: BondType = BondType::new("database");
    pub const LOGGER: BondType = BondType::new("logger");
    pub const ANALYTICS: BondType = BondType::new("analytics");
    pub const CACHE: BondType = BondType::new("cache");
    /// Multi-shaped: one entry per payment processor.
    pub const PAYMENTS: BondType = BondType::new("payments");
    /// Multi-shaped: one entry per OAuth verifier.
    pub const OAUTH: BondType = BondType::new("oauth");
}

/// Typed key for a singleton bond holding an `Arc<T>`.
///
/// ```rust
/// use bondkit::{BondKey, Registry};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// const GREETER: BondKey<dyn Greeter> = BondKey::new("greeter");
///
/// let registry = Registry::new();
/// registry.bond(&GREETER, Arc::new(English));
/// assert_eq!(registry.require(&GREETER).unwrap().greet(), "hello");
/// ```
pub struct BondKey<T: ?Sized> {
    bond_type: BondType,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized> BondKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            bond_type: BondType::new(name),
            _marker: PhantomData,
        }
    }

    /// Key for a bond type only known at runtime.
    pub fn from_type(bond_type: BondType) -> Self {
        Self {
            bond_type,
            _marker: PhantomData,
        }
    }

    pub fn bond_type(&self) -> &BondType {
        &self.bond_type
    }
}

impl<T: ?Sized> Clone for BondKey<T> {
    fn clone(&self) -> Self {
        Self::from_type(self.bond_type.clone())
    }
}

impl<T: ?Sized> fmt::Debug for BondKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BondKey").field(&self.bond_type).finish()
    }
}

/// Typed key for a multi bond: provider name → `Arc<T>`.
///
/// Used where several providers of one capability coexist and the caller
/// picks one by name at request time (payments, OAuth).
pub struct MultiBondKey<T: ?Sized> {
    bond_type: BondType,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized> MultiBondKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            bond_type: BondType::new(name),
            _marker: PhantomData,
        }
    }

    pub fn from_type(bond_type: BondType) -> Self {
        Self {
            bond_type,
            _marker: PhantomData,
        }
    }

    pub fn bond_type(&self) -> &BondType {
        &self.bond_type
    }
}

impl<T: ?Sized> Clone for MultiBondKey<T> {
    fn clone(&self) -> Self {
        Self::from_type(self.bond_type.clone())
    }
}

impl<T: ?Sized> fmt::Debug for MultiBondKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MultiBondKey").field(&self.bond_type).finish()
    }
}

/// Typed keys for the capabilities the core itself consumes.
pub mod keys {
    use super::*;

    pub const DATABASE: BondKey<dyn StorageProvider> = BondKey::new("database");
    pub const LOGGER: BondKey<dyn Logger> = BondKey::new("logger");
    pub const ANALYTICS: BondKey<dyn Analytics> = BondKey::new("analytics");
    pub const CACHE: BondKey<dyn Cache> = BondKey::new("cache");
}
