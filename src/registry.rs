//! The bond registry.
//!
//! A type-erased map from [`BondType`] to provider values. Packages never
//! import each other; they bond implementations here and look them up by key.
//!
//! The registry is agnostic to what is stored. Each entry is either a
//! singleton (one current value) or a multi entry (provider name → value), and
//! the typed keys decide which shape a consumer expects.

use std::any::{type_name, Any};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::bond::{BondKey, BondType, MultiBondKey};
use crate::error::{RegistryError, RegistryResult};

type Erased = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
enum BondEntry {
    Single(Erased),
    Multi(BTreeMap<String, Erased>),
}

impl BondEntry {
    fn shape(&self) -> &'static str {
        match self {
            BondEntry::Single(_) => "singleton",
            BondEntry::Multi(_) => "multi",
        }
    }
}

fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Erased {
    Arc::new(value)
}

fn downcast<T: ?Sized + Send + Sync + 'static>(value: &Erased) -> Option<Arc<T>> {
    let any: &(dyn Any + Send + Sync) = value.as_ref();
    any.downcast_ref::<Arc<T>>().cloned()
}

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// A registry of bonded providers.
///
/// `Registry` is a cheap handle: clones share the same entries. Use
/// [`Registry::global`] for the process-wide instance, or [`Registry::new`]
/// for an isolated one (tests).
///
/// # Example
///
/// ```rust
/// use bondkit::{keys, MemoryStorage, Registry};
/// use std::sync::Arc;
///
/// let registry = Registry::new();
/// assert!(registry.require(&keys::DATABASE).is_err());
///
/// registry.bond(&keys::DATABASE, Arc::new(MemoryStorage::new()));
/// assert!(registry.is_bonded("database"));
/// ```
#[derive(Clone, Default)]
pub struct Registry {
    entries: Arc<RwLock<HashMap<BondType, BondEntry>>>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default registry.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Bond `value` as the singleton for `key`, replacing any previous value.
    pub fn bond<T>(&self, key: &BondKey<T>, value: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let bond_type = key.bond_type().clone();
        let previous = self
            .entries
            .write()
            .insert(bond_type.clone(), BondEntry::Single(erase(value)));

        if let Some(BondEntry::Multi(_)) = previous {
            tracing::warn!(%bond_type, "singleton bond replaced a multi entry");
        }
        tracing::debug!(%bond_type, provider = type_name::<T>(), "bonded");
    }

    /// Bond `value` under `provider` inside the multi entry for `key`.
    ///
    /// Other providers of the same type are kept.
    pub fn bond_named<T>(&self, key: &MultiBondKey<T>, provider: impl Into<String>, value: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let bond_type = key.bond_type().clone();
        let provider = provider.into();
        let mut entries = self.entries.write();
        let entry = entries
            .entry(bond_type.clone())
            .or_insert_with(|| BondEntry::Multi(BTreeMap::new()));

        if let BondEntry::Single(_) = entry {
            tracing::warn!(%bond_type, "multi bond replaced a singleton entry");
            *entry = BondEntry::Multi(BTreeMap::new());
        }
        if let BondEntry::Multi(providers) = entry {
            providers.insert(provider.clone(), erase(value));
        }
        tracing::debug!(%bond_type, %provider, "bonded");
    }

    /// Get the singleton bonded for `key`, if any.
    ///
    /// Returns `None` when nothing is bonded, when the entry is a multi entry,
    /// or when the stored value has a different type.
    pub fn get<T>(&self, key: &BondKey<T>) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self.entries.read().get(key.bond_type())? {
            BondEntry::Single(value) => downcast::<T>(value),
            BondEntry::Multi(_) => None,
        }
    }

    /// Get the singleton bonded for `key` or fail with [`RegistryError::NotBonded`].
    pub fn require<T>(&self, key: &BondKey<T>) -> RegistryResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let bond_type = key.bond_type();
        let entries = self.entries.read();
        match entries.get(bond_type) {
            None => Err(RegistryError::NotBonded {
                bond_type: bond_type.clone(),
            }),
            Some(BondEntry::Single(value)) => {
                downcast::<T>(value).ok_or_else(|| RegistryError::TypeMismatch {
                    bond_type: bond_type.clone(),
                    expected: type_name::<T>(),
                })
            }
            Some(entry @ BondEntry::Multi(_)) => {
                tracing::warn!(%bond_type, shape = entry.shape(), "singleton lookup on multi entry");
                Err(RegistryError::TypeMismatch {
                    bond_type: bond_type.clone(),
                    expected: type_name::<T>(),
                })
            }
        }
    }

    /// Get the provider bonded under `provider` for a multi key.
    pub fn get_named<T>(&self, key: &MultiBondKey<T>, provider: &str) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self.entries.read().get(key.bond_type())? {
            BondEntry::Multi(providers) => providers.get(provider).and_then(downcast::<T>),
            BondEntry::Single(_) => None,
        }
    }

    /// Get the provider bonded under `provider` or fail.
    pub fn require_named<T>(&self, key: &MultiBondKey<T>, provider: &str) -> RegistryResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let bond_type = key.bond_type();
        let entries = self.entries.read();
        let providers = match entries.get(bond_type) {
            None => {
                return Err(RegistryError::NotBonded {
                    bond_type: bond_type.clone(),
                })
            }
            Some(BondEntry::Multi(providers)) => providers,
            Some(entry @ BondEntry::Single(_)) => {
                tracing::warn!(%bond_type, shape = entry.shape(), "named lookup on singleton entry");
                return Err(RegistryError::TypeMismatch {
                    bond_type: bond_type.clone(),
                    expected: type_name::<T>(),
                });
            }
        };
        let value = providers
            .get(provider)
            .ok_or_else(|| RegistryError::ProviderNotBonded {
                bond_type: bond_type.clone(),
                provider: provider.to_string(),
            })?;
        downcast::<T>(value).ok_or_else(|| RegistryError::TypeMismatch {
            bond_type: bond_type.clone(),
            expected: type_name::<T>(),
        })
    }

    /// All providers of a multi key, keyed by provider name.
    ///
    /// Empty when nothing is bonded.
    pub fn get_all<T>(&self, key: &MultiBondKey<T>) -> BTreeMap<String, Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self.entries.read().get(key.bond_type()) {
            Some(BondEntry::Multi(providers)) => providers
                .iter()
                .filter_map(|(name, value)| Some((name.clone(), downcast::<T>(value)?)))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    /// Get the singleton for `key`, bonding the value built by `init` if absent.
    ///
    /// The constructed default is stored back so later calls observe the same
    /// instance. `init` runs without any lock held and may use the registry.
    pub fn get_or_bond_with<T, F>(&self, key: &BondKey<T>, init: F) -> Arc<T>
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce() -> Arc<T>,
    {
        if let Some(value) = self.get(key) {
            return value;
        }

        let value = init();

        let bond_type = key.bond_type();
        let mut entries = self.entries.write();
        match entries.get(bond_type) {
            // Another caller bonded while `init` ran; theirs wins.
            Some(BondEntry::Single(existing)) => {
                if let Some(existing) = downcast::<T>(existing) {
                    return existing;
                }
                tracing::warn!(%bond_type, "lazy default replaced a value of another type");
            }
            Some(entry @ BondEntry::Multi(_)) => {
                tracing::warn!(%bond_type, shape = entry.shape(), "lazy default replaced a multi entry");
            }
            None => {}
        }

        entries.insert(bond_type.clone(), BondEntry::Single(erase(value.clone())));
        tracing::debug!(%bond_type, provider = type_name::<T>(), "bonded lazy default");
        value
    }

    /// Check whether anything is bonded under `bond_type`.
    ///
    /// A multi entry counts as bonded once it holds at least one provider.
    /// Lazy defaults are not constructed.
    pub fn is_bonded(&self, bond_type: &str) -> bool {
        match self.entries.read().get(bond_type) {
            Some(BondEntry::Single(_)) => true,
            Some(BondEntry::Multi(providers)) => !providers.is_empty(),
            None => false,
        }
    }

    /// Remove the entry for `bond_type`. Returns whether one was present.
    pub fn unbond(&self, bond_type: &str) -> bool {
        let removed = self.entries.write().remove(bond_type).is_some();
        if removed {
            tracing::debug!(bond_type, "unbonded");
        }
        removed
    }

    /// Sorted list of every bond type currently bonded.
    pub fn bonded_types(&self) -> Vec<BondType> {
        self.snapshot().bonded.into_iter().collect()
    }

    /// Capture which bond types are bonded right now.
    pub fn snapshot(&self) -> BondSnapshot {
        let bonded = self
            .entries
            .read()
            .iter()
            .filter(|(_, entry)| match entry {
                BondEntry::Single(_) => true,
                BondEntry::Multi(providers) => !providers.is_empty(),
            })
            .map(|(bond_type, _)| bond_type.clone())
            .collect();
        BondSnapshot { bonded }
    }

    /// Clear every entry. Intended for test harnesses.
    pub fn reset(&self) {
        self.entries.write().clear();
        tracing::debug!("registry reset");
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read();
        let mut map = f.debug_map();
        for (bond_type, entry) in entries.iter() {
            map.entry(&bond_type.as_str(), &entry.shape());
        }
        map.finish()
    }
}

/// Immutable view of which bond types were bonded at capture time.
///
/// Route composition works against a snapshot so its result does not depend
/// on registry mutations happening mid-pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BondSnapshot {
    bonded: BTreeSet<BondType>,
}

impl BondSnapshot {
    pub fn is_bonded(&self, bond_type: &str) -> bool {
        self.bonded.contains(bond_type)
    }

    pub fn len(&self) -> usize {
        self.bonded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bonded.is_empty()
    }
}

impl FromIterator<BondType> for BondSnapshot {
    fn from_iter<I: IntoIterator<Item = BondType>>(iter: I) -> Self {
        Self {
            bonded: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::types;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Fixed(&'static str);

    impl Greeter for Fixed {
        fn greet(&self) -> String {
            self.0.to_string()
        }
    }

    trait Gateway: Send + Sync {
        fn id(&self) -> &str;
    }

    struct NamedGateway(&'static str);

    impl Gateway for NamedGateway {
        fn id(&self) -> &str {
            self.0
        }
    }

    const GREETER: BondKey<dyn Greeter> = BondKey::new("greeter");
    const GATEWAYS: MultiBondKey<dyn Gateway> = MultiBondKey::new("payments");

    #[test]
    fn test_registry_bond_and_get() {
        let registry = Registry::new();
        assert!(registry.get(&GREETER).is_none());
        assert!(!registry.is_bonded("greeter"));

        registry.bond(&GREETER, Arc::new(Fixed("hi")));
        assert_eq!(registry.get(&GREETER).unwrap().greet(), "hi");
        assert!(registry.is_bonded("greeter"));
    }

    #[test]
    fn test_registry_rebond_replaces() {
        let registry = Registry::new();
        registry.bond(&GREETER, Arc::new(Fixed("first")));
        registry.bond(&GREETER, Arc::new(Fixed("second")));

        assert_eq!(registry.require(&GREETER).unwrap().greet(), "second");
    }

    #[test]
    fn test_registry_require_unbonded() {
        let registry = Registry::new();
        let err = registry.require(&GREETER).err().unwrap();
        assert_eq!(
            err,
            RegistryError::NotBonded {
                bond_type: BondType::new("greeter")
            }
        );
    }

    #[test]
    fn test_registry_require_wrong_type() {
        let registry = Registry::new();
        let other: BondKey<dyn Gateway> = BondKey::new("greeter");
        registry.bond(&other, Arc::new(NamedGateway("x")));

        assert!(registry.get(&GREETER).is_none());
        assert!(matches!(
            registry.require(&GREETER),
            Err(RegistryError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_registry_multi_entries() {
        let registry = Registry::new();
        assert!(registry.get_all(&GATEWAYS).is_empty());

        registry.bond_named(&GATEWAYS, "stripe", Arc::new(NamedGateway("stripe")));
        registry.bond_named(&GATEWAYS, "paypal", Arc::new(NamedGateway("paypal")));

        let all = registry.get_all(&GATEWAYS);
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["paypal", "stripe"]);
        assert_eq!(registry.get_named(&GATEWAYS, "stripe").unwrap().id(), "stripe");
        assert!(registry.is_bonded(types::PAYMENTS.as_str()));

        let err = registry.require_named(&GATEWAYS, "adyen").err().unwrap();
        assert!(matches!(err, RegistryError::ProviderNotBonded { provider, .. } if provider == "adyen"));
    }

    #[test]
    fn test_registry_shape_replacement() {
        let registry = Registry::new();
        let single: BondKey<dyn Gateway> = BondKey::new("payments");

        registry.bond(&single, Arc::new(NamedGateway("one")));
        assert!(registry.get_named(&GATEWAYS, "one").is_none());

        registry.bond_named(&GATEWAYS, "stripe", Arc::new(NamedGateway("stripe")));
        assert!(registry.get(&single).is_none());
        assert_eq!(registry.get_all(&GATEWAYS).len(), 1);
    }

    #[test]
    fn test_registry_lazy_default_is_cached() {
        let registry = Registry::new();
        let first = registry.get_or_bond_with(&GREETER, || Arc::new(Fixed("default")));
        let second = registry.get_or_bond_with(&GREETER, || Arc::new(Fixed("other")));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.require(&GREETER).unwrap().greet(), "default");
    }

    #[test]
    fn test_registry_lazy_default_may_read_registry() {
        let registry = Registry::new();
        registry.bond_named(&GATEWAYS, "stripe", Arc::new(NamedGateway("stripe")));

        let built = registry.get_or_bond_with(&GREETER, || {
            let gateways = registry.get_all(&GATEWAYS).len();
            assert!(!registry.is_bonded("greeter"));
            Arc::new(Fixed(if gateways == 1 { "one gateway" } else { "none" }))
        });

        assert_eq!(built.greet(), "one gateway");
        assert!(Arc::ptr_eq(&built, &registry.require(&GREETER).unwrap()));
    }

    #[test]
    fn test_registry_lazy_default_loses_race() {
        let registry = Registry::new();
        let built = registry.get_or_bond_with(&GREETER, || {
            registry.bond(&GREETER, Arc::new(Fixed("winner")));
            Arc::new(Fixed("late"))
        });

        assert_eq!(built.greet(), "winner");
        assert_eq!(registry.require(&GREETER).unwrap().greet(), "winner");
    }

    #[test]
    fn test_registry_lazy_default_replaces_other_shape() {
        let registry = Registry::new();
        let multi: MultiBondKey<dyn Greeter> = MultiBondKey::new("greeter");
        registry.bond_named(&multi, "en", Arc::new(Fixed("hello")));

        let built = registry.get_or_bond_with(&GREETER, || Arc::new(Fixed("default")));
        assert_eq!(built.greet(), "default");
        assert!(registry.get_all(&multi).is_empty());
    }

    #[test]
    fn test_registry_named_lookup_on_singleton() {
        let registry = Registry::new();
        let single: BondKey<dyn Gateway> = BondKey::new("payments");
        registry.bond(&single, Arc::new(NamedGateway("one")));

        assert!(matches!(
            registry.require_named(&GATEWAYS, "one"),
            Err(RegistryError::TypeMismatch { ref bond_type, .. }) if bond_type.as_str() == "payments"
        ));
    }

    #[test]
    fn test_registry_concurrent_bond_and_reset() {
        let registry = Registry::new();

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let registry = registry.clone();
                scope.spawn(move || {
                    for round in 0..500 {
                        match (worker + round) % 4 {
                            0 => registry.bond(&GREETER, Arc::new(Fixed("a"))),
                            1 => registry.bond_named(&GATEWAYS, "stripe", Arc::new(NamedGateway("stripe"))),
                            2 => registry.reset(),
                            _ => {
                                if let Some(greeter) = registry.get(&GREETER) {
                                    assert_eq!(greeter.greet(), "a");
                                }
                                let _ = registry.snapshot();
                                let _ = registry.get_or_bond_with(&GREETER, || Arc::new(Fixed("a")));
                            }
                        }
                    }
                });
            }
        });

        registry.reset();
        registry.bond(&GREETER, Arc::new(Fixed("after")));
        assert_eq!(registry.require(&GREETER).unwrap().greet(), "after");
        assert_eq!(registry.bonded_types(), vec![BondType::new("greeter")]);
    }

    #[test]
    fn test_registry_reset_and_unbond() {
        let registry = Registry::new();
        registry.bond(&GREETER, Arc::new(Fixed("a")));
        registry.bond_named(&GATEWAYS, "stripe", Arc::new(NamedGateway("stripe")));

        assert!(registry.unbond("greeter"));
        assert!(!registry.unbond("greeter"));
        assert!(registry.is_bonded("payments"));

        registry.reset();
        assert!(!registry.is_bonded("payments"));
        assert!(registry.bonded_types().is_empty());
    }

    #[test]
    fn test_registry_clones_share_entries() {
        let registry = Registry::new();
        let handle = registry.clone();
        handle.bond(&GREETER, Arc::new(Fixed("shared")));

        assert!(registry.is_bonded("greeter"));
    }

    #[test]
    fn test_snapshot_is_frozen() {
        let registry = Registry::new();
        registry.bond(&GREETER, Arc::new(Fixed("a")));
        let snapshot = registry.snapshot();
        registry.reset();

        assert!(snapshot.is_bonded("greeter"));
        assert_eq!(snapshot.len(), 1);
        assert!(registry.snapshot().is_empty());
    }
}
