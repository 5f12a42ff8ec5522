use std::collections::BTreeMap;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::error::BlackboardError;
use crate::{EntityRef, FPVector2, FPVector3, FP};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlackboardTag {
    Fp,
    Vector2,
    Vector3,
    Bool,
    Int,
    Entity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlackboardValue {
    Fp(FP),
    Vector2(FPVector2),
    Vector3(FPVector3),
    Bool(bool),
    Int(i32),
    Entity(EntityRef),
}

impl BlackboardValue {
    pub fn tag(&self) -> BlackboardTag {
        match self {
            BlackboardValue::Fp(_) => BlackboardTag::Fp,
            BlackboardValue::Vector2(_) => BlackboardTag::Vector2,
            BlackboardValue::Vector3(_) => BlackboardTag::Vector3,
            BlackboardValue::Bool(_) => BlackboardTag::Bool,
            BlackboardValue::Int(_) => BlackboardTag::Int,
            BlackboardValue::Entity(_) => BlackboardTag::Entity,
        }
    }

    pub fn default_for(tag: BlackboardTag) -> Self {
        match tag {
            BlackboardTag::Fp => BlackboardValue::Fp(FP::ZERO),
            BlackboardTag::Vector2 => BlackboardValue::Vector2(FPVector2::ZERO),
            BlackboardTag::Vector3 => BlackboardValue::Vector3(FPVector3::ZERO),
            BlackboardTag::Bool => BlackboardValue::Bool(false),
            BlackboardTag::Int => BlackboardValue::Int(0),
            BlackboardTag::Entity => BlackboardValue::Entity(EntityRef::NONE),
        }
    }

    /// Numeric view: `Fp` as-is, `Int` promoted.
    pub fn as_fp(&self) -> Option<FP> {
        match *self {
            BlackboardValue::Fp(v) => Some(v),
            BlackboardValue::Int(v) => Some(FP::from_int(v)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            BlackboardValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}

/// Rust types that can live on a blackboard. The tag of a key is fixed by the type it was
/// registered with.
pub trait BlackboardType: Copy + Default + 'static {
    const TAG: BlackboardTag;

    fn into_value(self) -> BlackboardValue;

    fn from_value(value: &BlackboardValue) -> Option<Self>;
}

macro_rules! blackboard_type {
    ($ty:ty, $variant:ident) => {
        impl BlackboardType for $ty {
            const TAG: BlackboardTag = BlackboardTag::$variant;

            fn into_value(self) -> BlackboardValue {
                BlackboardValue::$variant(self)
            }

            fn from_value(value: &BlackboardValue) -> Option<Self> {
                match *value {
                    BlackboardValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }

        impl From<$ty> for BlackboardValue {
            fn from(value: $ty) -> Self {
                BlackboardValue::$variant(value)
            }
        }
    };
}

blackboard_type!(FP, Fp);
blackboard_type!(FPVector2, Vector2);
blackboard_type!(FPVector3, Vector3);
blackboard_type!(bool, Bool);
blackboard_type!(i32, Int);
blackboard_type!(EntityRef, Entity);

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BbKey<T: 'static> {
    id: u64,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for BbKey<T> {}

impl<T: 'static> Clone for BbKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> BbKey<T> {
    pub const fn new(id: u64) -> Self {
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    pub fn id(self) -> u64 {
        self.id
    }
}

/// Identifies whoever wants to hear about writes to a key (for behavior trees: a decorator's
/// node index).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ObserverId(pub u32);

/// Per-entity keyed store of typed values.
///
/// Observers are an explicit table `key -> [ObserverId]`. A write that changes a value queues
/// every observer of that key before `set` returns; the owning engine drains the queue with
/// `take_reactions`.
#[derive(Debug, Clone, Default)]
pub struct Blackboard {
    values: BTreeMap<u64, BlackboardValue>,
    observers: BTreeMap<u64, Vec<ObserverId>>,
    reactions: Vec<ObserverId>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.observers.clear();
        self.reactions.clear();
    }

    pub fn register<T: BlackboardType>(
        &mut self,
        key: BbKey<T>,
        initial: T,
    ) -> Result<(), BlackboardError> {
        self.register_value(key.id, initial.into_value())
    }

    /// Registers `key` with the tag of `initial`. Registering an existing key with the same tag
    /// overwrites its value without notifying observers.
    pub fn register_value(&mut self, key: u64, initial: BlackboardValue) -> Result<(), BlackboardError> {
        if let Some(existing) = self.values.get(&key) {
            if existing.tag() != initial.tag() {
                return Err(BlackboardError::TagMismatch {
                    key,
                    registered: existing.tag(),
                    requested: initial.tag(),
                });
            }
        }
        self.values.insert(key, initial);
        Ok(())
    }

    pub fn contains<T: 'static>(&self, key: BbKey<T>) -> bool {
        self.values.contains_key(&key.id)
    }

    pub fn tag_of(&self, key: u64) -> Option<BlackboardTag> {
        self.values.get(&key).map(BlackboardValue::tag)
    }

    pub fn value(&self, key: u64) -> Option<BlackboardValue> {
        self.values.get(&key).copied()
    }

    pub fn try_get<T: BlackboardType>(&self, key: BbKey<T>) -> Option<T> {
        self.values.get(&key.id).and_then(T::from_value)
    }

    /// Reads `key`, falling back to `T::default()` when the key is unregistered or holds a value
    /// of another tag.
    pub fn get<T: BlackboardType>(&self, key: BbKey<T>) -> T {
        match self.try_get(key) {
            Some(value) => value,
            None => {
                tracing::trace!(key = key.id, tag = ?T::TAG, "blackboard read fell back to default");
                T::default()
            }
        }
    }

    /// Writes `value`. Returns whether the stored value changed.
    pub fn set<T: BlackboardType>(&mut self, key: BbKey<T>, value: T) -> Result<bool, BlackboardError> {
        self.set_value(key.id, value.into_value())
    }

    pub fn set_value(&mut self, key: u64, value: BlackboardValue) -> Result<bool, BlackboardError> {
        let slot = self
            .values
            .get_mut(&key)
            .ok_or(BlackboardError::Unregistered { key })?;
        if slot.tag() != value.tag() {
            return Err(BlackboardError::TagMismatch {
                key,
                registered: slot.tag(),
                requested: value.tag(),
            });
        }
        if *slot == value {
            return Ok(false);
        }
        *slot = value;

        if let Some(observers) = self.observers.get(&key) {
            self.reactions.extend(observers.iter().copied());
        }
        Ok(true)
    }

    pub fn observe(&mut self, key: u64, observer: ObserverId) {
        let list = self.observers.entry(key).or_default();
        if !list.contains(&observer) {
            list.push(observer);
        }
    }

    /// Removes `observer` from every key and drops its queued reactions.
    pub fn unobserve(&mut self, observer: ObserverId) {
        for list in self.observers.values_mut() {
            list.retain(|o| *o != observer);
        }
        self.observers.retain(|_, list| !list.is_empty());
        self.reactions.retain(|o| *o != observer);
    }

    pub fn observers_of(&self, key: u64) -> &[ObserverId] {
        self.observers.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_reactions(&self) -> bool {
        !self.reactions.is_empty()
    }

    /// Drains queued observer notifications in ascending id order, without duplicates.
    pub fn take_reactions(&mut self) -> Vec<ObserverId> {
        let mut out = std::mem::take(&mut self.reactions);
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, BlackboardValue)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackboardInitEntry {
    pub key: u64,
    pub value: BlackboardValue,
}

/// Declarative blackboard layout used to seed a fresh blackboard on spawn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlackboardInit {
    #[serde(default)]
    pub entries: Vec<BlackboardInitEntry>,
}

impl BlackboardInit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: BlackboardType>(mut self, key: BbKey<T>, initial: T) -> Self {
        self.entries.push(BlackboardInitEntry {
            key: key.id(),
            value: initial.into_value(),
        });
        self
    }

    pub fn build(&self) -> Result<Blackboard, BlackboardError> {
        let mut blackboard = Blackboard::new();
        for entry in &self.entries {
            blackboard.register_value(entry.key, entry.value)?;
        }
        Ok(blackboard)
    }
}
