use crate::argument::Argument;
use crate::context::ConversionContext;
use crate::convert::{self, ConversionService, ConversionServiceExt};
use crate::error::ConversionError;
use indexmap::IndexMap;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::trace;

static EMPTY_INSTANCES: OnceLock<Mutex<HashMap<TypeId, &'static (dyn Any + Send + Sync)>>> =
    OnceLock::new();

fn cached_empty<T: Any>(
    instances: &HashMap<TypeId, &'static (dyn Any + Send + Sync)>,
) -> Option<&'static T> {
    let instance: &'static (dyn Any + Send + Sync) = *instances.get(&TypeId::of::<T>())?;
    instance.downcast_ref::<T>()
}

/// A read-only, name-keyed container of values with type-safe retrieval.
///
/// Values are stored as-is and converted on the way out by a pluggable
/// [`ConversionService`]. A lookup that finds nothing, or finds a value that
/// cannot be coerced, yields `Ok(None)`; only faults raised by the service come
/// back as `Err`.
///
/// The container exposes no insertion or removal. Entries live behind an
/// `Arc`, so clones are cheap and the map is safe to read from many threads as
/// long as `V` and the service are.
///
/// # Examples
///
/// ```
/// use sovran_values::{ConvertibleValuesMap, ConversionError};
///
/// let values = ConvertibleValuesMap::from_entries([
///     ("name", "42".to_string()),
///     ("active", "true".to_string()),
/// ]);
///
/// assert_eq!(values.get::<i32>("name")?, Some(42));
/// assert_eq!(values.get::<bool>("active")?, Some(true));
/// assert_eq!(values.get::<i32>("missing")?, None);
/// assert_eq!(values.get::<bool>("name")?, None);
/// # Ok::<(), ConversionError>(())
/// ```
pub struct ConvertibleValuesMap<V> {
    entries: Arc<IndexMap<String, V>>,
    conversion_service: Arc<dyn ConversionService>,
}

impl<V> ConvertibleValuesMap<V>
where
    V: Any + Clone + Send + Sync,
{
    /// Creates an empty map backed by the shared conversion service
    pub fn new() -> Self {
        Self::from_shared(Arc::new(IndexMap::new()))
    }

    /// Copies the given entries into a new map using the shared conversion service
    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::with_conversion_service(entries, convert::shared())
    }

    /// Copies the given entries into a new map that converts through `service`
    pub fn with_conversion_service<K, I>(entries: I, service: Arc<dyn ConversionService>) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let entries = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::from_shared_with(Arc::new(entries), service)
    }

    /// Wraps an existing map without copying it.
    ///
    /// The `Arc` keeps every holder from mutating the entries afterwards; an
    /// owner calling `Arc::make_mut` gets a private copy instead.
    pub fn from_shared(entries: Arc<IndexMap<String, V>>) -> Self {
        Self::from_shared_with(entries, convert::shared())
    }

    pub fn from_shared_with(
        entries: Arc<IndexMap<String, V>>,
        service: Arc<dyn ConversionService>,
    ) -> Self {
        Self {
            entries,
            conversion_service: service,
        }
    }

    /// Returns the process-wide empty map for this value type.
    ///
    /// Every call with the same `V` hands back the same instance.
    ///
    /// # Examples
    ///
    /// ```
    /// use sovran_values::ConvertibleValuesMap;
    ///
    /// let a = ConvertibleValuesMap::<String>::empty();
    /// let b = ConvertibleValuesMap::<String>::empty();
    /// assert!(std::ptr::eq(a, b));
    /// assert!(a.names().is_empty());
    /// ```
    pub fn empty() -> &'static Self {
        let instances = EMPTY_INSTANCES.get_or_init(Default::default);
        let mut instances = instances.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(empty) = cached_empty::<Self>(&instances) {
            return empty;
        }

        let empty: &'static Self = Box::leak(Box::new(Self::new()));
        let erased: &'static (dyn Any + Send + Sync) = empty;
        instances.insert(TypeId::of::<Self>(), erased);
        empty
    }

    /// Looks up `name` and converts its value to `T`.
    ///
    /// A stored value that already is a `T` is returned as-is; anything else
    /// goes through the conversion service.
    ///
    /// # Errors
    ///
    /// Propagates faults raised by the conversion service unchanged. A missing
    /// name or a failed conversion is `Ok(None)`, not an error.
    pub fn get<'a, T>(&self, name: impl Into<Option<&'a str>>) -> Result<Option<T>, ConversionError>
    where
        T: Any + Send + Sync,
    {
        self.lookup(name.into(), || ConversionContext::of_type::<T>())
    }

    /// Looks up `name` and converts its value as described by `argument`.
    ///
    /// The argument's name, type parameters, qualifier and format are forwarded
    /// to the conversion service. A `None` argument yields `Ok(None)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sovran_values::{Argument, ConvertibleValuesMap, ConversionError};
    ///
    /// let values = ConvertibleValuesMap::from_entries([("ports", "80, 443".to_string())]);
    /// let ports = values.get_argument("ports", &Argument::<Vec<u16>>::list_of())?;
    /// assert_eq!(ports, Some(vec![80, 443]));
    /// # Ok::<(), ConversionError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Propagates faults raised by the conversion service unchanged, such as a
    /// declared type parameter that disagrees with the target element type.
    pub fn get_argument<'a, 'b, T>(
        &self,
        name: impl Into<Option<&'a str>>,
        argument: impl Into<Option<&'b Argument<T>>>,
    ) -> Result<Option<T>, ConversionError>
    where
        T: Any + Send + Sync,
    {
        match argument.into() {
            Some(argument) => self.lookup(name.into(), || ConversionContext::of(argument)),
            None => Ok(None),
        }
    }

    /// Like [`get`](Self::get), but falls back to `default` when nothing converts
    pub fn get_or<T>(&self, name: &str, default: T) -> Result<T, ConversionError>
    where
        T: Any + Send + Sync,
    {
        Ok(self.get::<T>(name)?.unwrap_or(default))
    }

    /// Returns the stored value for `name` without any conversion
    pub fn get_raw(&self, name: &str) -> Option<&V> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns the set of all names in the map
    pub fn names(&self) -> HashSet<String> {
        self.entries.keys().cloned().collect()
    }

    /// Returns a read-only view over the stored values, in insertion order
    pub fn values(&self) -> Values<'_, V> {
        Values {
            entries: &self.entries,
        }
    }

    /// Iterates over `(name, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts every entry to `T`, skipping those that do not convert
    ///
    /// # Errors
    ///
    /// Stops at the first fault raised by the conversion service.
    pub fn as_map<T>(&self) -> Result<IndexMap<String, T>, ConversionError>
    where
        T: Any + Send + Sync,
    {
        self.convert_entries(self.iter())
    }

    /// Collects the entries nested under `prefix`, with `prefix.` stripped from their names.
    ///
    /// # Examples
    ///
    /// ```
    /// use sovran_values::{ConvertibleValuesMap, ConversionError};
    ///
    /// let values = ConvertibleValuesMap::from_entries([
    ///     ("pool.min", "1".to_string()),
    ///     ("pool.max", "8".to_string()),
    ///     ("timeout", "30".to_string()),
    /// ]);
    ///
    /// let pool = values.sub_map::<u32>("pool")?;
    /// assert_eq!(pool.get("min"), Some(&1));
    /// assert_eq!(pool.get("max"), Some(&8));
    /// assert_eq!(pool.len(), 2);
    /// # Ok::<(), ConversionError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Stops at the first fault raised by the conversion service.
    pub fn sub_map<T>(&self, prefix: &str) -> Result<IndexMap<String, T>, ConversionError>
    where
        T: Any + Send + Sync,
    {
        let prefix = format!("{}.", prefix.trim_end_matches('.'));
        self.convert_entries(
            self.iter()
                .filter_map(|(k, v)| k.strip_prefix(prefix.as_str()).map(|rest| (rest, v))),
        )
    }

    pub fn conversion_service(&self) -> &Arc<dyn ConversionService> {
        &self.conversion_service
    }

    fn lookup<T, F>(&self, name: Option<&str>, context: F) -> Result<Option<T>, ConversionError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> ConversionContext,
    {
        let Some(name) = name else {
            return Ok(None);
        };
        let Some(value) = self.entries.get(name) else {
            trace!(key = name, "no value present");
            return Ok(None);
        };
        self.convert_value(value, context)
    }

    fn convert_value<T, F>(&self, value: &V, context: F) -> Result<Option<T>, ConversionError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> ConversionContext,
    {
        if TypeId::of::<V>() == TypeId::of::<T>() {
            let value: Box<dyn Any> = Box::new(value.clone());
            return Ok(value.downcast::<T>().ok().map(|v| *v));
        }

        let context = context();
        let converted = self.conversion_service.convert_to::<T>(value, &context)?;
        if converted.is_none() {
            trace!(target_type = %context.target(), "value did not convert");
        }
        Ok(converted)
    }

    fn convert_entries<'e, T, I>(&self, entries: I) -> Result<IndexMap<String, T>, ConversionError>
    where
        T: Any + Send + Sync,
        V: 'e,
        I: Iterator<Item = (&'e str, &'e V)>,
    {
        let mut converted = IndexMap::new();
        for (name, value) in entries {
            if let Some(value) = self.convert_value(value, ConversionContext::of_type::<T>)? {
                converted.insert(name.to_owned(), value);
            }
        }
        Ok(converted)
    }
}

impl<V> Clone for ConvertibleValuesMap<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            conversion_service: Arc::clone(&self.conversion_service),
        }
    }
}

impl<V> Default for ConvertibleValuesMap<V>
where
    V: Any + Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for ConvertibleValuesMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for ConvertibleValuesMap<V>
where
    K: Into<String>,
    V: Any + Clone + Send + Sync,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

impl<V> From<HashMap<String, V>> for ConvertibleValuesMap<V>
where
    V: Any + Clone + Send + Sync,
{
    fn from(map: HashMap<String, V>) -> Self {
        Self::from_entries(map)
    }
}

impl<V> From<IndexMap<String, V>> for ConvertibleValuesMap<V>
where
    V: Any + Clone + Send + Sync,
{
    fn from(map: IndexMap<String, V>) -> Self {
        Self::from_shared(Arc::new(map))
    }
}

/// A read-only view over the values of a [`ConvertibleValuesMap`].
///
/// The view borrows the map and offers no way to change it; attempts are
/// rejected at compile time:
///
/// ```compile_fail
/// use sovran_values::ConvertibleValuesMap;
///
/// let values = ConvertibleValuesMap::from_entries([("a", 1u8)]);
/// values.values().push(2);
/// ```
pub struct Values<'a, V> {
    entries: &'a IndexMap<String, V>,
}

impl<'a, V> Values<'a, V> {
    pub fn iter(&self) -> indexmap::map::Values<'a, String, V> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.entries.values().any(|v| v == value)
    }

    /// Copies the values out into an owned vector
    pub fn to_vec(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.entries.values().cloned().collect()
    }
}

impl<V> Clone for Values<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Values<'_, V> {}

impl<V: fmt::Debug> fmt::Debug for Values<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.entries.values()).finish()
    }
}

impl<'a, V> IntoIterator for Values<'a, V> {
    type Item = &'a V;
    type IntoIter = indexmap::map::Values<'a, String, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

impl<'a, V> IntoIterator for &Values<'a, V> {
    type Item = &'a V;
    type IntoIter = indexmap::map::Values<'a, String, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}
