use crate::any_value::ConvertedValue;
use crate::argument::TypeInfo;
use crate::context::ConversionContext;
use crate::converters;
use crate::error::ConversionError;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace};

/// A pluggable strategy that coerces stored values into requested types.
///
/// Implementations report an ordinary mismatch as `Ok(None)` and reserve `Err`
/// for malformed requests. A service must be safe to call from many threads at
/// once; containers share one service behind an `Arc`.
pub trait ConversionService: Send + Sync {
    /// Attempts to convert `value` into the type named by `context.target()`
    fn convert(
        &self,
        value: &dyn Any,
        context: &ConversionContext,
    ) -> Result<Option<ConvertedValue>, ConversionError>;

    /// Returns true if a conversion from `source` to `target` is known
    fn can_convert(&self, source: TypeInfo, target: TypeInfo) -> bool;
}

/// Typed helpers available on every [`ConversionService`], including trait objects
pub trait ConversionServiceExt: ConversionService {
    /// Converts `value` into `T` using `context`.
    ///
    /// # Errors
    ///
    /// Propagates any fault raised by the service. Returns
    /// `ConversionError::UnexpectedResult` if the service hands back a value of
    /// some other type.
    fn convert_to<T: Any + Send + Sync>(
        &self,
        value: &dyn Any,
        context: &ConversionContext,
    ) -> Result<Option<T>, ConversionError> {
        match self.convert(value, context)? {
            Some(converted) => converted.downcast::<T>().map(Some).map_err(|other| {
                ConversionError::UnexpectedResult {
                    target: std::any::type_name::<T>(),
                    produced: other.type_info().name(),
                }
            }),
            None => Ok(None),
        }
    }
}

impl<S: ConversionService + ?Sized> ConversionServiceExt for S {}

type Converter = Box<
    dyn Fn(
            &dyn Any,
            &ConversionContext,
            &DefaultConversionService,
        ) -> Result<Option<ConvertedValue>, ConversionError>
        + Send
        + Sync,
>;

struct Registration {
    source: TypeInfo,
    target: TypeInfo,
    converter: Converter,
}

/// A registry-backed [`ConversionService`].
///
/// Converters are keyed by their `(source, target)` type pair. Registration
/// happens up front through `&mut self`; once the service is shared behind an
/// `Arc` it is read-only.
///
/// # Examples
///
/// ```
/// use sovran_values::{ConversionContext, ConversionServiceExt, DefaultConversionService};
///
/// #[derive(Debug, PartialEq)]
/// struct Port(u16);
///
/// let mut service = DefaultConversionService::new();
/// service.add_converter::<String, Port, _>(|s| s.parse().ok().map(Port));
///
/// let port = service.convert_to::<Port>(&"8080".to_string(), &ConversionContext::of_type::<Port>())?;
/// assert_eq!(port, Some(Port(8080)));
///
/// let port = service.convert_to::<Port>(&"http".to_string(), &ConversionContext::of_type::<Port>())?;
/// assert_eq!(port, None);
/// # Ok::<(), sovran_values::ConversionError>(())
/// ```
pub struct DefaultConversionService {
    converters: HashMap<(TypeId, TypeId), Registration>,
}

impl DefaultConversionService {
    /// Creates a service with the standard text, numeric and date converters
    pub fn new() -> Self {
        let mut service = Self::bare();
        converters::register_defaults(&mut service);
        service
    }

    /// Creates a service with no converters registered
    pub fn bare() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Registers a simple conversion from `S` to `T`.
    ///
    /// Returning `None` from `f` signals that the value cannot be converted.
    pub fn add_converter<S, T, F>(&mut self, f: F) -> &mut Self
    where
        S: Any,
        T: Any + Send + Sync,
        F: Fn(&S) -> Option<T> + Send + Sync + 'static,
    {
        self.add_type_converter::<S, T, _>(move |source, _| Ok(f(source)))
    }

    /// Registers a context-aware conversion from `S` to `T` that may raise faults
    pub fn add_type_converter<S, T, F>(&mut self, f: F) -> &mut Self
    where
        S: Any,
        T: Any + Send + Sync,
        F: Fn(&S, &ConversionContext) -> Result<Option<T>, ConversionError>
            + Send
            + Sync
            + 'static,
    {
        self.register::<S, T>(Box::new(move |value, context, _| {
            match value.downcast_ref::<S>() {
                Some(source) => Ok(f(source, context)?.map(ConvertedValue::new)),
                None => Ok(None),
            }
        }))
    }

    /// Registers a conversion from comma-separated text to `Vec<E>`.
    ///
    /// Each piece is trimmed and converted to `E` through this same service, so
    /// a `String -> E` converter must also be registered. An empty string is an
    /// empty list; a single failing element fails the whole conversion.
    pub fn add_collection_converter<S, E>(&mut self) -> &mut Self
    where
        S: Any + AsRef<str>,
        E: Any + Send + Sync,
    {
        self.register::<S, Vec<E>>(Box::new(|value, context, service| {
            let Some(text) = value.downcast_ref::<S>() else {
                return Ok(None);
            };
            if let Some(declared) = context.type_parameter(0) {
                if !declared.is::<E>() {
                    return Err(ConversionError::TypeParameterMismatch {
                        target: context.target().name(),
                        expected: std::any::type_name::<E>(),
                        found: declared.name(),
                    });
                }
            }

            let text = text.as_ref().trim();
            if text.is_empty() {
                return Ok(Some(ConvertedValue::new(Vec::<E>::new())));
            }

            let element_context = context.for_element::<E>();
            let mut elements = Vec::new();
            for piece in text.split(',') {
                let piece = piece.trim().to_owned();
                match service.convert_to::<E>(&piece, &element_context)? {
                    Some(element) => elements.push(element),
                    None => {
                        trace!(element = %piece, target_type = %context.target(), "collection element did not convert");
                        return Ok(None);
                    }
                }
            }
            Ok(Some(ConvertedValue::new(elements)))
        }))
    }

    /// Returns the number of registered converters
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    fn register<S: Any, T: Any>(&mut self, converter: Converter) -> &mut Self {
        let source = TypeInfo::of::<S>();
        let target = TypeInfo::of::<T>();
        debug!(source_type = %source, target_type = %target, "registering converter");
        self.converters.insert(
            (source.id(), target.id()),
            Registration {
                source,
                target,
                converter,
            },
        );
        self
    }
}

impl ConversionService for DefaultConversionService {
    fn convert(
        &self,
        value: &dyn Any,
        context: &ConversionContext,
    ) -> Result<Option<ConvertedValue>, ConversionError> {
        let key = (Any::type_id(value), context.target().id());
        match self.converters.get(&key) {
            Some(registration) => (registration.converter)(value, context, self),
            None => {
                trace!(target_type = %context.target(), "no converter registered");
                Ok(None)
            }
        }
    }

    fn can_convert(&self, source: TypeInfo, target: TypeInfo) -> bool {
        source == target || self.converters.contains_key(&(source.id(), target.id()))
    }
}

impl Default for DefaultConversionService {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DefaultConversionService {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut pairs: Vec<_> = self
            .converters
            .values()
            .map(|r| format!("{} -> {}", r.source, r.target))
            .collect();
        pairs.sort();
        f.debug_struct("DefaultConversionService")
            .field("converters", &pairs)
            .finish()
    }
}

static SHARED: OnceLock<Arc<dyn ConversionService>> = OnceLock::new();

/// Returns the process-wide conversion service.
///
/// It is a [`DefaultConversionService::new`] built on first use and reused by
/// every container that was not given a service of its own.
pub fn shared() -> Arc<dyn ConversionService> {
    let service = SHARED.get_or_init(|| {
        let service: Arc<dyn ConversionService> = Arc::new(DefaultConversionService::new());
        service
    });
    Arc::clone(service)
}
