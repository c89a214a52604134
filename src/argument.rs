use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

/// A runtime handle for a Rust type: its `TypeId` plus a readable name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    pub fn of<T: ?Sized + Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check if this describes type T
    pub fn is<T: ?Sized + Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A typed descriptor for a requested result type.
///
/// `Argument` carries the metadata a plain type parameter cannot: the generic
/// parameters of a container type, a qualifier tag, and a format hint. All of it
/// is forwarded to the conversion service through a
/// [`ConversionContext`](crate::ConversionContext).
///
/// # Examples
///
/// ```
/// use sovran_values::{Argument, TypeInfo};
///
/// let ports = Argument::<Vec<u16>>::list_of()
///     .named("ports")
///     .with_qualifier("primary");
///
/// assert_eq!(ports.name(), Some("ports"));
/// assert_eq!(ports.type_parameters(), &[TypeInfo::of::<u16>()]);
/// assert_eq!(ports.qualifier(), Some("primary"));
/// ```
pub struct Argument<T: ?Sized> {
    name: Option<String>,
    type_parameters: Vec<TypeInfo>,
    qualifier: Option<String>,
    format: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ?Sized + Any> Argument<T> {
    /// Creates a descriptor for `T` with no extra metadata
    pub fn of() -> Self {
        Self {
            name: None,
            type_parameters: Vec::new(),
            qualifier: None,
            format: None,
            _marker: PhantomData,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Appends a generic type parameter
    pub fn with_type_parameter<P: ?Sized + Any>(mut self) -> Self {
        self.type_parameters.push(TypeInfo::of::<P>());
        self
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// Sets a format hint, such as a `strftime` pattern for date targets
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn type_info(&self) -> TypeInfo {
        TypeInfo::of::<T>()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn type_parameters(&self) -> &[TypeInfo] {
        &self.type_parameters
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }
}

impl<E: Any> Argument<Vec<E>> {
    /// Creates a descriptor for `Vec<E>` that records `E` as its element type
    pub fn list_of() -> Self {
        Self::of().with_type_parameter::<E>()
    }
}

impl<T: ?Sized> Clone for Argument<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            type_parameters: self.type_parameters.clone(),
            qualifier: self.qualifier.clone(),
            format: self.format.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized + Any> fmt::Debug for Argument<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Argument")
            .field("type", &std::any::type_name::<T>())
            .field("name", &self.name)
            .field("type_parameters", &self.type_parameters)
            .field("qualifier", &self.qualifier)
            .field("format", &self.format)
            .finish()
    }
}
