use crate::argument::TypeInfo;
use std::any::Any;
use std::fmt;

/// A type-erased conversion result that remembers what it holds
pub struct ConvertedValue {
    type_info: TypeInfo,
    value: Box<dyn Any + Send + Sync>,
}

impl ConvertedValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            value: Box::new(value),
        }
    }

    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    /// Check if the contained value is of type T
    pub fn is_type<T: Any>(&self) -> bool {
        self.type_info.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Unwraps the value as T, handing the container back on a type mismatch
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        let type_info = self.type_info;
        match self.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Self { type_info, value }),
        }
    }
}

impl fmt::Debug for ConvertedValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ConvertedValue")
            .field("type", &self.type_info.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downcast_matching_type() {
        let value = ConvertedValue::new(42u16);
        assert!(value.is_type::<u16>());
        assert_eq!(value.downcast_ref::<u16>(), Some(&42));
        assert_eq!(value.downcast::<u16>().ok(), Some(42));
    }

    #[test]
    fn test_downcast_mismatch_returns_original() {
        let value = ConvertedValue::new("text".to_string());
        let back = match value.downcast::<i32>() {
            Ok(_) => panic!("Should not downcast a String to i32"),
            Err(back) => back,
        };
        assert!(back.type_info().is::<String>());
        assert_eq!(back.downcast::<String>().ok().as_deref(), Some("text"));
    }
}
