use crate::argument::{Argument, TypeInfo};
use std::any::Any;

/// Everything a converter knows about the value it is asked to produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionContext {
    target: TypeInfo,
    name: Option<String>,
    type_parameters: Vec<TypeInfo>,
    qualifier: Option<String>,
    format: Option<String>,
}

impl ConversionContext {
    /// A bare context targeting `T`
    pub fn of_type<T: ?Sized + Any>() -> Self {
        Self {
            target: TypeInfo::of::<T>(),
            name: None,
            type_parameters: Vec::new(),
            qualifier: None,
            format: None,
        }
    }

    /// A context carrying all of the argument's metadata
    pub fn of<T: ?Sized + Any>(argument: &Argument<T>) -> Self {
        Self {
            target: argument.type_info(),
            name: argument.name().map(str::to_owned),
            type_parameters: argument.type_parameters().to_vec(),
            qualifier: argument.qualifier().map(str::to_owned),
            format: argument.format().map(str::to_owned),
        }
    }

    /// Derives the context for one element of a collection target.
    ///
    /// Qualifier and format carry over; type parameters do not.
    pub fn for_element<E: ?Sized + Any>(&self) -> Self {
        Self {
            target: TypeInfo::of::<E>(),
            name: self.name.clone(),
            type_parameters: Vec::new(),
            qualifier: self.qualifier.clone(),
            format: self.format.clone(),
        }
    }

    pub fn target(&self) -> TypeInfo {
        self.target
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn type_parameters(&self) -> &[TypeInfo] {
        &self.type_parameters
    }

    pub fn type_parameter(&self, index: usize) -> Option<TypeInfo> {
        self.type_parameters.get(index).copied()
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_context_has_no_metadata() {
        let ctx = ConversionContext::of_type::<u64>();
        assert!(ctx.target().is::<u64>());
        assert!(ctx.name().is_none());
        assert!(ctx.type_parameters().is_empty());
        assert!(ctx.qualifier().is_none());
        assert!(ctx.format().is_none());
    }

    #[test]
    fn test_argument_metadata_is_forwarded() {
        let arg = Argument::<Vec<String>>::list_of()
            .named("hosts")
            .with_qualifier("replica")
            .with_format("csv");
        let ctx = ConversionContext::of(&arg);

        assert!(ctx.target().is::<Vec<String>>());
        assert_eq!(ctx.name(), Some("hosts"));
        assert_eq!(ctx.type_parameter(0), Some(TypeInfo::of::<String>()));
        assert_eq!(ctx.type_parameter(1), None);
        assert_eq!(ctx.qualifier(), Some("replica"));
        assert_eq!(ctx.format(), Some("csv"));
    }

    #[test]
    fn test_element_context() {
        let arg = Argument::<Vec<chrono::NaiveDate>>::list_of().with_format("%d/%m/%Y");
        let element = ConversionContext::of(&arg).for_element::<chrono::NaiveDate>();

        assert!(element.target().is::<chrono::NaiveDate>());
        assert!(element.type_parameters().is_empty());
        assert_eq!(element.format(), Some("%d/%m/%Y"));
    }
}
