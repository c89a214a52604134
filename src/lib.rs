//! # sovran-values
//!
//! A read-only, name-keyed value container with pluggable type conversion.
//!
//! `sovran-values` stores values under text names and hands them back as whatever
//! type the caller asks for. The stored values stay opaque; a [`ConversionService`]
//! decides whether `"42"` can become an `i32`, or `"5s"` a `Duration`. This is
//! particularly useful for configuration and request parameters, where everything
//! arrives as text and each consumer wants its own types.
//!
//! ## Key Features
//!
//! - **Type-safe**: Lookups name their target type; the conversion happens on the way out
//! - **Quiet misses**: A missing key or an unconvertible value is `Ok(None)`, never a panic
//! - **Pluggable**: Register your own converters, or supply a whole [`ConversionService`]
//! - **Thread-safe**: Containers are immutable and cheap to clone across threads
//! - **Configuration-ready**: [`PropertySource`] flattens TOML files and environment variables
//!
//! ## Usage Examples
//!
//! ### Basic Usage
//!
//! ```rust
//! use sovran_values::{ConvertibleValuesMap, ConversionError};
//!
//! fn main() -> Result<(), ConversionError> {
//!     let params = ConvertibleValuesMap::from_entries([
//!         ("page", "3".to_string()),
//!         ("verbose", "yes".to_string()),
//!         ("tags", "rust, config".to_string()),
//!     ]);
//!
//!     let page = params.get::<u32>("page")?;
//!     let verbose = params.get_or::<bool>("verbose", false)?;
//!     let tags = params.get::<Vec<String>>("tags")?;
//!
//!     assert_eq!(page, Some(3));
//!     assert!(verbose);
//!     assert_eq!(tags, Some(vec!["rust".to_string(), "config".to_string()]));
//!
//!     // Misses are not errors
//!     assert_eq!(params.get::<u32>("limit")?, None);
//!     assert_eq!(params.get::<u32>("verbose")?, None);
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Describing the Target with an Argument
//!
//! ```rust
//! use sovran_values::{Argument, ConvertibleValuesMap, ConversionError};
//! use chrono::NaiveDate;
//!
//! fn main() -> Result<(), ConversionError> {
//!     let params = ConvertibleValuesMap::from_entries([("since", "01/02/2024".to_string())]);
//!
//!     let since = params.get_argument(
//!         "since",
//!         &Argument::<NaiveDate>::of().with_format("%d/%m/%Y"),
//!     )?;
//!     assert_eq!(since, NaiveDate::from_ymd_opt(2024, 2, 1));
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Custom Conversions
//!
//! ```rust
//! use sovran_values::{ConvertibleValuesMap, ConversionError, DefaultConversionService};
//! use std::sync::Arc;
//!
//! #[derive(Debug, PartialEq)]
//! enum Level { Low, High }
//!
//! fn main() -> Result<(), ConversionError> {
//!     let mut service = DefaultConversionService::new();
//!     service.add_converter::<String, Level, _>(|s| match s.as_str() {
//!         "low" => Some(Level::Low),
//!         "high" => Some(Level::High),
//!         _ => None,
//!     });
//!
//!     let values = ConvertibleValuesMap::with_conversion_service(
//!         [("level", "high".to_string())],
//!         Arc::new(service),
//!     );
//!     assert_eq!(values.get::<Level>("level")?, Some(Level::High));
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Error Handling
//!
//! Only faults raised by the conversion service are errors:
//!
//! ```rust
//! use sovran_values::{Argument, ConvertibleValuesMap, ConversionError};
//!
//! let values = ConvertibleValuesMap::from_entries([("ids", "1,2,3".to_string())]);
//!
//! // The declared element type disagrees with the requested Vec<u8>
//! let argument = Argument::<Vec<u8>>::of().with_type_parameter::<String>();
//! match values.get_argument("ids", &argument) {
//!     Ok(ids) => println!("ids: {:?}", ids),
//!     Err(ConversionError::TypeParameterMismatch { expected, found, .. }) => {
//!         println!("expected {} but the argument declared {}", expected, found)
//!     }
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```

mod any_value;
mod argument;
mod context;
mod convert;
mod converters;
mod error;
mod property_source;
mod values;

pub use any_value::ConvertedValue;
pub use argument::{Argument, TypeInfo};
pub use context::ConversionContext;
pub use convert::{shared, ConversionService, ConversionServiceExt, DefaultConversionService};
pub use error::{ConversionError, PropertySourceError};
pub use property_source::PropertySource;
pub use values::{ConvertibleValuesMap, Values};
