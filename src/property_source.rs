use crate::error::PropertySourceError;
use crate::values::ConvertibleValuesMap;
use indexmap::IndexMap;
use std::path::Path;
use toml_edit::{Array, DocumentMut, Item, Table, Value};
use tracing::debug;

/// A named set of flattened configuration properties.
///
/// Every property is kept as text under a dotted name, so a nested TOML table
/// such as `[cassandra.default]` with `port = 9042` becomes the single entry
/// `cassandra.default.port = "9042"`. Typed access goes through
/// [`ConvertibleValuesMap`], which converts the text on lookup.
///
/// An array of scalars is stored comma-joined under its own name. If any
/// element is a nested array or table, or contains a comma, each element is
/// stored under an indexed name instead (`hosts[0]`, `servers[1].port`).
///
/// # Examples
///
/// ```
/// use sovran_values::PropertySource;
/// use std::time::Duration;
///
/// let source = PropertySource::from_toml_str("app", r#"
///     [cassandra.default]
///     contact-points = ["10.0.0.1", "10.0.0.2"]
///     port = 9042
///     connect-timeout = "5s"
/// "#)?;
///
/// let values = source.into_values();
/// assert_eq!(values.get::<u16>("cassandra.default.port")?, Some(9042));
/// assert_eq!(
///     values.get::<Vec<String>>("cassandra.default.contact-points")?,
///     Some(vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()])
/// );
/// assert_eq!(
///     values.get::<Duration>("cassandra.default.connect-timeout")?,
///     Some(Duration::from_secs(5))
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySource {
    name: String,
    properties: IndexMap<String, String>,
}

impl PropertySource {
    /// Creates a source from already flattened properties
    pub fn new<K, V, I>(name: impl Into<String>, properties: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            name: name.into(),
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parses TOML text and flattens it into dotted properties
    ///
    /// # Errors
    ///
    /// Returns `PropertySourceError::Parse` if the text is not valid TOML.
    pub fn from_toml_str(name: impl Into<String>, text: &str) -> Result<Self, PropertySourceError> {
        let name = name.into();
        let document = text
            .parse::<DocumentMut>()
            .map_err(|source| PropertySourceError::Parse {
                name: name.clone(),
                source,
            })?;

        let mut properties = IndexMap::new();
        flatten_table(document.as_table(), "", &mut properties);
        debug!(source = %name, count = properties.len(), "loaded TOML property source");
        Ok(Self { name, properties })
    }

    /// Reads and parses a TOML file, naming the source after its path
    ///
    /// # Errors
    ///
    /// Returns `PropertySourceError::Io` if the file cannot be read, or
    /// `PropertySourceError::Parse` if it is not valid TOML.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, PropertySourceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PropertySourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(path.display().to_string(), &text)
    }

    /// Builds a source from environment-style variables.
    ///
    /// Only variables named `PREFIX_...` are kept. The prefix is stripped, the
    /// rest lowercased, and underscores become dots, so `APP_DB_PORT=5432`
    /// with prefix `APP` becomes `db.port = "5432"`.
    ///
    /// A double underscore becomes a hyphen, which reaches hyphenated keys:
    /// `APP_CASSANDRA_DEFAULT_CONTACT__POINTS` sets
    /// `cassandra.default.contact-points`. Keys containing a literal
    /// underscore cannot be set this way.
    pub fn from_env_vars<K, V, I>(prefix: &str, vars: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let prefix = format!("{}_", prefix.trim_end_matches('_'));
        let properties: IndexMap<String, String> = vars
            .into_iter()
            .filter_map(|(key, value)| {
                let rest = key.as_ref().strip_prefix(prefix.as_str())?;
                if rest.is_empty() {
                    return None;
                }
                Some((env_key(rest), value.into()))
            })
            .collect();
        debug!(%prefix, count = properties.len(), "loaded environment property source");

        Self {
            name: format!("env:{}", prefix.trim_end_matches('_')),
            properties,
        }
    }

    /// Builds a source from the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_env(prefix: &str) -> Self {
        let vars = std::env::vars_os().filter_map(|(key, value)| {
            let key = key.into_string().ok()?;
            let value = value.into_string().ok()?;
            Some((key, value))
        });
        Self::from_env_vars(prefix, vars)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Layers `other` on top of this source.
    ///
    /// Properties present in both take the value from `other`; new properties
    /// are appended after the existing ones.
    pub fn merge(mut self, other: PropertySource) -> Self {
        self.properties.extend(other.properties);
        self
    }

    /// Returns a typed view over a copy of the properties
    pub fn to_values(&self) -> ConvertibleValuesMap<String> {
        ConvertibleValuesMap::from(self.properties.clone())
    }

    pub fn into_values(self) -> ConvertibleValuesMap<String> {
        ConvertibleValuesMap::from(self.properties)
    }
}

fn env_key(name: &str) -> String {
    name.to_ascii_lowercase()
        .split("__")
        .map(|part| part.replace('_', "."))
        .collect::<Vec<_>>()
        .join("-")
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn flatten_table(table: &Table, prefix: &str, out: &mut IndexMap<String, String>) {
    for (key, item) in table.iter() {
        flatten_item(item, &join(prefix, key), out);
    }
}

fn flatten_item(item: &Item, path: &str, out: &mut IndexMap<String, String>) {
    match item {
        Item::None => {}
        Item::Value(value) => flatten_value(value, path, out),
        Item::Table(table) => flatten_table(table, path, out),
        Item::ArrayOfTables(tables) => {
            for (i, table) in tables.iter().enumerate() {
                flatten_table(table, &format!("{}[{}]", path, i), out);
            }
        }
    }
}

fn flatten_value(value: &Value, path: &str, out: &mut IndexMap<String, String>) {
    match value {
        Value::InlineTable(table) => {
            for (key, value) in table.iter() {
                flatten_value(value, &join(path, key), out);
            }
        }
        Value::Array(array) => match joinable_items(array) {
            Some(items) => {
                out.insert(path.to_owned(), items.join(","));
            }
            None => {
                for (i, value) in array.iter().enumerate() {
                    flatten_value(value, &format!("{}[{}]", path, i), out);
                }
            }
        },
        scalar => {
            if let Some(text) = scalar_text(scalar) {
                out.insert(path.to_owned(), text);
            }
        }
    }
}

/// Scalar texts of an array that survive a comma join, or `None` when any
/// element is nested or itself contains a comma.
fn joinable_items(array: &Array) -> Option<Vec<String>> {
    array
        .iter()
        .map(|value| scalar_text(value).filter(|text| !text.contains(',')))
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.value().clone()),
        Value::Integer(i) => Some(i.value().to_string()),
        Value::Float(f) => Some(f.value().to_string()),
        Value::Boolean(b) => Some(b.value().to_string()),
        Value::Datetime(d) => Some(d.value().to_string()),
        Value::Array(_) | Value::InlineTable(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flattens_nested_tables() -> Result<(), PropertySourceError> {
        let source = PropertySource::from_toml_str(
            "test",
            r#"
            name = "svc"

            [db]
            host = "localhost"
            port = 5432

            [db.pool]
            max = 8
            "#,
        )?;

        assert_eq!(source.name(), "test");
        assert_eq!(source.get("name"), Some("svc"));
        assert_eq!(source.get("db.host"), Some("localhost"));
        assert_eq!(source.get("db.port"), Some("5432"));
        assert_eq!(source.get("db.pool.max"), Some("8"));
        assert_eq!(source.len(), 4);
        Ok(())
    }

    #[test]
    fn test_inline_tables_and_arrays() -> Result<(), PropertySourceError> {
        let source = PropertySource::from_toml_str(
            "test",
            r#"
            limits = { cpu = 2, memory = "512MB" }
            ports = [80, 443]
            flags = [true, false]
            "#,
        )?;

        assert_eq!(source.get("limits.cpu"), Some("2"));
        assert_eq!(source.get("limits.memory"), Some("512MB"));
        assert_eq!(source.get("ports"), Some("80,443"));
        assert_eq!(source.get("flags"), Some("true,false"));
        Ok(())
    }

    #[test]
    fn test_arrays_that_cannot_be_joined_use_indexed_keys() -> Result<(), PropertySourceError> {
        let source = PropertySource::from_toml_str(
            "test",
            r#"
            hosts = ["a,b", "c"]
            nested = [[1, 2], [3]]
            servers = [{ host = "a", port = 1 }, { host = "b" }]
            "#,
        )?;

        assert_eq!(source.get("hosts"), None);
        assert_eq!(source.get("hosts[0]"), Some("a,b"));
        assert_eq!(source.get("hosts[1]"), Some("c"));

        assert_eq!(source.get("nested"), None);
        assert_eq!(source.get("nested[0]"), Some("1,2"));
        assert_eq!(source.get("nested[1]"), Some("3"));

        assert_eq!(source.get("servers[0].host"), Some("a"));
        assert_eq!(source.get("servers[0].port"), Some("1"));
        assert_eq!(source.get("servers[1].host"), Some("b"));
        assert_eq!(source.len(), 7);

        let values = source.into_values();
        assert_eq!(values.get::<String>("hosts[0]").unwrap(), Some("a,b".to_string()));
        assert_eq!(values.get::<Vec<String>>("hosts").unwrap(), None);
        assert_eq!(values.get::<Vec<i32>>("nested[0]").unwrap(), Some(vec![1, 2]));
        Ok(())
    }

    #[test]
    fn test_array_of_tables() -> Result<(), PropertySourceError> {
        let source = PropertySource::from_toml_str(
            "test",
            r#"
            [[replicas]]
            host = "a"

            [[replicas]]
            host = "b"
            "#,
        )?;

        assert_eq!(source.get("replicas[0].host"), Some("a"));
        assert_eq!(source.get("replicas[1].host"), Some("b"));
        Ok(())
    }

    #[test]
    fn test_parse_error() {
        match PropertySource::from_toml_str("broken", "this is = = not toml") {
            Err(PropertySourceError::Parse { name, .. }) => assert_eq!(name, "broken"),
            other => panic!("Should have failed to parse, got {:?}", other),
        }
    }

    #[test]
    fn test_env_vars() {
        let source = PropertySource::from_env_vars(
            "APP",
            [
                ("APP_DB_PORT", "5432"),
                ("APP_NAME", "svc"),
                ("APP_", "ignored"),
                ("OTHER_DB_PORT", "1"),
            ],
        );

        assert_eq!(source.name(), "env:APP");
        assert_eq!(source.get("db.port"), Some("5432"));
        assert_eq!(source.get("name"), Some("svc"));
        assert_eq!(source.len(), 2);
    }

    #[test]
    fn test_env_double_underscore_is_a_hyphen() {
        let source = PropertySource::from_env_vars(
            "APP",
            [
                ("APP_CASSANDRA_DEFAULT_CONTACT__POINTS", "10.0.0.9"),
                ("APP_CASSANDRA_DEFAULT_CONNECT__TIMEOUT", "1s"),
                ("APP_CASSANDRA_DEFAULT_PORT", "9999"),
            ],
        );

        assert_eq!(source.get("cassandra.default.contact-points"), Some("10.0.0.9"));
        assert_eq!(source.get("cassandra.default.connect-timeout"), Some("1s"));
        assert_eq!(source.get("cassandra.default.port"), Some("9999"));
        assert_eq!(source.len(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_from_env_skips_non_utf8_variables() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        std::env::set_var("SOVRAN_OTHER_UNRELATED", OsString::from_vec(vec![0xff, 0xfe]));
        std::env::set_var("SOVRAN_UNIT_BROKEN", OsString::from_vec(vec![b'a', 0xff]));
        std::env::set_var("SOVRAN_UNIT_DB_PORT", "5432");

        let source = PropertySource::from_env("SOVRAN_UNIT");

        std::env::remove_var("SOVRAN_OTHER_UNRELATED");
        std::env::remove_var("SOVRAN_UNIT_BROKEN");
        std::env::remove_var("SOVRAN_UNIT_DB_PORT");

        assert_eq!(source.name(), "env:SOVRAN_UNIT");
        assert_eq!(source.get("db.port"), Some("5432"));
        assert_eq!(source.get("broken"), None);
        assert_eq!(source.len(), 1);
    }

    #[test]
    fn test_merge_overrides() {
        let base = PropertySource::new("base", [("a", "1"), ("b", "2")]);
        let overrides = PropertySource::new("overrides", [("b", "3"), ("c", "4")]);
        let merged = base.merge(overrides);

        assert_eq!(merged.name(), "base");
        assert_eq!(merged.get("a"), Some("1"));
        assert_eq!(merged.get("b"), Some("3"));
        assert_eq!(merged.get("c"), Some("4"));
        let names: Vec<_> = merged.to_values().iter().map(|(k, _)| k.to_owned()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
