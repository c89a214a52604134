use sovran_values::{Argument, PropertySource, PropertySourceError};
use std::path::PathBuf;
use std::time::Duration;

const CLUSTER_TOML: &str = r#"
[cassandra.default]
cluster-name = "analytics"
contact-points = ["10.0.0.1", "10.0.0.2", "10.0.0.3"]
port = 9042
ssl = "on"
connect-timeout = "5s"

[cassandra.default.pool]
core-connections = 2
max-connections = 8

[cassandra.archive]
contact-points = ["10.1.0.1"]
port = 9142
"#;

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("sovran-values-{}-{}", std::process::id(), name));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_typed_cluster_settings() -> Result<(), Box<dyn std::error::Error>> {
    let values = PropertySource::from_toml_str("cluster", CLUSTER_TOML)?.into_values();

    assert_eq!(
        values.get::<String>("cassandra.default.cluster-name")?.as_deref(),
        Some("analytics")
    );
    assert_eq!(values.get::<u16>("cassandra.default.port")?, Some(9042));
    assert_eq!(values.get::<bool>("cassandra.default.ssl")?, Some(true));
    assert_eq!(
        values.get::<Duration>("cassandra.default.connect-timeout")?,
        Some(Duration::from_secs(5))
    );

    let contact_points = values.get_argument(
        "cassandra.default.contact-points",
        &Argument::<Vec<String>>::list_of(),
    )?;
    assert_eq!(contact_points.map(|points| points.len()), Some(3));

    let pool = values.sub_map::<u32>("cassandra.default.pool")?;
    assert_eq!(pool.get("core-connections"), Some(&2));
    assert_eq!(pool.get("max-connections"), Some(&8));
    Ok(())
}

#[test]
fn test_each_cluster_has_its_own_prefix() -> Result<(), Box<dyn std::error::Error>> {
    let values = PropertySource::from_toml_str("cluster", CLUSTER_TOML)?.into_values();

    let mut clusters: Vec<String> = values
        .names()
        .into_iter()
        .filter_map(|name| {
            name.strip_prefix("cassandra.")
                .and_then(|rest| rest.split('.').next())
                .map(str::to_owned)
        })
        .collect();
    clusters.sort();
    clusters.dedup();
    assert_eq!(clusters, vec!["archive", "default"]);

    assert_eq!(values.get::<u16>("cassandra.archive.port")?, Some(9142));
    Ok(())
}

#[test]
fn test_env_overrides_file() -> Result<(), Box<dyn std::error::Error>> {
    let file = PropertySource::from_toml_str("cluster", CLUSTER_TOML)?;
    let env = PropertySource::from_env_vars(
        "APP",
        [("APP_CASSANDRA_ARCHIVE_PORT", "9999"), ("HOME", "/root")],
    );

    let values = file.merge(env).into_values();
    assert_eq!(values.get::<u16>("cassandra.archive.port")?, Some(9999));
    assert_eq!(values.get::<u16>("cassandra.default.port")?, Some(9042));
    assert!(!values.contains("home"));
    Ok(())
}

#[test]
fn test_process_environment_overrides_file() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var("SOVRAN_IT_CASSANDRA_DEFAULT_PORT", "9043");
    std::env::set_var("SOVRAN_IT_CASSANDRA_DEFAULT_CONTACT__POINTS", "10.9.0.1, 10.9.0.2");
    let env = PropertySource::from_env("SOVRAN_IT");
    std::env::remove_var("SOVRAN_IT_CASSANDRA_DEFAULT_PORT");
    std::env::remove_var("SOVRAN_IT_CASSANDRA_DEFAULT_CONTACT__POINTS");

    assert_eq!(env.name(), "env:SOVRAN_IT");
    assert_eq!(env.len(), 2);

    let file = PropertySource::from_toml_str("cluster", CLUSTER_TOML)?;
    let values = file.merge(env).into_values();
    assert_eq!(values.get::<u16>("cassandra.default.port")?, Some(9043));
    assert_eq!(
        values.get_argument(
            "cassandra.default.contact-points",
            &Argument::<Vec<String>>::list_of()
        )?,
        Some(vec!["10.9.0.1".to_string(), "10.9.0.2".to_string()])
    );
    assert_eq!(values.get::<u16>("cassandra.archive.port")?, Some(9142));
    Ok(())
}

#[test]
fn test_load_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let path = temp_file("cluster.toml", CLUSTER_TOML);
    let source = PropertySource::from_toml_file(&path)?;
    std::fs::remove_file(&path)?;

    assert_eq!(source.name(), path.display().to_string());
    assert_eq!(source.get("cassandra.default.port"), Some("9042"));
    assert_eq!(source.to_values().len(), source.len());
    Ok(())
}

#[test]
fn test_missing_file() {
    let path = std::env::temp_dir().join("sovran-values-does-not-exist.toml");
    match PropertySource::from_toml_file(&path) {
        Err(PropertySourceError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("Should have failed with an IO error, got {:?}", other),
    }
}

#[test]
fn test_error_display() {
    let error = PropertySource::from_toml_str("bad", "[unclosed").unwrap_err();
    assert!(error.to_string().starts_with("failed to parse property source `bad`"));
    assert!(std::error::Error::source(&error).is_some());
}
