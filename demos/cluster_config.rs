//! Demonstrates building database cluster settings from layered configuration.
//!
//! Each `[cassandra.<name>]` table describes one cluster. Settings are read with
//! typed lookups, and environment variables prefixed `APP_` override the file.
//! Underscores in a variable name become dots and a double underscore becomes a
//! hyphen, so `APP_CASSANDRA_DEFAULT_CONTACT__POINTS` overrides
//! `cassandra.default.contact-points`.
//!
//! Run with: cargo run --example cluster_config
//! Try:      APP_CASSANDRA_DEFAULT_PORT=9999 RUST_LOG=trace cargo run --example cluster_config
//!           APP_CASSANDRA_DEFAULT_CONTACT__POINTS=10.9.0.1,10.9.0.2 cargo run --example cluster_config

use sovran_values::{Argument, ConvertibleValuesMap, PropertySource};
use std::collections::BTreeSet;
use std::error::Error;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
[cassandra.default]
contact-points = ["10.0.0.1", "10.0.0.2"]
port = 9042
keyspace = "events"
connect-timeout = "5s"
compression = "yes"

[cassandra.reporting]
contact-points = ["10.2.0.1"]
keyspace = "reports"
"#;

#[derive(Debug)]
struct ClusterSettings {
    name: String,
    contact_points: Vec<String>,
    port: u16,
    keyspace: Option<String>,
    connect_timeout: Duration,
    compression: bool,
}

impl ClusterSettings {
    fn from_values(
        name: &str,
        values: &ConvertibleValuesMap<String>,
    ) -> Result<Self, Box<dyn Error>> {
        let key = |field: &str| format!("cassandra.{}.{}", name, field);

        let contact_points = values
            .get_argument(
                key("contact-points").as_str(),
                &Argument::<Vec<String>>::list_of().named("contact-points"),
            )?
            .ok_or_else(|| format!("cluster `{}` has no contact points", name))?;

        Ok(Self {
            name: name.to_string(),
            contact_points,
            port: values.get_or(&key("port"), 9042u16)?,
            keyspace: values.get(key("keyspace").as_str())?,
            connect_timeout: values.get_or(&key("connect-timeout"), Duration::from_secs(10))?,
            compression: values.get_or(&key("compression"), false)?,
        })
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let file = PropertySource::from_toml_str("cluster.toml", CONFIG)?;
    let env = PropertySource::from_env("APP");
    println!(
        "Loaded {} properties from {} and {} from {}",
        file.len(),
        file.name(),
        env.len(),
        env.name()
    );

    let values = file.merge(env).into_values();

    let clusters: BTreeSet<String> = values
        .names()
        .iter()
        .filter_map(|name| name.strip_prefix("cassandra."))
        .filter_map(|rest| rest.split('.').next())
        .map(str::to_string)
        .collect();

    for name in &clusters {
        let settings = ClusterSettings::from_values(name, &values)?;
        println!("\nCluster {}:", settings.name);
        println!("  Contact points: {}", settings.contact_points.join(", "));
        println!("  Port: {}", settings.port);
        println!(
            "  Keyspace: {}",
            settings.keyspace.as_deref().unwrap_or("<none>")
        );
        println!("  Connect timeout: {:?}", settings.connect_timeout);
        println!("  Compression: {}", settings.compression);
    }

    Ok(())
}
