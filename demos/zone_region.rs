//! Demonstrates registering custom converters for domain types.
//!
//! Compute instance metadata reports availability zones such as `us-east1-b`.
//! The region is the zone without its trailing `-<letter>` suffix, so a
//! `Region` can be derived from either a zone or an explicit region value.
//!
//! Run with: cargo run --example zone_region

use sovran_values::{
    Argument, ConversionError, ConvertibleValuesMap, DefaultConversionService,
};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
struct Zone(String);

#[derive(Debug, Clone, PartialEq)]
struct Region(String);

impl Zone {
    fn region(&self) -> Option<Region> {
        let cut = self.0.len().checked_sub(2)?;
        let region = self.0.get(..cut)?;
        let mut suffix = self.0.get(cut..)?.chars();
        match (suffix.next(), suffix.next()) {
            (Some('-'), Some(c)) if c.is_ascii_lowercase() => Some(Region(region.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn metadata_service() -> DefaultConversionService {
    let mut service = DefaultConversionService::new();
    service
        .add_converter::<String, Zone, _>(|s| {
            let zone = Zone(s.clone());
            zone.region().map(|_| zone)
        })
        .add_type_converter::<String, Region, _>(|s, ctx| match ctx.qualifier() {
            // Values qualified as zones are reduced to their region
            Some("zone") => Ok(Zone(s.clone()).region()),
            Some(other) => Err(ConversionError::custom(
                "Region",
                format!("unknown qualifier `{}`", other),
            )),
            None => Ok(Some(Region(s.clone()))),
        })
        .add_collection_converter::<String, Zone>();
    service
}

fn main() -> Result<(), ConversionError> {
    let metadata = ConvertibleValuesMap::with_conversion_service(
        [
            ("availability-zone", "us-east1-b".to_string()),
            ("region", "europe-west4".to_string()),
            ("replica-zones", "us-east1-c, us-central1-a".to_string()),
            ("machine-type", "n2-standard-4".to_string()),
        ],
        Arc::new(metadata_service()),
    );

    let zone = metadata.get::<Zone>("availability-zone")?;
    println!("Zone: {:?}", zone);

    let region = metadata.get_argument(
        "availability-zone",
        &Argument::<Region>::of().with_qualifier("zone"),
    )?;
    println!("Region from zone: {}", region.map(|r| r.to_string()).unwrap_or_default());

    let explicit = metadata.get::<Region>("region")?;
    println!("Explicit region: {:?}", explicit);

    let replicas = metadata.get_argument("replica-zones", &Argument::<Vec<Zone>>::list_of())?;
    for zone in replicas.unwrap_or_default() {
        println!("Replica zone {} in region {:?}", zone.0, zone.region());
    }

    // Not a zone, so the lookup quietly misses
    println!("Machine type as zone: {:?}", metadata.get::<Zone>("machine-type")?);

    // An unknown qualifier is a fault raised by the converter
    match metadata.get_argument("region", &Argument::<Region>::of().with_qualifier("city")) {
        Ok(region) => println!("Unexpected region: {:?}", region),
        Err(e) => println!("Error: {}", e),
    }

    Ok(())
}
