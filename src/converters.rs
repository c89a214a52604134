use crate::context::ConversionContext;
use crate::convert::DefaultConversionService;
use crate::error::ConversionError;
use chrono::format::ParseErrorKind;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use std::any::Any;
use std::time::Duration;

pub(crate) fn register_defaults(service: &mut DefaultConversionService) {
    register_text_source::<String>(service);
    register_text_source::<&'static str>(service);
    register_to_text(service);
    register_integer_conversions(service);
}

fn register_text_source<S>(service: &mut DefaultConversionService)
where
    S: Any + AsRef<str>,
{
    macro_rules! parse_scalars {
        ($($t:ty),*) => {
            $(
                service.add_converter::<S, $t, _>(|s| s.as_ref().parse::<$t>().ok());
                service.add_collection_converter::<S, $t>();
            )*
        };
    }

    parse_scalars!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

    service
        .add_converter::<S, String, _>(|s| Some(s.as_ref().to_owned()))
        .add_converter::<S, bool, _>(|s| parse_bool(s.as_ref()))
        .add_converter::<S, char, _>(|s| parse_char(s.as_ref()))
        .add_converter::<S, Duration, _>(|s| parse_duration(s.as_ref()))
        .add_type_converter::<S, NaiveDate, _>(|s, ctx| parse_date(s.as_ref(), ctx))
        .add_type_converter::<S, NaiveDateTime, _>(|s, ctx| parse_date_time(s.as_ref(), ctx))
        .add_type_converter::<S, DateTime<FixedOffset>, _>(|s, ctx| {
            parse_offset_date_time(s.as_ref(), ctx)
        })
        .add_collection_converter::<S, String>()
        .add_collection_converter::<S, bool>()
        .add_collection_converter::<S, char>()
        .add_collection_converter::<S, Duration>()
        .add_collection_converter::<S, NaiveDate>()
        .add_collection_converter::<S, NaiveDateTime>()
        .add_collection_converter::<S, DateTime<FixedOffset>>();
}

fn register_to_text(service: &mut DefaultConversionService) {
    macro_rules! to_text {
        ($($t:ty),*) => {
            $( service.add_converter::<$t, String, _>(|v| Some(v.to_string())); )*
        };
    }

    to_text!(
        i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char
    );
}

fn register_integer_conversions(service: &mut DefaultConversionService) {
    macro_rules! integer_conversions {
        ($($from:ty),*) => {
            $( integer_conversions!(@from $from; i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize); )*
        };
        (@from $from:ty; $($to:ty),*) => {
            $( service.add_converter::<$from, $to, _>(|v| <$to>::try_from(*v).ok()); )*
        };
    }

    integer_conversions!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
}

/// Accepts the usual switch spellings, case-insensitively
fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "on" => Some(true),
        "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Parses `<integer><unit>` where unit is one of ns, us, ms, s, m, h, d
fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    let split = text.find(|c: char| !c.is_ascii_digit())?;
    let (amount, unit) = text.split_at(split);
    let amount: u64 = amount.parse().ok()?;

    match unit {
        "ns" => Some(Duration::from_nanos(amount)),
        "us" => Some(Duration::from_micros(amount)),
        "ms" => Some(Duration::from_millis(amount)),
        "s" => Some(Duration::from_secs(amount)),
        "m" => amount.checked_mul(60).map(Duration::from_secs),
        "h" => amount.checked_mul(60 * 60).map(Duration::from_secs),
        "d" => amount.checked_mul(24 * 60 * 60).map(Duration::from_secs),
        _ => None,
    }
}

/// Maps a chrono parse failure to either a miss or, for a broken pattern, a fault
fn date_result<T>(
    parsed: chrono::ParseResult<T>,
    ctx: &ConversionContext,
) -> Result<Option<T>, ConversionError> {
    match parsed {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.kind() == ParseErrorKind::BadFormat => Err(ConversionError::InvalidFormat {
            target: ctx.target().name(),
            format: ctx.format().unwrap_or_default().to_owned(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(None),
    }
}

fn parse_date(text: &str, ctx: &ConversionContext) -> Result<Option<NaiveDate>, ConversionError> {
    match ctx.format() {
        Some(format) => date_result(NaiveDate::parse_from_str(text, format), ctx),
        None => date_result(text.parse::<NaiveDate>(), ctx),
    }
}

fn parse_date_time(
    text: &str,
    ctx: &ConversionContext,
) -> Result<Option<NaiveDateTime>, ConversionError> {
    match ctx.format() {
        Some(format) => date_result(NaiveDateTime::parse_from_str(text, format), ctx),
        None => date_result(text.parse::<NaiveDateTime>(), ctx),
    }
}

fn parse_offset_date_time(
    text: &str,
    ctx: &ConversionContext,
) -> Result<Option<DateTime<FixedOffset>>, ConversionError> {
    match ctx.format() {
        Some(format) => date_result(DateTime::parse_from_str(text, format), ctx),
        None => date_result(DateTime::parse_from_rfc3339(text), ctx),
    }
}
