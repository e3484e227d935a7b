use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};

use crate::block::{BlockSpec, recover};
use crate::error::BlockError;
use crate::runtime::BlockContext;

pub(crate) const BLOCKS: &[BlockSpec] = &[
    BlockSpec {
        names: &["strf"],
        handler: strf_block,
    },
    BlockSpec {
        names: &["unix"],
        handler: unix_block,
    },
];

/// `now`, unix seconds or RFC 3339.
pub(crate) fn parse_timestamp(text: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, BlockError> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("now") {
        return Ok(now);
    }
    if let Ok(seconds) = text.parse::<i64>() {
        return DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| BlockError::invalid("timestamp", text));
    }
    DateTime::parse_from_rfc3339(text)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|_| BlockError::invalid("timestamp", text))
}

fn strf_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    recover("strf", strf(ctx))
}

fn strf(ctx: &mut BlockContext<'_>) -> Result<String, BlockError> {
    let pattern = ctx
        .parameter
        .clone()
        .filter(|pattern| !pattern.trim().is_empty())
        .ok_or(BlockError::Missing("format pattern"))?;
    let now = ctx.runtime.now();
    let time = match ctx.payload().filter(|timestamp| !timestamp.trim().is_empty()) {
        Some(timestamp) => parse_timestamp(&timestamp, now)?,
        None => now,
    };

    let items: Vec<Item<'_>> = StrftimeItems::new(&pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(BlockError::invalid("format pattern", pattern.as_str()));
    }
    let mut output = String::new();
    write!(output, "{}", time.format_with_items(items.into_iter()))?;
    Ok(output)
}

fn unix_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    Some(ctx.runtime.now().timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::stub::{StubRuntime, call, spec};

    fn run(source: &str) -> Option<String> {
        let name = source[1..].split([':', '}']).next().unwrap_or_default();
        call(&spec(name), source, &mut StubRuntime::default())
    }

    #[test]
    fn strf_formats_now() {
        assert_eq!(run("{strf:%Y-%m-%d %H:%M}").as_deref(), Some("2024-03-09 14:05"));
    }

    #[test]
    fn strf_formats_given_timestamp() {
        assert_eq!(run("{strf:%Y}(0)").as_deref(), Some("1970"));
        assert_eq!(run("{strf:%d/%m}(2020-02-01T10:00:00+00:00)").as_deref(), Some("01/02"));
    }

    #[test]
    fn bad_input_declines() {
        assert_eq!(run("{strf}"), None);
        assert_eq!(run("{strf:%Y}(yesterday)"), None);
        assert_eq!(run("{strf:%Q %}"), None);
    }

    #[test]
    fn unix_seconds() {
        assert_eq!(run("{unix}").as_deref(), Some("1709993100"));
    }
}
