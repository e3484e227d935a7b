//! String blocks. `in`, `contains` and `index` cover the membership tests
//! that tags used to run through an embedded interpreter.

use tracing::debug;
use url::form_urlencoded;

use crate::block::BlockSpec;
use crate::runtime::BlockContext;

pub(crate) const BLOCKS: &[BlockSpec] = &[
    BlockSpec {
        names: &["upper"],
        handler: upper_block,
    },
    BlockSpec {
        names: &["lower"],
        handler: lower_block,
    },
    BlockSpec {
        names: &["replace"],
        handler: replace_block,
    },
    BlockSpec {
        names: &["urlencode"],
        handler: urlencode_block,
    },
    BlockSpec {
        names: &["ordinal"],
        handler: ordinal_block,
    },
    BlockSpec {
        names: &["length", "len"],
        handler: length_block,
    },
    BlockSpec {
        names: &["count"],
        handler: count_block,
    },
    BlockSpec {
        names: &["in"],
        handler: in_block,
    },
    BlockSpec {
        names: &["contains"],
        handler: contains_block,
    },
    BlockSpec {
        names: &["index"],
        handler: index_block,
    },
];

/// The payload, or the parameter for blocks written `{upper:text}`.
fn subject(ctx: &mut BlockContext<'_>) -> Option<String> {
    match ctx.payload() {
        Some(payload) => Some(payload),
        None => ctx.parameter.clone(),
    }
}

fn upper_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    subject(ctx).map(|text| text.to_uppercase())
}

fn lower_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    subject(ctx).map(|text| text.to_lowercase())
}

/// `{replace:from,to}(text)`
fn replace_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let (from, to) = ctx.parameter.as_deref()?.split_once(',')?;
    if from.is_empty() {
        return None;
    }
    let (from, to) = (from.to_string(), to.to_string());
    let text = ctx.payload()?;
    // Size the result before building it; the output cap would cut it anyway.
    let hits = text.matches(from.as_str()).count();
    let len = (text.len() - hits * from.len()).saturating_add(hits.saturating_mul(to.len()));
    if len > ctx.runtime.limits().max_output_bytes {
        debug!(len, "replace result exceeds the output limit");
        return None;
    }
    Some(text.replace(&from, &to))
}

/// Percent-encoding with `%20` for spaces, or `+` with `{urlencode:+}`.
fn urlencode_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let plus = ctx.argument() == Some("+");
    let text = ctx.payload()?;
    let encoded: String = form_urlencoded::byte_serialize(text.as_bytes()).collect();
    if plus {
        Some(encoded)
    } else {
        // Literal pluses were already escaped as %2B.
        Some(encoded.replace('+', "%20"))
    }
}

fn ordinal_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let text = match ctx.argument() {
        Some(argument) => argument.to_string(),
        None => ctx.payload()?,
    };
    let n = text.trim().parse::<i64>().ok()?;
    Some(ordinal(n))
}

pub(crate) fn ordinal(n: i64) -> String {
    let magnitude = n.unsigned_abs();
    let suffix = match (magnitude % 10, magnitude % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn length_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    subject(ctx).map(|text| text.chars().count().to_string())
}

/// `{count:needle}(haystack)`
fn count_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let needle = ctx.parameter.clone().filter(|needle| !needle.is_empty())?;
    let haystack = ctx.payload()?;
    Some(haystack.matches(needle.as_str()).count().to_string())
}

/// `{in:needle}(haystack)`: substring test.
fn in_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let needle = ctx.parameter.clone()?;
    let haystack = ctx.payload()?;
    Some(haystack.contains(needle.as_str()).to_string())
}

/// `{contains:word}(text)`: whole-word test.
fn contains_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let word = ctx.argument()?.to_string();
    let text = ctx.payload()?;
    Some(text.split_whitespace().any(|candidate| candidate == word).to_string())
}

/// `{index:word}(text)`: 1-based word position, -1 when absent.
fn index_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let word = ctx.argument()?.to_string();
    let text = ctx.payload()?;
    let position = text
        .split_whitespace()
        .position(|candidate| candidate == word)
        .map_or(-1, |at| at as i64 + 1);
    Some(position.to_string())
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
    fn case_conversion() {
        assert_eq!(run("{upper}(straße)").as_deref(), Some("STRASSE"));
        assert_eq!(run("{lower:HeLLo}").as_deref(), Some("hello"));
        assert_eq!(run("{upper}"), None);
    }

    #[test]
    fn replace() {
        assert_eq!(run("{replace:o,0}(foo boo)").as_deref(), Some("f00 b00"));
        assert_eq!(run("{replace:o,}(foo)").as_deref(), Some("f"));
        assert_eq!(run("{replace:o}(foo)"), None);
        assert_eq!(run("{replace:,x}(foo)"), None);
    }

    #[test]
    fn replace_refuses_results_over_the_output_limit() {
        let mut runtime = StubRuntime::default();
        runtime.limits.max_output_bytes = 16;
        assert_eq!(call(&spec("replace"), "{replace:o,xxxxxxxx}(ooo)", &mut runtime), None);
        assert_eq!(
            call(&spec("replace"), "{replace:o,xx}(ooo)", &mut runtime).as_deref(),
            Some("xxxxxx")
        );
    }

    #[test]
    fn urlencode() {
        assert_eq!(run("{urlencode}(a b&c+d)").as_deref(), Some("a%20b%26c%2Bd"));
        assert_eq!(run("{urlencode:+}(a b)").as_deref(), Some("a+b"));
    }

    #[test]
    fn ordinals() {
        let cases = [
            (1, "1st"),
            (2, "2nd"),
            (3, "3rd"),
            (4, "4th"),
            (11, "11th"),
            (12, "12th"),
            (13, "13th"),
            (21, "21st"),
            (102, "102nd"),
            (111, "111th"),
            (-1, "-1st"),
            (0, "0th"),
        ];
        for (n, expected) in cases {
            assert_eq!(ordinal(n), expected);
        }
        assert_eq!(run("{ordinal:22}").as_deref(), Some("22nd"));
        assert_eq!(run("{ordinal}(3)").as_deref(), Some("3rd"));
        assert_eq!(run("{ordinal}(three)"), None);
    }

    #[test]
    fn length_and_count() {
        assert_eq!(run("{length}(héllo)").as_deref(), Some("5"));
        assert_eq!(run("{len}()").as_deref(), Some("0"));
        assert_eq!(run("{count:ab}(abcabab)").as_deref(), Some("3"));
        assert_eq!(run("{count}(abc)"), None);
    }

    #[test]
    fn membership() {
        assert_eq!(run("{in:ell}(hello world)").as_deref(), Some("true"));
        assert_eq!(run("{in:xyz}(hello world)").as_deref(), Some("false"));
        assert_eq!(run("{contains:ell}(hello world)").as_deref(), Some("false"));
        assert_eq!(run("{contains:world}(hello world)").as_deref(), Some("true"));
        assert_eq!(run("{index:world}(hello world)").as_deref(), Some("2"));
        assert_eq!(run("{index:nope}(hello world)").as_deref(), Some("-1"));
    }
}
