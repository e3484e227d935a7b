use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::block::{BlockSpec, recover};
use crate::error::BlockError;
use crate::math::format_number;
use crate::runtime::BlockContext;

pub(crate) const BLOCKS: &[BlockSpec] = &[
    BlockSpec {
        names: &["random", "rand"],
        handler: random_block,
    },
    BlockSpec {
        names: &["50", "5050", "?"],
        handler: fifty_block,
    },
    BlockSpec {
        names: &["range"],
        handler: range_block,
    },
    BlockSpec {
        names: &["rangef"],
        handler: rangef_block,
    },
];

/// A generator fixed by user-supplied seed text. FNV-1a keeps the mapping
/// stable across toolchains, so stored tags replay the same choice.
fn seeded(seed: &str) -> StdRng {
    StdRng::seed_from_u64(const_fnv1a_hash::fnv1a_hash_str_64(seed))
}

/// Run `f` with the seeded generator when `seed` is given, else the
/// evaluation's own generator.
fn with_rng<T>(
    ctx: &mut BlockContext<'_>,
    seed: Option<&str>,
    f: impl FnOnce(&mut dyn RngCore) -> T,
) -> T {
    match seed {
        Some(seed) => f(&mut seeded(seed)),
        None => f(ctx.runtime.rng()),
    }
}

/// `{random:seed?}(a|b|c)`: only the chosen alternative is evaluated.
fn random_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    if !ctx.has_payload() {
        return None;
    }
    let choices = ctx.payload_pieces('|', usize::MAX);
    let seed = ctx.argument().map(str::to_string);
    let index = with_rng(ctx, seed.as_deref(), |rng| rng.random_range(0..choices.len()));
    let chosen = choices.get(index)?;
    Some(ctx.evaluate(chosen))
}

fn fifty_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    if ctx.runtime.rng().random_bool(0.5) {
        Some(ctx.payload().unwrap_or_default())
    } else {
        Some(String::new())
    }
}

fn range_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    recover("range", range(ctx, false))
}

fn rangef_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    recover("rangef", range(ctx, true))
}

/// `{range:low-high}(seed?)`, bounds inclusive and swapped if reversed.
fn range(ctx: &mut BlockContext<'_>, float: bool) -> Result<String, BlockError> {
    let argument = ctx.argument().ok_or(BlockError::Missing("low-high"))?;
    let (low, high) = bounds(argument)?;
    let seed = ctx.payload().filter(|seed| !seed.trim().is_empty());

    if float {
        let (low, high) = parse_pair::<f64>(low, high)?;
        // rand panics when the span itself overflows, even with finite bounds.
        if !(high - low).is_finite() {
            return Err(BlockError::invalid("range", format!("{low}-{high}")));
        }
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let value = with_rng(ctx, seed.as_deref(), |rng| rng.random_range(low..=high));
        Ok(format_number(value))
    } else {
        let (low, high) = parse_pair::<i64>(low, high)?;
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let value = with_rng(ctx, seed.as_deref(), |rng| rng.random_range(low..=high));
        Ok(value.to_string())
    }
}

/// Split `low-high` on the first `-` that is not a sign.
fn bounds(text: &str) -> Result<(String, String), BlockError> {
    let split = text
        .char_indices()
        .skip(1)
        .find(|&(at, c)| c == '-' && !text[..at].trim_end().ends_with('-'))
        .map(|(at, _)| at)
        .ok_or_else(|| BlockError::invalid("range", text))?;
    Ok((text[..split].trim().to_string(), text[split + 1..].trim().to_string()))
}

fn parse_pair<T: std::str::FromStr>(low: String, high: String) -> Result<(T, T), BlockError> {
    match (low.parse::<T>(), high.parse::<T>()) {
        (Ok(low), Ok(high)) => Ok((low, high)),
        _ => Err(BlockError::invalid("range", format!("{low}-{high}"))),
    }
}
