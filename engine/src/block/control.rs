use std::cmp::Ordering;

use crate::block::{BlockSpec, is_truthy};
use crate::runtime::BlockContext;

pub(crate) const BLOCKS: &[BlockSpec] = &[
    BlockSpec {
        names: &["if"],
        handler: if_block,
    },
    BlockSpec {
        names: &["any", "or"],
        handler: any_block,
    },
    BlockSpec {
        names: &["all", "and"],
        handler: all_block,
    },
    BlockSpec {
        names: &["stop", "break", "shortcircuit"],
        handler: stop_block,
    },
    BlockSpec {
        names: &["debug"],
        handler: debug_block,
    },
];

/// Evaluate a condition: a comparison, or plain truthiness.
///
/// `==` and `!=` compare numerically when both sides are numbers and as
/// trimmed strings otherwise. Ordering operators only apply to numbers; with
/// non-numeric sides the whole text falls back to truthiness, so mentions
/// like `<@1>` are not read as comparisons.
pub fn condition(text: &str) -> bool {
    for operator in ["==", "!=", ">=", "<=", ">", "<"] {
        let Some((left, right)) = text.split_once(operator) else {
            continue;
        };
        let (left, right) = (left.trim(), right.trim());
        let numeric = match (left.parse::<f64>(), right.parse::<f64>()) {
            (Ok(left), Ok(right)) => left.partial_cmp(&right),
            _ => None,
        };
        return match operator {
            "==" => numeric.map_or(left == right, Ordering::is_eq),
            "!=" => numeric.map_or(left != right, Ordering::is_ne),
            _ => match numeric {
                Some(ordering) => match operator {
                    ">=" => ordering.is_ge(),
                    "<=" => ordering.is_le(),
                    ">" => ordering.is_gt(),
                    _ => ordering.is_lt(),
                },
                None => is_truthy(text),
            },
        };
    }
    is_truthy(text)
}

/// Evaluate the `then` or `else` half of `(then|else)`. Only the chosen
/// half runs; further pipes belong to the `else` half.
fn branch(ctx: &mut BlockContext<'_>, taken: bool) -> String {
    let mut halves = ctx.payload_pieces('|', 2).into_iter();
    let chosen = if taken { halves.next() } else { halves.nth(1) };
    chosen.map(|nodes| ctx.evaluate(&nodes)).unwrap_or_default()
}

fn if_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let taken = ctx.parameter.as_deref().is_some_and(condition);
    Some(branch(ctx, taken))
}

fn any_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let taken = ctx
        .parameter
        .as_deref()
        .is_some_and(|conditions| conditions.split('|').any(condition));
    Some(branch(ctx, taken))
}

fn all_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let taken = ctx
        .parameter
        .as_deref()
        .is_some_and(|conditions| conditions.split('|').all(condition));
    Some(branch(ctx, taken))
}

fn stop_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    if ctx.parameter.as_deref().is_none_or(condition) {
        let body = ctx.payload().unwrap_or_default();
        ctx.runtime.halt(body);
    }
    Some(String::new())
}

fn debug_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    ctx.runtime.enable_debug();
    Some(String::new())
}
