use crate::block::{BlockSpec, recover};
use crate::error::BlockError;
use crate::math;
use crate::runtime::BlockContext;

pub(crate) const BLOCKS: &[BlockSpec] = &[BlockSpec {
    names: &["math", "m", "calc", "+"],
    handler: math_block,
}];

/// Evaluates the payload, or the parameter when there is no payload.
fn math_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    recover("math", evaluate(ctx))
}

fn evaluate(ctx: &mut BlockContext<'_>) -> Result<String, BlockError> {
    let expression = match ctx.payload() {
        Some(payload) => payload,
        None => ctx.parameter.clone().ok_or(BlockError::Missing("expression"))?,
    };
    let value = math::evaluate(&expression)?;
    Ok(math::format_number(value))
}
