//! Blocks that only record requests on `Response::actions`.

use crate::block::{BlockSpec, is_truthy, list, recover};
use crate::error::BlockError;
use crate::response::{Check, Cooldown, Overrides, Target};
use crate::runtime::BlockContext;

pub(crate) const BLOCKS: &[BlockSpec] = &[
    BlockSpec {
        names: &["delete", "del"],
        handler: delete_block,
    },
    BlockSpec {
        names: &["cooldown"],
        handler: cooldown_block,
    },
    BlockSpec {
        names: &["redirect", "target"],
        handler: redirect_block,
    },
    BlockSpec {
        names: &["require", "whitelist"],
        handler: require_block,
    },
    BlockSpec {
        names: &["blacklist"],
        handler: blacklist_block,
    },
    BlockSpec {
        names: &["override"],
        handler: override_block,
    },
    BlockSpec {
        names: &["react"],
        handler: react_block,
    },
    BlockSpec {
        names: &["command", "c", "cmd"],
        handler: command_block,
    },
];

fn delete_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let delete = ctx.parameter.as_deref().is_none_or(is_truthy);
    ctx.runtime.response().actions.delete.get_or_insert(delete);
    Some(String::new())
}

fn cooldown_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    recover("cooldown", cooldown(ctx))
}

fn cooldown(ctx: &mut BlockContext<'_>) -> Result<String, BlockError> {
    let argument = ctx.argument().ok_or(BlockError::Missing("rate|per"))?;
    let (rate, per) = argument
        .split_once('|')
        .ok_or_else(|| BlockError::invalid("cooldown", argument))?;
    let rate = rate
        .trim()
        .parse::<u32>()
        .map_err(|_| BlockError::invalid("cooldown rate", rate))?;
    let per_seconds = per
        .trim()
        .parse::<u64>()
        .map_err(|_| BlockError::invalid("cooldown period", per))?;

    let message = ctx.payload().filter(|message| !message.is_empty());
    ctx.runtime
        .response()
        .actions
        .cooldown
        .get_or_insert(Cooldown { rate, per_seconds, message });
    Ok(String::new())
}

fn redirect_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let target = Target::parse(ctx.parameter.as_deref().unwrap_or_default())?;
    ctx.runtime.response().actions.target.get_or_insert(target);
    Some(String::new())
}

fn require_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let check = check(ctx)?;
    merge_check(&mut ctx.runtime.response().actions.requires, check);
    Some(String::new())
}

fn blacklist_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let check = check(ctx)?;
    merge_check(&mut ctx.runtime.response().actions.blacklist, check);
    Some(String::new())
}

fn check(ctx: &mut BlockContext<'_>) -> Option<Check> {
    let items: Vec<String> = ctx
        .parameter
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() {
        return None;
    }
    let response = ctx.payload().filter(|response| !response.is_empty());
    Some(Check { items, response })
}

fn merge_check(slot: &mut Option<Check>, check: Check) {
    match slot {
        Some(existing) => {
            existing.items.extend(check.items);
            if existing.response.is_none() {
                existing.response = check.response;
            }
        }
        None => *slot = Some(check),
    }
}

fn override_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let requested = match ctx.argument() {
        None => Overrides {
            admin: true,
            moderator: true,
            permissions: true,
        },
        Some(argument) => {
            let mut requested = Overrides::default();
            for item in list(&argument.to_lowercase()) {
                match item.as_str() {
                    "admin" => requested.admin = true,
                    "mod" | "moderator" => requested.moderator = true,
                    "permissions" => requested.permissions = true,
                    _ => {}
                }
            }
            requested
        }
    };

    let overrides = ctx.runtime.response().actions.overrides.get_or_insert_default();
    overrides.admin |= requested.admin;
    overrides.moderator |= requested.moderator;
    overrides.permissions |= requested.permissions;
    Some(String::new())
}

fn react_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let emoji = list(ctx.parameter.as_deref().unwrap_or_default());
    if emoji.is_empty() {
        return None;
    }
    let max = ctx.runtime.limits().max_reactions;
    let reactions = &mut ctx.runtime.response().actions.reactions;
    let room = max.saturating_sub(reactions.len());
    reactions.extend(emoji.into_iter().take(room));
    Some(String::new())
}

fn command_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let command = match ctx.argument() {
        Some(argument) => argument.to_string(),
        None => ctx.payload()?.trim().to_string(),
    };
    if command.is_empty() {
        return None;
    }
    let max = ctx.runtime.limits().max_commands;
    let commands = &mut ctx.runtime.response().actions.commands;
    if commands.len() < max {
        commands.push(command);
    }
    Some(String::new())
}
