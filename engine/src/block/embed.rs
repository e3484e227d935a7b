use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tagscript::node::Node;

use crate::block::{BlockSpec, is_truthy, recover};
use crate::block::time::parse_timestamp;
use crate::error::BlockError;
use crate::response::{EmbedField, EmbedSpec};
use crate::runtime::BlockContext;

pub(crate) const BLOCKS: &[BlockSpec] = &[BlockSpec {
    names: &["embed"],
    handler: embed_block,
}];

const KEYS: &[&str] = &[
    "title",
    "description",
    "desc",
    "url",
    "color",
    "colour",
    "author",
    "footer",
    "thumbnail",
    "image",
    "timestamp",
    "field",
];

fn embed_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    recover("embed", embed(ctx))
}

fn embed(ctx: &mut BlockContext<'_>) -> Result<String, BlockError> {
    let now = ctx.runtime.now();

    if let Some(attribute) = ctx.argument().map(str::to_lowercase) {
        // `{embed:title}(x)` edits the last embed.
        let value = ctx.payload().unwrap_or_default();
        let embeds = &mut ctx.runtime.response().embeds;
        let mut embed = embeds.last().cloned().unwrap_or_default();
        set(&mut embed, &attribute, value.trim(), now)?;
        match embeds.last_mut() {
            Some(last) => *last = embed,
            None => embeds.push(embed),
        }
    } else {
        let json = ctx
            .node
            .payload
            .as_ref()
            .is_some_and(|payload| looks_like_json(&payload.nodes));
        let embed = if json {
            parse_json(&ctx.payload().unwrap_or_default(), now)?
        } else {
            parse_pairs(ctx, now)?
        };
        if embed.is_empty() {
            return Err(BlockError::Missing("embed content"));
        }
        let max = ctx.runtime.limits().max_embeds;
        let embeds = &mut ctx.runtime.response().embeds;
        if embeds.len() < max {
            embeds.push(embed);
        }
    }

    ctx.runtime.response().actions.embed = true;
    Ok(String::new())
}

/// `{"title": ...}` lexes as a block whose declaration is a quoted key.
fn looks_like_json(nodes: &[Node]) -> bool {
    let first = nodes
        .iter()
        .find(|node| !matches!(node, Node::Text(text) if text.text.trim().is_empty()));
    match first {
        Some(Node::Block(block)) => block.raw_declaration.starts_with('"'),
        Some(Node::Text(text)) => text.text.trim_start().starts_with('{'),
        None => false,
    }
}

/// `key:value|key:value`. Pieces whose key is unknown are description text.
fn parse_pairs(ctx: &mut BlockContext<'_>, now: DateTime<Utc>) -> Result<EmbedSpec, BlockError> {
    let mut embed = EmbedSpec::default();
    let mut loose = Vec::new();

    for piece in ctx.payload_pieces('|', usize::MAX) {
        let text = ctx.evaluate(&piece);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        match text.split_once(':') {
            Some((key, value)) if KEYS.contains(&key.trim().to_lowercase().as_str()) => {
                set(&mut embed, &key.trim().to_lowercase(), value.trim(), now)?;
            }
            _ => loose.push(text.to_string()),
        }
    }

    if !loose.is_empty() {
        let loose = loose.join("|");
        embed.description = Some(match embed.description.take() {
            Some(description) => format!("{description}\n{loose}"),
            None => loose,
        });
    }
    Ok(embed)
}

fn set(
    embed: &mut EmbedSpec,
    key: &str,
    value: &str,
    now: DateTime<Utc>,
) -> Result<(), BlockError> {
    let text = Some(value.to_string());
    match key {
        "title" => embed.title = text,
        "description" | "desc" => embed.description = text,
        "url" => embed.url = text,
        "color" | "colour" => {
            let color = parse_color(value).ok_or_else(|| BlockError::invalid("color", value))?;
            embed.color = Some(color);
        }
        "author" => embed.author = text,
        "footer" => embed.footer = text,
        "thumbnail" => embed.thumbnail = text,
        "image" => embed.image = text,
        "timestamp" => embed.timestamp = Some(parse_timestamp(value, now)?),
        "field" => embed.fields.push(parse_field(value)?),
        _ => return Err(BlockError::invalid("embed attribute", key)),
    }
    Ok(())
}

/// `#rrggbb`, `0xrrggbb`, bare hex digits or a decimal number.
pub(crate) fn parse_color(text: &str) -> Option<u32> {
    let text = text.trim();
    let hex = text
        .strip_prefix('#')
        .or_else(|| text.strip_prefix("0x"))
        .or_else(|| text.strip_prefix("0X"));
    let color = match hex {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => text
            .parse::<u32>()
            .ok()
            .or_else(|| (text.len() == 6).then(|| u32::from_str_radix(text, 16).ok()).flatten())?,
    };
    (color <= 0xFF_FFFF).then_some(color)
}

/// `name,value` with an optional trailing `,inline` / `,true` / `,false`.
fn parse_field(text: &str) -> Result<EmbedField, BlockError> {
    let (name, rest) = text
        .split_once(',')
        .ok_or_else(|| BlockError::invalid("embed field", text))?;
    let (value, inline) = match rest.rsplit_once(',') {
        Some((value, flag))
            if matches!(flag.trim().to_lowercase().as_str(), "true" | "false" | "inline") =>
        {
            (value, is_truthy(flag))
        }
        _ => (rest, false),
    };
    let (name, value) = (name.trim(), value.trim());
    if name.is_empty() || value.is_empty() {
        return Err(BlockError::invalid("embed field", text));
    }
    Ok(EmbedField {
        name: name.to_string(),
        value: value.to_string(),
        inline,
    })
}

/// Flat keys or Discord's nested shape (`author.name`, `footer.text`, ...).
fn parse_json(text: &str, now: DateTime<Utc>) -> Result<EmbedSpec, BlockError> {
    let value: Value = serde_json::from_str(text.trim())?;
    let object = value
        .as_object()
        .ok_or_else(|| BlockError::invalid("embed JSON", "not an object"))?;
    let object = object
        .get("embed")
        .and_then(Value::as_object)
        .unwrap_or(object);

    let color = match object.get("color").or_else(|| object.get("colour")) {
        None | Some(Value::Null) => None,
        Some(Value::Number(number)) => Some(
            number
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n <= 0xFF_FFFF)
                .ok_or_else(|| BlockError::invalid("color", number.to_string()))?,
        ),
        Some(other) => {
            let text = json_text(other).unwrap_or_default();
            Some(parse_color(&text).ok_or_else(|| BlockError::invalid("color", text))?)
        }
    };
    let timestamp = match object.get("timestamp").and_then(json_text) {
        Some(text) => Some(parse_timestamp(&text, now)?),
        None => None,
    };
    let fields = object
        .get("fields")
        .and_then(Value::as_array)
        .map(|fields| fields.iter().filter_map(json_field).collect())
        .unwrap_or_default();

    Ok(EmbedSpec {
        title: nested_text(object, "title", "text"),
        description: nested_text(object, "description", "text"),
        url: nested_text(object, "url", "url"),
        color,
        author: nested_text(object, "author", "name"),
        footer: nested_text(object, "footer", "text"),
        thumbnail: nested_text(object, "thumbnail", "url"),
        image: nested_text(object, "image", "url"),
        timestamp,
        fields,
    })
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn nested_text(object: &Map<String, Value>, key: &str, inner: &str) -> Option<String> {
    match object.get(key)? {
        Value::Object(nested) => nested.get(inner).and_then(json_text),
        value => json_text(value),
    }
}

fn json_field(value: &Value) -> Option<EmbedField> {
    let field = value.as_object()?;
    Some(EmbedField {
        name: field.get("name").and_then(json_text)?,
        value: field.get("value").and_then(json_text)?,
        inline: field.get("inline").and_then(Value::as_bool).unwrap_or(false),
    })
}
