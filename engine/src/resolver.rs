//! Variable lookup against the seed and the per-evaluation overlay.

use std::collections::HashMap;

use crate::adapter::Adapter;
use crate::seed::Seed;

/// Resolve `reference` (already lowercased) with an optional evaluated
/// parameter.
///
/// `name.attr` reads an adapter attribute. For structured adapters the
/// parameter names an attribute too (`{user:id}`); for strings it selects
/// words (`{args:2}`, `{args:2+}`). Seed entries shadow overlay entries.
pub fn resolve(
    seed: &Seed,
    overlay: &HashMap<String, String>,
    reference: &str,
    parameter: Option<&str>,
) -> Option<String> {
    let (root, attribute) = match reference.split_once('.') {
        Some((root, attribute)) => (root.trim(), Some(attribute)),
        None => (reference.trim(), None),
    };

    match (seed.get(root), attribute) {
        (Some(adapter), Some(attribute)) => adapter.attribute(attribute),
        (Some(Adapter::String(text)), None) => select(text, parameter),
        (Some(adapter), None) => match parameter.map(str::trim) {
            Some(attribute) if !attribute.is_empty() => adapter.attribute(attribute),
            _ => Some(adapter.render()),
        },
        (None, None) => overlay.get(root).and_then(|text| select(text, parameter)),
        (None, Some(_)) => None,
    }
}

/// Whether `reference` names a seed entry or an assigned variable, before
/// any parameter is considered.
pub fn is_bound(seed: &Seed, overlay: &HashMap<String, String>, reference: &str) -> bool {
    match reference.split_once('.') {
        Some((root, _)) => seed.contains(root.trim()),
        None => seed.contains(reference.trim()) || overlay.contains_key(reference.trim()),
    }
}

fn select(text: &str, selector: Option<&str>) -> Option<String> {
    match selector.map(str::trim) {
        None | Some("") => Some(text.to_string()),
        Some(selector) => words(text, selector),
    }
}

/// Word selection on a whitespace-split string.
///
/// `N` is the Nth word (1-based, negative counts from the end), `N+` is word
/// N onward and `+N` is the first N words. Out-of-range selections yield "".
/// Anything else is not a selector and leaves the reference unresolved.
pub fn words(text: &str, selector: &str) -> Option<String> {
    let words: Vec<&str> = text.split_whitespace().collect();

    if let Some(start) = selector.strip_suffix('+') {
        let start = start.trim().parse::<usize>().ok()?;
        let from = start.saturating_sub(1).min(words.len());
        return Some(words[from..].join(" "));
    }
    if let Some(count) = selector.strip_prefix('+') {
        let count = count.trim().parse::<usize>().ok()?;
        return Some(words[..count.min(words.len())].join(" "));
    }

    let index = selector.parse::<i64>().ok()?;
    let position = if index < 0 {
        usize::try_from(index.unsigned_abs()).ok().and_then(|back| words.len().checked_sub(back))
    } else {
        usize::try_from(index).ok().and_then(|n| n.checked_sub(1))
    };
    Some(
        position
            .and_then(|at| words.get(at))
            .map(|word| word.to_string())
            .unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{Channel, Member};

    fn seed() -> Seed {
        Seed::for_invocation(
            Member::new(42, "alice"),
            None,
            Channel::new(7, "general"),
            None,
            "first second third",
        )
    }

    #[test]
    fn renders_and_reads_attributes() {
        let overlay = HashMap::new();
        assert_eq!(resolve(&seed(), &overlay, "user", None).as_deref(), Some("alice"));
        assert_eq!(resolve(&seed(), &overlay, "user.id", None).as_deref(), Some("42"));
        assert_eq!(resolve(&seed(), &overlay, "user", Some("mention")).as_deref(), Some("<@42>"));
        assert_eq!(resolve(&seed(), &overlay, "channel.mention", None).as_deref(), Some("<#7>"));
        assert_eq!(resolve(&seed(), &overlay, "user.nope", None), None);
        assert_eq!(resolve(&seed(), &overlay, "missing", None), None);
    }

    #[test]
    fn bound_names() {
        let mut overlay = HashMap::new();
        overlay.insert("x".to_string(), "1".to_string());
        assert!(is_bound(&seed(), &overlay, "user"));
        assert!(is_bound(&seed(), &overlay, "user.nope"));
        assert!(is_bound(&seed(), &overlay, "x"));
        assert!(!is_bound(&seed(), &overlay, "x.len"));
        assert!(!is_bound(&seed(), &overlay, "server"));
        assert!(!is_bound(&seed(), &overlay, "nope"));
    }

    #[test]
    fn word_selection() {
        let overlay = HashMap::new();
        let args = |p| resolve(&seed(), &overlay, "args", Some(p));
        assert_eq!(args("1").as_deref(), Some("first"));
        assert_eq!(args("-1").as_deref(), Some("third"));
        assert_eq!(args("2+").as_deref(), Some("second third"));
        assert_eq!(args("+2").as_deref(), Some("first second"));
        assert_eq!(args("9").as_deref(), Some(""));
        assert_eq!(args("0").as_deref(), Some(""));
        assert_eq!(args("word"), None);
    }

    #[test]
    fn overlay_is_consulted_after_seed() {
        let mut overlay = HashMap::new();
        overlay.insert("greeting".to_string(), "hi there".to_string());
        overlay.insert("user".to_string(), "shadow".to_string());
        assert_eq!(resolve(&seed(), &overlay, "greeting", None).as_deref(), Some("hi there"));
        assert_eq!(resolve(&seed(), &overlay, "greeting", Some("2")).as_deref(), Some("there"));
        assert_eq!(resolve(&seed(), &overlay, "user", None).as_deref(), Some("alice"));
        assert_eq!(resolve(&seed(), &overlay, "greeting.x", None), None);
    }
}
