use tracing::debug;

use crate::block::BlockSpec;
use crate::runtime::BlockContext;

pub(crate) const BLOCKS: &[BlockSpec] = &[BlockSpec {
    names: &["var", "let", "assign", "="],
    handler: assign_block,
}];

/// `{var:name}(value)` binds `name` for the rest of the evaluation.
fn assign_block(ctx: &mut BlockContext<'_>) -> Option<String> {
    let name = ctx.argument()?.to_lowercase();
    if name.contains(['{', '}', ':', '.']) {
        return None;
    }
    let value = ctx.payload().unwrap_or_default();
    if !ctx.runtime.assign(&name, value) {
        debug!(%name, "ignoring assignment to reserved name");
    }
    Some(String::new())
}

#[cfg(test)]
mod tests {
    use crate::runtime::stub::{StubRuntime, call, spec};

    #[test]
    fn binds_lowercased_name() {
        let mut runtime = StubRuntime::default();
        let output = call(&spec("var"), "{var:Name}(World)", &mut runtime);
        assert_eq!(output.as_deref(), Some(""));
        assert_eq!(runtime.overlay.get("name").map(String::as_str), Some("World"));
    }

    #[test]
    fn reserved_names_are_left_alone() {
        let mut runtime = StubRuntime::default();
        assert_eq!(call(&spec("let"), "{let:user}(x)", &mut runtime).as_deref(), Some(""));
        assert!(runtime.overlay.is_empty());
    }

    #[test]
    fn needs_a_usable_name() {
        let mut runtime = StubRuntime::default();
        assert_eq!(call(&spec("="), "{=}(x)", &mut runtime), None);
        assert_eq!(call(&spec("="), "{=:a.b}(x)", &mut runtime), None);
    }
}
