use std::collections::HashMap;

use tracing::debug;

use crate::registry::Registry;
use crate::tree::{BlockInstance, SlotValue};

/// The two renderings of a compiled block: text the interpreter runs, and
/// text shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment {
    pub executable: String,
    pub display: String,
}

impl Fragment {
    pub fn is_empty(&self) -> bool {
        self.executable.is_empty() && self.display.is_empty()
    }
}

/// Slot name to the text a block's generator sees for it.
#[derive(Debug, Clone, Default)]
pub struct ResolvedInputs {
    values: HashMap<&'static str, String>,
}

impl ResolvedInputs {
    /// The resolved text of `slot`; empty when the block has no such slot.
    pub fn get(&self, slot: &str) -> &str {
        self.values.get(slot).map(String::as_str).unwrap_or("")
    }
}

/// Compile one block (and everything under it) into its two fragments.
///
/// Unknown block types compile to empty fragments. Reporters in slots are
/// compiled at the same depth, container children at `depth + 1`.
pub fn compile(instance: &BlockInstance, depth: usize, registry: &Registry) -> Fragment {
    let Some(def) = registry.lookup(&instance.block_type) else {
        debug!(target: "blocks", block_type = %instance.block_type, "unknown block type compiles to nothing");
        return Fragment::default();
    };

    let mut inputs = ResolvedInputs::default();
    for (slot, _) in def.slots() {
        let text = match instance.slot(slot) {
            Some(SlotValue::Reporter(reporter)) => compile(reporter, depth, registry).executable,
            Some(SlotValue::Literal(text)) => text.trim().to_string(),
            None => def
                .default_for(slot)
                .map(|d| d.as_text())
                .unwrap_or_default(),
        };
        inputs.values.insert(slot, text);
    }

    let children: Vec<Fragment> = instance
        .children()
        .iter()
        .map(|child| compile(child, depth + 1, registry))
        .filter(|fragment| !fragment.is_empty())
        .collect();

    debug!(
        target: "blocks",
        block = %instance.id,
        block_type = def.type_id(),
        depth,
        children = children.len(),
        "compiled block"
    );
    def.generate(&inputs, &children, depth)
}
