use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::codegen;
use crate::compiler::{Fragment, ResolvedInputs};

/// How a block participates in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Runs for effect; may be a root or a container child.
    Command,
    /// Produces a value; only ever sits in another block's input slot.
    Reporter,
    /// Wraps an ordered list of child commands in a control construct.
    Container,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Output,
    Input,
    Values,
    Control,
    Looks,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Output => "output",
            Category::Input => "input",
            Category::Values => "values",
            Category::Control => "control",
            Category::Looks => "looks",
        };
        f.write_str(name)
    }
}

/// What an input slot expects; drives literal parsing and editor hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Text,
    Number,
    /// Name of an asset in the asset store.
    Costume,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormatToken {
    Label(&'static str),
    Slot { name: &'static str, kind: SlotKind },
}

/// A slot default as declared by the definition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Text(&'static str),
    Number(f64),
}

impl DefaultValue {
    /// The default as it would appear in the slot's text field.
    pub fn as_text(&self) -> String {
        match self {
            DefaultValue::Text(s) => s.to_string(),
            DefaultValue::Number(n) if *n == n.trunc() && n.is_finite() => format!("{}", *n as i64),
            DefaultValue::Number(n) => n.to_string(),
        }
    }
}

/// Every block type the editor knows. Code generation matches on this, so a
/// new variant cannot be added without deciding what it compiles to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Print,
    Alert,
    Value,
    Confirm,
    Prompt,
    Repeat,
    Forever,
    AddSprite,
}

impl BlockKind {
    /// Palette order.
    pub const ALL: [BlockKind; 8] = [
        BlockKind::Print,
        BlockKind::Alert,
        BlockKind::Value,
        BlockKind::Confirm,
        BlockKind::Prompt,
        BlockKind::Repeat,
        BlockKind::Forever,
        BlockKind::AddSprite,
    ];

    pub fn type_id(&self) -> &'static str {
        match self {
            BlockKind::Print => "print",
            BlockKind::Alert => "alert",
            BlockKind::Value => "value",
            BlockKind::Confirm => "confirm",
            BlockKind::Prompt => "prompt",
            BlockKind::Repeat => "repeat",
            BlockKind::Forever => "forever",
            BlockKind::AddSprite => "add_sprite",
        }
    }

    pub fn definition(self) -> BlockDefinition {
        use FormatToken::{Label, Slot};

        let text_slot = Slot {
            name: "input1",
            kind: SlotKind::Text,
        };

        let (shape, category, format, defaults): (_, _, Vec<FormatToken>, Vec<_>) = match self {
            BlockKind::Print => (
                Shape::Command,
                Category::Output,
                vec![Label("Print"), text_slot],
                vec![("input1", DefaultValue::Text("Hello World!"))],
            ),
            BlockKind::Alert => (
                Shape::Command,
                Category::Output,
                vec![Label("Alert"), text_slot],
                vec![("input1", DefaultValue::Text("Hi!"))],
            ),
            BlockKind::Value => (
                Shape::Reporter,
                Category::Values,
                vec![Label("Value"), text_slot],
                vec![("input1", DefaultValue::Number(5.0))],
            ),
            BlockKind::Confirm => (
                Shape::Command,
                Category::Input,
                vec![Label("Confirm"), text_slot],
                vec![("input1", DefaultValue::Text("Hi!"))],
            ),
            BlockKind::Prompt => (
                Shape::Command,
                Category::Input,
                vec![Label("Prompt"), text_slot],
                vec![("input1", DefaultValue::Text("Hello world!"))],
            ),
            BlockKind::Repeat => (
                Shape::Container,
                Category::Control,
                vec![
                    Label("Repeat"),
                    Slot {
                        name: "input1",
                        kind: SlotKind::Number,
                    },
                    Label("times"),
                ],
                vec![("input1", DefaultValue::Text("3"))],
            ),
            BlockKind::Forever => (
                Shape::Container,
                Category::Control,
                vec![Label("Forever do")],
                vec![],
            ),
            BlockKind::AddSprite => (
                Shape::Command,
                Category::Looks,
                vec![
                    Label("Add Sprite"),
                    Slot {
                        name: "imageinput1",
                        kind: SlotKind::Costume,
                    },
                ],
                vec![("imageinput1", DefaultValue::Text("No costume selected"))],
            ),
        };

        BlockDefinition {
            kind: self,
            shape,
            category,
            format,
            defaults: defaults.into_iter().collect(),
        }
    }
}

/// Immutable description of one block type.
#[derive(Debug, Clone)]
pub struct BlockDefinition {
    pub kind: BlockKind,
    pub shape: Shape,
    pub category: Category,
    pub format: Vec<FormatToken>,
    pub defaults: HashMap<&'static str, DefaultValue>,
}

impl BlockDefinition {
    pub fn type_id(&self) -> &'static str {
        self.kind.type_id()
    }

    /// Slots in display order.
    pub fn slots(&self) -> impl Iterator<Item = (&'static str, SlotKind)> + '_ {
        self.format.iter().filter_map(|token| match token {
            FormatToken::Slot { name, kind } => Some((*name, *kind)),
            FormatToken::Label(_) => None,
        })
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.slots().any(|(slot, _)| slot == name)
    }

    pub fn default_for(&self, slot: &str) -> Option<DefaultValue> {
        self.defaults.get(slot).copied()
    }

    /// Produce this block's two fragments from already-resolved inputs and
    /// already-compiled children. `depth` only names loop variables.
    pub fn generate(&self, inputs: &ResolvedInputs, children: &[Fragment], depth: usize) -> Fragment {
        match self.kind {
            BlockKind::Print => codegen::call_statement("print", inputs.get("input1")),
            BlockKind::Alert => codegen::call_statement("alert", inputs.get("input1")),
            BlockKind::Confirm => codegen::call_statement("confirm", inputs.get("input1")),
            BlockKind::Prompt => codegen::call_statement("prompt", inputs.get("input1")),
            BlockKind::Value => {
                let value = inputs.get("input1").to_string();
                Fragment {
                    executable: value.clone(),
                    display: value,
                }
            }
            BlockKind::Repeat => {
                let fallback = self
                    .default_for("input1")
                    .map(|d| d.as_text())
                    .unwrap_or_default();
                let count = codegen::repeat_count(inputs.get("input1"), &fallback);
                codegen::repeat_loop(count, children, depth)
            }
            BlockKind::Forever => codegen::forever_loop(children),
            BlockKind::AddSprite => codegen::draw_sprite(inputs.get("imageinput1")),
        }
    }
}

/// Lookup table from type identifier to definition. Read-only once built.
#[derive(Debug, Clone)]
pub struct Registry {
    definitions: Vec<BlockDefinition>,
    index: HashMap<&'static str, usize>,
}

impl Registry {
    pub fn new(kinds: impl IntoIterator<Item = BlockKind>) -> Self {
        let definitions: Vec<BlockDefinition> =
            kinds.into_iter().map(BlockKind::definition).collect();
        let index = definitions
            .iter()
            .enumerate()
            .map(|(i, def)| (def.type_id(), i))
            .collect();
        Registry { definitions, index }
    }

    /// The shared registry with every built-in block.
    pub fn standard() -> &'static Registry {
        static STANDARD: OnceLock<Registry> = OnceLock::new();
        STANDARD.get_or_init(|| Registry::new(BlockKind::ALL))
    }

    pub fn lookup(&self, block_type: &str) -> Option<&BlockDefinition> {
        self.index.get(block_type).map(|&i| &self.definitions[i])
    }

    /// Type identifiers in palette order.
    pub fn all_types(&self) -> Vec<&'static str> {
        self.definitions.iter().map(|d| d.type_id()).collect()
    }

    pub fn definitions(&self) -> &[BlockDefinition] {
        &self.definitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_order_is_stable() {
        assert_eq!(
            Registry::standard().all_types(),
            vec!["print", "alert", "value", "confirm", "prompt", "repeat", "forever", "add_sprite"]
        );
    }

    #[test]
    fn lookup_misses_unknown_types() {
        assert!(Registry::standard().lookup("teleport").is_none());
        assert_eq!(
            Registry::standard().lookup("repeat").map(|d| d.shape),
            Some(Shape::Container)
        );
    }

    #[test]
    fn every_slot_with_a_default_is_in_the_format() {
        for def in Registry::standard().definitions() {
            for slot in def.defaults.keys() {
                assert!(def.has_slot(slot), "{} default for missing slot {}", def.type_id(), slot);
            }
        }
    }

    #[test]
    fn numeric_defaults_render_as_integers() {
        assert_eq!(DefaultValue::Number(5.0).as_text(), "5");
        assert_eq!(DefaultValue::Number(0.5).as_text(), "0.5");
    }

    #[test]
    fn subset_registries() {
        let registry = Registry::new([BlockKind::Print, BlockKind::Repeat]);
        assert_eq!(registry.all_types(), vec!["print", "repeat"]);
        assert!(registry.lookup("value").is_none());
    }
}
