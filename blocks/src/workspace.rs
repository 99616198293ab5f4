use std::fmt::Write as _;

use interpreter::{AssetStore, Host, Runtime};
use tracing::debug;

use crate::registry::{FormatToken, Registry, Shape};
use crate::runner::{self, Program, RunReport};
use crate::tree::{BlockId, BlockInstance, PlacementError, SlotValue, check_nesting};

/// Root positions snap to multiples of this many pixels.
pub const GRID_SIZE: f64 = 40.0;

/// Round a coordinate to the nearest grid line, halves rounding up.
pub fn snap_to_grid(value: f64) -> i64 {
    ((value / GRID_SIZE + 0.5).floor() * GRID_SIZE) as i64
}

/// A top-level block and where it sits on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedBlock {
    pub x: i64,
    pub y: i64,
    pub block: BlockInstance,
}

/// The editing surface: top-level blocks in placement order plus the
/// assets their programs may draw.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub(crate) registry: &'static Registry,
    pub(crate) roots: Vec<PlacedBlock>,
    pub assets: AssetStore,
    pub(crate) next_id: u64,
}

impl Default for Workspace {
    fn default() -> Self {
        Workspace::new()
    }
}

impl Workspace {
    pub fn new() -> Self {
        Workspace::with_registry(Registry::standard())
    }

    pub fn with_registry(registry: &'static Registry) -> Self {
        Workspace {
            registry,
            roots: Vec::new(),
            assets: AssetStore::new(),
            next_id: 1,
        }
    }

    pub fn registry(&self) -> &'static Registry {
        self.registry
    }

    pub(crate) fn allocate_id(&mut self) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        id
    }

    /// A fresh block of `block_type` with every slot holding its default,
    /// the way a newly dropped block shows its pre-filled fields. Unknown
    /// types still instantiate, as placeholders.
    pub fn instantiate(&mut self, block_type: &str) -> BlockInstance {
        let id = self.allocate_id();
        let mut instance = BlockInstance::new(id, block_type);
        if let Some(def) = self.registry.lookup(block_type) {
            for (slot, _) in def.slots() {
                if let Some(default) = def.default_for(slot) {
                    instance.set_default(slot, default.as_text());
                }
            }
        }
        debug!(target: "blocks", block = %id, block_type, "instantiated block");
        instance
    }

    /// Place a block at the top level. Reporters cannot stand alone.
    pub fn add_root(&mut self, block: BlockInstance, x: f64, y: f64) -> Result<BlockId, PlacementError> {
        if block.shape(self.registry) == Some(Shape::Reporter) {
            return Err(PlacementError::ReporterNotAllowed(block.block_type));
        }
        let id = block.id;
        let (x, y) = (snap_to_grid(x), snap_to_grid(y));
        debug!(target: "blocks", block = %id, x, y, "placed root");
        self.roots.push(PlacedBlock { x, y, block });
        Ok(id)
    }

    pub fn move_root(&mut self, id: BlockId, x: f64, y: f64) -> Result<(), PlacementError> {
        let placed = self
            .roots
            .iter_mut()
            .find(|r| r.block.id == id)
            .ok_or(PlacementError::BlockNotFound(id))?;
        placed.x = snap_to_grid(x);
        placed.y = snap_to_grid(y);
        Ok(())
    }

    /// Take a block out of the workspace wherever it is, with its subtree.
    pub fn remove(&mut self, id: BlockId) -> Result<BlockInstance, PlacementError> {
        if let Some(index) = self.roots.iter().position(|r| r.block.id == id) {
            return Ok(self.roots.remove(index).block);
        }
        self.roots
            .iter_mut()
            .find_map(|r| r.block.detach(id))
            .ok_or(PlacementError::BlockNotFound(id))
    }

    pub fn roots(&self) -> &[PlacedBlock] {
        &self.roots
    }

    pub fn find(&self, id: BlockId) -> Option<&BlockInstance> {
        self.roots.iter().find_map(|r| r.block.find(id))
    }

    pub fn find_mut(&mut self, id: BlockId) -> Option<&mut BlockInstance> {
        self.roots.iter_mut().find_map(|r| r.block.find_mut(id))
    }

    fn target(&mut self, id: BlockId) -> Result<&mut BlockInstance, PlacementError> {
        self.find_mut(id).ok_or(PlacementError::BlockNotFound(id))
    }

    /// Levels between `id` and the root it hangs from.
    fn depth_of(&self, id: BlockId) -> Result<usize, PlacementError> {
        self.roots
            .iter()
            .find_map(|r| r.block.depth_of(id))
            .ok_or(PlacementError::BlockNotFound(id))
    }

    pub fn set_literal(&mut self, id: BlockId, slot: &str, text: impl Into<String>) -> Result<(), PlacementError> {
        let registry = self.registry;
        self.target(id)?.set_literal(slot, text, registry)
    }

    pub fn insert_reporter(
        &mut self,
        id: BlockId,
        slot: &str,
        reporter: BlockInstance,
    ) -> Result<(), PlacementError> {
        check_nesting(self.depth_of(id)?, &reporter)?;
        let registry = self.registry;
        self.target(id)?.insert_reporter(slot, reporter, registry)
    }

    pub fn clear_slot(&mut self, id: BlockId, slot: &str) -> Result<Option<SlotValue>, PlacementError> {
        Ok(self.target(id)?.clear_slot(slot))
    }

    pub fn push_child(&mut self, parent: BlockId, child: BlockInstance) -> Result<(), PlacementError> {
        check_nesting(self.depth_of(parent)?, &child)?;
        let registry = self.registry;
        self.target(parent)?.push_child(child, registry)
    }

    pub fn insert_child(
        &mut self,
        parent: BlockId,
        index: usize,
        child: BlockInstance,
    ) -> Result<(), PlacementError> {
        check_nesting(self.depth_of(parent)?, &child)?;
        let registry = self.registry;
        self.target(parent)?.insert_child(index, child, registry)
    }

    pub fn remove_child(&mut self, parent: BlockId, index: usize) -> Result<BlockInstance, PlacementError> {
        self.target(parent)?.remove_child(index)
    }

    pub fn move_child(&mut self, parent: BlockId, from: usize, to: usize) -> Result<(), PlacementError> {
        self.target(parent)?.move_child(from, to)
    }

    /// Remove every block and asset.
    pub fn clear(&mut self) {
        self.roots.clear();
        self.assets = AssetStore::new();
    }

    /// Total number of placed blocks, nested ones included.
    pub fn block_count(&self) -> usize {
        self.roots.iter().map(|r| r.block.count()).sum()
    }

    pub fn compile(&self) -> Program {
        runner::assemble(self.roots.iter().map(|r| &r.block), self.registry)
    }

    /// Run every root as one program against `host`. A seed makes sprite
    /// placement reproducible.
    pub fn run(&self, host: &mut dyn Host, seed: Option<u64>) -> RunReport {
        let mut runtime = Runtime::new(host, &self.assets);
        if let Some(seed) = seed {
            runtime = runtime.with_seed(seed);
        }
        runner::run(self.roots.iter().map(|r| &r.block), self.registry, &mut runtime)
    }

    /// One line per block: roots with their position, children indented
    /// under their container.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for placed in &self.roots {
            let _ = writeln!(
                out,
                "({}, {}) {}",
                placed.x,
                placed.y,
                render_label(&placed.block, self.registry)
            );
            outline_children(&placed.block, self.registry, 1, &mut out);
        }
        out
    }
}

fn outline_children(block: &BlockInstance, registry: &Registry, level: usize, out: &mut String) {
    for child in block.children() {
        let _ = writeln!(out, "{}{}", "  ".repeat(level), render_label(child, registry));
        outline_children(child, registry, level + 1, out);
    }
}

/// The block as it reads on the canvas: labels, with slot contents in
/// brackets and nested reporters in parentheses.
pub fn render_label(block: &BlockInstance, registry: &Registry) -> String {
    let Some(def) = registry.lookup(&block.block_type) else {
        return format!("Unknown block type: {}", block.block_type);
    };
    def.format
        .iter()
        .map(|token| match token {
            FormatToken::Label(text) => text.to_string(),
            FormatToken::Slot { name, .. } => match block.slot(name) {
                Some(SlotValue::Literal(text)) => format!("[{}]", text),
                Some(SlotValue::Reporter(reporter)) => format!("({})", render_label(reporter, registry)),
                None => format!(
                    "[{}]",
                    def.default_for(name).map(|d| d.as_text()).unwrap_or_default()
                ),
            },
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Palette entries in order: type id, category and label with defaults.
pub fn palette(registry: &Registry) -> Vec<(&'static str, String, String)> {
    registry
        .definitions()
        .iter()
        .map(|def| {
            let preview = BlockInstance::new(BlockId(0), def.type_id());
            (
                def.type_id(),
                def.category.to_string(),
                render_label(&preview, registry),
            )
        })
        .collect()
}
