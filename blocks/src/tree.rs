use std::collections::BTreeMap;
use std::fmt;

use crate::registry::{Registry, Shape};

/// Most blocks a chain of containers and reporters may stack, root included.
/// Keeps generated programs inside what the parser and interpreter accept.
pub const MAX_NESTING: usize = 32;

/// Identifies a placed block within one workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u64);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an input slot currently holds.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    /// Text as typed into the slot's field.
    Literal(String),
    /// A nested reporter, owned by the slot.
    Reporter(Box<BlockInstance>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlacementError {
    UnknownBlockType(String),
    /// A non-reporter was dropped into an input slot.
    NotAReporter(String),
    /// A reporter was placed as a root or as a container child.
    ReporterNotAllowed(String),
    NotAContainer(String),
    UnknownSlot { block_type: String, slot: String },
    BlockNotFound(BlockId),
    IndexOutOfRange { index: usize, len: usize },
    /// The edit would stack blocks deeper than `limit`.
    TooDeep { limit: usize },
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::UnknownBlockType(t) => write!(f, "unknown block type: {}", t),
            PlacementError::NotAReporter(t) => {
                write!(f, "only reporter blocks fit in an input slot, not '{}'", t)
            }
            PlacementError::ReporterNotAllowed(t) => write!(
                f,
                "reporter block '{}' can only be placed in an input slot",
                t
            ),
            PlacementError::NotAContainer(t) => write!(f, "block '{}' cannot hold child blocks", t),
            PlacementError::UnknownSlot { block_type, slot } => {
                write!(f, "block '{}' has no input slot '{}'", block_type, slot)
            }
            PlacementError::BlockNotFound(id) => write!(f, "no block {} in the workspace", id),
            PlacementError::IndexOutOfRange { index, len } => {
                write!(f, "child index {} out of range (block has {} children)", index, len)
            }
            PlacementError::TooDeep { limit } => {
                write!(f, "blocks cannot be nested more than {} deep", limit)
            }
        }
    }
}

impl std::error::Error for PlacementError {}

/// A placed block: its type, what its slots hold, and (for containers) its
/// children. Slots and children are owned, so dropping an instance drops
/// its whole subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockInstance {
    pub id: BlockId,
    pub block_type: String,
    slots: BTreeMap<String, SlotValue>,
    children: Vec<BlockInstance>,
}

impl BlockInstance {
    /// A bare instance with no slots filled. Unfilled slots compile to the
    /// definition's defaults.
    pub fn new(id: BlockId, block_type: impl Into<String>) -> Self {
        BlockInstance {
            id,
            block_type: block_type.into(),
            slots: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn shape(&self, registry: &Registry) -> Option<Shape> {
        registry.lookup(&self.block_type).map(|d| d.shape)
    }

    pub fn slot(&self, name: &str) -> Option<&SlotValue> {
        self.slots.get(name)
    }

    pub fn slots(&self) -> impl Iterator<Item = (&str, &SlotValue)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn children(&self) -> &[BlockInstance] {
        &self.children
    }

    fn check_slot(&self, slot: &str, registry: &Registry) -> Result<(), PlacementError> {
        let def = registry
            .lookup(&self.block_type)
            .ok_or_else(|| PlacementError::UnknownBlockType(self.block_type.clone()))?;
        if def.has_slot(slot) {
            Ok(())
        } else {
            Err(PlacementError::UnknownSlot {
                block_type: self.block_type.clone(),
                slot: slot.to_string(),
            })
        }
    }

    /// Fill a slot the definition is known to have.
    pub(crate) fn set_default(&mut self, slot: &str, text: String) {
        self.slots.insert(slot.to_string(), SlotValue::Literal(text));
    }

    /// Set a slot's literal text. A reporter previously in the slot is dropped.
    pub fn set_literal(
        &mut self,
        slot: &str,
        text: impl Into<String>,
        registry: &Registry,
    ) -> Result<(), PlacementError> {
        self.check_slot(slot, registry)?;
        self.slots
            .insert(slot.to_string(), SlotValue::Literal(text.into()));
        Ok(())
    }

    /// Drop a reporter into a slot, replacing whatever was there.
    pub fn insert_reporter(
        &mut self,
        slot: &str,
        reporter: BlockInstance,
        registry: &Registry,
    ) -> Result<(), PlacementError> {
        self.check_slot(slot, registry)?;
        if reporter.shape(registry) != Some(Shape::Reporter) {
            return Err(PlacementError::NotAReporter(reporter.block_type));
        }
        check_nesting(0, &reporter)?;
        self.slots
            .insert(slot.to_string(), SlotValue::Reporter(Box::new(reporter)));
        Ok(())
    }

    /// Empty a slot so it compiles to the definition default again.
    pub fn clear_slot(&mut self, slot: &str) -> Option<SlotValue> {
        self.slots.remove(slot)
    }

    fn check_child(&self, child: &BlockInstance, registry: &Registry) -> Result<(), PlacementError> {
        if self.shape(registry) != Some(Shape::Container) {
            return Err(PlacementError::NotAContainer(self.block_type.clone()));
        }
        if child.shape(registry) == Some(Shape::Reporter) {
            return Err(PlacementError::ReporterNotAllowed(child.block_type.clone()));
        }
        check_nesting(0, child)
    }

    pub fn push_child(
        &mut self,
        child: BlockInstance,
        registry: &Registry,
    ) -> Result<(), PlacementError> {
        self.check_child(&child, registry)?;
        self.children.push(child);
        Ok(())
    }

    pub fn insert_child(
        &mut self,
        index: usize,
        child: BlockInstance,
        registry: &Registry,
    ) -> Result<(), PlacementError> {
        self.check_child(&child, registry)?;
        if index > self.children.len() {
            return Err(PlacementError::IndexOutOfRange {
                index,
                len: self.children.len(),
            });
        }
        self.children.insert(index, child);
        Ok(())
    }

    pub fn remove_child(&mut self, index: usize) -> Result<BlockInstance, PlacementError> {
        if index >= self.children.len() {
            return Err(PlacementError::IndexOutOfRange {
                index,
                len: self.children.len(),
            });
        }
        Ok(self.children.remove(index))
    }

    /// Reorder: the child at `from` ends up at position `to`.
    pub fn move_child(&mut self, from: usize, to: usize) -> Result<(), PlacementError> {
        let len = self.children.len();
        if from >= len || to >= len {
            return Err(PlacementError::IndexOutOfRange {
                index: from.max(to),
                len,
            });
        }
        let child = self.children.remove(from);
        self.children.insert(to, child);
        Ok(())
    }

    /// Find a block anywhere in this subtree, including nested reporters.
    pub fn find(&self, id: BlockId) -> Option<&BlockInstance> {
        if self.id == id {
            return Some(self);
        }
        self.slots
            .values()
            .filter_map(|slot| match slot {
                SlotValue::Reporter(reporter) => Some(reporter.as_ref()),
                SlotValue::Literal(_) => None,
            })
            .chain(self.children.iter())
            .find_map(|block| block.find(id))
    }

    pub fn find_mut(&mut self, id: BlockId) -> Option<&mut BlockInstance> {
        if self.id == id {
            return Some(self);
        }
        for slot in self.slots.values_mut() {
            if let SlotValue::Reporter(reporter) = slot {
                if let Some(found) = reporter.find_mut(id) {
                    return Some(found);
                }
            }
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Detach the block `id` from somewhere below this one. A removed
    /// reporter leaves its slot unfilled.
    pub fn detach(&mut self, id: BlockId) -> Option<BlockInstance> {
        if let Some(index) = self.children.iter().position(|c| c.id == id) {
            return Some(self.children.remove(index));
        }
        let slot_name = self.slots.iter().find_map(|(name, slot)| match slot {
            SlotValue::Reporter(reporter) if reporter.id == id => Some(name.clone()),
            _ => None,
        });
        if let Some(name) = slot_name {
            if let Some(SlotValue::Reporter(reporter)) = self.slots.remove(&name) {
                return Some(*reporter);
            }
        }
        for slot in self.slots.values_mut() {
            if let SlotValue::Reporter(reporter) = slot {
                if let Some(found) = reporter.detach(id) {
                    return Some(found);
                }
            }
        }
        self.children.iter_mut().find_map(|child| child.detach(id))
    }

    /// Number of blocks in this subtree, this one included.
    pub fn count(&self) -> usize {
        let reporters: usize = self
            .slots
            .values()
            .map(|slot| match slot {
                SlotValue::Reporter(reporter) => reporter.count(),
                SlotValue::Literal(_) => 0,
            })
            .sum();
        let children: usize = self.children.iter().map(BlockInstance::count).sum();
        1 + reporters + children
    }

    /// Blocks on the longest path down from this one, this one included.
    pub fn height(&self) -> usize {
        let reporters = self.slots.values().filter_map(|slot| match slot {
            SlotValue::Reporter(reporter) => Some(reporter.height()),
            SlotValue::Literal(_) => None,
        });
        let children = self.children.iter().map(BlockInstance::height);
        1 + reporters.chain(children).max().unwrap_or(0)
    }

    /// How many levels below this block `id` sits, if it is in the subtree.
    pub fn depth_of(&self, id: BlockId) -> Option<usize> {
        if self.id == id {
            return Some(0);
        }
        self.slots
            .values()
            .filter_map(|slot| match slot {
                SlotValue::Reporter(reporter) => Some(reporter.as_ref()),
                SlotValue::Literal(_) => None,
            })
            .chain(self.children.iter())
            .find_map(|block| block.depth_of(id))
            .map(|depth| depth + 1)
    }

    /// Raw access for deserialization, which validates shapes itself.
    pub(crate) fn from_parts(
        id: BlockId,
        block_type: String,
        slots: BTreeMap<String, SlotValue>,
        children: Vec<BlockInstance>,
    ) -> Self {
        BlockInstance {
            id,
            block_type,
            slots,
            children,
        }
    }
}

/// Check that `block` fits below a parent sitting `parent_depth` levels
/// under its root.
pub(crate) fn check_nesting(parent_depth: usize, block: &BlockInstance) -> Result<(), PlacementError> {
    if parent_depth + 1 + block.height() > MAX_NESTING {
        return Err(PlacementError::TooDeep { limit: MAX_NESTING });
    }
    Ok(())
}
