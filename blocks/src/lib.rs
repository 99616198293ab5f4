//! Block programming editor core: a registry of block definitions, the
//! block tree users assemble, the compiler that turns the tree into block
//! script text, and the runner that executes it.

pub mod codegen;
pub mod compiler;
pub mod registry;
pub mod runner;
pub mod snapshot;
pub mod tree;
pub mod workspace;

pub use compiler::{Fragment, compile};
pub use registry::{BlockDefinition, BlockKind, Registry, Shape};
pub use runner::{Program, RunReport, assemble, run};
pub use snapshot::{Snapshot, SnapshotError};
pub use tree::{BlockId, BlockInstance, MAX_NESTING, PlacementError, SlotValue};
pub use workspace::{PlacedBlock, Workspace, palette, render_label};
