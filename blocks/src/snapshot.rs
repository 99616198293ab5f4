//! Structural save and restore: tree shape, literal slot values, root
//! positions and asset data, as versioned JSON.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use interpreter::{Asset, AssetStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::registry::{Registry, Shape};
use crate::tree::{BlockId, BlockInstance, MAX_NESTING, PlacementError, SlotValue};
use crate::workspace::{PlacedBlock, Workspace, snap_to_grid};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    #[serde(default)]
    pub roots: Vec<RootSnapshot>,
    /// Asset name to base64 image data.
    #[serde(default)]
    pub assets: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootSnapshot {
    pub x: i64,
    pub y: i64,
    pub block: BlockSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub slots: BTreeMap<String, SlotSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BlockSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotSnapshot {
    Literal(String),
    Reporter(Box<BlockSnapshot>),
}

#[derive(Debug)]
pub enum SnapshotError {
    Json(serde_json::Error),
    UnsupportedVersion(u32),
    Asset {
        name: String,
        source: base64::DecodeError,
    },
    /// The saved tree breaks a placement rule; `path` locates the block.
    Shape {
        path: String,
        problem: PlacementError,
    },
    Token(base64::DecodeError),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Json(e) => write!(f, "malformed snapshot: {}", e),
            SnapshotError::UnsupportedVersion(v) => write!(
                f,
                "unsupported snapshot version {} (expected {})",
                v, SNAPSHOT_VERSION
            ),
            SnapshotError::Asset { name, source } => {
                write!(f, "asset '{}' is not valid base64: {}", name, source)
            }
            SnapshotError::Shape { path, problem } => write!(f, "at {}: {}", path, problem),
            SnapshotError::Token(e) => write!(f, "malformed share token: {}", e),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Json(e) => Some(e),
            SnapshotError::Asset { source, .. } => Some(source),
            SnapshotError::Shape { problem, .. } => Some(problem),
            SnapshotError::Token(e) => Some(e),
            SnapshotError::UnsupportedVersion(_) => None,
        }
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(error: serde_json::Error) -> Self {
        SnapshotError::Json(error)
    }
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Snapshot, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// URL-safe encoding of the compact JSON, for putting a project in a link.
    pub fn to_share_token(&self) -> Result<String, SnapshotError> {
        Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(self)?))
    }

    pub fn from_share_token(token: &str) -> Result<Snapshot, SnapshotError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(SnapshotError::Token)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn snapshot_block(block: &BlockInstance) -> BlockSnapshot {
    BlockSnapshot {
        block_type: block.block_type.clone(),
        slots: block
            .slots()
            .map(|(name, value)| {
                let value = match value {
                    SlotValue::Literal(text) => SlotSnapshot::Literal(text.clone()),
                    SlotValue::Reporter(reporter) => {
                        SlotSnapshot::Reporter(Box::new(snapshot_block(reporter)))
                    }
                };
                (name.to_string(), value)
            })
            .collect(),
        children: block.children().iter().map(snapshot_block).collect(),
    }
}

/// Rebuilds blocks from a snapshot, checking placement rules and handing
/// out ids without touching the workspace until everything succeeded.
struct Rebuilder<'r> {
    registry: &'r Registry,
    next_id: u64,
}

impl Rebuilder<'_> {
    fn shape_error(path: &str, problem: PlacementError) -> SnapshotError {
        SnapshotError::Shape {
            path: path.to_string(),
            problem,
        }
    }

    fn shape_of(&self, block: &BlockSnapshot) -> Option<Shape> {
        self.registry.lookup(&block.block_type).map(|d| d.shape)
    }

    fn block(
        &mut self,
        snapshot: &BlockSnapshot,
        path: &str,
        depth: usize,
    ) -> Result<BlockInstance, SnapshotError> {
        if depth >= MAX_NESTING {
            return Err(Self::shape_error(
                path,
                PlacementError::TooDeep { limit: MAX_NESTING },
            ));
        }
        let id = BlockId(self.next_id);
        self.next_id += 1;

        let def = self.registry.lookup(&snapshot.block_type);
        let mut slots = BTreeMap::new();
        for (name, value) in &snapshot.slots {
            let slot_path = format!("{}.slots.{}", path, name);
            // Unknown types keep whatever slots they were saved with.
            if let Some(def) = def {
                if !def.has_slot(name) {
                    return Err(Self::shape_error(
                        &slot_path,
                        PlacementError::UnknownSlot {
                            block_type: snapshot.block_type.clone(),
                            slot: name.clone(),
                        },
                    ));
                }
            }
            let value = match value {
                SlotSnapshot::Literal(text) => SlotValue::Literal(text.clone()),
                SlotSnapshot::Reporter(reporter) => {
                    if self.shape_of(reporter) != Some(Shape::Reporter) {
                        return Err(Self::shape_error(
                            &slot_path,
                            PlacementError::NotAReporter(reporter.block_type.clone()),
                        ));
                    }
                    SlotValue::Reporter(Box::new(self.block(reporter, &slot_path, depth + 1)?))
                }
            };
            slots.insert(name.clone(), value);
        }

        if !snapshot.children.is_empty() && def.map(|d| d.shape) != Some(Shape::Container) {
            return Err(Self::shape_error(
                path,
                PlacementError::NotAContainer(snapshot.block_type.clone()),
            ));
        }
        let mut children = Vec::with_capacity(snapshot.children.len());
        for (index, child) in snapshot.children.iter().enumerate() {
            let child_path = format!("{}.children[{}]", path, index);
            if self.shape_of(child) == Some(Shape::Reporter) {
                return Err(Self::shape_error(
                    &child_path,
                    PlacementError::ReporterNotAllowed(child.block_type.clone()),
                ));
            }
            children.push(self.block(child, &child_path, depth + 1)?);
        }

        Ok(BlockInstance::from_parts(
            id,
            snapshot.block_type.clone(),
            slots,
            children,
        ))
    }
}

impl Workspace {
    pub fn snapshot(&self) -> Snapshot {
        let mut assets = BTreeMap::new();
        for asset in self.assets.iter() {
            // First asset with a name wins, matching lookups.
            assets
                .entry(asset.name.clone())
                .or_insert_with(|| STANDARD.encode(&asset.data));
        }
        Snapshot {
            version: SNAPSHOT_VERSION,
            roots: self
                .roots
                .iter()
                .map(|placed| RootSnapshot {
                    x: placed.x,
                    y: placed.y,
                    block: snapshot_block(&placed.block),
                })
                .collect(),
            assets,
        }
    }

    /// Replace the workspace contents with `snapshot`. Either everything is
    /// restored or, on error, the workspace is left exactly as it was.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }

        let mut assets = AssetStore::new();
        for (name, data) in &snapshot.assets {
            let data = STANDARD.decode(data).map_err(|source| SnapshotError::Asset {
                name: name.clone(),
                source,
            })?;
            assets.add(Asset::new(name.clone(), data));
        }

        let mut rebuilder = Rebuilder {
            registry: self.registry,
            next_id: self.next_id,
        };
        let mut roots = Vec::with_capacity(snapshot.roots.len());
        for (index, root) in snapshot.roots.iter().enumerate() {
            let path = format!("roots[{}]", index);
            if rebuilder.shape_of(&root.block) == Some(Shape::Reporter) {
                return Err(Rebuilder::shape_error(
                    &path,
                    PlacementError::ReporterNotAllowed(root.block.block_type.clone()),
                ));
            }
            roots.push(PlacedBlock {
                x: snap_to_grid(root.x as f64),
                y: snap_to_grid(root.y as f64),
                block: rebuilder.block(&root.block, &path, 0)?,
            });
        }

        debug!(
            target: "blocks",
            roots = roots.len(),
            assets = assets.len(),
            "restored workspace"
        );
        self.roots = roots;
        self.assets = assets;
        self.next_id = rebuilder.next_id;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        self.snapshot().to_json()
    }

    /// Parse and restore a saved workspace. Faults are logged and leave the
    /// workspace unchanged.
    pub fn load_json(&mut self, json: &str) -> Result<(), SnapshotError> {
        let result = Snapshot::from_json(json).and_then(|snapshot| self.restore(&snapshot));
        if let Err(err) = &result {
            warn!(target: "blocks", error = %err, "could not restore workspace");
        }
        result
    }

    pub fn share_token(&self) -> Result<String, SnapshotError> {
        self.snapshot().to_share_token()
    }

    pub fn load_share_token(&mut self, token: &str) -> Result<(), SnapshotError> {
        let result = Snapshot::from_share_token(token).and_then(|snapshot| self.restore(&snapshot));
        if let Err(err) = &result {
            warn!(target: "blocks", error = %err, "could not restore shared workspace");
        }
        result
    }
}
