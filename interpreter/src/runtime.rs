use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::assets::AssetStore;
use crate::host::Host;

/// Sprites are always drawn at this size.
pub const SPRITE_SIZE: f64 = 100.0;
/// Gap kept between a sprite and the canvas edge.
pub const SPRITE_MARGIN: f64 = 10.0;

/// Run-scoped state handed to the interpreter: where side effects go, which
/// assets generated code may reference, and the random source for sprite
/// placement. Nothing here outlives a single run.
pub struct Runtime<'a> {
    pub host: &'a mut dyn Host,
    pub assets: &'a AssetStore,
    rng: StdRng,
}

impl<'a> Runtime<'a> {
    pub fn new(host: &'a mut dyn Host, assets: &'a AssetStore) -> Self {
        Runtime {
            host,
            assets,
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a fixed seed so sprite placement is reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Random top-left corner for a sprite that keeps it inside the canvas.
    pub fn sprite_position(&mut self, canvas_width: f64, canvas_height: f64) -> (f64, f64) {
        let x = SPRITE_MARGIN + self.unit() * (canvas_width - SPRITE_SIZE - SPRITE_MARGIN).max(0.0);
        let y = SPRITE_MARGIN + self.unit() * (canvas_height - SPRITE_SIZE - SPRITE_MARGIN).max(0.0);
        (x, y)
    }

    fn unit(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }
}
