//! The engine context handed to the scene every frame.
//!
//! Everything a frame needs from outside the scene (input, timing, assets)
//! travels in one explicit [`EngineContext`] value rather than a global
//! application object.
//!
//! ```ignore
//! let mut ctx = EngineContext::new();
//! loop {
//!     ctx.time.update();
//!     // platform layer: ctx.input.press_mouse(..), ctx.input.set_cursor(..)
//!     scene.frame(&mut ctx, &mut renderer);
//!     ctx.input.end_frame();
//! }
//! ```

use crate::asset::AssetRegistry;
use crate::input::InputState;
use crate::time::Time;

#[derive(Default)]
pub struct EngineContext {
    pub input: InputState,
    pub time: Time,
    pub assets: AssetRegistry,
}

impl EngineContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assets(mut self, assets: AssetRegistry) -> Self {
        self.assets = assets;
        self
    }
}
