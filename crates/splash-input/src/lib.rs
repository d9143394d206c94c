//! Input port for the splash scene: pointer state in normalized device
//! coordinates and a per-frame event queue fed by the host.

pub mod pointer;
pub mod queue;

pub use pointer::{CanvasRect, PointerState};
pub use queue::{InputEvent, InputQueue, ListenerKind};
