//! Host-to-scene event queue.
//!
//! The host pushes raw events as they arrive; the scene drains the queue once
//! per frame. Pushing is only accepted while the corresponding listener is
//! registered, so events that race an unmount are dropped.

use std::collections::VecDeque;

/// Kinds of host listeners the scene registers on mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    /// Window/container resize.
    Resize,
    /// Pointer movement over the canvas.
    PointerMove,
    /// Click on the canvas.
    Click,
}

impl ListenerKind {
    /// All listener kinds, in registration order.
    pub const ALL: [ListenerKind; 3] = [
        ListenerKind::Resize,
        ListenerKind::PointerMove,
        ListenerKind::Click,
    ];
}

/// A single host event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Pointer moved to a client position in viewport pixels.
    PointerMoved {
        /// Client x in viewport pixels.
        client_x: f32,
        /// Client y in viewport pixels.
        client_y: f32,
    },
    /// Primary click at the last known pointer position.
    Click,
    /// Container resized to the given pixel dimensions.
    Resized {
        /// New width in pixels.
        width: u32,
        /// New height in pixels.
        height: u32,
    },
}

impl InputEvent {
    /// The listener that must be registered for this event to be accepted.
    pub fn listener(&self) -> ListenerKind {
        match self {
            InputEvent::PointerMoved { .. } => ListenerKind::PointerMove,
            InputEvent::Click => ListenerKind::Click,
            InputEvent::Resized { .. } => ListenerKind::Resize,
        }
    }
}

/// FIFO of pending host events plus the set of registered listeners.
#[derive(Debug, Default)]
pub struct InputQueue {
    events: VecDeque<InputEvent>,
    listeners: Vec<ListenerKind>,
}

impl InputQueue {
    /// Creates an empty queue with no listeners registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Registering twice has no effect.
    pub fn register(&mut self, kind: ListenerKind) {
        if !self.listeners.contains(&kind) {
            self.listeners.push(kind);
        }
    }

    /// Register every listener kind.
    pub fn register_all(&mut self) {
        for kind in ListenerKind::ALL {
            self.register(kind);
        }
    }

    /// Remove every listener and drop pending events. Returns how many
    /// listeners were removed.
    pub fn remove_all(&mut self) -> usize {
        let removed = self.listeners.len();
        self.listeners.clear();
        self.events.clear();
        removed
    }

    /// Whether the given listener is registered.
    pub fn is_registered(&self, kind: ListenerKind) -> bool {
        self.listeners.contains(&kind)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Queue an event. Returns `false` if its listener is not registered.
    pub fn push(&mut self, event: InputEvent) -> bool {
        if !self.is_registered(event.listener()) {
            tracing::trace!(?event, "input event dropped: listener not registered");
            return false;
        }
        self.events.push_back(event);
        true
    }

    /// Take all pending events in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
        self.events.drain(..)
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events are pending.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
