//! Pointer interaction with the map surface.
//!
//! Pointer handling is done in several steps:
//! 1. The host converts an OS/browser event into a [`PointerEvent`]. If it knows what is under
//!    the pointer (the map surface or one of the markers) it sets [`PointerEvent::target`],
//!    otherwise the rendering engine is asked to hit-test the position.
//! 2. The [`LiveMap`](crate::LiveMap) adds the geographic location under the pointer and gives
//!    the event to the [`GestureDisambiguator`], which turns event sequences into
//!    [`GestureOutcome`]s: a quick tap, a confirmed hold, a secondary action.
//! 3. The outcomes are applied to the beacon store, the annotation form and the popups.

use pinged_types::geo::GeoPoint2d;
use pinged_types::screen::ScreenPoint;

mod gesture;
mod scheduler;

pub use gesture::{
    CancelReason, GestureConfig, GestureDisambiguator, GestureOutcome, GestureSession,
    GestureState, HoldToken,
};
pub use scheduler::{DummyScheduler, HoldScheduler, ManualScheduler};

use crate::engine::MarkerKey;

/// Pointer button.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MouseButton {
    /// Primary button or a single touch contact.
    Left,
    /// Middle button.
    Middle,
    /// Secondary button. Also used for context actions such as a two-finger tap.
    Right,
    /// Any other button.
    Other,
}

/// What is under the pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PointerTarget {
    /// Empty map surface.
    Map,
    /// One of the markers.
    Marker(MarkerKey),
}

/// Kind of a pointer event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PointerEventKind {
    /// Button pressed or touch started.
    Down(MouseButton),
    /// Pointer moved.
    Move,
    /// Button released or touch ended.
    Up(MouseButton),
    /// Pointer left the map surface or the platform cancelled the interaction.
    Cancel,
}

/// Pointer event delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    /// Kind of the event.
    pub kind: PointerEventKind,
    /// Pointer position in pixels from the top-left corner of the map surface.
    pub position: ScreenPoint,
    /// Geographic location under the pointer. Filled by the live map from the engine projection
    /// if not set by the host.
    pub location: Option<GeoPoint2d>,
    /// What is under the pointer. Hit-tested by the engine if not set by the host.
    pub target: Option<PointerTarget>,
    /// Number of active touch contacts. `1` for mouse events.
    pub contacts: u32,
}

impl PointerEvent {
    fn new(kind: PointerEventKind, position: ScreenPoint) -> Self {
        Self {
            kind,
            position,
            location: None,
            target: None,
            contacts: 1,
        }
    }

    /// Button pressed at the position.
    pub fn down(button: MouseButton, position: ScreenPoint) -> Self {
        Self::new(PointerEventKind::Down(button), position)
    }

    /// Pointer moved to the position.
    pub fn moved(position: ScreenPoint) -> Self {
        Self::new(PointerEventKind::Move, position)
    }

    /// Button released at the position.
    pub fn up(button: MouseButton, position: ScreenPoint) -> Self {
        Self::new(PointerEventKind::Up(button), position)
    }

    /// Interaction cancelled.
    pub fn cancel(position: ScreenPoint) -> Self {
        Self::new(PointerEventKind::Cancel, position)
    }

    /// Sets the target of the event.
    pub fn on(mut self, target: PointerTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// Sets the geographic location under the pointer.
    pub fn at(mut self, location: GeoPoint2d) -> Self {
        self.location = Some(location);
        self
    }

    /// Sets the number of touch contacts.
    pub fn with_contacts(mut self, contacts: u32) -> Self {
        self.contacts = contacts;
        self
    }
}
