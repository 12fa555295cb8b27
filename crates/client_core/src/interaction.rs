use shared::domain::Point;

use crate::{
    render::{DrawingSurface, ScreenRect, Viewport},
    scene::SceneModel,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging { last: Point },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// Only starts a drag when it lands on the drawing surface.
    Down(Point),
    /// Tracked anywhere in the window while dragging.
    Move(Point),
    Up,
}

/// Drag-to-pan. Pointer deltas go 1:1 into the scene's view offset.
#[derive(Debug, Clone, Copy)]
pub struct InteractionController {
    state: DragState,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            state: DragState::Idle,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Feeds one pointer event. Returns true when the view offset moved.
    pub fn handle(&mut self, event: PointerEvent, surface: ScreenRect, scene: &mut SceneModel) -> bool {
        match event {
            PointerEvent::Down(pos) => {
                if surface.contains(pos) {
                    self.state = DragState::Dragging { last: pos };
                }
                false
            }
            PointerEvent::Move(pos) => {
                let DragState::Dragging { last } = self.state else {
                    return false;
                };
                self.state = DragState::Dragging { last: pos };
                let delta = pos - last;
                scene.pan_by(delta);
                delta != Point::ORIGIN
            }
            PointerEvent::Up => {
                self.state = DragState::Idle;
                false
            }
        }
    }

    /// Resizes the surface to the container. Returns true when a redraw is due.
    pub fn on_resize(&self, surface: &mut DrawingSurface, container: Viewport) -> bool {
        surface.fit_to(container)
    }
}
