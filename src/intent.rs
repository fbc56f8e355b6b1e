//! Input intent components.
//!
//! Intents carry pre-resolved player (or AI) input into the controller: a
//! movement axis, look deltas and a handful of button levels. Button edges are
//! derived by the controller from the previous tick's levels, so callers only
//! ever write the current state of each button.

use bevy::prelude::*;

/// Threshold below which an axis counts as idle.
const AXIS_DEADZONE: f32 = 0.001;

/// Locomotion input for one body.
///
/// # Example
///
/// ```rust
/// use freerun_controller::prelude::*;
///
/// let mut intent = MovementIntent::new();
/// intent.set_move(1.0, 0.0);
/// assert!(intent.is_moving());
/// assert!(intent.is_moving_forward());
///
/// intent.set_jump_pressed(true);
/// assert!(intent.jump_just_pressed());
///
/// intent.clear();
/// assert!(!intent.is_moving());
/// ```
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct MovementIntent {
    /// Forward axis (-1.0 = back, 1.0 = forward).
    pub forward: f32,
    /// Strafe axis (-1.0 = left, 1.0 = right).
    pub right: f32,
    /// Accumulated look delta (x = yaw, y = pitch) since the last tick.
    ///
    /// Positive x turns right, positive y looks up. Consumed by each tick.
    pub look_delta: Vec2,
    /// Whether the jump button is held.
    pub jump_pressed: bool,
    /// Whether the slide button is held.
    pub slide_pressed: bool,
    /// Previous tick's jump level (for edge detection).
    pub(crate) jump_pressed_prev: bool,
    /// Previous tick's slide level (for edge detection).
    pub(crate) slide_pressed_prev: bool,
}

impl MovementIntent {
    /// Create a new empty movement intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the movement axis. Both components are clamped to `[-1, 1]`.
    pub fn set_move(&mut self, forward: f32, right: f32) {
        self.forward = forward.clamp(-1.0, 1.0);
        self.right = right.clamp(-1.0, 1.0);
    }

    /// Add a look delta. Deltas accumulate until the next tick consumes them.
    pub fn add_look(&mut self, delta: Vec2) {
        self.look_delta += delta;
    }

    /// Set the jump button level.
    pub fn set_jump_pressed(&mut self, pressed: bool) {
        self.jump_pressed = pressed;
    }

    /// Set the slide button level.
    pub fn set_slide_pressed(&mut self, pressed: bool) {
        self.slide_pressed = pressed;
    }

    /// Clear the movement axis.
    pub fn clear(&mut self) {
        self.forward = 0.0;
        self.right = 0.0;
    }

    /// Check if there is any movement input.
    pub fn is_moving(&self) -> bool {
        self.forward.abs() > AXIS_DEADZONE || self.right.abs() > AXIS_DEADZONE
    }

    /// Check if the forward axis is pushed forward.
    pub fn is_moving_forward(&self) -> bool {
        self.forward > AXIS_DEADZONE
    }

    /// Jump went from released to held since the last tick.
    pub fn jump_just_pressed(&self) -> bool {
        self.jump_pressed && !self.jump_pressed_prev
    }

    /// Slide went from released to held since the last tick.
    pub fn slide_just_pressed(&self) -> bool {
        self.slide_pressed && !self.slide_pressed_prev
    }

    /// Slide went from held to released since the last tick.
    pub fn slide_just_released(&self) -> bool {
        !self.slide_pressed && self.slide_pressed_prev
    }

    /// Take the accumulated look delta, leaving zero behind.
    pub(crate) fn take_look_delta(&mut self) -> Vec2 {
        std::mem::take(&mut self.look_delta)
    }

    /// Remember this tick's button levels for the next tick's edges.
    pub(crate) fn latch(&mut self) {
        self.jump_pressed_prev = self.jump_pressed;
        self.slide_pressed_prev = self.slide_pressed;
    }
}

/// One of the two grapple hooks.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookSide {
    Left,
    Right,
}

impl HookSide {
    /// Both hooks, left first.
    pub const BOTH: [HookSide; 2] = [HookSide::Left, HookSide::Right];

    /// Slot index (left = 0, right = 1).
    pub fn index(self) -> usize {
        match self {
            HookSide::Left => 0,
            HookSide::Right => 1,
        }
    }

    /// The other hook.
    pub fn other(self) -> Self {
        match self {
            HookSide::Left => HookSide::Right,
            HookSide::Right => HookSide::Left,
        }
    }
}

/// Grapple input for one body.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct GrappleIntent {
    /// Hook button levels, indexed by [`HookSide::index`].
    pub hook_pressed: [bool; 2],
    /// Whether the prediction modifier is held.
    pub prediction_held: bool,
    /// Previous tick's hook levels (for edge detection).
    pub(crate) hook_pressed_prev: [bool; 2],
}

impl GrappleIntent {
    /// Create a new empty grapple intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a hook button level.
    pub fn set_hook_pressed(&mut self, side: HookSide, pressed: bool) {
        self.hook_pressed[side.index()] = pressed;
    }

    /// Set the prediction modifier level.
    pub fn set_prediction_held(&mut self, held: bool) {
        self.prediction_held = held;
    }

    /// Check if a hook button is held.
    pub fn is_hook_pressed(&self, side: HookSide) -> bool {
        self.hook_pressed[side.index()]
    }

    /// Hook button went from released to held since the last tick.
    pub fn hook_just_pressed(&self, side: HookSide) -> bool {
        let i = side.index();
        self.hook_pressed[i] && !self.hook_pressed_prev[i]
    }

    /// Hook button went from held to released since the last tick.
    pub fn hook_just_released(&self, side: HookSide) -> bool {
        let i = side.index();
        !self.hook_pressed[i] && self.hook_pressed_prev[i]
    }

    /// Remember this tick's button levels for the next tick's edges.
    pub(crate) fn latch(&mut self) {
        self.hook_pressed_prev = self.hook_pressed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== MovementIntent Tests ====================

    #[test]
    fn movement_intent_new() {
        let intent = MovementIntent::new();
        assert_eq!(intent.forward, 0.0);
        assert_eq!(intent.right, 0.0);
        assert_eq!(intent.look_delta, Vec2::ZERO);
        assert!(!intent.jump_pressed);
        assert!(!intent.slide_pressed);
    }

    #[test]
    fn movement_intent_set_move_clamps() {
        let mut intent = MovementIntent::new();
        intent.set_move(0.5, -0.25);
        assert_eq!(intent.forward, 0.5);
        assert_eq!(intent.right, -0.25);

        intent.set_move(5.0, -5.0);
        assert_eq!(intent.forward, 1.0);
        assert_eq!(intent.right, -1.0);
    }

    #[test]
    fn movement_intent_is_moving() {
        let mut intent = MovementIntent::new();
        assert!(!intent.is_moving());

        intent.set_move(0.0, 0.5);
        assert!(intent.is_moving());
        assert!(!intent.is_moving_forward());

        intent.set_move(0.0001, 0.0); // Below threshold
        assert!(!intent.is_moving());
    }

    #[test]
    fn jump_edge_fires_once_per_press() {
        let mut intent = MovementIntent::new();
        intent.set_jump_pressed(true);
        assert!(intent.jump_just_pressed());

        intent.latch();
        assert!(!intent.jump_just_pressed());

        intent.set_jump_pressed(false);
        intent.latch();
        intent.set_jump_pressed(true);
        assert!(intent.jump_just_pressed());
    }

    #[test]
    fn slide_release_edge() {
        let mut intent = MovementIntent::new();
        intent.set_slide_pressed(true);
        intent.latch();
        assert!(!intent.slide_just_released());

        intent.set_slide_pressed(false);
        assert!(intent.slide_just_released());
        assert!(!intent.slide_just_pressed());
    }

    #[test]
    fn look_delta_accumulates_until_taken() {
        let mut intent = MovementIntent::new();
        intent.add_look(Vec2::new(1.0, 0.5));
        intent.add_look(Vec2::new(2.0, -0.5));
        assert_eq!(intent.take_look_delta(), Vec2::new(3.0, 0.0));
        assert_eq!(intent.look_delta, Vec2::ZERO);
    }

    // ==================== GrappleIntent Tests ====================

    #[test]
    fn hook_side_helpers() {
        assert_eq!(HookSide::Left.index(), 0);
        assert_eq!(HookSide::Right.index(), 1);
        assert_eq!(HookSide::Left.other(), HookSide::Right);
        assert_eq!(HookSide::BOTH[1], HookSide::Right);
    }

    #[test]
    fn hook_edges_are_independent() {
        let mut intent = GrappleIntent::new();
        intent.set_hook_pressed(HookSide::Left, true);
        assert!(intent.hook_just_pressed(HookSide::Left));
        assert!(!intent.hook_just_pressed(HookSide::Right));

        intent.latch();
        intent.set_hook_pressed(HookSide::Right, true);
        assert!(!intent.hook_just_pressed(HookSide::Left));
        assert!(intent.hook_just_pressed(HookSide::Right));
        assert!(intent.is_hook_pressed(HookSide::Left));

        intent.latch();
        intent.set_hook_pressed(HookSide::Left, false);
        assert!(intent.hook_just_released(HookSide::Left));
        assert!(!intent.hook_just_released(HookSide::Right));
    }
}
