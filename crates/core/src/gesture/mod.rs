//! Touch manipulation of placed objects.
//!
//! One finger picks and drags the active object across the ground plane;
//! two fingers scale (pinch) and rotate (twist) it. Pinch tracking resets at
//! the start and end of every touch sequence while the active object is kept,
//! so a drag can follow a pinch on the same plant.

use glam::{Vec2, Vec3};

use crate::{
    config::GestureConfig,
    scene::{ObjectId, SceneGraph},
    view::ViewCamera,
};

/// Pinch tracking carried between two-finger move events.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GestureState {
    pub last_distance: Option<f32>,
    pub last_angle: Option<f32>,
}

impl GestureState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEffect {
    None,
    Picked(ObjectId),
    Moved { id: ObjectId, position: Vec3 },
    Transformed { id: ObjectId, scale: f32, yaw: f32 },
}

#[derive(Debug, Default)]
pub struct GestureController {
    config: GestureConfig,
    state: GestureState,
}

impl GestureController {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: GestureState::default(),
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    /// A new contact went down. `touches` holds every active contact.
    pub fn touch_start(
        &mut self,
        touches: &[Vec2],
        camera: &ViewCamera,
        scene: &mut SceneGraph,
    ) -> GestureEffect {
        let effect = match touches {
            [only] => self.pick(*only, camera, scene),
            _ => GestureEffect::None,
        };
        if touches.len() < 2 {
            self.state.reset();
        }
        effect
    }

    pub fn touch_move(
        &mut self,
        touches: &[Vec2],
        camera: &ViewCamera,
        scene: &mut SceneGraph,
    ) -> GestureEffect {
        let config = &self.config;
        let Some(object) = scene.active_mut() else {
            return GestureEffect::None;
        };

        match touches {
            [touch] => {
                let ray = camera.screen_ray(*touch);
                match ray.intersect_ground(config.ground_height) {
                    Some(target) => {
                        object.position = object.position.lerp(target, config.drag_follow);
                        GestureEffect::Moved {
                            id: object.id,
                            position: object.position,
                        }
                    }
                    None => GestureEffect::None,
                }
            }
            [a, b, ..] => {
                let delta = *b - *a;
                let distance = delta.length();
                let angle = delta.y.atan2(delta.x);

                if let Some(last) = self.state.last_distance.filter(|d| *d > 0.0) {
                    let ratio = (distance / last).clamp(config.pinch_min_ratio, config.pinch_max_ratio);
                    object.scale *= ratio;
                }
                if let Some(last) = self.state.last_angle {
                    object.yaw += angle - last;
                }
                self.state.last_distance = Some(distance);
                self.state.last_angle = Some(angle);

                GestureEffect::Transformed {
                    id: object.id,
                    scale: object.scale,
                    yaw: object.yaw,
                }
            }
            [] => GestureEffect::None,
        }
    }

    /// A contact lifted. Only pinch tracking is reset.
    pub fn touch_end(&mut self) {
        self.state.reset();
    }

    /// Pointer click, picking like a single-finger touch start.
    pub fn click(&mut self, point: Vec2, camera: &ViewCamera, scene: &mut SceneGraph) -> GestureEffect {
        self.pick(point, camera, scene)
    }

    fn pick(&self, point: Vec2, camera: &ViewCamera, scene: &mut SceneGraph) -> GestureEffect {
        let ray = camera.screen_ray(point);
        match scene.pick(&ray) {
            Some(id) => {
                scene.set_active(id);
                tracing::debug!(object = id.0, "object picked");
                GestureEffect::Picked(id)
            }
            None => GestureEffect::None,
        }
    }
}
