use glam::{Mat4, Quat, Vec3};

use crate::session::XrRuntime;

/// Opaque handle for a viewer-relative hit-test source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitTestSource {
    id: u64,
}

impl HitTestSource {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Reticle pose for the current frame. Only meaningful while `valid` holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementPose {
    pub transform: Mat4,
    pub valid: bool,
}

impl Default for PlacementPose {
    fn default() -> Self {
        Self::invalid()
    }
}

impl PlacementPose {
    pub fn invalid() -> Self {
        Self {
            transform: Mat4::IDENTITY,
            valid: false,
        }
    }

    pub fn valid(transform: Mat4) -> Self {
        Self {
            transform,
            valid: true,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }

    pub fn orientation(&self) -> Quat {
        let (_, rotation, _) = self.transform.to_scale_rotation_translation();
        rotation
    }
}

/// Per-frame hit-testing against real-world surfaces.
#[derive(Debug, Default)]
pub struct ReticleTracker {
    requested: bool,
    source: Option<HitTestSource>,
    pose: PlacementPose,
}

impl ReticleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs hit-testing for one rendered frame and returns the reticle pose.
    /// The hit-test source is requested on the first frame only; if that
    /// request fails the reticle stays invalid until the session restarts.
    pub fn on_frame(&mut self, xr: &mut dyn XrRuntime) -> PlacementPose {
        if !self.requested {
            self.requested = true;
            match xr.request_hit_test_source() {
                Ok(source) => {
                    tracing::debug!(source = source.id(), "hit-test source acquired");
                    self.source = Some(source);
                }
                Err(err) => tracing::warn!(error = %err, "hit-test source unavailable"),
            }
        }

        self.pose = match &self.source {
            Some(source) => match xr.hit_test_results(source).first() {
                Some(hit) => PlacementPose::valid(*hit),
                None => PlacementPose::invalid(),
            },
            None => PlacementPose::invalid(),
        };
        self.pose
    }

    /// Pose computed for the most recent frame.
    pub fn pose(&self) -> PlacementPose {
        self.pose
    }

    /// The most recent pose, if it was valid for that frame.
    pub fn latest_valid(&self) -> Option<PlacementPose> {
        self.pose.valid.then_some(self.pose)
    }

    /// Releases the hit-test source so the next session acquires a new one.
    pub fn on_session_end(&mut self, xr: &mut dyn XrRuntime) {
        if let Some(source) = self.source.take() {
            tracing::debug!(source = source.id(), "hit-test source released");
            xr.release_hit_test_source(source);
        }
        self.requested = false;
        self.pose = PlacementPose::invalid();
    }
}
