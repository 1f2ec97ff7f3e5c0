use std::collections::VecDeque;

use glam::{Mat4, Quat, Vec3};
use serde::Serialize;

use crate::{
    assets::AssetPart,
    catalog::CareInfo,
    view::{ray_aabb, Ray},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectId(pub u64);

/// A plant model instance placed in the world.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedObject {
    pub id: ObjectId,
    /// Catalog name of the plant it was spawned from (overlay only).
    pub plant: String,
    pub care: CareInfo,
    pub position: Vec3,
    /// Orientation taken from the placement pose.
    pub orientation: Quat,
    /// Extra rotation around the local up axis applied by gestures.
    pub yaw: f32,
    pub scale: f32,
    #[serde(skip)]
    pub parts: Vec<AssetPart>,
}

impl PlacedObject {
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            self.orientation * Quat::from_rotation_y(self.yaw),
            self.position,
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct PickPrimitive {
    owner: ObjectId,
    part: usize,
}

/// Every placed object plus the side table used for ray-picking.
#[derive(Debug, Default)]
pub struct SceneGraph {
    objects: VecDeque<PlacedObject>,
    primitives: Vec<PickPrimitive>,
    active: Option<ObjectId>,
    next_id: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ObjectId {
        self.next_id += 1;
        ObjectId(self.next_id)
    }

    /// Adds `object`, makes it active and evicts the oldest objects beyond
    /// `capacity`. Returns the evicted ids.
    pub fn insert(&mut self, object: PlacedObject, capacity: usize) -> Vec<ObjectId> {
        let id = object.id;
        for part in 0..object.parts.len() {
            self.primitives.push(PickPrimitive { owner: id, part });
        }
        self.objects.push_back(object);
        self.active = Some(id);

        let mut evicted = Vec::new();
        while self.objects.len() > capacity.max(1) {
            if let Some(oldest) = self.objects.front().map(|o| o.id) {
                self.remove(oldest);
                evicted.push(oldest);
            }
        }
        evicted
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<PlacedObject> {
        let index = self.objects.iter().position(|o| o.id == id)?;
        let removed = self.objects.remove(index);
        self.primitives.retain(|p| p.owner != id);
        if self.active == Some(id) {
            self.active = self.objects.back().map(|o| o.id);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.primitives.clear();
        self.active = None;
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> impl Iterator<Item = &PlacedObject> {
        self.objects.iter()
    }

    pub fn get(&self, id: ObjectId) -> Option<&PlacedObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut PlacedObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn latest(&self) -> Option<ObjectId> {
        self.objects.back().map(|o| o.id)
    }

    pub fn active(&self) -> Option<ObjectId> {
        self.active
    }

    pub fn set_active(&mut self, id: ObjectId) -> bool {
        if self.get(id).is_some() {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    /// Active object, defaulting to (and latching) the newest one.
    pub fn active_or_latest(&mut self) -> Option<ObjectId> {
        if self.active.is_none() {
            self.active = self.latest();
        }
        self.active
    }

    pub fn active_mut(&mut self) -> Option<&mut PlacedObject> {
        let id = self.active_or_latest()?;
        self.get_mut(id)
    }

    /// Returns the object owning the nearest primitive hit by `ray`.
    pub fn pick(&self, ray: &Ray) -> Option<ObjectId> {
        let mut best: Option<(ObjectId, f32)> = None;

        for primitive in &self.primitives {
            let Some(object) = self.get(primitive.owner) else {
                continue;
            };
            let Some(part) = object.parts.get(primitive.part) else {
                continue;
            };
            let bounds = part.bounds.transformed(&object.model_matrix());
            if let Some(dist) = ray_aabb(ray, &bounds) {
                if best.is_none_or(|(_, d)| dist < d) {
                    best = Some((primitive.owner, dist));
                }
            }
        }

        best.map(|(id, _)| id)
    }
}
