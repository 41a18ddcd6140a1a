//! Scene object store that visual effects build into.
//!
//! The renderer is out of scope; a [`Scene`] only holds the objects effects
//! create and mutate each frame. [`MemoryScene`] is the in-process store used
//! by the binary and the tests.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::trace;

/// Unique identifier for a scene object
pub type ObjectId = u64;

/// Errors from scene operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// No object with this id
    #[error("Scene object {0} not found")]
    NotFound(ObjectId),

    /// Object is locked against removal
    #[error("Scene object {0} is locked")]
    Locked(ObjectId),

    /// Object limit reached
    #[error("Scene is full ({0} objects)")]
    Full(usize),

    /// Scene is not ready to accept objects
    #[error("Scene is not ready")]
    NotReady,
}

/// Kind of geometry an object represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Solid mesh (bars, spheres)
    Mesh,
    /// Point cloud
    Points,
    /// Line strip or loop
    Line,
    /// Transform-only parent
    Group,
}

/// A renderable object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Geometry kind
    pub kind: ObjectKind,
    /// World position
    pub position: Vec3,
    /// Rotation
    pub rotation: Quat,
    /// Non-uniform scale
    pub scale: Vec3,
    /// RGBA color
    pub color: [f32; 4],
    /// Opacity (0.0 - 1.0)
    pub opacity: f32,
    /// Whether the object is drawn
    pub visible: bool,
    /// Draw edges only
    pub wireframe: bool,
    /// Optional vertex positions (points, lines)
    pub vertices: Vec<Vec3>,
    /// Optional per-vertex colors
    pub vertex_colors: Vec<[f32; 4]>,
}

impl SceneObject {
    /// Create an object at the origin with identity transform
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            color: [1.0, 1.0, 1.0, 1.0],
            opacity: 1.0,
            visible: true,
            wireframe: false,
            vertices: Vec::new(),
            vertex_colors: Vec::new(),
        }
    }

    /// Builder: position
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Builder: color
    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    /// Builder: vertices
    pub fn with_vertices(mut self, vertices: Vec<Vec3>) -> Self {
        self.vertices = vertices;
        self
    }
}

/// Object store an effect renders into
pub trait Scene {
    /// Whether the scene can accept objects yet
    fn is_ready(&self) -> bool;

    /// Add an object and return its id
    fn add(&mut self, object: SceneObject) -> Result<ObjectId, SceneError>;

    /// Remove an object and hand it back
    fn remove(&mut self, id: ObjectId) -> Result<SceneObject, SceneError>;

    /// Look up an object
    fn get(&self, id: ObjectId) -> Option<&SceneObject>;

    /// Look up an object mutably
    fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject>;

    /// Number of objects
    fn len(&self) -> usize;

    /// Whether the scene holds no objects
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory scene
#[derive(Debug, Clone)]
pub struct MemoryScene {
    objects: BTreeMap<ObjectId, SceneObject>,
    next_id: ObjectId,
    ready: bool,
    max_objects: Option<usize>,
    locked: HashSet<ObjectId>,
    added: u64,
    removed: u64,
}

impl MemoryScene {
    /// Create an empty, ready scene
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            next_id: 1,
            ready: true,
            max_objects: None,
            locked: HashSet::new(),
            added: 0,
            removed: 0,
        }
    }

    /// Create a scene that refuses objects beyond `max_objects`
    pub fn with_capacity_limit(max_objects: usize) -> Self {
        Self {
            max_objects: Some(max_objects),
            ..Self::new()
        }
    }

    /// Mark the scene ready or not
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Lock an object against removal
    pub fn lock(&mut self, id: ObjectId) {
        self.locked.insert(id);
    }

    /// Unlock an object
    pub fn unlock(&mut self, id: ObjectId) {
        self.locked.remove(&id);
    }

    /// Total objects ever added
    pub fn added_count(&self) -> u64 {
        self.added
    }

    /// Total objects ever removed
    pub fn removed_count(&self) -> u64 {
        self.removed
    }

    /// Ids currently present, ascending
    pub fn ids(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    /// Iterate over all objects
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter().map(|(id, obj)| (*id, obj))
    }

    /// Remove everything, including locked objects
    pub fn clear(&mut self) {
        self.removed += self.objects.len() as u64;
        self.objects.clear();
        self.locked.clear();
    }
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene for MemoryScene {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn add(&mut self, object: SceneObject) -> Result<ObjectId, SceneError> {
        if !self.ready {
            return Err(SceneError::NotReady);
        }
        if let Some(max) = self.max_objects {
            if self.objects.len() >= max {
                return Err(SceneError::Full(max));
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        self.objects.insert(id, object);
        self.added += 1;
        trace!("Scene: added object {}", id);
        Ok(id)
    }

    fn remove(&mut self, id: ObjectId) -> Result<SceneObject, SceneError> {
        if self.locked.contains(&id) {
            return Err(SceneError::Locked(id));
        }
        let object = self.objects.remove(&id).ok_or(SceneError::NotFound(id))?;
        self.removed += 1;
        trace!("Scene: removed object {}", id);
        Ok(object)
    }

    fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    fn len(&self) -> usize {
        self.objects.len()
    }
}

/// Viewpoint some effects may move
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Eye position
    pub position: Vec3,
    /// Look-at point
    pub target: Vec3,
    /// Vertical field of view in degrees
    pub fov: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 10.0),
            target: Vec3::ZERO,
            fov: 60.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove() {
        let mut scene = MemoryScene::new();
        let a = scene.add(SceneObject::new(ObjectKind::Mesh)).unwrap();
        let b = scene.add(SceneObject::new(ObjectKind::Points)).unwrap();
        assert_ne!(a, b);
        assert_eq!(scene.len(), 2);

        let removed = scene.remove(a).unwrap();
        assert_eq!(removed.kind, ObjectKind::Mesh);
        assert_eq!(scene.remove(a), Err(SceneError::NotFound(a)));
        assert_eq!(scene.added_count(), 2);
        assert_eq!(scene.removed_count(), 1);
    }

    #[test]
    fn test_not_ready_rejects_add() {
        let mut scene = MemoryScene::new();
        scene.set_ready(false);
        assert_eq!(
            scene.add(SceneObject::new(ObjectKind::Group)),
            Err(SceneError::NotReady)
        );
    }

    #[test]
    fn test_capacity_limit() {
        let mut scene = MemoryScene::with_capacity_limit(1);
        scene.add(SceneObject::new(ObjectKind::Mesh)).unwrap();
        assert_eq!(
            scene.add(SceneObject::new(ObjectKind::Mesh)),
            Err(SceneError::Full(1))
        );
    }

    #[test]
    fn test_locked_object_survives_remove() {
        let mut scene = MemoryScene::new();
        let id = scene.add(SceneObject::new(ObjectKind::Line)).unwrap();
        scene.lock(id);
        assert_eq!(scene.remove(id), Err(SceneError::Locked(id)));
        assert!(scene.get(id).is_some());
        scene.unlock(id);
        assert!(scene.remove(id).is_ok());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_clear_drops_locked_objects() {
        let mut scene = MemoryScene::new();
        let locked = scene.add(SceneObject::new(ObjectKind::Mesh)).unwrap();
        scene.add(SceneObject::new(ObjectKind::Points)).unwrap();
        scene.lock(locked);

        scene.clear();
        assert!(scene.is_empty());
        assert_eq!(scene.removed_count(), 2);

        assert!(scene.locked.is_empty());
        assert_eq!(scene.get(locked), None);
    }
}
