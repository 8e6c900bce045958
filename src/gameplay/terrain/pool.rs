use bevy::prelude::*;
use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// FIFO of inactive terrain bodies keyed by their engine id.
///
/// The queue and the id set always hold the same members; an id is pooled at most once.
#[derive(Resource, Debug, Clone)]
pub struct SegmentPool<Id = Entity>
where
    Id: Copy + Eq + Hash + Send + Sync + 'static,
{
    queue: VecDeque<Id>,
    members: HashSet<Id>,
}

impl<Id> Default for SegmentPool<Id>
where
    Id: Copy + Eq + Hash + Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            members: HashSet::new(),
        }
    }
}

impl<Id> SegmentPool<Id>
where
    Id: Copy + Eq + Hash + Send + Sync + 'static,
{
    /// Returns `false` when the id is already pooled.
    pub fn offer(&mut self, id: Id) -> bool {
        if !self.members.insert(id) {
            return false;
        }
        self.queue.push_back(id);
        true
    }

    /// Oldest pooled id first.
    pub fn take(&mut self) -> Option<Id> {
        let id = self.queue.pop_front()?;
        self.members.remove(&id);
        Some(id)
    }

    pub fn contains(&self, id: Id) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.members.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Id> {
        self.queue.iter()
    }
}

/// A body is recyclable once the camera's left edge has moved `margin` past it.
pub fn is_behind_camera(body_x: f32, scroll_x: f32, margin: f32) -> bool {
    scroll_x > body_x + margin
}
