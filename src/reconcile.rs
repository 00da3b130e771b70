//! State reconciler — keeps on-screen sprites in step with simulation snapshots.
//!
//! The reconciler owns the table of rendered entries (object id → record and
//! sprite handle). Each snapshot is applied as a minimal set of renderer
//! calls: persisting ids are updated in place, new ids are created, and ids
//! that disappeared are destroyed.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::renderer::RenderAdapter;
use crate::types::{ObjectId, ObjectRecord};

#[derive(Debug)]
pub struct RenderedEntry<S> {
    pub object: ObjectRecord,
    pub sprite: S,
}

/// Renderer calls made by one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub updated: usize,
    pub destroyed: usize,
}

#[derive(Debug)]
pub struct StateReconciler<S> {
    entries: HashMap<ObjectId, RenderedEntry<S>>,
}

impl<S> Default for StateReconciler<S> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<S> StateReconciler<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&RenderedEntry<S>> {
        self.entries.get(&id)
    }

    /// Ids currently on screen, ascending.
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.entries.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Apply `objects` (one snapshot) to the renderer and the table.
    ///
    /// A renderer failure ends the pass immediately. Calls already made for
    /// this snapshot are not undone.
    pub fn reconcile<R>(
        &mut self,
        renderer: &mut R,
        objects: &[ObjectRecord],
    ) -> Result<ReconcileStats, R::Error>
    where
        R: RenderAdapter<Sprite = S>,
    {
        let incoming: HashSet<ObjectId> = objects.iter().map(|o| o.id).collect();
        let mut stats = ReconcileStats::default();

        renderer.begin_update(objects);

        for object in objects {
            let template_key = object.template_key();
            match self.entries.get_mut(&object.id) {
                Some(entry) => {
                    renderer.update_object(
                        &entry.sprite,
                        &object.name,
                        &template_key,
                        object.location,
                        object.orientation,
                    )?;
                    entry.object = object.clone();
                    stats.updated += 1;
                }
                None => {
                    let sprite = renderer.add_object(
                        &object.name,
                        &template_key,
                        object.location,
                        object.orientation,
                    )?;
                    self.entries.insert(
                        object.id,
                        RenderedEntry {
                            object: object.clone(),
                            sprite,
                        },
                    );
                    stats.created += 1;
                }
            }
        }

        let mut stale: Vec<ObjectId> = self
            .entries
            .keys()
            .filter(|id| !incoming.contains(id))
            .copied()
            .collect();
        stale.sort();
        for id in stale {
            if let Some(entry) = self.entries.remove(&id) {
                renderer.destroy(entry.sprite)?;
                stats.destroyed += 1;
            }
        }

        debug!(
            created = stats.created,
            updated = stats.updated,
            destroyed = stats.destroyed,
            "state_reconciled"
        );
        Ok(stats)
    }

    /// Destroy every held sprite and empty the table.
    pub fn teardown<R>(&mut self, renderer: &mut R) -> Result<usize, R::Error>
    where
        R: RenderAdapter<Sprite = S>,
    {
        let mut ids: Vec<ObjectId> = self.entries.keys().copied().collect();
        ids.sort();
        let mut destroyed = 0;
        for id in ids {
            if let Some(entry) = self.entries.remove(&id) {
                renderer.destroy(entry.sprite)?;
                destroyed += 1;
            }
        }
        Ok(destroyed)
    }
}
