//! Spawning, tracking and removing the dynamic bodies a user creates at runtime.

use glam::{Mat4, Quat, Vec3};

use crate::{
    collision::policy::NarrowPhaseCallbacks,
    core::{
        body::{BodyActivity, BodyDescription},
        shape::ShapeKind,
        types::Pose,
    },
    dynamics::integrator::PoseIntegratorCallbacks,
    error::{HandleRef, PhysicsError, Result, StorageKind},
    utils::allocator::{BodyHandle, ShapeHandle},
    world::Simulation,
};

/// What a renderer needs to draw one body or static.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderInstance {
    pub pose: Pose,
    pub shape_kind: ShapeKind,
    /// Full extents, i.e. the scale to draw a unit mesh at.
    pub size: Vec3,
}

impl RenderInstance {
    pub fn transform(&self) -> Mat4 {
        self.pose.to_matrix(self.size)
    }
}

/// Tracks the handles of bodies spawned through it.
///
/// Not meant to be used while a timestep is running; call it from the control
/// thread between frames.
#[derive(Debug, Default)]
pub struct BodyLifecycleManager {
    live: Vec<BodyHandle>,
}

impl BodyLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `nx * ny * nz` unit-mass bodies on a lattice starting at `origin`.
    ///
    /// Either the whole grid is created or none of it: capacity is checked up
    /// front and anything created before a failure is removed again.
    pub fn spawn_grid<N, P>(
        &mut self,
        simulation: &mut Simulation<N, P>,
        shape: ShapeHandle,
        dimensions: (usize, usize, usize),
        spacing: Vec3,
        origin: Vec3,
        activity_threshold: f32,
    ) -> Result<Vec<BodyHandle>>
    where
        N: NarrowPhaseCallbacks,
        P: PoseIntegratorCallbacks,
    {
        let inertia = simulation.shape(shape)?.compute_inertia(1.0);
        let (nx, ny, nz) = dimensions;
        let requested = nx
            .checked_mul(ny)
            .and_then(|count| count.checked_mul(nz))
            .ok_or(PhysicsError::ShapeAllocationExhausted {
                kind: StorageKind::Bodies,
                requested: usize::MAX,
                available: simulation.remaining_body_capacity().unwrap_or(usize::MAX),
            })?;
        if let Some(available) = simulation.remaining_body_capacity() {
            if requested > available {
                log::warn!("Grid of {requested} bodies refused: only {available} slots left");
                return Err(PhysicsError::ShapeAllocationExhausted {
                    kind: StorageKind::Bodies,
                    requested,
                    available,
                });
            }
        }

        let activity = BodyActivity::new(activity_threshold);
        let mut spawned = Vec::with_capacity(requested);
        for ix in 0..nx {
            for iy in 0..ny {
                for iz in 0..nz {
                    let offset = Vec3::new(ix as f32, iy as f32, iz as f32) * spacing;
                    let pose = Pose::new(origin + offset, Quat::IDENTITY);
                    let description = BodyDescription::dynamic(pose, inertia, shape, activity);
                    match simulation.add_body(description) {
                        Ok(handle) => spawned.push(handle),
                        Err(err) => {
                            log::warn!(
                                "Grid spawn failed after {} of {requested} bodies: {err}",
                                spawned.len()
                            );
                            for handle in spawned {
                                // Just created by this call, so removal cannot fail.
                                let _ = simulation.remove_body(handle);
                            }
                            return Err(err);
                        }
                    }
                }
            }
        }

        self.live.extend_from_slice(&spawned);
        log::debug!(
            "Spawned {nx}x{ny}x{nz} grid ({} live bodies)",
            self.live.len()
        );
        Ok(spawned)
    }

    /// Removes one tracked body.
    pub fn remove<N, P>(&mut self, simulation: &mut Simulation<N, P>, handle: BodyHandle) -> Result<()>
    where
        N: NarrowPhaseCallbacks,
        P: PoseIntegratorCallbacks,
    {
        let Some(position) = self.live.iter().position(|live| *live == handle) else {
            return Err(PhysicsError::InvalidHandle(HandleRef::Body(handle)));
        };
        self.live.swap_remove(position);
        simulation.remove_body(handle)
    }

    /// Removes every tracked body and forgets them.
    ///
    /// The tracked list is always cleared. Handles the simulation no longer
    /// knew about are reported through the first error; debug builds treat
    /// that as a bug.
    pub fn remove_all<N, P>(&mut self, simulation: &mut Simulation<N, P>) -> Result<()>
    where
        N: NarrowPhaseCallbacks,
        P: PoseIntegratorCallbacks,
    {
        let count = self.live.len();
        let mut first_error = None;
        for handle in self.live.drain(..) {
            if let Err(err) = simulation.remove_body(handle) {
                log::warn!("Failed to remove {handle}: {err}");
                first_error.get_or_insert(err);
            }
        }
        debug_assert!(
            first_error.is_none(),
            "tracked body was removed behind the lifecycle manager's back"
        );
        log::debug!("Cleared {count} bodies");

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Pose of a body this manager spawned and still tracks.
    pub fn query_pose<N, P>(&self, simulation: &Simulation<N, P>, handle: BodyHandle) -> Result<Pose>
    where
        N: NarrowPhaseCallbacks,
        P: PoseIntegratorCallbacks,
    {
        if !self.live.contains(&handle) {
            return Err(PhysicsError::InvalidHandle(HandleRef::Body(handle)));
        }
        simulation.body_pose(handle)
    }

    pub fn active_count<N, P>(&self, simulation: &Simulation<N, P>) -> usize
    where
        N: NarrowPhaseCallbacks,
        P: PoseIntegratorCallbacks,
    {
        simulation.active_body_count()
    }

    /// Sleeping slots held by the simulation.
    ///
    /// Overcounts right after removals: removed sleeping bodies keep their slot
    /// until the next timestep reclaims it. Use [`Self::live_sleeping_count`]
    /// for the exact figure.
    pub fn sleeping_count<N, P>(&self, simulation: &Simulation<N, P>) -> usize
    where
        N: NarrowPhaseCallbacks,
        P: PoseIntegratorCallbacks,
    {
        simulation.sleeping_body_count()
    }

    pub fn live_sleeping_count<N, P>(&self, simulation: &Simulation<N, P>) -> usize
    where
        N: NarrowPhaseCallbacks,
        P: PoseIntegratorCallbacks,
    {
        simulation.live_sleeping_body_count()
    }

    pub fn live_handles(&self) -> &[BodyHandle] {
        &self.live
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// One instance per tracked body, in spawn order.
    pub fn render_instances<N, P>(&self, simulation: &Simulation<N, P>) -> Vec<RenderInstance>
    where
        N: NarrowPhaseCallbacks,
        P: PoseIntegratorCallbacks,
    {
        self.live
            .iter()
            .filter_map(|&handle| {
                let pose = simulation.body_pose(handle).ok()?;
                let shape = simulation.shape(simulation.body_shape(handle).ok()?).ok()?;
                Some(RenderInstance {
                    pose,
                    shape_kind: shape.kind(),
                    size: shape.size(),
                })
            })
            .collect()
    }
}
