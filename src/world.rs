//! The simulation context: shapes, bodies, statics and the fixed-step pipeline.

mod bodies;
mod shapes;
mod statics;

use std::time::Instant;

use crate::{
    collision::{
        broadphase::{BroadPhase, BroadPhaseProxy, CandidatePairs},
        contact::ContactManifold,
        narrowphase::collide,
        policy::{ContactPolicy, NarrowPhaseCallbacks, PairMaterialProperties},
    },
    config::{SimulationSettings, SolverConfig},
    core::{
        body::{BodyDescription, BodyLocation, StaticDescription},
        collidable::{CollidablePair, CollidableReference},
        shape::Shape,
        types::{BodyInertia, Pose, Velocity},
    },
    dynamics::{
        integrator::{integrate_pose, GravityIntegrator, PoseIntegratorCallbacks},
        island::IslandSleeper,
        solver::{ContactConstraint, ContactSolver, SolverBody},
    },
    error::{PhysicsError, Result},
    utils::{
        allocator::{BodyHandle, ShapeHandle, StaticHandle},
        dispatcher::WorkerPool,
        logging::ScopedTimer,
        math::rotate_inverse_inertia,
        profiling::StepProfile,
    },
};

use self::{bodies::BodySet, shapes::ShapeSet, statics::StaticSet};

/// Counters describing one completed timestep.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepStats {
    pub dt: f32,
    pub velocity_iterations: u32,
    pub substeps: u32,
    pub candidate_pairs: usize,
    pub manifolds: usize,
    pub contacts: usize,
    pub reclaimed_sleeping_slots: usize,
    pub woken_bodies: usize,
    pub slept_bodies: usize,
    pub active_bodies: usize,
    pub sleeping_bodies: usize,
    pub profile: StepProfile,
}

struct PairContact {
    pair: CollidablePair,
    manifold: ContactManifold,
    material: PairMaterialProperties,
}

struct StepBody {
    handle: BodyHandle,
    pose: Pose,
    inertia: BodyInertia,
    constrained: bool,
}

/// Owner of every shape, body and static plus the callbacks that steer a step.
///
/// There is one per running application. It is handed explicitly to the
/// scheduler and lifecycle manager rather than living in a global.
pub struct Simulation<N = ContactPolicy, P = GravityIntegrator>
where
    N: NarrowPhaseCallbacks,
    P: PoseIntegratorCallbacks,
{
    shapes: ShapeSet,
    bodies: BodySet,
    statics: StaticSet,
    solver_config: SolverConfig,
    broad_phase: BroadPhase,
    sleeper: IslandSleeper,
    narrow_phase_callbacks: N,
    pose_integrator: P,
    step_count: u64,
}

impl Simulation {
    /// Simulation with the uniform contact policy and gravity from `settings`.
    pub fn new(settings: SimulationSettings) -> Result<Self> {
        Self::with_callbacks(
            settings,
            ContactPolicy::default(),
            GravityIntegrator::new(settings.gravity),
        )
    }
}

impl<N, P> Simulation<N, P>
where
    N: NarrowPhaseCallbacks,
    P: PoseIntegratorCallbacks,
{
    pub fn with_callbacks(
        settings: SimulationSettings,
        narrow_phase_callbacks: N,
        pose_integrator: P,
    ) -> Result<Self> {
        settings.solver.validate()?;
        if !settings.broadphase_cell_size.is_finite() || settings.broadphase_cell_size <= 0.0 {
            return Err(PhysicsError::InvalidConfig(format!(
                "broad phase cell size must be positive, got {}",
                settings.broadphase_cell_size
            )));
        }

        log::info!(
            "Simulation created: {} Hz, {} velocity iterations, {} substeps",
            settings.solver.simulation_rate(),
            settings.solver.velocity_iteration_count(),
            settings.solver.substep_count()
        );

        Ok(Self {
            shapes: ShapeSet::new(settings.shape_capacity),
            bodies: BodySet::new(settings.body_capacity),
            statics: StaticSet::new(settings.static_capacity),
            solver_config: settings.solver,
            broad_phase: BroadPhase::new(settings.broadphase_cell_size),
            sleeper: IslandSleeper::new(),
            narrow_phase_callbacks,
            pose_integrator,
            step_count: 0,
        })
    }

    pub fn solver_config(&self) -> &SolverConfig {
        &self.solver_config
    }

    /// Edits apply from the next timestep.
    pub fn solver_config_mut(&mut self) -> &mut SolverConfig {
        &mut self.solver_config
    }

    pub fn set_solver_config(&mut self, config: SolverConfig) -> Result<()> {
        config.validate()?;
        self.solver_config = config;
        Ok(())
    }

    pub fn narrow_phase_callbacks(&self) -> &N {
        &self.narrow_phase_callbacks
    }

    pub fn pose_integrator(&self) -> &P {
        &self.pose_integrator
    }

    pub fn pose_integrator_mut(&mut self) -> &mut P {
        &mut self.pose_integrator
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    // Shapes

    pub fn add_shape(&mut self, shape: Shape) -> Result<ShapeHandle> {
        self.shapes.add(shape)
    }

    pub fn shape(&self, handle: ShapeHandle) -> Result<&Shape> {
        self.shapes.get(handle)
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    // Bodies

    pub fn add_body(&mut self, description: BodyDescription) -> Result<BodyHandle> {
        self.shapes.get(description.shape)?;
        let handle = self.bodies.add(&description)?;
        log::trace!("added body {handle}");
        Ok(handle)
    }

    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<()> {
        self.bodies.remove(handle)?;
        log::trace!("removed body {handle}");
        Ok(())
    }

    pub fn body_exists(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    pub fn body_pose(&self, handle: BodyHandle) -> Result<Pose> {
        self.bodies.get(handle).map(|record| record.pose)
    }

    pub fn body_velocity(&self, handle: BodyHandle) -> Result<Velocity> {
        self.bodies.get(handle).map(|record| record.velocity)
    }

    pub fn body_inertia(&self, handle: BodyHandle) -> Result<BodyInertia> {
        self.bodies.get(handle).map(|record| record.inertia)
    }

    pub fn body_shape(&self, handle: BodyHandle) -> Result<ShapeHandle> {
        self.bodies.get(handle).map(|record| record.shape)
    }

    /// Sets the velocity, waking the body first if it was asleep.
    pub fn set_body_velocity(&mut self, handle: BodyHandle, velocity: Velocity) -> Result<()> {
        self.awaken_body(handle)?;
        let record = self.bodies.get_mut(handle)?;
        record.velocity = velocity;
        record.calm_steps = 0;
        Ok(())
    }

    pub fn body_is_sleeping(&self, handle: BodyHandle) -> Result<bool> {
        self.bodies.get(handle).map(|record| !record.is_active())
    }

    /// Wakes the sleeping set holding `handle`; a no-op for active bodies.
    pub fn awaken_body(&mut self, handle: BodyHandle) -> Result<()> {
        self.bodies.get(handle)?;
        if let Some(set) = self.bodies.sleeping_set_of(handle) {
            let woken = self.bodies.awaken_set(set);
            log::debug!("woke {woken} bodies around {handle}");
        }
        Ok(())
    }

    pub fn active_bodies(&self) -> &[BodyHandle] {
        self.bodies.active()
    }

    pub fn active_body_count(&self) -> usize {
        self.bodies.active_count()
    }

    /// Sleeping slots in use. Removed sleeping bodies keep counting until the
    /// next timestep reclaims their slots; see [`Self::live_sleeping_body_count`].
    pub fn sleeping_body_count(&self) -> usize {
        self.bodies.sleeping_count()
    }

    pub fn live_sleeping_body_count(&self) -> usize {
        self.bodies.live_sleeping_count()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Bodies that can still be added, `None` when unbounded.
    pub fn remaining_body_capacity(&self) -> Option<usize> {
        self.bodies.remaining_capacity()
    }

    // Statics

    pub fn add_static(&mut self, description: StaticDescription) -> Result<StaticHandle> {
        self.shapes.get(description.shape)?;
        self.statics.add(&description)
    }

    pub fn static_pose(&self, handle: StaticHandle) -> Result<Pose> {
        self.statics.get(handle).map(|record| record.pose)
    }

    pub fn static_shape(&self, handle: StaticHandle) -> Result<ShapeHandle> {
        self.statics.get(handle).map(|record| record.shape)
    }

    pub fn static_count(&self) -> usize {
        self.statics.len()
    }

    // Stepping

    /// Advances the world by exactly `dt` seconds.
    ///
    /// Solver settings are read once at the start, so edits made between steps
    /// take effect here.
    pub fn timestep(&mut self, dt: f32, pool: &WorkerPool) -> StepStats {
        let _timer = ScopedTimer::new("step");
        let step_start = Instant::now();
        let config = self.solver_config;
        let mut stats = StepStats {
            dt,
            velocity_iterations: config.velocity_iteration_count(),
            substeps: config.substep_count(),
            ..StepStats::default()
        };
        let mut profile = StepProfile::default();

        {
            let _timer = ScopedTimer::phase("step::reclaim", &mut profile.reclaim_time);
            stats.reclaimed_sleeping_slots = self.bodies.reclaim_tombstones();
        }

        let candidates = {
            let _timer = ScopedTimer::phase("step::broad_phase", &mut profile.broad_phase_time);
            self.find_candidate_pairs()
        };

        let mut contacts = {
            let _timer = ScopedTimer::phase("step::narrow_phase", &mut profile.narrow_phase_time);
            self.narrow_phase(&candidates.pairs, pool)
        };
        stats.candidate_pairs = candidates.pairs.len();
        stats.woken_bodies = self.wake_touched_sets(&contacts);
        if stats.woken_bodies > 0 {
            // Bodies that just woke still need their contacts with statics and fellow sleepers.
            let _timer = ScopedTimer::phase("step::narrow_phase", &mut profile.narrow_phase_time);
            let woken_pairs: Vec<CollidablePair> = candidates
                .deferred
                .into_iter()
                .filter(|pair| self.has_active_body(pair))
                .collect();
            stats.candidate_pairs += woken_pairs.len();
            contacts.extend(self.narrow_phase(&woken_pairs, pool));
        }
        stats.manifolds = contacts.len();
        stats.contacts = contacts.iter().map(|contact| contact.manifold.len()).sum();

        {
            let _timer =
                ScopedTimer::phase("step::integrate_velocity", &mut profile.integrator_time);
            self.integrate_velocities(dt, pool);
        }

        let (step_bodies, constraints) =
            self.solve_and_integrate(dt, &config, &contacts, pool, &mut profile);

        {
            let _timer = ScopedTimer::phase("step::sleep", &mut profile.sleeper_time);
            stats.slept_bodies = self.put_calm_islands_to_sleep(&step_bodies, &constraints);
        }

        self.step_count += 1;
        stats.active_bodies = self.bodies.active_count();
        stats.sleeping_bodies = self.bodies.sleeping_count();
        profile.total_time = step_start.elapsed();
        stats.profile = profile;
        stats
    }

    fn body_collidable(&self, handle: BodyHandle) -> Option<CollidableReference> {
        let record = self.bodies.get(handle).ok()?;
        Some(if record.is_kinematic() {
            CollidableReference::Kinematic(handle)
        } else {
            CollidableReference::Dynamic(handle)
        })
    }

    fn body_proxy(&self, handle: BodyHandle, sleeping: bool) -> Option<BroadPhaseProxy> {
        let record = self.bodies.get(handle).ok()?;
        let shape = self.shapes.get(record.shape).ok()?;
        Some(BroadPhaseProxy {
            collidable: self.body_collidable(handle)?,
            bounds: shape
                .bounding_box(&record.pose)
                .expanded(record.speculative_margin),
            sleeping,
        })
    }

    fn find_candidate_pairs(&mut self) -> CandidatePairs {
        let active = self
            .bodies
            .active()
            .iter()
            .filter_map(|&handle| self.body_proxy(handle, false));
        let sleeping = self
            .bodies
            .sleeping_members()
            .filter_map(|handle| self.body_proxy(handle, true));
        let body_proxies: Vec<BroadPhaseProxy> = active.chain(sleeping).collect();

        let static_proxies: Vec<BroadPhaseProxy> = self
            .statics
            .iter()
            .filter_map(|record| {
                let shape = self.shapes.get(record.shape).ok()?;
                Some(BroadPhaseProxy {
                    collidable: CollidableReference::Static(record.handle),
                    bounds: shape.bounding_box(&record.pose),
                    sleeping: false,
                })
            })
            .collect();

        self.broad_phase.find_pairs(&body_proxies, &static_proxies)
    }

    fn narrow_phase(&self, pairs: &[CollidablePair], pool: &WorkerPool) -> Vec<PairContact> {
        let bodies = &self.bodies;
        let statics = &self.statics;
        let shapes = &self.shapes;
        let callbacks = &self.narrow_phase_callbacks;

        pool.filter_map(pairs, |_, pair| {
            if !callbacks.allow_contact_generation(pair) {
                return None;
            }
            let (shape_a, pose_a, margin_a) = collidable_geometry(bodies, statics, shapes, pair.a)?;
            let (shape_b, pose_b, margin_b) = collidable_geometry(bodies, statics, shapes, pair.b)?;
            let manifold = collide(shape_a, &pose_a, shape_b, &pose_b, margin_a.max(margin_b))?;
            let material = callbacks.configure_contact_manifold(pair, &manifold)?;
            Some(PairContact {
                pair: *pair,
                manifold,
                material,
            })
        })
    }

    fn wake_touched_sets(&mut self, contacts: &[PairContact]) -> usize {
        let mut sets: Vec<usize> = contacts
            .iter()
            .flat_map(|contact| [contact.pair.a, contact.pair.b])
            .filter_map(|collidable| collidable.body_handle())
            .filter_map(|handle| self.bodies.sleeping_set_of(handle))
            .collect();
        sets.sort_unstable();
        sets.dedup();

        let woken: usize = sets
            .into_iter()
            .map(|set| self.bodies.awaken_set(set))
            .sum();
        if woken > 0 {
            log::debug!("contacts woke {woken} sleeping bodies");
        }
        woken
    }

    fn has_active_body(&self, pair: &CollidablePair) -> bool {
        [pair.a, pair.b]
            .iter()
            .filter_map(CollidableReference::body_handle)
            .any(|handle| self.bodies.get(handle).is_ok_and(|record| record.is_active()))
    }

    fn integrate_velocities(&mut self, dt: f32, pool: &WorkerPool) {
        self.pose_integrator.prepare_for_integration(dt);
        let integrator = &self.pose_integrator;
        let include_kinematics = integrator.integrate_velocity_for_kinematics();

        let mut records = self.bodies.active_records_mut();
        pool.for_each_mut(&mut records, |worker, record| {
            if record.is_kinematic() && !include_kinematics {
                return;
            }
            integrator.integrate_velocity(
                &record.pose,
                &record.inertia,
                &mut record.velocity,
                worker,
                dt,
            );
        });
    }

    fn solver_index(&self, collidable: CollidableReference) -> Option<usize> {
        let handle = collidable.body_handle()?;
        match self.bodies.get(handle).ok()?.location {
            BodyLocation::Active { index } => Some(index),
            BodyLocation::Sleeping { .. } => None,
        }
    }

    fn collidable_position(&self, collidable: CollidableReference) -> Option<glam::Vec3> {
        match collidable {
            CollidableReference::Dynamic(handle) | CollidableReference::Kinematic(handle) => {
                self.bodies.get(handle).ok().map(|record| record.pose.position)
            }
            CollidableReference::Static(handle) => {
                self.statics.get(handle).ok().map(|record| record.pose.position)
            }
        }
    }

    fn solve_and_integrate(
        &mut self,
        dt: f32,
        config: &SolverConfig,
        contacts: &[PairContact],
        pool: &WorkerPool,
        profile: &mut StepProfile,
    ) -> (Vec<StepBody>, Vec<ContactConstraint>) {
        let substeps = config.substep_count().max(1);
        let substep_dt = dt / substeps as f32;

        let mut step_bodies = Vec::with_capacity(self.bodies.active_count());
        let mut solver_bodies = Vec::with_capacity(self.bodies.active_count());
        for &handle in self.bodies.active() {
            if let Ok(record) = self.bodies.get(handle) {
                step_bodies.push(StepBody {
                    handle,
                    pose: record.pose,
                    inertia: record.inertia,
                    constrained: false,
                });
                solver_bodies.push(SolverBody::new(
                    &record.pose,
                    record.velocity,
                    &record.inertia,
                ));
            }
        }

        let mut constraints: Vec<ContactConstraint> = contacts
            .iter()
            .filter_map(|contact| {
                let a = self.solver_index(contact.pair.a);
                let b = self.solver_index(contact.pair.b);
                if a.is_none() && b.is_none() {
                    return None;
                }
                Some(ContactConstraint::new(
                    a,
                    self.collidable_position(contact.pair.a)?,
                    b,
                    self.collidable_position(contact.pair.b)?,
                    &contact.manifold,
                    contact.material,
                ))
            })
            .collect();
        for constraint in &constraints {
            let (a, b) = constraint.bodies();
            for index in [a, b].into_iter().flatten() {
                if let Some(body) = step_bodies.get_mut(index) {
                    body.constrained = true;
                }
            }
        }

        let solver = ContactSolver::new(config.velocity_iteration_count());
        let mode = self.pose_integrator.angular_integration_mode();
        let substep_unconstrained = self.pose_integrator.allow_substeps_for_unconstrained_bodies();

        for substep in 0..substeps {
            {
                let _timer = ScopedTimer::phase("step::solve", &mut profile.solver_time);
                solver.solve_substep(&mut constraints, &mut solver_bodies, substep_dt);
            }

            let _timer = ScopedTimer::phase("step::integrate_pose", &mut profile.integrator_time);
            let mut items: Vec<(&mut StepBody, &mut SolverBody)> =
                step_bodies.iter_mut().zip(solver_bodies.iter_mut()).collect();
            pool.for_each_mut(&mut items, |_, (body, solver_body)| {
                let body_dt = if body.constrained || substep_unconstrained {
                    substep_dt
                } else if substep == 0 {
                    dt
                } else {
                    return;
                };
                integrate_pose(
                    &mut body.pose,
                    &mut solver_body.velocity,
                    &body.inertia,
                    mode,
                    body_dt,
                );
                solver_body.inverse_inertia_world =
                    rotate_inverse_inertia(body.inertia.inverse_inertia_tensor, body.pose.orientation);
            });
        }

        for (body, solver_body) in step_bodies.iter().zip(&solver_bodies) {
            if let Ok(record) = self.bodies.get_mut(body.handle) {
                record.pose = body.pose;
                record.velocity = solver_body.velocity;
            }
        }

        (step_bodies, constraints)
    }

    fn put_calm_islands_to_sleep(
        &mut self,
        step_bodies: &[StepBody],
        constraints: &[ContactConstraint],
    ) -> usize {
        let mut candidates = Vec::with_capacity(step_bodies.len());
        for body in step_bodies {
            let candidate = match self.bodies.get_mut(body.handle) {
                Ok(record) => {
                    record.update_sleep_candidacy();
                    record.is_sleep_candidate()
                }
                Err(_) => false,
            };
            candidates.push(candidate);
        }

        // Kinematic bodies do not carry islands; a dynamic body touching one sleeps on its own terms.
        let connections: Vec<(usize, usize)> = constraints
            .iter()
            .filter_map(|constraint| match constraint.bodies() {
                (Some(a), Some(b))
                    if !step_bodies[a].inertia.is_kinematic()
                        && !step_bodies[b].inertia.is_kinematic() =>
                {
                    Some((a, b))
                }
                _ => None,
            })
            .collect();

        let islands = self.sleeper.find_sleeping_islands(&candidates, &connections);
        let mut slept = 0;
        for island in islands {
            let handles: Vec<BodyHandle> = island.iter().map(|&i| step_bodies[i].handle).collect();
            slept += handles.len();
            self.bodies.sleep(&handles);
        }
        if slept > 0 {
            log::debug!("{slept} bodies went to sleep");
        }
        slept
    }
}

/// Shape, pose and speculative margin of either side of a pair. Statics have no margin.
fn collidable_geometry<'a>(
    bodies: &'a BodySet,
    statics: &'a StaticSet,
    shapes: &'a ShapeSet,
    collidable: CollidableReference,
) -> Option<(&'a Shape, Pose, f32)> {
    match collidable {
        CollidableReference::Dynamic(handle) | CollidableReference::Kinematic(handle) => {
            let record = bodies.get(handle).ok()?;
            Some((
                shapes.get(record.shape).ok()?,
                record.pose,
                record.speculative_margin,
            ))
        }
        CollidableReference::Static(handle) => {
            let record = statics.get(handle).ok()?;
            Some((shapes.get(record.shape).ok()?, record.pose, 0.0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::body::BodyActivity;
    use approx::assert_relative_eq;
    use glam::Vec3;

    fn world() -> (Simulation, WorkerPool) {
        let simulation = Simulation::new(SimulationSettings::headless()).unwrap();
        (simulation, WorkerPool::new(2).unwrap())
    }

    #[test]
    fn free_fall_matches_gravity() {
        let (mut simulation, pool) = world();
        let shape = simulation.add_shape(Shape::sphere(0.5)).unwrap();
        let body = simulation
            .add_body(BodyDescription::dynamic(
                Pose::from_position(Vec3::new(0.0, 10.0, 0.0)),
                Shape::sphere(0.5).compute_inertia(1.0),
                shape,
                BodyActivity::never_sleep(),
            ))
            .unwrap();

        let stats = simulation.timestep(1.0 / 60.0, &pool);

        let velocity = simulation.body_velocity(body).unwrap();
        assert_relative_eq!(velocity.linear.y, -10.0 / 60.0, epsilon = 1e-5);
        assert_eq!(stats.candidate_pairs, 0);
        assert_eq!(stats.velocity_iterations, 8);
    }

    #[test]
    fn unknown_shape_is_rejected() {
        let (mut simulation, _) = world();
        let missing = ShapeHandle(crate::utils::allocator::GenerationalId::new(3, 0));

        let result = simulation.add_body(BodyDescription::dynamic(
            Pose::default(),
            BodyInertia::default(),
            missing,
            BodyActivity::default(),
        ));
        assert!(matches!(result, Err(PhysicsError::InvalidHandle(_))));
        assert_eq!(simulation.body_count(), 0);
    }

    #[test]
    fn removing_a_sleeper_heals_on_the_next_step() {
        let (mut simulation, pool) = world();
        let shape = simulation.add_shape(Shape::sphere(0.5)).unwrap();
        let description = BodyDescription::dynamic(
            Pose::default(),
            BodyInertia::default(),
            shape,
            BodyActivity::default(),
        );
        let a = simulation.add_body(description).unwrap();
        let b = simulation
            .add_body(BodyDescription {
                pose: Pose::from_position(Vec3::new(5.0, 0.0, 0.0)),
                ..description
            })
            .unwrap();
        simulation.bodies.sleep(&[a, b]);

        simulation.remove_body(a).unwrap();
        assert_eq!(simulation.sleeping_body_count(), 2);
        assert_eq!(simulation.live_sleeping_body_count(), 1);

        let stats = simulation.timestep(1.0 / 60.0, &pool);
        assert_eq!(stats.reclaimed_sleeping_slots, 1);
        assert_eq!(simulation.sleeping_body_count(), 0);
        assert!(!simulation.body_is_sleeping(b).unwrap());
    }
}
