//! Application-level context: the world, its worker pool, the scheduler and the
//! bodies spawned from the UI, driven by [`UiEvent`]s between frames.

use std::collections::HashMap;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::{
    config::{SimulationSettings, SolverConfig, DEFAULT_GRAVITY},
    core::{
        body::StaticDescription,
        shape::{Shape, ShapeKind},
        types::Pose,
    },
    error::{PhysicsError, Result},
    lifecycle::{BodyLifecycleManager, RenderInstance},
    scheduler::{FixedStepScheduler, FrameReport},
    utils::{
        allocator::{ShapeHandle, StaticHandle},
        dispatcher::WorkerPool,
    },
    world::Simulation,
};

/// Range of the layer-count slider.
pub const LAYER_COUNT_RANGE: (u32, u32) = (0, 10);

/// Sleep threshold given to every spawned box.
pub const SPAWN_ACTIVITY_THRESHOLD: f32 = 0.01;

/// Where the lowest, front-left box of a spawned grid sits before the box-size offset.
const SPAWN_ANCHOR: Vec3 = Vec3::new(0.0, 4.0, -2.0);

/// Boxes along x and along depth in every layer.
const GRID_FOOTPRINT: usize = 3;

/// The static box everything lands on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloorSettings {
    pub size: Vec3,
    pub position: Vec3,
}

impl Default for FloorSettings {
    fn default() -> Self {
        Self {
            size: Vec3::new(200.0, 20.0, 200.0),
            position: Vec3::new(0.0, -10.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSettings {
    pub gravity: Vec3,
    pub solver: SolverConfig,
    /// `None` sizes the pool to the available processors.
    pub worker_count: Option<usize>,
    pub max_steps_per_frame: Option<usize>,
    pub frame_budget_ms: Option<f32>,
    pub body_capacity: Option<usize>,
    pub floor: FloorSettings,
    pub box_size: f32,
    pub layer_count: u32,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self::windowed()
    }
}

impl SandboxSettings {
    pub fn windowed() -> Self {
        Self {
            gravity: Vec3::from_array(DEFAULT_GRAVITY),
            solver: SolverConfig::windowed(),
            worker_count: None,
            max_steps_per_frame: None,
            frame_budget_ms: None,
            body_capacity: None,
            floor: FloorSettings::default(),
            box_size: 0.1,
            layer_count: 2,
        }
    }

    pub fn headless() -> Self {
        Self {
            solver: SolverConfig::headless(),
            ..Self::windowed()
        }
    }

    fn simulation_settings(&self) -> SimulationSettings {
        SimulationSettings {
            gravity: self.gravity,
            solver: self.solver,
            body_capacity: self.body_capacity,
            ..SimulationSettings::default()
        }
    }
}

/// Everything the control panel can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UiEvent {
    /// Spawn a grid with `layers + 1` layers, or the current layer count when `None`.
    SpawnGrid { layers: Option<u32> },
    ClearAll,
    SetVelocityIterations(u32),
    SetSubsteps(u32),
    SetSimulationRate(f32),
    SetLayerCount(u32),
}

/// Counters shown in the diagnostics panel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Diagnostics {
    pub active_bodies: usize,
    /// May include removed bodies until the next step; see `live_sleeping_bodies`.
    pub sleeping_bodies: usize,
    pub live_sleeping_bodies: usize,
    pub velocity_iterations: u32,
    pub substeps: u32,
    pub simulation_rate: f32,
    pub layer_count: u32,
    pub simulated_time: f64,
}

pub struct Sandbox {
    simulation: Simulation,
    pool: WorkerPool,
    scheduler: FixedStepScheduler,
    lifecycle: BodyLifecycleManager,
    floor: StaticHandle,
    floor_shape: ShapeHandle,
    box_shapes: HashMap<u32, ShapeHandle>,
    box_size: f32,
    layer_count: u32,
}

impl Sandbox {
    pub fn new(settings: SandboxSettings) -> Result<Self> {
        if !settings.box_size.is_finite() || settings.box_size <= 0.0 {
            return Err(PhysicsError::InvalidConfig(format!(
                "box size must be positive, got {}",
                settings.box_size
            )));
        }
        let pool = match settings.worker_count {
            Some(count) => WorkerPool::new(count)?,
            None => WorkerPool::with_available_parallelism()?,
        };

        let mut simulation = Simulation::new(settings.simulation_settings())?;
        let size = settings.floor.size;
        let floor_shape = simulation.add_shape(Shape::cuboid(size.x, size.y, size.z))?;
        let floor = simulation.add_static(StaticDescription::new(
            Pose::from_position(settings.floor.position),
            floor_shape,
        ))?;

        let scheduler = FixedStepScheduler::new()
            .with_max_steps_per_frame(settings.max_steps_per_frame)
            .with_frame_budget(settings.frame_budget_ms);

        log::info!(
            "Sandbox ready with {} workers, floor {size} at {}",
            pool.worker_count(),
            settings.floor.position
        );

        Ok(Self {
            simulation,
            pool,
            scheduler,
            lifecycle: BodyLifecycleManager::new(),
            floor,
            floor_shape,
            box_shapes: HashMap::new(),
            box_size: settings.box_size,
            layer_count: settings.layer_count.clamp(LAYER_COUNT_RANGE.0, LAYER_COUNT_RANGE.1),
        })
    }

    /// Runs every step due by `total_elapsed` seconds of presentation time.
    pub fn frame(&mut self, total_elapsed: f64) -> FrameReport {
        self.scheduler
            .advance_to(total_elapsed, &mut self.simulation, &self.pool)
    }

    pub fn handle(&mut self, event: UiEvent) -> Result<()> {
        match event {
            UiEvent::SpawnGrid { layers } => {
                let layers = layers.unwrap_or(self.layer_count);
                self.spawn_grid(layers)
            }
            UiEvent::ClearAll => self.lifecycle.remove_all(&mut self.simulation),
            UiEvent::SetVelocityIterations(count) => {
                self.simulation
                    .solver_config_mut()
                    .set_velocity_iteration_count(count)?;
                log::info!("Velocity iterations set to {count}");
                Ok(())
            }
            UiEvent::SetSubsteps(count) => {
                self.simulation.solver_config_mut().set_substep_count(count)?;
                log::info!("Substeps set to {count}");
                Ok(())
            }
            UiEvent::SetSimulationRate(rate) => {
                self.simulation.solver_config_mut().set_simulation_rate(rate)?;
                log::info!("Simulation rate set to {rate} Hz");
                Ok(())
            }
            UiEvent::SetLayerCount(count) => {
                self.layer_count = count.clamp(LAYER_COUNT_RANGE.0, LAYER_COUNT_RANGE.1);
                Ok(())
            }
        }
    }

    fn spawn_grid(&mut self, layers: u32) -> Result<()> {
        let size = self.box_size;
        let shape = self.box_shape(size)?;
        let layer_count = usize::try_from(layers)
            .ok()
            .and_then(|layers| layers.checked_add(1))
            .ok_or_else(|| PhysicsError::InvalidConfig(format!("{layers} layers")))?;

        self.lifecycle.spawn_grid(
            &mut self.simulation,
            shape,
            (GRID_FOOTPRINT, layer_count, GRID_FOOTPRINT),
            Vec3::new(size, 2.0 * size, size),
            SPAWN_ANCHOR + Vec3::new(-1.0, 0.0, -1.0) * size,
            SPAWN_ACTIVITY_THRESHOLD,
        )?;
        Ok(())
    }

    fn box_shape(&mut self, size: f32) -> Result<ShapeHandle> {
        if let Some(&handle) = self.box_shapes.get(&size.to_bits()) {
            return Ok(handle);
        }
        let handle = self.simulation.add_shape(Shape::cuboid(size, size, size))?;
        self.box_shapes.insert(size.to_bits(), handle);
        Ok(handle)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let config = self.simulation.solver_config();
        Diagnostics {
            active_bodies: self.lifecycle.active_count(&self.simulation),
            sleeping_bodies: self.lifecycle.sleeping_count(&self.simulation),
            live_sleeping_bodies: self.lifecycle.live_sleeping_count(&self.simulation),
            velocity_iterations: config.velocity_iteration_count(),
            substeps: config.substep_count(),
            simulation_rate: config.simulation_rate(),
            layer_count: self.layer_count,
            simulated_time: self.scheduler.simulated_time(),
        }
    }

    pub fn body_instances(&self) -> Vec<RenderInstance> {
        self.lifecycle.render_instances(&self.simulation)
    }

    pub fn floor_instance(&self) -> RenderInstance {
        let pose = self
            .simulation
            .static_pose(self.floor)
            .unwrap_or_else(|_| Pose::new(Vec3::ZERO, Quat::IDENTITY));
        let size = self
            .simulation
            .shape(self.floor_shape)
            .map(Shape::size)
            .unwrap_or(Vec3::ZERO);
        RenderInstance {
            pose,
            shape_kind: ShapeKind::Box,
            size,
        }
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    pub fn lifecycle(&self) -> &BodyLifecycleManager {
        &self.lifecycle
    }

    pub fn scheduler(&self) -> &FixedStepScheduler {
        &self.scheduler
    }

    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> Sandbox {
        Sandbox::new(SandboxSettings {
            worker_count: Some(2),
            ..SandboxSettings::headless()
        })
        .unwrap()
    }

    #[test]
    fn spawn_uses_one_shape_per_box_size() {
        let mut sandbox = sandbox();
        sandbox.handle(UiEvent::SpawnGrid { layers: None }).unwrap();
        sandbox.handle(UiEvent::SpawnGrid { layers: Some(0) }).unwrap();

        assert_eq!(sandbox.lifecycle().len(), 27 + 9);
        // Floor plus a single box shape.
        assert_eq!(sandbox.simulation().shape_count(), 2);
    }

    #[test]
    fn first_box_sits_at_the_anchor() {
        let mut sandbox = sandbox();
        sandbox.handle(UiEvent::SpawnGrid { layers: Some(0) }).unwrap();

        let first = sandbox.body_instances()[0];
        let expected = Vec3::new(-0.1, 4.0, -2.1);
        assert!((first.pose.position - expected).length() < 1e-6);
        assert_eq!(first.size, Vec3::splat(0.1));
    }

    #[test]
    fn rejected_slider_value_leaves_config_alone() {
        let mut sandbox = sandbox();
        assert!(sandbox.handle(UiEvent::SetSubsteps(0)).is_err());
        assert_eq!(sandbox.diagnostics().substeps, 1);

        sandbox.handle(UiEvent::SetLayerCount(40)).unwrap();
        assert_eq!(sandbox.layer_count(), LAYER_COUNT_RANGE.1);
    }

    #[test]
    fn floor_instance_matches_settings() {
        let floor = sandbox().floor_instance();
        assert_eq!(floor.size, Vec3::new(200.0, 20.0, 200.0));
        assert_eq!(floor.pose.position, Vec3::new(0.0, -10.0, 0.0));
        let transform = floor.transform();
        assert_eq!(transform.w_axis.y, -10.0);
        assert_eq!(transform.x_axis.x, 200.0);
    }
}
