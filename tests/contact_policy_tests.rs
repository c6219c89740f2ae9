use approx::assert_relative_eq;
use fixed_step_physics::*;

struct Handles {
    dynamic: BodyHandle,
    kinematic: BodyHandle,
    floor: StaticHandle,
    wall: StaticHandle,
}

fn populated_world() -> (Simulation, Handles) {
    let mut simulation = Simulation::new(SimulationSettings::default()).unwrap();
    let cube = simulation.add_shape(Shape::cuboid(1.0, 1.0, 1.0)).unwrap();
    let dynamic = simulation
        .add_body(BodyDescription::dynamic(
            Pose::default(),
            Shape::cuboid(1.0, 1.0, 1.0).compute_inertia(1.0),
            cube,
            BodyActivity::default(),
        ))
        .unwrap();
    let kinematic = simulation
        .add_body(BodyDescription::kinematic(
            Pose::from_position(Vec3::X * 5.0),
            Velocity::default(),
            cube,
            BodyActivity::default(),
        ))
        .unwrap();
    let floor = simulation
        .add_static(StaticDescription::new(Pose::from_position(-Vec3::Y), cube))
        .unwrap();
    let wall = simulation
        .add_static(StaticDescription::new(Pose::from_position(Vec3::Z * 9.0), cube))
        .unwrap();
    (
        simulation,
        Handles {
            dynamic,
            kinematic,
            floor,
            wall,
        },
    )
}

#[test]
fn pairs_need_a_dynamic_member() {
    let (_, h) = populated_world();
    let policy = ContactPolicy::default();
    let dynamic = CollidableReference::Dynamic(h.dynamic);
    let kinematic = CollidableReference::Kinematic(h.kinematic);
    let floor = CollidableReference::Static(h.floor);
    let wall = CollidableReference::Static(h.wall);

    assert!(policy.allow_contact_generation(&CollidablePair::new(dynamic, floor)));
    assert!(policy.allow_contact_generation(&CollidablePair::new(floor, dynamic)));
    assert!(policy.allow_contact_generation(&CollidablePair::new(dynamic, kinematic)));
    assert!(!policy.allow_contact_generation(&CollidablePair::new(floor, wall)));
    assert!(!policy.allow_contact_generation(&CollidablePair::new(kinematic, floor)));
}

#[test]
fn every_accepted_pair_gets_the_same_material() {
    let (_, h) = populated_world();
    let policy = ContactPolicy::default();
    let pairs = [
        CollidablePair::new(
            CollidableReference::Dynamic(h.dynamic),
            CollidableReference::Static(h.floor),
        ),
        CollidablePair::new(
            CollidableReference::Dynamic(h.dynamic),
            CollidableReference::Kinematic(h.kinematic),
        ),
    ];
    let manifolds = [
        ContactManifold::single(Vec3::Y, Vec3::ZERO, 0.01),
        ContactManifold::single(Vec3::X, Vec3::ONE, -0.05),
    ];

    for (pair, manifold) in pairs.iter().zip(&manifolds) {
        let material = policy
            .configure_contact_manifold(pair, manifold)
            .expect("uniform policy accepts every manifold");
        assert_relative_eq!(material.friction_coefficient, 1.0);
        assert_relative_eq!(material.maximum_recovery_velocity, 2.0);
        assert_relative_eq!(material.contact_spring_settings.frequency(), 30.0, epsilon = 1e-4);
        assert_relative_eq!(material.contact_spring_settings.damping_ratio(), 1.0, epsilon = 1e-6);
    }
}

#[test]
fn gravity_bias_is_gravity_times_step() {
    let mut integrator = GravityIntegrator::default();
    integrator.prepare_for_integration(1.0 / 60.0);
    assert!(integrator
        .gravity_delta()
        .abs_diff_eq(Vec3::new(0.0, -10.0 / 60.0, 0.0), 1e-6));

    let mut velocity = Velocity::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0));
    integrator.integrate_velocity(
        &Pose::default(),
        &BodyInertia::default(),
        &mut velocity,
        0,
        1.0 / 60.0,
    );
    assert!(velocity.linear.abs_diff_eq(Vec3::new(1.0, -10.0 / 60.0, 0.0), 1e-6));
    assert_eq!(velocity.angular, Vec3::new(0.0, 2.0, 0.0));
}

#[test]
fn integrator_settings_match_the_stepper_contract() {
    let integrator = GravityIntegrator::default();
    assert_eq!(
        integrator.angular_integration_mode(),
        AngularIntegrationMode::Nonconserving
    );
    assert!(!integrator.allow_substeps_for_unconstrained_bodies());
    assert!(!integrator.integrate_velocity_for_kinematics());
}

#[test]
fn kinematic_bodies_ignore_gravity() {
    let mut simulation = Simulation::new(SimulationSettings::default()).unwrap();
    let pool = WorkerPool::new(2).unwrap();
    let cube = simulation.add_shape(Shape::cuboid(1.0, 1.0, 1.0)).unwrap();
    let platform = simulation
        .add_body(BodyDescription::kinematic(
            Pose::from_position(Vec3::new(0.0, 50.0, 0.0)),
            Velocity::new(Vec3::X, Vec3::ZERO),
            cube,
            BodyActivity::never_sleep(),
        ))
        .unwrap();

    for _ in 0..60 {
        simulation.timestep(1.0 / 60.0, &pool);
    }

    assert_eq!(simulation.body_velocity(platform).unwrap().linear, Vec3::X);
    let pose = simulation.body_pose(platform).unwrap();
    assert!(pose.position.abs_diff_eq(Vec3::new(1.0, 50.0, 0.0), 1e-4));
}

#[test]
fn gravity_changes_apply_on_the_next_step() {
    let mut simulation = Simulation::new(SimulationSettings::default()).unwrap();
    let pool = WorkerPool::new(1).unwrap();
    let ball = simulation.add_shape(Shape::sphere(0.5)).unwrap();
    let body = simulation
        .add_body(BodyDescription::dynamic(
            Pose::from_position(Vec3::Y * 20.0),
            Shape::sphere(0.5).compute_inertia(1.0),
            ball,
            BodyActivity::never_sleep(),
        ))
        .unwrap();

    simulation.pose_integrator_mut().set_gravity(Vec3::new(0.0, 0.0, 6.0));
    simulation.timestep(0.5, &pool);

    let velocity = simulation.body_velocity(body).unwrap().linear;
    assert_relative_eq!(velocity.z, 3.0, epsilon = 1e-6);
    assert_relative_eq!(velocity.y, 0.0);
}
