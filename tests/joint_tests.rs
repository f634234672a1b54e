use contact_dynamics::*;

const DT: f32 = 1.0 / 60.0;

#[test]
fn fixed_angle_makes_bodies_spin_together() {
    let mut world = PhysicsWorld::default().with_gravity(Vec3::ZERO);
    let a = world.add_body(RigidBody::new(ColliderShape::cuboid(Vec3::splat(0.5))));
    let mut spinning = RigidBody::new(ColliderShape::cuboid(Vec3::splat(0.5)))
        .with_position(Vec3::new(5.0, 0.0, 0.0));
    spinning.set_angular_velocity(Vec3::new(0.0, 0.0, 2.0)).unwrap();
    let b = world.add_body(spinning);

    let joint = FixedAngle::new(world.body(a).unwrap(), world.body(b).unwrap());
    world.add_constraint(joint).unwrap();

    for _ in 0..30 {
        world.step(DT).unwrap();
    }

    let (wa, wb) = (
        world.body(a).unwrap().angular_velocity(),
        world.body(b).unwrap().angular_velocity(),
    );
    assert!((wa - wb).length() < 1e-3, "relative spin {}", wa - wb);
    assert!((wa.z - 1.0).abs() < 0.05, "shared spin {}", wa.z);

    let relative =
        world.body(b).unwrap().orientation() * world.body(a).unwrap().orientation().transpose();
    assert!((relative - Mat3::IDENTITY).abs_diff_eq(Mat3::ZERO, 1e-2));
}

#[test]
fn bead_stays_on_its_rail_under_gravity() {
    let mut world = PhysicsWorld::default();
    let rail = world.add_body(
        RigidBody::fixed(ColliderShape::cuboid(Vec3::splat(0.1)))
            .with_position(Vec3::new(0.0, 10.0, 0.0)),
    );
    let mut bead = RigidBody::particle(ColliderShape::sphere(0.05));
    bead.set_linear_velocity(Vec3::new(1.0, 0.0, 0.0)).unwrap();
    let bead = world.add_body(bead);

    let joint = PointOnLine::new(
        world.body(rail).unwrap(),
        world.body(bead).unwrap(),
        Vec3::ZERO,
        Vec3::X,
        Vec3::ZERO,
    );
    world.add_constraint(joint).unwrap();

    for _ in 0..60 {
        world.step(DT).unwrap();
    }

    let position = world.body(bead).unwrap().position();
    assert!((position.x - 1.0).abs() < 0.05, "slid to {position}");
    assert!(position.y.abs() < 0.05, "dropped to {position}");
    assert!(position.z.abs() < 1e-4);
}

#[test]
fn constraints_need_known_bodies() {
    let mut world = PhysicsWorld::default();
    let a = world.add_body(RigidBody::new(ColliderShape::sphere(0.5)));
    let b = world.add_body(
        RigidBody::new(ColliderShape::sphere(0.5)).with_position(Vec3::new(3.0, 0.0, 0.0)),
    );
    let joint = FixedAngle::new(world.body(a).unwrap(), world.body(b).unwrap());
    world.remove_body(b).unwrap();
    assert_eq!(world.add_constraint(joint), Err(DynamicsError::UnknownBody(b)));
}
