use contact_dynamics::*;

const DT: f32 = 1.0 / 60.0;

fn make_world(restitution: f32) -> (PhysicsWorld, BodyHandle) {
    let mut world = PhysicsWorld::default();
    world.add_body(
        RigidBody::fixed(ColliderShape::half_space(Vec3::Y))
            .with_material(Material::frictionless(restitution)),
    );
    // Hovering 0.04 above the floor, inside the speculative margin, and diving fast.
    let mut ball = RigidBody::new(ColliderShape::sphere(0.5))
        .with_position(Vec3::new(0.0, 0.54, 0.0))
        .with_material(Material::frictionless(restitution));
    ball.set_linear_velocity(Vec3::new(0.0, -30.0, 0.0)).unwrap();
    let ball = world.add_body(ball);
    (world, ball)
}

#[test]
fn speculative_contact_prevents_penetration() {
    let (mut world, ball) = make_world(0.0);
    world.step(DT).unwrap();

    let body = world.body(ball).unwrap();
    assert!(body.position().y >= 0.5 - 1e-3, "ball sank to y = {}", body.position().y);
    // Closing speed is limited to what covers the gap in one step.
    assert!(
        (body.linear_velocity().y + 0.04 / DT).abs() < 1e-2,
        "vy = {}",
        body.linear_velocity().y
    );
}

#[test]
fn speculative_contact_keeps_its_bounce() {
    let (mut world, ball) = make_world(0.5);
    world.step(DT).unwrap();
    let after_first = world.body(ball).unwrap().linear_velocity().y;
    assert!(after_first < 0.0, "the bounce waits until the bodies touch");

    world.step(DT).unwrap();
    let rebound = world.body(ball).unwrap().linear_velocity().y;
    let expected = 0.5 * (30.0 + 9.81 * DT);
    assert!((rebound - expected).abs() < 0.5, "rebound {rebound}, expected {expected}");
}

#[test]
fn far_bodies_are_not_reported() {
    let mut world = PhysicsWorld::default();
    world.add_body(RigidBody::fixed(ColliderShape::half_space(Vec3::Y)));
    world.add_body(
        RigidBody::new(ColliderShape::sphere(0.5)).with_position(Vec3::new(0.0, 0.6, 0.0)),
    );
    world.step(DT).unwrap();
    assert!(world.arbiters().is_empty());
    assert_eq!(world.last_metrics().contacts_solved, 0);
}
