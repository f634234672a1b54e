use contact_dynamics::*;

const DT: f32 = 1.0 / 60.0;

fn ball_pit() -> (PhysicsWorld, Vec<BodyHandle>) {
    let mut world = PhysicsWorld::default();
    let mut handles = vec![world.add_body(RigidBody::fixed(ColliderShape::half_space(Vec3::Y)))];
    for i in 0..4 {
        for j in 0..4 {
            let position = Vec3::new(i as f32 * 0.9, 0.5 + (i + j) as f32 * 0.3, j as f32 * 0.9);
            let ball = RigidBody::new(ColliderShape::sphere(0.5)).with_position(position);
            handles.push(world.add_body(ball));
        }
    }
    (world, handles)
}

#[test]
fn one_arbiter_per_pair_with_bounded_manifolds() {
    let (mut world, _) = ball_pit();
    for _ in 0..60 {
        world.step(DT).unwrap();

        let mut seen = std::collections::HashSet::new();
        for arbiter in world.arbiters().iter() {
            assert!(seen.insert(ArbiterKey::new(arbiter.body1(), arbiter.body2())));
            let contacts = arbiter.contacts();
            assert!(contacts.len() <= 4);
            for contact in contacts.iter() {
                assert_eq!((contact.body1(), contact.body2()), (arbiter.body1(), arbiter.body2()));
                assert!((contact.normal().length() - 1.0).abs() < 1e-4);
                assert!(contact.accumulated_normal_impulse() >= 0.0);
                let cap = (contact.friction() * contact.accumulated_normal_impulse()).abs();
                assert!(contact.accumulated_tangent_impulse().abs() <= cap + 1e-6);
            }
        }
    }
}

#[test]
fn separated_pairs_lose_their_arbiter() {
    let mut world = PhysicsWorld::default().with_gravity(Vec3::ZERO);
    let a = world.add_body(RigidBody::new(ColliderShape::sphere(0.5)));
    let mut mover =
        RigidBody::new(ColliderShape::sphere(0.5)).with_position(Vec3::new(0.99, 0.0, 0.0));
    mover.set_linear_velocity(Vec3::new(3.0, 0.0, 0.0)).unwrap();
    let b = world.add_body(mover);

    world.step(DT).unwrap();
    assert!(world.arbiters().contains(a, b));

    for _ in 0..5 {
        world.step(DT).unwrap();
    }
    assert!(!world.arbiters().contains(b, a));
    assert!(world.arbiters().pooled() >= 1);
}

#[test]
fn removing_a_body_cleans_up_its_pairs() {
    let (mut world, handles) = ball_pit();
    for _ in 0..30 {
        world.step(DT).unwrap();
    }
    let floor = handles[0];
    let touching = world.arbiters().iter().filter(|arbiter| arbiter.involves(floor)).count();
    assert!(touching > 0);

    world.remove_body(floor).unwrap();
    assert!(world.arbiters().iter().all(|arbiter| !arbiter.involves(floor)));
    world.step(DT).unwrap();
}

#[test]
fn external_reports_feed_the_same_arbiter() {
    let mut world = PhysicsWorld::default();
    world.set_detector(NarrowPhase::new(0.0));
    let floor = world.add_body(RigidBody::fixed(ColliderShape::half_space(Vec3::Y)));
    let heavy = world.add_body(
        RigidBody::new(ColliderShape::cuboid(Vec3::splat(0.5)))
            .with_position(Vec3::new(0.0, 0.5, 0.0)),
    );
    for corner in [Vec3::new(0.5, 0.0, 0.5), Vec3::new(-0.5, 0.0, 0.5)] {
        world
            .collision_detected(heavy, floor, corner, corner, Vec3::NEG_Y, 0.0)
            .unwrap();
    }
    let arbiter = world.arbiters().look_up(floor, heavy).unwrap();
    assert_eq!(arbiter.contact_count(), 2);
    assert_eq!(arbiter.body1(), heavy);
    assert!(arbiter.contacts().iter().all(|contact| contact.normal() == Vec3::NEG_Y));
}
