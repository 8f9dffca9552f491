use forage_core::agent::Agent;
use forage_core::config::SimConfig;
use forage_core::geometry::{angle_between, wrap_angle};
use forage_core::resource::ResourcePatch;
use forage_core::spatial_hash::SpatialHash;
use forage_data::Vec2;
use proptest::prelude::*;
use std::f64::consts::{PI, TAU};

prop_compose! {
    fn arb_position()(
        x in 0.0f64..500.0,
        y in 0.0f64..500.0
    ) -> Vec2 {
        Vec2::new(x, y)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn test_orientation_stays_bound(
        start in -20.0f64..20.0,
        actions in prop::collection::vec(-3.0f64..3.0, 1..50)
    ) {
        let mut agent = Agent::new(0, Vec2::new(250.0, 250.0), start, &SimConfig::default());
        prop_assert!(agent.orientation >= 0.0 && agent.orientation < TAU);
        for a in actions {
            agent.move_with(a);
            prop_assert!(agent.orientation >= 0.0 && agent.orientation < TAU);
        }
    }

    #[test]
    fn test_velocity_bounds(action in -1.0f64..=1.0) {
        let config = SimConfig::default();
        let mut agent = Agent::new(0, Vec2::new(250.0, 250.0), 0.0, &config);
        agent.move_with(action);
        prop_assert!(agent.velocity >= 0.0 && agent.velocity <= config.agents.max_vel);
    }

    #[test]
    fn test_full_turn_stops(sign in prop::bool::ANY, start in 0.0f64..TAU) {
        let mut agent = Agent::new(0, Vec2::new(250.0, 250.0), start, &SimConfig::default());
        agent.move_with(if sign { 1.0 } else { -1.0 });
        prop_assert_eq!(agent.velocity, 0.0);
        prop_assert_eq!(agent.position, Vec2::new(250.0, 250.0));
    }

    #[test]
    fn test_deplete_never_exceeds_caps(
        units in 0.0f64..50.0,
        quality in 0.01f64..5.0,
        requests in prop::collection::vec(-2.0f64..10.0, 1..40)
    ) {
        let mut patch = ResourcePatch::new(0, Vec2::ZERO, 10.0, units, quality, 0);
        let mut total = 0.0;
        for r in requests {
            let before = patch.units_remaining();
            let (granted, depleted) = patch.deplete(r);
            prop_assert!(granted >= 0.0);
            prop_assert!(granted <= quality.min(before) + 1e-12);
            prop_assert_eq!(depleted, patch.units_remaining() <= 0.0);
            if before <= 0.0 {
                prop_assert_eq!((granted, depleted), (0.0, true));
            }
            total += granted;
        }
        prop_assert!(total <= units + 1e-9);
    }

    #[test]
    fn test_angle_between_range(
        heading in 0.0f64..TAU,
        target in arb_position(),
    ) {
        let origin = Vec2::new(250.0, 250.0);
        let dir = Vec2::from_heading(heading) * 10.0;
        let v = target - (origin + dir);
        let angle = angle_between(dir, v, 10.0, v.length());
        prop_assert!(angle > -PI - 1e-12 && angle <= PI + 1e-12);
        prop_assert!(wrap_angle(angle) >= 0.0 && wrap_angle(angle) < TAU);
    }

    #[test]
    fn test_spatial_hash_finds_every_overlap(
        positions in prop::collection::vec(arb_position(), 2..40)
    ) {
        let mut spatial = SpatialHash::new(40.0, 500.0, 500.0);
        spatial.build_parallel(&positions);
        for (i, p) in positions.iter().enumerate() {
            let mut found = Vec::new();
            spatial.query_into(p.x, p.y, 20.0, &mut found);
            for (j, q) in positions.iter().enumerate() {
                if p.distance(*q) < 20.0 {
                    prop_assert!(found.contains(&j), "{} missed neighbour {}", i, j);
                }
            }
        }
    }
}
