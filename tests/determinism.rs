use forage_core::config::{SimConfig, SimType};
use forage_core::controller::{ElmanController, RandomTurnController};
use forage_core::recorder::InMemoryRecorder;
use forage_core::simulation::Simulation;
use forage_lib::runner::{controller_input_size, evaluate, Estimator};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn noisy_config(sim_type: SimType) -> SimConfig {
    let mut config = SimConfig::default();
    config.episode.sim_type = sim_type;
    config.episode.seed = 12345;
    config.episode.horizon = 200;
    config.agents.count = 4;
    config.agents.action_noise_std = 0.05;
    config.perception.angle_noise_std = 0.01;
    config.perception.distance_transform = Some("minmax".parse().unwrap());
    config.perception.distance_noise_std = 0.02;
    config.resources.regenerate = true;
    config.resources.units = [5, 15];
    config
}

#[test]
fn test_determinism_consistency() {
    let config = noisy_config(SimType::Basic);
    let run = || {
        let mut sim = Simulation::new(config.clone(), RandomTurnController::new(7, 0.8)).unwrap();
        let mut rec = InMemoryRecorder::new(config.episode.seed, 500.0, 500.0);
        let result = sim.run(&mut rec);
        (result, rec.into_trajectory())
    };
    let (r1, t1) = run();
    let (r2, t2) = run();

    assert_eq!(r1.ticks_elapsed, r2.ticks_elapsed);
    assert_eq!(r1.total_collected, r2.total_collected);
    assert_eq!(r1.first_contact_tick, r2.first_contact_tick);
    assert_eq!(t1, t2, "trajectories should match exactly");
}

#[test]
fn test_different_seeds_diverge() {
    let config = noisy_config(SimType::Nowalls);
    let a = Simulation::new(config.with_seed(1), RandomTurnController::new(7, 0.8)).unwrap();
    let b = Simulation::new(config.with_seed(2), RandomTurnController::new(7, 0.8)).unwrap();
    assert_ne!(a.agents[0].position, b.agents[0].position);
}

#[test]
fn test_parallel_evaluation_matches_sequential() {
    let config = noisy_config(SimType::Walls);
    let input = controller_input_size(&config);
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let net = ElmanController::random(input, 4, &mut rng).unwrap();

    let parallel = evaluate(&config, 8, 50, Estimator::Mean, |_| net.clone()).unwrap();
    for (e, result) in parallel.results.iter().enumerate() {
        let mut sim = Simulation::new(config.with_seed(50 + e as u64), net.clone()).unwrap();
        let sequential = sim.run(&mut forage_core::recorder::NullRecorder);
        assert_eq!(result.ticks_elapsed, sequential.ticks_elapsed);
        assert_eq!(result.terminal_distance, sequential.terminal_distance);
    }
}
