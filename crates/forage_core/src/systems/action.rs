//! Per-agent action application: consumption while exploiting, noisy
//! movement otherwise.

use crate::agent::Agent;
use crate::resource::ResourcePatch;
use forage_data::AgentMode;
use rand::Rng;
use rand_distr::StandardNormal;

pub struct ActionContext {
    /// Stdev of the additive action noise, before the ×2 range scaling.
    pub action_noise_std: f64,
}

/// Result of one consumption attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumeOutcome {
    pub granted: f64,
    /// Id of the patch emptied by this attempt.
    pub exhausted: Option<usize>,
}

/// Draws from the patch bound by the resource resolver.
///
/// A patch that is missing (already removed this tick) or already empty
/// grants nothing and returns the agent to `Explore`.
pub fn consume(agent: &mut Agent, patches: &mut [ResourcePatch]) -> ConsumeOutcome {
    let patch = agent
        .bound_patch
        .and_then(|id| patches.iter_mut().find(|p| p.id == id));
    let Some(patch) = patch else {
        agent.mode = AgentMode::Explore;
        return ConsumeOutcome {
            granted: 0.0,
            exhausted: None,
        };
    };

    let was_depleted = patch.is_depleted();
    let (granted, depleted) = patch.deplete(agent.consumption);
    if granted > 0.0 {
        agent.collected += granted;
    } else {
        agent.mode = AgentMode::Explore;
    }

    ConsumeOutcome {
        granted,
        exhausted: (depleted && !was_depleted).then_some(patch.id),
    }
}

/// Moves the agent with the controller action plus Gaussian noise.
pub fn apply_movement<R: Rng + ?Sized>(
    agent: &mut Agent,
    action: f64,
    ctx: &ActionContext,
    rng: &mut R,
) {
    agent.last_action = action;
    let noisy = if ctx.action_noise_std > 0.0 {
        action + rng.sample::<f64, _>(StandardNormal) * ctx.action_noise_std * 2.0
    } else {
        action
    };
    agent.move_with(noisy);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use forage_data::Vec2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn exploiting_agent(patch_id: usize) -> Agent {
        let mut a = Agent::new(0, Vec2::new(50.0, 50.0), 0.0, &SimConfig::default());
        a.mode = AgentMode::Exploit;
        a.on_resource = true;
        a.bound_patch = Some(patch_id);
        a
    }

    #[test]
    fn test_consume_accumulates() {
        let mut patches = vec![ResourcePatch::new(4, Vec2::new(50.0, 50.0), 20.0, 3.0, 1.0, 0)];
        let mut a = exploiting_agent(4);
        let out = consume(&mut a, &mut patches);
        assert_eq!(out.granted, 1.0);
        assert_eq!(out.exhausted, None);
        assert_eq!(a.collected, 1.0);
        assert_eq!(a.mode, AgentMode::Exploit);
    }

    #[test]
    fn test_consume_reports_exhaustion_once() {
        let mut patches = vec![ResourcePatch::new(2, Vec2::new(50.0, 50.0), 20.0, 1.0, 1.0, 0)];
        let mut a = exploiting_agent(2);
        assert_eq!(consume(&mut a, &mut patches).exhausted, Some(2));

        let mut b = exploiting_agent(2);
        let out = consume(&mut b, &mut patches);
        assert_eq!(out.granted, 0.0);
        assert_eq!(out.exhausted, None);
        assert_eq!(b.mode, AgentMode::Explore);
    }

    #[test]
    fn test_consume_missing_patch_grants_nothing() {
        let mut patches = Vec::new();
        let mut a = exploiting_agent(9);
        let out = consume(&mut a, &mut patches);
        assert_eq!(out.granted, 0.0);
        assert_eq!(a.collected, 0.0);
        assert_eq!(a.mode, AgentMode::Explore);
    }

    #[test]
    fn test_movement_without_noise_is_exact() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let ctx = ActionContext {
            action_noise_std: 0.0,
        };
        let mut a = Agent::new(0, Vec2::new(100.0, 100.0), 0.0, &SimConfig::default());
        apply_movement(&mut a, 0.0, &ctx, &mut rng);
        assert_eq!(a.position, Vec2::new(105.0, 100.0));
        assert_eq!(a.last_action, 0.0);
    }

    #[test]
    fn test_movement_noise_perturbs_turn() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let ctx = ActionContext {
            action_noise_std: 0.1,
        };
        let mut a = Agent::new(0, Vec2::new(100.0, 100.0), 0.0, &SimConfig::default());
        apply_movement(&mut a, 0.0, &ctx, &mut rng);
        assert_ne!(a.orientation, 0.0);
        assert_eq!(a.last_action, 0.0);
    }
}
