//! Collision and interaction resolvers.
//!
//! Resolvers run in a fixed order (wall, landmark, agent, resource) and each
//! overwrites the agent mode it stamps. The resource resolver runs last, so
//! an agent touching a wall while standing on a patch ends the pass in
//! `Exploit`.

use crate::agent::Agent;
use crate::arena::Arena;
use crate::config::Capabilities;
use crate::geometry::{circle_overlap, wrap_angle};
use crate::metrics::Metrics;
use crate::resource::ResourcePatch;
use crate::spatial_hash::SpatialHash;
use forage_data::{AgentMode, Vec2};
use std::f64::consts::{FRAC_PI_8, PI, TAU};

/// Speed added to the deflected agent in reflective collisions.
pub const REFLECT_SPEED_BOOST: f64 = 0.5;

pub struct CollisionContext<'a> {
    pub arena: &'a Arena,
    pub patches: &'a [ResourcePatch],
    pub capabilities: Capabilities,
    /// Index over current agent positions, in agent order.
    pub spatial: &'a SpatialHash,
    pub metrics: &'a Metrics,
}

/// Runs every enabled resolver in order.
pub fn resolve_collisions(agents: &mut [Agent], ctx: &CollisionContext<'_>) {
    if ctx.capabilities.has_walls {
        resolve_wall_contacts(agents, ctx.arena, ctx.metrics);
    }
    if ctx.capabilities.has_landmarks {
        resolve_landmark_contacts(agents, ctx.arena, ctx.metrics);
    }
    resolve_agent_contacts(
        agents,
        ctx.spatial,
        ctx.capabilities.reflective_collisions,
        ctx.metrics,
    );
    resolve_resource_contacts(agents, ctx.patches);
}

/// Marks agents whose bounding square overlaps a wall body. The contact
/// point is the centre of the overlap region.
pub fn resolve_wall_contacts(agents: &mut [Agent], arena: &Arena, metrics: &Metrics) {
    for agent in agents.iter_mut() {
        let body = agent.body();
        for wall in &arena.walls {
            if let Some(clip) = body.clip(&wall.rect) {
                agent.mark_collision(clip.center());
                metrics.record_collision();
            }
        }
    }
}

/// Marks agents overlapping a landmark. The contact point is the midpoint
/// between the two centres.
pub fn resolve_landmark_contacts(agents: &mut [Agent], arena: &Arena, metrics: &Metrics) {
    for agent in agents.iter_mut() {
        for lm in &arena.landmarks {
            if circle_overlap(agent.position, agent.radius, lm.center, lm.radius) {
                agent.mark_collision((agent.position + lm.center) * 0.5);
                metrics.record_collision();
            }
        }
    }
}

/// Marks every agent that overlaps another one.
///
/// Both members of an overlapping pair receive a contact at the centre of
/// their bounding-square overlap. With `reflective` set, each colliding
/// agent also deflects its lowest-indexed partner by π/8 and gives it a
/// speed boost.
pub fn resolve_agent_contacts(
    agents: &mut [Agent],
    spatial: &SpatialHash,
    reflective: bool,
    metrics: &Metrics,
) {
    if agents.len() < 2 {
        return;
    }
    let max_radius = agents.iter().map(|a| a.radius).fold(0.0, f64::max);
    let mut pairs: Vec<(usize, Vec<usize>)> = Vec::new();
    let mut nearby = Vec::new();

    for (i, a) in agents.iter().enumerate() {
        nearby.clear();
        spatial.query_into(a.position.x, a.position.y, a.radius + max_radius, &mut nearby);
        nearby.sort_unstable();
        let hits: Vec<usize> = nearby
            .iter()
            .copied()
            .filter(|&j| j != i && j < agents.len())
            .filter(|&j| circle_overlap(a.position, a.radius, agents[j].position, agents[j].radius))
            .collect();
        if !hits.is_empty() {
            pairs.push((i, hits));
        }
    }

    for (i, hits) in &pairs {
        for &j in hits {
            let contact = agents[*i]
                .body()
                .clip(&agents[j].body())
                .map(|r| r.center())
                .unwrap_or_else(|| (agents[*i].position + agents[j].position) * 0.5);
            agents[*i].mark_collision(contact);
            metrics.record_collision();
        }
        if reflective {
            let j = hits[0];
            agents[j].mode = AgentMode::Collide;
            let from = agents[*i].position;
            deflect(&mut agents[j], from);
        }
    }
}

/// Turns `agent` away from an agent at `from` and queues a speed boost for
/// its next move.
fn deflect(agent: &mut Agent, from: Vec2) {
    let d = agent.position - from;
    let theta = wrap_angle(d.y.atan2(d.x) + agent.orientation);
    if theta > 0.0 && theta < PI {
        agent.orientation -= FRAC_PI_8;
    } else if theta > PI && theta < TAU {
        agent.orientation += FRAC_PI_8;
    }
    agent.bind_orientation();
    agent.speed_boost = (agent.speed_boost + REFLECT_SPEED_BOOST).min(agent.max_vel);
}

/// Binds each agent whose centre lies inside a patch to that patch.
///
/// The first matching patch wins.
pub fn resolve_resource_contacts(agents: &mut [Agent], patches: &[ResourcePatch]) {
    for agent in agents.iter_mut() {
        if let Some(patch) = patches.iter().find(|p| p.contains(agent.position)) {
            agent.mode = AgentMode::Exploit;
            agent.on_resource = true;
            agent.bound_patch = Some(patch.id);
        }
    }
}
