use crate::agents::{agent_rng, Status};
use crate::patch::Domain;
use anyhow::Result;
use epi_common::{MovementConfig, Vec2};
use log::trace;
use rand::prelude::*;
use rand_distr::Normal;
use rayon::prelude::*;

const WALK_STREAM: u64 = 2;
const TRAVEL_STREAM: u64 = 3;

/// Moves the agents for one step and hands every agent that left its patch to
/// the new owner. Returns the number of agents that changed patch.
pub fn move_agents(
    domain: &mut Domain,
    movement: &MovementConfig,
    travel_interval_steps: u32,
    seed: u64,
    step: u32,
) -> Result<usize> {
    random_walk(domain, movement.random_walk_sd, seed, step)?;
    if travel_interval_steps > 0 && (step + 1) % travel_interval_steps == 0 && movement.travel_fraction > 0.0 {
        let travelers = random_travel(domain, movement.travel_fraction, seed, step);
        trace!("Step {}: {} agents travelled.", step, travelers);
    }
    Ok(domain.redistribute())
}

/// Displaces every living agent by a normal step of `sd_cells` cells per axis,
/// wrapping at the domain boundary.
pub fn random_walk(domain: &mut Domain, sd_cells: f32, seed: u64, step: u32) -> Result<()> {
    if sd_cells <= 0.0 {
        return Ok(());
    }
    let normal = Normal::new(0.0_f32, sd_cells)?;
    let geom = &domain.geom;
    let cell_size = Vec2::new(geom.dx[0], geom.dx[1]);

    domain.patches.par_iter_mut().for_each(|patch| {
        let store = &mut patch.store;
        let ids = &store.id;
        let disease = &store.disease;
        store
            .pos_x
            .par_iter_mut()
            .zip(store.pos_y.par_iter_mut())
            .enumerate()
            .for_each(|(i, (x, y))| {
                if disease.iter().any(|d| d.status[i] == Status::Dead) {
                    return;
                }
                let mut rng = agent_rng(seed, ids[i], step, WALK_STREAM);
                let delta = Vec2::new(normal.sample(&mut rng), normal.sample(&mut rng)).hadamard(cell_size);
                let pos = geom.wrap(Vec2::new(*x, *y) + delta);
                *x = pos.x;
                *y = pos.y;
            });
        patch.mark_moved();
    });
    Ok(())
}

/// Relocates each living agent with probability `fraction` to a uniformly
/// random point of the domain. Returns how many agents moved.
pub fn random_travel(domain: &mut Domain, fraction: f64, seed: u64, step: u32) -> usize {
    let geom = &domain.geom;
    domain
        .patches
        .par_iter_mut()
        .map(|patch| {
            let store = &mut patch.store;
            let mut moved = 0usize;
            for i in 0..store.len() {
                if store.is_dead(i) {
                    continue;
                }
                let mut rng = agent_rng(seed, store.id[i], step, TRAVEL_STREAM);
                if !rng.random_bool(fraction) {
                    continue;
                }
                let target = Vec2::new(
                    rng.random_range(geom.prob_lo[0]..geom.prob_hi[0]),
                    rng.random_range(geom.prob_lo[1]..geom.prob_hi[1]),
                );
                store.pos_x[i] = target.x;
                store.pos_y[i] = target.y;
                moved += 1;
            }
            if moved > 0 {
                patch.mark_moved();
            }
            moved
        })
        .sum()
}
