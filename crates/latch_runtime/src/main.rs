//! Latch Engine Runtime
//!
//! Boots logging, loads pool settings and runs a short particle simulation
//! over the component pools: integrate, age, expire and respawn each tick,
//! with every membership change deferred to a single flush. Expiry only
//! retires the entity; the pools follow the allocator's lifecycle events.

use anyhow::{Context, Result};
use latch_core::prelude::*;
use std::{env, fs};
use tracing_subscriber::EnvFilter;

const TICKS: u32 = 120;
const SPAWN_PER_TICK: usize = 8;
const DT: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, Copy, Default)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy)]
struct Velocity {
    x: f32,
    y: f32,
}

/// Ticks left before the particle expires.
#[derive(Debug, Clone, Copy)]
struct Lifetime(u32);

struct Simulation {
    entities: EntityPool,
    positions: QueuedPool<SaturatedPool<Position>>,
    velocities: QueuedPool<DensePool<Velocity>>,
    lifetimes: QueuedPool<SparsePool<Lifetime>>,
    spawned: u64,
}

impl Simulation {
    fn new(settings: &PoolSettings) -> Result<Self> {
        Ok(Self {
            entities: EntityPool::new(settings.saturated_population).with_events(),
            // Every particle starts at the origin.
            positions: QueuedPool::new(SaturatedPool::with_settings(settings)).auto_create_default(),
            velocities: QueuedPool::new(DensePool::with_settings(settings)),
            lifetimes: QueuedPool::new(SparsePool::with_settings(settings)?),
            spawned: 0,
        })
    }

    fn spawn(&mut self, count: usize) -> Result<usize> {
        let mut spawned = 0;
        for _ in 0..count {
            let Some(entity) = self.entities.create() else {
                tracing::warn!("entity population exhausted");
                break;
            };
            let heading = self.spawned as f32 * 0.7;
            self.velocities.create(
                entity,
                Velocity {
                    x: heading.cos(),
                    y: heading.sin(),
                },
            )?;
            self.lifetimes
                .create(entity, Lifetime(10 + (self.spawned % 30) as u32))?;
            self.spawned += 1;
            spawned += 1;
        }
        Ok(spawned)
    }

    /// Replay allocator events into every pool.
    fn sync(&mut self) -> Result<()> {
        let events: Vec<EntityEvent> = self.entities.drain_events().collect();
        self.positions.observe(&events)?;
        self.velocities.observe(&events)?;
        self.lifetimes.observe(&events)?;
        Ok(())
    }

    fn tick(&mut self, tick: u32) -> Result<()> {
        let (pw, vw) = (self.positions.window(), self.velocities.window());
        tie((self.positions.view_mut(&pw)?, self.velocities.view(&vw)?)).for_each(|_, (p, v)| {
            p.x += v.x * DT;
            p.y += v.y * DT;
        });

        let lw = self.lifetimes.window();
        let mut expired = Vec::new();
        for (entity, life) in self.lifetimes.view_mut(&lw)?.iter_mut() {
            life.0 = life.0.saturating_sub(1);
            if life.0 == 0 {
                expired.push(entity);
            }
        }
        for &entity in &expired {
            self.entities.destroy(entity);
        }
        // Destructions must be queued before a recycled index is created again.
        self.sync()?;

        let spawned = self.spawn(SPAWN_PER_TICK)?;
        self.sync()?;

        let report = self.positions.flush()?;
        self.velocities.flush()?;
        self.lifetimes.flush()?;

        tracing::debug!(
            tick,
            spawned,
            expired = report.destroyed,
            live = self.positions.count(),
            "tick complete"
        );
        Ok(())
    }

    fn summarize(&self) -> Result<()> {
        let (pw, lw) = (self.positions.window(), self.lifetimes.window());
        let positions = self.positions.view(&pw)?;
        let lifetimes = self.lifetimes.view(&lw)?;

        let fading = zip((positions, Maybe(lifetimes)))
            .filter(|(_, (_, life))| life.map_or(false, |l| l.0 < 5))
            .count();
        let farthest = positions
            .iter()
            .map(|(_, p)| (p.x * p.x + p.y * p.y).sqrt())
            .fold(0.0f32, f32::max);

        tracing::info!(
            live = positions.len(),
            fading,
            farthest,
            spawned = self.spawned,
            "simulation finished"
        );
        Ok(())
    }
}

/// Settings from the JSON file named by the first argument, or defaults.
fn load_settings() -> Result<PoolSettings> {
    let Some(path) = env::args().nth(1) else {
        return Ok(PoolSettings::default());
    };
    let text =
        fs::read_to_string(&path).with_context(|| format!("reading settings from {path}"))?;
    let settings: PoolSettings =
        serde_json::from_str(&text).with_context(|| format!("parsing settings from {path}"))?;
    settings.validate()?;
    Ok(settings)
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Latch Engine v{}", latch_core::VERSION);
    let settings = load_settings()?;
    tracing::info!(?settings, "pool settings loaded");

    let mut sim = Simulation::new(&settings)?;
    for tick in 0..TICKS {
        sim.tick(tick)?;
    }
    sim.summarize()
}
