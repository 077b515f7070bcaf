// this_file: src/scenario.rs
//! JSON frame scripts for driving a pool with the software backend
//!
//! A scenario lists frames. Each frame acquires and presents a set of
//! surfaces, optionally signals completion of everything presented earlier,
//! and optionally loses the GPU context first. The [`Simulator`] plays the
//! frame driver: it owns the pool, forwards completion fences and calls
//! [`ResourcePool::end_frame`] at every frame boundary.

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::pool::{PoolStats, ResourcePool};
use crate::resource::Size;
use crate::software::{ReleaseFence, SoftwareAllocator, SoftwareSurface};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Maximum accepted JSON input size (10MB)
pub const MAX_JSON_SIZE: usize = 10 * 1024 * 1024;

/// Maximum frames in one scenario
pub const MAX_FRAMES: usize = 10_000;

/// Maximum acquisitions in one frame
pub const MAX_ACQUIRES_PER_FRAME: usize = 256;

/// Maximum surface side in pixels
pub const MAX_DIMENSION: u32 = 16_384;

/// Default software memory budget
pub const DEFAULT_MEMORY_BUDGET_MB: usize = 256;

/// Maximum software memory budget a scenario may request
pub const MAX_MEMORY_BUDGET_MB: usize = 512;

/// A complete frame script
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scenario {
    /// Pool tunables
    #[serde(default)]
    pub config: PoolConfig,
    /// Budget for the software backend in megabytes
    #[serde(default = "default_memory_budget")]
    pub memory_budget_mb: usize,
    /// Frames to play in order
    pub frames: Vec<FrameScript>,
}

fn default_memory_budget() -> usize {
    DEFAULT_MEMORY_BUDGET_MB
}

fn default_true() -> bool {
    true
}

/// One frame of a scenario
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FrameScript {
    /// Sizes to acquire, paint and present this frame
    #[serde(default)]
    pub acquire: Vec<Size>,
    /// Signal completion for every surface presented in earlier frames
    /// before acquiring
    #[serde(default = "default_true")]
    pub complete_previous: bool,
    /// Lose and recreate the GPU context before anything else
    #[serde(default)]
    pub context_lost: bool,
}

/// Per-frame output line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameOutcome {
    /// Zero-based frame index
    pub frame: usize,
    /// Surfaces acquired and presented
    pub acquired: usize,
    /// Acquisitions that failed and were skipped
    pub skipped: usize,
    /// Surfaces returned from the presenter this frame
    pub recycled: usize,
    /// Surfaces evicted by this frame's sweep
    pub evicted: usize,
    /// Pool state after the frame
    pub stats: PoolStats,
}

/// Parse and validate a scenario from JSON
pub fn parse_scenario(json: &str) -> Result<Scenario> {
    if json.len() > MAX_JSON_SIZE {
        return Err(Error::InvalidParameter(format!(
            "scenario input of {} bytes exceeds limit of {} bytes",
            json.len(),
            MAX_JSON_SIZE
        )));
    }
    let scenario: Scenario = serde_json::from_str(json)?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}

/// Check scenario limits and pool config
pub fn validate_scenario(scenario: &Scenario) -> Result<()> {
    scenario.config.validate()?;

    if scenario.frames.is_empty() {
        return Err(Error::InvalidParameter("scenario has no frames".into()));
    }
    if scenario.frames.len() > MAX_FRAMES {
        return Err(Error::InvalidParameter(format!(
            "scenario has {} frames, limit is {}",
            scenario.frames.len(),
            MAX_FRAMES
        )));
    }
    if scenario.memory_budget_mb == 0 {
        return Err(Error::InvalidParameter(
            "memory_budget_mb must be at least 1".into(),
        ));
    }
    if scenario.memory_budget_mb > MAX_MEMORY_BUDGET_MB {
        return Err(Error::InvalidParameter(format!(
            "memory_budget_mb {} exceeds limit of {}",
            scenario.memory_budget_mb, MAX_MEMORY_BUDGET_MB
        )));
    }

    for (index, frame) in scenario.frames.iter().enumerate() {
        if frame.acquire.len() > MAX_ACQUIRES_PER_FRAME {
            return Err(Error::InvalidParameter(format!(
                "frame {} acquires {} surfaces, limit is {}",
                index,
                frame.acquire.len(),
                MAX_ACQUIRES_PER_FRAME
            )));
        }
        for size in &frame.acquire {
            if size.is_empty() {
                return Err(Error::InvalidParameter(format!(
                    "frame {} requests empty surface {}",
                    index, size
                )));
            }
            if size.width > MAX_DIMENSION || size.height > MAX_DIMENSION {
                return Err(Error::InvalidParameter(format!(
                    "frame {} requests surface {} larger than {}px",
                    index, size, MAX_DIMENSION
                )));
            }
        }
    }

    debug!("Validated scenario with {} frames", scenario.frames.len());
    Ok(())
}

/// Frame driver for the software backend
pub struct Simulator {
    pool: ResourcePool<SoftwareSurface, SoftwareAllocator>,
    in_flight: Vec<ReleaseFence>,
    frame: usize,
}

impl Simulator {
    pub fn new(config: PoolConfig, memory_budget_mb: usize) -> Result<Self> {
        let allocator = SoftwareAllocator::new(memory_budget_mb);
        Ok(Self {
            pool: ResourcePool::new(config, allocator)?,
            in_flight: Vec::new(),
            frame: 0,
        })
    }

    /// Simulator configured from a scenario's header
    pub fn for_scenario(scenario: &Scenario) -> Result<Self> {
        Self::new(scenario.config, scenario.memory_budget_mb)
    }

    pub fn pool(&self) -> &ResourcePool<SoftwareSurface, SoftwareAllocator> {
        &self.pool
    }

    /// Play one frame
    pub fn step(&mut self, script: &FrameScript) -> Result<FrameOutcome> {
        if script.context_lost {
            info!("frame {}: GPU context lost", self.frame);
            self.pool.allocator().lose_context();
            self.pool.on_gpu_context_destroyed();
            self.pool.on_gpu_context_created();
        }

        let mut recycled = 0;
        if script.complete_previous {
            for fence in self.in_flight.drain(..) {
                fence.signal();
            }
            recycled += self.pool.drain_completions();
        }

        let mut acquired = 0;
        let mut skipped = 0;
        for &size in &script.acquire {
            match self.pool.acquire(size) {
                Ok(mut surface) => {
                    surface.clear([0, 0, 0, 0xff]);
                    self.in_flight.push(surface.release_fence());
                    self.pool.submit(surface);
                    acquired += 1;
                }
                Err(err) if err.is_frame_skippable() => {
                    warn!("frame {}: skipping {} surface: {}", self.frame, size, err);
                    skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        let report = self.pool.end_frame();
        let outcome = FrameOutcome {
            frame: self.frame,
            acquired,
            skipped,
            recycled: recycled + report.recycled,
            evicted: report.evicted,
            stats: report.stats,
        };
        self.frame += 1;
        Ok(outcome)
    }

    /// Play every frame of `scenario`
    pub fn run(&mut self, scenario: &Scenario) -> Result<Vec<FrameOutcome>> {
        scenario
            .frames
            .iter()
            .map(|frame| self.step(frame))
            .collect()
    }
}
