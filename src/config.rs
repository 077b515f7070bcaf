// this_file: src/config.rs
//! Pool configuration
//!
//! Two knobs bound the memory a pool keeps alive: how many idle drawables
//! of one shape are retained, and how many sweeps an idle drawable survives.

use crate::error::{Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of idle drawables retained per shape
pub const DEFAULT_MAX_PER_BUCKET: usize = 3;

/// Default number of sweeps an idle drawable survives
pub const DEFAULT_MAX_AGE: u32 = 3;

/// Upper bound accepted for `max_per_bucket`
pub const MAX_PER_BUCKET_LIMIT: usize = 64;

/// Upper bound accepted for `max_age`
pub const MAX_AGE_LIMIT: u32 = 1024;

/// Tunables for [`ResourcePool`](crate::pool::ResourcePool)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Free-list cap per shape. Zero disables retention entirely.
    #[serde(default = "default_max_per_bucket")]
    pub max_per_bucket: usize,
    /// Sweep cycles an idle drawable may sit before it is freed
    #[serde(default = "default_max_age")]
    pub max_age: u32,
}

fn default_max_per_bucket() -> usize {
    DEFAULT_MAX_PER_BUCKET
}

fn default_max_age() -> u32 {
    DEFAULT_MAX_AGE
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_per_bucket: DEFAULT_MAX_PER_BUCKET,
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

impl PoolConfig {
    /// Override the per-shape free-list cap
    pub fn with_max_per_bucket(mut self, max_per_bucket: usize) -> Self {
        self.max_per_bucket = max_per_bucket;
        self
    }

    /// Override the eviction age
    pub fn with_max_age(mut self, max_age: u32) -> Self {
        self.max_age = max_age;
        self
    }

    /// Parse and validate a configuration from JSON. Missing fields take
    /// their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PoolConfig = serde_json::from_str(json)?;
        config.validate()?;
        debug!("Loaded pool config: {:?}", config);
        Ok(config)
    }

    /// Read a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Check that both knobs are within supported bounds
    pub fn validate(&self) -> Result<()> {
        if self.max_age == 0 {
            return Err(Error::InvalidParameter(
                "max_age must be at least 1".into(),
            ));
        }
        if self.max_age > MAX_AGE_LIMIT {
            return Err(Error::InvalidParameter(format!(
                "max_age {} exceeds limit {}",
                self.max_age, MAX_AGE_LIMIT
            )));
        }
        if self.max_per_bucket > MAX_PER_BUCKET_LIMIT {
            return Err(Error::InvalidParameter(format!(
                "max_per_bucket {} exceeds limit {}",
                self.max_per_bucket, MAX_PER_BUCKET_LIMIT
            )));
        }
        Ok(())
    }
}
