//! Configuration schema types for `fryfall.toml`
//!
//! Every section is optional and falls back to the defaults the hero page
//! ships with.

use serde::{Deserialize, Serialize};

use crate::hooks::TRAIL_INTERVAL;
use crate::impact::ImpactSpec;
use crate::sim::WindParams;
use crate::sprites::DEFAULT_SOURCES;
use crate::theme::{Theme, ThemeSource, VariableRegistry};

/// Sprite sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpritesConfig {
    /// Image paths, relative to the config file
    pub sources: Vec<String>,
}

impl Default for SpritesConfig {
    fn default() -> Self {
        Self { sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect() }
    }
}

/// Pointer trail settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    /// Emit sparks under the cursor
    pub trail: bool,
    /// Seconds between trail sparks
    pub trail_interval: f64,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self { trail: true, trail_interval: TRAIL_INTERVAL }
    }
}

/// Headless render settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Surface width in CSS pixels
    pub width: u32,
    /// Surface height in CSS pixels
    pub height: u32,
    /// Device pixel ratio, clamped to [1, 2] at render time
    pub dpr: f64,
    /// Simulated frames per second
    pub fps: u32,
    /// Number of frames to simulate
    pub frames: u32,
    /// RNG seed for reproducible output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Behave as if the viewer prefers reduced motion
    pub reduced_motion: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 960,
            height: 540,
            dpr: 1.0,
            fps: 30,
            frames: 90,
            seed: None,
            reduced_motion: false,
        }
    }
}

/// Root configuration structure for `fryfall.toml`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FryfallConfig {
    pub theme: ThemeSource,
    pub wind: WindParams,
    pub sprites: SpritesConfig,
    pub pointer: PointerConfig,
    pub render: RenderConfig,
    /// Scheduled debris bursts
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub impacts: Vec<ImpactSpec>,
}

/// A single validation problem
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "impacts[0].at")
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fryfall.toml: '{}' {}", self.field, self.message)
    }
}

fn problem(field: impl Into<String>, message: impl Into<String>) -> ConfigValidationError {
    ConfigValidationError { field: field.into(), message: message.into() }
}

impl FryfallConfig {
    /// Validate the configuration and return every problem found
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if let Err(e) = self.resolve_theme(&VariableRegistry::new()) {
            errors.push(problem("theme", e.to_string()));
        }

        for (field, amp) in [("wind.amp", self.wind.amp), ("wind.amp2", self.wind.amp2)] {
            if !amp.is_finite() {
                errors.push(problem(field, "must be a finite number"));
            }
        }
        for (field, freq) in [("wind.freq", self.wind.freq), ("wind.freq2", self.wind.freq2)] {
            if !(freq.is_finite() && freq >= 0.0) {
                errors.push(problem(field, "must be a non-negative number"));
            }
        }

        for (i, source) in self.sprites.sources.iter().enumerate() {
            if source.trim().is_empty() {
                errors.push(problem(format!("sprites.sources[{}]", i), "must not be empty"));
            }
        }

        if !(self.pointer.trail_interval.is_finite() && self.pointer.trail_interval > 0.0) {
            errors.push(problem("pointer.trail_interval", "must be a positive number of seconds"));
        }

        if self.render.width == 0 {
            errors.push(problem("render.width", "must be a positive integer"));
        }
        if self.render.height == 0 {
            errors.push(problem("render.height", "must be a positive integer"));
        }
        if !(self.render.dpr.is_finite() && self.render.dpr > 0.0) {
            errors.push(problem("render.dpr", "must be a positive number"));
        }
        if self.render.fps == 0 {
            errors.push(problem("render.fps", "must be a positive integer"));
        }
        if self.render.frames == 0 {
            errors.push(problem("render.frames", "must be a positive integer"));
        }

        for (i, impact) in self.impacts.iter().enumerate() {
            if impact.at.iter().any(|f| !(0.0..=1.0).contains(f)) {
                errors.push(problem(
                    format!("impacts[{}].at", i),
                    "fractions must be between 0.0 and 1.0",
                ));
            }
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Resolve theme colors against variables defined by the host.
    pub fn resolve_theme(
        &self,
        host_vars: &VariableRegistry,
    ) -> Result<Theme, crate::theme::ThemeError> {
        Theme::resolve(&self.theme, host_vars)
    }
}
