//! Resource profiles and the registry of selectable computation backends.
//!
//! A resource is an immutable descriptor of a model (or comparable backend):
//! what it costs, what it can do, and how large a context it accepts.
//! Profiles are registered at startup and never mutated afterwards.

use crate::error::{OptimizerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a registered resource.
pub type ResourceId = String;

/// Capability tags a resource can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Writing new code
    CodeGeneration,
    /// Reading and reviewing existing code
    CodeAnalysis,
    /// Diagnosing and fixing defects
    Debugging,
    /// Writing and reasoning about tests
    Testing,
    /// Producing prose documentation
    Documentation,
    /// Restructuring code without behavior change
    Refactoring,
    /// Multi-step reasoning over hard problems
    Reasoning,
    /// Accepting very large inputs
    LongContext,
    /// General-purpose text work
    General,
}

/// Immutable descriptor of a selectable computation resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceProfile {
    /// Unique resource identifier (e.g., a model name)
    pub resource_id: ResourceId,

    /// Human-readable display name
    pub display_name: String,

    /// Cost per unit of work
    pub cost_per_unit: f64,

    /// Capability tags this resource advertises
    pub capabilities: Vec<Capability>,

    /// Output quality rating (0 to 100)
    pub quality: u8,

    /// Speed rating (0 to 100)
    pub speed: u8,

    /// Largest context this resource accepts, in units
    pub max_context_units: u64,
}

impl ResourceProfile {
    /// Create a profile with neutral ratings and no capability tags.
    pub fn new(
        resource_id: impl Into<String>,
        display_name: impl Into<String>,
        cost_per_unit: f64,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            display_name: display_name.into(),
            cost_per_unit,
            capabilities: vec![Capability::General],
            quality: 50,
            speed: 50,
            max_context_units: 8192,
        }
    }

    /// Set capability tags.
    pub fn with_capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the quality rating.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.min(100);
        self
    }

    /// Set the speed rating.
    pub fn with_speed(mut self, speed: u8) -> Self {
        self.speed = speed.min(100);
        self
    }

    /// Set the maximum context size in units.
    pub fn with_max_context(mut self, units: u64) -> Self {
        self.max_context_units = units;
        self
    }

    /// Check whether this resource covers every required capability.
    pub fn covers(&self, required: &[Capability]) -> bool {
        required.iter().all(|cap| self.capabilities.contains(cap))
    }
}

/// Registry of resources available for selection.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: HashMap<ResourceId, ResourceProfile>,
}

impl ResourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource. Duplicate ids and nonsense profiles are
    /// configuration errors.
    pub fn register(&mut self, profile: ResourceProfile) -> Result<()> {
        if profile.resource_id.is_empty() {
            return Err(OptimizerError::InvalidConfig(
                "resource_id must not be empty".to_string(),
            ));
        }
        if profile.cost_per_unit < 0.0 {
            return Err(OptimizerError::InvalidConfig(format!(
                "cost_per_unit must be non-negative for '{}'",
                profile.resource_id
            )));
        }
        if profile.max_context_units == 0 {
            return Err(OptimizerError::InvalidConfig(format!(
                "max_context_units must be positive for '{}'",
                profile.resource_id
            )));
        }
        if self.resources.contains_key(&profile.resource_id) {
            return Err(OptimizerError::DuplicateResource(profile.resource_id));
        }
        self.resources.insert(profile.resource_id.clone(), profile);
        Ok(())
    }

    /// Get a resource by id.
    pub fn get(&self, resource_id: &str) -> Option<&ResourceProfile> {
        self.resources.get(resource_id)
    }

    /// Get a resource by id, treating absence as a configuration error.
    pub fn require(&self, resource_id: &str) -> Result<&ResourceProfile> {
        self.resources
            .get(resource_id)
            .ok_or_else(|| OptimizerError::UnknownResource(resource_id.to_string()))
    }

    /// Resources that cover the required capabilities and fit the context.
    pub fn candidates(
        &self,
        required: &[Capability],
        estimated_units: u64,
    ) -> Vec<&ResourceProfile> {
        self.resources
            .values()
            .filter(|r| r.covers(required) && r.max_context_units >= estimated_units)
            .collect()
    }

    /// The lowest-cost registered resource, used as the selection fallback.
    pub fn cheapest(&self) -> Option<&ResourceProfile> {
        self.resources.values().min_by(|a, b| {
            a.cost_per_unit
                .partial_cmp(&b.cost_per_unit)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// Iterate over all registered resources.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceProfile> {
        self.resources.values()
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResourceProfile {
        ResourceProfile::new("fast-small", "Fast Small", 0.001)
            .with_capabilities(vec![Capability::CodeGeneration, Capability::General])
            .with_quality(60)
            .with_speed(90)
            .with_max_context(4096)
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ResourceRegistry::new();
        registry.register(sample()).unwrap();

        assert!(registry.get("fast-small").is_some());
        assert!(registry.require("missing").is_err());
    }

    #[test]
    fn test_rejects_duplicates_and_invalid_profiles() {
        let mut registry = ResourceRegistry::new();
        registry.register(sample()).unwrap();

        assert!(matches!(
            registry.register(sample()),
            Err(OptimizerError::DuplicateResource(_))
        ));

        let negative = ResourceProfile::new("bad", "Bad", -1.0);
        assert!(registry.register(negative).is_err());
    }

    #[test]
    fn test_candidates_filter_capability_and_context() {
        let mut registry = ResourceRegistry::new();
        registry.register(sample()).unwrap();
        registry
            .register(
                ResourceProfile::new("deep-large", "Deep Large", 0.01)
                    .with_capabilities(vec![
                        Capability::CodeGeneration,
                        Capability::Reasoning,
                        Capability::LongContext,
                    ])
                    .with_max_context(128_000),
            )
            .unwrap();

        let required = vec![Capability::CodeGeneration, Capability::Reasoning];
        let matches = registry.candidates(&required, 1000);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].resource_id, "deep-large");

        // Context too large for either
        let matches = registry.candidates(&[Capability::CodeGeneration], 200_000);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_cheapest() {
        let mut registry = ResourceRegistry::new();
        registry.register(sample()).unwrap();
        registry
            .register(ResourceProfile::new("pricey", "Pricey", 0.5))
            .unwrap();

        assert_eq!(registry.cheapest().unwrap().resource_id, "fast-small");
    }
}
