//! Common identifier types used across the learning engine.

/// Unique identifier for an agent in the swarm.
pub type AgentId = String;

/// Name of a learnable skill. Skills are named after task types, e.g.
/// "code_generation" or "debugging".
pub type SkillName = String;

/// Unique identifier for a stored knowledge fragment.
pub type FragmentId = String;

/// Unique identifier for a detected learning pattern.
pub type PatternId = String;

/// Unique identifier for a recorded experience.
pub type ExperienceId = String;
