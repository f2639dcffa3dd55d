//! Discord interaction handlers
//!
//! Everything that runs outside a command body: gateway events, the cooldown
//! pre-check and post-command hook, and the per-member XP throttle.

/// Cooldown pre-check and post-command hook
pub mod cooldowns;
/// Gateway event handler (message XP, guild join/leave, member welcome)
pub mod events;
/// Per-member XP award throttle
pub mod throttle;
/// Welcome message rendering
pub mod welcome;
