//! Process-wide effect name to handler dispatch table.

use std::collections::HashMap;

use crate::context::EffectContext;
use crate::handlers;

/// A built-in or registered effect handler: schedules automation on an
/// [`EffectContext`] given the effect's raw string parameters.
pub type EffectHandler = fn(&mut EffectContext, &[String]);

/// Maps effect names (`"vib"`, `"port"`, a custom `inst`-file registration,
/// ...) to their handler function.
///
/// Unknown names are simply absent from the map; callers (the playback
/// orchestrator) treat a missing handler the same as any other no-op effect
/// rather than erroring, per testable property 7.
#[derive(Default)]
pub struct EffectRegistry {
    handlers: HashMap<String, EffectHandler>,
}

impl EffectRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self { handlers: HashMap::new() }
    }

    /// Registers (or overwrites) the handler for `name`.
    pub fn register(&mut self, name: impl Into<String>, handler: EffectHandler) {
        self.handlers.insert(name.into(), handler);
    }

    /// Looks up the handler registered for `name`.
    pub fn get(&self, name: &str) -> Option<EffectHandler> {
        self.handlers.get(name).copied()
    }

    /// Applies the effect named `name` to `ctx`, if it is registered.
    /// Returns whether a handler was found and run.
    pub fn apply(&self, name: &str, ctx: &mut EffectContext, params: &[String]) -> bool {
        match self.get(name) {
            Some(handler) => {
                handler(ctx, params);
                true
            }
            None => false,
        }
    }
}

/// Builds the registry of built-in effects every BeatBax song can use
/// without declaring an `effect` preset first.
pub fn default_registry() -> EffectRegistry {
    let mut registry = EffectRegistry::new();
    registry.register("pan", handlers::pan as EffectHandler);
    registry.register("vib", handlers::vib as EffectHandler);
    registry.register("port", handlers::port as EffectHandler);
    registry.register("arp", handlers::arp as EffectHandler);
    registry.register("volSlide", handlers::vol_slide as EffectHandler);
    registry.register("trem", handlers::trem as EffectHandler);
    registry.register("cut", handlers::cut as EffectHandler);
    registry.register("retrig", handlers::retrig as EffectHandler);
    registry.register("bend", handlers::bend as EffectHandler);
    registry.register("sweep", handlers::sweep as EffectHandler);
    registry.register("echo", handlers::echo as EffectHandler);
    registry
}
