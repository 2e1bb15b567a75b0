//! Queue routing: which resource class runs a piece of work.
//!
//! The decision is made once per work descriptor from its backend flag.
//! Only a short whitelist of backends is known to stay off the GPU; anything
//! else, including no backend at all, is routed to the GPU lane.

use std::fmt;

use crate::job::Flag;

/// Short and long spellings of the backend selector.
pub const BACKEND_FLAG: (&str, &str) = ("b", "backend");

/// Backends that never touch the GPU.
pub const CPU_BACKENDS: &[&str] = &["cpu", "skp", "pdf"];

/// Execution lane for a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    Cpu,
    Gpu,
}

impl ResourceClass {
    /// Every lane, in startup order.
    pub const ALL: [ResourceClass; 2] = [ResourceClass::Cpu, ResourceClass::Gpu];

    pub fn name(self) -> &'static str {
        match self {
            ResourceClass::Cpu => "cpu",
            ResourceClass::Gpu => "gpu",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The backend requested by `flags`; the last occurrence wins.
pub fn backend(flags: &[Flag]) -> Option<&str> {
    let (short, long) = BACKEND_FLAG;
    flags
        .iter()
        .rev()
        .find(|flag| flag.name == short || flag.name == long)
        .map(|flag| flag.value.as_str())
}

/// Pick the lane for work carrying `flags`.
pub fn route(flags: &[Flag]) -> ResourceClass {
    match backend(flags) {
        Some(name) if CPU_BACKENDS.contains(&name) => ResourceClass::Cpu,
        _ => ResourceClass::Gpu,
    }
}
