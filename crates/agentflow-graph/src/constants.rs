/// Sentinel node name representing the graph entry point.
pub const START: &str = "__start__";

/// Sentinel node name representing the graph exit point.
pub const END: &str = "__end__";

/// Returns `true` for `START` and `END`.
pub fn is_sentinel(name: &str) -> bool {
    name == START || name == END
}
