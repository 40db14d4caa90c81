//! Stack safety for deep recursion.
//!
//! Parsing, resolution and evaluation all recurse on the host stack once per
//! nested expression or block, and evaluation once more per call.  Wrapping
//! those entry points in [`ensure_sufficient_stack`] grows the stack on demand,
//! so deeply nested source is handled and a deeply recursive Lox program runs
//! into the interpreter's own call‑depth limit (a clean `Stack overflow.`
//! runtime error) instead of crashing the process.

/// Grow the stack if less than this remains (100KB).
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_recursion_does_not_overflow() {
        fn depth(n: u64) -> u64 {
            ensure_sufficient_stack(|| if n == 0 { 0 } else { depth(n - 1) + 1 })
        }

        assert_eq!(depth(100_000), 100_000);
    }
}
