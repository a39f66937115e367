//! Stack growth for the recursive passes.
//!
//! The parser, resolver and interpreter all recurse once per nesting level
//! (and the interpreter several times per Lox call).  Wrapping those entry
//! points in [`ensure_sufficient_stack`] moves execution onto a freshly
//! allocated segment whenever the remaining native stack drops below
//! [`RED_ZONE`], so deep but finite recursion never aborts the process.
//! Unbounded Lox recursion is cut off separately by the interpreter's call
//! depth limit.

/// Grow when less than this much stack remains (100KB).
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated segment (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_recursion_grows_the_stack() {
        fn depth(n: u64) -> u64 {
            ensure_sufficient_stack(|| if n == 0 { 0 } else { depth(n - 1) + 1 })
        }

        assert_eq!(depth(100_000), 100_000);
    }

    #[test]
    fn passes_results_through() {
        let result: Result<i32, &str> = ensure_sufficient_stack(|| Ok(7));
        assert_eq!(result, Ok(7));
    }
}
