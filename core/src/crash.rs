//! Process-wide crash handler
//!
//! Fatal programmer faults (a required invariant broken beyond recovery)
//! route through [`fatal_error`], which invokes a single process-wide
//! handler. The handler is configured once at library initialization via
//! [`set_crash_handler`] and never mutated afterwards; the default prints
//! the message to stderr and exits with status 666.

use std::sync::OnceLock;

/// Handler invoked on a fatal fault. Must not return control flow to the
/// caller (the library aborts after invoking it regardless).
pub type CrashHandler = fn(message: &str);

static CRASH_HANDLER: OnceLock<CrashHandler> = OnceLock::new();

fn default_crash_handler(message: &str) {
    eprintln!();
    eprintln!("{message}");
    std::process::exit(666);
}

/// Install the crash handler. The first call wins; later calls are ignored.
pub fn set_crash_handler(handler: CrashHandler) {
    let _ = CRASH_HANDLER.set(handler);
}

/// Report a fatal fault and terminate the process.
pub fn fatal_error(message: &str) -> ! {
    let handler = CRASH_HANDLER.get().copied().unwrap_or(default_crash_handler);
    handler(message);
    // A custom handler may return; the fault is still unrecoverable.
    std::process::exit(666);
}
