//! Panic backstop.
//!
//! Installs a panic hook that records the panic through `tracing` (so it
//! reaches the log file as well as the terminal) and then chains to the
//! original hook. Job tasks that panic are reported by the orchestrator
//! using [`panic_message`].

use std::any::Any;
use std::panic::{self, PanicHookInfo};
use std::sync::Once;
use tracing::error;

static INSTALL: Once = Once::new();

/// Initialize the panic handler.
///
/// Subsequent calls are ignored.
pub fn init() {
    INSTALL.call_once(|| {
        let original_hook = panic::take_hook();

        panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            log_panic(info);
            original_hook(info);
        }));
    });
}

fn log_panic(info: &PanicHookInfo<'_>) {
    let location = info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_else(|| "unknown".to_string());
    let thread = std::thread::current();

    error!(
        location = %location,
        thread = thread.name().unwrap_or("<unnamed>"),
        message = %panic_message(info.payload()),
        "Panic"
    );
}

/// Extracts the message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
