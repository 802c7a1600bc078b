//! Process-wide shutdown flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;

use crate::error::Result;

/// Install the SIGINT/SIGTERM handler and return the flag it clears.
///
/// Can only be called once per process.
pub fn install() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(false, Ordering::Relaxed);
    })?;
    Ok(running)
}
