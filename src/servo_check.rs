use std::env;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use log::info;

use spy_pi::servo::PanTiltHat;
use spy_pi::shutdown;
use spy_pi::{Axis, Config, Result, Turret};

/// Pause at each end of a sweep so the operator can check the mount.
const HOLD: Duration = Duration::from_millis(500);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Pan-Tilt servo check");
    println!("1. Make sure nothing obstructs the mount");
    println!("2. The mount ramps to its reference, then sweeps each axis to both limits");
    println!("3. Press Ctrl+C to abort between moves\n");

    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    let motion = config.motion.clone();
    let running = shutdown::install()?;

    let turret = Turret::new(PanTiltHat::new()?, config.motion)?;
    turret.enable()?;

    let legs = [
        (Axis::Pan, motion.pan_min, motion.pan_max, motion.reference_pan),
        (Axis::Tilt, motion.tilt_min, motion.tilt_max, motion.reference_tilt),
    ];

    for (axis, min, max, reference) in legs {
        for (label, target) in [("min", min), ("max", max), ("reference", reference)] {
            if !running.load(Ordering::Relaxed) {
                info!("Servo check aborted");
                return Ok(());
            }
            let position = turret.move_to(axis, target)?;
            info!("{axis} {label} ({target}°): {position}");
            thread::sleep(HOLD);
        }
    }

    info!("Servo check complete");
    Ok(())
}
