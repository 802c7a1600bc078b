use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{error, info, warn};
use parking_lot::Mutex;

use spy_pi::camera::{Camera, RpiCamera};
use spy_pi::config::{CHAT_ID_ENV, TOKEN_ENV, TelegramCredentials};
use spy_pi::input::{Key, KeyInput, StdinKeys};
use spy_pi::servo::{PanTiltHat, ServoDriver};
use spy_pi::shutdown;
use spy_pi::snapshot::SnapshotHandler;
use spy_pi::telegram::{TelegramBot, run_polling};
use spy_pi::{Config, Result, Turret};

struct Args {
    config_path: Option<PathBuf>,
    debug: bool,
}

/// Supports:
/// - `spy-pi <path>` (positional)
/// - `spy-pi --config <path>` / `-c <path>`
/// - `--debug` anywhere, to log every position change
fn parse_args() -> Args {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut config_path = None;
    let mut debug = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--debug" | "-d" => debug = true,
            "--config" | "-c" if i + 1 < args.len() => {
                config_path = Some(PathBuf::from(&args[i + 1]));
                i += 1;
            }
            other if !other.starts_with('-') && config_path.is_none() => {
                config_path = Some(PathBuf::from(other));
            }
            other => eprintln!("Ignoring unknown argument: {other}"),
        }
        i += 1;
    }

    Args { config_path, debug }
}

/// Stops the preview when the main loop ends, however it ends.
struct PreviewGuard(Arc<Mutex<RpiCamera>>);

impl Drop for PreviewGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.lock().stop() {
            warn!("Failed to stop camera: {e}");
        }
    }
}

fn start_telegram(
    config: &Config,
    camera: &Arc<Mutex<RpiCamera>>,
    running: &Arc<AtomicBool>,
) -> Result<()> {
    let Some(credentials) = TelegramCredentials::from_env() else {
        info!("Telegram disabled: set {TOKEN_ENV} and {CHAT_ID_ENV} to enable snapshots");
        return Ok(());
    };

    let bot = Arc::new(TelegramBot::new(&credentials, &config.telegram)?);
    let size = camera.lock().snapshot_size();
    let handler = SnapshotHandler::new(
        Arc::clone(camera),
        Arc::clone(&bot),
        credentials.chat_id,
        size,
        &config.telegram,
    );

    let running = Arc::clone(running);
    let backoff = config.telegram.retry_backoff();
    thread::Builder::new()
        .name("telegram-poll".to_string())
        .spawn(move || {
            run_polling(bot.as_ref(), &running, backoff, |message| {
                // Workers run detached; each reports its own outcome
                let _ = handler.handle(message);
            });
        })?;

    Ok(())
}

fn control_loop<S: ServoDriver, K: KeyInput>(
    turret: &Turret<S>,
    keys: &mut K,
    running: &AtomicBool,
    interval: Duration,
) {
    while running.load(Ordering::Relaxed) {
        match keys.poll_key(interval) {
            Some(Key::Quit) => {
                info!("Quit requested");
                break;
            }
            Some(key) => {
                if let Err(e) = turret.handle_key(key) {
                    warn!("Servo command failed: {e}");
                }
            }
            None => {}
        }
    }
}

fn main() -> Result<()> {
    let args = parse_args();
    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    info!("SpyPi v{} starting...", env!("CARGO_PKG_VERSION"));
    match &args.config_path {
        Some(path) => info!("Using config: {}", path.display()),
        None => info!("Using built-in defaults"),
    }
    let config = Config::load(args.config_path.as_deref())?;

    // SIGINT and SIGTERM both end the main loop so the guards below run
    let running = shutdown::install()?;

    // Angles start at 0; nothing moves until the enable thread runs
    let turret = Arc::new(Turret::new(PanTiltHat::new()?, config.motion.clone())?);

    let camera = Arc::new(Mutex::new(RpiCamera::new(config.camera.clone())));
    camera.lock().start()?;
    let _preview = PreviewGuard(Arc::clone(&camera));

    start_telegram(&config, &camera, &running)?;

    let enabler = Arc::clone(&turret);
    thread::Builder::new()
        .name("servo-enable".to_string())
        .spawn(move || {
            if let Err(e) = enabler.enable() {
                error!("Servos unavailable: {e}");
            }
        })?;

    let mut keys = StdinKeys::spawn()?;
    info!("Controls: w/s tilt, a/d pan, q quit (Enter sends keys). Press Ctrl-C to stop.");

    control_loop(&turret, &mut keys, &running, config.input.poll_interval());

    info!("SpyPi stopped at {}", turret.position());
    Ok(())
}
