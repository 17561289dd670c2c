use std::sync::Arc;
use std::sync::atomic::{ AtomicBool, Ordering };
use std::time::Duration;
use once_cell::sync::Lazy;
use tokio::sync::Notify;

/// Global notifier woken when a shutdown has been requested.
static SHUTDOWN: Lazy<Arc<Notify>> = Lazy::new(|| Arc::new(Notify::new()));

/// Latched flag so late subscribers still observe the request.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Returns true once a shutdown has been requested.
pub fn is_shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

/// Request a graceful shutdown and wake everyone waiting on it.
pub fn request_shutdown() {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
    SHUTDOWN.notify_waiters();
}

/// Install signal handlers for graceful shutdown
pub fn install_shutdown_handlers() -> Result<(), String> {
    // Ctrl+C: first press requests a graceful stop, second press force-kills
    ctrlc
        ::set_handler(move || {
            if SHUTDOWN_REQUESTED.swap(true, Ordering::SeqCst) {
                eprintln!("\n🛑 Second Ctrl+C detected - forcing immediate exit.");
                // 130 is the conventional exit code for SIGINT
                std::process::exit(130);
            }

            println!("\n🛑 Received Ctrl+C, initiating graceful shutdown...");
            SHUTDOWN.notify_waiters();
        })
        .map_err(|e| format!("Failed to install Ctrl+C handler: {}", e))?;

    // Install SIGTERM handler for Unix systems
    #[cfg(unix)]
    {
        use tokio::signal::unix::{ signal, SignalKind };
        tokio::spawn(async {
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(stream) => stream,
                Err(e) => {
                    eprintln!("⚠️ Failed to install SIGTERM handler: {}", e);
                    return;
                }
            };

            sigterm.recv().await;
            println!("\n🛑 Received SIGTERM, initiating graceful shutdown...");
            request_shutdown();
        });
    }

    Ok(())
}

/// Block until a shutdown has been requested.
///
/// Re-checks the latched flag on a short interval so a request that fired
/// before this task subscribed to the notifier is never missed.
pub async fn wait_for_shutdown() {
    while !is_shutdown_requested() {
        tokio::select! {
            _ = SHUTDOWN.notified() => {}
            _ = tokio::time::sleep(Duration::from_millis(250)) => {}
        }
    }
}
