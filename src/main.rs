use reversalbot::{
    arguments::{get_enabled_debug_modes, is_help_requested, is_paper_forced, print_help},
    logger::{self, LogTag},
};

#[tokio::main]
async fn main() {
    // Directories must exist before the logger opens its file sink
    if let Err(e) = reversalbot::paths::ensure_all_directories() {
        eprintln!("❌ Failed to create required directories: {}", e);
        std::process::exit(1);
    }

    logger::init();

    if is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    if let Err(e) = reversalbot::config::load_config() {
        logger::error(LogTag::Config, &format!("Failed to load config: {}", e));
        std::process::exit(1);
    }

    print_startup_banner();

    match reversalbot::run::run_bot().await {
        Ok(_) => {
            logger::info(LogTag::System, "✅ ReversalBot shut down cleanly");
        }
        Err(e) => {
            logger::error(LogTag::System, &format!("❌ ReversalBot failed: {}", e));
            std::process::exit(1);
        }
    }
}

fn print_startup_banner() {
    logger::info(
        LogTag::System,
        &format!("🚀 ReversalBot v{} starting up...", env!("CARGO_PKG_VERSION")),
    );

    let endpoint = if is_paper_forced() {
        "paper (forced by --paper)".to_string()
    } else {
        reversalbot::config::with_config(|cfg| cfg.broker.api_base_url.clone())
    };
    logger::info(LogTag::System, &format!("Broker endpoint: {}", endpoint));

    let modes = get_enabled_debug_modes();
    if !modes.is_empty() {
        logger::info(
            LogTag::System,
            &format!("Enabled modes: {}", modes.join(", ")),
        );
    }
}
