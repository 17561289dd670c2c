// Periodic positions table printed to the console when --summary is on.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tokio::sync::Notify;

use crate::{
    arguments::is_summary_enabled,
    broker::broker,
    logger::{log, LogTag},
    positions::{available_open_slots, get_open_positions, Position},
    utils::{check_shutdown_or_delay, format_duration_compact, format_price},
};

pub const SUMMARY_DISPLAY_INTERVAL_SECS: u64 = 15;

const ACCOUNT_FETCH_TIMEOUT_SECS: u64 = 3;

#[derive(Tabled)]
struct OpenPositionDisplay {
    #[tabled(rename = "🏷️ Symbol")]
    symbol: String,
    #[tabled(rename = "↕️ Side")]
    side: String,
    #[tabled(rename = "🔢 Qty")]
    qty: String,
    #[tabled(rename = "📈 Entry")]
    entry: String,
    #[tabled(rename = "💲 Current")]
    current: String,
    #[tabled(rename = "🎯 TP")]
    take_profit: String,
    #[tabled(rename = "🛑 SL")]
    stop_loss: String,
    #[tabled(rename = "📊 P&L (%)")]
    pnl_pct: String,
    #[tabled(rename = "⏱️ Age")]
    age: String,
}

impl OpenPositionDisplay {
    fn from_position(position: &Position) -> Self {
        let current = position
            .current_price
            .map(format_price)
            .unwrap_or_else(|| "-".to_string());

        let pnl_pct = match position.current_price {
            Some(price) if position.entry_fill_confirmed => {
                format!("{:+.2}%", position.unrealized_pnl_pct(price))
            }
            _ => "-".to_string(),
        };

        let side = if position.entry_fill_confirmed {
            position.side.to_string()
        } else {
            format!("{} ⏳", position.side)
        };

        Self {
            symbol: position.display_symbol.clone(),
            side,
            qty: format!("{}", position.quantity),
            entry: format_price(position.basis_price()),
            current,
            take_profit: format_price(position.take_profit_price),
            stop_loss: format_price(position.stop_loss_price),
            pnl_pct,
            age: format_duration_compact(position.entry_time, Utc::now()),
        }
    }
}

/// Print the positions table on a fixed cadence until shutdown.
pub async fn monitor_positions_display(shutdown: Arc<Notify>) {
    log(LogTag::Summary, "START", "📋 Summary display started");

    loop {
        display_positions_table().await;

        if check_shutdown_or_delay(
            &shutdown,
            Duration::from_secs(SUMMARY_DISPLAY_INTERVAL_SECS),
        )
        .await
        {
            break;
        }
    }

    log(LogTag::Summary, "STOP", "Summary display stopped");
}

/// Render the open positions table plus the account/capacity footer and
/// print everything in one shot.
pub async fn display_positions_table() {
    if !is_summary_enabled() {
        return;
    }

    let open_positions = get_open_positions().await;

    let mut output = String::new();
    output.push_str(&format!("\n🔄 Open Positions ({}):\n", open_positions.len()));

    if open_positions.is_empty() {
        output.push_str("  (none)\n");
    } else {
        let displays: Vec<OpenPositionDisplay> = open_positions
            .iter()
            .map(OpenPositionDisplay::from_position)
            .collect();

        let mut table = Table::new(displays);
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::center()));
        output.push_str(&format!("{}\n", table));
    }

    output.push_str(&format!("{}\n", account_footer(open_positions.len()).await));

    print!("{}", output);
}

/// One-line account and capacity summary under the table. Account data
/// degrades to a placeholder when the broker does not answer in time.
async fn account_footer(open_count: usize) -> String {
    let max_open = crate::config::with_config(|cfg| cfg.trading.max_open_positions);

    let account_part = match tokio::time::timeout(
        Duration::from_secs(ACCOUNT_FETCH_TIMEOUT_SECS),
        broker().get_account(),
    )
    .await
    {
        Ok(Ok(account)) => format!(
            "💼 equity {} | buying power {}",
            format_price(account.equity),
            format_price(account.buying_power)
        ),
        Ok(Err(e)) => {
            log(
                LogTag::Summary,
                "WARN",
                &format!("Account fetch for summary failed: {}", e),
            );
            "💼 account unavailable".to_string()
        }
        Err(_) => "💼 account unavailable (timeout)".to_string(),
    };

    format!(
        "{} | 📦 positions {}/{} ({} slot(s) free) | ⏰ uptime {}\n",
        account_part,
        open_count,
        max_open,
        available_open_slots(),
        crate::global::uptime_string()
    )
}
