// Market data: bar types, the shared in-memory store and the refresh loop

mod fetcher;
mod store;
mod types;

pub use fetcher::{ fetch_history, market_data_loop, refresh_symbol };
pub use store::{ bars_age_secs, get_bars, latest_close, update_bars, BARS };
pub use types::{ Candle, Timeframe };
