mod market_data_service;
mod positions_service;
mod summary_service;
mod trader_service;

pub use market_data_service::MarketDataService;
pub use positions_service::PositionsService;
pub use summary_service::SummaryService;
pub use trader_service::TraderService;
