pub mod board_refresher;
pub mod catalog;

pub use board_refresher::run_board_refresher;
pub use catalog::{CatalogResolver, CatalogSource, InstrumentFilter};
