pub mod health;
pub mod metrics;
pub mod status;
pub mod whales;
pub mod ws;
