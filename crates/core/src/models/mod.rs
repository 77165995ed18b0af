pub mod analytics;
pub mod ledger;
pub mod lot;
pub mod settings;
pub mod transaction;
