pub mod analytics_service;
pub mod export_service;
pub mod ledger_service;
