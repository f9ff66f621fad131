pub mod api;
pub mod error;
pub mod partner_feed;
