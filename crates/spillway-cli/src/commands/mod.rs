pub mod compose;
pub mod ledger;
pub mod move_channel;
pub mod ordinal;
pub mod parse;
pub mod place;
pub mod remove;
pub mod sanitize;
