//! User input: debounced button edges and the 3-position switch

pub mod buttons;
pub mod switch;

pub use buttons::{classify, edge_watch_loop, EdgeLedger, Press};
pub use switch::Switch;
