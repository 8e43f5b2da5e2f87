//! Airport gazetteer and resolution
//!
//! - Gazetteer: immutable, explicitly constructed airport index
//! - Resolver: code, phrase and free-text destination lookups

pub mod gazetteer;
pub mod resolver;

pub use gazetteer::Gazetteer;
pub use resolver::{AirportMatch, AirportResolver};
