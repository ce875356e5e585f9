pub mod bucket;
pub mod config;
pub mod cost_only;
pub mod error;
pub mod heuristic;
pub mod io;
pub mod lookup;
pub mod perm;
pub mod puzzle;
pub mod search;
pub mod step;
pub mod table;
pub mod union_find;

pub use error::{Result, SearchError};
