pub mod osm;
pub mod tags;
pub mod types;

pub use osm::*;
pub use tags::Tags;
pub use types::*;
