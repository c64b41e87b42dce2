pub mod conflict;
pub mod error;
pub mod grid;
pub mod grouping;
pub mod position;

pub use conflict::find_conflicts;
pub use error::AnalyseError;
pub use grid::{OccupancyGrid, DEFAULT_LABEL};
pub use grouping::TopicGroups;
pub use position::{extract_hits, extract_lines, parse_positions, read_hits, read_lines, Coordinate, Hit};
