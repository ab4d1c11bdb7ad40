pub mod area;
pub mod floor;
pub mod registry;
