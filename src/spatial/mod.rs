//! Spatial acceleration structures.

pub mod neighbor_list;

pub use neighbor_list::{NeighborList, NeighborListConfig, NeighborListStats, NeighborPair};
