//! Frame-by-frame state writers for external tooling.
//!
//! Writers are collaborators of the core: they visit read-only world state at
//! tick boundaries and confine all file-system effects to their configured
//! output directory.

pub mod csv;
pub mod vtk;

use crate::error::Result;
use crate::world::World;

pub use csv::{CsvWriter, CsvWriterConfig};
pub use vtk::{VtkWriter, VtkWriterConfig};

/// A simulation output writer.
pub trait FrameWriter {
    /// Write a single frame of simulation data.
    fn write(&mut self, world: &World, frame: usize) -> Result<()>;

    /// Finalize any multi-frame output (collection/index files).
    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}
