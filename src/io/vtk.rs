use crate::error::Result;
use crate::io::FrameWriter;
use crate::world::World;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct VtkWriterConfig {
    pub output_dir: PathBuf,
    pub prefix: String,
    pub write_rigid_bodies: bool,
    pub write_md_particles: bool,
}

impl Default for VtkWriterConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            prefix: "sim".to_string(),
            write_rigid_bodies: true,
            write_md_particles: true,
        }
    }
}

/// Point-cloud frame writer in VTK XML unstructured-grid format.
///
/// Each frame becomes one ASCII `.vtu` file per entity kind (points with
/// per-point velocity, mass, and for bodies radius and kinematic flag);
/// `finalize` emits `.pvd` collection files mapping timesteps to frames so
/// the run opens as a time series in ParaView.
pub struct VtkWriter {
    cfg: VtkWriterConfig,
    rb_frames: Vec<usize>,
    md_frames: Vec<usize>,
}

impl VtkWriter {
    /// Create the writer and its output directory; failure surfaces at
    /// attach time.
    pub fn new(cfg: VtkWriterConfig) -> Result<Self> {
        std::fs::create_dir_all(&cfg.output_dir)?;
        log::debug!("VTK output directory: {}", cfg.output_dir.display());
        Ok(Self {
            cfg,
            rb_frames: Vec::new(),
            md_frames: Vec::new(),
        })
    }

    fn write_rigid_bodies_vtu(&mut self, world: &World, frame: usize) -> Result<()> {
        let name = format!("{}_rb_{frame:06}.vtu", self.cfg.prefix);
        let mut out = BufWriter::new(File::create(self.cfg.output_dir.join(&name))?);
        let n = world.rigid_bodies.len();

        write_vtu_header(&mut out, n)?;
        writeln!(out, "      <Points>")?;
        writeln!(
            out,
            "        <DataArray type=\"Float32\" NumberOfComponents=\"3\" format=\"ascii\">"
        )?;
        for rb in &world.rigid_bodies {
            writeln!(out, "          {} {} {}", rb.position.x, rb.position.y, rb.position.z)?;
        }
        writeln!(out, "        </DataArray>")?;
        writeln!(out, "      </Points>")?;
        write_vtu_vertex_cells(&mut out, n)?;

        writeln!(out, "      <PointData Vectors=\"velocity\" Scalars=\"mass\">")?;
        writeln!(
            out,
            "        <DataArray type=\"Float32\" Name=\"velocity\" NumberOfComponents=\"3\" format=\"ascii\">"
        )?;
        for rb in &world.rigid_bodies {
            writeln!(out, "          {} {} {}", rb.velocity.x, rb.velocity.y, rb.velocity.z)?;
        }
        writeln!(out, "        </DataArray>")?;
        writeln!(
            out,
            "        <DataArray type=\"Float32\" Name=\"mass\" format=\"ascii\">"
        )?;
        for rb in &world.rigid_bodies {
            writeln!(out, "          {}", rb.mass)?;
        }
        writeln!(out, "        </DataArray>")?;
        writeln!(
            out,
            "        <DataArray type=\"Float32\" Name=\"radius\" format=\"ascii\">"
        )?;
        for rb in &world.rigid_bodies {
            writeln!(out, "          {}", rb.radius)?;
        }
        writeln!(out, "        </DataArray>")?;
        writeln!(
            out,
            "        <DataArray type=\"Int32\" Name=\"kinematic\" format=\"ascii\">"
        )?;
        for rb in &world.rigid_bodies {
            writeln!(out, "          {}", u8::from(rb.kinematic))?;
        }
        writeln!(out, "        </DataArray>")?;
        writeln!(out, "      </PointData>")?;
        write_vtu_footer(&mut out)?;

        out.flush()?;
        self.rb_frames.push(frame);
        Ok(())
    }

    fn write_md_particles_vtu(&mut self, world: &World, frame: usize) -> Result<()> {
        let name = format!("{}_md_{frame:06}.vtu", self.cfg.prefix);
        let mut out = BufWriter::new(File::create(self.cfg.output_dir.join(&name))?);
        let n = world.md_particles.len();

        write_vtu_header(&mut out, n)?;
        writeln!(out, "      <Points>")?;
        writeln!(
            out,
            "        <DataArray type=\"Float32\" NumberOfComponents=\"3\" format=\"ascii\">"
        )?;
        for p in world.md_particles.iter() {
            writeln!(out, "          {} {} {}", p.position.x, p.position.y, p.position.z)?;
        }
        writeln!(out, "        </DataArray>")?;
        writeln!(out, "      </Points>")?;
        write_vtu_vertex_cells(&mut out, n)?;

        writeln!(out, "      <PointData Vectors=\"velocity\" Scalars=\"mass\">")?;
        writeln!(
            out,
            "        <DataArray type=\"Float32\" Name=\"velocity\" NumberOfComponents=\"3\" format=\"ascii\">"
        )?;
        for p in world.md_particles.iter() {
            writeln!(out, "          {} {} {}", p.velocity.x, p.velocity.y, p.velocity.z)?;
        }
        writeln!(out, "        </DataArray>")?;
        writeln!(
            out,
            "        <DataArray type=\"Float32\" Name=\"mass\" format=\"ascii\">"
        )?;
        for p in world.md_particles.iter() {
            writeln!(out, "          {}", p.mass)?;
        }
        writeln!(out, "        </DataArray>")?;
        writeln!(out, "      </PointData>")?;
        write_vtu_footer(&mut out)?;

        out.flush()?;
        self.md_frames.push(frame);
        Ok(())
    }

    fn write_pvd(&self, kind: &str, frames: &[usize]) -> Result<()> {
        if frames.is_empty() {
            return Ok(());
        }
        let name = format!("{}_{kind}.pvd", self.cfg.prefix);
        let mut out = BufWriter::new(File::create(self.cfg.output_dir.join(name))?);

        writeln!(out, "<?xml version=\"1.0\"?>")?;
        writeln!(
            out,
            "<VTKFile type=\"Collection\" version=\"0.1\" byte_order=\"LittleEndian\">"
        )?;
        writeln!(out, "  <Collection>")?;
        for &frame in frames {
            let vtu = format!("{}_{kind}_{frame:06}.vtu", self.cfg.prefix);
            writeln!(
                out,
                "    <DataSet timestep=\"{frame}\" file=\"{vtu}\"/>"
            )?;
        }
        writeln!(out, "  </Collection>")?;
        writeln!(out, "</VTKFile>")?;
        out.flush()?;
        Ok(())
    }
}

impl FrameWriter for VtkWriter {
    fn write(&mut self, world: &World, frame: usize) -> Result<()> {
        if self.cfg.write_rigid_bodies && !world.rigid_bodies.is_empty() {
            self.write_rigid_bodies_vtu(world, frame)?;
        }
        if self.cfg.write_md_particles && !world.md_particles.is_empty() {
            self.write_md_particles_vtu(world, frame)?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.write_pvd("rb", &self.rb_frames)?;
        self.write_pvd("md", &self.md_frames)?;
        if !self.rb_frames.is_empty() || !self.md_frames.is_empty() {
            log::debug!("VTK output finalized; open the .pvd files in ParaView");
        }
        Ok(())
    }
}

fn write_vtu_header<W: Write>(out: &mut W, n: usize) -> Result<()> {
    writeln!(out, "<?xml version=\"1.0\"?>")?;
    writeln!(
        out,
        "<VTKFile type=\"UnstructuredGrid\" version=\"0.1\" byte_order=\"LittleEndian\">"
    )?;
    writeln!(out, "  <UnstructuredGrid>")?;
    writeln!(
        out,
        "    <Piece NumberOfPoints=\"{n}\" NumberOfCells=\"{n}\">"
    )?;
    Ok(())
}

/// One `VTK_VERTEX` cell per point.
fn write_vtu_vertex_cells<W: Write>(out: &mut W, n: usize) -> Result<()> {
    writeln!(out, "      <Cells>")?;
    writeln!(
        out,
        "        <DataArray type=\"Int32\" Name=\"connectivity\" format=\"ascii\">"
    )?;
    for i in 0..n {
        writeln!(out, "          {i}")?;
    }
    writeln!(out, "        </DataArray>")?;
    writeln!(
        out,
        "        <DataArray type=\"Int32\" Name=\"offsets\" format=\"ascii\">"
    )?;
    for i in 1..=n {
        writeln!(out, "          {i}")?;
    }
    writeln!(out, "        </DataArray>")?;
    writeln!(
        out,
        "        <DataArray type=\"UInt8\" Name=\"types\" format=\"ascii\">"
    )?;
    for _ in 0..n {
        writeln!(out, "          1")?;
    }
    writeln!(out, "        </DataArray>")?;
    writeln!(out, "      </Cells>")?;
    Ok(())
}

fn write_vtu_footer<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "    </Piece>")?;
    writeln!(out, "  </UnstructuredGrid>")?;
    writeln!(out, "</VTKFile>")?;
    Ok(())
}
