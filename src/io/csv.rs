use crate::error::Result;
use crate::io::FrameWriter;
use crate::world::World;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct CsvWriterConfig {
    pub output_dir: PathBuf,
    pub prefix: String,
    pub write_rigid_bodies: bool,
    pub write_md_particles: bool,
}

impl Default for CsvWriterConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            prefix: "sim".to_string(),
            write_rigid_bodies: true,
            write_md_particles: true,
        }
    }
}

/// Row-oriented CSV writer: one file per frame per entity kind, plus an
/// end-of-run index mapping frame numbers to file names.
pub struct CsvWriter {
    cfg: CsvWriterConfig,
    rb_frames: Vec<usize>,
    md_frames: Vec<usize>,
}

impl CsvWriter {
    /// Create the writer and its output directory.
    ///
    /// Directory creation failure surfaces here, at attach time, never
    /// during the run.
    pub fn new(cfg: CsvWriterConfig) -> Result<Self> {
        std::fs::create_dir_all(&cfg.output_dir)?;
        log::debug!("CSV output directory: {}", cfg.output_dir.display());
        Ok(Self {
            cfg,
            rb_frames: Vec::new(),
            md_frames: Vec::new(),
        })
    }

    fn rb_file_name(&self, frame: usize) -> String {
        format!("{}_rb_{frame:06}.csv", self.cfg.prefix)
    }

    fn md_file_name(&self, frame: usize) -> String {
        format!("{}_md_{frame:06}.csv", self.cfg.prefix)
    }

    fn write_rigid_bodies(&mut self, world: &World, frame: usize) -> Result<()> {
        let name = self.rb_file_name(frame);
        let mut out = BufWriter::new(File::create(self.cfg.output_dir.join(&name))?);

        writeln!(out, "id,x,y,z,vx,vy,vz,mass,radius,kinematic")?;
        for (i, rb) in world.rigid_bodies.iter().enumerate() {
            writeln!(
                out,
                "{i},{},{},{},{},{},{},{},{},{}",
                rb.position.x,
                rb.position.y,
                rb.position.z,
                rb.velocity.x,
                rb.velocity.y,
                rb.velocity.z,
                rb.mass,
                rb.radius,
                u8::from(rb.kinematic)
            )?;
        }
        out.flush()?;
        self.rb_frames.push(frame);
        Ok(())
    }

    fn write_md_particles(&mut self, world: &World, frame: usize) -> Result<()> {
        let name = self.md_file_name(frame);
        let mut out = BufWriter::new(File::create(self.cfg.output_dir.join(&name))?);

        writeln!(out, "id,x,y,z,vx,vy,vz,mass")?;
        for (i, p) in world.md_particles.iter().enumerate() {
            writeln!(
                out,
                "{i},{},{},{},{},{},{},{}",
                p.position.x,
                p.position.y,
                p.position.z,
                p.velocity.x,
                p.velocity.y,
                p.velocity.z,
                p.mass
            )?;
        }
        out.flush()?;
        self.md_frames.push(frame);
        Ok(())
    }

    fn write_index(&self, kind: &str, frames: &[usize]) -> Result<()> {
        if frames.is_empty() {
            return Ok(());
        }
        let name = format!("{}_{kind}_index.csv", self.cfg.prefix);
        let mut out = BufWriter::new(File::create(self.cfg.output_dir.join(name))?);
        writeln!(out, "frame,file")?;
        for &frame in frames {
            let file = format!("{}_{kind}_{frame:06}.csv", self.cfg.prefix);
            writeln!(out, "{frame},{file}")?;
        }
        out.flush()?;
        Ok(())
    }
}

impl FrameWriter for CsvWriter {
    fn write(&mut self, world: &World, frame: usize) -> Result<()> {
        if self.cfg.write_rigid_bodies && !world.rigid_bodies.is_empty() {
            self.write_rigid_bodies(world, frame)?;
        }
        if self.cfg.write_md_particles && !world.md_particles.is_empty() {
            self.write_md_particles(world, frame)?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.write_index("rb", &self.rb_frames)?;
        self.write_index("md", &self.md_frames)?;
        Ok(())
    }
}
