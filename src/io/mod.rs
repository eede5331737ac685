//! The `cc_Mesh1` binary cage container.
//!
//! A fixed-layout, little-endian, tightly packed dump of a [`Cage`]:
//! an 8-byte magic and five `i32` counts, then the element maps, vertex
//! points, uvs, creases, and halfedge records in that order. Uvs are
//! optional (the count may be zero); the crease count always equals the
//! edge count. Saving then loading reproduces the cage bit for bit.
//!
//! Failures split into two kinds: [`Error::Io`] for anything the
//! operating system reports (including short reads and writes) and
//! [`Error::Format`] for a file that is not a `cc_Mesh1` container.
//!
//! ```no_run
//! use quadrille::io::{load, save};
//!
//! let cage = load("model.ccm").unwrap();
//! save(&cage, "copy.ccm").unwrap();
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use nalgebra::{Point3, Vector2};

use crate::error::{Error, Result};
use crate::mesh::{Cage, Crease, Halfedge};

const MAGIC: &[u8; 8] = b"cc_Mesh1";

/// Load a cage from a `cc_Mesh1` file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Cage> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);

    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(Error::Format {
            path: path.to_path_buf(),
        });
    }

    let vertex_count = read_count(&mut reader, path)?;
    let uv_count = read_count(&mut reader, path)?;
    let halfedge_count = read_count(&mut reader, path)?;
    let edge_count = read_count(&mut reader, path)?;
    let face_count = read_count(&mut reader, path)?;

    let mut vertex_to_halfedge = vec![0i32; vertex_count];
    let mut edge_to_halfedge = vec![0i32; edge_count];
    let mut face_to_halfedge = vec![0i32; face_count];
    reader.read_i32_into::<LittleEndian>(&mut vertex_to_halfedge)?;
    reader.read_i32_into::<LittleEndian>(&mut edge_to_halfedge)?;
    reader.read_i32_into::<LittleEndian>(&mut face_to_halfedge)?;

    let mut vertex_points = Vec::with_capacity(vertex_count);
    for _ in 0..vertex_count {
        let x = reader.read_f32::<LittleEndian>()?;
        let y = reader.read_f32::<LittleEndian>()?;
        let z = reader.read_f32::<LittleEndian>()?;
        vertex_points.push(Point3::new(x, y, z));
    }

    let mut uvs = Vec::with_capacity(uv_count);
    for _ in 0..uv_count {
        let u = reader.read_f32::<LittleEndian>()?;
        let v = reader.read_f32::<LittleEndian>()?;
        uvs.push(Vector2::new(u, v));
    }

    let mut creases = Vec::with_capacity(edge_count);
    for _ in 0..edge_count {
        creases.push(Crease {
            next: reader.read_i32::<LittleEndian>()?,
            prev: reader.read_i32::<LittleEndian>()?,
            sharpness: reader.read_f32::<LittleEndian>()?,
        });
    }

    let mut halfedges = Vec::with_capacity(halfedge_count);
    for _ in 0..halfedge_count {
        halfedges.push(Halfedge {
            twin: reader.read_i32::<LittleEndian>()?,
            next: reader.read_i32::<LittleEndian>()?,
            prev: reader.read_i32::<LittleEndian>()?,
            face: reader.read_i32::<LittleEndian>()?,
            edge: reader.read_i32::<LittleEndian>()?,
            vertex: reader.read_i32::<LittleEndian>()?,
            uv: reader.read_i32::<LittleEndian>()?,
        });
    }

    Ok(Cage {
        vertex_to_halfedge,
        edge_to_halfedge,
        face_to_halfedge,
        vertex_points,
        uvs,
        creases,
        halfedges,
    })
}

/// Save a cage to a `cc_Mesh1` file.
pub fn save<P: AsRef<Path>>(cage: &Cage, path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    writer.write_all(MAGIC)?;
    writer.write_i32::<LittleEndian>(cage.vertex_count())?;
    writer.write_i32::<LittleEndian>(cage.uv_count())?;
    writer.write_i32::<LittleEndian>(cage.halfedge_count())?;
    writer.write_i32::<LittleEndian>(cage.edge_count())?;
    writer.write_i32::<LittleEndian>(cage.face_count())?;

    for &id in &cage.vertex_to_halfedge {
        writer.write_i32::<LittleEndian>(id)?;
    }
    for &id in &cage.edge_to_halfedge {
        writer.write_i32::<LittleEndian>(id)?;
    }
    for &id in &cage.face_to_halfedge {
        writer.write_i32::<LittleEndian>(id)?;
    }
    for point in &cage.vertex_points {
        writer.write_f32::<LittleEndian>(point.x)?;
        writer.write_f32::<LittleEndian>(point.y)?;
        writer.write_f32::<LittleEndian>(point.z)?;
    }
    for uv in &cage.uvs {
        writer.write_f32::<LittleEndian>(uv.x)?;
        writer.write_f32::<LittleEndian>(uv.y)?;
    }
    for crease in &cage.creases {
        writer.write_i32::<LittleEndian>(crease.next)?;
        writer.write_i32::<LittleEndian>(crease.prev)?;
        writer.write_f32::<LittleEndian>(crease.sharpness)?;
    }
    for halfedge in &cage.halfedges {
        writer.write_i32::<LittleEndian>(halfedge.twin)?;
        writer.write_i32::<LittleEndian>(halfedge.next)?;
        writer.write_i32::<LittleEndian>(halfedge.prev)?;
        writer.write_i32::<LittleEndian>(halfedge.face)?;
        writer.write_i32::<LittleEndian>(halfedge.edge)?;
        writer.write_i32::<LittleEndian>(halfedge.vertex)?;
        writer.write_i32::<LittleEndian>(halfedge.uv)?;
    }

    writer.flush()?;
    Ok(())
}

/// A negative count cannot come from a valid container.
fn read_count(reader: &mut impl Read, path: &Path) -> Result<usize> {
    let count = reader.read_i32::<LittleEndian>()?;
    usize::try_from(count).map_err(|_| Error::Format {
        path: path.to_path_buf(),
    })
}
