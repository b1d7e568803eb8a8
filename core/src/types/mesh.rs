use std::io::Write;
use std::path::Path;

use crate::error::Result;

/// Triangle surface mesh of one segment
///
/// Vertices are in voxel-index coordinates of the source volume; faces are
/// counter-clockwise-outward index triples; normals are unit length, one per
/// vertex.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Mesh {
    pub vertices: Vec<[f32; 3]>,
    pub faces: Vec<[u32; 3]>,
    pub normals: Vec<[f32; 3]>,
}

impl Mesh {
    /// Number of triangles
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the mesh has no geometry
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Writes the mesh as binary STL
    pub fn write_stl(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let mut w = std::io::BufWriter::new(file);

        let mut header = [0u8; 80];
        let tag = b"dentseg mesh";
        header[..tag.len()].copy_from_slice(tag);
        w.write_all(&header)?;
        w.write_all(&(self.faces.len() as u32).to_le_bytes())?;

        for face in &self.faces {
            let [a, b, c] = [
                self.vertices[face[0] as usize],
                self.vertices[face[1] as usize],
                self.vertices[face[2] as usize],
            ];
            let normal = face_normal(a, b, c);
            for v in [normal, a, b, c] {
                for coord in v {
                    w.write_all(&coord.to_le_bytes())?;
                }
            }
            w.write_all(&0u16.to_le_bytes())?;
        }
        w.flush()?;
        Ok(())
    }
}

/// Unit normal of a triangle, zero for degenerate faces
fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > 0.0 {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0, 0.0, 0.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Mesh {
        Mesh {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            faces: vec![[0, 1, 2]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
        }
    }

    #[test]
    fn test_face_normal_unit_length() {
        let n = face_normal([0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]);
        assert!((n[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_write_stl_size() {
        let mesh = unit_triangle();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.stl");
        mesh.write_stl(&path).unwrap();
        let len = std::fs::metadata(&path).unwrap().len();
        // 80-byte header + u32 count + 50 bytes per triangle
        assert_eq!(len, 80 + 4 + 50);
    }
}
