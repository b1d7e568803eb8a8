use std::collections::HashMap;

use log::debug;

use crate::types::{Mask, Mesh};

use super::tables::{CORNER_OFFSETS, EDGE_CORNERS, EDGE_CROSSINGS, TRIANGLE_EDGES};

/// Runs marching cubes over a binary mask sampled every `step` voxels
///
/// The sampled lattice is padded by one all-outside layer per side so
/// surfaces touching the array border still close. Vertices land on edge
/// midpoints (the 0.5 iso-crossing of a 0/1 field) in voxel coordinates
/// of the unsampled grid.
pub(super) fn extract(mask: &Mask, step: usize) -> Option<Mesh> {
    let (nz, ny, nx) = mask.dim();
    if nz == 0 || ny == 0 || nx == 0 {
        debug!("mesh extraction skipped: empty mask");
        return None;
    }
    let step = step.max(1);

    let samples = |dim: usize| (dim + step - 1) / step + 2;
    let (sz, sy, sx) = (samples(nz), samples(ny), samples(nx));

    // lattice point (i, j, k) samples voxel ((i-1)*step, ...); the pad ring
    // and everything past the array end count as outside
    let inside = |p: [usize; 3]| -> bool {
        if p[0] == 0 || p[1] == 0 || p[2] == 0 {
            return false;
        }
        let (z, y, x) = ((p[0] - 1) * step, (p[1] - 1) * step, (p[2] - 1) * step);
        z < nz && y < ny && x < nx && mask[[z, y, x]]
    };

    let mut vertices: Vec<[f32; 3]> = Vec::new();
    let mut faces: Vec<[u32; 3]> = Vec::new();
    let mut edge_vertex: HashMap<([usize; 3], usize), u32> = HashMap::new();

    for i in 0..sz - 1 {
        for j in 0..sy - 1 {
            for k in 0..sx - 1 {
                let corners: [[usize; 3]; 8] = std::array::from_fn(|c| {
                    let off = CORNER_OFFSETS[c];
                    [i + off[0], j + off[1], k + off[2]]
                });
                let mut case = 0usize;
                for (c, &p) in corners.iter().enumerate() {
                    if !inside(p) {
                        case |= 1 << c;
                    }
                }
                if EDGE_CROSSINGS[case] == 0 {
                    continue;
                }

                let mut cell_verts = [0u32; 12];
                for (e, &(a, b)) in EDGE_CORNERS.iter().enumerate() {
                    if EDGE_CROSSINGS[case] & (1 << e) == 0 {
                        continue;
                    }
                    let key = edge_key(corners[a], corners[b]);
                    let index = *edge_vertex.entry(key).or_insert_with(|| {
                        vertices.push(midpoint(corners[a], corners[b], step));
                        (vertices.len() - 1) as u32
                    });
                    cell_verts[e] = index;
                }

                let row = &TRIANGLE_EDGES[case];
                let mut t = 0;
                while row[t] >= 0 {
                    faces.push([
                        cell_verts[row[t] as usize],
                        cell_verts[row[t + 1] as usize],
                        cell_verts[row[t + 2] as usize],
                    ]);
                    t += 3;
                }
            }
        }
    }

    if faces.is_empty() {
        debug!("mesh extraction skipped: no surface crossings");
        return None;
    }
    let normals = vertex_normals(&vertices, &faces);
    Some(Mesh {
        vertices,
        faces,
        normals,
    })
}

/// Canonical identity of a lattice edge: its lower endpoint and axis
fn edge_key(a: [usize; 3], b: [usize; 3]) -> ([usize; 3], usize) {
    let axis = (0..3).find(|&d| a[d] != b[d]).unwrap_or(0);
    if a[axis] <= b[axis] {
        (a, axis)
    } else {
        (b, axis)
    }
}

/// Midpoint of a lattice edge in voxel coordinates of the unsampled grid
fn midpoint(a: [usize; 3], b: [usize; 3], step: usize) -> [f32; 3] {
    let coord = |l: usize| (l as f32 - 1.0) * step as f32;
    [
        (coord(a[0]) + coord(b[0])) / 2.0,
        (coord(a[1]) + coord(b[1])) / 2.0,
        (coord(a[2]) + coord(b[2])) / 2.0,
    ]
}

/// Per-vertex normals from area-weighted face-normal accumulation
///
/// The raw cross product of two triangle edges has twice the face area as
/// its length, so summing unnormalized cross products weights by area.
fn vertex_normals(vertices: &[[f32; 3]], faces: &[[u32; 3]]) -> Vec<[f32; 3]> {
    let mut normals = vec![[0.0f32; 3]; vertices.len()];
    for face in faces {
        let a = vertices[face[0] as usize];
        let b = vertices[face[1] as usize];
        let c = vertices[face[2] as usize];
        let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let n = [
            u[1] * v[2] - u[2] * v[1],
            u[2] * v[0] - u[0] * v[2],
            u[0] * v[1] - u[1] * v[0],
        ];
        for &vi in face {
            let acc = &mut normals[vi as usize];
            acc[0] += n[0];
            acc[1] += n[1];
            acc[2] += n[2];
        }
    }
    for n in &mut normals {
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if len > 0.0 {
            n[0] /= len;
            n[1] /= len;
            n[2] /= len;
        }
    }
    normals
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use ndarray::Array3;

    use super::*;

    fn ball_mask(dim: usize, center: f32, radius: f32) -> Mask {
        Array3::from_shape_fn((dim, dim, dim), |(z, y, x)| {
            let d = [z as f32 - center, y as f32 - center, x as f32 - center];
            d[0] * d[0] + d[1] * d[1] + d[2] * d[2] < radius * radius
        })
    }

    /// Every directed edge must appear exactly once in a closed,
    /// consistently wound triangle mesh.
    fn assert_watertight(mesh: &Mesh) {
        let mut directed = HashSet::new();
        for face in &mesh.faces {
            for (s, t) in [
                (face[0], face[1]),
                (face[1], face[2]),
                (face[2], face[0]),
            ] {
                assert!(directed.insert((s, t)), "duplicate directed edge {s}->{t}");
            }
        }
        for &(s, t) in &directed {
            assert!(directed.contains(&(t, s)), "unmatched edge {s}->{t}");
        }
    }

    #[test]
    fn test_single_voxel_is_an_octahedron() {
        let mut mask = Array3::from_elem((5, 5, 5), false);
        mask[[2, 2, 2]] = true;
        let mesh = extract(&mask, 1).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.face_count(), 8);
        assert_watertight(&mesh);
    }

    #[test]
    fn test_block_counts_and_euler_characteristic() {
        let mut mask = Array3::from_elem((6, 6, 6), false);
        for z in 2..4 {
            for y in 2..4 {
                for x in 2..4 {
                    mask[[z, y, x]] = true;
                }
            }
        }
        let mesh = extract(&mask, 1).unwrap();
        assert_watertight(&mesh);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.face_count(), 44);
        // closed triangle mesh: E = 3F/2, V - E + F = 2 for one sphere-like shell
        let edges = 3 * mesh.face_count() / 2;
        assert_eq!(
            mesh.vertex_count() as isize - edges as isize + mesh.face_count() as isize,
            2
        );
    }

    #[test]
    fn test_cavity_produces_inner_shell() {
        let mut mask = Array3::from_elem((7, 7, 7), false);
        for z in 2..5 {
            for y in 2..5 {
                for x in 2..5 {
                    mask[[z, y, x]] = true;
                }
            }
        }
        mask[[3, 3, 3]] = false;
        let mesh = extract(&mask, 1).unwrap();
        assert_watertight(&mesh);
        // outer shell plus octahedral cavity: two closed components
        let edges = 3 * mesh.face_count() / 2;
        assert_eq!(
            mesh.vertex_count() as isize - edges as isize + mesh.face_count() as isize,
            4
        );
    }

    #[test]
    fn test_normals_point_away_from_ball_center() {
        let mesh = extract(&ball_mask(16, 7.5, 5.0), 1).unwrap();
        assert_watertight(&mesh);
        for (v, n) in mesh.vertices.iter().zip(mesh.normals.iter()) {
            let r = [v[0] - 7.5, v[1] - 7.5, v[2] - 7.5];
            let dot = r[0] * n[0] + r[1] * n[1] + r[2] * n[2];
            assert!(dot > 0.0, "inward normal at {v:?}");
        }
    }

    #[test]
    fn test_normals_are_unit_length() {
        let mesh = extract(&ball_mask(12, 5.5, 3.5), 1).unwrap();
        for n in &mesh.normals {
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            assert!((len - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_border_touching_mask_still_closes() {
        let mask = Array3::from_elem((4, 4, 4), true);
        let mesh = extract(&mask, 1).unwrap();
        assert_watertight(&mesh);
        // vertices extend half a step past the outermost voxels
        for v in &mesh.vertices {
            for c in v {
                assert!((-0.5..=3.5).contains(c));
            }
        }
    }

    #[test]
    fn test_coarser_step_keeps_full_grid_coordinates() {
        let mesh = extract(&ball_mask(24, 11.5, 8.0), 2).unwrap();
        assert_watertight(&mesh);
        let max = mesh
            .vertices
            .iter()
            .flatten()
            .cloned()
            .fold(f32::MIN, f32::max);
        // a radius-8 ball spans well past index 15 even when sampled at step 2
        assert!(max > 15.0);
        assert!(mesh.face_count() < extract(&ball_mask(24, 11.5, 8.0), 1).unwrap().face_count());
    }

    #[test]
    fn test_empty_mask_is_none() {
        let mask = Array3::from_elem((8, 8, 8), false);
        assert!(extract(&mask, 1).is_none());
    }

    #[test]
    fn test_zero_sized_mask_is_none() {
        let mask = Array3::from_elem((0, 4, 4), false);
        assert!(extract(&mask, 1).is_none());
    }
}
