//! # Shapes — Built-In Scene Geometry
//!
//! The default scene is a colored triangle in front of a textured cube. Both
//! are generated here as flat vertex records ready for
//! [`Mesh::upload`](super::mesh::Mesh::upload); nothing is read from disk.
//!
//! ## Record Formats
//!
//! - Triangle: `position(3) + color(3)`, 3 vertices.
//! - Cube: `texcoord(2) + normal(3) + position(3)`, 36 vertices, in the column
//!   order a typical interchange-format exporter produces, normals included
//!   even though the scene program ignores them.
//!
//! The cube is a plain triangle list (no index buffer): each face is two
//! triangles, and each face gets its own corners so normals and UVs stay
//! per-face.
//!
//! ## Winding and UVs
//!
//! Faces are wound counter-clockwise seen from outside. Texture coordinates
//! cover [0,1]² on every face with `v = 0` on the face's top edge, matching
//! the first row of a texture.

/// Floats per triangle vertex record.
pub const TRIANGLE_STRIDE: usize = 6;
/// Floats per cube vertex record.
pub const CUBE_STRIDE: usize = 8;

/// The scene triangle: red, green and blue corners on the z = 0 plane.
pub fn triangle() -> Vec<f32> {
    #[rustfmt::skip]
    let records = vec![
        // position        color
        -1.0, -1.0, 0.0,   1.0, 0.0, 0.0,
         1.0, -1.0, 0.0,   0.0, 1.0, 0.0,
         0.0,  1.0, 0.0,   0.0, 0.0, 1.0,
    ];
    records
}

/// An axis-aligned cube centered at the origin with the given half extent.
///
/// Returns 36 records of `texcoord(2) + normal(3) + position(3)`.
pub fn cube(half: f32) -> Vec<f32> {
    // (normal, tangent_u, tangent_v) for each face
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        // +X (right)
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        // -X (left)
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        // +Y (top)
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        // -Y (bottom)
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        // +Z (front)
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        // -Z (back)
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    // Corner signs along (u, v) and their texture coordinates.
    let corners: [([f32; 2], [f32; 2]); 4] = [
        ([-1.0, -1.0], [0.0, 1.0]),
        ([1.0, -1.0], [1.0, 1.0]),
        ([1.0, 1.0], [1.0, 0.0]),
        ([-1.0, 1.0], [0.0, 0.0]),
    ];
    // Two CCW triangles per face.
    const FACE_ORDER: [usize; 6] = [0, 1, 2, 0, 2, 3];

    let mut records = Vec::with_capacity(36 * CUBE_STRIDE);
    for (normal, u_dir, v_dir) in &faces {
        for &corner in &FACE_ORDER {
            let ([su, sv], uv) = corners[corner];
            let position: [f32; 3] = std::array::from_fn(|axis| {
                (normal[axis] + u_dir[axis] * su + v_dir[axis] * sv) * half
            });
            records.extend_from_slice(&uv);
            records.extend_from_slice(normal);
            records.extend_from_slice(&position);
        }
    }
    records
}

/// A `size`×`size` RGBA checkerboard of `cells`×`cells` squares alternating
/// between `a` and `b`.
pub fn checker(size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> Vec<u8> {
    let cell = (size / cells.max(1)).max(1);
    let mut pixels = Vec::with_capacity(size as usize * size as usize * 4);
    for y in 0..size {
        for x in 0..size {
            let even = (x / cell + y / cell) % 2 == 0;
            pixels.extend_from_slice(if even { &a } else { &b });
        }
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_has_three_records() {
        assert_eq!(triangle().len(), 3 * TRIANGLE_STRIDE);
    }

    #[test]
    fn cube_has_36_records() {
        assert_eq!(cube(1.0).len(), 36 * CUBE_STRIDE);
    }

    #[test]
    fn cube_positions_lie_on_the_surface() {
        let records = cube(1.0);
        for record in records.chunks_exact(CUBE_STRIDE) {
            let position = &record[5..8];
            let max = position.iter().fold(0.0f32, |m, p| m.max(p.abs()));
            assert!((max - 1.0).abs() < 1e-6, "corner {position:?} is off the cube");
        }
    }

    #[test]
    fn cube_normals_are_unit_length() {
        for record in cube(1.0).chunks_exact(CUBE_STRIDE) {
            let n = &record[2..5];
            let len = (n[0].powi(2) + n[1].powi(2) + n[2].powi(2)).sqrt();
            assert!((len - 1.0).abs() < 1e-6, "normal should be unit length, got {len}");
        }
    }

    #[test]
    fn cube_faces_wind_counter_clockwise_from_outside() {
        let records = cube(1.0);
        for tri in records.chunks_exact(CUBE_STRIDE * 3) {
            let p = |i: usize| {
                let r = &tri[i * CUBE_STRIDE..(i + 1) * CUBE_STRIDE];
                glam::Vec3::new(r[5], r[6], r[7])
            };
            let n = glam::Vec3::new(tri[2], tri[3], tri[4]);
            let face_normal = (p(1) - p(0)).cross(p(2) - p(0));
            assert!(face_normal.dot(n) > 0.0, "triangle winds clockwise");
        }
    }

    #[test]
    fn cube_texcoords_cover_unit_square() {
        for record in cube(1.0).chunks_exact(CUBE_STRIDE) {
            assert!((0.0..=1.0).contains(&record[0]));
            assert!((0.0..=1.0).contains(&record[1]));
        }
    }

    #[test]
    fn checker_alternates() {
        let white = [255, 255, 255, 255];
        let black = [0, 0, 0, 255];
        let px = checker(4, 2, white, black);
        assert_eq!(px.len(), 4 * 4 * 4);
        assert_eq!(&px[0..4], &white);
        // (2, 0) is the next cell along x.
        assert_eq!(&px[8..12], &black);
        // (0, 2) is the next cell along y.
        assert_eq!(&px[(2 * 4) * 4..(2 * 4) * 4 + 4], &black);
        // (2, 2) wraps back.
        assert_eq!(&px[(2 * 4 + 2) * 4..(2 * 4 + 2) * 4 + 4], &white);
    }
}
