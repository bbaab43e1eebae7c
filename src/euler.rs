//! Euler angle / rotation matrix conversions.
//!
//! Angles are `[yaw, pitch, roll]` in radians. Matrices are row-major and
//! only ever produced by [`euler_to_rmat`] or by composing/transposing such
//! matrices, so they stay orthonormal and `transpose` is the inverse.

/// Row-major 3x3 rotation matrix.
pub type Rmat = [[f64; 3]; 3];

/// Generic 3-vector; `[yaw, pitch, roll]` when holding angles.
pub type Vec3 = [f64; 3];

pub const IDENTITY: Rmat = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Below this the pitch is treated as +-90 degrees and yaw folds into roll.
const GIMBAL_EPS: f64 = 1e-10;

/// Build a rotation matrix from `[yaw, pitch, roll]` in radians.
///
/// Angles are negated before use; the composition is Z(yaw) * Y(pitch) * X(roll)
/// of the negated angles, which is the inverse of [`rmat_to_euler`].
pub fn euler_to_rmat(e: &Vec3) -> Rmat {
    let (s1, c1) = (-e[0]).sin_cos();
    let (s2, c2) = (-e[1]).sin_cos();
    let (s3, c3) = (-e[2]).sin_cos();

    [
        [c1 * c2, c1 * s2 * s3 - c3 * s1, s1 * s3 + c1 * c3 * s2],
        [c2 * s1, c1 * c3 + s1 * s2 * s3, c3 * s1 * s2 - c1 * s3],
        [-s2, c2 * s3, c2 * c3],
    ]
}

/// Recover `[yaw, pitch, roll]` in radians from a rotation matrix.
pub fn rmat_to_euler(r: &Rmat) -> Vec3 {
    let cy = (r[2][2] * r[2][2] + r[2][1] * r[2][1]).sqrt();
    if cy > GIMBAL_EPS {
        [
            (-r[1][0]).atan2(r[0][0]),
            r[2][0].atan2(cy),
            (-r[2][1]).atan2(r[2][2]),
        ]
    } else {
        [0.0, r[2][0].atan2(cy), r[1][2].atan2(r[1][1])]
    }
}

pub fn mul(a: &Rmat, b: &Rmat) -> Rmat {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

pub fn mul_vec(a: &Rmat, v: &Vec3) -> Vec3 {
    [
        a[0][0] * v[0] + a[0][1] * v[1] + a[0][2] * v[2],
        a[1][0] * v[0] + a[1][1] * v[1] + a[1][2] * v[2],
        a[2][0] * v[0] + a[2][1] * v[1] + a[2][2] * v[2],
    ]
}

pub fn transpose(a: &Rmat) -> Rmat {
    [
        [a[0][0], a[1][0], a[2][0]],
        [a[0][1], a[1][1], a[2][1]],
        [a[0][2], a[1][2], a[2][2]],
    ]
}

/// Degrees to radians, elementwise.
pub fn to_radians(v: &Vec3) -> Vec3 {
    [v[0].to_radians(), v[1].to_radians(), v[2].to_radians()]
}

/// Radians to degrees, elementwise.
pub fn to_degrees(v: &Vec3) -> Vec3 {
    [v[0].to_degrees(), v[1].to_degrees(), v[2].to_degrees()]
}

pub fn scale(v: &Vec3, k: f64) -> Vec3 {
    [v[0] * k, v[1] * k, v[2] * k]
}

pub fn rmat_is_finite(r: &Rmat) -> bool {
    r.iter().flatten().all(|v| v.is_finite())
}
