//! Mathematical types shared between the player and headless tools.
//!
//! `Vec3` and `Quaternion` are the canonical representations used across
//! the view and framing code. `SymMat3` carries the second-moment and
//! nematic-order tensors that automatic camera framing diagonalizes.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// 3D Vector - positions, directions, camera shifts
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Unit X vector
    pub const X: Self = Self::new(1.0, 0.0, 0.0);

    /// Unit Y vector
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    /// Unit Z vector
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Creates from array
    #[must_use]
    pub const fn from_array(arr: [f32; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction, or `None` for a near-zero vector
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if len > f32::EPSILON {
            Some(self * (1.0 / len))
        } else {
            None
        }
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Quaternion for rotations
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Quaternion {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
    /// W component
    pub w: f32,
}

impl Quaternion {
    /// Creates a new quaternion
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Identity rotation
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Conjugate. For a unit quaternion this is the inverse rotation.
    #[must_use]
    pub const fn conjugate(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Rescales to unit length. Degenerate input collapses to identity.
    #[must_use]
    pub fn normalized(self) -> Self {
        let n = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if n > f32::EPSILON {
            let inv = 1.0 / n;
            Self::new(self.x * inv, self.y * inv, self.z * inv, self.w * inv)
        } else {
            Self::IDENTITY
        }
    }

    /// Rotation of `angle` radians around a unit `axis`
    #[must_use]
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let (s, c) = (angle * 0.5).sin_cos();
        Self::new(axis.x * s, axis.y * s, axis.z * s, c)
    }

    /// Shortest-arc rotation taking direction `from` onto direction `to`.
    ///
    /// Inputs need not be normalized. Degenerate inputs and exactly
    /// opposite directions fall back to a half-turn around a perpendicular
    /// axis, so the result is always a valid rotation.
    #[must_use]
    pub fn rotation_between(from: Vec3, to: Vec3) -> Self {
        let (Some(f), Some(t)) = (from.normalized(), to.normalized()) else {
            return Self::IDENTITY;
        };
        let w = 1.0 + f.dot(t);
        if w < 1e-6 {
            // opposite directions: any perpendicular axis will do
            let axis = f
                .cross(Vec3::X)
                .normalized()
                .or_else(|| f.cross(Vec3::Y).normalized())
                .unwrap_or(Vec3::Z);
            return Self::from_axis_angle(axis, std::f32::consts::PI);
        }
        let axis = f.cross(t);
        Self::new(axis.x, axis.y, axis.z, w).normalized()
    }

    /// Extracts the rotation from an orthonormal 3x3 matrix (Shepperd's method)
    #[must_use]
    pub fn from_rotation_matrix(m: &Mat3) -> Self {
        let t = m.m[0][0] + m.m[1][1] + m.m[2][2];
        let q = if t > 0.0 {
            let s = (t + 1.0).sqrt() * 2.0;
            Self::new(
                (m.m[2][1] - m.m[1][2]) / s,
                (m.m[0][2] - m.m[2][0]) / s,
                (m.m[1][0] - m.m[0][1]) / s,
                0.25 * s,
            )
        } else if m.m[0][0] > m.m[1][1] && m.m[0][0] > m.m[2][2] {
            let s = (1.0 + m.m[0][0] - m.m[1][1] - m.m[2][2]).sqrt() * 2.0;
            Self::new(
                0.25 * s,
                (m.m[0][1] + m.m[1][0]) / s,
                (m.m[0][2] + m.m[2][0]) / s,
                (m.m[2][1] - m.m[1][2]) / s,
            )
        } else if m.m[1][1] > m.m[2][2] {
            let s = (1.0 + m.m[1][1] - m.m[0][0] - m.m[2][2]).sqrt() * 2.0;
            Self::new(
                (m.m[0][1] + m.m[1][0]) / s,
                0.25 * s,
                (m.m[1][2] + m.m[2][1]) / s,
                (m.m[0][2] - m.m[2][0]) / s,
            )
        } else {
            let s = (1.0 + m.m[2][2] - m.m[0][0] - m.m[1][1]).sqrt() * 2.0;
            Self::new(
                (m.m[0][2] + m.m[2][0]) / s,
                (m.m[1][2] + m.m[2][1]) / s,
                0.25 * s,
                (m.m[1][0] - m.m[0][1]) / s,
            )
        };
        q.normalized()
    }

    /// Rotates a vector by this quaternion
    #[must_use]
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let u = Vec3::new(self.x, self.y, self.z);
        let t = u.cross(v) * 2.0;
        v + t * self.w + u.cross(t)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// General 3x3 matrix, row-major (`m[row][col]`)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat3 {
    /// Matrix entries, `m[row][col]`
    pub m: [[f32; 3]; 3],
}

impl Mat3 {
    /// Identity matrix
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Extracts column `c` as a vector
    #[must_use]
    pub const fn column(&self, c: usize) -> Vec3 {
        Vec3::new(self.m[0][c], self.m[1][c], self.m[2][c])
    }
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Symmetric 3x3 matrix stored as its upper triangle.
///
/// Used for the second-moment (inertia-like) tensor of a set of points and
/// for the nematic order tensor of a set of directions. Both are
/// accumulated with [`SymMat3::add_outer`] and diagonalized with
/// [`SymMat3::principal_axes`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SymMat3 {
    /// XX entry
    pub xx: f32,
    /// XY entry
    pub xy: f32,
    /// XZ entry
    pub xz: f32,
    /// YY entry
    pub yy: f32,
    /// YZ entry
    pub yz: f32,
    /// ZZ entry
    pub zz: f32,
}

impl SymMat3 {
    /// Zero matrix
    pub const ZERO: Self = Self {
        xx: 0.0,
        xy: 0.0,
        xz: 0.0,
        yy: 0.0,
        yz: 0.0,
        zz: 0.0,
    };

    /// Accumulates the weighted outer product `w * (v ⊗ v)`
    pub fn add_outer(&mut self, v: Vec3, w: f32) {
        self.xx += w * v.x * v.x;
        self.xy += w * v.x * v.y;
        self.xz += w * v.x * v.z;
        self.yy += w * v.y * v.y;
        self.yz += w * v.y * v.z;
        self.zz += w * v.z * v.z;
    }

    /// Subtracts `s` from the diagonal (traceless normalization)
    pub fn sub_diagonal(&mut self, s: f32) {
        self.xx -= s;
        self.yy -= s;
        self.zz -= s;
    }

    /// Divides every entry by `n`
    pub fn scale(&mut self, f: f32) {
        self.xx *= f;
        self.xy *= f;
        self.xz *= f;
        self.yy *= f;
        self.yz *= f;
        self.zz *= f;
    }

    /// Expands into a full matrix
    #[must_use]
    pub const fn to_mat3(self) -> Mat3 {
        Mat3 {
            m: [
                [self.xx, self.xy, self.xz],
                [self.xy, self.yy, self.yz],
                [self.xz, self.yz, self.zz],
            ],
        }
    }

    /// Eigen-decomposition by cyclic Jacobi rotations.
    ///
    /// Returns eigenvalues in descending order and the matching unit
    /// eigenvectors as the columns of the returned matrix. The eigenvector
    /// basis is made right-handed so it represents a proper rotation.
    #[must_use]
    pub fn principal_axes(self) -> ([f32; 3], Mat3) {
        let mut a = self.to_mat3().m;
        let mut v = Mat3::IDENTITY.m;

        // 16 sweeps is far more than needed for 3x3 convergence
        for _ in 0..16 {
            let off = a[0][1].abs() + a[0][2].abs() + a[1][2].abs();
            if off < 1e-12 {
                break;
            }
            for (p, q) in [(0, 1), (0, 2), (1, 2)] {
                if a[p][q].abs() < 1e-15 {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for k in 0..3 {
                    let akp = a[k][p];
                    let akq = a[k][q];
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..3 {
                    let apk = a[p][k];
                    let aqk = a[q][k];
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in &mut v {
                    let vp = row[p];
                    let vq = row[q];
                    row[p] = c * vp - s * vq;
                    row[q] = s * vp + c * vq;
                }
            }
        }

        // sort eigenpairs by descending eigenvalue
        let mut order = [0_usize, 1, 2];
        order.sort_by(|&i, &j| a[j][j].partial_cmp(&a[i][i]).unwrap_or(std::cmp::Ordering::Equal));
        let values = [a[order[0]][order[0]], a[order[1]][order[1]], a[order[2]][order[2]]];
        let mut vectors = Mat3 {
            m: [
                [v[0][order[0]], v[0][order[1]], v[0][order[2]]],
                [v[1][order[0]], v[1][order[1]], v[1][order[2]]],
                [v[2][order[0]], v[2][order[1]], v[2][order[2]]],
            ],
        };

        // enforce a right-handed basis
        let c0 = vectors.column(0);
        let c1 = vectors.column(1);
        let c2 = vectors.column(2);
        if c0.cross(c1).dot(c2) < 0.0 {
            vectors.m[0][2] = -vectors.m[0][2];
            vectors.m[1][2] = -vectors.m[1][2];
            vectors.m[2][2] = -vectors.m[2][2];
        }

        (values, vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        let sum = a + b;
        assert_eq!(sum.x, 5.0);
        assert_eq!(sum.y, 7.0);
        assert_eq!(sum.z, 9.0);

        let dot = a.dot(b);
        assert_eq!(dot, 32.0); // 1*4 + 2*5 + 3*6

        let cross = Vec3::X.cross(Vec3::Y);
        assert!((cross - Vec3::Z).length() < EPS);
    }

    #[test]
    fn test_vec3_bytemuck() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        let bytes: &[u8] = bytemuck::bytes_of(&v);
        assert_eq!(bytes.len(), 12); // 3 * 4 bytes
    }

    #[test]
    fn test_normalized_zero_vector() {
        assert!(Vec3::ZERO.normalized().is_none());
        let n = Vec3::new(0.0, 3.0, 4.0).normalized().unwrap();
        assert!((n.length() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_quaternion_rotate() {
        let q = Quaternion::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2);
        let r = q.rotate(Vec3::X);
        assert!((r - Vec3::Y).length() < EPS);

        // conjugate rotates back
        let back = q.conjugate().rotate(r);
        assert!((back - Vec3::X).length() < EPS);
    }

    #[test]
    fn test_rotation_between() {
        let q = Quaternion::rotation_between(Vec3::X, Vec3::Y);
        assert!((q.rotate(Vec3::X) - Vec3::Y).length() < EPS);

        // opposite vectors must still produce a half-turn
        let q = Quaternion::rotation_between(Vec3::X, Vec3::new(-1.0, 0.0, 0.0));
        let r = q.rotate(Vec3::X);
        assert!((r + Vec3::X).length() < EPS);

        // degenerate input maps to identity
        assert_eq!(Quaternion::rotation_between(Vec3::ZERO, Vec3::X), Quaternion::IDENTITY);
    }

    #[test]
    fn test_quaternion_from_matrix_roundtrip() {
        let q = Quaternion::from_axis_angle(
            Vec3::new(1.0, 2.0, -0.5).normalized().unwrap(),
            1.1,
        );
        // build the matrix whose columns are the rotated basis vectors
        let cols = [q.rotate(Vec3::X), q.rotate(Vec3::Y), q.rotate(Vec3::Z)];
        let m = Mat3 {
            m: [
                [cols[0].x, cols[1].x, cols[2].x],
                [cols[0].y, cols[1].y, cols[2].y],
                [cols[0].z, cols[1].z, cols[2].z],
            ],
        };
        let r = Quaternion::from_rotation_matrix(&m);
        // q and -q encode the same rotation
        let same = (r.x - q.x).abs() < EPS && (r.w - q.w).abs() < EPS;
        let flip = (r.x + q.x).abs() < EPS && (r.w + q.w).abs() < EPS;
        assert!(same || flip);
    }

    #[test]
    fn test_principal_axes_diagonal() {
        let m = SymMat3 {
            xx: 1.0,
            yy: 5.0,
            zz: 3.0,
            ..SymMat3::ZERO
        };
        let (values, vectors) = m.principal_axes();
        assert!((values[0] - 5.0).abs() < EPS);
        assert!((values[1] - 3.0).abs() < EPS);
        assert!((values[2] - 1.0).abs() < EPS);
        // dominant eigenvector is ±Y
        let c0 = vectors.column(0);
        assert!(c0.dot(Vec3::Y).abs() > 1.0 - EPS);
    }

    #[test]
    fn test_principal_axes_off_diagonal() {
        // moment tensor of points spread along the (1,1,0) diagonal
        let mut m = SymMat3::ZERO;
        let d = Vec3::new(1.0, 1.0, 0.0).normalized().unwrap();
        m.add_outer(d, 4.0);
        m.add_outer(Vec3::Z, 1.0);
        let (values, vectors) = m.principal_axes();
        assert!((values[0] - 4.0).abs() < 1e-3);
        assert!(vectors.column(0).dot(d).abs() > 1.0 - EPS);

        // right-handed basis
        let det = vectors
            .column(0)
            .cross(vectors.column(1))
            .dot(vectors.column(2));
        assert!((det - 1.0).abs() < 1e-3);
    }
}
