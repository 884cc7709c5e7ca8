//! Quaternion helpers on plain `[f32; 4]` (x, y, z, w) arrays.

#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn lerp_vec3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        lerp_f32(a[0], b[0], t),
        lerp_f32(a[1], b[1], t),
        lerp_f32(a[2], b[2], t),
    ]
}

#[inline]
fn dot4(a: [f32; 4], b: [f32; 4]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3]
}

#[inline]
pub fn normalize_quat(mut q: [f32; 4]) -> [f32; 4] {
    let len2 = dot4(q, q);
    if len2 > 0.0 {
        let inv_len = len2.sqrt().recip();
        q[0] *= inv_len;
        q[1] *= inv_len;
        q[2] *= inv_len;
        q[3] *= inv_len;
        q
    } else {
        IDENTITY
    }
}

pub const IDENTITY: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Hamilton product `a * b` (apply `b` first, then `a`).
#[inline]
pub fn mul_quat(a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
    let [ax, ay, az, aw] = a;
    let [bx, by, bz, bw] = b;
    [
        aw * bx + ax * bw + ay * bz - az * by,
        aw * by - ax * bz + ay * bw + az * bx,
        aw * bz + ax * by - ay * bx + az * bw,
        aw * bw - ax * bx - ay * by - az * bz,
    ]
}

/// Rotation of `angle` radians about the X axis.
#[inline]
pub fn quat_from_rotation_x(angle: f32) -> [f32; 4] {
    let (s, c) = (angle * 0.5).sin_cos();
    [s, 0.0, 0.0, c]
}

/// Intrinsic XYZ Euler angles (radians) to quaternion.
pub fn quat_from_euler_xyz(e: [f32; 3]) -> [f32; 4] {
    let (sx, cx) = (e[0] * 0.5).sin_cos();
    let (sy, cy) = (e[1] * 0.5).sin_cos();
    let (sz, cz) = (e[2] * 0.5).sin_cos();
    [
        sx * cy * cz + cx * sy * sz,
        cx * sy * cz - sx * cy * sz,
        cx * cy * sz + sx * sy * cz,
        cx * cy * cz - sx * sy * sz,
    ]
}

/// Quaternion NLERP with shortest-arc correction.
#[inline]
pub fn nlerp_quat(a: [f32; 4], mut b: [f32; 4], t: f32) -> [f32; 4] {
    if dot4(a, b) < 0.0 {
        b = [-b[0], -b[1], -b[2], -b[3]];
    }
    normalize_quat([
        lerp_f32(a[0], b[0], t),
        lerp_f32(a[1], b[1], t),
        lerp_f32(a[2], b[2], t),
        lerp_f32(a[3], b[3], t),
    ])
}

/// Angle in radians between two unit quaternions.
pub fn quat_angle_between(a: [f32; 4], b: [f32; 4]) -> f32 {
    let d = dot4(a, b).abs().min(1.0);
    2.0 * d.acos()
}

/// Largest component difference between two rotations, sign-insensitive.
pub fn quat_distance(a: [f32; 4], b: [f32; 4]) -> f32 {
    let direct = (0..4).map(|i| (a[i] - b[i]).abs()).fold(0.0, f32::max);
    let flipped = (0..4).map(|i| (a[i] + b[i]).abs()).fold(0.0, f32::max);
    direct.min(flipped)
}
