/// Values a [`KeyframeTrack`](super::tracks::KeyframeTrack) can blend between.
pub trait Interpolatable: Copy + Clone + Sized {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self;

    /// Hermite segment; tangents are expressed per unit of the track's time
    /// axis and scaled by the segment length `dt`.
    fn interpolate_cubic(
        v0: Self,
        out_tangent0: Self,
        in_tangent1: Self,
        v1: Self,
        t: f32,
        dt: f32,
    ) -> Self;
}

impl Interpolatable for f32 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start + (end - start) * t
    }

    fn interpolate_cubic(v0: Self, out_tangent0: Self, in_tangent1: Self, v1: Self, t: f32, dt: f32) -> Self {
        let t2 = t * t;
        let t3 = t2 * t;

        let s2 = -2.0 * t3 + 3.0 * t2;
        let s3 = t3 - t2;
        let s0 = 1.0 - s2;
        let s1 = s3 - t2 + t;

        let m0 = out_tangent0 * dt;
        let m1 = in_tangent1 * dt;

        s0 * v0 + s1 * m0 + s2 * v1 + s3 * m1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cubic_with_flat_tangents_hits_endpoints() {
        assert!((f32::interpolate_cubic(1.0, 0.0, 0.0, 3.0, 0.0, 10.0) - 1.0).abs() < 1e-6);
        assert!((f32::interpolate_cubic(1.0, 0.0, 0.0, 3.0, 1.0, 10.0) - 3.0).abs() < 1e-6);
        assert!((f32::interpolate_cubic(1.0, 0.0, 0.0, 3.0, 0.5, 10.0) - 2.0).abs() < 1e-6);
    }
}
