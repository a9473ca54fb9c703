use super::SpherePoint;

/// Sphere radius in presentation units.
pub const SPHERE_RADIUS: f64 = 800.0;

/// Equal-area sphere placement for `n` cards.
///
/// Latitude comes from the equal-area band `cos(phi) = 1 - (2i+1)/n`,
/// longitude advances by the golden ratio, so cards spread evenly with no
/// clustering at the poles for any `n`. Each card faces outward, away from
/// the sphere's center.
pub fn sphere_points(n: usize) -> Vec<SpherePoint> {
    let golden_ratio = (1.0 + 5.0_f64.sqrt()) / 2.0;
    (0..n)
        .map(|i| {
            let z = 1.0 - (2.0 * i as f64 + 1.0) / n as f64;
            let phi = z.acos();
            let theta = 2.0 * std::f64::consts::PI * i as f64 / golden_ratio;

            let position = [
                SPHERE_RADIUS * phi.sin() * theta.cos(),
                SPHERE_RADIUS * phi.sin() * theta.sin(),
                -SPHERE_RADIUS * phi.cos(),
            ];
            let look_at = [position[0] * 2.0, position[1] * 2.0, position[2] * 2.0];
            SpherePoint { position, look_at }
        })
        .collect()
}
