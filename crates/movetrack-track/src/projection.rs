//! Forward UTM projection
//!
//! Transverse Mercator via the Krüger series to third order in the third
//! flattening `n`, which is accurate to well under a millimetre within a UTM
//! zone.

use crate::config::{Hemisphere, ProjectionConfig};
use movetrack_core::{Error, Result};

const SCALE_FACTOR: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Latitude limits of the UTM system
pub const MIN_LATITUDE: f64 = -80.0;
pub const MAX_LATITUDE: f64 = 84.0;

/// A configured UTM projection with precomputed series coefficients
#[derive(Debug, Clone)]
pub struct UtmProjection {
    config: ProjectionConfig,
    rectifying_radius: f64,
    alpha: [f64; 3],
    eccentricity_term: f64,
    central_meridian: f64,
    false_northing: f64,
}

impl UtmProjection {
    pub fn new(config: ProjectionConfig) -> Result<Self> {
        config.validate()?;
        let a = config.ellipsoid.semi_major_axis();
        let f = config.ellipsoid.flattening();
        let n = f / (2.0 - f);
        let n2 = n * n;
        let n3 = n2 * n;

        Ok(Self {
            config,
            rectifying_radius: a / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0),
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
                61.0 * n3 / 240.0,
            ],
            eccentricity_term: 2.0 * n.sqrt() / (1.0 + n),
            central_meridian: config.central_meridian().to_radians(),
            false_northing: match config.hemisphere {
                Hemisphere::North => 0.0,
                Hemisphere::South => FALSE_NORTHING_SOUTH,
            },
        })
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Project geographic degrees to `(easting, northing)` in metres
    pub fn project(&self, longitude: f64, latitude: f64) -> Result<(f64, f64)> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(Error::non_finite("coordinate"));
        }
        if !(MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude) {
            return Err(Error::InvalidInput(format!(
                "latitude {latitude} is outside the UTM range {MIN_LATITUDE}..{MAX_LATITUDE}"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::InvalidInput(format!(
                "longitude {longitude} is outside -180..180"
            )));
        }

        let phi = latitude.to_radians();
        let mut lambda = longitude.to_radians() - self.central_meridian;
        // Keep the longitude difference in (-π, π] for zones near the antimeridian
        lambda = movetrack_core::math::circular::wrap_angle(lambda);

        let c = self.eccentricity_term;
        let t = (phi.sin().atanh() - c * (c * phi.sin()).atanh()).sinh();
        let xi = t.atan2(lambda.cos());
        let eta = (lambda.sin() / (1.0 + t * t).sqrt()).atanh();

        let (mut easting_series, mut northing_series) = (eta, xi);
        for (j, alpha) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            easting_series += alpha * (k * xi).cos() * (k * eta).sinh();
            northing_series += alpha * (k * xi).sin() * (k * eta).cosh();
        }

        let scale = SCALE_FACTOR * self.rectifying_radius;
        Ok((
            FALSE_EASTING + scale * easting_series,
            self.false_northing + scale * northing_series,
        ))
    }

    /// Longitude offset in degrees of a point from the zone's central meridian
    pub fn meridian_offset(&self, longitude: f64) -> f64 {
        movetrack_core::math::circular::wrap_angle(longitude.to_radians() - self.central_meridian)
            .to_degrees()
            .abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Ellipsoid;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_central_meridian_on_equator() {
        let projection = UtmProjection::new(ProjectionConfig::utm(31, Hemisphere::North).unwrap()).unwrap();
        let (e, n) = projection.project(3.0, 0.0).unwrap();
        assert_abs_diff_eq!(e, 500_000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(n, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_published_reference_point() {
        // CN Tower, Toronto: 43°38'33.24"N 79°23'13.7"W -> 17T 630084 4833438
        let projection = UtmProjection::new(ProjectionConfig::utm(17, Hemisphere::North).unwrap()).unwrap();
        let lat = 43.0 + 38.0 / 60.0 + 33.24 / 3600.0;
        let lon = -(79.0 + 23.0 / 60.0 + 13.7 / 3600.0);
        let (e, n) = projection.project(lon, lat).unwrap();
        assert_abs_diff_eq!(e, 630_084.0, epsilon = 1.0);
        assert_abs_diff_eq!(n, 4_833_438.0, epsilon = 1.0);
    }

    #[test]
    fn test_southern_hemisphere_false_northing() {
        let config = ProjectionConfig::utm(56, Hemisphere::South).unwrap();
        let projection = UtmProjection::new(config).unwrap();
        let (_, n) = projection.project(151.2, -33.85).unwrap();
        assert!(n > 6_000_000.0 && n < 7_000_000.0);
    }

    #[test]
    fn test_ellipsoids_differ_slightly() {
        let wgs = UtmProjection::new(ProjectionConfig::utm(33, Hemisphere::North).unwrap()).unwrap();
        let intl = UtmProjection::new(
            ProjectionConfig::utm(33, Hemisphere::North)
                .unwrap()
                .with_ellipsoid(Ellipsoid::Custom {
                    semi_major_axis: 6_378_388.0,
                    inverse_flattening: 297.0,
                }),
        )
        .unwrap();
        let (e1, n1) = wgs.project(16.0, 48.0).unwrap();
        let (e2, n2) = intl.project(16.0, 48.0).unwrap();
        let shift = (e1 - e2).hypot(n1 - n2);
        assert!(shift > 1.0 && shift < 500.0, "unexpected ellipsoid shift {shift}");
    }

    #[test]
    fn test_out_of_range_latitude() {
        let projection = UtmProjection::new(ProjectionConfig::utm(33, Hemisphere::North).unwrap()).unwrap();
        assert!(projection.project(15.0, 85.0).is_err());
        assert!(projection.project(f64::NAN, 10.0).is_err());
        assert_abs_diff_eq!(projection.meridian_offset(18.0), 3.0, epsilon = 1e-9);
    }
}
