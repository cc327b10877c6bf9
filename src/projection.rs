use crate::config::ProjectionConfig;
use std::f64::consts::PI;

/// Mercator projection centred on a geographic point, scaled in pixels per radian.
#[derive(Debug, Clone, Copy)]
pub struct Mercator {
    scale: f64,
    center_x: f64,
    center_y: f64,
    half_width: f64,
    half_height: f64,
}

fn mercator_y(lat: f64) -> f64 {
    // clamp short of the poles, where the projection diverges
    let lat_rad = lat.clamp(-89.9, 89.9).to_radians();
    (PI / 4.0 + lat_rad / 2.0).tan().ln()
}

impl Mercator {
    pub fn new(config: &ProjectionConfig) -> Self {
        let [lon, lat] = config.center;
        Self {
            scale: config.scale,
            center_x: lon.to_radians(),
            center_y: mercator_y(lat),
            half_width: config.width as f64 / 2.0,
            half_height: config.height as f64 / 2.0,
        }
    }

    /// Project (lon, lat) in degrees to SVG pixel coordinates (y grows downwards).
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let x = self.half_width + self.scale * (lon.to_radians() - self.center_x);
        let y = self.half_height - self.scale * (mercator_y(lat) - self.center_y);
        (x, y)
    }
}
