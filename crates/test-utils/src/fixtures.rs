//! Common test fixtures for field pipeline tests.

/// Common extents as `[xmin, ymin, xmax, ymax]`.
pub mod extent {
    /// Global, -180..180 longitudes
    pub const GLOBAL: [f64; 4] = [-180.0, -90.0, 180.0, 90.0];

    /// Global, 0..360 longitudes (GFS convention)
    pub const GLOBAL_0_360: [f64; 4] = [0.0, -90.0, 360.0, 90.0];

    /// Pacific window that runs past 180°E
    pub const PACIFIC: [f64; 4] = [160.0, -50.0, 220.0, 50.0];

    /// Small unit square around the origin
    pub const UNIT: [f64; 4] = [-1.0, -1.0, 1.0, 1.0];
}

/// Common color ramps as `(breakpoint, color)` pairs.
pub mod ramps {
    /// Two-stop temperature ramp in °C
    pub const TEMPERATURE_SHORT: [(f64, &str); 2] = [(-40.0, "#0000FF"), (40.0, "#8A2B0A")];

    /// Full temperature ramp in °C
    pub const TEMPERATURE: [(f64, &str); 9] = [
        (-40.0, "#0000FF"),
        (-30.0, "#000088"),
        (-20.0, "#9186CE"),
        (-10.0, "#7AC5BF"),
        (0.0, "#5F8EC3"),
        (10.0, "#78921E"),
        (20.0, "#DFB107"),
        (30.0, "#E75C15"),
        (40.0, "#8A2B0A"),
    ];

    /// Convert a ramp constant into owned pairs.
    pub fn to_owned(ramp: &[(f64, &str)]) -> Vec<(f64, String)> {
        ramp.iter()
            .map(|(value, color)| (*value, color.to_string()))
            .collect()
    }
}
