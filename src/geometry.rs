//! Geometry primitives (spec.md §4.2).
//!
//! Earth is modelled as a sphere of radius [`R_EARTH_KM`], exactly as the
//! spec's ECEF formula specifies — this is a deliberate simplification
//! shared with the reference implementation, not an oversight; the core's
//! non-goal is "high-fidelity sensor radiometry", not geodesy, and the
//! spec's own incidence-angle law-of-cosines only closes algebraically for
//! a sphere.

/// Mean Earth radius used throughout the geometry kernel (spec.md §4.1).
pub const R_EARTH_KM: f64 = 6371.0;

/// Earth's rotation rate, rad/s (WGS-84 value), used only to correct
/// TEME velocity into the ECEF frame.
const OMEGA_EARTH_RAD_S: f64 = 7.292_115_146_706_4e-5;

pub type Vec3 = [f64; 3];

pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn scale(a: Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

pub fn norm(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

pub fn normalize(a: Vec3) -> Vec3 {
    let n = norm(a);
    if n < 1e-12 { [0.0, 0.0, 0.0] } else { scale(a, 1.0 / n) }
}

/// Greenwich Mean Sidereal Time in radians, IAU-1982 approximation, from a
/// Unix timestamp (seconds). Adequate for the spec's 1 s / 0.1° tolerances.
pub fn gmst_rad(unix_time_s: f64) -> f64 {
    let jd = unix_time_s / 86400.0 + 2_440_587.5;
    let t = (jd - 2_451_545.0) / 36_525.0;
    let gmst_sec = 67_310.548_41
        + (876_600.0 * 3600.0 + 8_640_184.812_866) * t
        + 0.093_104 * t * t
        - 6.2e-6 * t * t * t;
    let gmst_deg = (gmst_sec / 240.0).rem_euclid(360.0);
    gmst_deg.to_radians()
}

/// Rotates a TEME position/velocity pair into Earth-fixed (ECEF)
/// coordinates via a GMST z-rotation, correcting velocity for Earth's
/// rotation rate (omega x r).
pub fn teme_to_ecef(position_teme_km: Vec3, velocity_teme_km_s: Vec3, unix_time_s: f64) -> (Vec3, Vec3) {
    let theta = gmst_rad(unix_time_s);
    let (s, c) = theta.sin_cos();

    let rotate = |v: Vec3| -> Vec3 {
        [v[0] * c + v[1] * s, -v[0] * s + v[1] * c, v[2]]
    };

    let pos_ecef = rotate(position_teme_km);
    let vel_rot = rotate(velocity_teme_km_s);
    let omega = [0.0, 0.0, OMEGA_EARTH_RAD_S];
    let vel_ecef = sub(vel_rot, cross(omega, pos_ecef));

    (pos_ecef, vel_ecef)
}

/// Geodetic (lat°, lon°, alt_km) from an ECEF position, spherical-Earth
/// model (spec.md §4.1).
pub fn ecef_to_geodetic(p: Vec3) -> (f64, f64, f64) {
    let r = norm(p);
    let lat = (p[2] / r).asin().to_degrees();
    let lon = p[1].atan2(p[0]).to_degrees();
    let alt = r - R_EARTH_KM;
    (lat, lon, alt)
}

/// ECEF position of a ground point at the given geodetic coordinates
/// (spec.md §4.2 "ECEF of a ground point").
pub fn geodetic_to_ecef(lat_deg: f64, lon_deg: f64, alt_km: f64) -> Vec3 {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let r = R_EARTH_KM + alt_km;
    [lat.cos() * lon.cos() * r, lat.cos() * lon.sin() * r, lat.sin() * r]
}

/// Topocentric elevation and azimuth of `sat_ecef` as seen from a ground
/// point at `target_ecef`/`lat_deg`/`lon_deg`. Azimuth is north-positive,
/// `0..360`.
pub fn elevation_azimuth_deg(
    target_ecef: Vec3,
    lat_deg: f64,
    lon_deg: f64,
    sat_ecef: Vec3,
) -> (f64, f64, f64) {
    let d = sub(sat_ecef, target_ecef);
    let range_km = norm(d);

    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();

    // Local ENU basis at the target.
    let east = [-lon.sin(), lon.cos(), 0.0];
    let north = [
        -lat.sin() * lon.cos(),
        -lat.sin() * lon.sin(),
        lat.cos(),
    ];
    let up = [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()];

    let e = dot(d, east);
    let n = dot(d, north);
    let u = dot(d, up);

    let elevation_deg = (u / range_km).asin().to_degrees();
    let azimuth_deg = e.atan2(n).to_degrees().rem_euclid(360.0);

    (elevation_deg, azimuth_deg, range_km)
}

/// Off-nadir (incidence) angle between the satellite's nadir vector and the
/// line of sight to a target, from the law of cosines (spec.md §4.2):
/// `arccos(((R+h)^2 + r^2 - R^2) / (2(R+h)r))`.
pub fn off_nadir_deg(sat_altitude_km: f64, slant_range_km: f64) -> f64 {
    let r_plus_h = R_EARTH_KM + sat_altitude_km;
    let r = slant_range_km;
    let cos_theta =
        (r_plus_h * r_plus_h + r * r - R_EARTH_KM * R_EARTH_KM) / (2.0 * r_plus_h * r);
    cos_theta.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Signed cross-track (roll) and along-track (pitch) look angles from the
/// satellite to a target, decomposed in the satellite's local orbital frame
/// (spec.md §4.2, §9 "signed incidence vs magnitude").
///
/// The frame is built from the satellite's nadir direction (`down`, toward
/// Earth's center) and its velocity projected perpendicular to nadir
/// (`along`); `cross = velocity x vertical`, matching the spec's sign rule
/// "sign of cross-track = sign of (velocity x vertical) . offset".
pub fn signed_roll_pitch_deg(sat_ecef: Vec3, sat_vel_ecef: Vec3, target_ecef: Vec3) -> (f64, f64) {
    let vertical_up = normalize(sat_ecef);
    let down = scale(vertical_up, -1.0);

    let cross_track = normalize(cross(sat_vel_ecef, vertical_up));
    let along_track = normalize(cross(vertical_up, cross_track));

    let los = normalize(sub(target_ecef, sat_ecef));

    let down_component = dot(los, down);
    let cross_component = dot(los, cross_track);
    let along_component = dot(los, along_track);

    let roll_deg = cross_component.atan2(down_component).to_degrees();
    let pitch_deg = along_component.atan2(down_component).to_degrees();

    (roll_deg, pitch_deg)
}

/// Geocentric angle between the sub-satellite point and a target, used by
/// the adaptive pass finder to gauge proximity to visibility (spec.md
/// §4.2 "Adaptive").
pub fn geocentric_angle_deg(sat_ecef: Vec3, target_ecef: Vec3) -> f64 {
    let a = normalize(sat_ecef);
    let b = normalize(target_ecef);
    dot(a, b).clamp(-1.0, 1.0).acos().to_degrees()
}
