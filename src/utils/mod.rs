use uuid::Uuid;

/// Short room invite code, first 8 hex chars of a v4 UUID.
pub fn generate_invite_code() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

/// Haversine distance between two coordinates, in kilometers.
pub fn calculate_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Parses "HH:MM" (also tolerating "9:00") into minutes since midnight.
pub fn parse_time(time: &str) -> Option<u32> {
    let (h, m) = time.split_once(':')?;
    let h: u32 = h.trim().parse().ok()?;
    let m: u32 = m.trim().parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

/// Formats minutes since midnight back to "HH:MM", wrapping past midnight.
pub fn format_time(minutes: u32) -> String {
    let minutes = minutes % (24 * 60);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
