//! Lane count for a window width.

/// Lanes used for a window `width` pixels wide.
///
/// Four lanes from 1502 pixels, three from 1220, two below that.
pub fn responsive_lanes(width: u32) -> usize {
    match width {
        1502.. => 4,
        1220.. => 3,
        _ => 2,
    }
}
