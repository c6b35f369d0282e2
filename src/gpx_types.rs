/// Parsed GPX document: tracks in document order plus standalone waypoints.
#[derive(Debug, Default)]
pub struct GpxData {
    pub version: Option<String>,
    pub tracks: Vec<GpxTrack>,
    /// Decoded but never emitted.
    pub waypoints: Vec<GpxPoint>,
}

impl GpxData {
    /// Total number of track points across all tracks and segments.
    pub fn track_point_count(&self) -> usize {
        self.tracks
            .iter()
            .flat_map(|trk| &trk.segments)
            .map(|seg| seg.points.len())
            .sum()
    }

    /// Track points in track → segment → point order.
    pub fn track_points(&self) -> impl Iterator<Item = &GpxPoint> {
        self.tracks
            .iter()
            .flat_map(|trk| &trk.segments)
            .flat_map(|seg| &seg.points)
    }
}

/// A single GPX point (used for wpt and trkpt).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxPoint {
    pub lat: f64,
    pub lon: f64,
    pub time: Option<String>,
}

impl GpxPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            time: None,
        }
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }
}

/// A GPX track (<trk>).
#[derive(Debug, Default)]
pub struct GpxTrack {
    pub segments: Vec<GpxSegment>,
}

/// A GPX track segment (<trkseg>).
#[derive(Debug, Default)]
pub struct GpxSegment {
    pub points: Vec<GpxPoint>,
}
