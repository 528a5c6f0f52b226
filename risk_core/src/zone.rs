use serde::{Deserialize, Serialize};

/// Longitude shared by every generated sample.
pub const ROAD_LONGITUDE: f64 = -46.63;

/// Stretch of road where an animal-crossing alert is active.
/// Modelled as a coarse latitude band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskZone {
    pub id: String,
    pub description: String,
    pub start_lat: f64,
    pub end_lat: f64,
}

impl RiskZone {
    pub fn contains_latitude(&self, lat: f64) -> bool {
        let (lo, hi) = if self.start_lat <= self.end_lat {
            (self.start_lat, self.end_lat)
        } else {
            (self.end_lat, self.start_lat)
        };
        lat >= lo && lat <= hi
    }
}

impl Default for RiskZone {
    fn default() -> Self {
        Self {
            id: "ZR-001".to_string(),
            description: "KM 123 da BR-101, área de travessia de capivaras".to_string(),
            start_lat: -23.55,
            end_lat: -23.56,
        }
    }
}
