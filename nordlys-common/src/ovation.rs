//! NOAA OVATION aurora probability map
//!
//! Converts the raw `[lon, lat, probability]` grid into a GeoJSON
//! FeatureCollection of points for map overlays.

use serde::{Deserialize, Serialize};

/// NOAA `ovation_aurora_latest.json` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvationResponse {
    #[serde(rename = "Forecast_Time", alias = "Forecast Time", default)]
    pub forecast_time: String,
    #[serde(rename = "Data_Format", default)]
    pub data_format: String,
    /// `[longitude 0-360, latitude, aurora probability %]`
    pub coordinates: Vec<[f64; 3]>,
}

/// GeoJSON FeatureCollection of probability points
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OvationGeoJson {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<OvationFeature>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OvationFeature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: PointGeometry,
    pub properties: OvationProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// `[lon -180..180, lat]`
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OvationProperties {
    pub probability: f64,
}

/// Map 0-360 longitudes onto -180..180 (180 itself is kept)
pub fn normalize_longitude(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else {
        lon
    }
}

/// Build the GeoJSON overlay, dropping zero-probability points
pub fn ovation_to_geojson(ovation: &OvationResponse) -> OvationGeoJson {
    let features = ovation
        .coordinates
        .iter()
        .filter(|[_, _, probability]| *probability > 0.0)
        .map(|&[lon, lat, probability]| OvationFeature {
            kind: "Feature",
            geometry: PointGeometry {
                kind: "Point",
                coordinates: [normalize_longitude(lon), lat],
            },
            properties: OvationProperties { probability },
        })
        .collect();

    OvationGeoJson {
        kind: "FeatureCollection",
        features,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ovation(coordinates: Vec<[f64; 3]>) -> OvationResponse {
        OvationResponse {
            forecast_time: "2025-01-15T00:00:00Z".to_string(),
            data_format: "[Longitude, Latitude, Aurora]".to_string(),
            coordinates,
        }
    }

    #[test]
    fn test_zero_probability_points_dropped() {
        let geo = ovation_to_geojson(&ovation(vec![
            [10.0, 70.0, 0.0],
            [20.0, 65.0, 15.0],
            [30.0, 60.0, 0.0],
        ]));
        assert_eq!(geo.features.len(), 1);
        assert_eq!(geo.features[0].properties.probability, 15.0);
    }

    #[test]
    fn test_longitudes_normalized() {
        let geo = ovation_to_geojson(&ovation(vec![
            [350.0, 70.0, 10.0],
            [190.0, 65.0, 20.0],
            [180.0, 60.0, 30.0],
            [10.0, 55.0, 40.0],
        ]));
        let lons: Vec<f64> = geo.features.iter().map(|f| f.geometry.coordinates[0]).collect();
        assert_eq!(lons, vec![-10.0, -170.0, 180.0, 10.0]);
    }

    #[test]
    fn test_geojson_shape() {
        let geo = ovation_to_geojson(&ovation(vec![[18.0, 69.0, 50.0]]));
        let json = serde_json::to_value(&geo).unwrap();

        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["type"], "Feature");
        assert_eq!(json["features"][0]["geometry"]["type"], "Point");
        assert_eq!(json["features"][0]["geometry"]["coordinates"][0], 18.0);
        assert_eq!(json["features"][0]["geometry"]["coordinates"][1], 69.0);
        assert_eq!(json["features"][0]["properties"]["probability"], 50.0);
    }

    #[test]
    fn test_empty_and_all_zero_inputs() {
        assert!(ovation_to_geojson(&ovation(vec![])).features.is_empty());
        assert!(ovation_to_geojson(&ovation(vec![[10.0, 70.0, 0.0], [20.0, 65.0, 0.0]]))
            .features
            .is_empty());
    }

    #[test]
    fn test_parses_noaa_payload() {
        let raw = r#"{
            "Observation Time": "2025-01-15T00:00:00Z",
            "Forecast Time": "2025-01-15T00:45:00Z",
            "Data_Format": "[Longitude, Latitude, Aurora]",
            "coordinates": [[0, -90, 0], [18, 69, 12]]
        }"#;
        let parsed: OvationResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.forecast_time, "2025-01-15T00:45:00Z");
        assert_eq!(parsed.coordinates.len(), 2);
        assert_eq!(parsed.coordinates[1], [18.0, 69.0, 12.0]);
    }
}
