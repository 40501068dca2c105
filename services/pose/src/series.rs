//! Angle time-series accumulated over one video.

use crate::error::SeriesError;
use crate::geometry::JointAngleSet;
use serde::{Deserialize, Serialize};

/// Joint angles in frame order, one entry per frame with a detected subject.
///
/// Serializes as a JSON array of `{joint name: degrees}` objects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AngleTimeSeries {
    entries: Vec<JointAngleSet>,
}

impl AngleTimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, angles: JointAngleSet) {
        self.entries.push(angles);
    }

    pub fn entries(&self) -> &[JointAngleSet] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json_vec(&self) -> Result<Vec<u8>, SeriesError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, SeriesError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl From<Vec<JointAngleSet>> for AngleTimeSeries {
    fn from(entries: Vec<JointAngleSet>) -> Self {
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_roundtrip_preserves_order() {
        let series: AngleTimeSeries = vec![
            JointAngleSet::new([170.5, 160.25, 175.0, 174.0, 30.0, 31.0]),
            JointAngleSet::new([0.0, 0.0, 90.0, 91.5, 45.125, 0.0]),
            JointAngleSet::new([12.0, 13.0, 14.0, 15.0, 16.0, 17.0]),
        ]
        .into();

        let bytes = series.to_json_vec().unwrap();
        let back = AngleTimeSeries::from_json_slice(&bytes).unwrap();

        assert_eq!(back, series);
    }

    #[test]
    fn test_json_shape() {
        let series: AngleTimeSeries =
            vec![JointAngleSet::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0])].into();

        let value: serde_json::Value =
            serde_json::from_slice(&series.to_json_vec().unwrap()).unwrap();

        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["LEFT_KNEE"], 3.0);
        assert_eq!(array[0]["RIGHT_HIP"], 6.0);
    }

    #[test]
    fn test_empty_series_is_empty_array() {
        let bytes = AngleTimeSeries::new().to_json_vec().unwrap();
        assert_eq!(bytes, b"[]");
    }

    #[test]
    fn test_rejects_non_array() {
        assert!(AngleTimeSeries::from_json_slice(br#"{"LEFT_ELBOW": 1.0}"#).is_err());
    }
}
