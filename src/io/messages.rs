//! Wire message contracts
//!
//! # Channels
//!
//! | Channel | Direction | Payload |
//! |---------|-----------|---------|
//! | detections | inbound | JSON `{timestamp, frame, detections: [...]}` |
//! | scan | inbound | text `LIDAR_DATA <bearing>,<distance>;...` |
//! | tracked-objects | outbound | JSON `{type: "OBJECTS", timestamp, objects: [...]}` |
//!
//! Each message is one self-contained datagram.
//!
//! # Scan Format
//!
//! ```text
//! LIDAR_DATA -10.5,2300;-10,2310.25;0,1500;
//! └────┬───┘ └──────────────┬─────────────┘
//!   prefix   bearing_deg,distance_mm pairs, ';'-separated
//! ```
//!
//! Empty segments (e.g. a trailing `;`) are ignored; any other malformed
//! segment rejects the whole message.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::core::types::{DetectionFrame, DetectionObservation, Scan, ScanPoint, TrackedObject};
use crate::error::{Error, Result};

/// Prefix of every scan message
pub const SCAN_PREFIX: &str = "LIDAR_DATA";

/// `type` tag of the tracked-objects message
pub const OBJECTS_TYPE: &str = "OBJECTS";

/// Detections message as published by the inference pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionsMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<u64>,
    pub detections: Vec<DetectionEntry>,
}

/// One entry of [`DetectionsMessage::detections`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionEntry {
    pub label: String,
    #[serde(default)]
    pub confidence: f64,
    pub angle_deg: f64,
    #[serde(default)]
    pub area: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<i64>,
}

/// Tracked-objects message consumed by the HUD.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectsMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: f64,
    pub objects: Vec<ObjectEntry>,
}

/// One entry of [`ObjectsMessage::objects`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectEntry {
    pub id: String,
    pub label: String,
    pub angle_deg: f64,
    /// Omitted while the object's range is unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_mm: Option<f64>,
    pub confidence: f64,
    pub area: f64,
}

impl From<&TrackedObject> for ObjectEntry {
    fn from(object: &TrackedObject) -> Self {
        Self {
            id: object.id.to_string(),
            label: object.label.clone(),
            angle_deg: object.smoothed_bearing_deg,
            distance_mm: object.smoothed_distance_mm,
            confidence: object.confidence,
            area: object.smoothed_area_px2,
        }
    }
}

impl ObjectsMessage {
    /// Build the message for a table snapshot
    pub fn from_snapshot(objects: &[TrackedObject], timestamp: f64) -> Self {
        Self {
            kind: OBJECTS_TYPE.to_string(),
            timestamp,
            objects: objects.iter().map(ObjectEntry::from).collect(),
        }
    }

    /// Serialize to JSON bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse from JSON bytes (used by consumers and tests)
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let msg: Self = serde_json::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))?;
        if msg.kind != OBJECTS_TYPE {
            return Err(Error::Decode(format!("unexpected message type {:?}", msg.kind)));
        }
        Ok(msg)
    }
}

impl DetectionsMessage {
    /// Serialize to JSON bytes (used by the simulator and tests)
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Decode a detections payload into observations stamped with `received_at`.
pub fn decode_detections(bytes: &[u8], received_at: Instant) -> Result<DetectionFrame> {
    let msg: DetectionsMessage =
        serde_json::from_slice(bytes).map_err(|e| Error::Decode(format!("detections: {}", e)))?;

    let observations = msg
        .detections
        .into_iter()
        .map(|d| DetectionObservation {
            label: d.label,
            confidence: d.confidence,
            bearing_deg: d.angle_deg,
            area_px2: d.area,
            received_at,
            frame: msg.frame,
            track_id: d.track_id,
        })
        .collect();

    Ok(DetectionFrame {
        timestamp: msg.timestamp,
        frame: msg.frame,
        observations,
    })
}

/// Decode a `LIDAR_DATA` payload into a scan stamped with `received_at`.
///
/// Values are parsed as given; range and hemisphere checks happen when the
/// scan index is rebuilt.
pub fn decode_scan(bytes: &[u8], received_at: Instant) -> Result<Scan> {
    let text = std::str::from_utf8(bytes).map_err(|e| Error::Decode(format!("scan: {}", e)))?;
    let body = text
        .trim()
        .strip_prefix(SCAN_PREFIX)
        .ok_or_else(|| Error::Decode(format!("scan: missing {} prefix", SCAN_PREFIX)))?;

    let mut points = Vec::new();
    for segment in body.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let (bearing, distance) = segment
            .split_once(',')
            .ok_or_else(|| Error::Decode(format!("scan: segment {:?} has no ','", segment)))?;
        let bearing_deg: f64 = bearing
            .trim()
            .parse()
            .map_err(|_| Error::Decode(format!("scan: bad bearing in {:?}", segment)))?;
        let distance_mm: f64 = distance
            .trim()
            .parse()
            .map_err(|_| Error::Decode(format!("scan: bad distance in {:?}", segment)))?;

        points.push(ScanPoint::new(bearing_deg, distance_mm));
    }

    Ok(Scan {
        points,
        received_at,
    })
}

/// Encode scan points in `LIDAR_DATA` text form (used by the simulator and tests).
pub fn encode_scan(points: &[ScanPoint]) -> String {
    let mut out = String::with_capacity(SCAN_PREFIX.len() + points.len() * 14);
    out.push_str(SCAN_PREFIX);
    out.push(' ');
    for p in points {
        out.push_str(&format!("{},{};", p.bearing_deg, p.distance_mm));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{TrackId, TrackState};
    use approx::assert_relative_eq;

    #[test]
    fn test_decode_scan() {
        let scan = decode_scan(b"LIDAR_DATA 10,2000;20,3000", Instant::now()).unwrap();
        assert_eq!(scan.points, vec![ScanPoint::new(10.0, 2000.0), ScanPoint::new(20.0, 3000.0)]);
    }

    #[test]
    fn test_decode_scan_trailing_separator_and_decimals() {
        let scan = decode_scan(b"LIDAR_DATA -10.5,2300.25;0,1500;\n", Instant::now()).unwrap();
        assert_eq!(scan.len(), 2);
        assert_relative_eq!(scan.points[0].bearing_deg, -10.5);
        assert_relative_eq!(scan.points[0].distance_mm, 2300.25);
    }

    #[test]
    fn test_decode_scan_empty_body() {
        let scan = decode_scan(b"LIDAR_DATA ", Instant::now()).unwrap();
        assert!(scan.is_empty());
    }

    #[test]
    fn test_decode_scan_rejects_malformed() {
        for payload in [
            &b"SCAN 10,2000"[..],
            b"LIDAR_DATA 10;20,3000",
            b"LIDAR_DATA ten,2000",
            b"LIDAR_DATA 10,2000,5",
            b"\xff\xfe",
        ] {
            assert!(
                matches!(decode_scan(payload, Instant::now()), Err(Error::Decode(_))),
                "payload {:?} should be rejected",
                payload
            );
        }
    }

    #[test]
    fn test_decode_detections() {
        let payload = br#"{
            "timestamp": 1700000000.5,
            "frame": 42,
            "detections": [
                {"label": "bicycle", "confidence": 0.9, "angle_deg": 11.0, "area": 40000,
                 "bbox": [10, 20, 210, 220], "track_id": 3, "bbox_norm": [0, 0, 1, 1]},
                {"label": "person", "angle_deg": -30.5}
            ]
        }"#;

        let frame = decode_detections(payload, Instant::now()).unwrap();
        assert_eq!(frame.frame, Some(42));
        assert_eq!(frame.observations.len(), 2);

        let bike = &frame.observations[0];
        assert_eq!(bike.label, "bicycle");
        assert_relative_eq!(bike.confidence, 0.9);
        assert_relative_eq!(bike.bearing_deg, 11.0);
        assert_relative_eq!(bike.area_px2, 40000.0);
        assert_eq!(bike.track_id, Some(3));

        let person = &frame.observations[1];
        assert_relative_eq!(person.confidence, 0.0);
        assert_relative_eq!(person.area_px2, 0.0);
    }

    #[test]
    fn test_decode_detections_rejects_malformed() {
        for payload in [
            &b"not json"[..],
            br#"{"timestamp": 1.0}"#,
            br#"{"detections": [{"label": "car"}]}"#,
            br#"{"detections": [{"angle_deg": 3.0}]}"#,
        ] {
            assert!(matches!(
                decode_detections(payload, Instant::now()),
                Err(Error::Decode(_))
            ));
        }
    }

    #[test]
    fn test_objects_message_shape() {
        let now = Instant::now();
        let objects = vec![
            TrackedObject {
                id: TrackId::new("bicycle", 11.0, 0),
                label: "bicycle".to_string(),
                smoothed_bearing_deg: 11.0,
                smoothed_distance_mm: Some(2000.0),
                smoothed_area_px2: 40000.0,
                confidence: 0.9,
                last_seen: now,
                state: TrackState::Active,
            },
            TrackedObject {
                id: TrackId::new("person", -42.7, 1),
                label: "person".to_string(),
                smoothed_bearing_deg: -42.7,
                smoothed_distance_mm: None,
                smoothed_area_px2: 900.0,
                confidence: 0.4,
                last_seen: now,
                state: TrackState::Active,
            },
        ];

        let bytes = ObjectsMessage::from_snapshot(&objects, 1700000000.25).encode().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["type"], "OBJECTS");
        assert_eq!(value["timestamp"], 1700000000.25);
        assert_eq!(value["objects"][0]["label"], "bicycle");
        assert_eq!(value["objects"][0]["distance_mm"], 2000.0);
        assert_eq!(value["objects"][0]["id"], "bicycle_11#0");
        assert_eq!(value["objects"][1]["id"], "person_-42#1");
        assert!(value["objects"][1].get("distance_mm").is_none());

        let decoded = ObjectsMessage::decode(&bytes).unwrap();
        assert_eq!(decoded.objects.len(), 2);
    }

    #[test]
    fn test_objects_decode_rejects_wrong_type() {
        let payload = br#"{"type": "IMU", "timestamp": 0.0, "objects": []}"#;
        assert!(ObjectsMessage::decode(payload).is_err());
    }

    #[test]
    fn test_encode_scan_matches_decoder() {
        let points = vec![ScanPoint::new(-5.5, 1200.0), ScanPoint::new(7.0, 900.5)];
        let text = encode_scan(&points);
        assert_eq!(text, "LIDAR_DATA -5.5,1200;7,900.5;");
        assert_eq!(decode_scan(text.as_bytes(), Instant::now()).unwrap().points, points);
    }
}
