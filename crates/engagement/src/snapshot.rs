//! Per-tick engine output

use face_detect::BackendKind;
use serde::{Deserialize, Serialize};

use crate::gesture::Gesture;
use crate::posture::Posture;
use crate::scorer::MovementLevel;

/// Immutable description of the learner at one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementSnapshot {
    pub in_frame: bool,
    /// Smoothed confidence (0-100)
    pub confidence: f64,
    pub posture: Posture,
    pub gesture: Gesture,
    /// Focus score (0-100)
    pub focus_score: f64,
    pub movement_level: MovementLevel,
    pub lighting_ok: bool,
    /// Consecutive detected ticks within the distance bounds
    pub frames_in_position: u32,
    /// Whether `frames_in_position` reached the display gate
    pub focus_ready: bool,
    pub backend: BackendKind,
    /// Capture time of the frame (milliseconds)
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_field_names() {
        let snapshot = EngagementSnapshot {
            in_frame: true,
            confidence: 82.5,
            posture: Posture::TooClose,
            gesture: Gesture::HandRaise,
            focus_score: 61.0,
            movement_level: MovementLevel::Medium,
            lighting_ok: true,
            frames_in_position: 3,
            focus_ready: false,
            backend: BackendKind::Heuristic,
            timestamp: 1200,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["inFrame"], true);
        assert_eq!(json["posture"], "tooClose");
        assert_eq!(json["gesture"], "handRaise");
        assert_eq!(json["movementLevel"], "medium");
        assert_eq!(json["focusScore"], 61.0);
        assert_eq!(json["backend"], "heuristic");
    }
}
