use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Brush color as a client computed it from its audio features. Both shapes
/// appear on the wire, so neither is tagged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BrushColor {
    Hsl { hue: f32, sat: f32, light: f32 },
    Rgb { r: u8, g: u8, b: u8 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeMessage {
    pub x: f32,
    pub y: f32,
    pub px: f32,
    pub py: f32,
    pub size: f32,
    #[serde(flatten)]
    pub color: BrushColor,
    pub brush_mode: String,
}

/// Audio-sensitivity settings of the sender. Receivers may ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateMessage {
    pub gate: f32,
    pub gain: f32,
}

macro_rules! impl_payload {
    ($t:ty) => {
        impl $t {
            pub fn to_payload(&self) -> Value {
                serde_json::to_value(self).expect("plain struct always serializes")
            }

            pub fn from_payload(payload: &Value) -> Result<Self, serde_json::Error> {
                Self::deserialize(payload)
            }
        }
    };
}

impl_payload!(StrokeMessage);
impl_payload!(StateMessage);
