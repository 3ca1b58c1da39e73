use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::RestoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseRestorationType {
    #[default]
    Enhance,
    Colorize,
    RepairBw,
}

impl BaseRestorationType {
    pub const ALL: [Self; 3] = [Self::Enhance, Self::Colorize, Self::RepairBw];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enhance => "enhance",
            Self::Colorize => "colorize",
            Self::RepairBw => "repair_bw",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditiveOptions {
    pub passport: bool,
    pub full_body: bool,
    pub change_clothes: bool,
}

impl AdditiveOptions {
    pub fn enabled(&self) -> Vec<&'static str> {
        [
            ("passport", self.passport),
            ("full_body", self.full_body),
            ("change_clothes", self.change_clothes),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CameraQuality {
    #[default]
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "4k")]
    Uhd4k,
    #[serde(rename = "8k")]
    Uhd8k,
}

impl CameraQuality {
    pub const ALL: [Self; 3] = [Self::Default, Self::Uhd4k, Self::Uhd8k];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Uhd4k => "4k",
            Self::Uhd8k => "8k",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraAngle {
    #[default]
    Default,
    Above,
    EyeLevel,
    Below,
}

impl CameraAngle {
    pub const ALL: [Self; 4] = [Self::Default, Self::Above, Self::EyeLevel, Self::Below];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Above => "above",
            Self::EyeLevel => "eye_level",
            Self::Below => "below",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:5")]
    Portrait4x5,
    #[serde(rename = "9:16")]
    Tall9x16,
    #[serde(rename = "16:9")]
    Wide16x9,
}

impl AspectRatio {
    pub const ALL: [Self; 6] = [
        Self::Default,
        Self::Square,
        Self::Portrait3x4,
        Self::Portrait4x5,
        Self::Tall9x16,
        Self::Wide16x9,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Square => "1:1",
            Self::Portrait3x4 => "3:4",
            Self::Portrait4x5 => "4:5",
            Self::Tall9x16 => "9:16",
            Self::Wide16x9 => "16:9",
        }
    }
}

// Lowercase, trimmed, `-` folded into `_` so `eye-level` and `EYE_LEVEL`
// parse the same.
fn normalize_token(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace('-', "_")
}

fn unknown_value(kind: &str, raw: &str, allowed: &[&str]) -> String {
    format!(
        "Unknown {kind} '{}'; expected one of: {}.",
        raw.trim(),
        allowed.join(", ")
    )
}

impl FromStr for BaseRestorationType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match normalize_token(raw).as_str() {
            "enhance" => Ok(Self::Enhance),
            "colorize" | "colourise" | "colorise" => Ok(Self::Colorize),
            "repair_bw" | "repairbw" | "bw" => Ok(Self::RepairBw),
            _ => Err(unknown_value(
                "base type",
                raw,
                &Self::ALL.map(Self::as_str),
            )),
        }
    }
}

impl FromStr for CameraQuality {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match normalize_token(raw).as_str() {
            "default" | "" => Ok(Self::Default),
            "4k" => Ok(Self::Uhd4k),
            "8k" => Ok(Self::Uhd8k),
            _ => Err(unknown_value(
                "camera quality",
                raw,
                &Self::ALL.map(Self::as_str),
            )),
        }
    }
}

impl FromStr for CameraAngle {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match normalize_token(raw).as_str() {
            "default" | "" => Ok(Self::Default),
            "above" | "high" => Ok(Self::Above),
            "eye_level" | "eyelevel" => Ok(Self::EyeLevel),
            "below" | "low" => Ok(Self::Below),
            _ => Err(unknown_value(
                "camera angle",
                raw,
                &Self::ALL.map(Self::as_str),
            )),
        }
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_token(raw).replace(['x', '/'], ":");
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == normalized)
            .or_else(|| normalized.is_empty().then_some(Self::Default))
            .ok_or_else(|| unknown_value("aspect ratio", raw, &Self::ALL.map(Self::as_str)))
    }
}

/// Everything the caller chose for one restoration attempt.
///
/// Free-text fields use the empty string for "not provided". A partial JSON
/// document deserializes with every missing field at its default.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RestorationOptions {
    pub base_type: BaseRestorationType,
    pub additive: AdditiveOptions,
    pub clothing_description: String,
    pub background_description: String,
    pub pose_description: String,
    pub custom_instruction: String,
    pub camera_quality: CameraQuality,
    pub camera_angle: CameraAngle,
    pub aspect_ratio: AspectRatio,
}

impl RestorationOptions {
    pub fn new(base_type: BaseRestorationType) -> Self {
        Self {
            base_type,
            ..Self::default()
        }
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Checks the option combination before a request is built.
    pub fn validate(&self) -> Result<(), RestoreError> {
        if self.additive.change_clothes && self.clothing_description.trim().is_empty() {
            return Err(RestoreError::Validation(
                "clothing description required when change_clothes is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Raw image payload as the caller received it, plus its declared mime type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl SourceImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn validate(&self) -> Result<(), RestoreError> {
        if self.bytes.is_empty() {
            return Err(RestoreError::Validation(
                "source image is empty".to_string(),
            ));
        }
        if self.mime_type.trim().is_empty() {
            return Err(RestoreError::Validation(
                "source image mime type is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredImage {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn partial_json_fills_defaults() -> anyhow::Result<()> {
        let options = RestorationOptions::from_json(
            r#"{"base_type":"repair_bw","additive":{"full_body":true},"aspect_ratio":"4:5"}"#,
        )?;
        assert_eq!(options.base_type, BaseRestorationType::RepairBw);
        assert!(options.additive.full_body);
        assert!(!options.additive.passport);
        assert_eq!(options.aspect_ratio, AspectRatio::Portrait4x5);
        assert_eq!(options.camera_quality, CameraQuality::Default);
        assert!(options.pose_description.is_empty());
        Ok(())
    }

    #[test]
    fn serializes_with_wire_spellings() -> anyhow::Result<()> {
        let mut options = RestorationOptions::new(BaseRestorationType::Colorize);
        options.camera_quality = CameraQuality::Uhd8k;
        options.camera_angle = CameraAngle::EyeLevel;
        options.aspect_ratio = AspectRatio::Wide16x9;
        let value = serde_json::to_value(&options)?;
        assert_eq!(value["base_type"], json!("colorize"));
        assert_eq!(value["camera_quality"], json!("8k"));
        assert_eq!(value["camera_angle"], json!("eye_level"));
        assert_eq!(value["aspect_ratio"], json!("16:9"));
        Ok(())
    }

    #[test]
    fn from_str_accepts_loose_spellings() {
        assert_eq!(
            "Repair-BW".parse::<BaseRestorationType>(),
            Ok(BaseRestorationType::RepairBw)
        );
        assert_eq!("4K".parse::<CameraQuality>(), Ok(CameraQuality::Uhd4k));
        assert_eq!("eye-level".parse::<CameraAngle>(), Ok(CameraAngle::EyeLevel));
        assert_eq!("9x16".parse::<AspectRatio>(), Ok(AspectRatio::Tall9x16));
        assert_eq!("".parse::<AspectRatio>(), Ok(AspectRatio::Default));
    }

    #[test]
    fn from_str_rejects_unknown_values_with_choices() {
        let err = "sepia".parse::<BaseRestorationType>().unwrap_err();
        assert_eq!(
            err,
            "Unknown base type 'sepia'; expected one of: enhance, colorize, repair_bw."
        );
        assert!("2:1".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn change_clothes_requires_description() {
        let mut options = RestorationOptions::default();
        options.additive.change_clothes = true;
        options.clothing_description = "   ".to_string();
        assert!(matches!(
            options.validate(),
            Err(RestoreError::Validation(message)) if message.contains("clothing description required")
        ));

        options.clothing_description = "a navy linen suit".to_string();
        assert!(options.validate().is_ok());
    }

    #[test]
    fn source_image_requires_bytes_and_mime() {
        assert!(SourceImage::new(Vec::new(), "image/png").validate().is_err());
        assert!(SourceImage::new(vec![1, 2, 3], " ").validate().is_err());
        assert!(SourceImage::new(vec![1, 2, 3], "image/png").validate().is_ok());
    }

    #[test]
    fn additive_enabled_lists_flags_in_order() {
        let additive = AdditiveOptions {
            passport: true,
            full_body: false,
            change_clothes: true,
        };
        assert_eq!(additive.enabled(), vec!["passport", "change_clothes"]);
    }
}
