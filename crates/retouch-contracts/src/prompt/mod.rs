//! Instruction text sent alongside the source photo.
//!
//! Block order is significant: the model gives later instructions more
//! weight, so additive tasks follow the primary task and the artistic
//! direction and closing rule always come last.

mod templates;

use sha2::{Digest, Sha256};
use similar::TextDiff;

use crate::errors::RestoreError;
use crate::options::RestorationOptions;

pub use templates::{BACKGROUND_FALLBACK, KEEP_COMPOSITION, POSE_FALLBACK};

/// Builds the instruction string for `options`.
///
/// Never fails. A `change_clothes` request without a description is
/// composed as-is; use [`compose_checked`] to reject it first.
pub fn compose(options: &RestorationOptions) -> String {
    let mut blocks: Vec<String> = vec![
        templates::PREAMBLE.to_string(),
        format!(
            "PRIMARY TASK: {}\n{}",
            options.base_type.as_str().to_ascii_uppercase(),
            templates::primary_task(options.base_type)
        ),
    ];

    let additive = &options.additive;
    if additive.passport {
        blocks.push(templates::PASSPORT.to_string());
    }

    if additive.full_body {
        let pose = non_blank(&options.pose_description)
            .map(templates::requested_pose)
            .unwrap_or_else(|| templates::POSE_FALLBACK.to_string());
        let background = non_blank(&options.background_description)
            .map(templates::requested_background)
            .unwrap_or_else(|| templates::BACKGROUND_FALLBACK.to_string());
        blocks.push(templates::full_body(&pose, &background));
    }

    if additive.change_clothes {
        blocks.push(templates::change_clothes(&options.clothing_description));
    }

    if let Some(custom) = non_blank(&options.custom_instruction) {
        blocks.push(templates::custom_instruction(custom));
    }

    blocks.push(format!(
        "{}\n{}\n{}",
        templates::ARTISTIC_HEADER,
        artistic_direction(options),
        templates::CLOSING
    ));

    blocks.join("\n")
}

/// [`RestorationOptions::validate`] followed by [`compose`].
pub fn compose_checked(options: &RestorationOptions) -> Result<String, RestoreError> {
    options.validate()?;
    Ok(compose(options))
}

fn artistic_direction(options: &RestorationOptions) -> String {
    let directives = [
        templates::camera_quality(options.camera_quality),
        templates::camera_angle(options.camera_angle),
        templates::aspect_ratio(options.aspect_ratio),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<&str>>();
    if directives.is_empty() {
        return templates::KEEP_COMPOSITION.to_string();
    }
    directives.join(" ")
}

// Whitespace-only text counts as absent; anything else is quoted as given.
fn non_blank(value: &str) -> Option<&str> {
    (!value.trim().is_empty()).then_some(value)
}

/// Unified line diff from `prev` to `curr`, or `None` when they are equal.
pub fn prompt_diff(prev: &str, curr: &str) -> Option<Vec<String>> {
    if prev == curr {
        return None;
    }
    let diff = TextDiff::from_lines(prev, curr);
    let rendered = diff.unified_diff().header("prev", "curr").to_string();
    Some(rendered.lines().map(str::to_string).collect())
}

/// SHA-256 hex digest of a composed prompt. Logged in place of the prompt.
pub fn prompt_fingerprint(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use crate::errors::RestoreError;
    use crate::options::{
        AspectRatio, BaseRestorationType, CameraAngle, CameraQuality, RestorationOptions,
    };

    use super::{
        compose, compose_checked, prompt_diff, prompt_fingerprint, BACKGROUND_FALLBACK,
        KEEP_COMPOSITION, POSE_FALLBACK,
    };

    const NO_COLOR: &str = "DO NOT ADD COLOR";
    const COLORIZATION: &str = "Colorization";

    fn everything_enabled() -> RestorationOptions {
        let mut options = RestorationOptions::new(BaseRestorationType::Colorize);
        options.additive.passport = true;
        options.additive.full_body = true;
        options.additive.change_clothes = true;
        options.clothing_description = "a red wool coat".to_string();
        options.background_description = "a snowy street".to_string();
        options.pose_description = "hands in pockets".to_string();
        options.custom_instruction = "remove the lamp post".to_string();
        options.camera_quality = CameraQuality::Uhd8k;
        options.camera_angle = CameraAngle::Below;
        options.aspect_ratio = AspectRatio::Portrait3x4;
        options
    }

    #[test]
    fn compose_is_deterministic() {
        let options = everything_enabled();
        let first = compose(&options);
        let second = compose(&options.clone());
        assert_eq!(first, second);
        assert_eq!(prompt_diff(&first, &second), None);
        assert_eq!(prompt_fingerprint(&first), prompt_fingerprint(&second));
    }

    #[test]
    fn primary_task_directives_follow_base_type() {
        let repair = compose(&RestorationOptions::new(BaseRestorationType::RepairBw));
        assert!(repair.contains("PRIMARY TASK: REPAIR_BW"));
        assert!(repair.contains(NO_COLOR));
        assert!(!repair.contains(COLORIZATION));

        let colorize = compose(&RestorationOptions::new(BaseRestorationType::Colorize));
        assert!(colorize.contains("PRIMARY TASK: COLORIZE"));
        assert!(colorize.contains(COLORIZATION));
        assert!(!colorize.contains(NO_COLOR));

        let enhance = compose(&RestorationOptions::new(BaseRestorationType::Enhance));
        assert!(enhance.contains("PRIMARY TASK: ENHANCE"));
        assert!(!enhance.contains(COLORIZATION));
        assert!(!enhance.contains(NO_COLOR));
    }

    #[test]
    fn defaults_produce_only_primary_and_closing_blocks() {
        let prompt = compose(&RestorationOptions::default());
        assert!(prompt.starts_with("You will receive a photo to restore."));
        assert!(!prompt.contains("ADDITIONAL TASK"));
        assert!(prompt.contains(KEEP_COMPOSITION));
        assert!(prompt.ends_with(
            "Output MUST be the processed image only. Do not add text, borders, or artifacts."
        ));
    }

    #[test]
    fn clothes_block_only_when_enabled() {
        let mut options = RestorationOptions::default();
        options.clothing_description = "a tuxedo".to_string();
        let prompt = compose(&options);
        assert!(!prompt.contains("Change Clothes"));
        assert!(!prompt.contains("a tuxedo"));

        options.additive.change_clothes = true;
        let prompt = compose(&options);
        assert!(prompt.contains("ADDITIONAL TASK: Change Clothes"));
        assert!(prompt.contains("Dress the subject in \"a tuxedo\"."));
        assert!(prompt.contains("body shape (unless Full Body is also requested)"));
    }

    #[test]
    fn clothes_change_allows_generated_body_alongside_full_body() {
        let mut options = RestorationOptions::default();
        options.additive.full_body = true;
        options.additive.change_clothes = true;
        options.clothing_description = "a linen summer dress".to_string();
        let prompt = compose(&options);

        let generate = prompt
            .find("Generate the missing body")
            .unwrap_or(usize::MAX);
        let preserve = prompt
            .find("2. Strict Preservation: Do NOT change the face, hair, body shape (unless Full Body is also requested), pose, or background.")
            .unwrap_or(usize::MAX);
        assert!(generate < preserve && preserve != usize::MAX);
        assert!(!prompt.contains("hair, body shape, pose"));
    }

    #[test]
    fn caller_text_is_quoted_as_given() {
        let mut options = RestorationOptions::default();
        options.additive.full_body = true;
        options.additive.change_clothes = true;
        options.pose_description = "  leaning on a fence ".to_string();
        options.background_description = " an orchard\t".to_string();
        options.clothing_description = " a grey cardigan ".to_string();
        options.custom_instruction = "\nwarm the skin tones ".to_string();
        let prompt = compose(&options);

        assert!(prompt.contains("pose request: \"  leaning on a fence \"."));
        assert!(prompt.contains("description: \" an orchard\t\"."));
        assert!(prompt.contains("Dress the subject in \" a grey cardigan \"."));
        assert!(prompt.contains("high priority: \"\nwarm the skin tones \""));
    }

    #[test]
    fn full_body_uses_fallbacks_for_blank_descriptions() {
        let mut options = RestorationOptions::default();
        options.additive.full_body = true;
        options.pose_description = "  ".to_string();
        let prompt = compose(&options);
        assert!(prompt.contains(&format!("3. Pose Generation: {POSE_FALLBACK}")));
        assert!(prompt.contains(&format!("4. Background Generation: {BACKGROUND_FALLBACK}")));
        assert!(prompt.contains("must not contain any other people or faces"));
        assert!(!prompt.contains("{pose}"));
    }

    #[test]
    fn full_body_quotes_caller_descriptions() {
        let mut options = RestorationOptions::default();
        options.additive.full_body = true;
        options.pose_description = "arms crossed {background}".to_string();
        options.background_description = "a wheat field at dusk".to_string();
        let prompt = compose(&options);
        assert!(prompt.contains("Follow this specific pose request: \"arms crossed {background}\"."));
        assert!(prompt.contains("based on this description: \"a wheat field at dusk\"."));
        assert!(!prompt.contains(POSE_FALLBACK));
    }

    #[test]
    fn blocks_appear_in_priority_order() {
        let prompt = compose(&everything_enabled());
        let order = [
            "PRIMARY TASK: COLORIZE",
            "Format as Passport Photo",
            "Generate Full Body",
            "Change Clothes",
            "Custom User Instruction",
            "Artistic Direction",
            "Output MUST be the processed image only.",
        ];
        let positions = order
            .iter()
            .map(|needle| prompt.find(needle).unwrap_or(usize::MAX))
            .collect::<Vec<usize>>();
        assert!(positions.iter().all(|pos| *pos != usize::MAX));
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn artistic_direction_keeps_quality_angle_ratio_order() {
        let mut options = RestorationOptions::default();
        options.aspect_ratio = AspectRatio::Square;
        options.camera_quality = CameraQuality::Uhd4k;
        options.camera_angle = CameraAngle::EyeLevel;
        let prompt = compose(&options);
        let quality = prompt.find("equivalent to a 4K photograph").unwrap_or(usize::MAX);
        let angle = prompt.find("eye-level perspective").unwrap_or(usize::MAX);
        let ratio = prompt.find("square aspect ratio (1:1)").unwrap_or(usize::MAX);
        assert!(quality < angle && angle < ratio && ratio != usize::MAX);
        assert!(!prompt.contains(KEEP_COMPOSITION));
    }

    #[test]
    fn custom_instruction_is_skipped_when_blank() {
        let mut options = RestorationOptions::default();
        options.custom_instruction = "\n\t ".to_string();
        assert!(!compose(&options).contains("Custom User Instruction"));

        options.custom_instruction = "make the sky overcast".to_string();
        let prompt = compose(&options);
        assert!(prompt.contains("with high priority: \"make the sky overcast\""));
    }

    #[test]
    fn compose_checked_rejects_missing_clothing() {
        let mut options = RestorationOptions::default();
        options.additive.change_clothes = true;
        assert!(matches!(
            compose_checked(&options),
            Err(RestoreError::Validation(_))
        ));
        // compose itself stays total.
        assert!(compose(&options).contains("Change Clothes"));
    }

    #[test]
    fn prompt_diff_reports_changed_lines() {
        let before = compose(&RestorationOptions::new(BaseRestorationType::Enhance));
        let mut options = RestorationOptions::new(BaseRestorationType::Enhance);
        options.additive.passport = true;
        let after = compose(&options);

        let diff = prompt_diff(&before, &after).unwrap_or_default();
        assert_eq!(diff.first().map(String::as_str), Some("--- prev"));
        assert!(diff
            .iter()
            .any(|line| line == "+ADDITIONAL TASK: Format as Passport Photo"));
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        assert_eq!(
            prompt_fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
