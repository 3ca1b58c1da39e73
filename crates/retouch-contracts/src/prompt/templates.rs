use crate::options::{AspectRatio, BaseRestorationType, CameraAngle, CameraQuality};

pub const PREAMBLE: &str = "You will receive a photo to restore. First, perform the primary restoration task defined below. Then, apply any additional tasks that follow.";

const ENHANCE: &str = "As an expert photo restoration specialist, your primary task is to perform a professional-grade restoration of this color photo. Perform the following actions with extreme precision:
1. Ultra HD Clarity & Sharpness: Dramatically increase resolution to a photorealistic level. Every detail must be crystal clear. Eliminate all blurriness and haze.
2. Flawless Damage Repair: Seamlessly fix any scratches, tears, dust, stains, and creases. The repair should be invisible.
3. Vivid Color Restoration: Restore faded colors to their original, stunning vibrancy. Make the colors pop, appear rich, and deeply saturated, yet completely natural and lifelike.
4. Advanced Noise Reduction: Intelligently reduce grain and digital noise without sacrificing fine details.
5. Dynamic Lighting & Contrast: Masterfully balance lighting and contrast to enhance depth and create a powerful, dynamic image.";

const COLORIZE: &str = "As an expert photo restoration specialist, your primary task is to perform a professional-grade restoration and colorization of this black and white photo. Perform the following actions with extreme precision:
1. Perfect Preservation: Do NOT change subjects, background, or composition unless instructed.
2. Vivid & Realistic Colorization: Add natural, historically appropriate colors.
3. Flawless Damage Repair: Fix scratches, tears, dust, stains, and creases invisibly.
4. Ultra HD Clarity & Sharpness: Every detail must be crystal clear.
5. Advanced Noise Reduction: Reduce grain without losing fine detail.
6. Dynamic Lighting & Contrast: Balance light and shadow while respecting the original lighting.";

const REPAIR_BW: &str = "As an expert photo restoration specialist, your primary task is to perform a professional-grade monochrome restoration of this black and white photo. It MUST remain black and white.
1. Flawless Damage Repair: Fix scratches, tears, dust, stains, and creases invisibly.
2. Ultra HD Clarity & Sharpness: Every detail must be crystal clear.
3. Advanced Noise Reduction: Reduce grain without losing fine detail.
4. Dynamic Lighting & Contrast: Create a dramatic, well-balanced monochrome image.
5. ABSOLUTELY DO NOT ADD COLOR.";

pub const PASSPORT: &str = "---
ADDITIONAL TASK: Format as Passport Photo
1. Crop: Head-and-shoulders framing with the face centered.
2. Background: Replace the background with a solid, neutral white.
3. Identity: Preserve facial identity exactly; do not alter any facial features.";

pub fn full_body(pose: &str, background: &str) -> String {
    format!(
        "---
ADDITIONAL TASK: Generate Full Body
1. Anatomical Realism: Generate the missing body and clothing photorealistically.
2. Seamless Blending: Match lighting, shadows, textures, and film grain of the original.
3. Pose Generation: {pose}
4. Background Generation: {background}
5. ABSOLUTE RULE: The generated background must not contain any other people or faces."
    )
}

pub fn requested_pose(pose: &str) -> String {
    format!(
        "Follow this specific pose request: \"{pose}\". The generated pose must be natural and consistent with the visible posture."
    )
}

pub fn requested_background(background: &str) -> String {
    format!(
        "Generate the background based on this description: \"{background}\". It should complement the subject."
    )
}

pub const POSE_FALLBACK: &str = "Generate a natural pose consistent with the visible posture.";

pub const BACKGROUND_FALLBACK: &str =
    "Generate a simple, non-distracting background that complements the subject.";

pub fn change_clothes(clothing: &str) -> String {
    format!(
        "---
ADDITIONAL TASK: Change Clothes
1. New Clothing: Dress the subject in \"{clothing}\". The clothing must be photorealistic and fit the body naturally.
2. Strict Preservation: Do NOT change the face, hair, body shape (unless Full Body is also requested), pose, or background. Only the garment changes.
3. Seamless Integration: Match the original lighting and photographic style."
    )
}

pub fn custom_instruction(custom: &str) -> String {
    format!(
        "---
ADDITIONAL TASK: Custom User Instruction
Apply this on top of everything above, with high priority: \"{custom}\""
    )
}

pub const ARTISTIC_HEADER: &str = "---
Crucial Final Instruction & Artistic Direction:";

pub const KEEP_COMPOSITION: &str = "Keep composition unless explicitly told to crop.";

pub const CLOSING: &str =
    "Output MUST be the processed image only. Do not add text, borders, or artifacts.";

pub fn primary_task(base: BaseRestorationType) -> &'static str {
    match base {
        BaseRestorationType::Enhance => ENHANCE,
        BaseRestorationType::Colorize => COLORIZE,
        BaseRestorationType::RepairBw => REPAIR_BW,
    }
}

pub fn camera_quality(quality: CameraQuality) -> Option<&'static str> {
    match quality {
        CameraQuality::Default => None,
        CameraQuality::Uhd4k => Some(
            "Render the final image with ultra-high definition detail, equivalent to a 4K photograph. Every texture must be sharp and clear.",
        ),
        CameraQuality::Uhd8k => Some(
            "Render the final image with cinematic 8K photorealism, capturing microscopic textures and nuances.",
        ),
    }
}

pub fn camera_angle(angle: CameraAngle) -> Option<&'static str> {
    match angle {
        CameraAngle::Default => None,
        CameraAngle::Above => Some(
            "The final image should be rendered as if shot from a high angle, looking down slightly on the subject.",
        ),
        CameraAngle::EyeLevel => Some(
            "The final image should be rendered from an eye-level perspective for a direct connection.",
        ),
        CameraAngle::Below => Some(
            "The final image should be rendered from a low angle, looking up for a sense of scale.",
        ),
    }
}

pub fn aspect_ratio(ratio: AspectRatio) -> Option<&'static str> {
    match ratio {
        AspectRatio::Default => None,
        AspectRatio::Square => Some("The final image must have a square aspect ratio (1:1)."),
        AspectRatio::Portrait3x4 => {
            Some("The final image must have a vertical portrait aspect ratio (3:4).")
        }
        AspectRatio::Portrait4x5 => {
            Some("The final image must have a vertical portrait aspect ratio (4:5).")
        }
        AspectRatio::Tall9x16 => Some("The final image must have a tall vertical aspect ratio (9:16)."),
        AspectRatio::Wide16x9 => {
            Some("The final image must have a widescreen landscape aspect ratio (16:9).")
        }
    }
}
