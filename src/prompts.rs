//! Prompt templates for segmentation and image generation.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the house illustration style or
//!    the segmentation constraints means editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the assembled prompts without
//!    a live model call, so prompt regressions are cheap to catch.

/// System instruction for the text-segmentation call.
///
/// The model must answer with the strict plan JSON schema
/// (`{total_frames, frames:[{frame_number, description}]}`) and nothing else.
pub const SEGMENTATION_INSTRUCTION: &str = r#"You are a narrative segmentation specialist. Segment video descriptions into distinct storyboard frames based on shifts in action, focus, time, or subject.

<constraints>
- Maximum 10 frames per storyboard
- Preserve original meaning exactly; only rephrase for clarity if text is fragmented
- Do not add details not present in the input
- Identify logical visual beats for frame boundaries
</constraints>

<output_schema>
Respond with JSON only, matching exactly:
{"total_frames": <1..10>, "frames": [{"frame_number": <1-indexed int>, "description": <text>}]}
</output_schema>"#;

/// Shared style instruction for every image-generation call.
pub const IMAGE_SYSTEM_INSTRUCTION: &str = r#"You are a specialized storyboard illustration artist. Your role is to generate visual representations for narrative storyboard frames.

<style_requirements>
- Create images in a pencil black and white sketch style
- Use pencil drawing techniques with varying line weights and shading
- Maintain monochrome aesthetic (black, white, and grayscale only)
- No color should be present in any generated image
</style_requirements>

<framing_requirements>
- Each image must contain ONLY a single frame
- Do NOT create comic strip layouts or multi-panel compositions
- Do NOT show multiple moments or actions within one image
- The image represents one specific moment in time
- Focus on a single shot composition
</framing_requirements>"#;

/// Prompt for the first frame of a sequence (text-only, no reference image).
pub fn first_frame_prompt(description: &str) -> String {
    format!(
        r#"<system_instruction>
{IMAGE_SYSTEM_INSTRUCTION}
</system_instruction>

<task>
Generate a storyboard frame illustration based on the description provided below.
</task>

<scene_description>
{description}
</scene_description>

<style_constraints>
- Pencil black and white sketch style only
- Single frame composition (not a multi-panel layout)
- One moment in time, one shot
</style_constraints>"#
    )
}

/// Prompt for frames 2..N; the previous frame's image travels alongside this
/// text as an inline attachment.
pub fn next_frame_prompt(description: &str) -> String {
    format!(
        r#"<system_instruction>
{IMAGE_SYSTEM_INSTRUCTION}
</system_instruction>

<task>
Generate the next storyboard frame illustration that maintains visual continuity with the previous frame while depicting the new scene described below.
</task>

<previous_frame_context>
The image provided shows the previous frame in this storyboard sequence. Maintain consistent character appearances, art style, and visual language.
</previous_frame_context>

<new_scene_description>
{description}
</new_scene_description>

<style_constraints>
- Pencil black and white sketch style only
- Single frame composition (not a multi-panel layout)
- One moment in time, one shot
- Maintain visual continuity with the reference image
</style_constraints>"#
    )
}

/// Prompt for a targeted single-frame edit; the current frame's image travels
/// alongside this text as an inline attachment.
pub fn edit_frame_prompt(edit_instructions: &str, storyboard_context: &str) -> String {
    format!(
        r#"<system_instruction>
{IMAGE_SYSTEM_INSTRUCTION}
</system_instruction>

<task>
Edit/modify the provided storyboard frame image according to the user's instructions while maintaining the overall style and visual consistency.
</task>

<original_storyboard_context>
This frame is part of a larger storyboard sequence. The overall storyboard description is:
{storyboard_context}
</original_storyboard_context>

<current_frame>
The image provided shows the current frame that needs to be modified.
</current_frame>

<edit_instructions>
{edit_instructions}
</edit_instructions>

<style_constraints>
- Maintain the pencil black and white sketch style
- Keep the same artistic style as the original frame
- Single frame composition (not a multi-panel layout)
- One moment in time, one shot
- Apply the requested changes while preserving other elements unless specifically instructed to change them
</style_constraints>"#
    )
}
