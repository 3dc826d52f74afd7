//! Prompt text for the image model.
//!
//! Batch edits get the fixed system rules followed by one task line per
//! active option. Masked edits get the same rules followed by a single
//! instruction about the red mask region.

use crate::options::{
    FurnitureLevel, LightsMode, NoiseLevel, PeopleDensity, PeopleStyle, ProcessingOptions,
    SkyReplacement, Strength, TimeOfDay, Vehicles, WhiteBalance,
};

/// Rules sent with every request.
pub const SYSTEM_INSTRUCTIONS: &str = "\
ROLE: You are a senior architectural photo retoucher.

CRITICAL RULES:
1. PRESERVE STRUCTURE: never change the design or massing of the building.
2. PRESERVE MATERIALS: brick stays brick, wood stays wood. Never swap a material for another.
3. PRESERVE ORIGINAL COLORS: clean and brighten only. Do not repaint walls or floors unless a task asks for it.
4. CORRECT GEOMETRY: every vertical line must stand at 90 degrees to the ground.

Carry out the TASKS listed below exactly.";

fn strength_word(strength: Strength) -> &'static str {
    match strength {
        Strength::Off => "off",
        Strength::Low => "light",
        Strength::Medium => "moderate",
        Strength::Strong => "strong",
    }
}

/// One task line per active option, in a stable order.
pub fn task_directives(options: &ProcessingOptions) -> Vec<String> {
    let mut tasks = Vec::new();

    // Geometry
    if options.auto_verticals {
        tasks.push("- Straighten walls and columns (verticals).".to_string());
    }
    if options.auto_perspective {
        tasks.push("- Balance the perspective.".to_string());
    }
    if options.auto_lens_correction {
        tasks.push("- Correct lens distortion and vignetting.".to_string());
    }
    if options.auto_level_horizon {
        tasks.push("- Level the horizon.".to_string());
    }

    // Cleaning
    if options.clean_walls.is_on() {
        let mode = if options.clean_walls == Strength::Strong {
            "Digital restoration"
        } else {
            "Clean"
        };
        tasks.push(format!(
            "- Walls: {}. Remove mould and dirt. Keep the original paint color. Rebuild a smooth surface.",
            mode
        ));
    }
    if options.clean_paving.is_on() || options.clean_ground_tiles.is_on() {
        tasks.push(
            "- Floors and paving: remove stains and refresh grout lines. Keep the original material."
                .to_string(),
        );
    }
    if options.clean_glass.is_on() {
        tasks.push(format!(
            "- Glass: {} cleaning of smudges and reflections.",
            strength_word(options.clean_glass)
        ));
    }
    if options.clean_trash {
        tasks.push("- Remove trash and stray objects from the ground.".to_string());
    }
    if options.remove_power_lines {
        tasks.push("- Remove power lines.".to_string());
    }
    if options.remove_sensor_spots {
        tasks.push("- Remove sensor dust spots.".to_string());
    }
    let noise = match options.remove_urban_noise {
        NoiseLevel::Low => "light",
        NoiseLevel::Medium => "moderate",
        NoiseLevel::Strong => "strong",
    };
    tasks.push(format!(
        "- Urban clutter (signs, cones, bins): {} removal.",
        noise
    ));

    // Lighting
    if options.auto_hdr.is_on() {
        tasks.push(format!(
            "- Auto HDR: {} balancing of highlights and shadows.",
            strength_word(options.auto_hdr)
        ));
    }
    match options.white_balance {
        WhiteBalance::ArchitecturalNeutral => {
            tasks.push("- White balance: neutral architectural white.".to_string())
        }
        WhiteBalance::Warm => tasks.push("- White balance: slightly warm.".to_string()),
        WhiteBalance::Cool => tasks.push("- White balance: slightly cool.".to_string()),
    }
    if options.optimize_interior {
        tasks.push("- Optimize interior exposure seen through windows.".to_string());
    }

    // Environment
    if options.sky_replacement != SkyReplacement::Off {
        let sky = match options.sky_replacement {
            SkyReplacement::Custom => options.sky_custom_prompt.trim().to_string(),
            SkyReplacement::ClearBlue => "clear blue sky".to_string(),
            SkyReplacement::SoftOvercast => "soft overcast sky".to_string(),
            SkyReplacement::GoldenHour => "golden hour sky".to_string(),
            SkyReplacement::DramaticCloudy => "dramatic cloudy sky".to_string(),
            SkyReplacement::NightLuxury => "luxury night sky".to_string(),
            SkyReplacement::Off => String::new(),
        };
        if !sky.is_empty() {
            let mut line = format!(
                "- Replace the sky: {} at {}% strength.",
                sky,
                options.sky_strength()
            );
            if options.match_light_direction {
                line.push_str(" Match the light direction to the original.");
            }
            tasks.push(line);
        }
    }
    if options.cpl_filter {
        tasks.push("- Simulate a circular polarizer: deeper sky, fewer reflections.".to_string());
    }
    if options.smooth_soft_surfaces.is_on() {
        tasks.push(format!(
            "- Soft surfaces (lawns, fabrics, water): {} smoothing.",
            strength_word(options.smooth_soft_surfaces)
        ));
    }

    // Scene
    match options.lights {
        LightsMode::On => tasks.push("- Turn on the interior lights.".to_string()),
        LightsMode::Off => tasks.push("- Turn off all artificial lights.".to_string()),
        LightsMode::Mixed => {
            tasks.push("- Turn on some interior lights for a lived-in look.".to_string())
        }
        LightsMode::Original => {}
    }
    let time = match options.time_of_day {
        TimeOfDay::Off => None,
        TimeOfDay::Morning => Some("morning"),
        TimeOfDay::Noon => Some("noon"),
        TimeOfDay::Afternoon => Some("afternoon"),
        TimeOfDay::GoldenHour => Some("golden hour"),
        TimeOfDay::BlueHour => Some("blue hour"),
        TimeOfDay::Night => Some("night"),
    };
    if let Some(time) = time {
        tasks.push(format!("- Relight the scene as {}.", time));
    }

    // Staging
    if options.add_people != PeopleDensity::Off {
        let density = match options.add_people {
            PeopleDensity::Low => "a few",
            PeopleDensity::Medium => "some",
            _ => "many",
        };
        let style = match options.people_style {
            PeopleStyle::Business => "business",
            PeopleStyle::Residents => "local residents",
            PeopleStyle::Family => "family",
            PeopleStyle::Tourists => "tourists",
            PeopleStyle::LifestyleMinimal => "minimal lifestyle",
        };
        tasks.push(format!(
            "- Add {} people, style {}. Keep them small and natural.",
            density, style
        ));
    }
    match options.vehicles {
        Vehicles::Off => {}
        Vehicles::Few => tasks.push("- Add a few parked vehicles.".to_string()),
        Vehicles::Many => tasks.push("- Add several vehicles.".to_string()),
    }
    match options.furniture {
        FurnitureLevel::Off => {}
        FurnitureLevel::Light => tasks.push("- Tidy and lightly enhance furniture.".to_string()),
        FurnitureLevel::Heavy => tasks.push("- Restage the furniture.".to_string()),
    }

    if options.color_consistency {
        tasks.push("- Keep color grading consistent across the project.".to_string());
    }

    tasks
}

/// Free-text context the user attached to the project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectNotes {
    /// What the project is (e.g. "riverside villa, modern style").
    pub context: String,
    /// Extra instructions appended to every batch prompt.
    pub extra: String,
}

/// Full prompt for a batch edit.
pub fn batch_prompt(options: &ProcessingOptions, notes: &ProjectNotes) -> String {
    let mut prompt = String::from(SYSTEM_INSTRUCTIONS);
    let context = notes.context.trim();
    if !context.is_empty() {
        prompt.push_str("\n\nPROJECT CONTEXT: ");
        prompt.push_str(context);
    }
    prompt.push_str("\n\nTASKS:\n");
    prompt.push_str(&task_directives(options).join("\n"));

    let extra = notes.extra.trim();
    prompt.push_str("\n\nAdditional notes: ");
    prompt.push_str(if extra.is_empty() { "none" } else { extra });
    prompt
}

/// Instruction for a masked edit. With replacement text the red region is
/// regenerated from it; without, whatever is under the mask is removed.
pub fn mask_instruction(replacement: Option<&str>) -> String {
    match replacement.map(str::trim).filter(|text| !text.is_empty()) {
        Some(text) => format!("GENERATIVE FILL: inside the red mask region, draw: \"{}\".", text),
        None => "REMOVE OBJECT: erase the object inside the red mask region and inpaint the background."
            .to_string(),
    }
}

/// Full prompt for a masked edit.
pub fn masked_prompt(replacement: Option<&str>) -> String {
    format!("{}\n{}", SYSTEM_INSTRUCTIONS, mask_instruction(replacement))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        let tasks = task_directives(&ProcessingOptions::default());
        assert!(tasks.iter().any(|t| t.contains("verticals")));
        assert!(tasks.iter().any(|t| t.contains("power lines")));
        assert!(tasks.iter().any(|t| t.starts_with("- Auto HDR: moderate")));
        assert!(!tasks.iter().any(|t| t.contains("sky")));
        assert!(!tasks.iter().any(|t| t.contains("people")));
        assert!(tasks.iter().all(|t| t.starts_with("- ")));
    }

    #[test]
    fn test_disabled_toggles_drop_directives() {
        let options = ProcessingOptions {
            auto_verticals: false,
            clean_trash: false,
            auto_hdr: Strength::Off,
            ..Default::default()
        };
        let tasks = task_directives(&options);
        assert!(!tasks.iter().any(|t| t.contains("verticals")));
        assert!(!tasks.iter().any(|t| t.contains("trash")));
        assert!(!tasks.iter().any(|t| t.contains("HDR")));
    }

    #[test]
    fn test_custom_sky_uses_prompt() {
        let options = ProcessingOptions {
            sky_replacement: SkyReplacement::Custom,
            sky_custom_prompt: "  pastel sunrise ".to_string(),
            sky_strength: 60,
            ..Default::default()
        };
        let tasks = task_directives(&options);
        let sky = tasks.iter().find(|t| t.contains("Replace the sky")).unwrap();
        assert!(sky.contains("pastel sunrise at 60%"));
        assert!(sky.contains("light direction"));
    }

    #[test]
    fn test_empty_custom_sky_is_skipped() {
        let options = ProcessingOptions {
            sky_replacement: SkyReplacement::Custom,
            ..Default::default()
        };
        assert!(!task_directives(&options)
            .iter()
            .any(|t| t.contains("Replace the sky")));
    }

    #[test]
    fn test_people_directive() {
        let options = ProcessingOptions {
            add_people: PeopleDensity::High,
            people_style: PeopleStyle::Tourists,
            ..Default::default()
        };
        let tasks = task_directives(&options);
        assert!(tasks.iter().any(|t| t.contains("many people, style tourists")));
    }

    #[test]
    fn test_batch_prompt_layout() {
        let notes = ProjectNotes {
            context: "Lakeside hotel".to_string(),
            extra: String::new(),
        };
        let prompt = batch_prompt(&ProcessingOptions::default(), &notes);
        assert!(prompt.starts_with(SYSTEM_INSTRUCTIONS));
        assert!(prompt.contains("PROJECT CONTEXT: Lakeside hotel"));
        assert!(prompt.contains("\n\nTASKS:\n- "));
        assert!(prompt.ends_with("Additional notes: none"));

        let notes = ProjectNotes {
            context: String::new(),
            extra: "keep the red door".to_string(),
        };
        let prompt = batch_prompt(&ProcessingOptions::default(), &notes);
        assert!(!prompt.contains("PROJECT CONTEXT"));
        assert!(prompt.ends_with("Additional notes: keep the red door"));
    }

    #[test]
    fn test_mask_instruction() {
        assert_eq!(
            mask_instruction(Some("a potted olive tree")),
            "GENERATIVE FILL: inside the red mask region, draw: \"a potted olive tree\"."
        );
        assert!(mask_instruction(None).starts_with("REMOVE OBJECT"));
        assert!(mask_instruction(Some("   ")).starts_with("REMOVE OBJECT"));
        assert!(masked_prompt(None).starts_with(SYSTEM_INSTRUCTIONS));
    }
}
