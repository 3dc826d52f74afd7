//! Declarative edit options.
//!
//! [`ProcessingOptions`] is a plain value: the session owns the current one
//! and every request carries a copy taken at dispatch time. Categorical
//! values serialize as `SCREAMING_SNAKE_CASE` strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Output resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::TwoK => "2K",
            Resolution::FourK => "4K",
        }
    }
}

/// Aspect ratio supported by the image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetAspect {
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "3:2")]
    Photo,
    #[serde(rename = "2:3")]
    PhotoPortrait,
}

impl TargetAspect {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetAspect::Wide => "16:9",
            TargetAspect::Landscape => "4:3",
            TargetAspect::Square => "1:1",
            TargetAspect::Portrait => "3:4",
            TargetAspect::Tall => "9:16",
            TargetAspect::Photo => "3:2",
            TargetAspect::PhotoPortrait => "2:3",
        }
    }

    /// Closest supported ratio for an image, so the model does not crop it.
    ///
    /// Only the five base ratios are inferred. Degenerate sizes map to 1:1.
    pub fn infer(width: u32, height: u32) -> TargetAspect {
        if width == 0 || height == 0 {
            return TargetAspect::Square;
        }
        let ratio = width as f64 / height as f64;
        if ratio >= 1.6 {
            TargetAspect::Wide
        } else if ratio >= 1.2 {
            TargetAspect::Landscape
        } else if ratio >= 0.9 {
            TargetAspect::Square
        } else if ratio >= 0.6 {
            TargetAspect::Portrait
        } else {
            TargetAspect::Tall
        }
    }
}

impl fmt::Display for TargetAspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested aspect ratio: keep the source's, or force one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "ORIGINAL")]
    Original,
    #[serde(untagged)]
    Fixed(TargetAspect),
}

impl AspectRatio {
    /// The ratio to request for an image of the given natural size.
    pub fn resolve(self, width: u32, height: u32) -> TargetAspect {
        match self {
            AspectRatio::Original => TargetAspect::infer(width, height),
            AspectRatio::Fixed(target) => target,
        }
    }
}

/// Four-step strength used by most cleaning and lighting toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strength {
    #[default]
    Off,
    Low,
    Medium,
    Strong,
}

impl Strength {
    pub fn is_on(self) -> bool {
        self != Strength::Off
    }
}

/// Urban noise removal has no off setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoiseLevel {
    Low,
    #[default]
    Medium,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WhiteBalance {
    #[default]
    ArchitecturalNeutral,
    Warm,
    Cool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkyReplacement {
    #[default]
    Off,
    ClearBlue,
    SoftOvercast,
    GoldenHour,
    DramaticCloudy,
    NightLuxury,
    /// Uses [`ProcessingOptions::sky_custom_prompt`].
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LightsMode {
    Off,
    On,
    #[default]
    Mixed,
    Original,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeOfDay {
    #[default]
    Off,
    Morning,
    Noon,
    Afternoon,
    GoldenHour,
    BlueHour,
    Night,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeopleDensity {
    #[default]
    Off,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeopleStyle {
    Business,
    #[default]
    Residents,
    Family,
    Tourists,
    LifestyleMinimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Vehicles {
    #[default]
    Off,
    Few,
    Many,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FurnitureLevel {
    Off,
    #[default]
    Light,
    Heavy,
}

/// Maximum sky replacement strength, in percent.
pub const MAX_SKY_STRENGTH: u8 = 100;

/// Every edit toggle, with the defaults a fresh session starts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    pub resolution: Resolution,
    pub aspect_ratio: AspectRatio,

    // Cleaning
    pub clean_trash: bool,
    pub remove_power_lines: bool,
    pub remove_sensor_spots: bool,
    pub clean_paving: Strength,
    pub clean_walls: Strength,
    pub clean_glass: Strength,
    pub clean_ground_tiles: Strength,
    pub remove_urban_noise: NoiseLevel,

    // Geometry
    pub auto_perspective: bool,
    pub auto_verticals: bool,
    pub auto_lens_correction: bool,
    pub auto_level_horizon: bool,

    // Lighting
    pub auto_hdr: Strength,
    pub white_balance: WhiteBalance,
    pub optimize_interior: bool,

    // Environment
    pub sky_replacement: SkyReplacement,
    pub sky_custom_prompt: String,
    /// 0-100.
    pub sky_strength: u8,
    pub match_light_direction: bool,
    pub cpl_filter: bool,

    pub smooth_soft_surfaces: Strength,

    // Scene
    pub lights: LightsMode,
    pub time_of_day: TimeOfDay,

    // Staging
    pub add_people: PeopleDensity,
    pub people_style: PeopleStyle,
    pub vehicles: Vehicles,
    pub furniture: FurnitureLevel,

    pub color_consistency: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            resolution: Resolution::TwoK,
            aspect_ratio: AspectRatio::Original,
            clean_trash: true,
            remove_power_lines: true,
            remove_sensor_spots: true,
            clean_paving: Strength::Off,
            clean_walls: Strength::Off,
            clean_glass: Strength::Off,
            clean_ground_tiles: Strength::Off,
            remove_urban_noise: NoiseLevel::Medium,
            auto_perspective: true,
            auto_verticals: true,
            auto_lens_correction: true,
            auto_level_horizon: true,
            auto_hdr: Strength::Medium,
            white_balance: WhiteBalance::ArchitecturalNeutral,
            optimize_interior: false,
            sky_replacement: SkyReplacement::Off,
            sky_custom_prompt: String::new(),
            sky_strength: MAX_SKY_STRENGTH,
            match_light_direction: true,
            cpl_filter: false,
            smooth_soft_surfaces: Strength::Medium,
            lights: LightsMode::Mixed,
            time_of_day: TimeOfDay::Off,
            add_people: PeopleDensity::Off,
            people_style: PeopleStyle::Residents,
            vehicles: Vehicles::Off,
            furniture: FurnitureLevel::Light,
            color_consistency: true,
        }
    }
}

impl ProcessingOptions {
    /// Sky strength clamped to `[0, 100]`.
    pub fn sky_strength(&self) -> u8 {
        self.sky_strength.min(MAX_SKY_STRENGTH)
    }
}
