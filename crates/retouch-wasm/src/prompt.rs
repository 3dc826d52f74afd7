//! Option and prompt bindings.
//!
//! Options cross the boundary as plain objects with snake_case keys and
//! SCREAMING_SNAKE_CASE values; missing keys take their defaults.
//!
//! ```typescript
//! const options = { ...default_options(), sky_replacement: 'GOLDEN_HOUR' };
//! const prompt = build_batch_prompt(options, 'Lakeside villa', '');
//! ```

use retouch_core::prompt::{batch_prompt, masked_prompt};
use retouch_core::{ProcessingOptions, ProjectNotes, TargetAspect};
use wasm_bindgen::prelude::*;

/// The options a fresh session starts with.
#[wasm_bindgen]
pub fn default_options() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&ProcessingOptions::default())
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize options: {}", e)))
}

/// Full prompt for a batch edit with the given options and project notes.
#[wasm_bindgen]
pub fn build_batch_prompt(options: JsValue, context: String, extra: String) -> Result<String, JsValue> {
    let options: ProcessingOptions = serde_wasm_bindgen::from_value(options)
        .map_err(|e| JsValue::from_str(&format!("Invalid options: {}", e)))?;
    Ok(batch_prompt(&options, &ProjectNotes { context, extra }))
}

/// Full prompt for a masked edit. Blank text means remove and inpaint.
#[wasm_bindgen]
pub fn build_masked_prompt(replacement: Option<String>) -> String {
    masked_prompt(replacement.as_deref().map(str::trim).filter(|t| !t.is_empty()))
}

/// Output aspect ratio the model is asked for when keeping the original.
#[wasm_bindgen]
pub fn infer_aspect_ratio(width: u32, height: u32) -> String {
    TargetAspect::infer(width, height).as_str().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_aspect_ratio() {
        assert_eq!(infer_aspect_ratio(1920, 1080), "16:9");
        assert_eq!(infer_aspect_ratio(1000, 1000), "1:1");
        assert_eq!(infer_aspect_ratio(1000, 2000), "9:16");
    }

    #[test]
    fn test_masked_prompt_blank_text_removes() {
        assert!(build_masked_prompt(Some("   ".into())).contains("REMOVE OBJECT"));
        assert!(build_masked_prompt(Some("a lamp".into())).contains("\"a lamp\""));
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_batch_prompt_from_defaults() {
        let prompt = build_batch_prompt(default_options().unwrap(), "Villa".into(), String::new())
            .unwrap();
        assert!(prompt.contains("PROJECT CONTEXT: Villa"));
    }

    #[wasm_bindgen_test]
    fn test_invalid_options_rejected() {
        let result = build_batch_prompt(JsValue::from_str("nope"), String::new(), String::new());
        assert!(result.is_err());
    }
}
