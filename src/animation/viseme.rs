use crate::config::FrameRate;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Coarse mouth-shape category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouthShape {
    Rest,
    Open,
    Narrow,
    Wide,
    Oh,
    Teeth,
    Smile,
}

impl MouthShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            MouthShape::Rest => "rest",
            MouthShape::Open => "open",
            MouthShape::Narrow => "narrow",
            MouthShape::Wide => "wide",
            MouthShape::Oh => "oh",
            MouthShape::Teeth => "teeth",
            MouthShape::Smile => "smile",
        }
    }
}

/// Phonetic class of a narration character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneticClass {
    Vowel,
    Bilabial,
    Dental,
    Fricative,
    Default,
}

impl PhoneticClass {
    pub fn of(grapheme: &str) -> Self {
        let Some(c) = single_letter(grapheme) else {
            return PhoneticClass::Default;
        };
        match c {
            'a' | 'e' | 'i' | 'o' | 'u' | 'y' => PhoneticClass::Vowel,
            'b' | 'm' | 'p' => PhoneticClass::Bilabial,
            't' | 'd' | 'n' | 'l' => PhoneticClass::Dental,
            'f' | 'v' | 's' | 'z' | 'h' | 'c' | 'j' | 'x' => PhoneticClass::Fricative,
            _ => PhoneticClass::Default,
        }
    }
}

fn single_letter(grapheme: &str) -> Option<char> {
    let mut chars = grapheme.chars();
    let c = chars.next()?.to_ascii_lowercase();
    if chars.next().is_some() {
        return None;
    }
    Some(c)
}

/// Shape for one narration grapheme
pub fn shape_for_grapheme(grapheme: &str) -> MouthShape {
    match PhoneticClass::of(grapheme) {
        PhoneticClass::Vowel => match single_letter(grapheme) {
            Some('a') => MouthShape::Open,
            Some('o') | Some('u') => MouthShape::Oh,
            Some('i') | Some('y') => MouthShape::Smile,
            _ => MouthShape::Wide,
        },
        PhoneticClass::Bilabial => MouthShape::Narrow,
        PhoneticClass::Dental | PhoneticClass::Fricative => MouthShape::Teeth,
        PhoneticClass::Default => {
            if grapheme.chars().any(char::is_alphabetic) {
                MouthShape::Open
            } else {
                MouthShape::Rest
            }
        }
    }
}

/// Tuning for narration-driven mouth animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisemeParams {
    /// Frames up to and including this index keep the mouth at rest
    pub speaking_threshold_frame: u64,
    /// Frames spent on each narration character
    pub stride: u64,
}

impl Default for VisemeParams {
    fn default() -> Self {
        Self {
            speaking_threshold_frame: 0,
            stride: 5,
        }
    }
}

/// Mouth shape at `frame_index` for the given narration
pub fn shape_for(narration: &str, frame_index: u64, params: VisemeParams) -> MouthShape {
    if frame_index <= params.speaking_threshold_frame || narration.is_empty() {
        return MouthShape::Rest;
    }
    let graphemes: Vec<&str> = narration.graphemes(true).collect();
    shape_in(&graphemes, frame_index, params)
}

fn shape_in(graphemes: &[&str], frame_index: u64, params: VisemeParams) -> MouthShape {
    if graphemes.is_empty() || frame_index <= params.speaking_threshold_frame {
        return MouthShape::Rest;
    }
    let stride = params.stride.max(1);
    let char_index = ((frame_index / stride) % graphemes.len() as u64) as usize;
    shape_for_grapheme(graphemes[char_index])
}

/// Maps narration text and frame index to mouth shapes
///
/// Every `stride` frames the mapper advances one grapheme through the
/// narration, wrapping around, and picks a shape from that grapheme's coarse
/// phonetic class. Holds the segmented narration so repeated lookups over a scene avoid
/// re-segmenting the text.
#[derive(Debug, Clone)]
pub struct VisemeMapper<'a> {
    graphemes: Vec<&'a str>,
    params: VisemeParams,
}

impl<'a> VisemeMapper<'a> {
    pub fn new(narration: &'a str, params: VisemeParams) -> Self {
        Self {
            graphemes: narration.graphemes(true).collect(),
            params,
        }
    }

    pub fn shape_at(&self, frame_index: u64) -> MouthShape {
        shape_in(&self.graphemes, frame_index, self.params)
    }
}

/// One entry of a per-frame mouth animation track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MouthKeyframe {
    pub frame: u64,
    pub mouth_shape: MouthShape,
    pub intensity: f64,
}

/// Per-frame mouth shapes for a narration spoken over `duration_seconds`
pub fn mouth_track(
    narration: &str,
    duration_seconds: f64,
    frame_rate: FrameRate,
    params: VisemeParams,
) -> Vec<MouthKeyframe> {
    let mapper = VisemeMapper::new(narration, params);
    (0..frame_rate.frame_count(duration_seconds))
        .map(|frame| MouthKeyframe {
            frame,
            mouth_shape: mapper.shape_at(frame),
            intensity: 0.5 + 0.5 * (frame % 10) as f64 / 10.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_before_threshold() {
        let params = VisemeParams {
            speaking_threshold_frame: 10,
            stride: 5,
        };
        for frame in 0..=10 {
            assert_eq!(shape_for("Hello", frame, params), MouthShape::Rest);
        }
        assert_ne!(shape_for("Hello", 11, params), MouthShape::Rest);
    }

    #[test]
    fn test_empty_narration_is_rest() {
        for frame in [0, 1, 30, 1000] {
            assert_eq!(shape_for("", frame, VisemeParams::default()), MouthShape::Rest);
        }
    }

    #[test]
    fn test_hello_at_frame_30() {
        // (30 / 5) mod 5 = 1 -> 'e'
        let params = VisemeParams::default();
        assert_eq!(shape_for("Hello", 0, params), MouthShape::Rest);
        assert_eq!(shape_for("Hello", 30, params), shape_for_grapheme("e"));
        assert_eq!(shape_for("Hello", 30, params), MouthShape::Wide);
    }

    #[test]
    fn test_phonetic_table() {
        assert_eq!(shape_for_grapheme("a"), MouthShape::Open);
        assert_eq!(shape_for_grapheme("O"), MouthShape::Oh);
        assert_eq!(shape_for_grapheme("i"), MouthShape::Smile);
        assert_eq!(shape_for_grapheme("m"), MouthShape::Narrow);
        assert_eq!(shape_for_grapheme("t"), MouthShape::Teeth);
        assert_eq!(shape_for_grapheme("f"), MouthShape::Teeth);
        assert_eq!(shape_for_grapheme("k"), MouthShape::Open);
        assert_eq!(shape_for_grapheme(" "), MouthShape::Rest);
        assert_eq!(shape_for_grapheme("!"), MouthShape::Rest);
        assert_eq!(PhoneticClass::of("B"), PhoneticClass::Bilabial);
        assert_eq!(PhoneticClass::of("é"), PhoneticClass::Default);
    }

    #[test]
    fn test_deterministic() {
        let params = VisemeParams::default();
        let text = "Once upon a time, in a quiet forest...";
        for frame in 0..500 {
            assert_eq!(shape_for(text, frame, params), shape_for(text, frame, params));
        }
    }

    #[test]
    fn test_mapper_matches_free_function() {
        let params = VisemeParams {
            speaking_threshold_frame: 3,
            stride: 2,
        };
        let text = "Brave heart";
        let mapper = VisemeMapper::new(text, params);
        for frame in 0..200 {
            assert_eq!(mapper.shape_at(frame), shape_for(text, frame, params));
        }
    }

    #[test]
    fn test_mouth_track() {
        let track = mouth_track("Hi", 1.0, FrameRate::DEFAULT, VisemeParams::default());
        assert_eq!(track.len(), 30);
        assert_eq!(track[0].mouth_shape, MouthShape::Rest);
        assert!((track[0].intensity - 0.5).abs() < 1e-12);
        assert!((track[9].intensity - 0.95).abs() < 1e-12);
        assert!((track[10].intensity - 0.5).abs() < 1e-12);
        // (5 / 5) mod 2 = 1 -> 'i'
        assert_eq!(track[5].mouth_shape, MouthShape::Smile);
    }
}
