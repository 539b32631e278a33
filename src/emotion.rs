use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Coarse emotion taxonomy shared by the CAL500 tag mapping and the
/// valence/arousal quadrant mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Emotion {
    Happy,
    Angry,
    Sad,
    Relaxed,
}

impl Emotion {
    pub const ALL: [Emotion; 4] = [Emotion::Happy, Emotion::Angry, Emotion::Sad, Emotion::Relaxed];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Happy => "Happy",
            Self::Angry => "Angry",
            Self::Sad => "Sad",
            Self::Relaxed => "Relaxed",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown emotion label: {s}"))
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum EmotionError {
    #[error("Invalid input: coordinates should be between 0 and 1.")]
    OutOfRange { valence: f64, arousal: f64 },
}

/// CAL500 emotion tags and the quadrant each collapses onto.
const CAL500_MAPPING: &[(&str, Emotion)] = &[
    // Angry
    ("Emotion-Angry_/_Agressive", Emotion::Angry),
    ("Emotion-Bizarre_/_Weird", Emotion::Angry),
    // Happy
    ("Emotion-Powerful_/_Strong", Emotion::Happy),
    ("Emotion-Loving_/_Romantic", Emotion::Happy),
    ("Emotion-Arousing_/_Awakening", Emotion::Happy),
    ("Emotion-Exciting_/_Thrilling", Emotion::Happy),
    ("Emotion-Cheerful_/_Festive", Emotion::Happy),
    ("Emotion-Happy", Emotion::Happy),
    ("Emotion-Positive_/_Optimistic", Emotion::Happy),
    ("Emotion-Light_/_Playful", Emotion::Happy),
    // Sad
    ("Emotion-Touching_/_Loving", Emotion::Sad),
    ("Emotion-Sad", Emotion::Sad),
    ("Emotion-Emotional_/_Passionate", Emotion::Sad),
    // Relaxed
    ("Emotion-Calming_/_Soothing", Emotion::Relaxed),
    ("Emotion-Laid-back_/_Mellow", Emotion::Relaxed),
    ("Emotion-Carefree_/_Lighthearted", Emotion::Relaxed),
    ("Emotion-Pleasant_/_Comfortable", Emotion::Relaxed),
    ("Emotion-Tender_/_Soft", Emotion::Relaxed),
];

/// The 18 recognized CAL500 emotion tags.
pub const CAL500_TAGS: [&str; 18] = [
    "Emotion-Angry_/_Agressive",
    "Emotion-Bizarre_/_Weird",
    "Emotion-Powerful_/_Strong",
    "Emotion-Loving_/_Romantic",
    "Emotion-Arousing_/_Awakening",
    "Emotion-Exciting_/_Thrilling",
    "Emotion-Cheerful_/_Festive",
    "Emotion-Happy",
    "Emotion-Positive_/_Optimistic",
    "Emotion-Light_/_Playful",
    "Emotion-Touching_/_Loving",
    "Emotion-Sad",
    "Emotion-Emotional_/_Passionate",
    "Emotion-Calming_/_Soothing",
    "Emotion-Laid-back_/_Mellow",
    "Emotion-Carefree_/_Lighthearted",
    "Emotion-Pleasant_/_Comfortable",
    "Emotion-Tender_/_Soft",
];

/// Map a CAL500 emotion tag onto the four-label taxonomy.
/// Unrecognized tags are a lookup miss and return `None`.
pub fn map_emotion_cal500(tag: &str) -> Option<Emotion> {
    CAL500_MAPPING
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, e)| *e)
}

/// Map a (valence, arousal) point in the unit square onto its quadrant.
///
/// Bounds are inclusive and a coordinate of exactly 0.5 falls on the
/// high side. Anything outside `[0, 1]` (including NaN) is rejected.
pub fn map_emotion(valence: f64, arousal: f64) -> Result<Emotion, EmotionError> {
    let in_range = |x: f64| (0.0..=1.0).contains(&x);
    if !in_range(valence) || !in_range(arousal) {
        return Err(EmotionError::OutOfRange { valence, arousal });
    }

    let emotion = match (valence >= 0.5, arousal >= 0.5) {
        (true, true) => Emotion::Happy,
        (false, true) => Emotion::Angry,
        (false, false) => Emotion::Sad,
        (true, false) => Emotion::Relaxed,
    };
    Ok(emotion)
}
