//! Phonemes to rhythm pattern, and the text-level `encode` entry point.

use crate::config::EncodeOptions;
use crate::error::Result;
use crate::language::normalize::{has_diacritics, normalize};
use crate::language::phonemes::extract_phonemes;
use crate::types::{Phoneme, RhythmPattern, Symbol, Vowel};

/// Map a phoneme sequence to its letter-based rhythm.
///
/// A short vowel gives one moving symbol, a long vowel gives moving then
/// still, and a quiescent consonant gives a single still. Gemination adds
/// the still of the doubled consonant's first copy ahead of the second
/// copy's vowel.
pub fn phonemes_to_pattern(phonemes: &[Phoneme]) -> RhythmPattern {
    let mut symbols = Vec::with_capacity(phonemes.len() * 2);
    for p in phonemes {
        if p.geminated {
            symbols.push(Symbol::Still);
        }
        match p.vowel {
            Vowel::None => symbols.push(Symbol::Still),
            Vowel::A | Vowel::I | Vowel::U => symbols.push(Symbol::Moving),
            Vowel::Aa | Vowel::Ii | Vowel::Uu => {
                symbols.push(Symbol::Moving);
                symbols.push(Symbol::Still);
            }
        }
    }
    RhythmPattern::from_symbols(symbols)
}

/// Result of encoding one hemistich.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub normalized: String,
    pub has_diacritics: bool,
    pub phonemes: Vec<Phoneme>,
    pub pattern: RhythmPattern,
}

/// Normalize, extract and encode a hemistich.
///
/// `has_diacritics_hint` overrides detection when given; otherwise the text is
/// scanned for tashkeel.
pub fn encode_detailed(
    text: &str,
    has_diacritics_hint: Option<bool>,
    options: &EncodeOptions,
) -> Result<Encoded> {
    let normalized = normalize(text, &options.normalize)?;
    let diacritized = has_diacritics_hint.unwrap_or_else(|| has_diacritics(&normalized))
        && !options.normalize.remove_tashkeel;
    let phonemes = extract_phonemes(&normalized, diacritized, options);
    let pattern = phonemes_to_pattern(&phonemes);
    log::debug!(
        "Encoded {} phonemes into {} symbols (diacritized: {})",
        phonemes.len(),
        pattern.len(),
        diacritized
    );
    Ok(Encoded {
        normalized,
        has_diacritics: diacritized,
        phonemes,
        pattern,
    })
}

/// Encode text into its rhythm pattern.
pub fn encode(
    text: &str,
    has_diacritics: Option<bool>,
    options: &EncodeOptions,
) -> Result<RhythmPattern> {
    encode_detailed(text, has_diacritics, options).map(|e| e.pattern)
}
