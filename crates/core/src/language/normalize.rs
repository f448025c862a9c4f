//! Arabic orthographic normalization and diacritic detection.
//!
//! Unifies hamza carriers and alef variants, optionally strips tashkeel,
//! drops tatweel and collapses whitespace. Characters outside these rules
//! pass through untouched.

use crate::config::NormalizeOptions;
use crate::error::{ProsodyError, Result};

pub const FATHATAN: char = '\u{064B}';
pub const DAMMATAN: char = '\u{064C}';
pub const KASRATAN: char = '\u{064D}';
pub const FATHA: char = '\u{064E}';
pub const DAMMA: char = '\u{064F}';
pub const KASRA: char = '\u{0650}';
pub const SHADDA: char = '\u{0651}';
pub const SUKUN: char = '\u{0652}';
pub const DAGGER_ALEF: char = '\u{0670}';
pub const TATWEEL: char = '\u{0640}';

pub const ALEF: char = '\u{0627}';
pub const ALEF_MAQSURA: char = '\u{0649}';
pub const WAW: char = '\u{0648}';
pub const YAA: char = '\u{064A}';
pub const LAM: char = '\u{0644}';
pub const NOON: char = '\u{0646}';

/// Vowel, sukun, shadda and dagger-alef marks: the tashkeel a reader writes.
pub fn is_tashkeel(ch: char) -> bool {
    matches!(ch, '\u{064B}'..='\u{0652}' | DAGGER_ALEF)
}

/// Any Arabic combining mark, including Quranic annotation marks.
pub fn is_arabic_diacritic(ch: char) -> bool {
    matches!(ch,
        '\u{064B}'..='\u{065F}' |
        DAGGER_ALEF |
        '\u{06D6}'..='\u{06ED}'
    )
}

/// A base Arabic letter (hamza through yaa, plus alef wasla).
pub fn is_arabic_letter(ch: char) -> bool {
    matches!(ch, '\u{0621}'..='\u{063A}' | '\u{0641}'..='\u{064A}' | '\u{0671}')
}

/// True if the text carries any vowel, sukun or shadda mark.
pub fn has_diacritics(text: &str) -> bool {
    text.chars().any(is_tashkeel)
}

fn unify_alef(ch: char) -> Option<char> {
    match ch {
        '\u{0622}' | '\u{0623}' | '\u{0625}' | '\u{0671}' => Some(ALEF),
        _ => None,
    }
}

fn unify_hamza_carrier(ch: char) -> Option<char> {
    match ch {
        '\u{0624}' => Some(WAW),
        '\u{0626}' => Some(YAA),
        _ => None,
    }
}

/// Normalize verse text.
///
/// Fails only when the text is empty or whitespace, before or after
/// normalization. Idempotent for any input it accepts.
pub fn normalize(text: &str, options: &NormalizeOptions) -> Result<String> {
    if text.trim().is_empty() {
        return Err(ProsodyError::EmptyInput);
    }

    let mut result = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = !result.is_empty();
            continue;
        }
        if options.strip_tatweel && ch == TATWEEL {
            continue;
        }
        if options.remove_tashkeel && is_arabic_diacritic(ch) {
            continue;
        }

        let mapped = if options.unify_hamza {
            unify_alef(ch).or_else(|| unify_hamza_carrier(ch)).unwrap_or(ch)
        } else {
            ch
        };
        let mapped = if options.unify_alef_maqsura && mapped == ALEF_MAQSURA {
            YAA
        } else {
            mapped
        };

        if pending_space {
            result.push(' ');
            pending_space = false;
        }
        result.push(mapped);
    }

    if result.is_empty() {
        return Err(ProsodyError::EmptyInput);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(text: &str) -> String {
        normalize(text, &NormalizeOptions::default()).unwrap()
    }

    #[test]
    fn test_empty_and_whitespace_rejected() {
        let opts = NormalizeOptions::default();
        assert!(matches!(normalize("", &opts), Err(ProsodyError::EmptyInput)));
        assert!(matches!(normalize("  \t\n", &opts), Err(ProsodyError::EmptyInput)));
        assert!(matches!(normalize("\u{0640}\u{0640}", &opts), Err(ProsodyError::EmptyInput)));
    }

    #[test]
    fn test_alef_and_hamza_unified() {
        assert_eq!(norm("أحمد"), "احمد");
        assert_eq!(norm("إسلام"), "اسلام");
        assert_eq!(norm("آمن"), "امن");
        assert_eq!(norm("مؤمن"), "مومن");
        assert_eq!(norm("سائل"), "سايل");
        assert_eq!(norm("ٱلحمد"), "الحمد");
    }

    #[test]
    fn test_alef_maqsura_to_yaa() {
        assert_eq!(norm("على"), "علي");
        let opts = NormalizeOptions {
            unify_alef_maqsura: false,
            ..Default::default()
        };
        assert_eq!(normalize("على", &opts).unwrap(), "على");
    }

    #[test]
    fn test_tatweel_and_whitespace() {
        assert_eq!(norm("  قـــفا   نبك  "), "قفا نبك");
    }

    #[test]
    fn test_tashkeel_kept_by_default_and_removable() {
        let text = "قِفَا نَبْكِ";
        assert_eq!(norm(text), text);
        let opts = NormalizeOptions {
            remove_tashkeel: true,
            ..Default::default()
        };
        assert_eq!(normalize(text, &opts).unwrap(), "قفا نبك");
    }

    #[test]
    fn test_unrecognized_chars_pass_through() {
        assert_eq!(norm("abc 123 ؟"), "abc 123 ؟");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "قِفَا نَبْكِ مِنْ ذِكْرَى حَبِيبٍ وَمَنْزِلِ",
            "أَلا  لَيْتَ الشَّبابَ يَعُودُ يَوْماً",
            "ـإئؤآى text\tmixed",
        ];
        for opts in [
            NormalizeOptions::default(),
            NormalizeOptions {
                remove_tashkeel: true,
                ..Default::default()
            },
        ] {
            for s in samples {
                let once = normalize(s, &opts).unwrap();
                let twice = normalize(&once, &opts).unwrap();
                assert_eq!(once, twice, "not idempotent for {s:?}");
            }
        }
    }

    #[test]
    fn test_has_diacritics() {
        assert!(has_diacritics("قِفَا"));
        assert!(has_diacritics("حَبِيبٍ"));
        assert!(!has_diacritics("قفا نبك"));
        assert!(!has_diacritics(""));
    }
}
