//! Phoneme extraction from normalized Arabic text.
//!
//! Two paths: [`extract_diacritized`] reads vowels straight from the
//! tashkeel, and [`extract_undiacritized`] guesses them from letter shapes.
//! The second path is a lossy fallback. Both treat the input as a single
//! hemistich, so the last phoneme is the verse-final one.

use crate::config::EncodeOptions;
use crate::language::normalize::{
    is_arabic_diacritic, is_arabic_letter, ALEF, ALEF_MAQSURA, DAGGER_ALEF, DAMMA, DAMMATAN,
    FATHA, FATHATAN, KASRA, KASRATAN, LAM, NOON, SHADDA, SUKUN, WAW, YAA,
};
use crate::types::{Phoneme, Vowel};

/// Letters that assimilate the lam of the definite article.
const SUN_LETTERS: &[char] = &[
    'ت', 'ث', 'د', 'ذ', 'ر', 'ز', 'س', 'ش', 'ص', 'ض', 'ط', 'ظ', 'ل', 'ن',
];

/// Marks attached to one letter.
#[derive(Debug, Clone, Default)]
struct Marks {
    vowel: Option<Vowel>,
    tanween: Option<Vowel>,
    sukun: bool,
    shadda: bool,
    dagger_alef: bool,
}

impl Marks {
    /// No vowel, tanween, shadda or dagger alef. A sukun alone still counts as bare.
    fn is_bare(&self) -> bool {
        self.vowel.is_none() && self.tanween.is_none() && !self.shadda && !self.dagger_alef
    }

    fn is_unmarked(&self) -> bool {
        self.is_bare() && !self.sukun
    }

    fn add(&mut self, mark: char) {
        match mark {
            FATHA => self.vowel = Some(Vowel::A),
            KASRA => self.vowel = Some(Vowel::I),
            DAMMA => self.vowel = Some(Vowel::U),
            FATHATAN => self.tanween = Some(Vowel::A),
            KASRATAN => self.tanween = Some(Vowel::I),
            DAMMATAN => self.tanween = Some(Vowel::U),
            SUKUN => self.sukun = true,
            SHADDA => self.shadda = true,
            DAGGER_ALEF => self.dagger_alef = true,
            _ => {}
        }
    }
}

#[derive(Debug, Clone)]
struct Letter {
    ch: char,
    marks: Marks,
}

/// Split text into words of letters with their marks. Anything that is
/// neither a letter nor a mark ends the current word.
fn split_words(text: &str) -> Vec<Vec<Letter>> {
    let mut words = Vec::new();
    let mut current: Vec<Letter> = Vec::new();

    for ch in text.chars() {
        if is_arabic_letter(ch) {
            current.push(Letter {
                ch,
                marks: Marks::default(),
            });
        } else if is_arabic_diacritic(ch) {
            if let Some(last) = current.last_mut() {
                last.marks.add(ch);
            }
        } else if !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// One-letter prefixes that can stand before the definite article.
const PROCLITICS: &[char] = &['و', 'ف', 'ب', 'ك', 'ل'];

/// True when the alef at `i` is the hamza wasl of an article behind
/// vowelled one-letter prefixes, as in وَالْقَمَرِ or فَبِالشَّمْسِ.
fn is_article_alef(letters: &[Letter], i: usize) -> bool {
    let prefixed = letters[..i]
        .iter()
        .all(|l| PROCLITICS.contains(&l.ch) && l.marks.vowel.is_some());
    let lam_follows = letters.get(i + 1).is_some_and(|lam| {
        lam.ch == LAM
            && (lam.marks.is_bare() || letters.get(i + 2).is_some_and(|n| n.marks.shadda))
    });
    prefixed && lam_follows
}

/// Long vowel that a bare alef/waw/yaa spells after the given short vowel.
fn long_vowel_letter(ch: char, previous: Vowel) -> Option<Vowel> {
    match (ch, previous) {
        (ALEF | ALEF_MAQSURA, Vowel::A) => Some(Vowel::Aa),
        (WAW, Vowel::U) => Some(Vowel::Uu),
        (YAA, Vowel::I) => Some(Vowel::Ii),
        _ => None,
    }
}

/// Extract phonemes, dispatching on whether the text carries tashkeel.
pub fn extract_phonemes(
    text: &str,
    has_tashkeel: bool,
    options: &EncodeOptions,
) -> Vec<Phoneme> {
    if has_tashkeel {
        extract_diacritized(text, options)
    } else {
        extract_undiacritized(text, options)
    }
}

/// Diacritized path: every vowel comes from an explicit mark.
pub fn extract_diacritized(text: &str, options: &EncodeOptions) -> Vec<Phoneme> {
    let words = split_words(text);
    let mut out: Vec<Phoneme> = Vec::new();
    let word_count = words.len();

    for (w, letters) in words.iter().enumerate() {
        let word_start = out.len();
        let last_word = w + 1 == word_count;

        for (i, letter) in letters.iter().enumerate() {
            let marks = &letter.marks;
            let in_word = out.len() > word_start;

            if marks.is_bare() && matches!(letter.ch, ALEF | ALEF_MAQSURA | WAW | YAA) {
                if in_word {
                    if i > 0 && letters[i - 1].marks.tanween.is_some() {
                        // Orthographic alef after tanween fath
                        continue;
                    }
                    if letter.ch == ALEF && is_article_alef(letters, i) {
                        continue;
                    }
                    if let Some(prev) = out.last_mut() {
                        if let Some(long) = long_vowel_letter(letter.ch, prev.vowel) {
                            prev.vowel = long;
                            continue;
                        }
                        if letter.ch == YAA
                            && prev.vowel == Vowel::A
                            && marks.is_unmarked()
                            && i + 1 == letters.len()
                        {
                            // Alef maqsura written as yaa after unification
                            prev.vowel = Vowel::Aa;
                            continue;
                        }
                    }
                    if letter.ch == ALEF {
                        // Hamza wasl after a prefix, or a silent alef
                        continue;
                    }
                } else if letter.ch == ALEF && marks.is_unmarked() {
                    if options.elide_hamza_wasl && !out.is_empty() {
                        continue;
                    }
                    out.push(Phoneme::new(ALEF, Vowel::A));
                    continue;
                }
            }

            if letter.ch == LAM
                && marks.is_unmarked()
                && i > 0
                && letters[i - 1].ch == ALEF
                && letters.get(i + 1).is_some_and(|next| next.marks.shadda)
            {
                // Sun letter assimilation: the following shadda carries the lam
                continue;
            }

            let verse_final = last_word && i + 1 == letters.len();
            push_marked(&mut out, letter, verse_final);
        }
    }

    if options.saturate_final {
        saturate_final(&mut out);
    }
    out
}

fn push_marked(out: &mut Vec<Phoneme>, letter: &Letter, verse_final: bool) {
    let marks = &letter.marks;

    if let Some(short) = marks.tanween {
        out.push(Phoneme {
            consonant: letter.ch,
            vowel: short,
            geminated: marks.shadda,
        });
        out.push(Phoneme::new(NOON, Vowel::None));
        return;
    }

    let vowel = if marks.dagger_alef {
        Vowel::Aa
    } else if let Some(v) = marks.vowel {
        v
    } else if marks.sukun {
        Vowel::None
    } else if marks.shadda || verse_final {
        // A doubled or verse-final consonant always carries a vowel
        Vowel::A
    } else {
        Vowel::None
    };

    out.push(Phoneme {
        consonant: letter.ch,
        vowel,
        geminated: marks.shadda,
    });
}

/// Undiacritized path: every consonant gets a default short vowel, alef,
/// waw and yaa after a consonant lengthen it, and word-final consonants are
/// quiescent except at the end of the verse.
pub fn extract_undiacritized(text: &str, options: &EncodeOptions) -> Vec<Phoneme> {
    let words = split_words(text);
    let mut out: Vec<Phoneme> = Vec::new();
    let word_count = words.len();

    for (w, letters) in words.iter().enumerate() {
        let word_start = out.len();
        let last_word = w + 1 == word_count;
        let has_article = letters.len() > 2 && letters[0].ch == ALEF && letters[1].ch == LAM;
        let mut geminate_next = false;

        for (i, letter) in letters.iter().enumerate() {
            let ch = letter.ch;
            let word_final = i + 1 == letters.len();
            let in_word = out.len() > word_start;

            if has_article && i == 0 {
                if !options.elide_hamza_wasl || out.is_empty() {
                    out.push(Phoneme::new(ALEF, Vowel::A));
                }
                continue;
            }
            if has_article && i == 1 {
                if SUN_LETTERS.contains(&letters[2].ch) {
                    geminate_next = true;
                } else {
                    out.push(Phoneme::new(LAM, Vowel::None));
                }
                continue;
            }

            if in_word && matches!(ch, ALEF | ALEF_MAQSURA | WAW | YAA) {
                if let Some(prev) = out.last_mut() {
                    if prev.vowel.is_short() {
                        prev.vowel = match ch {
                            WAW => Vowel::Uu,
                            YAA => Vowel::Ii,
                            _ => Vowel::Aa,
                        };
                        continue;
                    }
                }
                if ch == ALEF {
                    continue;
                }
            }

            let vowel = if word_final && !(last_word && letters.len() > 1) {
                if letters.len() == 1 {
                    // One-letter particles such as the conjunction waw
                    Vowel::A
                } else {
                    Vowel::None
                }
            } else {
                Vowel::A
            };
            out.push(Phoneme {
                consonant: ch,
                vowel,
                geminated: geminate_next || letter.marks.shadda,
            });
            geminate_next = false;
        }
    }

    if options.saturate_final {
        saturate_final(&mut out);
    }
    out
}

/// Lengthen a verse-final short vowel.
fn saturate_final(phonemes: &mut [Phoneme]) {
    if let Some(last) = phonemes.last_mut() {
        last.vowel = last.vowel.lengthened();
    }
}
