use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProsodyError;

/// One unit of a rhythm string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Mutaharrik: a consonant carrying a short vowel
    Moving,
    /// Sakin: a consonant with no vowel, or the second mora of a long vowel
    Still,
}

impl Symbol {
    pub const MOVING: char = '/';
    pub const STILL: char = 'o';

    pub fn as_char(self) -> char {
        match self {
            Symbol::Moving => Self::MOVING,
            Symbol::Still => Self::STILL,
        }
    }

    pub fn from_char(c: char) -> Option<Symbol> {
        match c {
            Self::MOVING => Some(Symbol::Moving),
            Self::STILL => Some(Symbol::Still),
            _ => None,
        }
    }
}

/// A verse or template rhythm in letter-based notation ('/' moving, 'o' still).
///
/// Always holds a valid symbol string; construct with [`RhythmPattern::from_symbols`]
/// or by parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RhythmPattern(String);

impl RhythmPattern {
    pub fn from_symbols<I: IntoIterator<Item = Symbol>>(symbols: I) -> Self {
        RhythmPattern(symbols.into_iter().map(Symbol::as_char).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.0.chars().filter_map(Symbol::from_char)
    }

    pub fn moving_count(&self) -> usize {
        self.0.chars().filter(|&c| c == Symbol::MOVING).count()
    }

    pub fn still_count(&self) -> usize {
        self.len() - self.moving_count()
    }

    /// Join two patterns end to end.
    pub fn concat(&self, other: &RhythmPattern) -> RhythmPattern {
        RhythmPattern(format!("{}{}", self.0, other.0))
    }

    /// Build from a string already known to contain only pattern symbols.
    pub(crate) fn from_trusted(s: String) -> Self {
        debug_assert!(s.chars().all(|c| Symbol::from_char(c).is_some()));
        RhythmPattern(s)
    }
}

impl FromStr for RhythmPattern {
    type Err = ProsodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((position, symbol)) = s
            .chars()
            .enumerate()
            .find(|(_, c)| Symbol::from_char(*c).is_none())
        {
            return Err(ProsodyError::InvalidSymbol { symbol, position });
        }
        Ok(RhythmPattern(s.to_string()))
    }
}

impl TryFrom<String> for RhythmPattern {
    type Error = ProsodyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RhythmPattern> for String {
    fn from(p: RhythmPattern) -> String {
        p.0
    }
}

impl fmt::Display for RhythmPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Vowel carried by a phoneme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vowel {
    /// Quiescent (sukun)
    None,
    A,
    I,
    U,
    Aa,
    Ii,
    Uu,
}

impl Vowel {
    pub fn is_short(self) -> bool {
        matches!(self, Vowel::A | Vowel::I | Vowel::U)
    }

    pub fn is_long(self) -> bool {
        matches!(self, Vowel::Aa | Vowel::Ii | Vowel::Uu)
    }

    /// Long counterpart of a short vowel; other vowels are returned unchanged.
    pub fn lengthened(self) -> Vowel {
        match self {
            Vowel::A => Vowel::Aa,
            Vowel::I => Vowel::Ii,
            Vowel::U => Vowel::Uu,
            v => v,
        }
    }
}

/// A consonant with its vowel marking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phoneme {
    pub consonant: char,
    pub vowel: Vowel,
    #[serde(default)]
    pub geminated: bool,
}

impl Phoneme {
    pub fn new(consonant: char, vowel: Vowel) -> Self {
        Phoneme {
            consonant,
            vowel,
            geminated: false,
        }
    }

    pub fn geminated(consonant: char, vowel: Vowel) -> Self {
        Phoneme {
            consonant,
            vowel,
            geminated: true,
        }
    }
}

/// The sixteen classical meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterId {
    Tawil,
    Kamil,
    Basit,
    Wafir,
    Khafif,
    Ramal,
    Rajaz,
    Mutaqarib,
    Sari,
    Munsarih,
    Madid,
    Hazaj,
    Mujtathth,
    Mutadarik,
    Mudari,
    Muqtadab,
}

impl MeterId {
    pub const ALL: [MeterId; 16] = [
        MeterId::Tawil,
        MeterId::Kamil,
        MeterId::Basit,
        MeterId::Wafir,
        MeterId::Khafif,
        MeterId::Ramal,
        MeterId::Rajaz,
        MeterId::Mutaqarib,
        MeterId::Sari,
        MeterId::Munsarih,
        MeterId::Madid,
        MeterId::Hazaj,
        MeterId::Mujtathth,
        MeterId::Mutadarik,
        MeterId::Mudari,
        MeterId::Muqtadab,
    ];

    /// Stable lowercase key used in config files and CLI output.
    pub fn key(self) -> &'static str {
        match self {
            MeterId::Tawil => "tawil",
            MeterId::Kamil => "kamil",
            MeterId::Basit => "basit",
            MeterId::Wafir => "wafir",
            MeterId::Khafif => "khafif",
            MeterId::Ramal => "ramal",
            MeterId::Rajaz => "rajaz",
            MeterId::Mutaqarib => "mutaqarib",
            MeterId::Sari => "sari",
            MeterId::Munsarih => "munsarih",
            MeterId::Madid => "madid",
            MeterId::Hazaj => "hazaj",
            MeterId::Mujtathth => "mujtathth",
            MeterId::Mutadarik => "mutadarik",
            MeterId::Mudari => "mudari",
            MeterId::Muqtadab => "muqtadab",
        }
    }
}

impl FromStr for MeterId {
    type Err = ProsodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        MeterId::ALL
            .iter()
            .copied()
            .find(|m| m.key() == wanted)
            .ok_or_else(|| ProsodyError::UnknownMeter(s.to_string()))
    }
}

impl fmt::Display for MeterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One ranked meter candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub meter: MeterId,
    /// Similarity of the best template, in [0, 1]
    pub confidence: f64,
    /// The template that produced `confidence`
    pub matched_pattern: RhythmPattern,
    pub is_exact_match: bool,
    /// Variations needed to derive `matched_pattern` from the base feet
    pub variations: u8,
}

/// Why a detection was classified as uncertain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UncertaintyReason {
    LowConfidence,
    CloseCandidates,
}

/// Whether one candidate or several should be surfaced.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Uncertainty {
    pub is_uncertain: bool,
    pub reason: Option<UncertaintyReason>,
    /// Confidence gap between the top two candidates
    pub top_gap: Option<f64>,
    /// Meters that should be presented together (the top one plus any in a close race)
    pub contenders: Vec<MeterId>,
}
