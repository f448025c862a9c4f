//! Metrical feet and scansion.
//!
//! [`segment`] breaks any rhythm into feet greedily, longest match first.
//! [`scan_with_meter`] instead explains a pattern as one derivation of a
//! known meter, naming the variation applied at each position.

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::Serialize;

use crate::prosody::meters::MeterDef;
use crate::prosody::variations::Variation;
use crate::types::RhythmPattern;

/// The eight base feet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseFoot {
    Fauulun,
    Mafaaiilun,
    Faailun,
    Mutafaailun,
    Mustafilun,
    Mafuulaatu,
    Faailaatun,
    Mufaalatun,
}

impl BaseFoot {
    pub const ALL: [BaseFoot; 8] = [
        BaseFoot::Fauulun,
        BaseFoot::Mafaaiilun,
        BaseFoot::Faailun,
        BaseFoot::Mutafaailun,
        BaseFoot::Mustafilun,
        BaseFoot::Mafuulaatu,
        BaseFoot::Faailaatun,
        BaseFoot::Mufaalatun,
    ];

    pub fn tafila(self) -> &'static Tafila {
        &FOOT_TABLE[self as usize]
    }

    pub fn pattern(self) -> &'static str {
        self.tafila().pattern
    }

    pub fn name(self) -> &'static str {
        self.tafila().name
    }
}

/// A named foot and its rhythm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tafila {
    pub name: &'static str,
    pub translit: &'static str,
    pub pattern: &'static str,
}

const fn foot(name: &'static str, translit: &'static str, pattern: &'static str) -> Tafila {
    Tafila {
        name,
        translit,
        pattern,
    }
}

/// Reference foot table. The first eight entries are the base feet in
/// [`BaseFoot`] order; the rest are common derived forms. Order decides
/// ties between equal-length matches.
pub const FOOT_TABLE: &[Tafila] = &[
    foot("فعولن", "fa'uulun", "//o/o"),
    foot("مفاعيلن", "mafaa'iilun", "//o/o/o"),
    foot("فاعلن", "faa'ilun", "/o//o"),
    foot("متفاعلن", "mutafaa'ilun", "///o//o"),
    foot("مستفعلن", "mustaf'ilun", "/o/o//o"),
    foot("مفعولات", "maf'uulaatu", "/o/o/o/"),
    foot("فاعلاتن", "faa'ilaatun", "/o//o/o"),
    foot("مفاعلتن", "mufaa'alatun", "//o///o"),
    foot("مفاعلن", "mafaa'ilun", "//o//o"),
    foot("مفتعلن", "mufta'ilun", "/o///o"),
    foot("فعلاتن", "fa'ilaatun", "///o/o"),
    foot("مفعولن", "maf'uulun", "/o/o/o"),
    foot("مستفعلان", "mustaf'ilaan", "/o/o//oo"),
    foot("متفاعلان", "mutafaa'ilaan", "///o//oo"),
    foot("فاعلاتان", "faa'ilaataan", "/o//o/oo"),
    foot("فاعلان", "faa'ilaan", "/o//oo"),
    foot("فعلتن", "fa'ilatun", "////o"),
    foot("فعولُ", "fa'uulu", "//o/"),
    foot("فعولْ", "fa'uul", "//oo"),
    foot("فعِلن", "fa'ilun", "///o"),
    foot("فعْلن", "fa'lun", "/o/o"),
    foot("فعو", "fa'uu", "//o"),
];

lazy_static! {
    /// Pattern to first table index; later duplicates never win.
    static ref FOOT_INDEX: HashMap<&'static str, usize> = {
        let mut m = HashMap::new();
        for (i, t) in FOOT_TABLE.iter().enumerate() {
            m.entry(t.pattern).or_insert(i);
        }
        m
    };

    static ref MAX_FOOT_LEN: usize = FOOT_TABLE.iter().map(|t| t.pattern.len()).max().unwrap_or(0);
}

/// Look up a foot by its exact rhythm.
pub fn foot_for_pattern(pattern: &str) -> Option<&'static Tafila> {
    FOOT_INDEX.get(pattern).map(|&i| &FOOT_TABLE[i])
}

/// One foot found by the greedy segmenter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FootSpan {
    pub name: &'static str,
    pub translit: &'static str,
    pub pattern: &'static str,
    /// Offset of the first symbol in the input pattern
    pub start: usize,
}

/// Greedy scansion of a pattern.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Segmentation {
    pub feet: Vec<FootSpan>,
    /// Offsets of symbols that no foot covered
    pub residue: Vec<usize>,
}

impl Segmentation {
    pub fn names(&self) -> Vec<&'static str> {
        self.feet.iter().map(|f| f.name).collect()
    }

    /// True when every symbol belongs to some foot.
    pub fn is_complete(&self) -> bool {
        self.residue.is_empty()
    }
}

/// Segment a pattern into feet, longest prefix first.
///
/// A position where no foot matches is recorded as residue and skipped.
pub fn segment(pattern: &RhythmPattern) -> Segmentation {
    let s = pattern.as_str();
    let mut result = Segmentation::default();
    let mut pos = 0;

    while pos < s.len() {
        let longest = (*MAX_FOOT_LEN).min(s.len() - pos);
        let hit = (1..=longest)
            .rev()
            .find_map(|len| foot_for_pattern(&s[pos..pos + len]).map(|t| (t, len)));
        match hit {
            Some((t, len)) => {
                result.feet.push(FootSpan {
                    name: t.name,
                    translit: t.translit,
                    pattern: t.pattern,
                    start: pos,
                });
                pos += len;
            }
            None => {
                result.residue.push(pos);
                pos += 1;
            }
        }
    }

    if !result.residue.is_empty() {
        log::debug!(
            "Segmentation left {} unmatched symbols in {}",
            result.residue.len(),
            s
        );
    }
    result
}

/// One position of a meter-guided scansion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScannedFoot {
    pub base: &'static str,
    /// Realized foot name from the table, or the base name if it has none
    pub name: &'static str,
    pub pattern: String,
    pub variations: Vec<Variation>,
}

/// Explain `pattern` as a derivation of `meter`, using the fewest variations.
///
/// Returns `None` when no form of the meter produces the pattern exactly.
pub fn scan_with_meter(pattern: &RhythmPattern, meter: &MeterDef) -> Option<Vec<ScannedFoot>> {
    let mut best: Option<(u8, Vec<ScannedFoot>)> = None;

    for form in meter.forms() {
        let mut chosen = Vec::with_capacity(form.positions.len());
        search(pattern.as_str(), &form.positions, 0, form.extra_cost(), &mut chosen, &mut best);
    }
    best.map(|(_, feet)| feet)
}

fn search(
    rest: &str,
    positions: &[Vec<crate::prosody::meters::FootVariant>],
    cost: u8,
    extra: u8,
    chosen: &mut Vec<ScannedFoot>,
    best: &mut Option<(u8, Vec<ScannedFoot>)>,
) {
    let Some((first, tail)) = positions.split_first() else {
        if rest.is_empty() {
            let total = cost + extra;
            if best.as_ref().map_or(true, |(c, _)| total < *c) {
                *best = Some((total, chosen.clone()));
            }
        }
        return;
    };

    for variant in first {
        let Some(remaining) = rest.strip_prefix(variant.pattern.as_str()) else {
            continue;
        };
        let realized = foot_for_pattern(&variant.pattern)
            .map(|t| t.name)
            .unwrap_or_else(|| variant.foot.name());
        chosen.push(ScannedFoot {
            base: variant.foot.name(),
            name: realized,
            pattern: variant.pattern.clone(),
            variations: variant.variations.clone(),
        });
        search(remaining, tail, cost + variant.cost(), extra, chosen, best);
        chosen.pop();
    }
}
