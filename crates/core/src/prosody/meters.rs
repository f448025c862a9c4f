//! Static table of the sixteen meters, one hemistich each.
//!
//! Each entry lists the base feet, the zihafat allowed at each position,
//! the endings allowed on the final foot and, for meters used in a
//! truncated (majzu') form, the endings allowed once the last foot is cut.

use serde::Serialize;

use crate::prosody::tafila::BaseFoot;
use crate::prosody::variations::{Illa, Variation, Zihaf};
use crate::types::MeterId;

use BaseFoot::*;

/// One meter definition.
#[derive(Debug, Clone, Serialize)]
pub struct MeterDef {
    pub id: MeterId,
    pub name: &'static str,
    pub translit: &'static str,
    /// 1 is the most common meter in the classical corpus
    pub rank: u8,
    pub feet: &'static [BaseFoot],
    /// Allowed zihafat, one list per foot position
    pub zihafat: &'static [&'static [Zihaf]],
    /// Endings allowed on the final foot
    pub ilal: &'static [Illa],
    /// Endings allowed on the final foot of the majzu' form, if the meter has one
    pub majzu: Option<&'static [Illa]>,
}

const KHABN_TAYY: &[Zihaf] = &[Zihaf::Khabn, Zihaf::Tayy, Zihaf::Khabl];
const KAMIL_Z: &[Zihaf] = &[Zihaf::Idmar, Zihaf::Waqs, Zihaf::Khazl];
const WAFIR_Z: &[Zihaf] = &[Zihaf::Asb, Zihaf::Aql, Zihaf::Naqs];
const RAMAL_Z: &[Zihaf] = &[Zihaf::Khabn, Zihaf::Kaff, Zihaf::Shakl];

pub static METERS: &[MeterDef] = &[
    MeterDef {
        id: MeterId::Tawil,
        name: "الطويل",
        translit: "al-Tawil",
        rank: 1,
        feet: &[Fauulun, Mafaaiilun, Fauulun, Mafaaiilun],
        zihafat: &[&[Zihaf::Qabd], &[Zihaf::Qabd, Zihaf::Kaff], &[Zihaf::Qabd], &[Zihaf::Qabd]],
        ilal: &[Illa::Hadhf],
        majzu: None,
    },
    MeterDef {
        id: MeterId::Kamil,
        name: "الكامل",
        translit: "al-Kamil",
        rank: 2,
        feet: &[Mutafaailun, Mutafaailun, Mutafaailun],
        zihafat: &[KAMIL_Z, KAMIL_Z, KAMIL_Z],
        ilal: &[Illa::Qat, Illa::Hadhadh],
        majzu: Some(&[Illa::Tadhyil, Illa::Tarfil, Illa::Qat]),
    },
    MeterDef {
        id: MeterId::Basit,
        name: "البسيط",
        translit: "al-Basit",
        rank: 3,
        feet: &[Mustafilun, Faailun, Mustafilun, Faailun],
        zihafat: &[KHABN_TAYY, &[Zihaf::Khabn], KHABN_TAYY, &[Zihaf::Khabn]],
        ilal: &[Illa::Qat],
        majzu: Some(&[Illa::Qat, Illa::Tadhyil]),
    },
    MeterDef {
        id: MeterId::Wafir,
        name: "الوافر",
        translit: "al-Wafir",
        rank: 4,
        feet: &[Mufaalatun, Mufaalatun, Fauulun],
        zihafat: &[WAFIR_Z, WAFIR_Z, &[]],
        ilal: &[],
        majzu: Some(&[]),
    },
    MeterDef {
        id: MeterId::Khafif,
        name: "الخفيف",
        translit: "al-Khafif",
        rank: 5,
        feet: &[Faailaatun, Mustafilun, Faailaatun],
        zihafat: &[RAMAL_Z, &[Zihaf::Khabn], &[Zihaf::Khabn]],
        ilal: &[Illa::Hadhf, Illa::Tashith],
        majzu: Some(&[]),
    },
    MeterDef {
        id: MeterId::Ramal,
        name: "الرمل",
        translit: "al-Ramal",
        rank: 6,
        feet: &[Faailaatun, Faailaatun, Faailaatun],
        zihafat: &[RAMAL_Z, RAMAL_Z, &[Zihaf::Khabn]],
        ilal: &[Illa::Hadhf, Illa::Qasr],
        majzu: Some(&[Illa::Hadhf, Illa::Tasbigh]),
    },
    MeterDef {
        id: MeterId::Rajaz,
        name: "الرجز",
        translit: "al-Rajaz",
        rank: 7,
        feet: &[Mustafilun, Mustafilun, Mustafilun],
        zihafat: &[KHABN_TAYY, KHABN_TAYY, KHABN_TAYY],
        ilal: &[Illa::Qat],
        majzu: Some(&[Illa::Qat]),
    },
    MeterDef {
        id: MeterId::Mutaqarib,
        name: "المتقارب",
        translit: "al-Mutaqarib",
        rank: 8,
        feet: &[Fauulun, Fauulun, Fauulun, Fauulun],
        zihafat: &[&[Zihaf::Qabd], &[Zihaf::Qabd], &[Zihaf::Qabd], &[Zihaf::Qabd]],
        ilal: &[Illa::Hadhf, Illa::Qasr, Illa::Batr],
        majzu: Some(&[Illa::Hadhf]),
    },
    MeterDef {
        id: MeterId::Sari,
        name: "السريع",
        translit: "al-Sari'",
        rank: 9,
        feet: &[Mustafilun, Mustafilun, Faailun],
        zihafat: &[KHABN_TAYY, KHABN_TAYY, &[Zihaf::Khabn]],
        ilal: &[Illa::Qat],
        majzu: None,
    },
    MeterDef {
        id: MeterId::Munsarih,
        name: "المنسرح",
        translit: "al-Munsarih",
        rank: 10,
        feet: &[Mustafilun, Mafuulaatu, Mustafilun],
        zihafat: &[
            &[Zihaf::Khabn, Zihaf::Tayy],
            &[Zihaf::Khabn, Zihaf::Tayy],
            &[Zihaf::Khabn, Zihaf::Tayy],
        ],
        ilal: &[Illa::Qat],
        majzu: None,
    },
    MeterDef {
        id: MeterId::Madid,
        name: "المديد",
        translit: "al-Madid",
        rank: 11,
        feet: &[Faailaatun, Faailun, Faailaatun],
        zihafat: &[&[Zihaf::Khabn], &[Zihaf::Khabn], &[Zihaf::Khabn]],
        ilal: &[Illa::Hadhf, Illa::Qasr, Illa::Batr],
        majzu: None,
    },
    MeterDef {
        id: MeterId::Hazaj,
        name: "الهزج",
        translit: "al-Hazaj",
        rank: 12,
        feet: &[Mafaaiilun, Mafaaiilun],
        zihafat: &[&[Zihaf::Qabd, Zihaf::Kaff], &[Zihaf::Kaff]],
        ilal: &[Illa::Hadhf],
        majzu: None,
    },
    MeterDef {
        id: MeterId::Mujtathth,
        name: "المجتث",
        translit: "al-Mujtathth",
        rank: 13,
        feet: &[Mustafilun, Faailaatun],
        zihafat: &[&[Zihaf::Khabn], &[Zihaf::Khabn]],
        ilal: &[Illa::Tashith],
        majzu: None,
    },
    MeterDef {
        id: MeterId::Mutadarik,
        name: "المتدارك",
        translit: "al-Mutadarik",
        rank: 14,
        feet: &[Faailun, Faailun, Faailun, Faailun],
        zihafat: &[&[Zihaf::Khabn], &[Zihaf::Khabn], &[Zihaf::Khabn], &[Zihaf::Khabn]],
        ilal: &[Illa::Qat, Illa::Tadhyil],
        majzu: Some(&[]),
    },
    MeterDef {
        id: MeterId::Mudari,
        name: "المضارع",
        translit: "al-Mudari'",
        rank: 15,
        feet: &[Mafaaiilun, Faailaatun],
        zihafat: &[&[Zihaf::Qabd, Zihaf::Kaff], &[]],
        ilal: &[],
        majzu: None,
    },
    MeterDef {
        id: MeterId::Muqtadab,
        name: "المقتضب",
        translit: "al-Muqtadab",
        rank: 16,
        feet: &[Mafuulaatu, Mustafilun],
        zihafat: &[&[Zihaf::Khabn, Zihaf::Tayy], &[Zihaf::Tayy]],
        ilal: &[],
        majzu: None,
    },
];

/// Look up a meter definition.
pub fn meter(id: MeterId) -> &'static MeterDef {
    &METERS[id as usize]
}

/// One way a foot position can be realized.
#[derive(Debug, Clone, PartialEq)]
pub struct FootVariant {
    pub foot: BaseFoot,
    pub pattern: String,
    pub variations: Vec<Variation>,
}

impl FootVariant {
    pub fn cost(&self) -> u8 {
        self.variations.iter().map(|v| v.cost()).sum()
    }
}

/// The feet of one form of a meter: full, or majzu' with the last foot cut.
#[derive(Debug, Clone)]
pub struct Form {
    pub positions: Vec<Vec<FootVariant>>,
    pub truncated: bool,
}

impl Form {
    /// Cost of the form itself, on top of its feet.
    pub fn extra_cost(&self) -> u8 {
        u8::from(self.truncated)
    }
}

fn push_variant(out: &mut Vec<FootVariant>, candidate: FootVariant) {
    match out.iter_mut().find(|v| v.pattern == candidate.pattern) {
        Some(existing) if existing.cost() > candidate.cost() => *existing = candidate,
        Some(_) => {}
        None => out.push(candidate),
    }
}

/// All realizations of one foot position.
///
/// Zihafat apply to the base foot. On the final position each ending
/// applies to the base foot and to every zihaf form.
pub fn position_variants(
    foot: BaseFoot,
    zihafat: &[Zihaf],
    endings: &[Illa],
    is_final: bool,
) -> Vec<FootVariant> {
    let base = foot.pattern();
    let mut out = vec![FootVariant {
        foot,
        pattern: base.to_string(),
        variations: Vec::new(),
    }];

    for &z in zihafat {
        if let Some(pattern) = z.apply(base) {
            push_variant(
                &mut out,
                FootVariant {
                    foot,
                    pattern,
                    variations: vec![Variation::Zihaf(z)],
                },
            );
        }
    }

    if is_final {
        let inner = out.clone();
        for v in &inner {
            for &illa in endings {
                if let Some(pattern) = illa.apply(&v.pattern) {
                    let mut variations = v.variations.clone();
                    variations.push(Variation::Illa(illa));
                    push_variant(
                        &mut out,
                        FootVariant {
                            foot,
                            pattern,
                            variations,
                        },
                    );
                }
            }
        }
    }
    out
}

impl MeterDef {
    /// Concatenated base feet.
    pub fn base_pattern(&self) -> String {
        self.feet.iter().map(|f| f.pattern()).collect()
    }

    fn form(&self, count: usize, endings: &[Illa], truncated: bool) -> Form {
        let positions = self.feet[..count]
            .iter()
            .zip(self.zihafat)
            .enumerate()
            .map(|(i, (&foot, zihafat))| position_variants(foot, zihafat, endings, i + 1 == count))
            .collect();
        Form {
            positions,
            truncated,
        }
    }

    /// The full form, followed by the majzu' form if the meter has one.
    pub fn forms(&self) -> Vec<Form> {
        let mut forms = vec![self.form(self.feet.len(), self.ilal, false)];
        if let Some(endings) = self.majzu {
            if self.feet.len() > 1 {
                forms.push(self.form(self.feet.len() - 1, endings, true));
            }
        }
        forms
    }
}
