//! Permissible metrical variations as transforms on a foot's rhythm.
//!
//! Zihafat touch the second letter of a sabab and may apply in any foot.
//! Ilal change the end of the final foot of a hemistich. Every transform
//! returns `None` when the foot lacks the letter or ending it acts on.
//! Letter positions are 1-based, counted on the unaltered foot.

use serde::{Deserialize, Serialize};

const MOVING: u8 = b'/';
const STILL: u8 = b'o';

#[derive(Debug, Clone, Copy)]
enum Op {
    /// Delete the letter at this position, which must be still
    DropStill(usize),
    /// Delete the letter at this position, which must be moving
    DropMoving(usize),
    /// Make the moving letter at this position still
    Quiet(usize),
}

/// Zihafat, single and double.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zihaf {
    Khabn,
    Tayy,
    Qabd,
    Kaff,
    Idmar,
    Waqs,
    Asb,
    Aql,
    Khabl,
    Khazl,
    Shakl,
    Naqs,
}

impl Zihaf {
    pub fn name(self) -> &'static str {
        match self {
            Zihaf::Khabn => "خبن",
            Zihaf::Tayy => "طي",
            Zihaf::Qabd => "قبض",
            Zihaf::Kaff => "كف",
            Zihaf::Idmar => "إضمار",
            Zihaf::Waqs => "وقص",
            Zihaf::Asb => "عصب",
            Zihaf::Aql => "عقل",
            Zihaf::Khabl => "خبل",
            Zihaf::Khazl => "خزل",
            Zihaf::Shakl => "شكل",
            Zihaf::Naqs => "نقص",
        }
    }

    fn ops(self) -> &'static [Op] {
        match self {
            Zihaf::Khabn => &[Op::DropStill(2)],
            Zihaf::Tayy => &[Op::DropStill(4)],
            Zihaf::Qabd => &[Op::DropStill(5)],
            Zihaf::Kaff => &[Op::DropStill(7)],
            Zihaf::Idmar => &[Op::Quiet(2)],
            Zihaf::Waqs => &[Op::DropMoving(2)],
            Zihaf::Asb => &[Op::Quiet(5)],
            Zihaf::Aql => &[Op::DropMoving(5)],
            Zihaf::Khabl => &[Op::DropStill(2), Op::DropStill(4)],
            Zihaf::Khazl => &[Op::Quiet(2), Op::DropStill(4)],
            Zihaf::Shakl => &[Op::DropStill(2), Op::DropStill(7)],
            Zihaf::Naqs => &[Op::Quiet(5), Op::DropStill(7)],
        }
    }

    /// Number of elementary changes; doubles count two.
    pub fn cost(self) -> u8 {
        self.ops().len() as u8
    }

    pub fn apply(self, foot: &str) -> Option<String> {
        let mut letters = foot.as_bytes().to_vec();
        let at = |pos: usize| letters.get(pos.wrapping_sub(1)).copied();

        for op in self.ops() {
            let ok = match *op {
                Op::DropStill(p) => at(p) == Some(STILL),
                Op::DropMoving(p) | Op::Quiet(p) => at(p) == Some(MOVING),
            };
            if !ok {
                return None;
            }
        }

        let mut drops: Vec<usize> = Vec::new();
        for op in self.ops() {
            match *op {
                Op::Quiet(p) => letters[p - 1] = STILL,
                Op::DropStill(p) | Op::DropMoving(p) => drops.push(p - 1),
            }
        }
        drops.sort_unstable_by(|a, b| b.cmp(a));
        for idx in drops {
            letters.remove(idx);
        }
        String::from_utf8(letters).ok()
    }
}

/// Ilal, plus the additions allowed on the last foot of a majzu' form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Illa {
    /// Drop the final light sabab
    Hadhf,
    /// Drop the still of the final sabab and quiet its moving letter
    Qasr,
    /// Drop the still of the final watad and quiet the letter before it
    Qat,
    /// Drop the final watad
    Hadhadh,
    /// Drop a final moving letter
    Kashf,
    /// Asb followed by hadhf
    Qatf,
    /// Hadhf followed by qat'
    Batr,
    /// Drop the first moving letter of the watad
    Tashith,
    /// Add a still after a final watad
    Tadhyil,
    /// Add a still after a final light sabab
    Tasbigh,
    /// Add a light sabab after a final watad
    Tarfil,
}

impl Illa {
    pub fn name(self) -> &'static str {
        match self {
            Illa::Hadhf => "حذف",
            Illa::Qasr => "قصر",
            Illa::Qat => "قطع",
            Illa::Hadhadh => "حذذ",
            Illa::Kashf => "كشف",
            Illa::Qatf => "قطف",
            Illa::Batr => "بتر",
            Illa::Tashith => "تشعيث",
            Illa::Tadhyil => "تذييل",
            Illa::Tasbigh => "تسبيغ",
            Illa::Tarfil => "ترفيل",
        }
    }

    pub fn cost(self) -> u8 {
        match self {
            Illa::Qatf | Illa::Batr => 2,
            _ => 1,
        }
    }

    pub fn apply(self, foot: &str) -> Option<String> {
        let ends_watad = foot.ends_with("//o");
        let ends_sabab = foot.len() > 2 && foot.ends_with("/o") && !ends_watad;
        match self {
            Illa::Hadhf if ends_sabab => Some(foot[..foot.len() - 2].to_string()),
            Illa::Qasr if ends_sabab => Some(format!("{}o", &foot[..foot.len() - 2])),
            Illa::Qat if ends_watad => Some(format!("{}/o", &foot[..foot.len() - 3])),
            Illa::Hadhadh if ends_watad && foot.len() > 3 => {
                Some(foot[..foot.len() - 3].to_string())
            }
            Illa::Kashf if foot.len() > 1 && foot.ends_with('/') => {
                Some(foot[..foot.len() - 1].to_string())
            }
            Illa::Qatf => Zihaf::Asb.apply(foot).and_then(|f| Illa::Hadhf.apply(&f)),
            Illa::Batr => Illa::Hadhf.apply(foot).and_then(|f| Illa::Qat.apply(&f)),
            Illa::Tashith if foot.starts_with("/o//") => {
                Some(format!("{}{}", &foot[..2], &foot[3..]))
            }
            Illa::Tadhyil if ends_watad => Some(format!("{foot}o")),
            Illa::Tasbigh if ends_sabab => Some(format!("{foot}o")),
            Illa::Tarfil if ends_watad => Some(format!("{foot}/o")),
            _ => None,
        }
    }
}

/// A named change applied to one foot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum Variation {
    Zihaf(Zihaf),
    Illa(Illa),
}

impl Variation {
    pub fn name(self) -> &'static str {
        match self {
            Variation::Zihaf(z) => z.name(),
            Variation::Illa(i) => i.name(),
        }
    }

    pub fn cost(self) -> u8 {
        match self {
            Variation::Zihaf(z) => z.cost(),
            Variation::Illa(i) => i.cost(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_khabn() {
        assert_eq!(Zihaf::Khabn.apply("/o/o//o").as_deref(), Some("//o//o"));
        assert_eq!(Zihaf::Khabn.apply("/o//o").as_deref(), Some("///o"));
        assert_eq!(Zihaf::Khabn.apply("/o//o/o").as_deref(), Some("///o/o"));
        // Second letter is moving: nothing to drop
        assert_eq!(Zihaf::Khabn.apply("//o/o"), None);
    }

    #[test]
    fn test_tayy_qabd_kaff() {
        assert_eq!(Zihaf::Tayy.apply("/o/o//o").as_deref(), Some("/o///o"));
        assert_eq!(Zihaf::Tayy.apply("/o/o/o/").as_deref(), Some("/o//o/"));
        assert_eq!(Zihaf::Qabd.apply("//o/o").as_deref(), Some("//o/"));
        assert_eq!(Zihaf::Qabd.apply("//o/o/o").as_deref(), Some("//o//o"));
        assert_eq!(Zihaf::Kaff.apply("//o/o/o").as_deref(), Some("//o/o/"));
        assert_eq!(Zihaf::Kaff.apply("//o/o"), None);
    }

    #[test]
    fn test_moving_letter_zihafat() {
        assert_eq!(Zihaf::Idmar.apply("///o//o").as_deref(), Some("/o/o//o"));
        assert_eq!(Zihaf::Waqs.apply("///o//o").as_deref(), Some("//o//o"));
        assert_eq!(Zihaf::Asb.apply("//o///o").as_deref(), Some("//o/o/o"));
        assert_eq!(Zihaf::Aql.apply("//o///o").as_deref(), Some("//o//o"));
        assert_eq!(Zihaf::Idmar.apply("/o/o//o"), None);
    }

    #[test]
    fn test_double_zihafat() {
        assert_eq!(Zihaf::Khabl.apply("/o/o//o").as_deref(), Some("////o"));
        assert_eq!(Zihaf::Khazl.apply("///o//o").as_deref(), Some("/o///o"));
        assert_eq!(Zihaf::Shakl.apply("/o//o/o").as_deref(), Some("///o/"));
        assert_eq!(Zihaf::Naqs.apply("//o///o").as_deref(), Some("//o/o/"));
        assert_eq!(Zihaf::Khabl.cost(), 2);
        assert_eq!(Zihaf::Khabn.cost(), 1);
    }

    #[test]
    fn test_ilal_on_sabab_endings() {
        assert_eq!(Illa::Hadhf.apply("//o/o").as_deref(), Some("//o"));
        assert_eq!(Illa::Hadhf.apply("/o//o/o").as_deref(), Some("/o//o"));
        assert_eq!(Illa::Qasr.apply("/o//o/o").as_deref(), Some("/o//oo"));
        assert_eq!(Illa::Qasr.apply("//o/o").as_deref(), Some("//oo"));
        assert_eq!(Illa::Batr.apply("//o/o").as_deref(), Some("/o"));
        assert_eq!(Illa::Tasbigh.apply("/o//o/o").as_deref(), Some("/o//o/oo"));
    }

    #[test]
    fn test_ilal_on_watad_endings() {
        assert_eq!(Illa::Qat.apply("/o//o").as_deref(), Some("/o/o"));
        assert_eq!(Illa::Qat.apply("///o//o").as_deref(), Some("///o/o"));
        assert_eq!(Illa::Hadhadh.apply("///o//o").as_deref(), Some("///o"));
        assert_eq!(Illa::Tadhyil.apply("/o/o//o").as_deref(), Some("/o/o//oo"));
        assert_eq!(Illa::Tarfil.apply("///o//o").as_deref(), Some("///o//o/o"));
        assert_eq!(Illa::Qat.apply("//o/o"), None);
        // A watad ending is not a sabab
        assert_eq!(Illa::Hadhf.apply("//o//o"), None);
    }

    #[test]
    fn test_other_ilal() {
        assert_eq!(Illa::Kashf.apply("/o/o/o/").as_deref(), Some("/o/o/o"));
        assert_eq!(Illa::Qatf.apply("//o///o").as_deref(), Some("//o/o"));
        assert_eq!(Illa::Tashith.apply("/o//o/o").as_deref(), Some("/o/o/o"));
        assert_eq!(Illa::Kashf.apply("/o//o"), None);
    }

    #[test]
    fn test_variation_serde() {
        let v = Variation::Zihaf(Zihaf::Khabn);
        let json = serde_json::to_value(v).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "zihaf", "name": "khabn"}));
        assert_eq!(v.name(), "خبن");
        assert_eq!(Variation::Illa(Illa::Batr).cost(), 2);
    }
}
