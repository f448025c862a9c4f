//! The meter pattern library.
//!
//! Built once from the meter table: every form of every meter is expanded
//! into the full set of rhythms its variations allow, each tagged with the
//! fewest variations that produce it. Empirically mined patterns can be
//! merged on top. A built library is never edited; hot reload replaces the
//! whole snapshot through [`SharedLibrary`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ProsodyError, Result};
use crate::prosody::meters::{meter, Form, MeterDef, METERS};
use crate::types::{MeterId, RhythmPattern};

/// Variation count given to mined patterns, so that any derivation wins a tie.
pub const EMPIRICAL_VARIATIONS: u8 = u8::MAX;

/// How a library pattern was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub variations: u8,
    pub empirical: bool,
}

/// All patterns of one meter.
#[derive(Debug, Clone)]
pub struct MeterPatterns {
    pub id: MeterId,
    pub patterns: BTreeMap<RhythmPattern, PatternEntry>,
}

impl MeterPatterns {
    pub fn def(&self) -> &'static MeterDef {
        meter(self.id)
    }

    pub fn empirical_count(&self) -> usize {
        self.patterns.values().filter(|e| e.empirical).count()
    }
}

/// Expand one form into concatenated patterns with their variation counts.
fn expand_form(form: &Form, into: &mut BTreeMap<RhythmPattern, PatternEntry>) {
    let mut partial: Vec<(String, u8)> = vec![(String::new(), form.extra_cost())];
    for position in &form.positions {
        let mut next = Vec::with_capacity(partial.len() * position.len());
        for (prefix, cost) in &partial {
            for variant in position {
                next.push((format!("{prefix}{}", variant.pattern), cost + variant.cost()));
            }
        }
        partial = next;
    }

    for (pattern, variations) in partial {
        let key = RhythmPattern::from_trusted(pattern);
        let entry = into.entry(key).or_insert(PatternEntry {
            variations,
            empirical: false,
        });
        entry.variations = entry.variations.min(variations);
    }
}

/// Every rhythm derivable from a meter's base feet.
pub fn generate_patterns(def: &MeterDef) -> BTreeMap<RhythmPattern, PatternEntry> {
    let mut patterns = BTreeMap::new();
    for form in def.forms() {
        expand_form(&form, &mut patterns);
    }
    patterns
}

/// Empirically verified patterns keyed by meter, as read from JSON.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Supplement {
    pub patterns: BTreeMap<MeterId, Vec<RhythmPattern>>,
}

impl Supplement {
    /// Parse `{"<meter key>": ["<pattern>", ...]}`.
    ///
    /// Unknown meter keys are an error. Malformed or empty patterns are
    /// skipped with a warning.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(text)?;
        let mut patterns: BTreeMap<MeterId, Vec<RhythmPattern>> = BTreeMap::new();
        for (key, list) in raw {
            let id: MeterId = key.parse()?;
            let bucket = patterns.entry(id).or_default();
            for s in list {
                match s.trim().parse::<RhythmPattern>() {
                    Ok(p) if !p.is_empty() => bucket.push(p),
                    Ok(_) => log::warn!("Skipping empty supplementary pattern for {}", id),
                    Err(e) => {
                        log::warn!("Skipping supplementary pattern {:?} for {}: {}", s, id, e)
                    }
                }
            }
        }
        Ok(Supplement { patterns })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ProsodyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn insert(&mut self, id: MeterId, pattern: RhythmPattern) {
        let bucket = self.patterns.entry(id).or_default();
        if !bucket.contains(&pattern) {
            bucket.push(pattern);
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize back to the on-disk shape.
    pub fn to_json_value(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .patterns
            .iter()
            .map(|(id, list)| {
                let values = list.iter().map(|p| serde_json::Value::from(p.as_str())).collect();
                (id.key().to_string(), serde_json::Value::Array(values))
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

/// Immutable snapshot of every meter's pattern set.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    meters: Vec<MeterPatterns>,
    version: String,
}

impl PatternLibrary {
    /// Build from the meter table alone.
    pub fn build() -> Self {
        let meters = METERS
            .iter()
            .map(|def| MeterPatterns {
                id: def.id,
                patterns: generate_patterns(def),
            })
            .collect();
        let lib = Self::finish(meters);
        log::info!(
            "Built pattern library: {} patterns across {} meters (version {})",
            lib.len(),
            lib.meters.len(),
            lib.short_version()
        );
        lib
    }

    /// Build, then merge a supplement.
    pub fn with_supplement(supplement: &Supplement) -> Self {
        Self::build().merged(supplement)
    }

    /// Build, merging the supplementary table at `path` if one is given.
    pub fn load(patterns_file: Option<&Path>) -> Result<Self> {
        match patterns_file {
            Some(path) => {
                let supplement = Supplement::from_file(path)?;
                log::info!(
                    "Loaded {} supplementary patterns from {}",
                    supplement.len(),
                    path.display()
                );
                Ok(Self::with_supplement(&supplement))
            }
            None => Ok(Self::build()),
        }
    }

    /// A new snapshot with the supplement added. Existing patterns keep
    /// their derivation; nothing is removed.
    pub fn merged(&self, supplement: &Supplement) -> Self {
        let mut meters = self.meters.clone();
        let mut added = 0usize;
        for mp in &mut meters {
            let Some(list) = supplement.patterns.get(&mp.id) else {
                continue;
            };
            for pattern in list {
                if !mp.patterns.contains_key(pattern) {
                    mp.patterns.insert(
                        pattern.clone(),
                        PatternEntry {
                            variations: EMPIRICAL_VARIATIONS,
                            empirical: true,
                        },
                    );
                    added += 1;
                }
            }
        }
        let lib = Self::finish(meters);
        log::info!(
            "Merged {} new empirical patterns (version {})",
            added,
            lib.short_version()
        );
        lib
    }

    fn finish(meters: Vec<MeterPatterns>) -> Self {
        let version = digest(&meters);
        PatternLibrary { meters, version }
    }

    pub fn meters(&self) -> &[MeterPatterns] {
        &self.meters
    }

    pub fn patterns(&self, id: MeterId) -> &BTreeMap<RhythmPattern, PatternEntry> {
        &self.meters[id as usize].patterns
    }

    pub fn lookup(&self, id: MeterId, pattern: &RhythmPattern) -> Option<PatternEntry> {
        self.patterns(id).get(pattern).copied()
    }

    /// Total number of patterns.
    pub fn len(&self) -> usize {
        self.meters.iter().map(|m| m.patterns.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// SHA-256 of the library contents, as 64 hex characters.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn short_version(&self) -> &str {
        &self.version[..12.min(self.version.len())]
    }
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::build()
    }
}

fn digest(meters: &[MeterPatterns]) -> String {
    let mut hasher = Sha256::new();
    for mp in meters {
        hasher.update(mp.id.key().as_bytes());
        hasher.update(b"\n");
        for (pattern, entry) in &mp.patterns {
            hasher.update(pattern.as_str().as_bytes());
            hasher.update([b':', entry.variations, b'\n']);
        }
    }
    format!("{:x}", hasher.finalize())
}

/// Holder for the current library snapshot.
///
/// Readers clone the `Arc` and keep using their snapshot for as long as they
/// like; [`SharedLibrary::swap`] replaces the whole structure at once.
#[derive(Debug)]
pub struct SharedLibrary {
    current: RwLock<Arc<PatternLibrary>>,
}

impl SharedLibrary {
    pub fn new(library: PatternLibrary) -> Self {
        Self {
            current: RwLock::new(Arc::new(library)),
        }
    }

    pub fn snapshot(&self) -> Arc<PatternLibrary> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Install a new snapshot and return the previous one.
    pub fn swap(&self, library: PatternLibrary) -> Arc<PatternLibrary> {
        let next = Arc::new(library);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        log::info!(
            "Swapping pattern library {} -> {}",
            guard.short_version(),
            next.short_version()
        );
        std::mem::replace(&mut *guard, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn p(s: &str) -> RhythmPattern {
        s.parse().unwrap()
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = PatternLibrary::build();
        let b = PatternLibrary::build();
        assert_eq!(a.version(), b.version());
        assert_eq!(a.len(), b.len());
        assert_eq!(a.version().len(), 64);
    }

    #[test]
    fn test_base_pattern_has_zero_variations() {
        let lib = PatternLibrary::build();
        for def in METERS {
            let base = p(&def.base_pattern());
            let entry = lib.lookup(def.id, &base).unwrap();
            assert_eq!(entry.variations, 0, "{}", def.translit);
            assert!(!entry.empirical);
        }
    }

    #[test]
    fn test_pattern_counts() {
        let lib = PatternLibrary::build();
        assert_eq!(lib.patterns(MeterId::Mudari).len(), 3);
        assert_eq!(lib.patterns(MeterId::Hazaj).len(), 9);
        assert_eq!(lib.patterns(MeterId::Tawil).len(), 36);
        assert_eq!(lib.len(), 1166);
    }

    #[test]
    fn test_variation_counts() {
        let lib = PatternLibrary::build();
        let hazaj = lib.patterns(MeterId::Hazaj);
        assert_eq!(hazaj[&p("//o//o//o/o")].variations, 2);
        assert_eq!(hazaj[&p("//o/o/o//o/o")].variations, 1);
        // Majzu' kamil costs one for the missing foot
        let kamil = lib.patterns(MeterId::Kamil);
        assert_eq!(kamil[&p("///o//o///o//o")].variations, 1);
    }

    #[test]
    fn test_rajaz_base_is_also_kamil() {
        let lib = PatternLibrary::build();
        let rajaz = p("/o/o//o/o/o//o/o/o//o");
        assert_eq!(lib.lookup(MeterId::Kamil, &rajaz).unwrap().variations, 3);
    }

    #[test]
    fn test_merge_is_additive() {
        let lib = PatternLibrary::build();
        let base = p(&meter(MeterId::Tawil).base_pattern());
        let mut sup = Supplement::default();
        sup.insert(MeterId::Tawil, p("//o/o//o/o/o//o/o//o/o/o/"));
        sup.insert(MeterId::Tawil, base.clone());

        let merged = lib.merged(&sup);
        assert_eq!(merged.len(), lib.len() + 1);
        assert_eq!(merged.lookup(MeterId::Tawil, &base).unwrap().variations, 0);
        let mined = merged
            .lookup(MeterId::Tawil, &p("//o/o//o/o/o//o/o//o/o/o/"))
            .unwrap();
        assert!(mined.empirical);
        assert_eq!(mined.variations, EMPIRICAL_VARIATIONS);
        assert_ne!(merged.version(), lib.version());
        // The original snapshot is untouched
        assert!(lib
            .lookup(MeterId::Tawil, &p("//o/o//o/o/o//o/o//o/o/o/"))
            .is_none());
    }

    #[test]
    fn test_supplement_parsing() {
        let json = r#"{"kamil": ["///o//o///o", "bad!", ""], "rajaz": []}"#;
        let sup = Supplement::from_json_str(json).unwrap();
        assert_eq!(sup.len(), 1);
        assert_eq!(sup.patterns[&MeterId::Kamil], vec![p("///o//o///o")]);

        let err = Supplement::from_json_str(r#"{"sonnet": ["/o"]}"#).unwrap_err();
        assert!(matches!(err, ProsodyError::UnknownMeter(_)));
        assert!(matches!(
            Supplement::from_json_str("not json"),
            Err(ProsodyError::Json(_))
        ));
    }

    #[test]
    fn test_supplement_json_round_trip() {
        let mut sup = Supplement::default();
        sup.insert(MeterId::Wafir, p("//o///o"));
        let text = sup.to_json_value().to_string();
        assert_eq!(Supplement::from_json_str(&text).unwrap(), sup);
    }

    #[test]
    fn test_load_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"mutaqarib": ["//o/o//o/o//o/o//o/o/o"]}}"#).unwrap();
        let lib = PatternLibrary::load(Some(f.path())).unwrap();
        assert!(lib
            .lookup(MeterId::Mutaqarib, &p("//o/o//o/o//o/o//o/o/o"))
            .is_some());
        assert_eq!(lib.meters()[MeterId::Mutaqarib as usize].empirical_count(), 1);
    }

    #[test]
    fn test_shared_library_swap() {
        let shared = SharedLibrary::new(PatternLibrary::build());
        let before = shared.snapshot();
        let mut sup = Supplement::default();
        sup.insert(MeterId::Ramal, p("/o//o/o/o//o/o/o//o/o/"));
        let old = shared.swap(before.merged(&sup));
        assert_eq!(old.version(), before.version());
        let after = shared.snapshot();
        assert_eq!(after.len(), before.len() + 1);
        // Holders of the old snapshot still see the old contents
        assert_eq!(before.len(), old.len());
    }

    #[test]
    fn test_shared_library_concurrent_reads() {
        let shared = Arc::new(SharedLibrary::new(PatternLibrary::build()));
        let version = shared.snapshot().version().to_string();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || shared.snapshot().version().to_string())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), version);
        }
    }
}
