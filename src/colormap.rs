//! Color buckets and the RGB tables they map through.
//!
//! Colormap *file* loading is out of scope for this crate (an external
//! collaborator's concern); what lives here is the closed bucket set and a
//! single built-in `plain` colormap used whenever no external table is
//! supplied, grounded on the original implementation's own hardcoded
//! fallback values.

use std::collections::BTreeMap;

/// The closed set of weather color buckets. Order here is the canonical
/// bucket ordering used by the colormap-preview stride in
/// [`crate::assembler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    Clearsky,
    Partlycloudy,
    Cloudy,
    LightrainLt50,
    Lightrain,
    Rain,
    Heavyrain,
    Veryheavyrain,
}

impl Bucket {
    pub const ALL: [Bucket; 8] = [
        Bucket::Clearsky,
        Bucket::Partlycloudy,
        Bucket::Cloudy,
        Bucket::LightrainLt50,
        Bucket::Lightrain,
        Bucket::Rain,
        Bucket::Heavyrain,
        Bucket::Veryheavyrain,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Bucket::Clearsky => "CLEARSKY",
            Bucket::Partlycloudy => "PARTLYCLOUDY",
            Bucket::Cloudy => "CLOUDY",
            Bucket::LightrainLt50 => "LIGHTRAIN_LT50",
            Bucket::Lightrain => "LIGHTRAIN",
            Bucket::Rain => "RAIN",
            Bucket::Heavyrain => "HEAVYRAIN",
            Bucket::Veryheavyrain => "VERYHEAVYRAIN",
        }
    }
}

/// An RGB triple, each component in `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const HOT_PINK: Rgb = Rgb(255, 0, 128);

    pub fn hex(self) -> String {
        format!("{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// A named `{bucket → RGB}` table, plus an `UNKNOWN` fallback lookup order.
#[derive(Debug, Clone)]
pub struct Colormap {
    pub name: String,
    entries: BTreeMap<Bucket, Rgb>,
}

impl Colormap {
    /// The built-in fallback colormap, matching the original implementation's
    /// hardcoded `fallback_data` table.
    pub fn plain() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(Bucket::Clearsky, Rgb(3, 3, 235));
        entries.insert(Bucket::Partlycloudy, Rgb(65, 126, 205));
        entries.insert(Bucket::Cloudy, Rgb(180, 200, 200));
        entries.insert(Bucket::LightrainLt50, Rgb(161, 228, 74));
        entries.insert(Bucket::Lightrain, Rgb(240, 240, 42));
        entries.insert(Bucket::Rain, Rgb(241, 155, 44));
        entries.insert(Bucket::Heavyrain, Rgb(236, 94, 42));
        entries.insert(Bucket::Veryheavyrain, Rgb(234, 57, 248));
        Self {
            name: "plain".to_string(),
            entries,
        }
    }

    /// Look up a bucket's RGB. Falls back to the colormap's `CLOUDY` entry,
    /// and then to black, if the bucket itself is missing — this is the path
    /// taken for the classifier's `UNKNOWN` marker.
    pub fn get(&self, bucket: Bucket) -> Rgb {
        self.entries
            .get(&bucket)
            .copied()
            .or_else(|| self.entries.get(&Bucket::Cloudy).copied())
            .unwrap_or(Rgb::BLACK)
    }

    /// Buckets present in this colormap, in canonical `Bucket::ALL` order —
    /// the iteration order the colormap-preview stride walks.
    pub fn ordered_buckets(&self) -> Vec<Bucket> {
        Bucket::ALL
            .iter()
            .copied()
            .filter(|b| self.entries.contains_key(b))
            .collect()
    }
}
