use std::path::Path;

use rand::Rng;

use parkutil::Timer;

use crate::xml::{Document, Element};
use crate::{Error, Result};

/// A `<parkingArea>` from a SUMO additional file, reduced to what's needed to pick one.
#[derive(Clone, Debug, PartialEq)]
pub struct ParkingArea {
    pub id: String,
    /// Relative chance of being chosen. Comes from the declared capacity, or 1 if there isn't a
    /// usable one.
    pub weight: u64,
}

/// Every parking area in an additional file, in document order. Never empty.
///
/// Repeated ids aren't merged; each occurrence is a separate entry with its own weight.
#[derive(Clone, Debug)]
pub struct ParkingCatalog {
    areas: Vec<ParkingArea>,
}

impl ParkingCatalog {
    /// Reads a `.add.xml` file. A missing or empty file is a configuration problem, not an IO
    /// one.
    pub fn load<P: AsRef<Path>>(path: P, timer: &mut Timer) -> Result<ParkingCatalog> {
        let path = path.as_ref();
        let source = path.display().to_string();
        if !path.exists() {
            return Err(Error::Configuration(format!(
                "parking area file {} doesn't exist",
                source
            )));
        }

        timer.start(format!("read {}", source));
        let doc = Document::load(path);
        timer.stop(format!("read {}", source));

        let catalog = ParkingCatalog::from_document(&doc?, &source)?;
        timer.note(format!(
            "Detected {} parking areas: {}",
            catalog.areas.len(),
            catalog
                .areas
                .iter()
                .map(|a| a.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
        Ok(catalog)
    }

    pub fn from_document(doc: &Document, source: &str) -> Result<ParkingCatalog> {
        let mut areas = Vec::new();
        for (idx, elem) in doc.root.descendants("parkingArea").into_iter().enumerate() {
            let id = match elem.attribute("id") {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => {
                    return Err(Error::Configuration(format!(
                        "<parkingArea> #{} in {} has no id",
                        idx + 1,
                        source
                    )));
                }
            };
            areas.push(ParkingArea {
                id,
                weight: declared_weight(elem),
            });
        }
        ParkingCatalog::new(areas).ok_or_else(|| {
            Error::Configuration(format!("no <parkingArea> elements found in {}", source))
        })
    }

    /// Returns `None` if there are no areas.
    pub fn new(areas: Vec<ParkingArea>) -> Option<ParkingCatalog> {
        if areas.is_empty() {
            None
        } else {
            Some(ParkingCatalog { areas })
        }
    }

    pub fn areas(&self) -> &[ParkingArea] {
        &self.areas
    }

    /// Summed in `u128`, since any single capacity may already be close to `u64::MAX`.
    pub fn total_weight(&self) -> u128 {
        self.areas.iter().map(|a| u128::from(a.weight)).sum()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.areas.iter().any(|a| a.id == id)
    }

    /// Picks an area with probability proportional to its weight. Consumes exactly one draw from
    /// the RNG.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &ParkingArea {
        let total = self.total_weight() as f64;
        // The closed interval matters: `r` may land exactly on `total`.
        let r = rng.gen_range(0.0..=total);
        self.pick(r)
    }

    /// Walks the areas accumulating weight and returns the first one whose running total reaches
    /// `r`. If nothing does, the last area wins.
    pub fn pick(&self, r: f64) -> &ParkingArea {
        let mut upto: u128 = 0;
        for area in &self.areas {
            upto += u128::from(area.weight);
            if upto as f64 >= r {
                return area;
            }
        }
        &self.areas[self.areas.len() - 1]
    }
}

/// `roadsideCapacity` takes precedence over `capacity`. Whichever one is present and non-empty
/// has to be a plain non-negative integer to count; otherwise the weight is 1.
fn declared_weight(elem: &Element) -> u64 {
    let declared = ["roadsideCapacity", "capacity"]
        .iter()
        .filter_map(|key| elem.attribute(key))
        .find(|value| !value.is_empty());
    match declared {
        Some(value) if value.bytes().all(|b| b.is_ascii_digit()) => value.parse().unwrap_or(1),
        _ => 1,
    }
}
