//! Static configuration dataset
//!
//! Baseline literal cells (labels, defaults, product parameters) and the
//! age-indexed LTV / initial-payout schedule. Loaded once and never mutated;
//! every workbook instance copies it into its own cell store.

mod loader;

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use once_cell::sync::OnceCell;

use crate::cells::{CellAddress, CellStore, CellValue};
use crate::error::Result;

pub use loader::{load_age_parameters, load_baseline_cells, AGE_PARAMETERS_FILE, BASELINE_FILE};

/// Default path to the dataset directory
pub const DEFAULT_DATASET_PATH: &str = "data/lump15";

/// Cell holding the "Date update" stamp used as the dataset version
pub const VERSION_CELL: CellAddress = CellAddress::primary('F', 2);

const EMBEDDED_BASELINE: &str = include_str!("../../data/lump15/baseline_cells.csv");
const EMBEDDED_AGE_PARAMETERS: &str = include_str!("../../data/lump15/age_parameters.csv");

static EMBEDDED: OnceCell<StaticDataset> = OnceCell::new();

/// One literal baseline cell
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineCell {
    pub address: CellAddress,
    pub value: CellValue,
}

/// One row of the age schedule on the parameter sheet (columns D, E, F)
#[derive(Debug, Clone, PartialEq)]
pub struct AgeParameter {
    /// Sheet row the entry occupies
    pub row: u32,
    pub age: u32,
    /// Maximum loan-to-value fraction at this starting age
    pub max_ltv: f64,
    /// First-year payout fraction; blank rows take the value above
    pub initial_payout: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct StaticDataset {
    baseline: Vec<BaselineCell>,
    age_parameters: Vec<AgeParameter>,
}

impl StaticDataset {
    pub fn new(baseline: Vec<BaselineCell>, age_parameters: Vec<AgeParameter>) -> Self {
        Self { baseline, age_parameters }
    }

    /// Dataset compiled into the crate, parsed on first use
    pub fn embedded() -> Result<&'static StaticDataset> {
        EMBEDDED.get_or_try_init(|| {
            let dataset = Self::new(
                load_baseline_cells(EMBEDDED_BASELINE.as_bytes())?,
                load_age_parameters(EMBEDDED_AGE_PARAMETERS.as_bytes())?,
            );
            log::debug!(
                "Loaded embedded dataset version {:?}: {} baseline cells, {} ages",
                dataset.version(),
                dataset.baseline.len(),
                dataset.age_parameters.len()
            );
            Ok(dataset)
        })
    }

    /// Load both CSV files from a directory
    pub fn from_dir<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let baseline = load_baseline_cells(File::open(path.join(BASELINE_FILE))?)?;
        let age_parameters = load_age_parameters(File::open(path.join(AGE_PARAMETERS_FILE))?)?;
        log::info!("Loaded dataset from {}", path.display());
        Ok(Self::new(baseline, age_parameters))
    }

    /// "Date update" stamp of the dataset
    pub fn version(&self) -> Option<NaiveDate> {
        self.baseline
            .iter()
            .find(|c| c.address == VERSION_CELL)
            .and_then(|c| c.value.as_date())
    }

    pub fn baseline(&self) -> &[BaselineCell] {
        &self.baseline
    }

    pub fn age_parameters(&self) -> &[AgeParameter] {
        &self.age_parameters
    }

    /// Entry for an exact starting age
    pub fn age_parameter(&self, age: u32) -> Option<&AgeParameter> {
        self.age_parameters.iter().find(|p| p.age == age)
    }

    /// Copy every literal into `store`: baseline cells first, then the age schedule
    pub fn populate(&self, store: &mut CellStore) {
        store.extend(self.baseline.iter().map(|c| (c.address, c.value.clone())));

        for entry in &self.age_parameters {
            store.set(CellAddress::parameters('D', entry.row), entry.age as f64);
            store.set(CellAddress::parameters('E', entry.row), entry.max_ltv);
            if let Some(payout) = entry.initial_payout {
                store.set(CellAddress::parameters('F', entry.row), payout);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_dataset() {
        let dataset = StaticDataset::embedded().unwrap();
        assert_eq!(dataset.version(), NaiveDate::from_ymd_opt(2024, 11, 7));

        let age_73 = dataset.age_parameter(73).unwrap();
        assert_eq!(age_73.row, 31);
        assert!((age_73.max_ltv - 0.67).abs() < 1e-12);
        assert_eq!(age_73.initial_payout, Some(0.14));

        // Ages 58-63 have no rows
        assert!(dataset.age_parameter(60).is_none());
        assert_eq!(dataset.age_parameter(90).unwrap().initial_payout, None);

        let ages: Vec<u32> = dataset.age_parameters().iter().map(|p| p.age).collect();
        assert!(ages.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_populate_writes_parameters() {
        let dataset = StaticDataset::embedded().unwrap();
        let mut store = CellStore::new();
        dataset.populate(&mut store);

        assert_eq!(store.get(&CellAddress::parameters('E', 5)), Some(&CellValue::Number(0.0659)));
        assert_eq!(store.get(&CellAddress::parameters('D', 33)), Some(&CellValue::Number(75.0)));
        assert!(store.get(&CellAddress::parameters('F', 43)).is_none());
        assert_eq!(store.get(&CellAddress::primary('H', 51)), Some(&CellValue::Number(2100.0)));
    }

    #[test]
    fn test_from_dir_matches_embedded() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_DATASET_PATH);
        let loaded = StaticDataset::from_dir(dir).unwrap();
        let embedded = StaticDataset::embedded().unwrap();
        assert_eq!(loaded.baseline(), embedded.baseline());
        assert_eq!(loaded.age_parameters(), embedded.age_parameters());
    }
}
