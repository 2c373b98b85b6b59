use phf::phf_map;
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Mass and Lennard-Jones parameters derived from an element symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementParams {
    pub symbol: Cow<'static, str>,
    /// Atomic mass in amu.
    pub mass: f64,
    /// Lennard-Jones diameter in Å.
    pub sigma: f64,
    /// Lennard-Jones well depth in eV.
    pub epsilon: f64,
}

const fn builtin(symbol: &'static str, mass: f64, sigma: f64, epsilon: f64) -> ElementParams {
    ElementParams {
        symbol: Cow::Borrowed(symbol),
        mass,
        sigma,
        epsilon,
    }
}

static BUILTIN_ELEMENTS: phf::Map<&'static str, ElementParams> = phf_map! {
    "H" => builtin("H", 1.008, 2.50, 0.0013),
    "C" => builtin("C", 12.011, 3.40, 0.0037),
    "N" => builtin("N", 14.007, 3.25, 0.0074),
    "O" => builtin("O", 15.999, 3.00, 0.0091),
    "S" => builtin("S", 32.06, 3.55, 0.0108),
    "P" => builtin("P", 30.974, 3.74, 0.0087),
    "Na" => builtin("Na", 22.990, 2.35, 0.0019),
    "Cl" => builtin("Cl", 35.45, 4.40, 0.0046),
    "Ar" => builtin("Ar", 39.948, 3.40, 0.0104),
    "Nt" => builtin("Nt", 20.0, 3.0, 0.10),
    "Pl" => builtin("Pl", 40.0, 3.5, 0.10),
    "Ws" => builtin("Ws", 60.0, 4.0, 0.10),
    "Ck" => builtin("Ck", 80.0, 4.5, 0.10),
};

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Invalid parameter for element '{symbol}': {reason}")]
    InvalidValue { symbol: String, reason: String },
}

#[derive(Debug, Deserialize)]
struct ElementRecord {
    symbol: String,
    mass: f64,
    sigma: f64,
    epsilon: f64,
}

/// Element lookup: the builtin table, optionally overridden or extended from CSV.
#[derive(Debug, Clone, Default)]
pub struct ElementTable {
    overrides: HashMap<String, ElementParams>,
}

impl ElementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a symbol, preferring loaded overrides over the builtin table.
    pub fn get(&self, symbol: &str) -> Option<&ElementParams> {
        self.overrides
            .get(symbol)
            .or_else(|| BUILTIN_ELEMENTS.get(symbol))
    }

    pub fn builtin(symbol: &str) -> Option<&'static ElementParams> {
        BUILTIN_ELEMENTS.get(symbol)
    }

    pub fn insert(&mut self, params: ElementParams) {
        self.overrides.insert(params.symbol.to_string(), params);
    }

    /// Reads `symbol,mass,sigma,epsilon` rows into the table.
    pub fn load_csv(&mut self, path: &Path) -> Result<usize, ParamLoadError> {
        let path_str = || path.to_string_lossy().to_string();
        if !path.exists() {
            return Err(ParamLoadError::Io {
                path: path_str(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            });
        }
        let mut reader = csv::Reader::from_path(path).map_err(|e| ParamLoadError::Csv {
            path: path_str(),
            source: e,
        })?;

        let mut count = 0;
        for result in reader.deserialize::<ElementRecord>() {
            let record = result.map_err(|e| ParamLoadError::Csv {
                path: path_str(),
                source: e,
            })?;
            if record.mass <= 0.0 || record.sigma <= 0.0 || record.epsilon < 0.0 {
                return Err(ParamLoadError::InvalidValue {
                    symbol: record.symbol,
                    reason: "mass and sigma must be positive, epsilon non-negative".to_string(),
                });
            }
            self.insert(ElementParams {
                symbol: Cow::Owned(record.symbol),
                mass: record.mass,
                sigma: record.sigma,
                epsilon: record.epsilon,
            });
            count += 1;
        }
        Ok(count)
    }
}
