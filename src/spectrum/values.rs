/// Per-wavelength values of a spectrum.
///
/// Raw acquisitions are always fully defined. Calibrated spectra may carry
/// undefined points (non-physical ratios, zero denominators), tracked with an
/// explicit validity bitmap instead of relying on NaN payloads:
/// - `Dense`: every value is defined
/// - `WithValidity`: `values[i]` is meaningful only where `validity[i]` is true
#[derive(Debug, Clone, PartialEq)]
pub enum SpectralValues {
    /// All values are defined.
    Dense(Vec<f64>),
    /// Mixed presence with explicit validity bitmap.
    WithValidity {
        /// The values (only meaningful where validity is true).
        values: Vec<f64>,
        /// Boolean bitmap indicating which values are defined.
        validity: Vec<bool>,
    },
}

impl SpectralValues {
    /// Build from optional values, collapsing to `Dense` when nothing is missing.
    pub fn from_options<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut dense = Vec::new();
        let mut validity = Vec::new();
        let mut all_defined = true;
        for value in values {
            match value {
                Some(v) => {
                    dense.push(v);
                    validity.push(true);
                }
                None => {
                    dense.push(0.0);
                    validity.push(false);
                    all_defined = false;
                }
            }
        }

        if all_defined {
            SpectralValues::Dense(dense)
        } else {
            SpectralValues::WithValidity {
                values: dense,
                validity,
            }
        }
    }

    /// Returns the number of points.
    pub fn len(&self) -> usize {
        match self {
            SpectralValues::Dense(values) => values.len(),
            SpectralValues::WithValidity { values, .. } => values.len(),
        }
    }

    /// Returns true if there are no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `index`, or `None` when undefined or out of bounds.
    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            SpectralValues::Dense(values) => values.get(index).copied(),
            SpectralValues::WithValidity { values, validity } => match validity.get(index) {
                Some(true) => values.get(index).copied(),
                _ => None,
            },
        }
    }

    /// Returns true if the value at `index` is undefined.
    pub fn is_undefined(&self, index: usize) -> bool {
        index < self.len() && self.get(index).is_none()
    }

    /// Number of undefined points.
    pub fn undefined_count(&self) -> usize {
        match self {
            SpectralValues::Dense(_) => 0,
            SpectralValues::WithValidity { validity, .. } => {
                validity.iter().filter(|v| !**v).count()
            }
        }
    }

    /// The values as a plain slice when every point is defined.
    pub fn as_dense(&self) -> Option<&[f64]> {
        match self {
            SpectralValues::Dense(values) => Some(values),
            SpectralValues::WithValidity { .. } => None,
        }
    }

    /// Iterate over the values in wavelength order.
    pub fn iter(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    /// Smallest and largest defined value.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.iter().flatten().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

impl From<Vec<f64>> for SpectralValues {
    fn from(values: Vec<f64>) -> Self {
        SpectralValues::Dense(values)
    }
}
