//! Combinatorial expansion of named dimensions.
//!
//! Every combination of one value per dimension becomes one scenario
//! variation. The first dimension varies fastest:
//!
//! ```text
//! Fill = [Red, Blue], Size = [Narrow, Wide]
//!   -> Red,Narrow  Blue,Narrow  Red,Wide  Blue,Wide
//! ```

#![allow(missing_docs)]

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named axis and the values it takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub values: Vec<String>,
}

impl Dimension {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// One value per dimension, in dimension order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Combination {
    values: Vec<(String, String)>,
}

impl Combination {
    /// Value chosen for `dimension`.
    #[must_use]
    pub fn get(&self, dimension: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == dimension)
            .map(|(_, value)| value.as_str())
    }

    /// `(dimension, value)` pairs in dimension order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Variation label: values joined by commas (`Red,Wide`).
    #[must_use]
    pub fn label(&self) -> String {
        self.values
            .iter()
            .map(|(_, v)| v.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Combination {
    /// `Fill: [Red] Size: [Wide]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{name}: [{value}]")?;
        }
        Ok(())
    }
}

/// Every combination of `dimensions`.
///
/// No dimensions, or any dimension without values, yields no combinations.
#[must_use]
pub fn combinations(dimensions: &[Dimension]) -> Vec<Combination> {
    if dimensions.is_empty() || dimensions.iter().any(|d| d.values.is_empty()) {
        return Vec::new();
    }

    let total: usize = dimensions.iter().map(|d| d.values.len()).product();
    let mut indexes = vec![0usize; dimensions.len()];
    let mut out = Vec::with_capacity(total);
    for _ in 0..total {
        out.push(Combination {
            values: dimensions
                .iter()
                .zip(&indexes)
                .map(|(d, &i)| (d.name.clone(), d.values[i].clone()))
                .collect(),
        });
        // Odometer step, first dimension fastest.
        for (slot, dim) in indexes.iter_mut().zip(dimensions) {
            *slot += 1;
            if *slot < dim.values.len() {
                break;
            }
            *slot = 0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shapes() -> Vec<Dimension> {
        vec![
            Dimension::new("Fill", ["Red", "Blue"]),
            Dimension::new("Size", ["Narrow", "Wide"]),
        ]
    }

    #[test]
    fn first_dimension_varies_fastest() {
        let labels: Vec<String> = combinations(&shapes()).iter().map(Combination::label).collect();
        assert_eq!(labels, vec!["Red,Narrow", "Blue,Narrow", "Red,Wide", "Blue,Wide"]);
    }

    #[test]
    fn lookup_by_dimension_name() {
        let all = combinations(&shapes());
        let last = all.last().unwrap();
        assert_eq!(last.get("Fill"), Some("Blue"));
        assert_eq!(last.get("Size"), Some("Wide"));
        assert_eq!(last.get("Depth"), None);
        assert_eq!(last.to_string(), "Fill: [Blue] Size: [Wide]");
    }

    #[test]
    fn empty_dimension_yields_nothing() {
        assert!(combinations(&[]).is_empty());
        let dims = vec![Dimension::new("Fill", ["Red"]), Dimension::new("Size", Vec::<String>::new())];
        assert!(combinations(&dims).is_empty());
    }

    #[test]
    fn single_dimension_is_a_flat_list() {
        let dims = vec![Dimension::new("Fill", ["Red", "Green", "Blue"])];
        let all = combinations(&dims);
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].label(), "Green");
        assert_eq!(all[1].len(), 1);
    }
}
