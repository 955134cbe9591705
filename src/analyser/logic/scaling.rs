use super::cleaning::resolve_targets;
use super::frame::{Column, TabularFrame};
use super::statistics::{mean, sample_std};
use crate::error::{AnalyzerError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMethod {
    Standardize,
    Normalize,
    Log,
}

impl ScaleMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standardize => "standardize",
            Self::Normalize => "normalize",
            Self::Log => "log",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Standardize => "Standardization (mean=0, std=1)",
            Self::Normalize => "Min-Max Scaling (range 0-1)",
            Self::Log => "Natural log transform",
        }
    }
}

impl FromStr for ScaleMethod {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "standardize" | "standard" | "zscore" => Ok(Self::Standardize),
            "normalize" | "minmax" => Ok(Self::Normalize),
            "log" => Ok(Self::Log),
            other => Err(AnalyzerError::InvalidParameter(format!(
                "Invalid scaling method: '{other}'"
            ))),
        }
    }
}

/// Rescales numeric columns. Missing cells stay missing.
///
/// - `standardize`: `(x - mean) / s` with the sample std; a column with `s == 0`
///   is left unchanged.
/// - `normalize`: min-max to `[0, 1]`; a constant column maps to 0.
/// - `log`: natural log; if the minimum is `<= 0` the column is first shifted
///   by `1 - min`, so its smallest value becomes `ln(1) = 0`.
pub fn scale_columns(
    frame: &TabularFrame,
    method: ScaleMethod,
    columns: Option<&[String]>,
) -> Result<(TabularFrame, Vec<String>)> {
    let targets = resolve_targets(frame, columns, true, false)?;
    let mut replacements = Vec::new();
    let mut scaled = Vec::new();

    for name in targets {
        let column = frame.column(&name)?;
        let Some(values) = column.as_numeric() else {
            continue;
        };
        let present = column.present_values();
        let transform: Box<dyn Fn(f64) -> f64> = match method {
            ScaleMethod::Standardize => match (mean(&present), sample_std(&present)) {
                (Some(m), Some(s)) if s > 0.0 => Box::new(move |x| (x - m) / s),
                _ => Box::new(|x| x),
            },
            ScaleMethod::Normalize => {
                let min = present.iter().copied().fold(f64::INFINITY, f64::min);
                let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                // Halved so that `max - min` cannot overflow.
                let half_range = max / 2.0 - min / 2.0;
                if half_range > 0.0 {
                    Box::new(move |x| (x / 2.0 - min / 2.0) / half_range)
                } else {
                    Box::new(|_| 0.0)
                }
            }
            ScaleMethod::Log => {
                let min = present.iter().copied().fold(f64::INFINITY, f64::min);
                let shift = if min <= 0.0 { 1.0 - min } else { 0.0 };
                Box::new(move |x| (x + shift).ln())
            }
        };

        replacements.push(Column::numeric(
            name.as_str(),
            values.iter().map(|v| v.map(&transform)).collect(),
        ));
        scaled.push(name);
    }

    Ok((frame.with_columns(replacements)?, scaled))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(values: &[Option<f64>]) -> Result<TabularFrame> {
        TabularFrame::new(vec![
            Column::numeric("v", values.to_vec()),
            Column::categorical("tag", vec![Some("t".into()); values.len()]),
        ])
    }

    #[test]
    fn test_method_aliases() -> Result<()> {
        assert_eq!("standard".parse::<ScaleMethod>()?, ScaleMethod::Standardize);
        assert_eq!("zscore".parse::<ScaleMethod>()?, ScaleMethod::Standardize);
        assert_eq!("minmax".parse::<ScaleMethod>()?, ScaleMethod::Normalize);
        assert!("robust".parse::<ScaleMethod>().is_err());
        Ok(())
    }

    #[test]
    fn test_standardize_uses_sample_std() -> Result<()> {
        let input = frame(&[Some(1.0), Some(2.0), Some(3.0), None])?;
        let (out, scaled) = scale_columns(&input, ScaleMethod::Standardize, None)?;
        assert_eq!(scaled, vec!["v"]);
        assert_eq!(out.numeric_column("v")?, &[Some(-1.0), Some(0.0), Some(1.0), None]);
        Ok(())
    }

    #[test]
    fn test_constant_columns() -> Result<()> {
        let input = frame(&[Some(4.0), Some(4.0)])?;
        let (std, _) = scale_columns(&input, ScaleMethod::Standardize, None)?;
        assert_eq!(std.numeric_column("v")?, &[Some(4.0), Some(4.0)]);
        let (minmax, _) = scale_columns(&input, ScaleMethod::Normalize, None)?;
        assert_eq!(minmax.numeric_column("v")?, &[Some(0.0), Some(0.0)]);
        Ok(())
    }

    #[test]
    fn test_normalize_range() -> Result<()> {
        let input = frame(&[Some(2.0), Some(6.0), Some(4.0)])?;
        let (out, _) = scale_columns(&input, ScaleMethod::Normalize, None)?;
        assert_eq!(out.numeric_column("v")?, &[Some(0.0), Some(1.0), Some(0.5)]);
        Ok(())
    }

    #[test]
    fn test_extreme_magnitudes_stay_numeric() -> Result<()> {
        let input = frame(&[Some(1e308), Some(-1e308), Some(0.0)])?;
        let (minmax, _) = scale_columns(&input, ScaleMethod::Normalize, None)?;
        assert_eq!(minmax.numeric_column("v")?, &[Some(1.0), Some(0.0), Some(0.5)]);
        let (std, _) = scale_columns(&input, ScaleMethod::Standardize, None)?;
        assert_eq!(std.numeric_column("v")?, &[Some(1.0), Some(-1.0), Some(0.0)]);
        Ok(())
    }

    #[test]
    fn test_log_overflow_is_an_error() -> Result<()> {
        let input = frame(&[Some(-1e308), Some(1e308)])?;
        assert!(matches!(
            scale_columns(&input, ScaleMethod::Log, None),
            Err(AnalyzerError::InvalidParameter(_))
        ));
        Ok(())
    }

    #[test]
    fn test_log_shifts_non_positive_columns() -> Result<()> {
        let input = frame(&[Some(-2.0), Some(0.0)])?;
        let (out, _) = scale_columns(&input, ScaleMethod::Log, None)?;
        let v = out.numeric_column("v")?;
        assert_eq!(v[0], Some(0.0));
        assert!((v[1].unwrap_or(f64::NAN) - 3.0f64.ln()).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_categorical_target_rejected() -> Result<()> {
        let input = frame(&[Some(1.0)])?;
        let cols = vec!["tag".to_owned()];
        assert!(matches!(
            scale_columns(&input, ScaleMethod::Log, Some(&cols)),
            Err(AnalyzerError::InvalidColumn(_))
        ));
        Ok(())
    }
}
