pub mod classify;
pub mod cleaning;
pub mod distributions;
pub mod frame;
pub mod inference;
pub mod io;
pub mod normality;
pub mod outliers;
pub mod scaling;
pub mod statistics;
pub mod types;

pub use classify::{classify, infer_kind};
pub use cleaning::{CleaningOutcome, ImputeMethod, impute_missing};
pub use frame::{Column, ColumnValues, TabularFrame};
pub use inference::{
    AnovaResult, RegressionResult, TTestResult, linear_regression, one_sample_t_test,
    one_way_anova,
};
pub use io::{Format, load_frame};
pub use normality::{NormalityOptions, NormalityResult, normality_report};
pub use outliers::{OutlierMethod, OutlierOutcome, remove_outliers};
pub use scaling::{ScaleMethod, scale_columns};
pub use statistics::{
    CorrelationMatrix, Histogram, StatisticsReport, correlation_matrix, statistics_report,
};
pub use types::{Cell, ColumnKind, DataInfo};

#[cfg(test)]
mod tests;
