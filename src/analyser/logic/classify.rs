use super::frame::TabularFrame;
use super::types::{Cell, ColumnKind, DataInfo};
use std::borrow::Borrow;

/// Kind of a column given its cells.
///
/// Numeric iff at least one value is present and every present value reads as
/// a finite number. All-missing columns default to categorical.
pub fn infer_kind<I, C>(cells: I) -> ColumnKind
where
    I: IntoIterator<Item = C>,
    C: Borrow<Cell>,
{
    let mut any_present = false;
    for cell in cells {
        let cell = cell.borrow();
        if cell.is_missing() {
            continue;
        }
        if cell.as_number().is_none() {
            return ColumnKind::Categorical;
        }
        any_present = true;
    }
    if any_present {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    }
}

/// Partitions the frame's columns into numeric and categorical, in frame order.
pub fn classify(frame: &TabularFrame, filename: &str) -> DataInfo {
    let mut numeric_columns = Vec::new();
    let mut categorical_columns = Vec::new();
    for column in frame.columns() {
        match infer_kind(column.cells()) {
            ColumnKind::Numeric => numeric_columns.push(column.name().to_owned()),
            ColumnKind::Categorical => categorical_columns.push(column.name().to_owned()),
        }
    }

    DataInfo {
        filename: filename.to_owned(),
        rows: frame.height(),
        columns: frame.width(),
        numeric_columns,
        categorical_columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::logic::frame::Column;
    use crate::error::Result;

    #[test]
    fn test_infer_kind() {
        let numeric = [Cell::Text("1".into()), Cell::Missing, Cell::Number(2.0)];
        assert_eq!(infer_kind(&numeric), ColumnKind::Numeric);

        let mixed = [Cell::Text("1".into()), Cell::Text("x".into())];
        assert_eq!(infer_kind(&mixed), ColumnKind::Categorical);

        let empty = [Cell::Missing, Cell::Missing];
        assert_eq!(infer_kind(&empty), ColumnKind::Categorical);
    }

    #[test]
    fn test_classify_partitions_in_order() -> Result<()> {
        let frame = TabularFrame::new(vec![
            Column::categorical("city", vec![Some("Oslo".into()), Some("Bergen".into())]),
            Column::numeric("age", vec![Some(31.0), None]),
            Column::categorical("blank", vec![None, None]),
            Column::numeric("score", vec![Some(1.5), Some(2.5)]),
        ])?;

        let info = classify(&frame, "people.csv");
        assert_eq!(info.filename, "people.csv");
        assert_eq!(info.rows, 2);
        assert_eq!(info.columns, 4);
        assert_eq!(info.numeric_columns, vec!["age", "score"]);
        assert_eq!(info.categorical_columns, vec!["city", "blank"]);
        assert_eq!(classify(&frame, "people.csv"), info);
        Ok(())
    }
}
