#![expect(clippy::unwrap_used, clippy::indexing_slicing)]

mod inference;

use super::*;
use crate::error::Result;

/// Frame parsed from CSV text, the way uploads arrive.
fn csv_frame(text: &str) -> Result<TabularFrame> {
    load_frame(text.as_bytes(), Format::Csv)
}

#[test]
fn test_classification_is_exhaustive_and_stable() -> Result<()> {
    let frame = csv_frame("id,city,score,notes\n1,Oslo,3.5,\n2,Rome,,\n3,Oslo,4.0,\n")?;
    let first = classify(&frame, "people.csv");
    let second = classify(&frame, "people.csv");
    assert_eq!(first, second);

    assert_eq!(first.numeric_columns, vec!["id", "score"]);
    assert_eq!(first.categorical_columns, vec!["city", "notes"]);
    assert_eq!(
        first.numeric_columns.len() + first.categorical_columns.len(),
        first.columns
    );
    assert_eq!(first.rows, 3);
    Ok(())
}

#[test]
fn test_na_tokens_are_missing() -> Result<()> {
    let frame = csv_frame("v\n1\nNA\n#N/A\n 4 \n")?;
    let column = frame.numeric_column("v")?;
    assert_eq!(column, &[Some(1.0), None, None, Some(4.0)]);
    Ok(())
}
