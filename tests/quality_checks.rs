//! Data-quality workflows: stream a file, then group the result to find
//! conflicting values.

use openclean::data::{ColumnRef, Value};
use openclean::function::Eval;
use openclean::grouping::{Having, groupby_columns};
use openclean::pipeline::DataPipeline;
use openclean::profiling::{fd_violations, key_violations};
use tempfile::TempDir;

const ADDRESSES: &str = "\
Id,Zip,City
1,10001,New York
2,10001,NYC
3,02101,Boston
4,10001,New York
5,02101,Boston
5,60601,Chicago
";

fn addresses(dir: &TempDir) -> DataPipeline {
    let input = dir.path().join("addresses.csv");
    std::fs::write(&input, ADDRESSES).unwrap();
    DataPipeline::stream_csv(input)
}

#[test]
fn test_zip_determines_city_violations() {
    let dir = TempDir::new().unwrap();
    let table = addresses(&dir).to_table().unwrap();

    let violations = fd_violations(table, &["Zip".into()], &["City".into()]).unwrap();

    let keys: Vec<String> = violations.keys().map(Value::to_text).collect();
    assert_eq!(keys, ["10001"]);
    let cities = violations.get_meta(&"10001".into()).unwrap();
    assert_eq!(cities.get(&"New York".into()), 2);
    assert_eq!(cities.get(&"NYC".into()), 1);
    assert_eq!(violations.get(&"10001".into()).unwrap().unwrap().len(), 3);
}

#[test]
fn test_conflict_summary_after_cleaning() {
    let dir = TempDir::new().unwrap();
    let pipeline = addresses(&dir);
    let columns: [ColumnRef; 1] = ["City".into()];

    let raw = fd_violations(pipeline.to_table().unwrap(), &["Zip".into()], &columns).unwrap();
    let conflicts = raw.grouping().summarize_conflicts(&columns).unwrap();
    let nyc = conflicts.get(&"NYC".into()).unwrap();
    assert_eq!(nyc.count, 1);
    assert_eq!(nyc.partners.get(&"New York".into()), 1);

    let mapping = [(Value::from("NYC"), Value::from("New York"))]
        .into_iter()
        .collect::<std::collections::HashMap<_, _>>();
    let cleaned = pipeline.update(["City"], mapping).unwrap().to_table().unwrap();
    let after = fd_violations(cleaned, &["Zip".into()], &columns).unwrap();
    assert!(after.is_empty());
}

#[test]
fn test_duplicate_key_candidates() {
    let dir = TempDir::new().unwrap();
    let table = addresses(&dir).to_table().unwrap();

    let duplicates = key_violations(table, &["Id".into()]).unwrap();

    assert_eq!(duplicates.len(), 1);
    let rows = duplicates.get(&"5".into()).unwrap().unwrap();
    assert_eq!(rows.index(), [4, 5]);
}

#[test]
fn test_groups_with_more_than_one_row() {
    let dir = TempDir::new().unwrap();
    let table = addresses(&dir)
        .update(["City"], Eval::upper("City"))
        .unwrap()
        .to_table()
        .unwrap();

    let having = Having::predicate(|group| Value::Bool(group.len() > 1));
    let grouping = groupby_columns(table, &["City".into()], Some(&having)).unwrap();

    let keys: Vec<String> = grouping.keys().map(Value::to_text).collect();
    assert_eq!(keys, ["NEW YORK", "BOSTON"]);
    let cities = grouping.values(&"BOSTON".into(), &["Zip".into()]).unwrap().unwrap();
    assert_eq!(cities.get(&"02101".into()), 2);
}
