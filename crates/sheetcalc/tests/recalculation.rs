//! End-to-end edit sequences: propagation, cycles, copy and fill

use pretty_assertions::assert_eq;
use sheetcalc::prelude::*;
use sheetcalc::FormulaError;

fn number(sheet: &Spreadsheet, cell: &str) -> f64 {
    match sheet.value(cell).unwrap() {
        Value::Number(n) => n,
        other => panic!("{} is {:?}, expected a number", cell, other),
    }
}

fn keys(cells: &[&str]) -> Vec<CellKey> {
    cells.iter().map(|c| c.parse().unwrap()).collect()
}

#[test]
fn test_chain_propagates_in_order() {
    let mut sheet = Spreadsheet::new();
    sheet.set_cell("A1", "1").unwrap();
    for row in 2..=50 {
        sheet
            .set_cell(format!("A{}", row), &format!("=A{}+1", row - 1))
            .unwrap();
    }
    assert_eq!(number(&sheet, "A50"), 50.0);

    let stats = sheet.set_cell("A1", "100").unwrap();
    assert_eq!(stats.cells_calculated, 49);
    assert_eq!(number(&sheet, "A50"), 149.0);
}

#[test]
fn test_diamond_recomputes_each_cell_once() {
    let mut sheet = Spreadsheet::new();
    sheet.set_cell("A1", "2").unwrap();
    sheet.set_cell("B1", "=A1*10").unwrap();
    sheet.set_cell("C1", "=A1+1").unwrap();
    sheet.set_cell("D1", "=B1+C1").unwrap();

    let order = sheet
        .dependency_graph()
        .get_recalculation_order("A1".parse().unwrap());
    assert_eq!(order, keys(&["B1", "C1", "D1"]));

    let stats = sheet.set_cell("A1", "3").unwrap();
    assert_eq!(stats.cells_calculated, 3);
    assert_eq!(number(&sheet, "D1"), 34.0);
}

#[test]
fn test_rejected_cycle_leaves_state_untouched() {
    let mut sheet = Spreadsheet::new();
    sheet.set_cell("A1", "1").unwrap();
    sheet.set_cell("B1", "=A1+1").unwrap();
    sheet.set_cell("C1", "=B1+1").unwrap();

    for (cell, formula) in [("A1", "=C1"), ("A1", "=SUM(B1:C1)"), ("C1", "=C1*2")] {
        let before_graph = sheet.dependency_graph().clone();
        let before_value = sheet.value(cell).unwrap();
        let before_formula = sheet.formula(cell).unwrap();

        let err = sheet.set_cell(cell, formula).unwrap_err();
        assert!(matches!(err, Error::CircularReference { .. }), "{}", formula);

        assert_eq!(sheet.dependency_graph(), &before_graph);
        assert_eq!(sheet.value(cell).unwrap(), before_value);
        assert_eq!(sheet.formula(cell).unwrap(), before_formula);
    }

    // The sheet still works afterwards
    sheet.set_cell("A1", "10").unwrap();
    assert_eq!(number(&sheet, "C1"), 12.0);
}

#[test]
fn test_cycle_error_names_the_path() {
    let mut sheet = Spreadsheet::new();
    sheet.set_cell("B1", "=A1").unwrap();
    sheet.set_cell("C1", "=B1").unwrap();

    let err = sheet.set_cell("A1", "=C1").unwrap_err();
    assert_eq!(err.to_string(), "Circular reference in A1: A1 -> C1 -> B1 -> A1");
}

#[test]
fn test_overly_nested_formula_is_rejected() {
    let mut sheet = Spreadsheet::new();
    sheet.set_cell("A1", "=2").unwrap();

    let deep = format!("={}1{}", "(".repeat(5_000), ")".repeat(5_000));
    let err = sheet.set_cell("A1", &deep).unwrap_err();
    assert!(matches!(err, Error::Formula(FormulaError::Syntax { .. })));
    assert_eq!(sheet.formula("A1").unwrap().as_deref(), Some("=2"));

    let chain = format!("=0{}", "+A2".repeat(5_000));
    assert!(sheet.set_cell("B1", &chain).is_err());
    assert!(sheet.dependency_graph().is_empty());
}

#[test]
fn test_replacing_formula_drops_old_edges() {
    let mut sheet = Spreadsheet::new();
    sheet.set_cell("A1", "1").unwrap();
    sheet.set_cell("A2", "2").unwrap();
    sheet.set_cell("B1", "=A1").unwrap();
    sheet.set_cell("B1", "=A2").unwrap();

    let stats = sheet.set_cell("A1", "5").unwrap();
    assert_eq!(stats.cells_calculated, 0);
    assert_eq!(number(&sheet, "B1"), 2.0);

    // What used to be a cycle is now fine
    sheet.set_cell("A1", "=B1").unwrap();
    assert_eq!(number(&sheet, "A1"), 2.0);
}

#[test]
fn test_clearing_a_formula() {
    let mut sheet = Spreadsheet::new();
    sheet.set_cell("A1", "4").unwrap();
    sheet.set_cell("B1", "=A1*2").unwrap();
    sheet.set_cell("C1", "=B1+1").unwrap();

    sheet.clear_cell("B1").unwrap();
    assert_eq!(sheet.value("B1").unwrap(), Value::Empty);
    assert_eq!(sheet.formula("B1").unwrap(), None);
    assert_eq!(number(&sheet, "C1"), 1.0);
    assert_eq!(sheet.dependency_graph().dependents("A1".parse().unwrap()).count(), 0);

    // C1 still reads B1
    sheet.set_cell("B1", "7").unwrap();
    assert_eq!(number(&sheet, "C1"), 8.0);

    // Blank input clears too
    sheet.set_cell("B1", "  ").unwrap();
    assert_eq!(number(&sheet, "C1"), 1.0);
}

#[test]
fn test_literal_edits_propagate() {
    let mut sheet = Spreadsheet::new();
    sheet.set_cell("A1", "hello").unwrap();
    sheet.set_cell("B1", "=LEN(A1)").unwrap();
    sheet.set_cell("C1", "=IF(ISTEXT(A1),\"text\",A1*2)").unwrap();
    assert_eq!(number(&sheet, "B1"), 5.0);
    assert_eq!(sheet.value("C1").unwrap(), Value::text("text"));

    sheet.set_cell("A1", "21").unwrap();
    assert_eq!(number(&sheet, "B1"), 2.0);
    assert_eq!(number(&sheet, "C1"), 42.0);

    sheet.set_cell("A1", "TRUE").unwrap();
    assert_eq!(number(&sheet, "B1"), 4.0);
}

#[test]
fn test_formula_replaced_by_literal() {
    let mut sheet = Spreadsheet::new();
    sheet.set_cell("A1", "1").unwrap();
    sheet.set_cell("B1", "=A1+1").unwrap();
    sheet.set_cell("C1", "=B1*3").unwrap();

    sheet.set_cell("B1", "10").unwrap();
    assert_eq!(number(&sheet, "C1"), 30.0);

    let stats = sheet.set_cell("A1", "2").unwrap();
    assert_eq!(stats.cells_calculated, 0);
    assert_eq!(number(&sheet, "B1"), 10.0);
}

#[test]
fn test_copy_formula_shifts_references() {
    let mut sheet = Spreadsheet::new();
    sheet.set_cell("A1", "1").unwrap();
    sheet.set_cell("A2", "2").unwrap();
    sheet.set_cell("B1", "10").unwrap();
    sheet.set_cell("C1", "=A1*$B$1").unwrap();

    sheet.copy_formula("C1", "C2").unwrap();
    assert_eq!(sheet.formula("C2").unwrap().as_deref(), Some("=A2*$B$1"));
    assert_eq!(number(&sheet, "C2"), 20.0);

    // Literals copy as values, empty sources clear
    sheet.copy_formula("B1", "D1").unwrap();
    assert_eq!(number(&sheet, "D1"), 10.0);
    sheet.copy_formula("Z9", "D1").unwrap();
    assert_eq!(sheet.value("D1").unwrap(), Value::Empty);
}

#[test]
fn test_copy_off_grid_fails_cleanly() {
    let mut sheet = Spreadsheet::new();
    sheet.set_cell("B2", "=A1").unwrap();
    sheet.set_cell("A1", "keep").unwrap();

    let err = sheet.copy_formula("B2", "A1").unwrap_err();
    assert!(matches!(err, Error::Formula(FormulaError::InvalidReference(_))));
    assert_eq!(sheet.value("A1").unwrap(), Value::text("keep"));
}

#[test]
fn test_fill_formula_down() {
    let mut sheet = Spreadsheet::new();
    for row in 1..=5 {
        sheet.set_cell(format!("A{}", row), &row.to_string()).unwrap();
    }
    sheet.set_cell("B1", "=SUM($A$1:A1)").unwrap();

    let stats = sheet
        .fill_formula("B1", ["B2", "B3", "B4", "B5"])
        .unwrap();
    assert_eq!(stats.cells_calculated, 4);
    assert_eq!(number(&sheet, "B5"), 15.0);

    // Running totals follow later edits
    sheet.set_cell("A1", "0").unwrap();
    assert_eq!(number(&sheet, "B5"), 14.0);
}

#[test]
fn test_fill_stops_at_first_failure() {
    let mut sheet = Spreadsheet::new();
    sheet.set_cell("A2", "=A1+1").unwrap();

    // Filling A2 into A1 would read above row 1
    let result = sheet.fill_formula("A2", ["A3", "A1", "A4"]);
    assert!(result.is_err());
    assert_eq!(sheet.formula("A3").unwrap().as_deref(), Some("=A2+1"));
    assert_eq!(sheet.formula("A4").unwrap(), None);
}

#[test]
fn test_recalculate_all_matches_incremental() {
    let mut sheet = Spreadsheet::new();
    sheet.set_cell("A1", "3").unwrap();
    sheet.set_cell("A2", "=A1^2").unwrap();
    sheet.set_cell("A3", "=A2-A1").unwrap();
    sheet.set_cell("B1", "=NOSUCH()").unwrap();
    let before: Vec<(CellKey, Value)> = sheet
        .cells()
        .into_iter()
        .map(|(k, v)| (k, v.clone()))
        .collect();

    let stats = sheet.recalculate_all();
    assert_eq!(stats, CalculationStats { cells_calculated: 3, errors: 1 });

    let after: Vec<(CellKey, Value)> = sheet
        .cells()
        .into_iter()
        .map(|(k, v)| (k, v.clone()))
        .collect();
    assert_eq!(after, before);
}

#[test]
fn test_wide_fan_out() {
    let mut sheet = Spreadsheet::new();
    sheet.set_cell("A1", "1").unwrap();
    for row in 1..=200u32 {
        let cell = CellAddress::new(row - 1, 1);
        sheet.set_cell(cell, &format!("=$A$1*{}", row)).unwrap();
    }
    sheet.set_cell("C1", "=SUM(B1:B200)").unwrap();

    let stats = sheet.set_cell("A1", "2").unwrap();
    assert_eq!(stats.cells_calculated, 201);
    assert_eq!(number(&sheet, "C1"), 2.0 * 200.0 * 201.0 / 2.0);
}
