use lineio::testing::{Gender, Person, sample_people};
use lineio::{
    ColumnBinding, Conversions, FieldIssue, FieldType, MapError, ParseError, Record, RowConverter,
    RowJoiner, Schema, SelectionPolicy, SheetCell, SheetRow, record,
};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default, PartialEq)]
struct Pair {
    a: String,
    b: String,
}

record!(Pair { a, b });

#[derive(Debug, Default, PartialEq)]
struct Counts {
    x: i32,
    y: i32,
    label: String,
}

record!(Counts { x, y, label });

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(ToString::to_string).collect()
}

#[test]
fn joiner_and_converter_round_trip() -> anyhow::Result<()> {
    let joiner = RowJoiner::<Person>::new()?;
    let converter = RowConverter::<Person>::new()?;
    for person in sample_people() {
        let cells = joiner.to_row(&person);
        assert_eq!(converter.to_record(&cells), person);
    }
    Ok(())
}

#[test]
fn joiner_formats_in_plan_order() -> anyhow::Result<()> {
    let joiner = RowJoiner::<Person>::new()?;
    let ada = &sample_people()[0];
    assert_eq!(joiner.join(ada, "|"), "Ada|Female|36|1815001|1.65|true");
    assert_eq!(joiner.header(","), "name,gender,age,id,height,active");
    Ok(())
}

#[test]
fn bad_cells_leave_defaults() -> anyhow::Result<()> {
    let converter = RowConverter::<Person>::new()?;
    let person = converter.to_record(&row(&["Eve", "Robot", "x", "", "1.7"]));
    assert_eq!(person.name, "Eve");
    assert_eq!(person.gender, Gender::Female);
    assert_eq!(person.age, 0);
    assert_eq!(person.id, 0);
    assert!((person.height - 1.7).abs() < f64::EPSILON);
    assert!(!person.active);
    Ok(())
}

#[test]
fn issues_distinguish_absent_from_malformed() -> anyhow::Result<()> {
    let seen: Arc<Mutex<Vec<FieldIssue>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let converter = RowConverter::<Counts>::new()?
        .on_field_error(move |issue| sink.lock().unwrap().push(issue.clone()));

    let counts = converter.to_record(&row(&["seven"]));
    assert_eq!(counts, Counts::default());

    let issues = seen.lock().unwrap();
    assert_eq!(issues.len(), 3);
    assert_eq!(issues[0].field, "x");
    assert_eq!(issues[0].slot, Some(0));
    assert!(
        matches!(issues[0].error, ParseError::Malformed { ref value, .. } if value == "seven")
    );
    assert_eq!(issues[1].field, "y");
    assert_eq!(issues[1].error, ParseError::Absent);
    assert_eq!(issues[2].field, "label");
    assert_eq!(issues[2].slot, Some(2));
    Ok(())
}

#[test]
fn empty_text_is_a_value_for_strings() -> anyhow::Result<()> {
    let converter = RowConverter::<Counts>::new()?;
    let counts = converter.to_record(&row(&["1", "2", ""]));
    assert_eq!(
        counts,
        Counts {
            x: 1,
            y: 2,
            label: String::new(),
        }
    );
    Ok(())
}

#[test]
fn reorder_reads_fields_from_bound_slots() -> anyhow::Result<()> {
    let mut converter = RowConverter::<Pair>::new()?;
    converter.reset_order(vec![1, 0])?;
    let pair = converter.to_record(&row(&["X", "Y", "Z"]));
    assert_eq!(
        pair,
        Pair {
            a: "Y".into(),
            b: "X".into(),
        }
    );
    Ok(())
}

#[test]
fn letters_bind_spreadsheet_columns() -> anyhow::Result<()> {
    let mut converter = RowConverter::<Pair>::new()?;
    let binding = ColumnBinding::from_letters("C,A")?.expect("binding");
    converter.reset_order(binding)?;
    let pair = converter.to_record(&row(&["X", "Y", "Z"]));
    assert_eq!(
        pair,
        Pair {
            a: "Z".into(),
            b: "X".into(),
        }
    );
    Ok(())
}

#[test]
fn short_binding_leaves_trailing_fields_absent() -> anyhow::Result<()> {
    let mut converter = RowConverter::<Pair>::new()?;
    converter.reset_order(vec![2])?;
    let pair = converter.to_record(&row(&["X", "Y", "Z"]));
    assert_eq!(
        pair,
        Pair {
            a: "Z".into(),
            b: String::new(),
        }
    );
    Ok(())
}

#[test]
fn binding_locks_after_first_row() -> anyhow::Result<()> {
    let mut converter = RowConverter::<Pair>::new()?;
    converter.reset_order(vec![1, 0])?;
    let _ = converter.to_record(&row(&["X", "Y"]));
    assert!(converter.started());

    converter.reset_order(vec![1, 0])?;
    let err = converter.reset_order(vec![0, 1]).unwrap_err();
    assert_eq!(err, MapError::BindingLocked("Pair"));

    let mut fresh = converter.clone();
    assert!(!fresh.started());
    fresh.reset_order(vec![0, 1])?;
    Ok(())
}

#[test]
fn header_binding_matches_names_exactly() -> anyhow::Result<()> {
    let mut converter = RowConverter::<Pair>::new()?;
    converter.bind_header(&row(&["b", "a"]), &["a", "b"])?;
    assert_eq!(converter.binding().map(ColumnBinding::slots), Some(&[1, 0][..]));

    let err = RowConverter::<Pair>::new()?
        .bind_header(&row(&["A", "b"]), &["a", "b"])
        .unwrap_err();
    assert!(matches!(err, MapError::MissingColumn { ref column, .. } if column == "a"));
    Ok(())
}

#[test]
fn sheet_cells_convert_by_type() -> anyhow::Result<()> {
    let converter = RowConverter::<Person>::new()?;
    let sheet: SheetRow = [
        SheetCell::from("Ada"),
        SheetCell::from("Female"),
        SheetCell::from(36.0),
        SheetCell::from(1_815_001.0),
        SheetCell::from(1.65),
        SheetCell::from(true),
    ]
    .into_iter()
    .collect();
    assert_eq!(converter.to_record(&sheet), sample_people()[0]);

    let labels = RowConverter::<Counts>::new()?;
    let sheet = SheetRow(vec![SheetCell::Empty, 2.0.into(), 3.0.into()]);
    assert_eq!(
        labels.to_record(&sheet),
        Counts {
            x: 0,
            y: 2,
            label: "3".into(),
        }
    );
    Ok(())
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Cents(i64);

impl FieldType for Cents {}

#[derive(Debug, Default, PartialEq)]
struct Item {
    name: String,
    price: Cents,
}

impl Record for Item {
    fn declare(schema: &mut Schema<Self>) {
        schema
            .field("name", &[], |r: &Self| &r.name, |r: &mut Self| &mut r.name)
            .field("price", &[], |r: &Self| &r.price, |r: &mut Self| &mut r.price);
    }

    fn conversions() -> Conversions {
        Conversions::new()
            .parser(|text: &str| {
                let (units, cents) = text.split_once('.').unwrap_or((text, "0"));
                let cents = units.parse::<i64>()? * 100 + cents.parse::<i64>()?;
                Ok::<_, std::num::ParseIntError>(Cents(cents))
            })
            .formatter(|c: &Cents| format!("{}.{:02}", c.0 / 100, c.0 % 100))
    }
}

#[derive(Debug, Default)]
struct Unmapped {
    price: Cents,
}

record!(Unmapped { price });

#[test]
fn custom_types_need_registered_conversions() {
    let err = RowConverter::<Unmapped>::new().err();
    assert!(matches!(err, Some(MapError::NoParser { field: "price", record: "Unmapped", .. })));

    let err = RowJoiner::<Unmapped>::new().err();
    assert!(matches!(err, Some(MapError::NoFormatter { field: "price", .. })));
}

#[test]
fn type_level_conversions_apply() -> anyhow::Result<()> {
    let converter = RowConverter::<Item>::new()?;
    let item = converter.to_record(&row(&["tea", "3.50"]));
    assert_eq!(
        item,
        Item {
            name: "tea".into(),
            price: Cents(350),
        }
    );

    let joiner = RowJoiner::<Item>::new()?;
    assert_eq!(joiner.join(&item, ";"), "tea;3.50");
    Ok(())
}

#[test]
fn later_parsers_override_earlier_ones() -> anyhow::Result<()> {
    let conversions = Conversions::new()
        .parser(|text: &str| text.parse::<i32>())
        .parser(|text: &str| text.parse::<i32>().map(|n| n * 10));
    let converter = RowConverter::<Counts>::with(&SelectionPolicy::new(), &conversions)?;
    let counts = converter.to_record(&row(&["1", "2", "z"]));
    assert_eq!(
        counts,
        Counts {
            x: 10,
            y: 20,
            label: "z".into(),
        }
    );
    Ok(())
}

#[test]
fn mappers_compose_in_order_within_scope() -> anyhow::Result<()> {
    let conversions = Conversions::new()
        .mapper(|text| text.trim().to_string())
        .mapper_for(SelectionPolicy::new().include(["label"]), |text| text.to_uppercase())
        .mapper_for(SelectionPolicy::new().include(["label"]), |text| format!("<{text}>"));
    let converter = RowConverter::<Counts>::with(&SelectionPolicy::new(), &conversions)?;
    let counts = converter.to_record(&row(&[" 4 ", "5", " ok "]));
    assert_eq!(
        counts,
        Counts {
            x: 4,
            y: 5,
            label: "<OK>".into(),
        }
    );
    Ok(())
}

#[test]
fn explicit_policy_narrows_the_plan() -> anyhow::Result<()> {
    let policy = SelectionPolicy::new().include(["label", "y"]);
    let converter = RowConverter::<Counts>::with(&policy, &Conversions::new())?;
    let counts = converter.to_record(&row(&["9", "hello"]));
    assert_eq!(
        counts,
        Counts {
            x: 0,
            y: 9,
            label: "hello".into(),
        }
    );
    Ok(())
}
