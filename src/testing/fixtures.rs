//! Pre-built records and datasets.

use crate::{cell_enum, record};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    Female,
    Male,
}

cell_enum!(Gender { Female, Male });

/// Sample record covering every built-in field kind.
///
/// `bmi` is transient: it never takes part in mapping.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub gender: Gender,
    pub age: i32,
    pub id: i64,
    pub height: f64,
    pub active: bool,
    #[serde(skip)]
    pub bmi: f64,
}

record!(Person {
    name,
    gender,
    age,
    id,
    height,
    active,
    #[transient]
    bmi,
});

impl Person {
    #[must_use]
    pub fn new(name: &str, gender: Gender, age: i32, id: i64, height: f64, active: bool) -> Self {
        Self {
            name: name.to_string(),
            gender,
            age,
            id,
            height,
            active,
            bmi: 0.0,
        }
    }
}

/// Three people, matching [`PEOPLE_CSV`].
///
/// ```
/// use lineio::testing::sample_people;
///
/// assert_eq!(sample_people().len(), 3);
/// ```
#[must_use]
pub fn sample_people() -> Vec<Person> {
    vec![
        Person::new("Ada", Gender::Female, 36, 1_815_001, 1.65, true),
        Person::new("Alan", Gender::Male, 41, 1_912_002, 1.78, false),
        Person::new("Grace", Gender::Female, 85, 1_906_003, 1.60, true),
    ]
}

/// Comma-separated text of [`sample_people`], with a header line.
pub const PEOPLE_CSV: &str = "\
name,gender,age,id,height,active
Ada,Female,36,1815001,1.65,true
Alan,Male,41,1912002,1.78,false
Grace,Female,85,1906003,1.6,true
";

/// Producer that counts how often it runs.
///
/// Clones share the counter, so a test can keep one handle and move another
/// into a deferred sequence.
#[derive(Clone, Debug, Default)]
pub struct CountingProducer {
    calls: Arc<AtomicUsize>,
}

impl CountingProducer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one run and return `items`.
    pub fn produce<T>(&self, items: Vec<T>) -> Vec<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        items
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}
