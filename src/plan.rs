//! Field plans: the ordered set of fields that take part in mapping.

use crate::error::MapError;
use crate::field::{FieldDef, FieldKind, Record, Schema, Visibility};
use crate::selection::SelectionPolicy;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock, Mutex};

type PlanKey = (TypeId, SelectionPolicy);

static PLANS: LazyLock<Mutex<HashMap<PlanKey, Arc<dyn Any + Send + Sync>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Identity of a participating field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Position within the plan.
    pub ordinal: usize,
}

/// Ordered, de-duplicated fields of `R` selected by a policy.
pub struct FieldPlan<R> {
    record: &'static str,
    fields: Vec<FieldDef<R>>,
    descriptors: Vec<FieldDescriptor>,
}

impl<R: Record> FieldPlan<R> {
    /// Build the plan for `R` under `policy`, reusing a cached plan when one exists.
    ///
    /// Shared, constant and transient fields are always dropped. The candidate
    /// set is the private fields when `policy.private_fields` is set, the public
    /// fields otherwise. An empty plan is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidRegex`] if the active selection pattern is invalid.
    pub fn build(policy: &SelectionPolicy) -> Result<Arc<Self>, MapError> {
        let key = (TypeId::of::<R>(), policy.clone());
        if let Some(plan) = lock_plans().get(&key).cloned()
            && let Ok(plan) = plan.downcast::<Self>()
        {
            return Ok(plan);
        }

        let plan = Arc::new(Self::compute(policy)?);
        lock_plans().insert(key, Arc::clone(&plan) as Arc<dyn Any + Send + Sync>);
        Ok(plan)
    }

    fn compute(policy: &SelectionPolicy) -> Result<Self, MapError> {
        let schema = Schema::<R>::of();
        let selection = policy.compile()?;
        let wanted = if policy.private_fields {
            Visibility::Private
        } else {
            Visibility::Public
        };

        let mut seen = HashSet::new();
        let mut fields = Vec::new();
        for field in schema.fields() {
            if field.modifiers.excludes()
                || field.visibility != wanted
                || !selection.matches(field.name)
            {
                continue;
            }
            if !seen.insert(field.name) {
                tracing::warn!(
                    record = schema.record(),
                    field = field.name,
                    "duplicate field declaration ignored"
                );
                continue;
            }
            fields.push(field.clone());
        }

        let descriptors = fields
            .iter()
            .enumerate()
            .map(|(ordinal, f)| FieldDescriptor {
                name: f.name,
                kind: f.kind,
                ordinal,
            })
            .collect();

        Ok(Self {
            record: schema.record(),
            fields,
            descriptors,
        })
    }
}

impl<R> FieldPlan<R> {
    #[must_use]
    pub fn record(&self) -> &'static str {
        self.record
    }

    #[must_use]
    pub fn descriptors(&self) -> &[FieldDescriptor] {
        &self.descriptors
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.name).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn fields(&self) -> &[FieldDef<R>] {
        &self.fields
    }
}

impl<R> std::fmt::Debug for FieldPlan<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldPlan")
            .field("record", &self.record)
            .field("fields", &self.descriptors)
            .finish()
    }
}

fn lock_plans() -> std::sync::MutexGuard<'static, HashMap<PlanKey, Arc<dyn Any + Send + Sync>>> {
    // A poisoned cache only ever holds fully built plans.
    PLANS.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
