//! Aggregation pipelines evaluated over flattened document records.
//!
//! Only the stages the resource statistics need are supported: `Match`,
//! `Group` (with `Count`, `Sum` and `Avg` accumulators), `Sort` and `Limit`.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::{Number, Value};

use crate::model::document::{Fields, Filter};

/// Value expression evaluated against a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Numeric value of a field.
    Field(String),
    /// Length of a string field in Unicode code points.
    StrLen(String),
}

impl Expr {
    #[expect(clippy::cast_precision_loss)]
    fn eval(&self, record: &Fields) -> Option<f64> {
        match self {
            Self::Field(name) => record.get(name).and_then(Value::as_f64),
            Self::StrLen(name) => record
                .get(name)
                .and_then(Value::as_str)
                .map(|s| s.chars().count() as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accumulator {
    Count,
    Sum(Expr),
    /// Mean over the records where the expression evaluates; `null` if none do.
    Avg(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStage {
    /// Field to group by; `None` collapses everything into one group keyed `null`.
    pub key: Option<String>,
    pub outputs: Vec<(String, Accumulator)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Group(GroupStage),
    Sort { field: String, descending: bool },
    Limit(usize),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    #[must_use]
    pub fn matching(mut self, filter: Filter) -> Self {
        self.stages.push(Stage::Match(filter));
        self
    }

    #[must_use]
    pub fn group(mut self, key: Option<&str>, outputs: Vec<(&str, Accumulator)>) -> Self {
        self.stages.push(Stage::Group(GroupStage {
            key: key.map(str::to_string),
            outputs: outputs
                .into_iter()
                .map(|(name, acc)| (name.to_string(), acc))
                .collect(),
        }));
        self
    }

    #[must_use]
    pub fn sort(mut self, field: &str, descending: bool) -> Self {
        self.stages.push(Stage::Sort {
            field: field.to_string(),
            descending,
        });
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.stages.push(Stage::Limit(limit));
        self
    }

    /// ## Summary
    /// Evaluates the whole pipeline over the given records.
    #[must_use]
    pub fn run(&self, records: Vec<Fields>) -> Vec<Fields> {
        Self::run_stages(&self.stages, records)
    }

    /// ## Summary
    /// Evaluates a slice of stages in order.
    #[must_use]
    pub fn run_stages(stages: &[Stage], mut records: Vec<Fields>) -> Vec<Fields> {
        for stage in stages {
            records = match stage {
                Stage::Match(filter) => records.into_iter().filter(|r| filter.matches(r)).collect(),
                Stage::Group(group) => run_group(group, records),
                Stage::Sort { field, descending } => {
                    records.sort_by(|a, b| {
                        let ordering = compare_values(a.get(field), b.get(field));
                        if *descending {
                            ordering.reverse()
                        } else {
                            ordering
                        }
                    });
                    records
                }
                Stage::Limit(limit) => {
                    records.truncate(*limit);
                    records
                }
            };
        }
        records
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct AccState {
    count: u64,
    sum: f64,
    contributing: u64,
}

fn run_group(group: &GroupStage, records: Vec<Fields>) -> Vec<Fields> {
    let mut order: Vec<(Value, Vec<AccState>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let key = group
            .key
            .as_ref()
            .and_then(|field| record.get(field).cloned())
            .unwrap_or(Value::Null);

        let slot = *index.entry(key.to_string()).or_insert_with(|| {
            order.push((key.clone(), vec![AccState::default(); group.outputs.len()]));
            order.len() - 1
        });

        for ((_, accumulator), state) in group.outputs.iter().zip(order[slot].1.iter_mut()) {
            state.count += 1;
            let value = match accumulator {
                Accumulator::Count => None,
                Accumulator::Sum(expr) | Accumulator::Avg(expr) => expr.eval(&record),
            };
            if let Some(value) = value {
                state.sum += value;
                state.contributing += 1;
            }
        }
    }

    order
        .into_iter()
        .map(|(key, states)| {
            let mut out = Fields::new();
            out.insert("_id".to_string(), key);
            for ((name, accumulator), state) in group.outputs.iter().zip(states) {
                out.insert(name.clone(), finish(accumulator, state));
            }
            out
        })
        .collect()
}

#[expect(clippy::cast_precision_loss)]
fn finish(accumulator: &Accumulator, state: AccState) -> Value {
    match accumulator {
        Accumulator::Count => Value::from(state.count),
        Accumulator::Sum(_) => float(state.sum),
        Accumulator::Avg(_) if state.contributing == 0 => Value::Null,
        Accumulator::Avg(_) => float(state.sum / state.contributing as f64),
    }
}

fn float(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// Orders `null`/missing first, then numbers, then strings, then everything else.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(_) => 3,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
