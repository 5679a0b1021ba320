//! impstats record decoding.
//!
//! A record is one JSON object per line. `name` and `origin` identify the
//! reporting object; every other field is either a scalar counter or a bucket
//! of named counters (`values`, dynstats buckets, per-worker maps).
//!
//! Decoding is a pure step: it turns text into a flat list of [`Sample`]s
//! without touching the store, so it can run outside the store lock.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ExporterError, Result};
use crate::normalize::{metric_name, normalize};

/// Prefix shared by every derived metric.
pub const METRIC_PREFIX: &str = "rsyslog";

/// Instance name of the per-cycle global record.
pub const GLOBAL_NAME: &str = "global";

/// Origin of user-defined dynamic-stats buckets.
pub const DYNSTATS_ORIGIN: &str = "dynstats.bucket";

/// omkafka reports no `origin` field (rsyslog issue #1508).
const OMKAFKA: &str = "omkafka";

const VALUES_FIELD: &str = "values";

/// A field value as reported by impstats.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(f64),
    /// Entries are kept as raw JSON; only numeric ones are folded.
    Bucket(BTreeMap<String, Value>),
    /// Strings, booleans, nulls, arrays. Carried, never folded.
    Other(Value),
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    origin: Option<String>,
    #[serde(flatten)]
    fields: BTreeMap<String, FieldValue>,
}

/// One decoded stats line.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRecord {
    pub origin: String,
    pub name: String,
    pub fields: BTreeMap<String, FieldValue>,
}

/// One (metric, label) observation ready to be folded.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub metric: String,
    pub label: String,
    pub value: f64,
}

impl StatsRecord {
    /// Decode a JSON object into a record.
    pub fn decode(text: &str) -> Result<Self> {
        let raw: RawRecord =
            serde_json::from_str(text).map_err(|e| ExporterError::InvalidJson(e.to_string()))?;

        let name = raw.name.ok_or(ExporterError::MissingName)?;
        let origin = match raw.origin {
            Some(origin) => origin,
            None if name == OMKAFKA => OMKAFKA.to_string(),
            None => return Err(ExporterError::MissingOrigin(name)),
        };

        Ok(Self {
            origin,
            name,
            fields: raw.fields,
        })
    }

    /// The record that opens a new reporting cycle.
    pub fn is_global(&self) -> bool {
        self.name == GLOBAL_NAME
    }

    /// `rsyslog_<origin>`.
    pub fn metric_base(&self) -> String {
        format!("{METRIC_PREFIX}_{}", normalize(&self.origin))
    }

    /// Flatten the record into samples.
    ///
    /// Fails without producing anything if any part of the record is
    /// malformed, so a bad line never half-applies.
    pub fn samples(&self) -> Result<Vec<Sample>> {
        let base = self.metric_base();
        if self.is_global() {
            self.global_samples(&base)
        } else {
            Ok(self.instance_samples(&base))
        }
    }

    /// Global counters arrive as `<instance>.<counter>` keys under `values`.
    fn global_samples(&self, base: &str) -> Result<Vec<Sample>> {
        let Some(FieldValue::Bucket(values)) = self.fields.get(VALUES_FIELD) else {
            return Err(ExporterError::MissingValues);
        };

        let mut out = Vec::with_capacity(values.len());
        for (key, value) in values {
            let (instance, counter) = key
                .split_once('.')
                .ok_or_else(|| ExporterError::InvalidCounterKey(key.clone()))?;
            let Some(value) = numeric(VALUES_FIELD, key, value) else {
                continue;
            };
            out.push(Sample {
                metric: metric_name(base, counter),
                label: instance.to_string(),
                value,
            });
        }
        Ok(out)
    }

    fn instance_samples(&self, base: &str) -> Vec<Sample> {
        let mut out = Vec::new();
        for (field, value) in &self.fields {
            match value {
                FieldValue::Scalar(v) => out.push(Sample {
                    metric: metric_name(base, field),
                    label: self.name.clone(),
                    value: *v,
                }),
                FieldValue::Bucket(bucket) => {
                    // Dynstats bucket names are user-defined; fold them into
                    // the metric name to keep label cardinality bounded.
                    let metric = if self.origin == DYNSTATS_ORIGIN {
                        format!("{METRIC_PREFIX}_dynstats_{}", normalize(&self.name))
                    } else {
                        metric_name(base, field)
                    };
                    for (key, v) in bucket {
                        if let Some(value) = numeric(field, key, v) {
                            out.push(Sample {
                                metric: metric.clone(),
                                label: key.clone(),
                                value,
                            });
                        }
                    }
                }
                FieldValue::Other(other) => {
                    tracing::trace!(
                        origin = %self.origin,
                        name = %self.name,
                        field = %field,
                        value = %other,
                        "skipping non-numeric field"
                    );
                }
            }
        }
        out
    }
}

fn numeric(field: &str, key: &str, value: &Value) -> Option<f64> {
    let v = value.as_f64();
    if v.is_none() {
        tracing::trace!(
            field = %field,
            key = %key,
            value = %value,
            "skipping non-numeric bucket entry"
        );
    }
    v
}
