use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// The 'O' of OAR: the unambiguous test binary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
}

/// The 'A' of OAR, usually filled in after the initial upload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Analysis {
    NotAnalyzed,
    TruePositive,
    FalsePositive,
    TrueNegative,
    FalseNegative,
}

impl Default for Analysis {
    fn default() -> Self {
        Self::NotAnalyzed
    }
}

/// The 'R' of OAR, usually the last field to be enriched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Resolution {
    Unresolved,
    NotNeeded,
    TicketCreated,
    QuickFix,
    KnownIssue,
    TestFixed,
    TestDisabled,
}

impl Default for Resolution {
    fn default() -> Self {
        Self::Unresolved
    }
}

macro_rules! wire_strings {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(Self::$variant),)+
                    other => Err(format!(
                        "unrecognized {}: '{}'",
                        stringify!($ty).to_lowercase(),
                        other
                    )),
                }
            }
        }
    };
}

wire_strings!(Outcome { Passed, Failed });
wire_strings!(Analysis {
    NotAnalyzed,
    TruePositive,
    FalsePositive,
    TrueNegative,
    FalseNegative,
});
wire_strings!(Resolution {
    Unresolved,
    NotNeeded,
    TicketCreated,
    QuickFix,
    KnownIssue,
    TestFixed,
    TestDisabled,
});

/// A Test represents point-in-time information about a test that occurred on
/// a subject. The summary can be thought of as a title; if a test cannot be
/// described in a summary it is probably too broad. The doc is a free-form
/// JSON document for any metadata attached to the record.
///
/// `id`, `created`, and `modified` are assigned by the results service and
/// never generated client-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Test {
    #[serde(default)]
    pub id: u64,
    pub summary: String,
    pub outcome: Outcome,
    #[serde(default)]
    pub analysis: Analysis,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub doc: Map<String, Value>,
}

impl Test {
    pub fn new(summary: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            id: 0,
            summary: summary.into(),
            outcome,
            analysis: Analysis::default(),
            resolution: Resolution::default(),
            created: None,
            modified: None,
            doc: Map::new(),
        }
    }

    pub fn with_analysis(mut self, analysis: Analysis) -> Self {
        self.analysis = analysis;
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_doc_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.doc.insert(key.into(), value);
        self
    }

    /// Trims the whitespace around the summary.
    pub fn clean(&mut self) {
        self.summary = self.summary.trim().to_string();
    }

    /// Ensures the summary is non-blank and the analysis is consistent with
    /// the outcome. A passed test cannot carry a positive analysis, and a
    /// failed test cannot carry a negative one.
    pub fn validate(&self) -> Result<(), String> {
        if self.summary.trim().is_empty() {
            return Err("summary cannot be blank".to_string());
        }

        let valid_analyses: &[Analysis] = match self.outcome {
            Outcome::Passed => &[
                Analysis::NotAnalyzed,
                Analysis::TrueNegative,
                Analysis::FalseNegative,
            ],
            Outcome::Failed => &[
                Analysis::NotAnalyzed,
                Analysis::TruePositive,
                Analysis::FalsePositive,
            ],
        };

        if !valid_analyses.contains(&self.analysis) {
            return Err(format!(
                "invalid analysis '{}' for outcome '{}'",
                self.analysis, self.outcome
            ));
        }

        Ok(())
    }
}

/// The caller-visible view of a retrieved test: the fixed fields with the
/// doc's keys spread into the top level.
///
/// Right-merge semantics are preserved literally from the wire contract: on
/// a key collision the doc value wins, even when that shadows a fixed field
/// such as `outcome`, and the nested `doc` key itself stays in the record.
#[derive(Debug, Clone, PartialEq)]
pub struct TestRecord {
    fields: Map<String, Value>,
}

impl TestRecord {
    /// Server-assigned id, if the record still carries a numeric one.
    pub fn id(&self) -> Option<u64> {
        self.fields.get("id").and_then(Value::as_u64)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Field lookup ignoring ASCII case. An exact match wins over a
    /// case-insensitive one.
    pub fn get_ignore_case(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).or_else(|| {
            self.fields
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(field))
                .map(|(_, value)| value)
        })
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl From<Test> for TestRecord {
    fn from(test: Test) -> Self {
        let doc = test.doc.clone();
        let mut fields = match serde_json::to_value(&test) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for (key, value) in doc {
            fields.insert(key, value);
        }
        Self { fields }
    }
}

/// The test results and total match count associated with a query. `count`
/// covers every match, not just the page in `tests`.
#[derive(Debug, Clone, PartialEq)]
pub struct TestQueryResult {
    pub count: u64,
    pub tests: Vec<TestRecord>,
}
