//! kb_blast Data Types
//!
//! Records mirroring the remote schema. They carry no behavior. Fields the
//! client does not know about are kept in `additional_properties`, so a
//! value read from the server and sent back is not altered on the way.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Workspace object reference, e.g. `"1234/5/6"`
pub type DataObjRef = String;

/// Workspace object name
pub type DataObjName = String;

/// Input to every search flavor (`BLAST_Params`)
///
/// Which fields are meaningful depends on the flavor:
///
/// - the query is `input_one_sequence` or `input_one_ref` (a SequenceSet,
///   Feature or FeatureSet)
/// - the targets in `input_many_refs` may be a SequenceSet,
///   SingleEndLibrary, FeatureSet, Genome or GenomeSet
/// - `rounds` only applies to PSI-BLAST
///
/// The count fields `maxaccepts` and `rounds` keep the number exactly as
/// given, so `3` goes out as `3` and not `3.0`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BlastParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_name: Option<String>,

    /// Raw query sequence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_one_sequence: Option<String>,

    /// Query object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_one_ref: Option<DataObjRef>,

    /// Target objects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_many_refs: Option<Vec<DataObjRef>>,

    /// Name for the object saved from `input_one_sequence`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_one_name: Option<DataObjName>,

    /// Name for the filtered hit set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_filtered_name: Option<DataObjName>,

    /// Minimum percent identity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ident_thresh: Option<f64>,

    /// E-value cutoff
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e_value: Option<f64>,

    /// Minimum bit score
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitscore: Option<f64>,

    /// Minimum fraction of the query covered by the alignment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlap_fraction: Option<f64>,

    /// Maximum number of hits kept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxaccepts: Option<Number>,

    /// Extra report format requested from BLAST
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_extra_format: Option<String>,

    /// PSI-BLAST iterations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounds: Option<Number>,

    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

/// Result of every search flavor (`BLAST_Output`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BlastOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_name: Option<DataObjName>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_ref: Option<DataObjRef>,

    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

/// Key-value mapping returned by `status`
pub type StatusInfo = Map<String, Value>;
