/// Opaque example identifier as it appears in the origin files.
/// Examples: `acibench_D2N001_virtassist_train`, `primock57_4_1`
pub type ExampleId = String;
/// Identifier for a collaborator that produced (or failed to produce) data.
/// Examples: `primock57`, `aci_bench:virtassist`
pub type SourceId = String;
/// ACI-Bench encounter identifier, upper-cased for lookups.
/// Example: `D2N088`
pub type EncounterId = String;
/// ACI-Bench subset name, lower-cased for lookups.
/// Examples: `virtassist`, `aci`, `virtscribe`
pub type SubsetName = String;
/// Speaker-tagged dialogue text.
/// Example: `[doctor] hello\n[patient] hi`
pub type Transcript = String;
/// Identifier written to assembled output rows.
/// Examples: `acibench_virtassist_train_D2N001`, `primock57_4_1`
pub type RowId = String;
/// Opaque order annotation carried through verbatim.
pub type OrderAnnotation = serde_json::Value;
