use driftql_core::driver::TypeParseFormatter;
use serde::Deserialize;

/// One round-trip case: `raw` is parsed and re-formatted; the result must
/// equal `normalized` when present, otherwise `raw` itself.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeCase {
    pub raw: String,
    #[serde(default)]
    pub normalized: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    cases: Vec<TypeCase>,
}

/// Runs a YAML manifest of type round-trip cases against a dialect's type
/// codec. Panics with the offending case on mismatch, so failures read like
/// regular assertion output.
pub fn run_type_cases(types: &dyn TypeParseFormatter, yaml: &str) {
    let manifest: Manifest = serde_yaml::from_str(yaml).expect("well-formed type case manifest");
    assert!(
        !manifest.cases.is_empty(),
        "type case manifest must not be empty"
    );

    for case in &manifest.cases {
        let parsed = types
            .parse_type(&case.raw)
            .unwrap_or_else(|error| panic!("parse {:?}: {error}", case.raw));
        let formatted = types
            .format_type(&parsed)
            .unwrap_or_else(|error| panic!("format {:?} (from {:?}): {error}", parsed, case.raw));
        let expected = case.normalized.as_deref().unwrap_or(case.raw.as_str());
        assert_eq!(
            formatted, expected,
            "round-trip of {:?} diverged (parsed as {parsed:?})",
            case.raw
        );

        // Formatting must reach a fixpoint: parsing the formatted spelling
        // and formatting again yields the same text.
        let reparsed = types
            .parse_type(&formatted)
            .unwrap_or_else(|error| panic!("re-parse {formatted:?}: {error}"));
        let reformatted = types
            .format_type(&reparsed)
            .unwrap_or_else(|error| panic!("re-format {reparsed:?}: {error}"));
        assert_eq!(
            reformatted, formatted,
            "formatting of {:?} is not a fixpoint",
            case.raw
        );
    }
}
