/// Test fixtures: representative JSON payloads from the data services.
///
/// Structurally complete but truncated to the minimum needed to exercise
/// the parsers. All grid fixtures assume the 1x2 cell test region used by
/// the parser tests (one row, two columns at 500 m).

/// Two radar scenes over a 1x2 grid. The first scene has a no-data cell,
/// the second is fully valid. Power values are linear, not dB.
pub(crate) fn fixture_scene_list() -> &'static str {
    r#"{
      "scenes": [
        { "date": "2024-01-02", "power": [0.01, null] },
        { "date": "2024-01-05", "power": [0.02, 0.03] }
      ]
    }"#
}

/// Water-occurrence grid over the 1x2 test region: one permanent-water
/// cell (80%) and one dry cell (10%).
pub(crate) fn fixture_occurrence_grid() -> &'static str {
    r#"{ "values": [80.0, 10.0] }"#
}

/// Three days of mean daily precipitation, out of date order to exercise
/// the client-side sort.
pub(crate) fn fixture_rainfall() -> &'static str {
    r#"{
      "records": [
        { "date": "2024-01-03", "rain_mm": 25.5 },
        { "date": "2024-01-01", "rain_mm": 0.0 },
        { "date": "2024-01-02", "rain_mm": 4.2 }
      ]
    }"#
}
