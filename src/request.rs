//! Request / response contract
//!
//! ```json
//! {
//!   "inputCells": { "15yrlump": { "Xinput_datumvandaag": "2025-03-18", ... } },
//!   "outputCells": { "15yrlump": ["F31", "H50", "F84", "F86"] },
//!   "preFormulasActions": [],
//!   "postFormulasActions": [{ "type": "macro", "parameters": { "name": "lump15yrls" } }]
//! }
//! ```
//!
//! The response maps each requested sheet to its requested cells, in request
//! order; cells that are empty or cannot be addressed come back as `null`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::cells::{CellAddress, CellValue};
use crate::config::CalculationConfig;
use crate::dataset::StaticDataset;
use crate::error::Result;
use crate::input::{apply_inputs, InputCells};
use crate::solver::{run_macro, MacroReport, LUMP_SUM_MACRO};
use crate::workbook::Workbook;

pub const MACRO_ACTION: &str = "macro";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionParameters {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub parameters: ActionParameters,
}

impl Action {
    pub fn macro_named(name: &str) -> Self {
        Self {
            kind: MACRO_ACTION.to_string(),
            parameters: ActionParameters {
                name: Some(name.to_string()),
            },
        }
    }

    /// Macro name, when this is a macro action with a name
    pub fn macro_name(&self) -> Option<&str> {
        if self.kind == MACRO_ACTION {
            self.parameters.name.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRequest {
    #[serde(default)]
    pub input_cells: InputCells,
    #[serde(default)]
    pub output_cells: IndexMap<String, Vec<String>>,
    /// Accepted but not applied
    #[serde(default)]
    pub pre_formulas_actions: Vec<Action>,
    #[serde(default)]
    pub post_formulas_actions: Vec<Action>,
}

/// sheet -> cell reference -> resolved value, both levels in request order
pub type CalculationResponse = IndexMap<String, IndexMap<String, Option<CellValue>>>;

/// Everything a request produced, including the engine it ran on
pub struct Evaluation {
    pub workbook: Workbook,
    pub response: CalculationResponse,
    pub reports: Vec<MacroReport>,
}

impl CalculationRequest {
    /// Applicant born 1952-02-01, WOZ 220000, mortgage 95000, lump-sum macro
    pub fn example() -> Self {
        let value = json!({
            "inputCells": {
                "15yrlump": {
                    "Xinput_datumvandaag": "2025-03-18",
                    "Xinput_geboortedatumaanvrager1": "1952-02-01",
                    "Xinput_partnerjanee": "Nee",
                    "Xinput_hypotheekjanee": "Ja",
                    "Xinput_hypotheeksaldo": "95000",
                    "Xinput_marktwaarde": "550000",
                    "Xinput_wozwaarde": "220000"
                }
            },
            "outputCells": { "15yrlump": ["F31", "H50", "F84", "F86"] },
            "preFormulasActions": [],
            "postFormulasActions": [{ "type": "macro", "parameters": { "name": LUMP_SUM_MACRO } }]
        });
        serde_json::from_value(value).unwrap_or_default()
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Run the request on a fresh engine over `dataset`
    pub fn evaluate(&self, dataset: &StaticDataset, config: &CalculationConfig) -> Result<Evaluation> {
        let mut workbook = Workbook::new(dataset)?;
        let written = apply_inputs(&mut workbook, &self.input_cells);
        log::debug!("Applied {} input cell(s)", written.len());

        workbook.recalculate();

        if !self.pre_formulas_actions.is_empty() {
            log::warn!(
                "Ignoring {} pre-formula action(s); only post-formula actions are applied",
                self.pre_formulas_actions.len()
            );
        }

        let mut reports = Vec::new();
        for action in &self.post_formulas_actions {
            match action.macro_name() {
                Some(name) => reports.extend(run_macro(name, &mut workbook, config)),
                None => log::warn!("Skipping action {:?}", action),
            }
        }

        let response = extract_outputs(&workbook, &self.output_cells);
        Ok(Evaluation {
            workbook,
            response,
            reports,
        })
    }
}

/// Resolve the requested cells
pub fn extract_outputs(workbook: &Workbook, output_cells: &IndexMap<String, Vec<String>>) -> CalculationResponse {
    output_cells
        .iter()
        .map(|(sheet, refs)| {
            let values = refs
                .iter()
                .map(|cell| {
                    let value = match CellAddress::parse(sheet, cell) {
                        Ok(address) => workbook.get(&address),
                        Err(e) => {
                            log::warn!("Cannot read {}!{}: {}", sheet, cell, e);
                            None
                        }
                    };
                    (cell.clone(), value)
                })
                .collect();
            (sheet.clone(), values)
        })
        .collect()
}

/// Run a request against the embedded dataset
pub fn calculate(request: &CalculationRequest, config: &CalculationConfig) -> Result<CalculationResponse> {
    let dataset = StaticDataset::embedded()?;
    Ok(request.evaluate(dataset, config)?.response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{linear_residual_bound, GoalSeekStrategy};
    use serde_json::Value;

    fn number(response: &CalculationResponse, cell: &str) -> f64 {
        match response["15yrlump"][cell] {
            Some(CellValue::Number(n)) => n,
            ref other => panic!("{} is not a number: {:?}", cell, other),
        }
    }

    #[test]
    fn test_example_request_draw_below_minimum_does_not_qualify() {
        let request = CalculationRequest::example();
        let response = calculate(&request, &CalculationConfig::default()).unwrap();
        let sheet = &response["15yrlump"];
        assert_eq!(sheet.len(), 4);

        // max(1000 + 0.005 * 220000, 0.01 * (220000 - 95000))
        assert_eq!(number(&response, "F31"), 2100.0);
        let h50 = number(&response, "H50");
        assert!((h50 - 542.037).abs() < 1e-2, "H50 = {}", h50);

        // The solved first-year draw is below the minimum payment, so the
        // qualification check fails and the total payout is zero
        assert_eq!(sheet["F86"], Some(CellValue::text("No")));
        assert_eq!(number(&response, "F84"), 0.0);
    }

    #[test]
    fn test_qualifying_request() {
        let request: CalculationRequest = serde_json::from_value(json!({
            "inputCells": { "15yrlump": {
                "todayDate": "2025-03-18",
                "birthdate1": "1950-01-15",
                "hasPartner": "Nee",
                "hasMortgage": "Nee",
                "mortgageBalance": "0",
                "wozValue": "400,000"
            }},
            "outputCells": { "15yrlump": ["F13", "F29", "F31", "H50", "H51", "H64", "F84", "F86", "M64"] },
            "postFormulasActions": [{ "type": "macro", "parameters": { "name": "lump15yrls" } }]
        }))
        .unwrap();

        let evaluation = request
            .evaluate(StaticDataset::embedded().unwrap(), &CalculationConfig::default())
            .unwrap();
        let response = &evaluation.response;
        assert_eq!(number(response, "F13"), 75.0);
        assert_eq!(number(response, "F29"), 272000.0);
        assert_eq!(number(response, "F31"), 4000.0);
        assert_eq!(number(response, "H51"), 4000.0);
        assert_eq!(number(response, "H64"), 4000.0);
        assert_eq!(response["15yrlump"]["F86"], Some(CellValue::text("Yes")));

        let h50 = number(response, "H50");
        assert!((number(response, "F84") - (h50 + 14.0 * 4000.0)).abs() < 1e-6);

        let report = &evaluation.reports[0];
        let bound = linear_residual_bound(&evaluation.workbook, report.seed, h50);
        let residual = number(response, "M64") - 272000.0;
        assert!(residual.abs() <= bound, "residual {} > {}", residual, bound);
    }

    #[test]
    fn test_strategies_agree_closely() {
        let request = CalculationRequest::example();
        let dataset = StaticDataset::embedded().unwrap();
        let linear = request.evaluate(dataset, &CalculationConfig::default()).unwrap();
        let iterate = request
            .evaluate(dataset, &CalculationConfig::new(GoalSeekStrategy::iterate()))
            .unwrap();

        let linear_h50 = number(&linear.response, "H50");
        let iterate_h50 = number(&iterate.response, "H50");
        assert!(iterate.reports[0].outcome.within(0.01));

        // Between the two draws M64 grows at least one for one with H50
        let bound = linear_residual_bound(&linear.workbook, linear.reports[0].seed, linear_h50);
        assert!((linear_h50 - iterate_h50).abs() <= bound + 0.01, "{} vs {}", linear_h50, iterate_h50);
        assert!((linear_h50 - iterate_h50).abs() < 1.0, "{} vs {}", linear_h50, iterate_h50);
    }

    #[test]
    fn test_response_keeps_request_order() {
        let request = CalculationRequest::from_json(
            r#"{
                "outputCells": { "param15yrlump": ["E6", "E5"], "15yrlump": ["H50", "F31", "F86", "A1"] }
            }"#,
        )
        .unwrap();
        let response = calculate(&request, &CalculationConfig::default()).unwrap();

        let sheets: Vec<&str> = response.keys().map(String::as_str).collect();
        assert_eq!(sheets, ["param15yrlump", "15yrlump"]);
        let cells: Vec<&str> = response["15yrlump"].keys().map(String::as_str).collect();
        assert_eq!(cells, ["H50", "F31", "F86", "A1"]);

        let json = serde_json::to_string(&response).unwrap();
        let positions: Vec<usize> = ["\"E6\"", "\"E5\"", "\"H50\"", "\"F31\"", "\"F86\"", "\"A1\""]
            .iter()
            .map(|key| json.find(key).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", json);
    }

    #[test]
    fn test_pre_actions_are_not_applied() {
        let mut request = CalculationRequest::example();
        request.pre_formulas_actions = std::mem::take(&mut request.post_formulas_actions);
        let evaluation = request
            .evaluate(StaticDataset::embedded().unwrap(), &CalculationConfig::default())
            .unwrap();
        assert!(evaluation.reports.is_empty());
        // H50 keeps its dataset value
        assert_eq!(number(&evaluation.response, "H50"), -254.39000000000524);
    }

    #[test]
    fn test_unknown_outputs_are_null() {
        let request: CalculationRequest = serde_json::from_value(json!({
            "outputCells": { "15yrlump": ["F31", "ZZ0", "A1"], "Sheet2": ["A1"] },
            "postFormulasActions": [{ "type": "macro", "parameters": { "name": "other" } }, { "type": "script" }]
        }))
        .unwrap();
        let response = calculate(&request, &CalculationConfig::default()).unwrap();
        assert_eq!(response["15yrlump"]["ZZ0"], None);
        assert_eq!(response["15yrlump"]["A1"], None);
        assert_eq!(response["Sheet2"]["A1"], None);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["Sheet2"]["A1"], Value::Null);
        assert_eq!(json["15yrlump"]["F31"], json!(2100.0));
    }

    #[test]
    fn test_action_contract() {
        let action: Action = serde_json::from_str(r#"{"type":"macro","parameters":{"name":"lump15yrls"}}"#).unwrap();
        assert_eq!(action, Action::macro_named(LUMP_SUM_MACRO));
        assert_eq!(action.macro_name(), Some("lump15yrls"));

        let other: Action = serde_json::from_str(r#"{"type":"formula"}"#).unwrap();
        assert_eq!(other.macro_name(), None);
    }
}
