//! Request kinds, their function schemas, and schema-checked decoding.

use super::InsightError;
use crate::models::{
    CorrelationJudgment, InsightResponse, RankedSelection, ReportDraft,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

/// The two kinds of request sent to the reasoning service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Do the two top columns share semantic meaning?
    CorrelationJudgment,
    /// Chart caption and README narrative.
    ReportGeneration,
}

/// Function definition in the chat-completions `functions` array.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl RequestKind {
    /// Name of the function the service is forced to call.
    pub fn function_name(self) -> &'static str {
        match self {
            RequestKind::CorrelationJudgment => "judge_column_correlation",
            RequestKind::ReportGeneration => "draft_report_narrative",
        }
    }

    /// Human-readable operation name used in logs and the report.
    pub fn operation(self) -> &'static str {
        match self {
            RequestKind::CorrelationJudgment => "correlation judgment",
            RequestKind::ReportGeneration => "report narrative",
        }
    }

    pub fn definition(self) -> FunctionDefinition {
        let (description, parameters) = match self {
            RequestKind::CorrelationJudgment => (
                "Analyzes correlations between columns",
                json!({
                    "type": "object",
                    "properties": {
                        "is_columns_common": {
                            "type": "boolean",
                            "description": "Are columns similar?"
                        },
                        "reason": {
                            "type": "string",
                            "description": "Explanation for the correlation behavior"
                        }
                    },
                    "required": ["is_columns_common", "reason"]
                }),
            ),
            RequestKind::ReportGeneration => (
                "Drafts a chart caption and README narrative for the analysis",
                json!({
                    "type": "object",
                    "properties": {
                        "python_code": {
                            "type": "string",
                            "description": "Python code for visualization"
                        },
                        "chart_name": {
                            "type": "string",
                            "description": "Name of the generated chart"
                        },
                        "readme_file_summary": {
                            "type": "string",
                            "description": "Content for the README file"
                        }
                    },
                    "required": ["python_code", "chart_name", "readme_file_summary"]
                }),
            ),
        };

        FunctionDefinition {
            name: self.function_name().to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    /// Decode function-call arguments into the typed answer for this kind.
    ///
    /// Arguments may arrive as a JSON-encoded string or as an object.
    pub fn decode(self, arguments: &Value) -> Result<InsightResponse, InsightError> {
        match self {
            RequestKind::CorrelationJudgment => {
                decode_arguments::<CorrelationJudgment>(arguments).map(InsightResponse::Correlation)
            }
            RequestKind::ReportGeneration => {
                decode_arguments::<ReportDraft>(arguments).map(InsightResponse::Report)
            }
        }
    }
}

fn decode_arguments<T: DeserializeOwned>(arguments: &Value) -> Result<T, InsightError> {
    let parsed = match arguments {
        Value::String(raw) => serde_json::from_str(raw),
        other => serde_json::from_value(other.clone()),
    };

    parsed.map_err(|e| InsightError::MalformedResponse(format!("arguments do not match schema: {}", e)))
}

/// A request ready to send: instructions, a data bundle, and the answer kind.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightRequest {
    pub kind: RequestKind,
    pub instructions: String,
    pub data: Value,
}

impl InsightRequest {
    /// Ask whether the two most correlated columns share meaning.
    pub fn correlation_judgment(
        dataset: &str,
        columns: &[&str],
        selection: &RankedSelection,
    ) -> Self {
        let instructions = format!(
            "Dataset: {}\n\
             Columns: {}\n\
             Based on the column summaries, determine if the two most correlated columns \
             have common features. Also, explain why they might or might not be correlated, \
             and if common columns exist, consider if they could be output values.",
            dataset,
            columns.join(", ")
        );

        Self {
            kind: RequestKind::CorrelationJudgment,
            instructions,
            data: serde_json::to_value(&selection.summaries).unwrap_or(Value::Null),
        }
    }

    /// Ask for a chart caption and README narrative.
    pub fn report_generation(
        dataset: &str,
        selection: &RankedSelection,
        chart_files: &[String],
        judgment: Option<&InsightResponse>,
    ) -> Self {
        let instructions = format!(
            "Dataset: {}\n\
             You are writing the README for an automated analysis of this dataset. \
             The charts listed in the data are scatter plots with a regression line for \
             the most correlated column pairs. Summarise what the correlations and column \
             statistics reveal, suggest a short chart name, and include python code that \
             would reproduce the first chart.",
            dataset
        );

        let pairs: Vec<Value> = selection
            .pairs()
            .map(|p| {
                json!({
                    "columns": [p.first, p.second],
                    "correlation": p.correlation,
                })
            })
            .collect();

        Self {
            kind: RequestKind::ReportGeneration,
            instructions,
            data: json!({
                "pairs": pairs,
                "summaries": selection.summaries,
                "charts": chart_files,
                "judgment": judgment,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnPair, ColumnSummaryBundle};

    fn selection() -> RankedSelection {
        RankedSelection {
            max_corr_pair: ColumnPair::new("price", "revenue", 0.97),
            second_max_corr_pair: Some(ColumnPair::new("quantity", "revenue", 0.91)),
            summaries: ColumnSummaryBundle::default(),
        }
    }

    #[test]
    fn test_definitions_declare_required_fields() {
        let def = RequestKind::CorrelationJudgment.definition();
        assert_eq!(def.name, "judge_column_correlation");
        assert_eq!(
            def.parameters["required"],
            json!(["is_columns_common", "reason"])
        );

        let def = RequestKind::ReportGeneration.definition();
        assert_eq!(
            def.parameters["required"],
            json!(["python_code", "chart_name", "readme_file_summary"])
        );
    }

    #[test]
    fn test_decode_string_arguments() {
        let args = json!(r#"{"is_columns_common": false, "reason": "independent"}"#);
        let decoded = RequestKind::CorrelationJudgment.decode(&args).unwrap();

        assert_eq!(
            decoded,
            InsightResponse::Correlation(CorrelationJudgment {
                is_columns_common: false,
                reason: "independent".to_string(),
            })
        );
    }

    #[test]
    fn test_decode_object_arguments() {
        let args = json!({
            "python_code": "print(1)",
            "chart_name": "Price vs Revenue",
            "readme_file_summary": "Revenue tracks price."
        });

        let decoded = RequestKind::ReportGeneration.decode(&args).unwrap();
        assert!(matches!(decoded, InsightResponse::Report(ref d) if d.chart_name == "Price vs Revenue"));
    }

    #[test]
    fn test_decode_missing_field_is_malformed() {
        let args = json!({"is_columns_common": true});
        let err = RequestKind::CorrelationJudgment.decode(&args).unwrap_err();
        assert!(matches!(err, InsightError::MalformedResponse(ref m) if m.contains("reason")));
    }

    #[test]
    fn test_decode_wrong_type_is_malformed() {
        let args = json!({"is_columns_common": "yes", "reason": "x"});
        let err = RequestKind::CorrelationJudgment.decode(&args).unwrap_err();
        assert!(matches!(err, InsightError::MalformedResponse(_)));
    }

    #[test]
    fn test_decode_invalid_json_string_is_malformed() {
        let args = json!("{not json");
        let err = RequestKind::ReportGeneration.decode(&args).unwrap_err();
        assert!(matches!(err, InsightError::MalformedResponse(_)));
    }

    #[test]
    fn test_correlation_request_mentions_dataset_and_columns() {
        let request =
            InsightRequest::correlation_judgment("sales.csv", &["price", "quantity"], &selection());

        assert_eq!(request.kind, RequestKind::CorrelationJudgment);
        assert!(request.instructions.contains("Dataset: sales.csv"));
        assert!(request.instructions.contains("price, quantity"));
        assert!(request.data.is_object());
    }

    #[test]
    fn test_report_request_bundles_pairs_and_charts() {
        let charts = vec!["sales_price_revenue.png".to_string()];
        let request = InsightRequest::report_generation("sales.csv", &selection(), &charts, None);

        assert_eq!(request.kind, RequestKind::ReportGeneration);
        assert_eq!(request.data["pairs"].as_array().map(Vec::len), Some(2));
        assert_eq!(request.data["charts"][0], "sales_price_revenue.png");
        assert!(request.data["judgment"].is_null());
    }
}
