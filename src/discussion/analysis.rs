//! Post-session analysis report extraction

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Matches a fenced ```json block in a model reply
static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("valid regex"));

/// Matches any fenced block in a model reply
static FENCED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```\s*(.*?)\s*```").expect("valid regex"));

/// Structured feedback report for one discussion session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAnalysis {
    pub gd_summary: String,
    pub key_themes: Vec<String>,
    pub user_contributions: Vec<UserContribution>,
    pub feedback: Feedback,
    pub missed_angles: Vec<String>,
    pub flow_assessment: FlowAssessment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContribution {
    pub turn: u32,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowAssessment {
    pub flow: String,
    pub balance: String,
    pub engagement: String,
}

/// Report returned when the model reply cannot be parsed
#[must_use]
pub fn fallback_report() -> SessionAnalysis {
    SessionAnalysis {
        gd_summary: "Analysis could not be fully processed. The discussion covered the topic \
                     with multiple perspectives shared."
            .to_string(),
        key_themes: vec!["Unable to extract themes".to_string()],
        user_contributions: vec![],
        feedback: Feedback {
            strengths: vec!["Participated in the discussion".to_string()],
            improvements: vec!["Consider speaking more frequently".to_string()],
        },
        missed_angles: vec!["Analysis unavailable".to_string()],
        flow_assessment: FlowAssessment {
            flow: "moderate".to_string(),
            balance: "varied".to_string(),
            engagement: "moderate".to_string(),
        },
    }
}

/// Extract the analysis report from a model reply.
///
/// Models wrap the JSON in markdown more often than not, so extraction
/// tries a ```json fence, then any fence, then the raw reply; anything
/// unparseable yields the fixed fallback report.
#[must_use]
pub fn extract_analysis(reply: &str) -> SessionAnalysis {
    let candidate = FENCED_JSON
        .captures(reply)
        .or_else(|| FENCED.captures(reply))
        .and_then(|c| c.get(1))
        .map_or(reply, |m| m.as_str());

    match serde_json::from_str(candidate) {
        Ok(analysis) => analysis,
        Err(e) => {
            tracing::warn!(error = %e, "analysis reply did not parse, using fallback report");
            fallback_report()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
        "gdSummary": "The group explored the topic end to end.",
        "keyThemes": ["automation", "credentials"],
        "userContributions": [{"turn": 2, "summary": "Argued for apprenticeships."}],
        "feedback": {
            "strengths": ["Clear framing"],
            "improvements": ["Invite quieter voices"]
        },
        "missedAngles": ["Cost of retraining"],
        "flowAssessment": {"flow": "smooth", "balance": "well-balanced", "engagement": "high"}
    }"#;

    #[test]
    fn json_fence_parses() {
        let reply = format!("Here is the analysis:\n```json\n{REPORT}\n```\nHope this helps!");
        let analysis = extract_analysis(&reply);
        assert_eq!(analysis.gd_summary, "The group explored the topic end to end.");
        assert_eq!(analysis.user_contributions[0].turn, 2);
    }

    #[test]
    fn bare_fence_parses() {
        let reply = format!("```\n{REPORT}\n```");
        let analysis = extract_analysis(&reply);
        assert_eq!(analysis.flow_assessment.flow, "smooth");
    }

    #[test]
    fn raw_json_parses() {
        let analysis = extract_analysis(REPORT);
        assert_eq!(analysis.key_themes, vec!["automation", "credentials"]);
    }

    #[test]
    fn garbage_yields_fallback_shape() {
        let analysis = extract_analysis("I could not produce the report, sorry.");
        assert_eq!(analysis, fallback_report());
        assert_eq!(analysis.key_themes, vec!["Unable to extract themes"]);
        assert_eq!(analysis.flow_assessment.balance, "varied");
        assert!(analysis.user_contributions.is_empty());
    }

    #[test]
    fn report_serializes_camel_case() {
        let json = serde_json::to_value(fallback_report()).unwrap();
        assert!(json.get("gdSummary").is_some());
        assert!(json.get("keyThemes").is_some());
        assert!(json.get("flowAssessment").is_some());
        assert!(json["feedback"].get("strengths").is_some());
    }
}
