//! SOW document rendering.

use crate::escape_html;
use covenant_core::{SowTemplate, Tier};

/// Values substituted into a SOW document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SowVariables {
    pub sow_id: String,
    pub date: String,
    pub client_name: String,
    pub project_name: String,
    pub amount: String,
}

impl SowVariables {
    /// Placeholder tokens recognized in stored templates, with escaped values.
    fn substitutions(&self) -> [(&'static str, String); 5] {
        [
            ("{{sowId}}", escape_html(&self.sow_id)),
            ("{{date}}", escape_html(&self.date)),
            ("{{clientName}}", escape_html(&self.client_name)),
            ("{{projectName}}", escape_html(&self.project_name)),
            ("{{amount}}", escape_html(&self.amount)),
        ]
    }
}

/// A rendered SOW and where its content came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SowDocument {
    pub html: String,
    /// True when the built-in generator produced the document.
    pub used_fallback: bool,
}

/// Literal substitution of the five known placeholders.
///
/// Unknown `{{...}}` tokens are left as they are.
pub fn render_template(content: &str, vars: &SowVariables) -> String {
    vars.substitutions()
        .iter()
        .fold(content.to_string(), |acc, (token, value)| {
            acc.replace(token, value)
        })
}

struct TierScope {
    heading: &'static str,
    summary: &'static str,
    deliverables: &'static [&'static str],
    timeline: &'static str,
}

fn tier_scope(tier: Tier) -> TierScope {
    match tier {
        Tier::Tier1 => TierScope {
            heading: "Viability & Utility",
            summary: "Assess the technical and economic viability of the project and define the utility model.",
            deliverables: &[
                "Technical viability assessment",
                "Utility and incentive model review",
                "Reference architecture recommendation",
                "Go / no-go report with next-step plan",
            ],
            timeline: "2 weeks",
        },
        Tier::Tier2 => TierScope {
            heading: "Build & Integration",
            summary: "Implement the approved architecture and integrate it with the client's platform.",
            deliverables: &[
                "Core protocol implementation",
                "Platform and payment integration",
                "Automated test suite",
                "Staging deployment and walkthrough",
            ],
            timeline: "6 weeks",
        },
        Tier::Tier3 => TierScope {
            heading: "Scale & Deployment",
            summary: "Take the integrated build to production and support the launch.",
            deliverables: &[
                "Production deployment",
                "Monitoring, alerting and hardening",
                "Launch support and handover documentation",
            ],
            timeline: "4 weeks",
        },
    }
}

/// Built-in SOW generator keyed by tier.
pub fn builtin_sow(tier: Tier, vars: &SowVariables) -> String {
    let scope = tier_scope(tier);
    let deliverables: String = scope
        .deliverables
        .iter()
        .map(|d| format!("<li>{}</li>", d))
        .collect();

    format!(
        concat!(
            "<div class=\"sow\">",
            "<h1>Statement of Work: {label} - {heading}</h1>",
            "<p><strong>SOW:</strong> {sow_id}<br/>",
            "<strong>Date:</strong> {date}<br/>",
            "<strong>Client:</strong> {client}<br/>",
            "<strong>Project:</strong> {project}</p>",
            "<h2>Scope</h2><p>{summary}</p>",
            "<h2>Deliverables</h2><ul>{deliverables}</ul>",
            "<h2>Timeline</h2><p>{timeline} from payment confirmation.</p>",
            "<h2>Investment</h2><p>{amount} USD, payable in full to begin execution.</p>",
            "<p>Execution of this SOW is governed by the Master Service Agreement.</p>",
            "</div>"
        ),
        label = tier.label(),
        heading = scope.heading,
        sow_id = escape_html(&vars.sow_id),
        date = escape_html(&vars.date),
        client = escape_html(&vars.client_name),
        project = escape_html(&vars.project_name),
        summary = scope.summary,
        deliverables = deliverables,
        timeline = scope.timeline,
        amount = escape_html(&vars.amount),
    )
}

/// Resolve the SOW HTML for a tier.
///
/// A stored template wins when it renders to non-empty content; a missing
/// template or an empty render falls back to [`builtin_sow`].
pub fn resolve_sow_html(
    template: Option<&SowTemplate>,
    tier: Tier,
    vars: &SowVariables,
) -> SowDocument {
    if let Some(template) = template {
        let html = render_template(&template.content, vars);
        if !html.trim().is_empty() {
            return SowDocument {
                html,
                used_fallback: false,
            };
        }
    }
    SowDocument {
        html: builtin_sow(tier, vars),
        used_fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> SowVariables {
        SowVariables {
            sow_id: "SOW-TIER_1-ABC123".to_string(),
            date: "2026-10-18".to_string(),
            client_name: "Ada & Co".to_string(),
            project_name: "SOW Tier 1 - Viability & Utility".to_string(),
            amount: "500".to_string(),
        }
    }

    fn template(content: &str) -> SowTemplate {
        SowTemplate {
            template_id: "custom".to_string(),
            name: "Custom".to_string(),
            tier: Some(Tier::Tier1),
            content: content.to_string(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_render_template_substitutes_all_tokens() {
        let html = render_template(
            "{{sowId}}|{{date}}|{{clientName}}|{{projectName}}|{{amount}}|{{sowId}}|{{unknown}}",
            &vars(),
        );
        assert_eq!(
            html,
            "SOW-TIER_1-ABC123|2026-10-18|Ada &amp; Co|SOW Tier 1 - Viability &amp; Utility|500|SOW-TIER_1-ABC123|{{unknown}}"
        );
    }

    #[test]
    fn test_builtin_sow_mentions_tier_and_ids() {
        for tier in Tier::ALL {
            let html = builtin_sow(tier, &vars());
            assert!(html.contains(tier.label()));
            assert!(html.contains("SOW-TIER_1-ABC123"));
            assert!(html.contains("Ada &amp; Co"));
        }
    }

    #[test]
    fn test_resolve_prefers_template() {
        let t = template("<p>{{clientName}} owes {{amount}}</p>");
        let doc = resolve_sow_html(Some(&t), Tier::Tier1, &vars());
        assert!(!doc.used_fallback);
        assert_eq!(doc.html, "<p>Ada &amp; Co owes 500</p>");
    }

    #[test]
    fn test_resolve_falls_back_on_missing_or_empty() {
        let doc = resolve_sow_html(None, Tier::Tier2, &vars());
        assert!(doc.used_fallback);
        assert!(doc.html.contains("Build & Integration"));

        let empty = template("   ");
        let doc = resolve_sow_html(Some(&empty), Tier::Tier2, &vars());
        assert!(doc.used_fallback);
    }
}
