//! C4 MarkerNormalizer — blacklist/alias/rule resolution and entity-anchor
//! selection for raw marker mentions (spec §4.4).

use regex::Regex;

use crate::config::{MarkerRule, TenantMarkerConfig};
use crate::errors::{CoreError, CoreResult};
use crate::model::marker::{CanonicalMarker, MentionResolution, MentionStatus, ResolvedBy};

/// A compiled [`MarkerRule`], built once at normalizer construction rather
/// than re-compiled per mention.
struct CompiledRule {
    rule_id: String,
    pattern: Regex,
    output_template: String,
    requires_entity: bool,
    requires_strong_entity: bool,
    requires_base_version: bool,
    confidence: f32,
    enabled: bool,
}

/// The outcome of resolving one raw mention (spec §4.4).
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizationOutcome {
    /// The surface form matched a tenant blacklist entry.
    Blacklisted,
    /// No blacklist, alias, or rule matched.
    Unresolved,
    /// Resolved to a canonical marker, with the resolution that produced it.
    Resolved(CanonicalMarker, MentionResolution),
}

/// A candidate entity mention drawn from the concept graph, considered for
/// anchor selection (spec §4.4 "Entity Anchor selection").
#[derive(Debug, Clone)]
pub struct EntityCandidate {
    /// The candidate's surface form.
    pub text: String,
    /// How many times it was mentioned in the scope under consideration.
    pub mention_count: u32,
    /// Its grammatical/discourse role (e.g. `"primary"`, `"subject"`,
    /// `"mention"`).
    pub role: String,
}

/// A document-summary-supplied entity hint, consulted only when no
/// concept-graph candidate qualifies (spec §4.4 fallback path).
#[derive(Debug, Clone)]
pub struct EntityHint {
    /// The hinted entity's surface form.
    pub text: String,
    /// Confidence in the hint, in `[0, 1]`.
    pub confidence: f32,
}

/// The winning entity anchor, along with whether it meets the "strong" bar
/// (spec §4.4) that `requires_strong_entity` rules gate on.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedAnchor {
    /// The anchor's surface form.
    pub text: String,
    /// True iff the anchor meets the "strong" test: ≥3 mentions or a
    /// primary/subject role. Hint-sourced anchors are never strong — a hint
    /// carries no mention count or role to judge strength from.
    pub is_strong: bool,
}

/// Whether a candidate entity-anchor mention is "strong" enough to satisfy
/// `requires_strong_entity` (spec §4.4): either it recurs at least three
/// times, or it plays a primary/subject role even once.
pub fn is_strong_entity_signal(mention_count: u32, role: &str) -> bool {
    mention_count >= 3 || matches!(role, "primary" | "subject")
}

/// Pick the entity anchor governing a mention's resolution (spec §4.4):
/// concept-graph candidates with ≥2 mentions or a primary/subject role,
/// ranked by mention count, top 5 considered. If none qualify, fall back to
/// `entity_hints` filtered to confidence ≥ 0.5, taking the highest-confidence
/// hint. If `single_entity_required` and the top concept-graph candidates
/// tie at the highest mention count, no anchor is returned at all.
pub fn select_entity_anchor(
    candidates: &[EntityCandidate],
    entity_hints: &[EntityHint],
    single_entity_required: bool,
) -> Option<SelectedAnchor> {
    let mut eligible: Vec<&EntityCandidate> = candidates
        .iter()
        .filter(|c| c.mention_count >= 2 || matches!(c.role.as_str(), "primary" | "subject"))
        .collect();
    eligible.sort_by(|a, b| b.mention_count.cmp(&a.mention_count));
    eligible.truncate(5);

    if let Some(top) = eligible.first() {
        let top_count = top.mention_count;
        let tied_at_top = eligible.iter().filter(|c| c.mention_count == top_count).count();
        if single_entity_required && tied_at_top > 1 {
            return None;
        }
        return Some(SelectedAnchor {
            text: top.text.clone(),
            is_strong: is_strong_entity_signal(top.mention_count, &top.role),
        });
    }

    entity_hints
        .iter()
        .filter(|hint| hint.confidence >= 0.5)
        .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
        .map(|hint| SelectedAnchor { text: hint.text.clone(), is_strong: false })
}

/// Interpolate a rule's `output_template` against the regex captures from a
/// match, the selected entity anchor, and a known base version (spec §4.4
/// template placeholders: `{entity}`, `{base_version}`, `{$1}`…`{$N}`).
fn interpolate_template(
    template: &str,
    captures: &regex::Captures,
    anchor: Option<&SelectedAnchor>,
    base_version: Option<&str>,
) -> String {
    let mut output = template.to_string();
    output = output.replace("{entity}", anchor.map(|a| a.text.as_str()).unwrap_or(""));
    output = output.replace("{base_version}", base_version.unwrap_or(""));
    for group in 1..captures.len() {
        let placeholder = format!("{{${group}}}");
        let value = captures.get(group).map(|m| m.as_str()).unwrap_or("");
        output = output.replace(&placeholder, value);
    }
    output.trim().to_string()
}

/// Resolves raw marker mentions against a tenant's blacklist, alias table,
/// and priority-ordered rule set (spec §4.4).
pub struct MarkerNormalizer {
    config: TenantMarkerConfig,
    compiled_rules: Vec<CompiledRule>,
}

impl MarkerNormalizer {
    /// Build a normalizer, compiling every rule's pattern up front.
    /// Rules are sorted by descending priority, with ties broken by the
    /// rule's position in the configured list (earlier wins) so resolution
    /// order is deterministic.
    pub fn new(config: TenantMarkerConfig) -> CoreResult<Self> {
        let mut compiled_rules = Vec::with_capacity(config.rules.len());
        for (index, rule) in config.rules.iter().enumerate() {
            let pattern = Regex::new(&rule.pattern).map_err(|err| {
                CoreError::SchemaViolation(format!(
                    "marker rule {} has an invalid pattern: {err}",
                    rule.rule_id
                ))
            })?;
            compiled_rules.push((
                index,
                CompiledRule {
                    rule_id: rule.rule_id.clone(),
                    pattern,
                    output_template: rule.output_template.clone(),
                    requires_entity: rule.requires_entity,
                    requires_strong_entity: rule.requires_strong_entity,
                    requires_base_version: rule.requires_base_version,
                    confidence: rule.confidence,
                    enabled: rule.enabled,
                },
                rule.priority,
            ));
        }
        compiled_rules.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
        let compiled_rules = compiled_rules.into_iter().map(|(_, rule, _)| rule).collect();

        Ok(Self {
            config,
            compiled_rules,
        })
    }

    /// Resolve one raw surface form: blacklist, then exact alias, then rules
    /// in descending-priority order (spec §4.4). `entity_candidates` and
    /// `entity_hints` feed anchor selection; `base_version` is the tenant's
    /// currently-known base version, if any.
    pub fn resolve(
        &self,
        raw_text: &str,
        entity_candidates: &[EntityCandidate],
        entity_hints: &[EntityHint],
        base_version: Option<&str>,
    ) -> NormalizationOutcome {
        if self.config.blacklist.iter().any(|entry| entry == raw_text) {
            return NormalizationOutcome::Blacklisted;
        }

        if let Some(canonical_form) = self.config.aliases.get(raw_text) {
            let marker = CanonicalMarker {
                canonical_form: canonical_form.clone(),
                entity_anchor: None,
                marker_type: "alias".to_string(),
                created_by: ResolvedBy::AliasExact,
                confidence: 1.0,
            };
            let resolution = MentionResolution {
                rule_id: None,
                confidence: 1.0,
            };
            return NormalizationOutcome::Resolved(marker, resolution);
        }

        let anchor = select_entity_anchor(
            entity_candidates,
            entity_hints,
            self.config.constraints.single_entity_required,
        );

        for rule in &self.compiled_rules {
            if !rule.enabled {
                continue;
            }
            if rule.requires_entity && anchor.is_none() {
                continue;
            }
            if rule.requires_strong_entity && !anchor.as_ref().is_some_and(|a| a.is_strong) {
                continue;
            }
            if rule.requires_base_version && base_version.is_none() {
                continue;
            }

            let Some(captures) = rule.pattern.captures(raw_text) else {
                continue;
            };
            let canonical_form = interpolate_template(&rule.output_template, &captures, anchor.as_ref(), base_version);
            if canonical_form.is_empty() {
                continue;
            }

            let marker = CanonicalMarker {
                canonical_form,
                entity_anchor: anchor.as_ref().map(|a| a.text.clone()),
                marker_type: "rule".to_string(),
                created_by: ResolvedBy::Rule(rule_id_of(rule)),
                confidence: rule.confidence,
            };
            let resolution = MentionResolution {
                rule_id: Some(rule_id_of(rule)),
                confidence: rule.confidence,
            };
            return NormalizationOutcome::Resolved(marker, resolution);
        }

        NormalizationOutcome::Unresolved
    }

    /// The resolution status a raw mention should carry given its outcome
    /// (spec §4.4 `MentionStatus`).
    pub fn status_for(outcome: &NormalizationOutcome) -> MentionStatus {
        match outcome {
            NormalizationOutcome::Blacklisted => MentionStatus::Blacklisted,
            NormalizationOutcome::Unresolved => MentionStatus::Unresolved,
            NormalizationOutcome::Resolved(..) => MentionStatus::Resolved,
        }
    }
}

fn rule_id_of(rule: &CompiledRule) -> crate::identifiers::RuleId {
    crate::identifiers::RuleId::derive(&rule.rule_id)
}
