//! C6 TopicExtractor and CoversBuilder — structural topic derivation and
//! deterministic concept salience scoring (spec §4.6).

use std::collections::HashMap;

use crate::config::TopicConfig;
use crate::identifiers::{CanonicalId, DocId, TopicId};
use crate::model::concept::Topic;
use crate::model::document::Section;
use crate::relationship_types::{Covers, SalienceMethod};

const STOP_WORDS: &[&str] = &["a", "an", "and", "the", "of", "for", "to", "in", "on"];

/// Concept names too generic to be worth a `COVERS` edge (spec §4.6
/// CoversBuilder step 3, "drop stop-concepts").
const STOP_CONCEPTS: &[&str] =
    &["system", "platform", "application", "solution", "process", "data", "information", "feature", "thing", "user"];

/// Normalize a section title into the canonical form used to derive a
/// [`TopicId`] (spec §4.6): lowercase, strip leading numbering, drop
/// punctuation, filter stop-words, collapse whitespace.
pub fn normalize_title(raw: &str) -> String {
    let without_numbering = strip_leading_numbering(raw);
    let lowered = without_numbering.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .filter(|w| !STOP_WORDS.contains(w))
        .collect();
    words.join(" ")
}

fn strip_leading_numbering(raw: &str) -> &str {
    let trimmed = raw.trim_start();
    let mut end = 0;
    let bytes = trimmed.as_bytes();
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }
    if end > 0 && end < trimmed.len() {
        trimmed[end..].trim_start()
    } else {
        trimmed
    }
}

/// Recognize one line as a markdown-style heading, returning its depth
/// (0-based) and title text, for ATX (`#`, `##`, …) and numbered
/// (`1.`, `1.1.`, …) heading styles (spec §4.6 header-pattern fallback).
fn parse_header_line(line: &str) -> Option<(u32, String)> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(rest) = trimmed.strip_prefix('#') {
        let mut depth = 1;
        let mut remainder = rest;
        while let Some(next) = remainder.strip_prefix('#') {
            depth += 1;
            remainder = next;
        }
        let title = remainder.trim();
        if title.is_empty() {
            return None;
        }
        return Some((depth - 1, title.to_string()));
    }

    let bytes = trimmed.as_bytes();
    let mut end = 0;
    let mut dot_count: u32 = 0;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        if bytes[end] == b'.' {
            dot_count += 1;
        }
        end += 1;
    }
    if end == 0 || end >= trimmed.len() {
        return None;
    }
    let numbering = &trimmed[..end];
    if !numbering.as_bytes()[0].is_ascii_digit() {
        return None;
    }
    let title = trimmed[end..].trim();
    if title.is_empty() {
        return None;
    }
    let depth = if numbering.ends_with('.') { dot_count.saturating_sub(1) } else { dot_count };
    Some((depth as u32, title.to_string()))
}

/// Derives a bounded set of structural topics from a document's section
/// tree, falling back to header-pattern detection when no section structure
/// is available, and finally to a single synthesized root topic when neither
/// yields anything (spec §4.6).
pub struct TopicExtractor {
    config: TopicConfig,
}

impl TopicExtractor {
    /// Build an extractor with the given config.
    pub fn new(config: TopicConfig) -> Self {
        Self { config }
    }

    /// Extract topics for a document: section-tree derivation first, then a
    /// header-pattern scan of `raw_text`, then a synthesized single root
    /// topic as a last resort so every document yields at least one topic
    /// (spec §4.6).
    pub fn extract(&self, doc_id: DocId, sections: &[Section], raw_text: &str) -> Vec<Topic> {
        let from_sections = self.extract_from_sections(doc_id, sections);
        if !from_sections.is_empty() {
            return from_sections;
        }
        let from_headers = self.extract_from_headers(doc_id, raw_text);
        if !from_headers.is_empty() {
            return from_headers;
        }
        vec![self.synthesize_root(doc_id)]
    }

    /// Extract topics from a document's sections, capped at
    /// `max_topics`/`max_level` (spec §4.6).
    pub fn extract_from_sections(&self, doc_id: DocId, sections: &[Section]) -> Vec<Topic> {
        let mut topics = Vec::new();
        for section in sections {
            if section.section_level == 0 {
                continue;
            }
            let raw_level = section.section_level - 1;
            if raw_level > self.config.max_level as u32 {
                continue;
            }
            let level = raw_level as u8;
            if topics.len() >= self.config.max_topics as usize {
                break;
            }
            let normalized_title = normalize_title(&section.title);
            if normalized_title.is_empty() {
                continue;
            }
            let topic_id = TopicId::derive(doc_id, level, &normalized_title);
            topics.push(Topic {
                topic_id,
                doc_id,
                normalized_title,
                level,
                section_path: section.section_path.clone(),
                first_document_id: doc_id,
                support: 1,
            });
        }
        topics
    }

    /// Extract topics from heading-like lines in `raw_text` when no section
    /// structure was parsed out of the document (spec §4.6 fallback path).
    pub fn extract_from_headers(&self, doc_id: DocId, raw_text: &str) -> Vec<Topic> {
        let mut topics = Vec::new();
        for (index, line) in raw_text.lines().enumerate() {
            if topics.len() >= self.config.max_topics as usize {
                break;
            }
            let Some((depth, title)) = parse_header_line(line) else {
                continue;
            };
            if depth > self.config.max_level as u32 {
                continue;
            }
            let normalized_title = normalize_title(&title);
            if normalized_title.is_empty() {
                continue;
            }
            let level = depth as u8;
            let topic_id = TopicId::derive(doc_id, level, &normalized_title);
            topics.push(Topic {
                topic_id,
                doc_id,
                normalized_title,
                level,
                section_path: format!("/h{index}"),
                first_document_id: doc_id,
                support: 1,
            });
        }
        topics
    }

    /// Build the single level-0 topic a document falls back to when neither
    /// its section tree nor a header scan found any structure (spec §4.6).
    pub fn synthesize_root(&self, doc_id: DocId) -> Topic {
        let normalized_title = "document".to_string();
        Topic {
            topic_id: TopicId::derive(doc_id, 0, &normalized_title),
            doc_id,
            normalized_title,
            level: 0,
            section_path: "/".to_string(),
            first_document_id: doc_id,
            support: 1,
        }
    }

    /// Re-emit `incoming` against `existing` topics (keyed by
    /// `(doc_id, level, normalized_title)`): matching topics bump `support`
    /// rather than duplicating (spec §4.6 "re-emission across documents").
    pub fn merge(existing: &mut Vec<Topic>, incoming: Vec<Topic>) {
        for topic in incoming {
            if let Some(found) = existing.iter_mut().find(|t| t.topic_id == topic.topic_id) {
                found.support += 1;
            } else {
                existing.push(topic);
            }
        }
    }
}

/// A single concept mention observation feeding `COVERS` salience (spec
/// §4.6 step "doc-local frequency").
#[derive(Debug, Clone)]
pub struct ConceptObservation {
    /// The concept observed.
    pub canonical_id: CanonicalId,
    /// Its canonical display name, consulted against the stop-concept list.
    pub canonical_name: String,
    /// How many times it was mentioned under the topic's section.
    pub mention_count: u32,
}

/// Builds `COVERS` edges from doc-local concept mention frequency, dropping
/// stop-concepts and noise below `salience_floor`, and keeping only the top
/// `top_k_concepts` (spec §4.6).
pub struct CoversBuilder {
    config: TopicConfig,
}

impl CoversBuilder {
    /// Build a `CoversBuilder` with the given config.
    pub fn new(config: TopicConfig) -> Self {
        Self { config }
    }

    /// Compute the `COVERS` edges for one topic from its raw concept
    /// observations: stop-concepts are dropped first, salience is
    /// `count / max_count_in_doc`, edges below `salience_floor` are dropped,
    /// and only the top `top_k_concepts` survive, ranked by salience then by
    /// `canonical_id` for determinism.
    pub fn build(&self, observations: &[ConceptObservation]) -> Vec<(CanonicalId, Covers)> {
        let candidates: Vec<&ConceptObservation> = observations
            .iter()
            .filter(|o| !STOP_CONCEPTS.contains(&o.canonical_name.to_lowercase().as_str()))
            .collect();

        let max_count = candidates.iter().map(|o| o.mention_count).max().unwrap_or(0);
        if max_count == 0 {
            return vec![];
        }

        let mut scored: Vec<(CanonicalId, Covers)> = candidates
            .iter()
            .map(|o| {
                let salience = o.mention_count as f32 / max_count as f32;
                (
                    o.canonical_id,
                    Covers {
                        salience,
                        mention_count: o.mention_count,
                        method: SalienceMethod::DocLocalFrequency,
                        version: 1,
                    },
                )
            })
            .filter(|(_, covers)| covers.salience >= self.config.salience_floor)
            .collect();

        scored.sort_by(|a, b| {
            b.1.salience
                .partial_cmp(&a.1.salience)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.as_uuid().cmp(b.0.as_uuid()))
        });
        scored.truncate(self.config.top_k_concepts as usize);
        scored
    }

    /// Upsert-with-merge a set of newly built edges into an existing map
    /// (spec §4.6): salience takes the max observed, mention_count sums.
    pub fn merge_into(
        existing: &mut HashMap<CanonicalId, Covers>,
        incoming: Vec<(CanonicalId, Covers)>,
    ) {
        for (concept_id, covers) in incoming {
            existing
                .entry(concept_id)
                .and_modify(|current| {
                    current.salience = current.salience.max(covers.salience);
                    current.mention_count += covers.mention_count;
                })
                .or_insert(covers);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{SectionId, TenantId};

    #[test]
    fn normalize_title_strips_numbering_and_stop_words() {
        assert_eq!(normalize_title("3.2 The Deployment Process"), "deployment process");
    }

    #[test]
    fn normalize_title_is_stable_across_equivalent_titles() {
        assert_eq!(
            normalize_title("Release Notes"),
            normalize_title("4. Release Notes!")
        );
    }

    fn section(level: u32, title: &str, path: &str) -> Section {
        Section {
            section_id: SectionId::new(),
            doc_id: DocId::new(),
            title: title.to_string(),
            section_path: path.to_string(),
            section_level: level,
            parent_section_id: None,
        }
    }

    #[test]
    fn extract_skips_the_synthetic_root_and_caps_by_max_level() {
        let doc_id = DocId::new();
        let sections = vec![
            section(0, "Document Root", "/"),
            section(1, "Overview", "/1"),
            section(2, "Architecture", "/1/1"),
            section(3, "Deep Detail", "/1/1/1"),
        ];
        let extractor = TopicExtractor::new(TopicConfig {
            max_level: 1,
            ..TopicConfig::default()
        });
        let topics = extractor.extract_from_sections(doc_id, &sections);
        assert!(topics.iter().all(|t| t.level <= 1));
        assert!(!topics.iter().any(|t| t.normalized_title == "document root"));
    }

    #[test]
    fn merge_bumps_support_for_an_already_seen_topic() {
        let doc_id = DocId::new();
        let topic = Topic {
            topic_id: TopicId::derive(doc_id, 0, "overview"),
            doc_id,
            normalized_title: "overview".to_string(),
            level: 0,
            section_path: "/1".to_string(),
            first_document_id: doc_id,
            support: 1,
        };
        let mut existing = vec![topic.clone()];
        TopicExtractor::merge(&mut existing, vec![topic]);
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].support, 2);
    }

    #[test]
    fn extract_falls_back_to_atx_headers_when_no_sections_are_given() {
        let doc_id = DocId::new();
        let extractor = TopicExtractor::new(TopicConfig::default());
        let raw_text = "# Overview\n\nSome prose.\n\n## Architecture\n\nMore prose.\n";
        let topics = extractor.extract(doc_id, &[], raw_text);
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].normalized_title, "overview");
        assert_eq!(topics[0].level, 0);
        assert_eq!(topics[1].normalized_title, "architecture");
        assert_eq!(topics[1].level, 1);
    }

    #[test]
    fn extract_falls_back_to_numbered_headers() {
        let doc_id = DocId::new();
        let extractor = TopicExtractor::new(TopicConfig::default());
        let raw_text = "1. Overview\nSome prose.\n1.1. Deployment Process\nMore prose.\n";
        let topics = extractor.extract(doc_id, &[], raw_text);
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].level, 0);
        assert_eq!(topics[1].level, 1);
        assert_eq!(topics[1].normalized_title, "deployment process");
    }

    #[test]
    fn extract_synthesizes_a_root_topic_when_nothing_else_is_found() {
        let doc_id = DocId::new();
        let extractor = TopicExtractor::new(TopicConfig::default());
        let topics = extractor.extract(doc_id, &[], "just a paragraph of plain prose, nothing else.");
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].normalized_title, "document");
        assert_eq!(topics[0].level, 0);
    }

    #[test]
    fn covers_salience_is_count_over_max_and_floor_drops_noise() {
        let tenant = TenantId::new("acme");
        let a = CanonicalId::derive(&tenant, "SAP");
        let b = CanonicalId::derive(&tenant, "Oracle");
        let observations = vec![
            ConceptObservation { canonical_id: a, canonical_name: "SAP".to_string(), mention_count: 10 },
            ConceptObservation { canonical_id: b, canonical_name: "Oracle".to_string(), mention_count: 1 },
        ];
        let builder = CoversBuilder::new(TopicConfig::default());
        let edges = builder.build(&observations);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].0, a);
        assert_eq!(edges[0].1.salience, 1.0);
    }

    #[test]
    fn covers_builder_drops_stop_concepts_before_scoring() {
        let tenant = TenantId::new("acme");
        let a = CanonicalId::derive(&tenant, "SAP");
        let noise = CanonicalId::derive(&tenant, "the system");
        let observations = vec![
            ConceptObservation { canonical_id: a, canonical_name: "SAP".to_string(), mention_count: 5 },
            ConceptObservation { canonical_id: noise, canonical_name: "System".to_string(), mention_count: 9 },
        ];
        let builder = CoversBuilder::new(TopicConfig { salience_floor: 0.0, ..TopicConfig::default() });
        let edges = builder.build(&observations);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].0, a);
    }

    #[test]
    fn covers_builder_caps_at_top_k_concepts() {
        let tenant = TenantId::new("acme");
        let observations: Vec<ConceptObservation> = (0..20)
            .map(|i| ConceptObservation {
                canonical_id: CanonicalId::derive(&tenant, &format!("concept-{i}")),
                canonical_name: format!("concept-{i}"),
                mention_count: 20 - i,
            })
            .collect();
        let builder = CoversBuilder::new(TopicConfig {
            top_k_concepts: 5,
            salience_floor: 0.0,
            ..TopicConfig::default()
        });
        let edges = builder.build(&observations);
        assert_eq!(edges.len(), 5);
    }

    #[test]
    fn merge_into_sums_mention_count_and_keeps_max_salience() {
        let tenant = TenantId::new("acme");
        let concept = CanonicalId::derive(&tenant, "SAP");
        let mut existing = HashMap::new();
        existing.insert(
            concept,
            Covers {
                salience: 0.4,
                mention_count: 2,
                method: SalienceMethod::DocLocalFrequency,
                version: 1,
            },
        );
        CoversBuilder::merge_into(
            &mut existing,
            vec![(
                concept,
                Covers {
                    salience: 0.9,
                    mention_count: 3,
                    method: SalienceMethod::DocLocalFrequency,
                    version: 1,
                },
            )],
        );
        let merged = existing.get(&concept).unwrap();
        assert_eq!(merged.mention_count, 5);
        assert_eq!(merged.salience, 0.9);
    }
}
