//! Answer composition
//!
//! Turns matched records into do's and don'ts plus a readable answer for
//! each intent. Covers the three answer tiers: local dataset, external
//! model, and static guidance.
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;

use nutri_core::{
    AdviceItem, AnswerConfig, AnswerRequest, Attribute, Dimension, Intent, Polarity, Record,
    RecordKind,
};

use crate::guidelines::{
    default_guidelines, general_answer, guidelines_for_keywords, trimester_goal, AI_NOTE,
    AVOID_GUIDELINES, DOCTOR_TIP, MEAL_PLAN_TIPS, SAFETY_TIPS,
};
use crate::intent::{infer_preferences, title_case};
use crate::knowledge::KnowledgeBase;

const DO_REASON_ATTRIBUTES: &[Attribute] = &[
    Attribute::Benefit,
    Attribute::Nutrients,
    Attribute::Description,
    Attribute::Recommendation,
    Attribute::Notes,
];

const DONT_REASON_ATTRIBUTES: &[Attribute] = &[
    Attribute::Risk,
    Attribute::Description,
    Attribute::Recommendation,
    Attribute::Notes,
];

// ============================================================================
// Ranking
// ============================================================================

/// Orders matched records before the top-N cut
pub trait RankingStrategy: Send + Sync {
    fn rank(&self, intent: Intent, records: Vec<Arc<Record>>) -> Vec<Arc<Record>>;

    /// Strategy name for logging
    fn name(&self) -> &str;
}

/// Keeps records in the order they were discovered
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoveryOrder;

impl RankingStrategy for DiscoveryOrder {
    fn rank(&self, _intent: Intent, records: Vec<Arc<Record>>) -> Vec<Arc<Record>> {
        records
    }

    fn name(&self) -> &str {
        "discovery_order"
    }
}

// ============================================================================
// Composed parts
// ============================================================================

/// Answer body without request bookkeeping
#[derive(Debug, Clone, Default)]
pub struct ComposedAnswer {
    pub answer: String,
    pub dos: Vec<AdviceItem>,
    pub donts: Vec<AdviceItem>,
    pub relaxed: Vec<Dimension>,
}

fn is_dont(record: &Record) -> bool {
    record.kind == RecordKind::Guidance && record.polarity == Some(Polarity::Dont)
}

/// Convert a record to a list entry with a non-empty reason
pub fn advice_from_record(record: &Record) -> AdviceItem {
    let reason = if is_dont(record) {
        record
            .first_attribute(DONT_REASON_ATTRIBUTES)
            .unwrap_or("Listed as a food to avoid during pregnancy")
    } else {
        record
            .first_attribute(DO_REASON_ATTRIBUTES)
            .unwrap_or("Found in the dataset")
    };

    let mut item = AdviceItem::new(record.display_name.clone(), reason);
    item.details = record.details();
    if !record.provenance.source_file.is_empty() {
        item.details
            .entry("source".to_string())
            .or_insert_with(|| record.provenance.source_file.clone());
    }
    item
}

fn push_unique(list: &mut Vec<Arc<Record>>, record: Arc<Record>) {
    if !list.iter().any(|r| Arc::ptr_eq(r, &record)) {
        list.push(record);
    }
}

// ============================================================================
// Local tier
// ============================================================================

/// Composes answers from the knowledge base
pub struct Composer<'a> {
    knowledge: &'a KnowledgeBase,
    config: &'a AnswerConfig,
    ranking: &'a dyn RankingStrategy,
}

impl<'a> Composer<'a> {
    pub fn new(
        knowledge: &'a KnowledgeBase,
        config: &'a AnswerConfig,
        ranking: &'a dyn RankingStrategy,
    ) -> Self {
        Self {
            knowledge,
            config,
            ranking,
        }
    }

    /// Records for one keyword: keyword index, then exact, then fuzzy
    ///
    /// Guidance is searched before meals.
    pub fn lookup_keyword(&self, keyword: &str) -> Vec<Arc<Record>> {
        let mut found = Vec::new();
        for index in [
            self.knowledge.guidance_index(),
            self.knowledge.meal_index(),
        ] {
            for record in index.keyword_lookup(keyword) {
                push_unique(&mut found, record);
            }
            if let Some(record) = index.exact_lookup(keyword) {
                push_unique(&mut found, record);
            }
            for m in index.fuzzy_lookup(
                keyword,
                self.config.fuzzy_threshold,
                self.config.fuzzy_limit,
            ) {
                push_unique(&mut found, m.record);
            }
        }
        found
    }

    /// Records for every keyword, de-duplicated in discovery order
    pub fn lookup_keywords(&self, keywords: &[String]) -> Vec<Arc<Record>> {
        let mut found = Vec::new();
        for keyword in keywords {
            for record in self.lookup_keyword(keyword) {
                push_unique(&mut found, record);
            }
        }
        found
    }

    /// Compose from local records; `None` when nothing usable matched
    pub fn compose(
        &self,
        request: &AnswerRequest,
        intent: Intent,
        keywords: &[String],
    ) -> Option<ComposedAnswer> {
        let mut dos = Vec::new();
        let mut donts = Vec::new();
        let mut relaxed = Vec::new();

        if matches!(
            intent,
            Intent::MealPlan | Intent::Seasonal | Intent::Regional | Intent::TrimesterSpecific
        ) {
            let outcome = self
                .knowledge
                .preference_filter(&infer_preferences(request));
            relaxed = outcome.relaxed;
            for record in outcome.records {
                push_unique(&mut dos, record);
            }
        }

        for record in self.lookup_keywords(keywords) {
            if is_dont(&record) {
                push_unique(&mut donts, record);
            } else {
                push_unique(&mut dos, record);
            }
        }

        if intent == Intent::FoodsToAvoid {
            for record in self.knowledge.guidance_by_polarity(Polarity::Dont) {
                push_unique(&mut donts, record);
            }
        }

        let dos = self.cut(intent, dos);
        let donts = self.cut(intent, donts);
        if dos.is_empty() && donts.is_empty() {
            return None;
        }

        let answer = render_local(request, intent, keywords, &dos, &donts, &relaxed);
        Some(ComposedAnswer {
            answer,
            dos,
            donts,
            relaxed,
        })
    }

    fn cut(&self, intent: Intent, records: Vec<Arc<Record>>) -> Vec<AdviceItem> {
        self.ranking
            .rank(intent, records)
            .iter()
            .take(self.config.top_n)
            .map(|r| advice_from_record(r))
            .collect()
    }
}

fn bullet_lines(answer: &mut Vec<String>, items: &[AdviceItem]) {
    for item in items {
        answer.push(format!("- {}: {}", item.item, item.reason));
    }
}

fn render_local(
    request: &AnswerRequest,
    intent: Intent,
    keywords: &[String],
    dos: &[AdviceItem],
    donts: &[AdviceItem],
    relaxed: &[Dimension],
) -> String {
    let mut lines: Vec<String> = Vec::new();

    match intent {
        Intent::MealPlan | Intent::Seasonal | Intent::Regional | Intent::TrimesterSpecific => {
            match request.trimester {
                Some(t) => lines.push(format!("Meal ideas for trimester {t}:")),
                None => lines.push("Meal ideas from the dataset:".to_string()),
            }
            if let Some(goal) = request.trimester.and_then(trimester_goal) {
                lines.push(format!("Goal: {goal}"));
            }
        }
        Intent::FoodsToAvoid => lines.push("Foods to avoid during pregnancy:".to_string()),
        Intent::Benefits => lines.push("Nutritional benefits:".to_string()),
        Intent::SafetyCheck | Intent::General => {
            let subject = keywords
                .iter()
                .take(2)
                .map(|k| title_case(k))
                .collect::<Vec<_>>()
                .join(" and ");
            lines.push(format!("Here is what the dataset says about {subject}:"));
        }
    }

    if !relaxed.is_empty() {
        let names: Vec<&str> = relaxed.iter().map(Dimension::as_str).collect();
        lines.push(format!(
            "No meals matched every preference, so these ignore: {}.",
            names.join(", ")
        ));
    }

    if !dos.is_empty() {
        lines.push(String::new());
        lines.push("Recommended:".to_string());
        bullet_lines(&mut lines, dos);
    }
    if !donts.is_empty() {
        lines.push(String::new());
        lines.push("Avoid:".to_string());
        bullet_lines(&mut lines, donts);
    }

    let tips: &[&str] = match intent {
        Intent::FoodsToAvoid => AVOID_GUIDELINES,
        Intent::SafetyCheck => SAFETY_TIPS,
        Intent::MealPlan => MEAL_PLAN_TIPS,
        _ => &[],
    };
    if !tips.is_empty() {
        lines.push(String::new());
        lines.push("General guidelines:".to_string());
        lines.extend(tips.iter().map(|t| format!("- {t}")));
    }

    if request.trimester.is_some() {
        lines.push(String::new());
        lines.push(DOCTOR_TIP.to_string());
    }

    lines.join("\n")
}

// ============================================================================
// Fallback and static tiers
// ============================================================================

/// Whether an intent carries do's and don'ts in the static tier
fn wants_dos_donts(intent: Intent) -> bool {
    matches!(
        intent,
        Intent::SafetyCheck | Intent::FoodsToAvoid | Intent::TrimesterSpecific | Intent::General
    )
}

fn static_lists(intent: Intent, keywords: &[String], top_n: usize) -> (Vec<AdviceItem>, Vec<AdviceItem>) {
    let (mut dos, mut donts) = match guidelines_for_keywords(keywords) {
        Some(lists) => lists,
        None if wants_dos_donts(intent) && !keywords.is_empty() => default_guidelines(&keywords[0]),
        None => (Vec::new(), Vec::new()),
    };
    dos.truncate(top_n);
    donts.truncate(top_n);
    (dos, donts)
}

/// Answer built around the external model's reply
pub fn compose_fallback(
    reply: &str,
    intent: Intent,
    keywords: &[String],
    top_n: usize,
) -> ComposedAnswer {
    let (dos, donts) = static_lists(intent, keywords, top_n);
    ComposedAnswer {
        answer: format!("{}\n\n{}", reply.trim(), AI_NOTE),
        dos,
        donts,
        relaxed: Vec::new(),
    }
}

/// Canned answer, enriched with static guidelines for known topics
pub fn compose_static(
    intent: Intent,
    keywords: &[String],
    trimester: Option<u8>,
    top_n: usize,
) -> ComposedAnswer {
    let (dos, donts) = static_lists(intent, keywords, top_n);
    ComposedAnswer {
        answer: general_answer(intent, trimester),
        dos,
        donts,
        relaxed: Vec::new(),
    }
}
