use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::TradeTag;

/// Tag ids assigned to a trade. `trade_id` may also hold a day key (as a
/// string) for tags applied to a whole trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagAssignment {
    pub trade_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDefinition {
    pub id: String,
    pub name: String,
}

/// A named group of tag definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagDefinition>,
}

/// Stop, maximum adverse and maximum favourable excursion prices of a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Excursion {
    pub trade_id: String,
    #[serde(default)]
    pub date_unix: Option<i64>,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub mae_price: Option<f64>,
    #[serde(default)]
    pub mfe_price: Option<f64>,
}

/// Satisfaction flag recorded either for a single trade or for a whole day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Satisfaction {
    #[serde(default)]
    pub date_unix: Option<i64>,
    #[serde(default)]
    pub trade_id: Option<String>,
    pub satisfaction: bool,
}

/// Indexed view over the external lookup tables the filter stage consults.
#[derive(Debug, Clone, Default)]
pub struct JournalLookups {
    tag_assignments: HashMap<String, Vec<String>>,
    tag_definitions: HashMap<String, TradeTag>,
    excursions: HashMap<String, Excursion>,
    trade_satisfaction: HashMap<String, bool>,
    day_satisfaction: HashMap<i64, bool>,
}

impl JournalLookups {
    pub fn new(
        assignments: &[TagAssignment],
        groups: &[TagGroup],
        excursions: &[Excursion],
        satisfactions: &[Satisfaction],
    ) -> Self {
        let tag_assignments = assignments
            .iter()
            .map(|a| (a.trade_id.clone(), a.tags.clone()))
            .collect();

        let mut tag_definitions = HashMap::new();
        for group in groups {
            for tag in &group.tags {
                tag_definitions.insert(
                    tag.id.clone(),
                    TradeTag {
                        id: tag.id.clone(),
                        name: tag.name.clone(),
                        group_id: Some(group.id.clone()),
                        group_name: Some(group.name.clone()),
                    },
                );
            }
        }

        let excursions = excursions
            .iter()
            .map(|e| (e.trade_id.clone(), e.clone()))
            .collect();

        let mut trade_satisfaction = HashMap::new();
        let mut day_satisfaction = HashMap::new();
        for s in satisfactions {
            if let Some(trade_id) = &s.trade_id {
                trade_satisfaction.insert(trade_id.clone(), s.satisfaction);
            } else if let Some(day) = s.date_unix {
                day_satisfaction.insert(day, s.satisfaction);
            }
        }

        Self {
            tag_assignments,
            tag_definitions,
            excursions,
            trade_satisfaction,
            day_satisfaction,
        }
    }

    /// Tag ids for a trade: its own assignment, else the assignment of its
    /// day.
    pub fn assigned_tags(&self, trade_id: &str, day_key: i64) -> Option<&[String]> {
        self.tag_assignments
            .get(trade_id)
            .or_else(|| self.tag_assignments.get(&day_key.to_string()))
            .map(|tags| tags.as_slice())
    }

    pub fn tag_definition(&self, tag_id: &str) -> Option<&TradeTag> {
        self.tag_definitions.get(tag_id)
    }

    /// Definition of a tag id, else the matching tag already recorded on the
    /// trade. Unknown ids keep the id as their name.
    pub fn resolve_tag(&self, tag_id: &str, recorded: &[TradeTag]) -> TradeTag {
        self.tag_definition(tag_id)
            .or_else(|| recorded.iter().find(|t| t.id == tag_id))
            .cloned()
            .unwrap_or_else(|| TradeTag::unresolved(tag_id))
    }

    pub fn excursion(&self, trade_id: &str) -> Option<&Excursion> {
        self.excursions.get(trade_id)
    }

    pub fn satisfaction(&self, trade_id: &str, day_key: i64) -> Option<bool> {
        self.trade_satisfaction
            .get(trade_id)
            .or_else(|| self.day_satisfaction.get(&day_key))
            .copied()
    }
}
