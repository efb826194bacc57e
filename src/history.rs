//! Stored conversation records and their mapping onto transcript turns.

use serde::{Deserialize, Serialize};

use crate::transcript::{ChoiceOption, Item, Role, Source};

/// One stored turn as the backend persists it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub obj: RecordRole,
    #[serde(default)]
    pub value: Vec<RecordItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub total_quote_list: Vec<SourceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordRole {
    Human,
    #[serde(rename = "AI")]
    Ai,
}

/// A typed entry in a stored turn's `value` array.
///
/// The tag set is closed: records carrying an unrecognized `type` fail to
/// deserialize rather than load a turn with silently missing content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecordItem {
    Text { text: TextPayload },
    Reasoning { reasoning: ReasoningPayload },
    Interactive { interactive: InteractivePayload },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPayload {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningPayload {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractivePayload {
    #[serde(rename = "type")]
    pub kind: InteractiveKind,
    pub params: InteractiveParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractiveKind {
    #[serde(rename = "userSelect")]
    UserSelect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveParams {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub user_select_options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_selected_val: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// One entry of a stored turn's quote list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub secondary_id: Option<String>,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub title: String,
    /// Retrieval question, used as the body when `content` is absent.
    #[serde(default)]
    pub q: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl HistoryRecord {
    #[must_use]
    pub fn role(&self) -> Role {
        match self.obj {
            RecordRole::Human => Role::User,
            RecordRole::Ai => Role::Assistant,
        }
    }

    /// Transcript items for this record, in stored order.
    #[must_use]
    pub fn items(&self) -> Vec<Item> {
        self.value
            .iter()
            .map(|entry| match entry {
                RecordItem::Text { text } => Item::text(text.content.clone()),
                RecordItem::Reasoning { reasoning } => Item::Reasoning {
                    content: reasoning.content.clone(),
                    duration_seconds: None,
                },
                RecordItem::Interactive { interactive } => Item::Interactive {
                    prompt: interactive.params.description.clone(),
                    options: interactive
                        .params
                        .user_select_options
                        .iter()
                        .map(|option| ChoiceOption {
                            key: option.key.clone(),
                            value: option.value.clone(),
                        })
                        .collect(),
                    resolved_value: interactive.params.user_selected_val.clone(),
                },
            })
            .collect()
    }

    #[must_use]
    pub fn sources(&self) -> Vec<Source> {
        self.total_quote_list
            .iter()
            .map(|record| Source {
                id: record.id.clone(),
                secondary_id: record.secondary_id.clone(),
                source_name: record.source_name.clone(),
                title: record.title.clone(),
                body: record.content.clone().unwrap_or_else(|| record.q.clone()),
                score: record.score,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{HistoryRecord, RecordRole};
    use crate::transcript::{Item, Role};

    #[test]
    fn stored_turn_round_trips_into_items() {
        let record: HistoryRecord = serde_json::from_str(
            r#"{
                "obj": "AI",
                "value": [
                    {"type": "reasoning", "reasoning": {"content": "weighing options"}},
                    {"type": "text", "text": {"content": "Here is the answer."}},
                    {"type": "interactive", "interactive": {
                        "type": "userSelect",
                        "params": {
                            "description": "Continue?",
                            "userSelectOptions": [
                                {"key": "1", "value": "Yes"},
                                {"key": "2", "value": "No"}
                            ],
                            "userSelectedVal": "Yes"
                        }
                    }}
                ],
                "totalQuoteList": [
                    {"id": "doc-1", "_id": "65f0a", "sourceName": "handbook.pdf",
                     "title": "Handbook", "q": "What is the policy?", "score": 0.91}
                ],
                "durationSeconds": 3.2
            }"#,
        )
        .expect("record should deserialize");

        assert_eq!(record.obj, RecordRole::Ai);
        assert_eq!(record.role(), Role::Assistant);
        assert_eq!(record.duration_seconds, Some(3.2));

        let items = record.items();
        assert_eq!(items.len(), 3);
        assert!(matches!(&items[0], Item::Reasoning { content, .. } if content == "weighing options"));
        assert!(matches!(&items[1], Item::Text { content } if content == "Here is the answer."));
        assert!(matches!(
            &items[2],
            Item::Interactive {
                prompt,
                options,
                resolved_value: Some(value),
            } if prompt == "Continue?" && options.len() == 2 && value == "Yes"
        ));

        let sources = record.sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].id, "doc-1");
        assert_eq!(sources[0].secondary_id.as_deref(), Some("65f0a"));
        assert_eq!(sources[0].body, "What is the policy?");
        assert_eq!(sources[0].score, Some(0.91));
    }

    #[test]
    fn human_record_maps_to_user_role() {
        let record: HistoryRecord = serde_json::from_str(
            r#"{"obj": "Human", "value": [{"type": "text", "text": {"content": "hi"}}]}"#,
        )
        .expect("record should deserialize");

        assert_eq!(record.role(), Role::User);
        assert_eq!(record.items().len(), 1);
    }

    #[test]
    fn unknown_item_type_is_rejected() {
        let result: Result<HistoryRecord, _> = serde_json::from_str(
            r#"{"obj": "AI", "value": [{"type": "hologram", "hologram": {}}]}"#,
        );
        assert!(result.is_err());
    }
}
