//! Grocery list: add, remove, read, and clear items by voice.
//!
//! The list is a JSON array of strings in `grocery_list.json`, saved after
//! every change and once more when the session ends.

use ability_agent::Worker;
use ability_intent::{ExitDetector, IntentClassifier, IntentRecord, IntentSchema};
use ability_store::{load_json, save_json};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;
use crate::manifest::AbilityManifest;
use crate::session::{Conversation, EndReason, TurnOutcome};

pub const ID: &str = "grocery-list";
pub const LIST_FILE: &str = "grocery_list.json";

const GREETING: &str = "Grocery list ready. Say add, remove, read, or clear.";
const CLOSING: &str = "List saved. Goodbye!";
const HELP: &str = "Say add, remove, read, or clear.";

const SCHEMA: &str = r#"{"intent": "add|remove|read|clear|unknown", "items": ["item name", "..."]}
Use "items" for add and remove: short singular grocery names, no quantities or filler words."#;

pub fn manifest() -> AbilityManifest {
    AbilityManifest::new(ID, ["grocery list", "shopping list", "groceries"])
        .with_description("Keeps a spoken grocery list.")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroceryIntent {
    Add(Vec<String>),
    Remove(Vec<String>),
    Read,
    Clear,
    Unknown,
}

impl IntentSchema for GroceryIntent {
    fn from_record(record: &IntentRecord) -> Option<Self> {
        match record.label.as_str() {
            "add" => Some(Self::Add(record.list("items"))),
            "remove" => Some(Self::Remove(record.list("items"))),
            "read" => Some(Self::Read),
            "clear" => Some(Self::Clear),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    fn fallback() -> Self {
        Self::Unknown
    }
}

// ---------------------------------------------------------------------------
// List operations
// ---------------------------------------------------------------------------

/// Append `items` not already on the list (case-insensitive).  Returns
/// what was added.
pub fn add_items(list: &mut Vec<String>, items: &[String]) -> Vec<String> {
    let mut added = Vec::new();
    for item in items.iter().map(|i| i.trim()).filter(|i| !i.is_empty()) {
        if !list.iter().any(|existing| existing.eq_ignore_ascii_case(item)) {
            list.push(item.to_string());
            added.push(item.to_string());
        }
    }
    added
}

/// Remove `items` (case-insensitive).  Returns what was removed.
pub fn remove_items(list: &mut Vec<String>, items: &[String]) -> Vec<String> {
    let mut removed = Vec::new();
    for item in items.iter().map(|i| i.trim()) {
        if let Some(pos) = list.iter().position(|e| e.eq_ignore_ascii_case(item)) {
            removed.push(list.remove(pos));
        }
    }
    removed
}

/// What "read my list" sounds like.
pub fn describe_list(list: &[String]) -> String {
    match list.len() {
        0 => "Your list is empty.".to_string(),
        1 => format!("You have 1 item: {}.", list[0]),
        n if n <= 5 => format!("You have {n} items: {}.", list.join(", ")),
        n => format!("You have {n} items. First three: {}.", list[..3].join(", ")),
    }
}

fn item_count(n: usize) -> String {
    match n {
        1 => "1 item".to_string(),
        n => format!("{n} items"),
    }
}

fn changed(verb: &str, items: &[String]) -> String {
    match items {
        [one] => format!("{verb} {one}."),
        many => format!("{verb} {}.", item_count(many.len())),
    }
}

fn cleared(count: usize) -> String {
    format!("Cleared {}.", item_count(count))
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

pub struct GroceryList {
    items: Vec<String>,
    classifier: IntentClassifier,
}

impl Default for GroceryList {
    fn default() -> Self {
        Self::new()
    }
}

impl GroceryList {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            classifier: IntentClassifier::new(SCHEMA),
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    async fn save(&self, worker: &Worker) -> Result<()> {
        save_json(worker.storage(), LIST_FILE, &self.items).await?;
        Ok(())
    }

    fn context(&self) -> String {
        if self.items.is_empty() {
            "The list is empty.".to_string()
        } else {
            format!("Current list: {}", self.items.join(", "))
        }
    }
}

#[async_trait]
impl Conversation for GroceryList {
    fn greeting(&self) -> String {
        GREETING.to_string()
    }

    fn closing(&self) -> String {
        CLOSING.to_string()
    }

    fn exit_detector(&self) -> ExitDetector {
        ExitDetector::new()
            .with_commands(["stop", "exit", "quit", "cancel", "goodbye"])
            .with_responses(["done", "bye", "that's all", "i'm done"])
            .with_force_phrases(["close grocery list", "close the list"])
    }

    async fn on_start(&mut self, worker: &Worker) -> Result<()> {
        self.items = match load_json(worker.storage(), LIST_FILE).await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "could not load grocery list, starting empty");
                Vec::new()
            }
        };
        debug!(items = self.items.len(), "grocery list loaded");
        Ok(())
    }

    async fn on_end(&mut self, worker: &Worker, _reason: EndReason) -> Result<()> {
        self.save(worker).await
    }

    async fn handle(&mut self, worker: &Worker, utterance: &str) -> Result<TurnOutcome> {
        let context = self.context();
        let intent: GroceryIntent = self
            .classifier
            .classify(worker.model(), utterance, Some(&context), &[])
            .await;
        debug!(intent = ?intent, "grocery intent");

        let reply = match intent {
            GroceryIntent::Add(items) => {
                let added = add_items(&mut self.items, &items);
                if items.is_empty() {
                    "I couldn't find any items.".to_string()
                } else if added.is_empty() {
                    "Those are already on your list.".to_string()
                } else {
                    self.save(worker).await?;
                    changed("Added", &added)
                }
            }
            GroceryIntent::Remove(items) => {
                let removed = remove_items(&mut self.items, &items);
                if removed.is_empty() {
                    "Item not found.".to_string()
                } else {
                    self.save(worker).await?;
                    changed("Removed", &removed)
                }
            }
            GroceryIntent::Read => describe_list(&self.items),
            GroceryIntent::Clear => {
                let count = self.items.len();
                if count == 0 {
                    "List is already empty.".to_string()
                } else {
                    self.items.clear();
                    self.save(worker).await?;
                    cleared(count)
                }
            }
            GroceryIntent::Unknown => HELP.to_string(),
        };

        worker.speak(&reply).await?;
        Ok(TurnOutcome::Continue)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
