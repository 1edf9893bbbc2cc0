//! Voice journal: dictate, read back, search, edit, and delete entries.
//!
//! Entries are lines of `voice_journal_entries.txt`:
//!
//! ```text
//! 2026-03-14 08:15 | Went for a run before work.
//! ```
//!
//! Keywords are tried before the model so common commands cost nothing.
//! Saving, deleting, and editing each ask first.  Entries are numbered
//! from the newest, so "number 1" is always the latest entry.

use ability_agent::Worker;
use ability_intent::{
    Confirmation, IntentClassifier, IntentRecord, IntentSchema, KeywordTable, PendingState,
    clean_input, parse_confirmation,
};
use ability_store::{LineLog, load_json, save_json};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::manifest::AbilityManifest;
use crate::session::{Conversation, TurnOutcome};

pub const ID: &str = "voice-journal";
pub const ENTRIES_FILE: &str = "voice_journal_entries.txt";
pub const PREFS_FILE: &str = "voice_journal_prefs.json";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";
const SEPARATOR: &str = " | ";
const MAX_SPOKEN: usize = 3;
/// Entries read out per page when picking by number.
const PAGE_SIZE: usize = 5;

const SCHEMA: &str = r#"{"intent": "add|read|search|delete|delete_all|edit|help|unknown", "text": "entry text for add", "query": "topic for search", "which": "last, or the entry number counted from the newest, for delete and edit"}
Anything that sounds like something worth writing down is "add" with the full text.
"delete_all" only when they clearly want every entry gone."#;

const HELP: &str = "You can add an entry, read your recent entries, search for a topic, edit or \
                    delete an entry, or say stop when you're done.";
const UNKNOWN: &str = "I can add, read, search, edit, or delete entries. What would you like?";

const ORDINALS: [(&str, usize); 20] = [
    ("one", 1),
    ("first", 1),
    ("two", 2),
    ("second", 2),
    ("three", 3),
    ("third", 3),
    ("four", 4),
    ("fourth", 4),
    ("five", 5),
    ("fifth", 5),
    ("six", 6),
    ("sixth", 6),
    ("seven", 7),
    ("seventh", 7),
    ("eight", 8),
    ("eighth", 8),
    ("nine", 9),
    ("ninth", 9),
    ("ten", 10),
    ("tenth", 10),
];

const OLDER: &[&str] = &["older", "earlier", "previous", "more"];
const NEWER: &[&str] = &["newer", "recent", "back"];

pub fn manifest() -> AbilityManifest {
    AbilityManifest::new(ID, ["journal", "voice journal", "dear diary"])
        .with_description("A private spoken journal.")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalPrefs {
    pub name: Option<String>,
    pub entry_count: u64,
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub timestamp: String,
    pub text: String,
}

impl Entry {
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            text: text.into(),
        }
    }

    /// Lines without a separator are kept whole, with no timestamp.
    pub fn parse(line: &str) -> Self {
        match line.split_once(SEPARATOR) {
            Some((timestamp, text)) => Self {
                timestamp: timestamp.trim().to_string(),
                text: text.trim().to_string(),
            },
            None => Self {
                timestamp: String::new(),
                text: line.trim().to_string(),
            },
        }
    }

    pub fn to_line(&self) -> String {
        format!("{}{SEPARATOR}{}", self.timestamp, self.text)
    }

    fn spoken(&self) -> String {
        let text = self.text.trim_end_matches(['.', '!', '?']);
        match self.timestamp.split_whitespace().next() {
            Some(date) => format!("on {date}, {text}"),
            None => text.to_string(),
        }
    }
}

fn speak_entries(entries: &[Entry]) -> String {
    entries
        .iter()
        .map(Entry::spoken)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Entries whose text mentions `query`, newest first.
pub fn search_entries(entries: &[Entry], query: &str) -> Vec<Entry> {
    let needle = query.trim().to_lowercase();
    entries
        .iter()
        .rev()
        .filter(|e| e.text.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Index into `entries` (oldest first) of entry `number`, counted from the
/// newest starting at 1.
pub fn index_of_number(len: usize, number: usize) -> Option<usize> {
    (1..=len).contains(&number).then(|| len - number)
}

/// One page of entries read out with their numbers, newest first.
fn numbered_page(entries: &[Entry], page: usize) -> String {
    let first = page * PAGE_SIZE + 1;
    let last = (first + PAGE_SIZE - 1).min(entries.len());
    let listed = (first..=last)
        .filter_map(|n| index_of_number(entries.len(), n).map(|i| (n, &entries[i])))
        .map(|(n, entry)| format!("Number {n}: {}.", entry.spoken()))
        .collect::<Vec<_>>()
        .join(" ");
    let header = if page == 0 {
        "Here are your recent entries."
    } else {
        "Here are older entries."
    };
    format!("{header} {listed}")
}

fn page_count(len: usize) -> usize {
    len.div_ceil(PAGE_SIZE).max(1)
}

/// An entry number said without the model: digits, a number word, an
/// ordinal, or "last" for the newest.
pub fn parse_number(text: &str) -> Option<usize> {
    let cleaned = clean_input(text);
    cleaned.split_whitespace().find_map(|word| {
        if let Ok(n) = word.parse::<usize>() {
            return Some(n);
        }
        if matches!(word, "last" | "latest" | "newest") {
            return Some(1);
        }
        ORDINALS
            .iter()
            .find(|(w, _)| *w == word)
            .map(|(_, n)| *n)
    })
}

// ---------------------------------------------------------------------------
// Intents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Help,
    Name,
    DeleteAll,
    DeleteLast,
    DeletePick,
    EditLast,
    EditPick,
    Search,
    Read,
    Add,
}

fn keyword_table() -> KeywordTable<Command> {
    let rows: [(Command, &[&str]); 10] = [
        (Command::Help, &["help", "what can you do", "commands"]),
        (Command::Name, &["call me", "my name is"]),
        (
            Command::DeleteAll,
            &[
                "delete all entries",
                "delete all my entries",
                "delete everything",
                "clear my journal",
                "erase my journal",
            ],
        ),
        (
            Command::DeleteLast,
            &["delete my last entry", "delete the last entry", "delete last entry"],
        ),
        (
            Command::DeletePick,
            &["delete an entry", "delete entry", "remove an entry", "remove entry"],
        ),
        (
            Command::EditLast,
            &["edit my last entry", "edit the last entry", "edit last entry", "change my last entry"],
        ),
        (
            Command::EditPick,
            &["edit an entry", "edit entry", "change an entry", "change entry"],
        ),
        (Command::Search, &["search for", "search my journal for", "find entries about"]),
        (
            Command::Read,
            &["read my journal", "read my entries", "read my last entries", "read back", "what did i write"],
        ),
        (
            Command::Add,
            &["new entry", "add entry", "add", "write down", "note that", "journal that"],
        ),
    ];

    let mut table = KeywordTable::new();
    for (command, phrases) in rows {
        table = match table.row(command, phrases.iter().copied()) {
            Ok(table) => table,
            Err(e) => {
                warn!(error = %e, "journal keywords rejected, using the model only");
                return KeywordTable::new();
            }
        };
    }
    table
}

/// Which entry a delete or edit is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Last,
    Number(usize),
    /// Read the entries out and ask.
    Choose,
}

impl Target {
    fn from_words(text: Option<&str>) -> Self {
        match text.map(clean_input).as_deref() {
            Some("last" | "the last" | "last one" | "the last one" | "latest") => Self::Last,
            Some(other) => parse_number(other).map_or(Self::Choose, Self::Number),
            None => Self::Choose,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalIntent {
    Add(Option<String>),
    Read,
    Search(Option<String>),
    Delete(Target),
    DeleteAll,
    Edit(Target),
    Help,
    /// Only from the "call me" keyword.
    SetName(String),
    Unknown,
}

impl IntentSchema for JournalIntent {
    fn from_record(record: &IntentRecord) -> Option<Self> {
        match record.label.as_str() {
            "add" => Some(Self::Add(record.param("text").map(str::to_string))),
            "read" => Some(Self::Read),
            "search" => Some(Self::Search(record.param("query").map(str::to_string))),
            "delete" => Some(Self::Delete(Target::from_words(record.param("which")))),
            "delete_all" => Some(Self::DeleteAll),
            "edit" => Some(Self::Edit(Target::from_words(record.param("which")))),
            "help" => Some(Self::Help),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    fn fallback() -> Self {
        Self::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Delete,
    Edit,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Edit => "edit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    EntryText,
    ConfirmSave,
    PickEntry(Action),
    ConfirmDelete,
    ConfirmDeleteAll,
    EditText,
    SearchQuery,
}

/// Text following `phrase` in the original utterance, case preserved.
///
/// `phrase` is matched on word boundaries, as the keyword table does, so
/// "add" never lands inside "Paddy".  Falls back to the cleaned remainder.
fn text_after(original: &str, phrase: &str, remainder: &str) -> String {
    let words: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
    let pattern = format!(r"(?i)(?:^|[^\w'])({})(?:$|[^\w'])", words.join(r"[\s,]+"));
    let found = Regex::new(&pattern)
        .ok()
        .and_then(|re| re.captures(original))
        .and_then(|caps| caps.get(1));
    match found {
        Some(m) => original[m.end()..]
            .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ':' | '-'))
            .trim()
            .to_string(),
        None => remainder.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

pub struct Journal {
    prefs: JournalPrefs,
    pending: PendingState<Slot>,
    reasked: bool,
    keywords: KeywordTable<Command>,
    classifier: IntentClassifier,
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

impl Journal {
    pub fn new() -> Self {
        Self {
            prefs: JournalPrefs::default(),
            pending: PendingState::new(),
            reasked: false,
            keywords: keyword_table(),
            classifier: IntentClassifier::new(SCHEMA),
        }
    }

    fn log(worker: &Worker) -> LineLog {
        LineLog::new(worker.storage_handle(), ENTRIES_FILE)
    }

    async fn entries(worker: &Worker) -> Result<Vec<Entry>> {
        let lines = Self::log(worker).lines().await?;
        Ok(lines.iter().map(|l| Entry::parse(l)).collect())
    }

    async fn understand(&self, worker: &Worker, utterance: &str) -> JournalIntent {
        if let Some(hit) = self.keywords.strip_matched(utterance) {
            debug!(command = ?hit.label, phrase = %hit.phrase, "journal keyword");
            let rest = text_after(utterance, &hit.phrase, &hit.remainder);
            let rest = (!rest.is_empty()).then_some(rest);
            return match hit.label {
                Command::Help => JournalIntent::Help,
                Command::Name => rest.map_or(JournalIntent::Unknown, JournalIntent::SetName),
                Command::DeleteAll => JournalIntent::DeleteAll,
                Command::DeleteLast => JournalIntent::Delete(Target::Last),
                Command::DeletePick => JournalIntent::Delete(Target::from_words(rest.as_deref())),
                Command::EditLast => JournalIntent::Edit(Target::Last),
                Command::EditPick => JournalIntent::Edit(Target::from_words(rest.as_deref())),
                Command::Search => JournalIntent::Search(rest),
                Command::Read => JournalIntent::Read,
                Command::Add => JournalIntent::Add(rest),
            };
        }
        self.classifier
            .classify(worker.model(), utterance, None, &[])
            .await
    }

    /// Wait for `slot` with a fresh re-ask allowance.
    fn ask(&mut self, slot: Slot) {
        self.pending.wait_for(slot);
        self.reasked = false;
    }

    async fn offer_save(&mut self, worker: &Worker, text: String) -> Result<()> {
        worker
            .speak(&format!("I'll save: {text}. Should I save it?"))
            .await?;
        self.pending.clear();
        self.pending.fill("text", text);
        self.ask(Slot::ConfirmSave);
        Ok(())
    }

    async fn save_entry(&mut self, worker: &Worker, text: &str) -> Result<()> {
        Self::log(worker).append(&Entry::now(text).to_line()).await?;
        self.prefs.entry_count += 1;
        save_json(worker.storage(), PREFS_FILE, &self.prefs).await?;
        debug!(entries = self.prefs.entry_count, "journal entry saved");
        Ok(())
    }

    async fn sync_count(&mut self, worker: &Worker, count: usize) -> Result<()> {
        self.prefs.entry_count = count as u64;
        save_json(worker.storage(), PREFS_FILE, &self.prefs).await?;
        Ok(())
    }

    /// The chosen entry's index, if it still exists.
    fn chosen(&self, len: usize) -> Option<usize> {
        self.pending
            .get("index")
            .and_then(|i| i.parse::<usize>().ok())
            .filter(|i| *i < len)
    }

    /// Start a delete or edit of `target`.
    async fn select(&mut self, worker: &Worker, action: Action, target: Target) -> Result<()> {
        let entries = Self::entries(worker).await?;
        if entries.is_empty() {
            worker.speak("Your journal is empty.").await?;
            return Ok(());
        }
        let index = match target {
            Target::Last => entries.len() - 1,
            Target::Number(n) => match index_of_number(entries.len(), n) {
                Some(index) => index,
                None => {
                    let reply = format!("Please pick a number between 1 and {}.", entries.len());
                    worker.speak(&reply).await?;
                    return Ok(());
                }
            },
            Target::Choose => {
                self.pending.clear();
                self.pending.fill("page", "0");
                self.ask(Slot::PickEntry(action));
                return self.list_page(worker, &entries, action, 0).await;
            }
        };
        self.chose(worker, &entries, action, index).await
    }

    async fn list_page(
        &self,
        worker: &Worker,
        entries: &[Entry],
        action: Action,
        page: usize,
    ) -> Result<()> {
        let mut text = numbered_page(entries, page);
        text.push_str(&format!(" Which number do you want to {}?", action.verb()));
        if page + 1 < page_count(entries.len()) {
            text.push_str(" Or say older for earlier entries.");
        }
        worker.speak(&text).await?;
        Ok(())
    }

    /// An entry has been picked: confirm a delete, or ask for the new text.
    async fn chose(
        &mut self,
        worker: &Worker,
        entries: &[Entry],
        action: Action,
        index: usize,
    ) -> Result<()> {
        let is_last = index + 1 == entries.len();
        self.pending.clear();
        self.pending.fill("index", index.to_string());
        let prompt = match (action, is_last) {
            (Action::Delete, true) => {
                self.ask(Slot::ConfirmDelete);
                format!("Delete your last entry: {}?", entries[index].text)
            }
            (Action::Delete, false) => {
                self.ask(Slot::ConfirmDelete);
                format!("Delete this entry: {}?", entries[index].spoken())
            }
            (Action::Edit, true) => {
                self.ask(Slot::EditText);
                "What should your last entry say instead?".to_string()
            }
            (Action::Edit, false) => {
                self.ask(Slot::EditText);
                format!("Editing {}. What should it say instead?", entries[index].spoken())
            }
        };
        worker.speak(&prompt).await?;
        Ok(())
    }

    async fn pick(&mut self, worker: &Worker, action: Action, utterance: &str) -> Result<()> {
        let entries = Self::entries(worker).await?;
        if entries.is_empty() {
            self.pending.clear();
            worker.speak("Your journal is empty.").await?;
            return Ok(());
        }

        let page = self
            .pending
            .get("page")
            .and_then(|p| p.parse::<usize>().ok())
            .unwrap_or(0);
        let cleaned = clean_input(utterance);
        let said = |words: &[&str]| cleaned.split_whitespace().any(|w| words.contains(&w));
        if parse_number(utterance).is_none() {
            if said(OLDER) {
                let next = page + 1;
                if next < page_count(entries.len()) {
                    self.pending.fill("page", next.to_string());
                    return self.list_page(worker, &entries, action, next).await;
                }
                worker
                    .speak("There are no older entries. Pick a number from the list.")
                    .await?;
                return Ok(());
            }
            if said(NEWER) && page > 0 {
                self.pending.fill("page", (page - 1).to_string());
                return self.list_page(worker, &entries, action, page - 1).await;
            }
        }

        let number = match parse_number(utterance) {
            Some(n) => Some(n),
            None => self.model_number(worker, utterance).await,
        };
        let Some(number) = number else {
            self.pending.clear();
            worker
                .speak("I couldn't figure out which entry you meant.")
                .await?;
            return Ok(());
        };

        match index_of_number(entries.len(), number) {
            Some(index) => self.chose(worker, &entries, action, index).await,
            None if !self.reasked => {
                self.reasked = true;
                let reply = format!("Please pick a number between 1 and {}.", entries.len());
                worker.speak(&reply).await?;
                Ok(())
            }
            None => {
                self.pending.clear();
                worker.speak("I'll leave your journal as it is.").await?;
                Ok(())
            }
        }
    }

    async fn model_number(&self, worker: &Worker, utterance: &str) -> Option<usize> {
        let prompt = format!(
            "The user was asked to pick an entry number and said: \"{}\"\n\
             Reply with ONLY the number they chose, for example 2 for \"the second one\". \
             Reply 0 if unclear.",
            utterance.trim()
        );
        match worker.text_to_text(&prompt).await {
            Ok(reply) => parse_number(&reply).filter(|n| *n > 0),
            Err(e) => {
                warn!(error = %e, "entry number extraction failed");
                None
            }
        }
    }

    async fn edit(&mut self, worker: &Worker, utterance: &str) -> Result<()> {
        let mut lines = Self::log(worker).lines().await?;
        let index = self.chosen(lines.len());
        self.pending.clear();
        let Some(index) = index else {
            worker.speak("I couldn't find that entry anymore.").await?;
            return Ok(());
        };

        let is_last = index + 1 == lines.len();
        let mut entry = Entry::parse(&lines[index]);
        entry.text = utterance.trim().to_string();
        lines[index] = entry.to_line();
        Self::log(worker).rewrite(&lines).await?;
        let reply = if is_last {
            "Updated your last entry."
        } else {
            "Updated that entry."
        };
        worker.speak(reply).await?;
        Ok(())
    }

    async fn delete_chosen(&mut self, worker: &Worker) -> Result<&'static str> {
        let mut lines = Self::log(worker).lines().await?;
        let Some(index) = self.chosen(lines.len()) else {
            return Ok("I couldn't find that entry anymore.");
        };
        let is_last = index + 1 == lines.len();
        lines.remove(index);
        Self::log(worker).rewrite(&lines).await?;
        self.sync_count(worker, lines.len()).await?;
        Ok(if is_last {
            "Deleted your last entry."
        } else {
            "Deleted that entry."
        })
    }

    async fn delete_all(&mut self, worker: &Worker) -> Result<()> {
        worker.storage().delete(ENTRIES_FILE).await?;
        self.sync_count(worker, 0).await?;
        debug!("journal cleared");
        Ok(())
    }

    /// Handle an answer to whatever `slot` asked.
    async fn answer(&mut self, worker: &Worker, slot: Slot, utterance: &str) -> Result<()> {
        match slot {
            Slot::EntryText => {
                self.offer_save(worker, utterance.trim().to_string()).await?;
            }
            Slot::SearchQuery => {
                self.pending.clear();
                self.search(worker, utterance.trim()).await?;
            }
            Slot::PickEntry(action) => self.pick(worker, action, utterance).await?,
            Slot::EditText => self.edit(worker, utterance).await?,
            Slot::ConfirmSave | Slot::ConfirmDelete | Slot::ConfirmDeleteAll => {
                self.confirm(worker, slot, utterance).await?;
            }
        }
        Ok(())
    }

    async fn confirm(&mut self, worker: &Worker, slot: Slot, utterance: &str) -> Result<()> {
        let reply = match parse_confirmation(utterance) {
            Confirmation::Unclear if !self.reasked => {
                self.reasked = true;
                worker.speak("Sorry, was that a yes or a no?").await?;
                return Ok(());
            }
            Confirmation::Yes => match slot {
                Slot::ConfirmSave => {
                    let text = self.pending.get("text").unwrap_or_default().to_string();
                    self.save_entry(worker, &text).await?;
                    "Saved."
                }
                Slot::ConfirmDeleteAll => {
                    self.delete_all(worker).await?;
                    "Done. Your journal has been cleared."
                }
                _ => self.delete_chosen(worker).await?,
            },
            Confirmation::No => match slot {
                Slot::ConfirmSave => "Okay, I won't save that.",
                Slot::ConfirmDeleteAll => "Okay, your entries are safe.",
                _ => "Okay, I kept it.",
            },
            Confirmation::Unclear => match slot {
                Slot::ConfirmSave => "I'll leave that unsaved.",
                _ => "I'll leave your journal as it is.",
            },
        };
        self.pending.clear();
        worker.speak(reply).await?;
        Ok(())
    }

    async fn search(&mut self, worker: &Worker, query: &str) -> Result<()> {
        let entries = Self::entries(worker).await?;
        let found = search_entries(&entries, query);
        let reply = match found.len() {
            0 => format!("I didn't find anything about {query}."),
            n => {
                let shown = &found[..n.min(MAX_SPOKEN)];
                let noun = if n == 1 { "entry" } else { "entries" };
                format!(
                    "I found {n} {noun} mentioning {query}: {}.",
                    speak_entries(shown)
                )
            }
        };
        worker.speak(&reply).await?;
        Ok(())
    }
}

#[async_trait]
impl Conversation for Journal {
    fn greeting(&self) -> String {
        match &self.prefs.name {
            Some(name) => format!("Hi {name}, your journal is open. What would you like to do?"),
            None => "Your journal is open. What would you like to do?".to_string(),
        }
    }

    fn max_turns(&self) -> usize {
        15
    }

    fn awaiting_answer(&self) -> bool {
        !self.pending.is_idle()
    }

    async fn on_start(&mut self, worker: &Worker) -> Result<()> {
        self.prefs = match load_json(worker.storage(), PREFS_FILE).await {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!(error = %e, "could not load journal preferences");
                JournalPrefs::default()
            }
        };
        Ok(())
    }

    async fn handle(&mut self, worker: &Worker, utterance: &str) -> Result<TurnOutcome> {
        if let Some(slot) = self.pending.waiting_for().copied() {
            self.answer(worker, slot, utterance).await?;
            return Ok(TurnOutcome::Continue);
        }

        let intent = self.understand(worker, utterance).await;
        debug!(intent = ?intent, "journal intent");

        match intent {
            JournalIntent::Add(Some(text)) => self.offer_save(worker, text).await?,
            JournalIntent::SetName(name) => {
                let name = super::weather::title_case(&name);
                self.prefs.name = Some(name.clone());
                save_json(worker.storage(), PREFS_FILE, &self.prefs).await?;
                worker.speak(&format!("Nice to meet you, {name}.")).await?;
            }
            JournalIntent::Add(None) => {
                self.ask(Slot::EntryText);
                worker.speak("What would you like to write?").await?;
            }
            JournalIntent::Read => {
                let entries = Self::entries(worker).await?;
                let reply = if entries.is_empty() {
                    "Your journal is empty.".to_string()
                } else {
                    let start = entries.len().saturating_sub(MAX_SPOKEN);
                    let recent = &entries[start..];
                    match recent.len() {
                        1 => format!("Your last entry: {}.", speak_entries(recent)),
                        n => format!("Your last {n} entries: {}.", speak_entries(recent)),
                    }
                };
                worker.speak(&reply).await?;
            }
            JournalIntent::Search(Some(query)) => self.search(worker, &query).await?,
            JournalIntent::Search(None) => {
                self.ask(Slot::SearchQuery);
                worker.speak("What should I search for?").await?;
            }
            JournalIntent::Delete(target) => self.select(worker, Action::Delete, target).await?,
            JournalIntent::Edit(target) => self.select(worker, Action::Edit, target).await?,
            JournalIntent::DeleteAll => {
                let count = Self::entries(worker).await?.len();
                let reply = match count {
                    0 => "Your journal is already empty.".to_string(),
                    1 => "This will permanently delete your only entry. Are you sure?".to_string(),
                    n => format!("This will permanently delete all {n} entries. Are you sure?"),
                };
                if count > 0 {
                    self.ask(Slot::ConfirmDeleteAll);
                }
                worker.speak(&reply).await?;
            }
            JournalIntent::Help => worker.speak(HELP).await?,
            JournalIntent::Unknown => worker.speak(UNKNOWN).await?,
        }
        Ok(TurnOutcome::Continue)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
