//! Inline keyboards and their callback data

use promocore::gateway::CallToAction;
use promocore::session::Prompt;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

/// Telegram rejects callback data longer than this many bytes
pub const MAX_CALLBACK_BYTES: usize = 64;

const ITEM_PREFIX: &str = "item:";
const ITEM_INDEX_PREFIX: &str = "item#";

/// What a button press asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    MainMenu,
    Items,
    /// Item by name
    Item(String),
    /// Item by position in the listing, for names too long for callback data
    ItemAt(usize),
    Asset,
    Earn,
    Balance,
    Withdraw,
    AdminSkip,
    AdminCancel,
    AdminConfirm,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        let action = match data {
            "main_menu" => CallbackAction::MainMenu,
            "items" => CallbackAction::Items,
            "asset" => CallbackAction::Asset,
            "earn" => CallbackAction::Earn,
            "balance" => CallbackAction::Balance,
            "withdraw" => CallbackAction::Withdraw,
            "admin:skip" => CallbackAction::AdminSkip,
            "admin:cancel" => CallbackAction::AdminCancel,
            "admin:confirm" => CallbackAction::AdminConfirm,
            other => {
                if let Some(name) = other.strip_prefix(ITEM_PREFIX) {
                    CallbackAction::Item(name.to_string())
                } else {
                    let index = other.strip_prefix(ITEM_INDEX_PREFIX)?;
                    CallbackAction::ItemAt(index.parse().ok()?)
                }
            }
        };
        Some(action)
    }

    pub fn encode(&self) -> String {
        match self {
            CallbackAction::MainMenu => "main_menu".to_string(),
            CallbackAction::Items => "items".to_string(),
            CallbackAction::Item(name) => format!("{}{}", ITEM_PREFIX, name),
            CallbackAction::ItemAt(index) => format!("{}{}", ITEM_INDEX_PREFIX, index),
            CallbackAction::Asset => "asset".to_string(),
            CallbackAction::Earn => "earn".to_string(),
            CallbackAction::Balance => "balance".to_string(),
            CallbackAction::Withdraw => "withdraw".to_string(),
            CallbackAction::AdminSkip => "admin:skip".to_string(),
            CallbackAction::AdminCancel => "admin:cancel".to_string(),
            CallbackAction::AdminConfirm => "admin:confirm".to_string(),
        }
    }

    /// Button action for the item at `index` of the listing
    pub fn for_item(name: &str, index: usize) -> Self {
        if ITEM_PREFIX.len() + name.len() <= MAX_CALLBACK_BYTES {
            CallbackAction::Item(name.to_string())
        } else {
            CallbackAction::ItemAt(index)
        }
    }
}

fn button(label: &str, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.encode())
}

fn back_row() -> Vec<InlineKeyboardButton> {
    vec![button("◀️ Main menu", CallbackAction::MainMenu)]
}

pub fn main_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            button("📊 Daily picks", CallbackAction::Items),
            button("📱 Download", CallbackAction::Asset),
        ],
        vec![
            button("💰 Earn", CallbackAction::Earn),
            button("💵 Balance", CallbackAction::Balance),
        ],
    ])
}

pub fn back() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![back_row()])
}

pub fn items(names: &[String]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = names
        .iter()
        .enumerate()
        .map(|(index, name)| vec![button(name, CallbackAction::for_item(name, index))])
        .collect();
    rows.push(back_row());
    InlineKeyboardMarkup::new(rows)
}

/// Item view: its link button, if any, above the way back
pub fn item(call_to_action: Option<&CallToAction>) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if let Some(row) = call_to_action.and_then(link_row) {
        rows.push(row);
    }
    rows.push(back_row());
    InlineKeyboardMarkup::new(rows)
}

/// Link button alone, attached to replicated broadcast copies
pub fn call_to_action(call_to_action: &CallToAction) -> Option<InlineKeyboardMarkup> {
    link_row(call_to_action).map(|row| InlineKeyboardMarkup::new(vec![row]))
}

fn link_row(call_to_action: &CallToAction) -> Option<Vec<InlineKeyboardButton>> {
    match Url::parse(&call_to_action.url) {
        Ok(url) => Some(vec![InlineKeyboardButton::url(call_to_action.label.clone(), url)]),
        Err(e) => {
            log::warn!("Dropping button with bad link {:?}: {}", call_to_action.url, e);
            None
        }
    }
}

/// `https://t.me/share/url?url=<link>&text=<invite>`
pub fn share_url(link: &str, text: &str) -> Option<Url> {
    Url::parse_with_params("https://t.me/share/url", &[("url", link), ("text", text)]).ok()
}

pub fn earn(share: Option<Url>) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if let Some(url) = share {
        rows.push(vec![InlineKeyboardButton::url("📤 Share", url)]);
    }
    rows.push(vec![button("💸 Withdraw", CallbackAction::Withdraw)]);
    rows.push(back_row());
    InlineKeyboardMarkup::new(rows)
}

pub fn balance() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("💸 Withdraw", CallbackAction::Withdraw)], back_row()])
}

pub fn withdraw(site: Option<Url>) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if let Some(url) = site {
        rows.push(vec![InlineKeyboardButton::url("💳 Open the site", url)]);
    }
    rows.push(back_row());
    InlineKeyboardMarkup::new(rows)
}

/// Skip, confirm and cancel buttons matching what `prompt` accepts
pub fn admin_controls(prompt: &Prompt) -> InlineKeyboardMarkup {
    let mut row = Vec::new();
    if prompt.is_optional() {
        row.push(button("⏭ Skip", CallbackAction::AdminSkip));
    }
    if matches!(prompt, Prompt::DeleteConfirm { .. }) {
        row.push(button("🗑 Confirm", CallbackAction::AdminConfirm));
    }
    row.push(button("✖️ Cancel", CallbackAction::AdminCancel));
    InlineKeyboardMarkup::new(vec![row])
}
