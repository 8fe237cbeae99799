//! User-facing wording
//!
//! Every string the bot sends lives here. Texts that embed user or admin
//! input are HTML and go through [`escape_html`]; the rest are plain.

use indoc::{formatdoc, indoc};
use promocore::broadcast::{DeliveryProgress, DeliveryReport};
use promocore::config::LedgerSettings;
use promocore::content::{AssetConfig, ContentError};
use promocore::gateway::Notice;
use promocore::ledger::{LedgerError, UserRecord};
use promocore::session::{Committed, Outcome, Prompt, Rejection, SessionError};
use promocore::AppError;

/// Currency label after every amount
pub const CURRENCY: &str = "sum";

pub const NOT_ADMIN: &str = "You are not an administrator.";
pub const GENERIC_ERROR: &str = "Something went wrong. Please try again later.";
pub const NO_ITEMS: &str = "No daily picks yet. Check back soon!";
pub const ITEM_GONE: &str = "This item is no longer available.";
pub const NO_ASSET: &str = "The file is not available yet. Check back soon!";
pub const DEFAULT_ASSET_CAPTION: &str = "📱 Download";
pub const ITEMS_HEADER: &str = "📊 <b>Today's picks:</b>";
pub const NO_SESSION: &str = "Nothing to skip or cancel.";
pub const NO_BROADCAST: &str = "No broadcast is running.";
pub const BROADCAST_STOPPING: &str = "Stopping the broadcast…";
pub const ASSET_REMOVED: &str = "✅ The shared file was removed.";
pub const ASSET_ALREADY_EMPTY: &str = "There is no shared file to remove.";
pub const EDIT_USAGE: &str = "Usage: /edit &lt;body|image|asset|cta&gt; &lt;item name&gt;";
pub const START_FIRST: &str = "Please send /start first.";
pub const UNKNOWN_COMMAND: &str = "Unknown command.";

/// Escapes the three characters Telegram's HTML mode reserves
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out
}

/// `15000` -> `15 000 sum`
pub fn amount(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    format!("{} {}", grouped, CURRENCY)
}

pub fn welcome(ledger: &LedgerSettings) -> String {
    formatdoc! {"
        🎰 <b>Welcome!</b>

        📢 Daily picks, express coupons and the latest promotions arrive here first.

        💰 You can also earn here:
        – Invite friends and get <b>{referral}</b> for each one.
        – A start bonus of <b>{start}</b> lands in your wallet shortly.

        👇 Explore with the buttons below:",
        referral = amount(ledger.referral_bonus),
        start = amount(ledger.start_bonus),
    }
}

pub fn main_menu() -> &'static str {
    indoc! {"
        🎰 <b>Main menu</b>

        👇 Explore with the buttons below:"}
}

pub fn earn(link: &str, ledger: &LedgerSettings) -> String {
    formatdoc! {"
        💰 <b>How to earn</b>

        1️⃣ Invite friends and get <b>{referral}</b> for each one.
        2️⃣ Your start bonus is <b>{start}</b>.
        3️⃣ The minimum withdrawal is <b>{min}</b>.

        Your referral link:
        <code>{link}</code>",
        referral = amount(ledger.referral_bonus),
        start = amount(ledger.start_bonus),
        min = amount(ledger.min_withdraw),
        link = escape_html(link),
    }
}

/// Prefilled text of the share dialog
pub fn share_invite() -> &'static str {
    "You can earn money with this bot! Let's start together."
}

pub fn balance(user: &UserRecord, min_withdraw: u64) -> String {
    formatdoc! {"
        💵 <b>Your balance</b>

        Balance: <b>{balance}</b>
        Friends invited: <b>{count}</b>

        Minimum withdrawal: {min}.",
        balance = amount(user.balance),
        count = user.referral_count,
        min = amount(min_withdraw),
    }
}

pub fn withdraw_eligible(code: &str) -> String {
    formatdoc! {"
        💸 <b>Withdrawal</b>

        Your personal 7-digit code: <code>{code}</code>
        Open the site with the button below and enter the code.",
        code = escape_html(code),
    }
}

pub fn withdraw_below_minimum(balance: u64, minimum: u64) -> String {
    format!(
        "❌ The minimum balance for a withdrawal is {}. You have {}.",
        amount(minimum),
        amount(balance)
    )
}

pub fn notice(notice: &Notice) -> String {
    match notice {
        Notice::ReferralCredited {
            referee_name,
            bonus,
            balance,
        } => formatdoc! {"
            🎉 A new user joined through your invitation!

            👤 {name}
            💰 {bonus} was added to your balance.
            💵 Current balance: {balance}",
            name = escape_html(referee_name.as_deref().unwrap_or("A user")),
            bonus = amount(*bonus),
            balance = amount(*balance),
        },
        Notice::StartBonusGranted { bonus, balance } => format!(
            "🎉 Congratulations! You received a start bonus of {}.\n💵 Current balance: {}",
            amount(*bonus),
            amount(*balance)
        ),
    }
}

pub fn prompt(prompt: &Prompt) -> String {
    match prompt {
        Prompt::ItemName => "Send the item name:".to_string(),
        Prompt::ItemBody => "Send the item text:".to_string(),
        Prompt::ItemImage => "Send a photo (optional, /skip):".to_string(),
        Prompt::ItemAsset => "Send a file to attach (optional, /skip):".to_string(),
        Prompt::CtaLabel => "Send the button label (optional, /skip):".to_string(),
        Prompt::CtaUrl => "Send the button link, starting with https:// (/skip drops the button):".to_string(),
        Prompt::DeleteName => "Send the name of the item to delete:".to_string(),
        Prompt::DeleteConfirm { name } => format!("Delete \"{}\"? Press Confirm or send /confirm.", escape_html(name)),
        Prompt::AssetFile { extension: Some(ext) } => format!("📤 Send the file (.{} format):", escape_html(ext)),
        Prompt::AssetFile { extension: None } => "📤 Send the file:".to_string(),
        Prompt::AssetDescription => "Send a short description (optional, /skip):".to_string(),
        Prompt::BroadcastMessage => "📨 Send the message for every user (text or media):".to_string(),
        Prompt::BroadcastButtonLabel => "Send a button label (optional, /skip):".to_string(),
        Prompt::BroadcastButtonUrl => "Send the button link, starting with https:// (/skip sends without button):".to_string(),
    }
}

pub fn rejection(reason: &Rejection) -> String {
    match reason {
        Rejection::ExpectedText => "❌ Please send text.".to_string(),
        Rejection::ExpectedPhoto => "❌ Please send a photo or /skip.".to_string(),
        Rejection::ExpectedDocument => "❌ Please send a file.".to_string(),
        Rejection::EmptyText => "❌ The text is empty.".to_string(),
        Rejection::NameTooLong { max } => format!("❌ The name is too long (max {} characters).", max),
        Rejection::DuplicateName(name) => format!("❌ An item named \"{}\" already exists.", escape_html(name)),
        Rejection::UnknownItem(name) => format!("❌ No item named \"{}\".", escape_html(name)),
        Rejection::InvalidUrl => "❌ That is not a valid http(s) link.".to_string(),
        Rejection::WrongExtension { expected } => format!("❌ Send a .{} file!", escape_html(expected)),
        Rejection::NotSkippable => "❌ This step can't be skipped.".to_string(),
        Rejection::ConfirmationRequired => "Press Confirm or send /confirm, or /cancel.".to_string(),
    }
}

pub fn committed(committed: &Committed) -> String {
    match committed {
        Committed::ItemCreated { name } => format!("✅ \"{}\" was added!", escape_html(name)),
        Committed::ItemUpdated { name, field } => format!("✅ {} of \"{}\" was updated.", field, escape_html(name)),
        Committed::ItemDeleted { name } => format!("✅ \"{}\" was deleted!", escape_html(name)),
        Committed::AssetConfigured { file_name } => match file_name {
            Some(name) => format!("✅ File {} uploaded!", escape_html(name)),
            None => "✅ File uploaded!".to_string(),
        },
    }
}

/// Reply for an engine outcome. `None` means stay silent.
pub fn outcome(outcome: &Outcome) -> Option<String> {
    let text = match outcome {
        Outcome::Idle => return None,
        Outcome::Prompt(p) => prompt(p),
        Outcome::Rejected { reason, prompt: p } => format!("{}\n\n{}", rejection(reason), prompt(p)),
        Outcome::Committed(c) => committed(c),
        Outcome::Aborted(reason) => format!("{}\nNothing was changed.", rejection(reason)),
        Outcome::Cancelled => "Cancelled.".to_string(),
        Outcome::Expired => "⌛ The session expired. Start again.".to_string(),
        Outcome::BroadcastStarted { recipients } => format!("📨 Sending to {} users…", recipients),
    };
    Some(text)
}

/// Chat reply for a failed operation; internal failures get a generic text
pub fn error(err: &AppError) -> String {
    match err {
        AppError::Session(SessionError::PermissionDenied) => NOT_ADMIN.to_string(),
        AppError::Session(SessionError::NotFound(name)) | AppError::Content(ContentError::NotFound(name)) => {
            rejection(&Rejection::UnknownItem(name.clone()))
        }
        AppError::Content(ContentError::DuplicateName(name)) => rejection(&Rejection::DuplicateName(name.clone())),
        AppError::Ledger(LedgerError::UserNotFound(_)) => START_FIRST.to_string(),
        _ => GENERIC_ERROR.to_string(),
    }
}

pub fn progress(p: &DeliveryProgress) -> String {
    format!(
        "📨 Sending… {}/{}\n✅ Delivered: {}\n❌ Failed: {}",
        p.attempted, p.total, p.delivered, p.failed
    )
}

pub fn report(report: &DeliveryReport) -> String {
    let header = if report.cancelled {
        "⏹ Broadcast stopped."
    } else {
        "✅ Broadcast finished!"
    };
    format!(
        "{}\n✅ Delivered: {}\n❌ Failed: {}\n👥 Total: {}",
        header, report.delivered, report.failed, report.total
    )
}

pub fn stats(users: usize, views: &[(String, u64)], asset: &AssetConfig) -> String {
    let mut text = format!("📈 <b>Statistics</b>\n\n👥 Users: {}\n", users);
    if views.is_empty() {
        text.push_str("📊 No items.\n");
    } else {
        text.push_str("📊 Item views:\n");
        for (name, count) in views {
            text.push_str(&format!("• {}: {}\n", escape_html(name), count));
        }
    }
    let file = match asset.file.as_ref() {
        Some(file) => file.file_name.as_deref().map(escape_html).unwrap_or_else(|| "uploaded".to_string()),
        None => "none".to_string(),
    };
    text.push_str(&format!("📱 Shared file: {}", file));
    text
}
