use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::outcome::{AdminInput, Committed, Outcome, Prompt, Rejection};
use super::state::{AssetState, AuthoringState, BroadcastState, DeleteState, EditField, EditState, Session};
use super::{SessionError, SessionResult};
use crate::broadcast::{BroadcastDispatcher, BroadcastHandle, LogProgress, ProgressSink};
use crate::content::{AssetFile, ContentError, ContentRepository, ItemField, NewItem};
use crate::core::config::{session as defaults, SessionSettings};
use crate::gateway::{CallToAction, Payload};
use crate::ledger::{LedgerError, LedgerService};
use crate::Identity;

struct SessionEntry {
    session: Session,
    last_activity: Instant,
}

impl SessionEntry {
    fn new(session: Session) -> Self {
        Self {
            session,
            last_activity: Instant::now(),
        }
    }
}

enum Transition {
    Next(Session),
    Reject(Rejection),
    /// Move to another state, telling the admin why
    Redirect(Session, Rejection),
    Finish(Outcome),
}

/// Internal short-circuit: a rejection re-prompts, a failure propagates
enum Halt {
    Reject(Rejection),
    Fail(SessionError),
}

impl From<Rejection> for Halt {
    fn from(r: Rejection) -> Self {
        Halt::Reject(r)
    }
}

impl From<SessionError> for Halt {
    fn from(e: SessionError) -> Self {
        Halt::Fail(e)
    }
}

impl From<ContentError> for Halt {
    fn from(e: ContentError) -> Self {
        Halt::Fail(e.into())
    }
}

impl From<LedgerError> for Halt {
    fn from(e: LedgerError) -> Self {
        Halt::Fail(e.into())
    }
}

type Step = Result<Transition, Halt>;

/// A value for an optional step, or the admin's explicit skip
enum Field<T> {
    Value(T),
    Skip,
}

impl<T> Field<T> {
    fn into_option(self) -> Option<T> {
        match self {
            Field::Value(v) => Some(v),
            Field::Skip => None,
        }
    }

    fn required(self) -> Result<T, Rejection> {
        match self {
            Field::Value(v) => Ok(v),
            Field::Skip => Err(Rejection::NotSkippable),
        }
    }
}

fn expect_text(input: AdminInput) -> Result<Field<String>, Rejection> {
    match input {
        AdminInput::Message(Payload::Text { text }) => {
            let text = text.trim();
            if text.is_empty() {
                Err(Rejection::EmptyText)
            } else {
                Ok(Field::Value(text.to_string()))
            }
        }
        AdminInput::Skip => Ok(Field::Skip),
        _ => Err(Rejection::ExpectedText),
    }
}

fn expect_photo(input: AdminInput) -> Result<Field<String>, Rejection> {
    match input {
        AdminInput::Message(Payload::Photo { file_id, .. }) => Ok(Field::Value(file_id)),
        AdminInput::Skip => Ok(Field::Skip),
        _ => Err(Rejection::ExpectedPhoto),
    }
}

fn expect_document(input: AdminInput) -> Result<Field<AssetFile>, Rejection> {
    match input {
        AdminInput::Message(Payload::Document { file_id, file_name, .. }) => {
            Ok(Field::Value(AssetFile::new(file_id, file_name)))
        }
        AdminInput::Skip => Ok(Field::Skip),
        _ => Err(Rejection::ExpectedDocument),
    }
}

fn expect_url(input: AdminInput) -> Result<Field<String>, Rejection> {
    match expect_text(input)? {
        Field::Value(text) => parse_link(&text).map(Field::Value).ok_or(Rejection::InvalidUrl),
        Field::Skip => Ok(Field::Skip),
    }
}

/// Accepts absolute http(s) URLs with a host
pub fn parse_link(text: &str) -> Option<String> {
    let text = text.trim();
    let url = url::Url::parse(text).ok()?;
    let web = matches!(url.scheme(), "http" | "https") && url.host_str().is_some();
    web.then(|| text.to_string())
}

fn edited_field(field: &ItemField) -> EditField {
    match field {
        ItemField::Body(_) => EditField::Body,
        ItemField::Image(_) => EditField::Image,
        ItemField::Asset(_) => EditField::Asset,
        ItemField::CallToAction(_) => EditField::CallToAction,
    }
}

/// Drives the administrator's multi-step flows.
///
/// One session per administrator identity, held in memory only. Inputs
/// for a session are processed one at a time: the map lock is held across
/// the commit.
pub struct SessionEngine {
    admin_id: Identity,
    content: Arc<ContentRepository>,
    ledger: Arc<LedgerService>,
    dispatcher: Arc<BroadcastDispatcher>,
    progress: Arc<dyn ProgressSink>,
    settings: SessionSettings,
    sessions: Mutex<HashMap<Identity, SessionEntry>>,
    active_broadcast: Mutex<Option<BroadcastHandle>>,
}

impl SessionEngine {
    pub fn new(
        admin_id: Identity,
        content: Arc<ContentRepository>,
        ledger: Arc<LedgerService>,
        dispatcher: Arc<BroadcastDispatcher>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            admin_id,
            content,
            ledger,
            dispatcher,
            progress: Arc::new(LogProgress),
            settings,
            sessions: Mutex::new(HashMap::new()),
            active_broadcast: Mutex::new(None),
        }
    }

    /// Where broadcast progress is reported
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn is_admin(&self, actor: Identity) -> bool {
        self.admin_id != 0 && actor == self.admin_id
    }

    fn authorize(&self, actor: Identity) -> SessionResult<()> {
        if self.is_admin(actor) {
            Ok(())
        } else {
            log::warn!("User {} tried an admin flow", actor);
            Err(SessionError::PermissionDenied)
        }
    }

    pub async fn start_authoring(&self, actor: Identity) -> SessionResult<Outcome> {
        self.begin(actor, Session::Authoring(AuthoringState::AwaitName)).await
    }

    /// # Errors
    /// [`SessionError::NotFound`] if no item has that name.
    pub async fn start_edit(&self, actor: Identity, field: EditField, name: &str) -> SessionResult<Outcome> {
        self.authorize(actor)?;
        let name = name.trim();
        if !self.content.exists(name).await? {
            return Err(SessionError::NotFound(name.to_string()));
        }
        self.begin(actor, Session::Edit(EditState::entry(field, name.to_string())))
            .await
    }

    /// Asks for a name, or goes straight to confirmation when one is given.
    pub async fn start_delete(&self, actor: Identity, name: Option<&str>) -> SessionResult<Outcome> {
        self.authorize(actor)?;
        let state = match name.map(str::trim).filter(|n| !n.is_empty()) {
            None => DeleteState::AwaitName,
            Some(name) => {
                if !self.content.exists(name).await? {
                    return Err(SessionError::NotFound(name.to_string()));
                }
                DeleteState::AwaitConfirm { name: name.to_string() }
            }
        };
        self.begin(actor, Session::Delete(state)).await
    }

    pub async fn start_asset_config(&self, actor: Identity) -> SessionResult<Outcome> {
        self.begin(actor, Session::AssetConfig(AssetState::AwaitFile)).await
    }

    pub async fn start_broadcast(&self, actor: Identity) -> SessionResult<Outcome> {
        self.begin(actor, Session::Broadcast(BroadcastState::AwaitMessage)).await
    }

    async fn begin(&self, actor: Identity, session: Session) -> SessionResult<Outcome> {
        self.authorize(actor)?;
        let kind = session.kind();
        let prompt = self.prompt_for(&session);
        let mut sessions = self.sessions.lock().await;
        if let Some(previous) = sessions.insert(actor, SessionEntry::new(session)) {
            log::info!("Admin {} left a {} session for a new one", actor, previous.session.kind());
        }
        log::info!("Admin {} started a {} session", actor, kind);
        Ok(Outcome::Prompt(prompt))
    }

    /// Feeds one input to the actor's session.
    ///
    /// # Errors
    /// [`SessionError::PermissionDenied`] for anyone but the administrator;
    /// store failures propagate and leave the session where it was.
    pub async fn handle_input(&self, actor: Identity, input: AdminInput) -> SessionResult<Outcome> {
        self.authorize(actor)?;
        let mut sessions = self.sessions.lock().await;
        let Some(entry) = sessions.get_mut(&actor) else {
            return Ok(Outcome::Idle);
        };

        if self.is_expired(entry, Instant::now()) {
            sessions.remove(&actor);
            log::info!("Admin {} session expired", actor);
            return Ok(Outcome::Expired);
        }
        if input == AdminInput::Cancel {
            sessions.remove(&actor);
            log::info!("Admin {} cancelled the session", actor);
            return Ok(Outcome::Cancelled);
        }

        entry.last_activity = Instant::now();
        let transition = match self.advance(&entry.session, input).await {
            Ok(transition) => transition,
            Err(Halt::Reject(reason)) => Transition::Reject(reason),
            Err(Halt::Fail(e)) => return Err(e),
        };

        match transition {
            Transition::Next(next) => {
                let prompt = self.prompt_for(&next);
                entry.session = next;
                Ok(Outcome::Prompt(prompt))
            }
            Transition::Reject(reason) => {
                log::debug!("Admin input rejected: {:?}", reason);
                Ok(Outcome::Rejected {
                    reason,
                    prompt: self.prompt_for(&entry.session),
                })
            }
            Transition::Redirect(next, reason) => {
                let prompt = self.prompt_for(&next);
                entry.session = next;
                Ok(Outcome::Rejected { reason, prompt })
            }
            Transition::Finish(outcome) => {
                sessions.remove(&actor);
                Ok(outcome)
            }
        }
    }

    /// Same as feeding [`AdminInput::Cancel`]
    pub async fn cancel(&self, actor: Identity) -> SessionResult<Outcome> {
        self.handle_input(actor, AdminInput::Cancel).await
    }

    /// The step the actor's live session is waiting on
    pub async fn current_prompt(&self, actor: Identity) -> Option<Prompt> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&actor)
            .filter(|entry| !self.is_expired(entry, Instant::now()))
            .map(|entry| self.prompt_for(&entry.session))
    }

    pub async fn has_session(&self, actor: Identity) -> bool {
        self.current_prompt(actor).await.is_some()
    }

    fn is_expired(&self, entry: &SessionEntry, now: Instant) -> bool {
        self.settings
            .idle_timeout()
            .is_some_and(|timeout| now.duration_since(entry.last_activity) >= timeout)
    }

    /// Drops every session idle past the timeout. Returns how many went.
    pub async fn expire_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_expired(entry, now));
        let expired = before - sessions.len();
        if expired > 0 {
            log::info!("Expired {} idle admin session(s)", expired);
        }
        expired
    }

    /// Periodically runs [`Self::expire_idle`]. `None` when expiry is off.
    pub fn spawn_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.settings.idle_timeout().is_none() {
            return None;
        }
        let engine = Arc::clone(self);
        let period = self.settings.sweep_interval();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                engine.expire_idle().await;
            }
        }))
    }

    /// Stops the running broadcast, if any
    pub async fn cancel_broadcast(&self) -> bool {
        match self.active_broadcast.lock().await.as_ref() {
            Some(handle) if !handle.is_finished() => {
                handle.cancel();
                true
            }
            _ => false,
        }
    }

    /// Takes the handle of the last started broadcast
    pub async fn take_broadcast(&self) -> Option<BroadcastHandle> {
        self.active_broadcast.lock().await.take()
    }

    fn prompt_for(&self, session: &Session) -> Prompt {
        match session {
            Session::Authoring(state) => match state {
                AuthoringState::AwaitName => Prompt::ItemName,
                AuthoringState::AwaitBody { .. } => Prompt::ItemBody,
                AuthoringState::AwaitImage { .. } => Prompt::ItemImage,
                AuthoringState::AwaitAsset { .. } => Prompt::ItemAsset,
                AuthoringState::AwaitCtaLabel { .. } => Prompt::CtaLabel,
                AuthoringState::AwaitCtaUrl { .. } => Prompt::CtaUrl,
            },
            Session::Edit(state) => match state {
                EditState::AwaitBody { .. } => Prompt::ItemBody,
                EditState::AwaitImage { .. } => Prompt::ItemImage,
                EditState::AwaitAsset { .. } => Prompt::ItemAsset,
                EditState::AwaitCtaLabel { .. } => Prompt::CtaLabel,
                EditState::AwaitCtaUrl { .. } => Prompt::CtaUrl,
            },
            Session::Delete(DeleteState::AwaitName) => Prompt::DeleteName,
            Session::Delete(DeleteState::AwaitConfirm { name }) => Prompt::DeleteConfirm { name: name.clone() },
            Session::AssetConfig(AssetState::AwaitFile) => Prompt::AssetFile {
                extension: self.settings.asset_extension().map(str::to_string),
            },
            Session::AssetConfig(AssetState::AwaitDescription { .. }) => Prompt::AssetDescription,
            Session::Broadcast(BroadcastState::AwaitMessage) => Prompt::BroadcastMessage,
            Session::Broadcast(BroadcastState::AwaitButtonLabel { .. }) => Prompt::BroadcastButtonLabel,
            Session::Broadcast(BroadcastState::AwaitButtonUrl { .. }) => Prompt::BroadcastButtonUrl,
        }
    }

    async fn advance(&self, session: &Session, input: AdminInput) -> Step {
        match session {
            Session::Authoring(state) => self.advance_authoring(state, input).await,
            Session::Edit(state) => self.advance_edit(state, input).await,
            Session::Delete(state) => self.advance_delete(state, input).await,
            Session::AssetConfig(state) => self.advance_asset(state, input).await,
            Session::Broadcast(state) => self.advance_broadcast(state, input).await,
        }
    }

    async fn advance_authoring(&self, state: &AuthoringState, input: AdminInput) -> Step {
        let next = match state {
            AuthoringState::AwaitName => {
                let name = expect_text(input)?.required()?;
                self.check_new_name(&name).await?;
                AuthoringState::AwaitBody { name }
            }
            AuthoringState::AwaitBody { name } => AuthoringState::AwaitImage {
                name: name.clone(),
                body: expect_text(input)?.required()?,
            },
            AuthoringState::AwaitImage { name, body } => AuthoringState::AwaitAsset {
                name: name.clone(),
                body: body.clone(),
                image: expect_photo(input)?.into_option(),
            },
            AuthoringState::AwaitAsset { name, body, image } => AuthoringState::AwaitCtaLabel {
                item: NewItem {
                    name: name.clone(),
                    body: body.clone(),
                    image: image.clone(),
                    asset: expect_document(input)?.into_option(),
                    call_to_action: None,
                },
            },
            // Skipping the label skips the URL too
            AuthoringState::AwaitCtaLabel { item } => match expect_text(input)? {
                Field::Value(label) => AuthoringState::AwaitCtaUrl {
                    item: item.clone(),
                    label,
                },
                Field::Skip => return self.commit_item(item.clone()).await,
            },
            AuthoringState::AwaitCtaUrl { item, label } => {
                let mut item = item.clone();
                item.call_to_action = expect_url(input)?
                    .into_option()
                    .map(|url| CallToAction::new(label.clone(), url));
                return self.commit_item(item).await;
            }
        };
        Ok(Transition::Next(Session::Authoring(next)))
    }

    async fn check_new_name(&self, name: &str) -> Result<(), Halt> {
        let max = defaults::MAX_ITEM_NAME_CHARS;
        if name.chars().count() > max {
            return Err(Rejection::NameTooLong { max }.into());
        }
        if self.content.exists(name).await? {
            return Err(Rejection::DuplicateName(name.to_string()).into());
        }
        Ok(())
    }

    async fn commit_item(&self, item: NewItem) -> Step {
        match self.content.create(item).await {
            Ok(item) => Ok(Transition::Finish(Outcome::Committed(Committed::ItemCreated {
                name: item.name,
            }))),
            // Another create won the name since it was checked
            Err(ContentError::DuplicateName(name)) => Ok(Transition::Redirect(
                Session::Authoring(AuthoringState::AwaitName),
                Rejection::DuplicateName(name),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn advance_edit(&self, state: &EditState, input: AdminInput) -> Step {
        let (name, field) = match state {
            EditState::AwaitBody { name } => (name, ItemField::Body(expect_text(input)?.required()?)),
            EditState::AwaitImage { name } => (name, ItemField::Image(expect_photo(input)?.into_option())),
            EditState::AwaitAsset { name } => (name, ItemField::Asset(expect_document(input)?.into_option())),
            EditState::AwaitCtaLabel { name } => match expect_text(input)? {
                Field::Value(label) => {
                    return Ok(Transition::Next(Session::Edit(EditState::AwaitCtaUrl {
                        name: name.clone(),
                        label,
                    })))
                }
                Field::Skip => (name, ItemField::CallToAction(None)),
            },
            EditState::AwaitCtaUrl { name, label } => (
                name,
                ItemField::CallToAction(
                    expect_url(input)?
                        .into_option()
                        .map(|url| CallToAction::new(label.clone(), url)),
                ),
            ),
        };

        let edited = edited_field(&field);
        match self.content.update_field(name, field).await {
            Ok(item) => Ok(Transition::Finish(Outcome::Committed(Committed::ItemUpdated {
                name: item.name,
                field: edited,
            }))),
            Err(ContentError::NotFound(name)) => Ok(Transition::Finish(Outcome::Aborted(Rejection::UnknownItem(name)))),
            Err(e) => Err(e.into()),
        }
    }

    async fn advance_delete(&self, state: &DeleteState, input: AdminInput) -> Step {
        match state {
            DeleteState::AwaitName => {
                let name = expect_text(input)?.required()?;
                if !self.content.exists(&name).await? {
                    return Err(Rejection::UnknownItem(name).into());
                }
                Ok(Transition::Next(Session::Delete(DeleteState::AwaitConfirm { name })))
            }
            DeleteState::AwaitConfirm { name } => {
                if input != AdminInput::Confirm {
                    return Err(Rejection::ConfirmationRequired.into());
                }
                match self.content.delete(name).await {
                    Ok(()) => Ok(Transition::Finish(Outcome::Committed(Committed::ItemDeleted {
                        name: name.clone(),
                    }))),
                    Err(ContentError::NotFound(name)) => {
                        Ok(Transition::Finish(Outcome::Aborted(Rejection::UnknownItem(name))))
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    async fn advance_asset(&self, state: &AssetState, input: AdminInput) -> Step {
        match state {
            AssetState::AwaitFile => {
                let file = expect_document(input)?.required()?;
                if let Some(extension) = self.settings.asset_extension() {
                    if !file.has_extension(extension) {
                        return Err(Rejection::WrongExtension {
                            expected: extension.to_string(),
                        }
                        .into());
                    }
                }
                Ok(Transition::Next(Session::AssetConfig(AssetState::AwaitDescription { file })))
            }
            AssetState::AwaitDescription { file } => {
                let description = expect_text(input)?.into_option();
                self.content.set_asset_file(file.clone(), description).await?;
                Ok(Transition::Finish(Outcome::Committed(Committed::AssetConfigured {
                    file_name: file.file_name.clone(),
                })))
            }
        }
    }

    async fn advance_broadcast(&self, state: &BroadcastState, input: AdminInput) -> Step {
        match state {
            BroadcastState::AwaitMessage => match input {
                AdminInput::Message(Payload::Text { text }) if text.trim().is_empty() => Err(Rejection::EmptyText.into()),
                AdminInput::Message(payload) => Ok(Transition::Next(Session::Broadcast(
                    BroadcastState::AwaitButtonLabel { payload },
                ))),
                AdminInput::Skip => Err(Rejection::NotSkippable.into()),
                _ => Err(Rejection::ExpectedText.into()),
            },
            BroadcastState::AwaitButtonLabel { payload } => match expect_text(input)? {
                Field::Value(label) => Ok(Transition::Next(Session::Broadcast(
                    BroadcastState::AwaitButtonUrl {
                        payload: payload.clone(),
                        label,
                    },
                ))),
                Field::Skip => self.start_dispatch(payload.clone(), None).await,
            },
            BroadcastState::AwaitButtonUrl { payload, label } => {
                let cta = expect_url(input)?
                    .into_option()
                    .map(|url| CallToAction::new(label.clone(), url));
                self.start_dispatch(payload.clone(), cta).await
            }
        }
    }

    async fn start_dispatch(&self, payload: Payload, cta: Option<CallToAction>) -> Step {
        let recipients = self.ledger.all_identities().await?;
        let count = recipients.len();
        let handle = self
            .dispatcher
            .spawn(payload, recipients, cta, Arc::clone(&self.progress));

        let mut active = self.active_broadcast.lock().await;
        if active.as_ref().is_some_and(|previous| !previous.is_finished()) {
            log::info!("Starting a broadcast while the previous one is still running");
        }
        *active = Some(handle);
        Ok(Transition::Finish(Outcome::BroadcastStarted { recipients: count }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_link() {
        assert_eq!(
            parse_link(" https://example.com/x "),
            Some("https://example.com/x".to_string())
        );
        assert!(parse_link("http://site.org").is_some());
        assert!(parse_link("ftp://site.org").is_none());
        assert!(parse_link("example.com").is_none());
        assert!(parse_link("").is_none());
    }

    #[test]
    fn test_skip_differs_from_empty_text() {
        assert!(matches!(expect_text(AdminInput::Skip), Ok(Field::Skip)));
        assert!(matches!(expect_text(AdminInput::text("  ")), Err(Rejection::EmptyText)));
        assert!(matches!(
            expect_text(AdminInput::Skip).and_then(Field::required),
            Err(Rejection::NotSkippable)
        ));
    }

    #[test]
    fn test_wrong_media_kind_rejected() {
        assert!(matches!(
            expect_photo(AdminInput::text("hi")),
            Err(Rejection::ExpectedPhoto)
        ));
        assert!(matches!(
            expect_document(AdminInput::Message(Payload::photo("p"))),
            Err(Rejection::ExpectedDocument)
        ));
        assert!(matches!(expect_text(AdminInput::Confirm), Err(Rejection::ExpectedText)));
    }
}
