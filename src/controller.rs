//! Entry controller: the client-side control core.
//!
//! Glues the session lifecycle, suspension resolver, dialog arbiter and
//! navigation guard together. Every engine operation goes through
//! [`EntryController::run`], which is also the single place where terminal
//! pages are fed to the navigation guard.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::channel::OperationChannel;
use crate::config::GlobalConfig;
use crate::dialog::{DialogArbiter, FieldInput, PresentationPlan};
use crate::loader::{CaseValueLoader, PopulateReport};
use crate::models::case_tree::CaseNode;
use crate::models::form::FormDefinition;
use crate::models::operation::{EntryMode, FieldTarget, Operation};
use crate::models::page::{FieldKey, PageState, ResponseEntry};
use crate::models::session::SessionState;
use crate::navigation::{Decision, NavigationGuard, NavigationTable};
use crate::presenter::InteractionPresenter;
use crate::resolver::{PresenterOutcome, SuspensionResolver};
use crate::session::SessionLifecycle;
use crate::surface::FormSurface;
use crate::{AppError, Result};

/// Settings the controller needs from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Application loaded into the session before entry starts.
    pub application: String,
    /// Operator identifier passed on start.
    pub operator_id: Option<String>,
    /// Presenter wait window.
    pub presenter_timeout: Duration,
}

impl From<&GlobalConfig> for ControllerSettings {
    fn from(config: &GlobalConfig) -> Self {
        Self {
            application: config.engine.application.clone(),
            operator_id: config.entry.operator_id.clone(),
            presenter_timeout: config.presenter_timeout(),
        }
    }
}

/// Result of entering the current field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEntry {
    /// A modal dialog produced a value that was submitted.
    Advanced(PageState),
    /// The dialog was cancelled or its wait window elapsed; focus stays on
    /// the field and nothing is submitted. Unlike an engine suspension, a
    /// field dialog that times out is not acknowledged.
    Abandoned,
    /// The value is typed by the operator and submitted with
    /// [`EntryController::submit_typed`].
    TypedInput,
    /// The field takes no keyed or dialog input.
    External,
}

/// Result of a client-originated focus change.
#[derive(Debug, Clone, PartialEq)]
pub enum FocusOutcome {
    /// Focus was already on the authoritative field.
    Stayed,
    /// The engine moved to the candidate through go-to-field.
    Moved(PageState),
    /// The move was refused; focus returned to the authoritative field.
    Rejected,
}

/// Drives one operator's data entry against the engine.
pub struct EntryController<S> {
    lifecycle: SessionLifecycle,
    resolver: SuspensionResolver,
    guard: NavigationGuard,
    table: NavigationTable,
    structure: Option<FormDefinition>,
    surface: S,
    page: PageState,
    settings: ControllerSettings,
}

impl<S: FormSurface> EntryController<S> {
    /// Build a controller over `channel`, presenting dialogs through
    /// `presenter` and mirroring entry on `surface`.
    pub fn new(
        channel: Arc<dyn OperationChannel>,
        presenter: Arc<dyn InteractionPresenter>,
        surface: S,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            lifecycle: SessionLifecycle::new(Arc::clone(&channel)),
            resolver: SuspensionResolver::new(channel, presenter, settings.presenter_timeout),
            guard: NavigationGuard::new(),
            table: NavigationTable::default(),
            structure: None,
            surface,
            page: PageState::default(),
            settings,
        }
    }

    /// Last terminal page.
    #[must_use]
    pub fn page(&self) -> &PageState {
        &self.page
    }

    /// Navigation authority state.
    #[must_use]
    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    /// Records of the current display unit, when its structure is known.
    #[must_use]
    pub fn table(&self) -> &NavigationTable {
        &self.table
    }

    /// Structural definition of the current display unit, once fetched.
    #[must_use]
    pub fn structure(&self) -> Option<&FormDefinition> {
        self.structure.as_ref()
    }

    /// Presentation surface.
    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Session lifecycle.
    #[must_use]
    pub fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }

    // ── Lifecycle ────────────────────────────────────────────

    /// Load the configured application unless already loaded.
    ///
    /// # Errors
    ///
    /// Propagates engine errors and invalid lifecycle transitions.
    pub async fn load_application(&mut self) -> Result<()> {
        if self.lifecycle.state().await != SessionState::Uninitialized {
            return Ok(());
        }
        let application = self.settings.application.clone();
        self.run(Operation::LoadApplication {
            application: application.clone(),
        })
        .await?;
        self.lifecycle.mark_loaded(&application).await?;
        info!(application = %application, "application loaded");
        Ok(())
    }

    /// Start entry of a new case.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidState` if entry is already running, or
    /// any engine error.
    pub async fn start_add(&mut self) -> Result<PageState> {
        self.start(EntryMode::Add).await
    }

    /// Start modification of the case identified by `key`.
    ///
    /// Once entry has started, the navigation guard lets the operator's first
    /// landing through unconditionally; path enforcement begins after it or
    /// after any other entry operation. Existing values are fetched through
    /// the case tree and written into the surface.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidState` if entry is already running, or
    /// any engine error.
    pub async fn start_modify(&mut self, key: &str) -> Result<(PageState, PopulateReport)> {
        let page = self
            .start(EntryMode::Modify {
                key: key.to_owned(),
            })
            .await?;
        self.guard.arm_modify_mode();
        let current_form = page.form_name.as_deref();
        let definition = match self.structure.clone() {
            Some(definition) if current_form.is_none_or(|form| form == definition.name) => definition,
            _ => self.refresh_structure().await?,
        };
        let tree = self.case_tree().await?;
        let report = CaseValueLoader::populate(&tree, &definition, &mut self.surface);
        Ok((page, report))
    }

    async fn start(&mut self, mode: EntryMode) -> Result<PageState> {
        if self.lifecycle.state().await == SessionState::EntryStarted {
            return Err(AppError::InvalidState("entry already started".into()));
        }
        self.load_application().await?;
        let page = self
            .run(Operation::Start {
                mode,
                operator_id: self.settings.operator_id.clone(),
            })
            .await?;
        self.lifecycle.mark(SessionState::EntryStarted).await?;
        Ok(page)
    }

    /// Stop entry, discarding the case in progress.
    ///
    /// # Errors
    ///
    /// Propagates engine errors and invalid lifecycle transitions.
    pub async fn stop(&mut self) -> Result<PageState> {
        let page = self.run(Operation::Stop).await?;
        self.lifecycle.mark(SessionState::Stopped).await?;
        Ok(page)
    }

    /// Finish the current case.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub async fn end_case(&mut self) -> Result<PageState> {
        self.run(Operation::EndCase).await
    }

    /// Destroy the engine session.
    ///
    /// # Errors
    ///
    /// Propagates transport errors other than an already-evicted session.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.lifecycle.destroy().await
    }

    // ── Field entry ──────────────────────────────────────────

    /// Submit a typed value for the authoritative field.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidState` if there is no current field, or
    /// any engine error.
    pub async fn submit_typed(&mut self, text: &str) -> Result<PageState> {
        let key = self.current_key()?;
        self.advance(&key, text.to_owned()).await
    }

    /// Enter the authoritative field, running its dialog when the field
    /// meaning calls for one.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidState` if there is no current field, or
    /// any engine error from the advance.
    pub async fn enter_current_field(&mut self) -> Result<FieldEntry> {
        let field = self
            .page
            .current_field()
            .cloned()
            .ok_or_else(|| AppError::InvalidState("no current field".into()))?;
        let plan = DialogArbiter::decide_presentation(&field);

        let Some(request) = DialogArbiter::build_request(&field, plan) else {
            return Ok(match plan {
                PresentationPlan::None => FieldEntry::External,
                _ => FieldEntry::TypedInput,
            });
        };

        let key = field.key();
        let input = match self.resolver.show(request).await {
            PresenterOutcome::Resolved(resolution) => {
                DialogArbiter::value_from_resolution(plan, resolution)
            }
            PresenterOutcome::TimedOut => FieldInput::Abandon,
        };

        match input {
            FieldInput::Submit(value) => Ok(FieldEntry::Advanced(self.advance(&key, value).await?)),
            FieldInput::Abandon => {
                debug!(field = %key, "field dialog abandoned");
                self.surface.focus(&key);
                Ok(FieldEntry::Abandoned)
            }
        }
    }

    /// Attempt to move focus to `name` at `occurrence`.
    ///
    /// # Errors
    ///
    /// Propagates engine errors from go-to-field.
    pub async fn focus_attempt(&mut self, name: &str, occurrence: Option<u32>) -> Result<FocusOutcome> {
        let candidate = FieldKey::new(name, occurrence);
        match self.guard.authorize(name, occurrence) {
            Decision::Deny => {
                info!(field = %candidate, "focus change rejected");
                self.surface.signal_rejected(&candidate);
                if let Some(current) = self.guard.authoritative_field().cloned() {
                    self.surface.focus(&current);
                }
                Ok(FocusOutcome::Rejected)
            }
            Decision::Allow if self.guard.authoritative_field() == Some(&candidate) => {
                self.surface.focus(&candidate);
                Ok(FocusOutcome::Stayed)
            }
            Decision::Allow | Decision::AllowViaBackNavigation => {
                let page = self
                    .run(Operation::GoToField(FieldTarget::new(name, occurrence)))
                    .await?;
                Ok(FocusOutcome::Moved(page))
            }
        }
    }

    // ── Navigation ───────────────────────────────────────────

    /// Move to the previous field.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub async fn previous(&mut self) -> Result<PageState> {
        self.run(Operation::Previous).await
    }

    /// End the current group.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub async fn end_group(&mut self) -> Result<PageState> {
        self.run(Operation::EndGroup).await
    }

    /// End the current level.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub async fn end_level(&mut self) -> Result<PageState> {
        self.run(Operation::EndLevel).await
    }

    /// End the current occurrence of a repeating group.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub async fn end_group_occurrence(&mut self) -> Result<PageState> {
        self.run(Operation::EndGroupOccurrence).await
    }

    /// Insert an occurrence before the current one.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub async fn insert_occurrence(&mut self) -> Result<PageState> {
        self.run(Operation::InsertOccurrence).await
    }

    /// Insert an occurrence after the current one.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub async fn insert_occurrence_after(&mut self) -> Result<PageState> {
        self.run(Operation::InsertOccurrenceAfter).await
    }

    /// Delete the current occurrence.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub async fn delete_occurrence(&mut self) -> Result<PageState> {
        self.run(Operation::DeleteOccurrence).await
    }

    /// Sort the occurrences of the current group.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub async fn sort_occurrences(&mut self) -> Result<PageState> {
        self.run(Operation::SortOccurrences).await
    }

    // ── Queries ──────────────────────────────────────────────

    /// Re-read the current page from the engine.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub async fn current_page(&mut self) -> Result<PageState> {
        self.run(Operation::CurrentPage).await
    }

    /// Fetch the structural definition of the current display unit and
    /// rebuild the navigation records from it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Protocol` if the definition is malformed.
    pub async fn refresh_structure(&mut self) -> Result<FormDefinition> {
        let mut definition = self.fetch_structure().await?;
        if definition.name.is_empty() {
            if let Some(form) = self.page.form_name.clone() {
                definition.name = form;
            }
        }
        self.install_structure(definition.clone());
        Ok(definition)
    }

    /// Question text for a field.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Protocol` if the reply is not text.
    pub async fn question_text(&mut self, target: FieldTarget) -> Result<String> {
        match self.query_value(Operation::QuestionText(target)).await? {
            Value::String(text) => Ok(text),
            Value::Object(map) => match map.get("text") {
                Some(Value::String(text)) => Ok(text.clone()),
                _ => Err(AppError::Protocol("question text reply has no text".into())),
            },
            Value::Null => Ok(String::new()),
            other => Err(AppError::Protocol(format!(
                "unexpected question text reply: {other}"
            ))),
        }
    }

    /// Value set for a field.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Protocol` if the reply is malformed.
    pub async fn value_set(&mut self, target: FieldTarget) -> Result<Vec<ResponseEntry>> {
        self.query(Operation::ValueSet(target)).await
    }

    /// Hierarchical representation of the case in progress.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Protocol` if the reply is malformed.
    pub async fn case_tree(&mut self) -> Result<CaseNode> {
        self.query(Operation::CaseTree).await
    }

    /// Case identifiers of the data file, in sequence.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Protocol` if the reply is malformed.
    pub async fn sequential_case_ids(&mut self) -> Result<Vec<String>> {
        self.load_application().await?;
        self.query(Operation::SequentialCaseIds).await
    }

    /// Engine status document.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub async fn status(&mut self) -> Result<Value> {
        self.query_value(Operation::Status).await
    }

    // ── Scripting ────────────────────────────────────────────

    /// Evaluate a logic expression in the engine.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub async fn evaluate(&mut self, expression: &str) -> Result<Value> {
        self.query_value(Operation::EvaluateExpression {
            expression: expression.to_owned(),
        })
        .await
    }

    /// Invoke a user-defined function.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub async fn invoke_function(&mut self, name: &str, arguments: Vec<Value>) -> Result<Value> {
        self.query_value(Operation::InvokeFunction {
            name: name.to_owned(),
            arguments,
        })
        .await
    }

    /// Run a generic engine action.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub async fn action(&mut self, name: &str, arguments: Value) -> Result<Value> {
        self.query_value(Operation::Action {
            name: name.to_owned(),
            arguments,
        })
        .await
    }

    // ── Plumbing ─────────────────────────────────────────────

    /// Issue `operation` on the session, resolving suspensions, and adopt
    /// the resulting page.
    ///
    /// Any operation other than a query counts as operator interaction and
    /// withdraws the modify-mode pass. Entering a new display unit rebuilds
    /// the navigation records from its structural definition.
    ///
    /// # Errors
    ///
    /// Propagates session, channel and resolver errors.
    pub async fn run(&mut self, operation: Operation) -> Result<PageState> {
        let page = self.exchange(&operation).await?;
        if operation.is_query() && page.fields.is_empty() {
            return Ok(page);
        }
        if !operation.is_query() {
            self.guard.disarm_modify_mode();
        }
        if let Some(form) = self.adopt(&page) {
            self.rebuild_table(form).await;
        }
        Ok(page)
    }

    async fn exchange(&self, operation: &Operation) -> Result<PageState> {
        let span = info_span!("entry_op", op = operation.wire_name());
        let resolver = &self.resolver;
        self.lifecycle
            .with_session(|session| async move { resolver.execute(&session, operation).await })
            .instrument(span)
            .await
    }

    /// The only call site of [`NavigationGuard::observe`]. Returns the new
    /// display unit name when the page entered one.
    fn adopt(&mut self, page: &PageState) -> Option<String> {
        self.guard.observe(page);
        let entered = page
            .form_name
            .clone()
            .filter(|name| name != self.table.form());
        if entered.is_some() {
            debug!(form = ?page.form_name, "display unit changed; navigation records reset");
            self.table = NavigationTable::default();
            self.structure = None;
        }
        if let Some(current) = self.guard.authoritative_field().cloned() {
            self.table.mark_visited(&current);
            self.surface.focus(&current);
        }
        self.page = page.clone();
        entered
    }

    /// Fetch the structure of `form` and rebuild its records. A failed fetch
    /// leaves the unit without records rather than failing the operation
    /// that entered it.
    async fn rebuild_table(&mut self, form: String) {
        match self.fetch_structure().await {
            Ok(mut definition) => {
                if definition.name != form {
                    debug!(declared = %definition.name, form = %form, "structure renamed to page form");
                    definition.name = form;
                }
                self.install_structure(definition);
            }
            Err(err) => {
                warn!(form = %form, %err, "form structure unavailable; navigation records left empty");
                self.table = NavigationTable::empty(form);
            }
        }
    }

    async fn fetch_structure(&self) -> Result<FormDefinition> {
        let operation = Operation::FormStructure;
        let page = self.exchange(&operation).await?;
        decode_reply(operation.wire_name(), page.value.unwrap_or(Value::Null))
    }

    fn install_structure(&mut self, definition: FormDefinition) {
        self.table = NavigationTable::from_definition(&definition);
        if let Some(current) = self.guard.authoritative_field().cloned() {
            self.table.mark_visited(&current);
        }
        self.structure = Some(definition);
    }

    async fn advance(&mut self, key: &FieldKey, value: String) -> Result<PageState> {
        self.surface.write_value(key, &value);
        self.table.record_value(key, &value);
        self.run(Operation::Advance { value }).await
    }

    fn current_key(&self) -> Result<FieldKey> {
        self.guard
            .authoritative_field()
            .cloned()
            .ok_or_else(|| AppError::InvalidState("no current field".into()))
    }

    async fn query_value(&mut self, operation: Operation) -> Result<Value> {
        let page = self.run(operation).await?;
        Ok(page.value.unwrap_or(Value::Null))
    }

    async fn query<T: DeserializeOwned>(&mut self, operation: Operation) -> Result<T> {
        let name = operation.wire_name();
        let value = self.query_value(operation).await?;
        decode_reply(name, value)
    }
}

fn decode_reply<T: DeserializeOwned>(name: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|err| {
        warn!(op = name, %err, "malformed query reply");
        AppError::Protocol(format!("malformed '{name}' reply: {err}"))
    })
}
