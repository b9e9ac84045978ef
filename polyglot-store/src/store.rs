//! The reactive constant store.

use crate::bridge::{BridgeBinding, LangCodeBridge};
use crate::debounce::{DebounceOptions, Debouncer};
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::token::{DEFAULT_TOKEN_LENGTH, TokenPool, unique_token_with};
use crate::{LanguageTable, Rejection, Result, Snapshot, StoreError, Value};
use parking_lot::Mutex;
use polyglot_config::{CodeMap, ScopeMap, Settings};
use std::any::Any;
use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

const TARGET: &str = "polyglot::store";

/// Source of default store labels. Only ever incremented.
static SERIAL_NUMBER: AtomicU64 = AtomicU64::new(0);

/// Result of a mutation. Rejections are already logged when this is
/// returned; callers are free to ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Unchanged,
    Rejected(Rejection),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    /// `Ok(true)` if the store changed, `Ok(false)` if it already held the
    /// value, or the rejection as an error.
    pub fn into_result(self) -> Result<bool> {
        match self {
            Outcome::Applied => Ok(true),
            Outcome::Unchanged => Ok(false),
            Outcome::Rejected(rejection) => Err(rejection.into()),
        }
    }
}

/// Events accepted by [`ReactiveConstant::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerEvent {
    ChangeCode,
}

type CodeListener = Arc<dyn Fn(&str) + Send + Sync>;
type SubscriberFn = Arc<dyn Fn(&Snapshot) + Send + Sync>;

struct Subscriber {
    callback: SubscriberFn,
    keys: Option<HashSet<String>>,
}

impl Subscriber {
    fn wants(&self, changed: &[String]) -> bool {
        match &self.keys {
            None => true,
            Some(keys) => changed.iter().any(|k| keys.contains(k)),
        }
    }
}

/// Token-keyed registrations in insertion order.
struct Registry<T> {
    entries: Vec<(String, T)>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Self { entries: Vec::new() }
    }

    fn register(&mut self, token_length: usize, item: T) -> String {
        let token = unique_token_with(&*self, token_length, &mut rand::rng());
        self.entries.push((token.clone(), item));
        token
    }

    fn remove(&mut self, token: &str) -> bool {
        match self.entries.iter().position(|(t, _)| t == token) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<T> TokenPool for Registry<T> {
    fn holds(&self, token: &str) -> bool {
        self.entries.iter().any(|(t, _)| t == token)
    }
}

/// Who is writing a field.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Origin {
    Caller,
    /// A language switch copying the table's own values.
    Table,
}

struct State {
    active: String,
    snapshot: Snapshot,
    /// Keys changed since the last flush, in first-change order.
    changed: Vec<String>,
    listeners: Registry<CodeListener>,
    subscribers: Registry<Subscriber>,
}

impl State {
    fn apply(&mut self, key: &str, value: Value, origin: Origin) -> Outcome {
        if value.is_undefined() {
            return Outcome::Rejected(Rejection::UndefinedValue { key: key.to_string() });
        }
        if origin == Origin::Caller && value.is_method() {
            return Outcome::Rejected(Rejection::FunctionValue { key: key.to_string() });
        }
        let Some(slot) = self.snapshot.slot(key) else {
            return Outcome::Rejected(Rejection::UnknownField { key: key.to_string() });
        };
        if origin == Origin::Caller && slot.is_method() {
            return Outcome::Rejected(Rejection::ReadOnlyField { key: key.to_string() });
        }
        if slot.same(&value) {
            return Outcome::Unchanged;
        }

        *slot = value;
        if !self.changed.iter().any(|k| k == key) {
            self.changed.push(key.to_string());
        }
        Outcome::Applied
    }
}

struct Shared {
    mark: String,
    table: LanguageTable,
    token_length: usize,
    bridge: Option<BridgeBinding>,
    state: Mutex<State>,
    notifier: Debouncer<Snapshot>,
}

impl Shared {
    /// Deliver one batched notification.
    fn flush(&self, snapshot: Snapshot) {
        let targets: Vec<(String, SubscriberFn)> = {
            let mut state = self.state.lock();
            let changed = std::mem::take(&mut state.changed);
            state
                .subscribers
                .entries
                .iter()
                .filter(|(_, s)| s.wants(&changed))
                .map(|(token, s)| (token.clone(), Arc::clone(&s.callback)))
                .collect()
        };

        polyglot_log::trace!(target: TARGET, "{} flush to {} subscriber(s)", self.mark, targets.len());
        for (token, callback) in targets {
            self.isolate(&format!("subscribe (id: {})", token), || callback(&snapshot));
        }
    }

    /// Run a user callback, logging instead of propagating a panic.
    fn isolate(&self, what: &str, f: impl FnOnce()) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
            polyglot_log::error!(
                target: TARGET,
                "{} {} error: {}",
                self.mark,
                what,
                panic_message(payload.as_ref())
            );
        }
    }

    fn report(&self, operation: &str, outcome: &Outcome) {
        if let Outcome::Rejected(rejection) = outcome {
            polyglot_log::error!(target: TARGET, "{} {} error: {}", self.mark, operation, rejection);
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// A set of localized values for one active language at a time.
///
/// Reads are synchronous. Changes to values are announced to subscribers
/// through a debounced notifier, so a burst of writes, including a whole
/// language switch, reaches each interested subscriber once. Code-change
/// listeners are called synchronously.
///
/// Cloning yields another handle to the same store.
///
/// ```rust,ignore
/// let store = ReactiveConstant::new(
///     LanguageTable::new()
///         .with_json("en", json!({ "title": "Title" }))
///         .with_json("zh", json!({ "title": "标题" })),
/// )?;
///
/// let _sub = store.subscribe(|s| println!("{:?}", s.text("title")), Some(&["title"]));
/// store.set_code("zh");
/// assert_eq!(store.text("title").as_deref(), Some("标题"));
/// ```
#[derive(Clone)]
pub struct ReactiveConstant {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ReactiveConstant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ReactiveConstant")
            .field("mark", &self.shared.mark)
            .field("active", &state.active)
            .field("listeners", &state.listeners.len())
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

impl ReactiveConstant {
    /// A store with default settings, starting in the table's first language.
    pub fn new(table: LanguageTable) -> Result<Self> {
        Self::builder(table).build()
    }

    pub fn builder(table: LanguageTable) -> ReactiveConstantBuilder {
        ReactiveConstantBuilder::new(table)
    }

    /// Label used in log lines.
    pub fn mark(&self) -> &str {
        &self.shared.mark
    }

    /// The active language.
    pub fn code(&self) -> String {
        self.shared.state.lock().active.clone()
    }

    pub fn codes(&self) -> &[String] {
        self.shared.table.codes()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.shared.table.contains(code)
    }

    pub fn table(&self) -> &LanguageTable {
        &self.shared.table
    }

    /// Current value of `key` in the live snapshot.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.shared.state.lock().snapshot.get(key).cloned()
    }

    /// Current string value of `key`.
    pub fn text(&self, key: &str) -> Option<String> {
        self.shared.state.lock().snapshot.text(key).map(str::to_string)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.state.lock().snapshot.clone()
    }

    /// Value of `key` as configured for `code`, regardless of the active
    /// language and of any later `set_value`.
    pub fn get_value(&self, key: &str, code: &str) -> Option<Value> {
        self.shared.table.value(key, code).cloned()
    }

    /// Assign one field.
    ///
    /// Refuses `Undefined`, methods, writes to method fields and unknown
    /// keys. Assigning the current value does nothing.
    pub fn set_value(&self, key: &str, value: impl Into<Value>) -> Outcome {
        let (outcome, snapshot) = {
            let mut state = self.shared.state.lock();
            let outcome = state.apply(key, value.into(), Origin::Caller);
            let snapshot = outcome.is_applied().then(|| state.snapshot.clone());
            (outcome, snapshot)
        };

        self.shared.report("set_value", &outcome);
        if let Some(snapshot) = snapshot {
            self.shared.notifier.schedule(snapshot);
        }
        outcome
    }

    /// Switch the active language.
    ///
    /// Every field of the new language goes through the same equality
    /// check as [`set_value`](Self::set_value), so fields that read the same
    /// in both languages are not reported as changed. Code listeners run
    /// before this returns; value subscribers are notified later.
    pub fn set_code(&self, code: &str) -> Outcome {
        let shared = &self.shared;
        let Some(record) = shared.table.record(code) else {
            let outcome = Outcome::Rejected(Rejection::UnknownCode { code: code.to_string() });
            shared.report("set_code", &outcome);
            return outcome;
        };

        let (snapshot, rejected, listeners) = {
            let mut state = shared.state.lock();
            if state.active == code {
                return Outcome::Unchanged;
            }
            state.active = code.to_string();

            let mut applied = false;
            let mut rejected = Vec::new();
            for (key, value) in record {
                match state.apply(key, value.clone(), Origin::Table) {
                    Outcome::Applied => applied = true,
                    Outcome::Unchanged => {}
                    rejection => rejected.push(rejection),
                }
            }

            let snapshot = applied.then(|| state.snapshot.clone());
            let listeners: Vec<(String, CodeListener)> = state
                .listeners
                .entries
                .iter()
                .map(|(token, l)| (token.clone(), Arc::clone(l)))
                .collect();
            (snapshot, rejected, listeners)
        };

        for rejection in &rejected {
            shared.report("set_code", rejection);
        }
        if let Some(snapshot) = snapshot {
            shared.notifier.schedule(snapshot);
        }

        polyglot_log::debug!(target: TARGET, "{} active code is now \"{}\"", shared.mark, code);
        for (token, listener) in listeners {
            shared.isolate(&format!("listener (id: {})", token), || listener(code));
        }

        if let Some(bridge) = &shared.bridge {
            bridge.push(code, &shared.mark);
        }
        Outcome::Applied
    }

    /// Register a listener. It is called right away with the active code,
    /// then on every effective [`set_code`](Self::set_code).
    pub fn add_listener(
        &self,
        event: ListenerEvent,
        listener: impl Fn(&str) + Send + Sync + 'static,
    ) -> Unsubscribe {
        let listener: CodeListener = Arc::new(listener);
        let shared = &self.shared;

        let active = self.code();
        shared.isolate("add_listener", || listener(&active));

        let token = match event {
            ListenerEvent::ChangeCode => shared.state.lock().listeners.register(shared.token_length, listener),
        };
        Unsubscribe {
            shared: Arc::downgrade(shared),
            token,
            kind: Kind::Listener,
        }
    }

    /// Register a value subscriber and call it right away with the current
    /// snapshot.
    ///
    /// - `None`: notified on every flush.
    /// - `Some(keys)`: notified on flushes that changed one of `keys`.
    /// - `Some(&[])`: only the immediate call; nothing is registered and
    ///   `None` is returned.
    pub fn subscribe(
        &self,
        callback: impl Fn(&Snapshot) + Send + Sync + 'static,
        keys: Option<&[&str]>,
    ) -> Option<Unsubscribe> {
        let callback: SubscriberFn = Arc::new(callback);
        let shared = &self.shared;

        let snapshot = self.snapshot();
        shared.isolate("subscribe", || callback(&snapshot));

        if keys.is_some_and(|keys| keys.is_empty()) {
            return None;
        }

        let subscriber = Subscriber {
            callback,
            keys: keys.map(|keys| keys.iter().map(|k| k.to_string()).collect()),
        };
        let token = shared.state.lock().subscribers.register(shared.token_length, subscriber);
        Some(Unsubscribe {
            shared: Arc::downgrade(shared),
            token,
            kind: Kind::Subscriber,
        })
    }

    /// Deliver any pending notification now.
    pub fn flush(&self) -> bool {
        self.shared.notifier.flush()
    }

    pub fn listener_count(&self) -> usize {
        self.shared.state.lock().listeners.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().subscribers.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Listener,
    Subscriber,
}

/// Removes a listener or subscriber registration.
///
/// Dropping the handle keeps the registration alive.
#[derive(Debug)]
pub struct Unsubscribe {
    shared: Weak<Shared>,
    token: String,
    kind: Kind,
}

impl Unsubscribe {
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Remove the registration. A pending flush will not reach it. Returns
    /// false if the store is gone.
    pub fn unsubscribe(self) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let mut state = shared.state.lock();
        match self.kind {
            Kind::Listener => state.listeners.remove(&self.token),
            Kind::Subscriber => state.subscribers.remove(&self.token),
        }
    }
}

/// Configures and builds a [`ReactiveConstant`].
pub struct ReactiveConstantBuilder {
    table: LanguageTable,
    mark: Option<String>,
    options: DebounceOptions,
    scheduler: Option<Arc<dyn Scheduler>>,
    token_length: usize,
    strict_fields: bool,
    bridge: Option<Arc<dyn LangCodeBridge>>,
    scope: ScopeMap,
    code_map: CodeMap,
    platform: String,
}

impl ReactiveConstantBuilder {
    pub fn new(table: LanguageTable) -> Self {
        Self {
            table,
            mark: None,
            options: DebounceOptions::default(),
            scheduler: None,
            token_length: DEFAULT_TOKEN_LENGTH,
            strict_fields: false,
            bridge: None,
            scope: ScopeMap::default(),
            code_map: CodeMap::default(),
            platform: std::env::consts::OS.to_string(),
        }
    }

    /// Copy every applicable field of `settings`. A `default_code` present
    /// in the table is moved to the front.
    pub fn settings(mut self, settings: &Settings) -> Self {
        if let Some(mark) = &settings.mark {
            self.mark = Some(mark.clone());
        }
        if let Some(code) = &settings.default_code
            && !self.table.prefer(code)
        {
            polyglot_log::warn!(target: TARGET, "default code \"{}\" is not in the table", code);
        }
        self.options = DebounceOptions {
            wait: Duration::from_millis(settings.debounce_ms),
            immediate: settings.immediate,
        };
        self.token_length = settings.token_length;
        self.strict_fields = settings.strict_fields;
        self.scope = settings.scope.clone();
        self.code_map = settings.code_map.clone();
        self.platform = settings.platform.clone();
        self
    }

    pub fn mark(mut self, mark: impl Into<String>) -> Self {
        self.mark = Some(mark.into());
        self
    }

    pub fn debounce(mut self, wait: Duration) -> Self {
        self.options.wait = wait;
        self
    }

    /// Leading-edge notification: the first change of a window is delivered
    /// on the scheduler's next turn and later changes in the window are
    /// dropped. Delivery never happens inside the mutating call.
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.options.immediate = immediate;
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn token_length(mut self, length: usize) -> Self {
        self.token_length = length.max(1);
        self
    }

    pub fn strict_fields(mut self, strict: bool) -> Self {
        self.strict_fields = strict;
        self
    }

    pub fn bridge(mut self, bridge: Arc<dyn LangCodeBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn scope(mut self, scope: ScopeMap) -> Self {
        self.scope = scope;
        self
    }

    pub fn code_map(mut self, code_map: CodeMap) -> Self {
        self.code_map = code_map;
        self
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn build(self) -> Result<ReactiveConstant> {
        let serial = SERIAL_NUMBER.fetch_add(1, Ordering::Relaxed) + 1;
        let mark = self.mark.unwrap_or_else(|| format!("SerialNumber-{}", serial));
        let table = self.table;

        let Some(first) = table.first_code() else {
            return Err(StoreError::EmptyTable);
        };
        if let Some((code, key)) = table.find_undefined() {
            return Err(StoreError::UndefinedField {
                code: code.to_string(),
                key: key.to_string(),
            });
        }
        for mismatch in table.field_mismatches() {
            if self.strict_fields {
                return Err(mismatch.into());
            }
            polyglot_log::warn!(
                target: TARGET,
                "{} language \"{}\" differs from \"{}\" (missing: {:?}, extra: {:?})",
                mark,
                mismatch.code,
                mismatch.reference,
                mismatch.missing,
                mismatch.extra
            );
        }

        let bridge = self.bridge.map(|bridge| {
            BridgeBinding::new(bridge)
                .scope(self.scope)
                .code_map(self.code_map)
                .platform(self.platform)
        });
        let active = bridge
            .as_ref()
            .and_then(|binding| binding.initial_code(table.codes()))
            .unwrap_or_else(|| first.to_string());
        let snapshot = Snapshot::new(table.record(&active).cloned().unwrap_or_default());

        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(TokioScheduler::new()));
        let options = self.options;
        let token_length = self.token_length;
        // The leading edge is still delivered on the scheduler's next turn.
        let deferred = options.immediate.then(|| Arc::clone(&scheduler));

        polyglot_log::debug!(
            target: TARGET,
            "{} created with {} language(s), starting in \"{}\"",
            mark,
            table.len(),
            active
        );

        let shared = Arc::new_cyclic(|weak: &Weak<Shared>| {
            let weak = weak.clone();
            Shared {
                mark,
                table,
                token_length,
                bridge,
                state: Mutex::new(State {
                    active,
                    snapshot,
                    changed: Vec::new(),
                    listeners: Registry::new(),
                    subscribers: Registry::new(),
                }),
                notifier: Debouncer::new(options, scheduler, move |snapshot| match &deferred {
                    Some(scheduler) => {
                        let weak = weak.clone();
                        scheduler.schedule(
                            Duration::ZERO,
                            Box::new(move || {
                                if let Some(shared) = weak.upgrade() {
                                    shared.flush(snapshot);
                                }
                            }),
                        );
                    }
                    None => {
                        if let Some(shared) = weak.upgrade() {
                            shared.flush(snapshot);
                        }
                    }
                }),
            }
        });

        Ok(ReactiveConstant { shared })
    }
}
