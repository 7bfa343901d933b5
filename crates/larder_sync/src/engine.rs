//! The sync engine.

use crate::cache::ReplicaCache;
use crate::config::SyncConfig;
use crate::conflict::{ConflictContext, ConflictSide, SyncStatus};
use crate::debounce::EditDebounce;
use crate::error::{SyncError, SyncResult};
use crate::gate::ListenerGate;
use crate::replica::LocalReplica;
use larder_protocol::{AccessCode, CredentialHash, SharedRecord, Version};
use larder_store::{RemoteEvent, SharedStore, StoreResult, Subscription};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Receives remote state the engine adopts into the replica.
///
/// The seam back into the editing layer: whenever a fast-forward or an
/// adopt-remote resolution replaces the live state, the host is told so
/// the UI can re-render. The engine never calls the host for local
/// edits.
pub trait StateHost<S> {
    /// Called after the engine has replaced the live state with remote
    /// data.
    fn apply_external_state(&self, state: &S);
}

/// Outcome of a pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// No remote record exists yet for this code.
    NotFound,
    /// The replica already has the stored version.
    UpToDate,
    /// The replica adopted a newer remote state.
    FastForwarded {
        /// The version adopted.
        version: Version,
    },
    /// A newer remote version arrived while edits are pending; a
    /// conflict awaits resolution and local state is untouched.
    Conflict,
}

/// Outcome of a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The write was accepted at the given version.
    Accepted {
        /// The version the store assigned to this write.
        version: Version,
    },
    /// Nothing to push: the replica matches the last synced snapshot.
    Clean,
    /// No session is active; the state was only replaced locally.
    LocalOnly,
}

/// Counters describing engine activity.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Pulls issued.
    pub pulls: u64,
    /// Pulls that adopted newer remote state.
    pub fast_forwards: u64,
    /// Pushes accepted by the store.
    pub pushes_accepted: u64,
    /// Pushes rejected by the version check.
    pub pushes_rejected: u64,
    /// Conflicts surfaced to the user.
    pub conflicts_detected: u64,
    /// Own-write echoes dropped without conflict handling.
    pub echoes_suppressed: u64,
    /// Retries performed by [`SyncEngine::push_with_retry`].
    pub retries: u64,
    /// Last error message, if any.
    pub last_error: Option<String>,
}

/// Per-session state: the code, the live-update subscription and the
/// listener gate. Dropped wholesale when the session ends.
struct Session {
    code: AccessCode,
    subscription: Subscription,
    gate: ListenerGate,
    /// Credential hash cached from the stored record so pushes preserve
    /// it on every whole-record write.
    credential_hash: Option<CredentialHash>,
}

/// Keeps one device's replica consistent with the shared remote record.
///
/// Single-threaded and event-driven: the caller feeds edits, clock ticks
/// and drained remote events into `&mut self` methods, and every remote
/// call either completes or is abandoned at the configured timeout
/// before the next event is handled. One engine instance serves one
/// session at a time; `start`/`create_session` open it and `stop` (or a
/// revoked access code) closes it.
pub struct SyncEngine<S, R, C> {
    config: SyncConfig,
    store: Arc<R>,
    cache: C,
    host: Option<Box<dyn StateHost<S>>>,
    replica: LocalReplica<S>,
    session: Option<Session>,
    conflict: Option<ConflictContext<S>>,
    debounce: EditDebounce,
    stats: SyncStats,
}

impl<S, R, C> SyncEngine<S, R, C>
where
    S: Clone + PartialEq + Send + 'static,
    R: SharedStore<S> + 'static,
    C: ReplicaCache<S>,
{
    /// Opens an engine, restoring the replica from the cache if one was
    /// saved, otherwise starting from `default_state`.
    pub fn open(config: SyncConfig, store: Arc<R>, cache: C, default_state: S) -> SyncResult<Self> {
        let replica = match cache.load()? {
            Some(replica) => replica,
            None => LocalReplica::new(default_state),
        };
        let debounce = EditDebounce::new(config.quiet_period);
        Ok(Self {
            config,
            store,
            cache,
            host: None,
            replica,
            session: None,
            conflict: None,
            debounce,
            stats: SyncStats::default(),
        })
    }

    /// Attaches a host that receives adopted remote state.
    pub fn with_host(mut self, host: Box<dyn StateHost<S>>) -> Self {
        self.host = Some(host);
        self
    }

    /// The live, editable state.
    pub fn state(&self) -> &S {
        &self.replica.state
    }

    /// The local replica.
    pub fn replica(&self) -> &LocalReplica<S> {
        &self.replica
    }

    /// Highest version observed from the remote record.
    pub fn known_version(&self) -> Version {
        self.replica.known_version
    }

    /// True if the live state differs from the last synced snapshot.
    pub fn pending_changes(&self) -> bool {
        self.replica.pending_changes()
    }

    /// The pending conflict, if any.
    pub fn conflict(&self) -> Option<&ConflictContext<S>> {
        self.conflict.as_ref()
    }

    /// The access code of the active session, if any.
    pub fn access_code(&self) -> Option<&AccessCode> {
        self.session.as_ref().map(|s| &s.code)
    }

    /// Activity counters.
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Where the replica stands: clean, dirty, or awaiting a conflict
    /// decision.
    pub fn status(&self) -> SyncStatus {
        if self.conflict.is_some() {
            SyncStatus::ConflictPending
        } else if self.replica.pending_changes() {
            SyncStatus::Dirty
        } else {
            SyncStatus::Clean
        }
    }

    // ---- session lifecycle ----

    /// Creates a fresh session: generates an unused access code, stores
    /// the credential hash and pushes the current state as the initial
    /// record.
    pub fn create_session(&mut self, secret: &str) -> SyncResult<AccessCode> {
        if self.session.is_some() {
            return Err(SyncError::SessionActive);
        }

        let mut rng = rand::thread_rng();
        let mut code = AccessCode::generate(&mut rng);
        loop {
            let probe = code.clone();
            if self.bounded(move |store| store.get(&probe))?.is_none() {
                break;
            }
            code = AccessCode::generate(&mut rng);
        }

        let sub_code = code.clone();
        let subscription = self.bounded(move |store| store.subscribe(&sub_code))?;
        self.session = Some(Session {
            code: code.clone(),
            subscription,
            gate: ListenerGate::new(),
            credential_hash: Some(CredentialHash::from_secret(secret)),
        });

        match self.push_guarded(true) {
            Ok(_) => {
                info!(code = %code, "session created");
                Ok(code)
            }
            Err(err) => {
                self.session = None;
                Err(err)
            }
        }
    }

    /// Joins an existing session under `code` and performs a bootstrap
    /// pull. Joining a revoked code fails without creating a session.
    pub fn start(&mut self, code: AccessCode) -> SyncResult<PullOutcome> {
        if self.session.is_some() {
            return Err(SyncError::SessionActive);
        }
        let probe = code.clone();
        if let Some(record) = self.bounded(move |store| store.get(&probe))? {
            if record.invalidated {
                return Err(SyncError::SessionInvalidated);
            }
        }

        let sub_code = code.clone();
        let subscription = self.bounded(move |store| store.subscribe(&sub_code))?;
        self.session = Some(Session {
            code: code.clone(),
            subscription,
            gate: ListenerGate::new(),
            credential_hash: None,
        });
        info!(code = %code, "session started");
        self.pull()
    }

    /// Ends the session. Local state and pending edits are kept.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            info!(code = %session.code, "session stopped");
        }
        self.conflict = None;
        self.debounce.cancel();
    }

    /// Invalidates the current access code (credential-gated). Every
    /// replica connected under it, including this one, is forced out of
    /// the session.
    pub fn invalidate(&mut self, secret: &str) -> SyncResult<()> {
        let code = self.current_code()?;
        self.verify_credential(secret)?;
        let revoke = code.clone();
        self.bounded(move |store| store.mark_invalidated(&revoke))?;
        info!(code = %code, "access code invalidated");
        self.teardown_invalidated()?;
        Ok(())
    }

    /// Rotates the session: invalidates the current code and creates a
    /// fresh record under a newly generated one. The old code is never
    /// reused.
    pub fn rotate_code(&mut self, secret: &str) -> SyncResult<AccessCode> {
        self.invalidate(secret)?;
        self.create_session(secret)
    }

    // ---- pull ----

    /// Reads the remote record and fast-forwards if the replica is
    /// clean. A newer record while edits are pending surfaces a
    /// conflict; local state is never replaced without a decision.
    pub fn pull(&mut self) -> SyncResult<PullOutcome> {
        let result = self.pull_inner();
        self.note_result(&result);
        result
    }

    fn pull_inner(&mut self) -> SyncResult<PullOutcome> {
        let code = self.current_code()?;
        self.stats.pulls += 1;
        let fetch = code.clone();
        let Some(record) = self.bounded(move |store| store.get(&fetch))? else {
            debug!(code = %code, "no remote record yet");
            return Ok(PullOutcome::NotFound);
        };
        self.apply_remote_record(record)
    }

    /// Pulls and additionally compares remote content against the
    /// last-synced snapshot, catching silent desynchronization (same
    /// version, divergent content).
    pub fn check_for_updates(&mut self) -> SyncResult<PullOutcome> {
        let code = self.current_code()?;
        self.stats.pulls += 1;
        let fetch = code.clone();
        let Some(record) = self.bounded(move |store| store.get(&fetch))? else {
            return Ok(PullOutcome::NotFound);
        };
        if !record.invalidated
            && record.version == self.replica.known_version
            && record.state != self.replica.last_synced_snapshot
        {
            if self.replica.pending_changes() {
                self.set_conflict(record);
                return Ok(PullOutcome::Conflict);
            }
            // Clean replica: re-adopting divergent content loses nothing.
            let version = record.version;
            self.adopt(record.state, version)?;
            return Ok(PullOutcome::FastForwarded { version });
        }
        self.apply_remote_record(record)
    }

    fn apply_remote_record(&mut self, record: SharedRecord<S>) -> SyncResult<PullOutcome> {
        if record.invalidated {
            self.teardown_invalidated()?;
            return Err(SyncError::SessionInvalidated);
        }
        if let Some(session) = self.session.as_mut() {
            session.credential_hash = record.credential_hash.or(session.credential_hash);
        }
        if record.version > self.replica.known_version {
            if self.replica.pending_changes() {
                self.set_conflict(record);
                return Ok(PullOutcome::Conflict);
            }
            let version = record.version;
            self.adopt(record.state, version)?;
            self.stats.fast_forwards += 1;
            debug!(%version, "fast-forwarded to remote state");
            return Ok(PullOutcome::FastForwarded { version });
        }
        Ok(PullOutcome::UpToDate)
    }

    fn adopt(&mut self, state: S, version: Version) -> SyncResult<()> {
        self.replica.mark_synced(state, version);
        self.cache.save(&self.replica)?;
        self.debounce.cancel();
        if let Some(host) = &self.host {
            host.apply_external_state(&self.replica.state);
        }
        Ok(())
    }

    // ---- push ----

    /// Pushes the live state if edits are pending (or the record has
    /// never been created). Rejected stale writes surface as
    /// [`SyncError::StaleWrite`] with a conflict stored for resolution.
    pub fn push(&mut self) -> SyncResult<PushOutcome> {
        if !self.replica.pending_changes() && !self.replica.known_version.is_zero() {
            return Ok(PushOutcome::Clean);
        }
        let result = self.push_guarded(false);
        self.note_result(&result);
        result
    }

    /// Pushes with retry on retryable transport failures, backing off
    /// between attempts.
    pub fn push_with_retry(&mut self) -> SyncResult<PushOutcome> {
        let retry = self.config.retry.clone();
        let mut last_error = None;

        for attempt in 0..retry.max_attempts {
            if attempt > 0 {
                std::thread::sleep(retry.delay_for_attempt(attempt));
                self.stats.retries += 1;
            }
            match self.push() {
                Ok(outcome) => return Ok(outcome),
                Err(err) if err.is_retryable() && attempt + 1 < retry.max_attempts => {
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error.unwrap_or(SyncError::NoSession))
    }

    fn push_guarded(&mut self, force: bool) -> SyncResult<PushOutcome> {
        // Live updates are withheld for the duration of the write and
        // coalesced into at most one follow-up pull.
        match self.session.as_mut() {
            Some(session) => session.gate.pause(),
            None => return Err(SyncError::NoSession),
        }

        let result = self.push_inner(force);

        let deferred = match self.session.as_mut() {
            Some(session) => session.gate.resume(),
            // The push itself may have torn the session down.
            None => false,
        };
        if deferred {
            self.drain_deferred();
            match self.pull_inner() {
                Ok(PullOutcome::UpToDate) => self.stats.echoes_suppressed += 1,
                Ok(_) => {}
                Err(err) if err.is_session_ending() => return Err(err),
                Err(err) => {
                    warn!(error = %err, "post-push pull failed");
                    self.stats.last_error = Some(err.to_string());
                }
            }
        }

        result
    }

    fn push_inner(&mut self, force: bool) -> SyncResult<PushOutcome> {
        let code = self.current_code()?;

        let mut current = Version::ZERO;
        let mut stored_credential = None;
        let fetch = code.clone();
        if let Some(record) = self.bounded(move |store| store.get(&fetch))? {
            if record.invalidated {
                self.teardown_invalidated()?;
                return Err(SyncError::SessionInvalidated);
            }
            current = record.version;
            stored_credential = record.credential_hash;
            // The stale-write guard: accept only if this device has
            // observed every version that precedes its write. Content is
            // never compared.
            if !force && current > self.replica.known_version {
                self.stats.pushes_rejected += 1;
                self.set_conflict(record);
                return Err(SyncError::StaleWrite {
                    current_version: current,
                });
            }
        }

        let credential_hash = {
            let session = self.session.as_mut().ok_or(SyncError::NoSession)?;
            session.credential_hash = stored_credential.or(session.credential_hash);
            session.credential_hash
        };

        let new_version = Version::next_after(current);
        let record = SharedRecord::new(self.replica.state.clone(), new_version, credential_hash);
        let write_code = code.clone();
        self.bounded(move |store| store.put(&write_code, record))?;

        let state = self.replica.state.clone();
        self.replica.mark_synced(state, new_version);
        self.cache.save(&self.replica)?;
        self.debounce.cancel();
        self.conflict = None;
        self.stats.pushes_accepted += 1;
        debug!(version = %new_version, forced = force, "push accepted");
        Ok(PushOutcome::Accepted {
            version: new_version,
        })
    }

    // ---- edits and timers ----

    /// Records a user edit: replaces the live state, persists the
    /// replica and re-arms the auto-push timer. A burst of edits yields
    /// one push.
    pub fn note_edit(&mut self, state: S, now: Instant) -> SyncResult<()> {
        self.replica.state = state;
        self.cache.save(&self.replica)?;
        if self.replica.pending_changes() {
            // While a conflict is pending, auto-push stays disarmed; it
            // would only be rejected again.
            if self.conflict.is_none() {
                self.debounce.note_edit(now);
            }
        } else {
            // Edited back to the synced snapshot; nothing to push.
            self.debounce.cancel();
        }
        Ok(())
    }

    /// Drives the auto-push timer. Call regularly (or when the quiet
    /// period elapses). A fired push that hits a stale write leaves a
    /// conflict pending; a retryable failure re-arms the timer.
    pub fn tick(&mut self, now: Instant) -> SyncResult<Option<PushOutcome>> {
        if !self.debounce.fire_if_due(now) {
            return Ok(None);
        }
        if self.session.is_none() || !self.status().can_auto_push() {
            return Ok(None);
        }
        match self.push_guarded(false) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(SyncError::StaleWrite { .. }) => Ok(None),
            Err(err) if err.is_retryable() => {
                self.stats.last_error = Some(err.to_string());
                self.debounce.note_edit(now);
                warn!(error = %err, "auto-push failed, will retry");
                Ok(None)
            }
            Err(err) => {
                self.stats.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Discards pending edits, reverting to the last synced snapshot.
    pub fn discard_changes(&mut self) -> SyncResult<()> {
        self.replica.discard_edits();
        self.debounce.cancel();
        self.cache.save(&self.replica)?;
        Ok(())
    }

    // ---- live updates ----

    /// Drains and handles events from the live-update subscription.
    /// Any number of pending events collapses into at most one pull;
    /// events for versions this device has already observed (its own
    /// echoes included) are dropped.
    pub fn process_events(&mut self) -> SyncResult<Option<PullOutcome>> {
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };
        let events = session.subscription.drain();
        if events.is_empty() {
            return Ok(None);
        }
        if !session.gate.admit() {
            return Ok(None);
        }

        let mut newest = Version::ZERO;
        let mut invalidated = false;
        for event in events {
            match event {
                RemoteEvent::Changed(version) => newest = newest.max(version),
                RemoteEvent::Invalidated => invalidated = true,
            }
        }

        if invalidated {
            self.teardown_invalidated()?;
            return Err(SyncError::SessionInvalidated);
        }
        if newest > self.replica.known_version {
            return Ok(Some(self.pull()?));
        }
        self.stats.echoes_suppressed += 1;
        debug!(version = %newest, "suppressed echo of own write");
        Ok(None)
    }

    // ---- conflict resolution ----

    /// Resolves the pending conflict by adopting the remote state and
    /// discarding local edits. Never requires a credential.
    pub fn adopt_remote(&mut self) -> SyncResult<()> {
        let ctx = self.conflict.take().ok_or(SyncError::NoConflict)?;
        self.adopt(ctx.remote.state, ctx.remote.version)?;
        info!(version = %ctx.remote.version, "conflict resolved: adopted remote state");
        Ok(())
    }

    /// Resolves the pending conflict by overwriting the remote record
    /// with local state. Requires the administrator secret.
    pub fn force_local(&mut self, secret: &str) -> SyncResult<PushOutcome> {
        if self.conflict.is_none() {
            return Err(SyncError::NoConflict);
        }
        self.verify_credential(secret)?;
        let outcome = self.push_guarded(true)?;
        info!("conflict resolved: forced local state");
        Ok(outcome)
    }

    /// Dismisses the pending conflict, keeping local edits for later.
    pub fn cancel_conflict(&mut self) -> SyncResult<()> {
        self.conflict.take().ok_or(SyncError::NoConflict)?;
        debug!("conflict dismissed, local edits kept");
        Ok(())
    }

    // ---- credential-gated operations ----

    /// Checks a secret against the credential hash stored remotely.
    /// Fails closed: no stored hash rejects every secret.
    pub fn verify_credential(&self, secret: &str) -> SyncResult<()> {
        let code = self.current_code()?;
        let hash = self
            .bounded(move |store| store.get(&code))?
            .and_then(|record| record.credential_hash)
            .ok_or(SyncError::CredentialRejected)?;
        if hash.verify(secret) {
            Ok(())
        } else {
            Err(SyncError::CredentialRejected)
        }
    }

    /// Imports externally supplied state. With an active session this is
    /// a credential-gated forced push, superseding all remote history;
    /// without one it only replaces the local replica.
    pub fn import_state(&mut self, state: S, secret: &str) -> SyncResult<PushOutcome> {
        if self.session.is_none() {
            self.replica.state = state;
            self.cache.save(&self.replica)?;
            return Ok(PushOutcome::LocalOnly);
        }
        self.verify_credential(secret)?;
        self.replica.state = state;
        self.cache.save(&self.replica)?;
        let outcome = self.push_guarded(true)?;
        info!("imported state pushed over remote history");
        Ok(outcome)
    }

    // ---- internals ----

    /// Runs one remote call on a worker thread, bounded by the
    /// configured timeout. Expiry reports a retryable transport failure;
    /// the call itself is abandoned, not cancelled, so the engine never
    /// assumes a timed-out write did not apply server-side.
    fn bounded<T, F>(&self, call: F) -> SyncResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&R) -> StoreResult<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let store = Arc::clone(&self.store);
        thread::spawn(move || {
            // The receiver is gone if the deadline already expired.
            let _ = tx.send(call(&store));
        });
        match rx.recv_timeout(self.config.timeout) {
            Ok(result) => Ok(result?),
            Err(_) => Err(SyncError::RemoteUnavailable {
                message: format!("remote call exceeded {:?}", self.config.timeout),
                retryable: true,
            }),
        }
    }

    fn current_code(&self) -> SyncResult<AccessCode> {
        self.session
            .as_ref()
            .map(|session| session.code.clone())
            .ok_or(SyncError::NoSession)
    }

    fn set_conflict(&mut self, record: SharedRecord<S>) {
        warn!(remote_version = %record.version, "conflict detected");
        self.stats.conflicts_detected += 1;
        self.debounce.cancel();
        self.conflict = Some(ConflictContext {
            local: ConflictSide {
                state: self.replica.state.clone(),
                version: self.replica.known_version,
            },
            remote: ConflictSide {
                state: record.state,
                version: record.version,
            },
        });
    }

    /// Forced session teardown after the access code was revoked. Local
    /// state is kept; the observed version is cleared so a future
    /// session starts from scratch.
    fn teardown_invalidated(&mut self) -> SyncResult<()> {
        if let Some(session) = self.session.take() {
            warn!(code = %session.code, "leaving revoked session");
        }
        self.conflict = None;
        self.debounce.cancel();
        self.replica.known_version = Version::ZERO;
        self.cache.save(&self.replica)?;
        Ok(())
    }

    fn drain_deferred(&mut self) {
        // Events withheld during a push have been coalesced; their
        // payloads are not needed, the follow-up pull re-reads.
        if let Some(session) = self.session.as_ref() {
            let _ = session.subscription.drain();
        }
    }

    fn note_result<T>(&mut self, result: &SyncResult<T>) {
        match result {
            // Stale writes are control flow, not faults.
            Err(SyncError::StaleWrite { .. }) | Ok(_) => {}
            Err(err) => self.stats.last_error = Some(err.to_string()),
        }
    }
}
