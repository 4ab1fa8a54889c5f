//! Timed evaluation session: load, start, answer, periodic sync, submit.
//!
//! State lives in a `Store<SessionSnapshot>` that the UI subscribes to.
//! Background work (the sync timer and the debounced save) runs on Tokio
//! tasks tagged with the session epoch; bumping the epoch on reset, reload or
//! completion turns any late result into a no-op.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use aula_core::ErrorKind;
use aula_core::model::{
    AnswerValue, Answers, Attempt, AttemptId, AttemptState, EvaluationId, LocalCacheEntry,
    QuestionId, SubmissionResult, TimeSync,
};
use storage::LocalAttemptCache;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::debounce::DebounceSlot;
use super::state::{SessionPhase, SessionSnapshot};
use crate::api::EvaluationApi;
use crate::config::SessionConfig;
use crate::error::{ApiError, EvaluationSessionError};
use crate::store::Store;

//
// ─── SESSION HANDLE ────────────────────────────────────────────────────────────
//

/// Owner-facing handle. Dropping it stops every background task.
pub struct EvaluationSession {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn EvaluationApi>,
    cache: LocalAttemptCache,
    config: SessionConfig,
    state: Store<SessionSnapshot>,
    control: Mutex<Control>,
}

#[derive(Default)]
struct Control {
    epoch: u64,
    token: Option<String>,
    sync_task: Option<JoinHandle<()>>,
    saves: DebounceSlot,
}

impl Control {
    /// Abort all background work and start a new epoch.
    fn next_epoch(&mut self) -> u64 {
        self.stop_tasks();
        self.epoch = self.epoch.wrapping_add(1);
        self.epoch
    }

    fn stop_tasks(&mut self) {
        if let Some(task) = self.sync_task.take() {
            task.abort();
        }
        self.saves.abort_all();
    }
}

/// Everything a remote save needs, captured under the lock.
struct SaveJob {
    evaluation_id: EvaluationId,
    attempt_id: AttemptId,
    answers: Answers,
    remaining_time: Option<u32>,
    token: String,
}

enum Tick {
    Continue,
    Stop,
}

impl EvaluationSession {
    #[must_use]
    pub fn new(
        api: Arc<dyn EvaluationApi>,
        cache: LocalAttemptCache,
        config: SessionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                cache,
                config,
                state: Store::default(),
                control: Mutex::new(Control::default()),
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.get()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.inner.phase()
    }

    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        self.inner.state.with(SessionSnapshot::progress_percent)
    }

    /// True while a debounced save is waiting for its idle window or running.
    #[must_use]
    pub fn has_pending_save(&self) -> bool {
        self.inner.lock_control().saves.is_pending()
    }

    /// True while the remaining-time synchronization timer is running.
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.inner
            .lock_control()
            .sync_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Load an evaluation and resume its in-progress attempt, if any.
    ///
    /// Valid from `Idle` or `Failed`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` from other phases, and the `ApiError` of the
    /// evaluation fetch (or an `Unauthorized` attempt fetch), which also moves
    /// the session to `Failed`.
    pub async fn load(
        &self,
        evaluation_id: EvaluationId,
        token: &str,
    ) -> Result<(), EvaluationSessionError> {
        self.inner.load(evaluation_id, token).await
    }

    /// Open a new attempt for the loaded evaluation. Valid from `Viewing`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState`/`EvaluationMismatch` for misuse, and the
    /// backend's rejection (moving the session to `Failed`) otherwise.
    pub async fn start(
        &self,
        evaluation_id: EvaluationId,
        token: &str,
    ) -> Result<Attempt, EvaluationSessionError> {
        self.inner.start(evaluation_id, token).await
    }

    /// Merge an answer immediately and schedule a debounced remote save.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the session is `InProgress`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn record_answer(
        &self,
        question_id: QuestionId,
        value: impl Into<AnswerValue>,
        token: &str,
    ) -> Result<(), EvaluationSessionError> {
        self.inner.record_answer(question_id, value.into(), token)
    }

    /// Flush pending answers and submit the attempt.
    ///
    /// Valid from `InProgress`, or from `Failed` when an attempt exists. On
    /// failure the session returns to the phase it was in and keeps its local
    /// cache entry so the submit can be retried.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for misuse and the submission's `ApiError`.
    pub async fn finish(&self, token: &str) -> Result<SubmissionResult, EvaluationSessionError> {
        self.inner.finish(token).await
    }

    /// Stop all timers and return to `Idle` with empty state.
    pub fn reset(&self) {
        self.inner.reset();
    }
}

impl Drop for EvaluationSession {
    fn drop(&mut self) {
        self.inner.lock_control().next_epoch();
    }
}

//
// ─── LIFECYCLE ─────────────────────────────────────────────────────────────────
//

impl Inner {
    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn phase(&self) -> SessionPhase {
        self.state.with(|s| s.phase)
    }

    async fn load(
        self: &Arc<Self>,
        evaluation_id: EvaluationId,
        token: &str,
    ) -> Result<(), EvaluationSessionError> {
        let epoch = {
            let mut control = self.lock_control();
            let phase = self.phase();
            if !matches!(phase, SessionPhase::Idle | SessionPhase::Failed(_)) {
                return Err(EvaluationSessionError::InvalidState { op: "load", phase });
            }
            let epoch = control.next_epoch();
            control.token = Some(token.to_owned());
            self.state.set(SessionSnapshot {
                phase: SessionPhase::Loading,
                is_loading: true,
                ..SessionSnapshot::default()
            });
            epoch
        };
        debug!(%evaluation_id, "loading evaluation");

        let (evaluation, attempt) = tokio::join!(
            self.api.evaluation(evaluation_id, token),
            self.api.current_attempt(evaluation_id, token),
        );
        let evaluation = match evaluation {
            Ok(evaluation) => Arc::new(evaluation),
            Err(err) => return Err(self.fail(epoch, err.into())),
        };
        let attempt = match attempt {
            Ok(attempt) => attempt,
            Err(ApiError::Unauthorized) => {
                return Err(self.fail(epoch, ApiError::Unauthorized.into()));
            }
            Err(err) => {
                warn!(%evaluation_id, error = %err, "attempt lookup failed, continuing without it");
                None
            }
        };
        let resume_hint = match attempt {
            None => self.cache.load(evaluation_id).await,
            Some(_) => None,
        };

        let mut control = self.lock_control();
        if control.epoch != epoch {
            return Err(EvaluationSessionError::Superseded { op: "load" });
        }
        match attempt {
            Some(attempt) if attempt.is_in_progress() => {
                info!(%evaluation_id, attempt_id = %attempt.id, "resuming attempt");
                let attempt_id = attempt.id;
                self.state.set(SessionSnapshot {
                    phase: SessionPhase::InProgress,
                    evaluation: Some(evaluation),
                    answers: attempt.answers.clone(),
                    remaining_time: Some(attempt.remaining_time),
                    attempt: Some(attempt),
                    ..SessionSnapshot::default()
                });
                control.sync_task = Some(self.spawn_sync(epoch, attempt_id));
            }
            attempt => {
                self.state.set(SessionSnapshot {
                    phase: SessionPhase::Viewing,
                    evaluation: Some(evaluation),
                    attempt,
                    resume_hint,
                    ..SessionSnapshot::default()
                });
            }
        }
        Ok(())
    }

    async fn start(
        self: &Arc<Self>,
        evaluation_id: EvaluationId,
        token: &str,
    ) -> Result<Attempt, EvaluationSessionError> {
        let epoch = {
            let mut control = self.lock_control();
            let (phase, is_loading, loaded) = self.state.with(|s| {
                (s.phase, s.is_loading, s.evaluation.as_ref().map(|e| e.id))
            });
            if phase != SessionPhase::Viewing || is_loading {
                return Err(EvaluationSessionError::InvalidState { op: "start", phase });
            }
            if loaded != Some(evaluation_id) {
                return Err(EvaluationSessionError::EvaluationMismatch {
                    requested: evaluation_id,
                });
            }
            control.token = Some(token.to_owned());
            self.state.update(|s| {
                s.is_loading = true;
                s.last_error = None;
            });
            control.epoch
        };

        let attempt = match self.api.start_attempt(evaluation_id, token).await {
            Ok(attempt) => attempt,
            Err(err) => return Err(self.fail(epoch, err.into())),
        };
        if !attempt.is_in_progress() {
            return Err(self.fail(epoch, EvaluationSessionError::AttemptExpired));
        }

        let mut control = self.lock_control();
        if control.epoch != epoch {
            return Err(EvaluationSessionError::Superseded { op: "start" });
        }
        info!(
            %evaluation_id,
            attempt_id = %attempt.id,
            remaining = attempt.remaining_time,
            "attempt started"
        );
        self.state.update(|s| {
            s.phase = SessionPhase::InProgress;
            s.attempt = Some(attempt.clone());
            s.answers = Answers::new();
            s.remaining_time = Some(attempt.remaining_time);
            s.is_loading = false;
            s.resume_hint = None;
        });
        control.sync_task = Some(self.spawn_sync(epoch, attempt.id));
        Ok(attempt)
    }

    fn record_answer(
        self: &Arc<Self>,
        question_id: QuestionId,
        value: AnswerValue,
        token: &str,
    ) -> Result<(), EvaluationSessionError> {
        let mut control = self.lock_control();
        let phase = self.phase();
        if phase != SessionPhase::InProgress {
            return Err(EvaluationSessionError::InvalidState {
                op: "record_answer",
                phase,
            });
        }
        control.token = Some(token.to_owned());
        self.state.update(|s| {
            s.answers.insert(question_id, value);
        });

        let epoch = control.epoch;
        let inner = Arc::clone(self);
        control
            .saves
            .schedule(self.config.save_debounce, move |seq| async move {
                inner.run_debounced_save(epoch, seq).await;
            });
        Ok(())
    }

    async fn finish(
        self: &Arc<Self>,
        token: &str,
    ) -> Result<SubmissionResult, EvaluationSessionError> {
        let (epoch, prior, in_flight, flush) = {
            let mut control = self.lock_control();
            let (prior, has_attempt) = self.state.with(|s| (s.phase, s.attempt.is_some()));
            let allowed = matches!(prior, SessionPhase::InProgress | SessionPhase::Failed(_));
            if !allowed || !has_attempt {
                return Err(EvaluationSessionError::InvalidState {
                    op: "finish",
                    phase: prior,
                });
            }
            control.token = Some(token.to_owned());
            let flush = if control.saves.cancel() {
                self.save_job(&control)
            } else {
                None
            };
            let in_flight = control.saves.take_running();
            self.state.update(|s| {
                s.phase = SessionPhase::Submitting;
                s.is_loading = true;
            });
            (control.epoch, prior, in_flight, flush)
        };

        // a save that already started must land before the submit and the cache clear
        if let Some(handle) = in_flight {
            if let Err(err) = handle.await {
                debug!(error = %err, "in-flight save did not complete");
            }
        }
        if let Some(job) = flush {
            debug!(attempt_id = %job.attempt_id, "flushing pending answers before submit");
            self.perform_save(job).await;
        }

        // answers cannot change while Submitting
        let Some((evaluation_id, attempt_id, answers)) = self.state.with(|s| {
            s.attempt
                .as_ref()
                .map(|a| (a.evaluation_id, a.id, s.answers.clone()))
        }) else {
            return Err(EvaluationSessionError::Superseded { op: "finish" });
        };

        match self
            .api
            .submit(evaluation_id, attempt_id, &answers, token)
            .await
        {
            Ok(result) => {
                {
                    let mut control = self.lock_control();
                    if control.epoch == epoch {
                        control.next_epoch();
                        control.token = None;
                        self.state.update(|s| {
                            s.phase = SessionPhase::Completed;
                            s.is_loading = false;
                            s.last_error = None;
                            s.result = Some(result.clone());
                            if let Some(attempt) = s.attempt.as_mut() {
                                attempt.state = AttemptState::Submitted;
                            }
                        });
                    }
                }
                self.cache.clear(evaluation_id).await;
                info!(%evaluation_id, %attempt_id, answers = answers.len(), "attempt submitted");
                Ok(result)
            }
            Err(err) => {
                warn!(%evaluation_id, %attempt_id, error = %err, "submission failed");
                let control = self.lock_control();
                if control.epoch == epoch {
                    self.state.update(|s| {
                        s.phase = prior;
                        s.is_loading = false;
                        s.last_error = Some(err.kind());
                    });
                }
                drop(control);
                Err(err.into())
            }
        }
    }

    fn reset(&self) {
        let mut control = self.lock_control();
        control.next_epoch();
        control.token = None;
        self.state.set(SessionSnapshot::default());
        debug!("evaluation session reset");
    }

    /// Move to `Failed` if `epoch` is still current, and hand the error back.
    fn fail(&self, epoch: u64, err: EvaluationSessionError) -> EvaluationSessionError {
        let mut control = self.lock_control();
        if control.epoch != epoch {
            return err;
        }
        control.stop_tasks();
        let kind = err.kind().unwrap_or(ErrorKind::ServerError);
        warn!(error = %err, ?kind, "evaluation session failed");
        self.state.update(|s| {
            s.phase = SessionPhase::Failed(kind);
            s.is_loading = false;
            s.last_error = Some(kind);
        });
        err
    }
}

//
// ─── DEBOUNCED SAVE ────────────────────────────────────────────────────────────
//

impl Inner {
    async fn run_debounced_save(&self, epoch: u64, seq: u64) {
        let job = {
            let mut control = self.lock_control();
            if control.epoch != epoch || !control.saves.claim(seq) {
                return;
            }
            self.save_job(&control)
        };
        if let Some(job) = job {
            self.perform_save(job).await;
        }
        self.lock_control().saves.complete(seq);
    }

    fn save_job(&self, control: &Control) -> Option<SaveJob> {
        let token = control.token.clone()?;
        self.state.with(|s| {
            let attempt = s.attempt.as_ref()?;
            Some(SaveJob {
                evaluation_id: attempt.evaluation_id,
                attempt_id: attempt.id,
                answers: s.answers.clone(),
                remaining_time: s.remaining_time,
                token,
            })
        })
    }

    /// Mirror into the local cache, then post the full answer map.
    async fn perform_save(&self, job: SaveJob) {
        let entry = LocalCacheEntry {
            evaluation_id: job.evaluation_id,
            answers: job.answers,
            remaining_time: job.remaining_time,
        };
        self.cache.save(job.evaluation_id, &entry).await;

        match self
            .api
            .save_answers(job.attempt_id, &entry.answers, &job.token)
            .await
        {
            Ok(()) => {
                debug!(attempt_id = %job.attempt_id, answers = entry.answers.len(), "answers saved");
            }
            Err(err) => {
                warn!(attempt_id = %job.attempt_id, error = %err, "failed to save answers");
            }
        }
    }
}

//
// ─── TIME SYNCHRONIZATION ──────────────────────────────────────────────────────
//

impl Inner {
    fn spawn_sync(self: &Arc<Self>, epoch: u64, attempt_id: AttemptId) -> JoinHandle<()> {
        let inner = Arc::clone(self);
        tokio::spawn(async move { inner.run_sync_loop(epoch, attempt_id).await })
    }

    async fn run_sync_loop(&self, epoch: u64, attempt_id: AttemptId) {
        let period = self.config.sync_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Tick::Stop = self.sync_tick(epoch, attempt_id, period).await {
                debug!(%attempt_id, "time synchronization stopped");
                break;
            }
        }
    }

    async fn sync_tick(&self, epoch: u64, attempt_id: AttemptId, elapsed: Duration) -> Tick {
        let elapsed = u32::try_from(elapsed.as_secs()).unwrap_or(u32::MAX);
        let (token, remaining) = {
            let control = self.lock_control();
            if control.epoch != epoch {
                return Tick::Stop;
            }
            let Some(token) = control.token.clone() else {
                return Tick::Stop;
            };
            let mut remaining = None;
            self.state.update_if(|s| {
                if s.phase != SessionPhase::InProgress {
                    return false;
                }
                let next = s.remaining_time.unwrap_or(0).saturating_sub(elapsed);
                s.remaining_time = Some(next);
                remaining = Some(next);
                true
            });
            match remaining {
                Some(remaining) => (token, remaining),
                // submitting; skip this round
                None => return Tick::Continue,
            }
        };

        match self.api.sync_time(attempt_id, remaining, &token).await {
            Ok(sync) => self.apply_time_sync(epoch, attempt_id, sync),
            Err(ApiError::Unauthorized) => {
                warn!(%attempt_id, "time synchronization unauthorized, stopping timer");
                let mut control = self.lock_control();
                if control.epoch == epoch {
                    control.sync_task = None;
                    self.state.update(|s| s.last_error = Some(ErrorKind::Unauthorized));
                }
                Tick::Stop
            }
            Err(err) => {
                warn!(%attempt_id, error = %err, "time synchronization failed");
                Tick::Continue
            }
        }
    }

    /// Apply the backend's countdown. The server may shorten it, never extend it.
    fn apply_time_sync(&self, epoch: u64, attempt_id: AttemptId, sync: TimeSync) -> Tick {
        let mut control = self.lock_control();
        if control.epoch != epoch {
            return Tick::Stop;
        }
        let mut expired = false;
        self.state.update_if(|s| {
            if s.phase != SessionPhase::InProgress {
                return false;
            }
            let corrected = s
                .remaining_time
                .map_or(sync.remaining_time, |local| local.min(sync.remaining_time));
            s.remaining_time = Some(corrected);
            if let Some(attempt) = s.attempt.as_mut() {
                attempt.state = sync.state;
                attempt.remaining_time = corrected;
            }
            if !sync.state.is_active() {
                s.phase = SessionPhase::Failed(ErrorKind::AttemptExpired);
                s.last_error = Some(ErrorKind::AttemptExpired);
                expired = true;
            }
            true
        });

        if expired {
            info!(%attempt_id, state = ?sync.state, "attempt no longer in progress");
            control.sync_task = None;
            Tick::Stop
        } else {
            Tick::Continue
        }
    }
}
