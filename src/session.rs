//! Session controller: the menu → loading → playing → result state machine for one learner.
//!
//! This module owns:
//!   - the current phase and, while playing, the round (question, authority, countdown)
//!   - the learner's star counters (loaded once on creation, persisted after each result)
//!   - the watch channel the UI layer renders from
//!
//! Remote failures never reach the learner: a failed start generates the question locally,
//! a failed submit produces a zero-score result. A round yields at most one result; the
//! countdown is stopped the moment a submission is claimed.

use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Duration;

use rand::rngs::StdRng;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{AuthorityMode, ChallengeArchetype, GameQuestion, GameResult, Level};
use crate::generator::{self, Generated};
use crate::logic;
use crate::remote::GameService;
use crate::stats::{StatsRecord, StatsStore};

/// Submitted when the clock runs out and nothing was typed.
pub const NO_ANSWER: &str = "(no answer)";

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no round is being played")]
    NotPlaying,
    #[error("this game has no options to pick from")]
    NoOptions,
    #[error("'{0}' is not one of the offered options")]
    UnknownOption(String),
    #[error("there is no finished round to play again")]
    NothingToReplay,
}

/// Who is trusted for the current round. Local rounds keep the hidden answer here and only here.
#[derive(Clone, Debug)]
enum Authority {
    Remote,
    Local { answer: String },
}

impl Authority {
    fn mode(&self) -> AuthorityMode {
        match self {
            Authority::Remote => AuthorityMode::Remote,
            Authority::Local { .. } => AuthorityMode::Local,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseName {
    Menu,
    Loading,
    Playing,
    Result,
}

/// Everything the UI needs to draw the current phase. Never contains a hidden answer
/// before the result exists.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionView {
    pub learner: String,
    pub phase: PhaseName,
    pub game: Option<ChallengeArchetype>,
    pub question: Option<GameQuestion>,
    pub authority: Option<AuthorityMode>,
    pub remaining_seconds: Option<u32>,
    pub answer: Option<String>,
    pub result: Option<GameResult>,
    pub stats: StatsRecord,
}

/// Handle to the countdown task. Dropping it stops the task.
struct Countdown {
    handle: Option<JoinHandle<()>>,
}

impl Countdown {
    fn spawn<R: GameService>(session: Weak<SessionController<R>>, round_id: Uuid) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            loop {
                ticker.tick().await;
                let Some(session) = session.upgrade() else { break };
                match session.on_tick(round_id).await {
                    Tick::Running => {}
                    Tick::Expired => {
                        session.expire(round_id).await;
                        break;
                    }
                    Tick::Stale => break,
                }
            }
        });
        Self { handle: Some(handle) }
    }

    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn cancel(&mut self) {
        if let Some(h) = self.handle.take() {
            h.abort();
        }
    }

    /// Detach without aborting; used by the task itself when it fires the timeout submission.
    fn release(&mut self) {
        self.handle.take();
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Tick {
    Running,
    Expired,
    Stale,
}

enum Trigger {
    Learner,
    Timeout(Uuid),
}

enum Submission {
    Held,
    Typed(String),
    Picked(String),
}

struct Round {
    id: Uuid,
    level: Level,
    question: GameQuestion,
    authority: Authority,
    started_at: Instant,
    remaining: u32,
    answer: String,
    submitted: bool,
    countdown: Countdown,
}

enum Phase {
    Menu,
    Loading { round_id: Uuid, game: ChallengeArchetype },
    Playing(Round),
    Result { game: ChallengeArchetype, level: Level, authority: AuthorityMode, result: GameResult },
}

struct Inner {
    phase: Phase,
    stats: StatsRecord,
}

/// Data captured when a submission is claimed, so grading can run without the lock.
struct Claim {
    round_id: Uuid,
    game: ChallengeArchetype,
    level: Level,
    question: GameQuestion,
    authority: Authority,
    answer: String,
    elapsed: f64,
}

pub struct SessionController<R: GameService> {
    learner_id: String,
    remote: Option<Arc<R>>,
    store: StatsStore,
    rng: StdMutex<StdRng>,
    inner: Mutex<Inner>,
    views: watch::Sender<SessionView>,
}

impl<R: GameService> SessionController<R> {
    /// Mount: reads the learner's stats once.
    pub fn new(learner_id: String, remote: Option<Arc<R>>, store: StatsStore, rng: StdRng) -> Arc<Self> {
        let inner = Inner { phase: Phase::Menu, stats: store.load(&learner_id) };
        let (views, _) = watch::channel(render(&learner_id, &inner));
        Arc::new(Self { learner_id, remote, store, rng: StdMutex::new(rng), inner: Mutex::new(inner), views })
    }

    pub fn learner_id(&self) -> &str {
        &self.learner_id
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.views.subscribe()
    }

    pub async fn view(&self) -> SessionView {
        let inner = self.inner.lock().await;
        render(&self.learner_id, &inner)
    }

    pub async fn stats(&self) -> StatsRecord {
        self.inner.lock().await.stats
    }

    pub async fn countdown_active(&self) -> bool {
        match &self.inner.lock().await.phase {
            Phase::Playing(round) => round.countdown.is_running(),
            _ => false,
        }
    }

    fn publish(&self, inner: &Inner) {
        self.views.send_replace(render(&self.learner_id, inner));
    }

    fn generate(&self, game: ChallengeArchetype, level: Level) -> Generated {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        generator::generate(game, level, &mut *rng)
    }

    /// menu/result → loading → playing. Always reaches `playing` unless the learner left meanwhile.
    #[instrument(level = "info", skip(self, game, level), fields(learner = %self.learner_id, game = game.id()))]
    pub async fn start(self: &Arc<Self>, game: ChallengeArchetype, level: Level) -> SessionView {
        let round_id = Uuid::new_v4();
        {
            let mut inner = self.inner.lock().await;
            let server_round = holds_server_round(&inner.phase);
            // Replacing the phase drops any running round, and its countdown with it.
            inner.phase = Phase::Loading { round_id, game };
            self.publish(&inner);
            if server_round {
                self.notify_cancel();
            }
        }

        let remote_question = match &self.remote {
            Some(remote) => match remote.start(game, &self.learner_id, level).await {
                Ok(q) if q.game == game => Some(q),
                Ok(q) => {
                    warn!(target: "session", got = q.game.id(), "Remote sent a different game; generating locally");
                    None
                }
                Err(e) => {
                    warn!(target: "session", error = %e, "Remote start failed; generating locally");
                    None
                }
            },
            None => None,
        };
        let (question, authority) = match remote_question {
            Some(q) => (q, Authority::Remote),
            None => {
                let g = self.generate(game, level);
                (g.question, Authority::Local { answer: g.answer })
            }
        };

        let mut inner = self.inner.lock().await;
        if !matches!(inner.phase, Phase::Loading { round_id: current, .. } if current == round_id) {
            debug!(target: "session", "Left while loading; discarding question");
            return render(&self.learner_id, &inner);
        }
        info!(
            target: "session",
            authority = ?authority.mode(),
            time_limit = question.time_limit,
            reward = question.reward,
            "Round started"
        );
        inner.phase = Phase::Playing(Round {
            id: round_id,
            level,
            remaining: question.time_limit,
            question,
            authority,
            started_at: Instant::now(),
            answer: String::new(),
            submitted: false,
            countdown: Countdown::spawn(Arc::downgrade(self), round_id),
        });
        self.publish(&inner);
        render(&self.learner_id, &inner)
    }

    /// Update the held free-text answer.
    pub async fn set_answer(&self, answer: String) -> Result<SessionView, SessionError> {
        let mut inner = self.inner.lock().await;
        match &mut inner.phase {
            Phase::Playing(round) if !round.submitted => round.answer = answer,
            _ => return Err(SessionError::NotPlaying),
        }
        self.publish(&inner);
        Ok(render(&self.learner_id, &inner))
    }

    /// Picking an option is the submission for fixed-option games.
    pub async fn select_option(&self, option: String) -> Result<SessionView, SessionError> {
        self.finish(Trigger::Learner, Submission::Picked(option)).await
    }

    /// Manual submit. `None` submits the held answer.
    pub async fn submit(&self, answer: Option<String>) -> Result<SessionView, SessionError> {
        let submission = match answer {
            Some(a) => Submission::Typed(a),
            None => Submission::Held,
        };
        self.finish(Trigger::Learner, submission).await
    }

    /// result → playing with a fresh question for the same game and level.
    pub async fn play_again(self: &Arc<Self>) -> Result<SessionView, SessionError> {
        let (game, level) = match &self.inner.lock().await.phase {
            Phase::Result { game, level, .. } => (*game, *level),
            _ => return Err(SessionError::NothingToReplay),
        };
        Ok(self.start(game, level).await)
    }

    /// Any phase → menu. A server-side round in progress gets a best-effort cancel.
    #[instrument(level = "info", skip(self), fields(learner = %self.learner_id))]
    pub async fn back(&self) -> SessionView {
        let mut inner = self.inner.lock().await;
        let server_round = holds_server_round(&inner.phase);
        inner.phase = Phase::Menu;
        self.publish(&inner);
        if server_round {
            self.notify_cancel();
        }
        render(&self.learner_id, &inner)
    }

    fn notify_cancel(&self) {
        let Some(remote) = self.remote.clone() else { return };
        let learner_id = self.learner_id.clone();
        tokio::spawn(async move {
            if let Err(e) = remote.cancel(&learner_id).await {
                debug!(target: "session", %learner_id, error = %e, "Remote cancel failed (ignored)");
            }
        });
    }

    /// True while nothing is in flight and nobody is watching; such a session can be dropped.
    pub async fn is_idle(&self) -> bool {
        self.views.receiver_count() == 0 && matches!(self.inner.lock().await.phase, Phase::Menu)
    }

    /// Timeout submission from the countdown. False when a submission already claimed the round.
    async fn expire(&self, round_id: Uuid) -> bool {
        match self.finish(Trigger::Timeout(round_id), Submission::Held).await {
            Ok(_) => true,
            Err(e) => {
                debug!(target: "session", learner = %self.learner_id, %round_id, error = %e, "Timeout lost to an earlier submission");
                false
            }
        }
    }

    async fn on_tick(&self, round_id: Uuid) -> Tick {
        let mut inner = self.inner.lock().await;
        let tick = match &mut inner.phase {
            Phase::Playing(round) if round.id == round_id && !round.submitted => {
                round.remaining = round.remaining.saturating_sub(1);
                if round.remaining == 0 {
                    Tick::Expired
                } else {
                    Tick::Running
                }
            }
            _ => Tick::Stale,
        };
        if tick != Tick::Stale {
            self.publish(&inner);
        }
        tick
    }

    /// playing → result. Claims the round under the lock (first caller wins), grades
    /// outside it, then commits if the round is still current.
    async fn finish(&self, trigger: Trigger, submission: Submission) -> Result<SessionView, SessionError> {
        let claim = {
            let mut inner = self.inner.lock().await;
            let claim = claim_round(&mut inner.phase, &trigger, submission)?;
            self.publish(&inner);
            claim
        };

        let result = match &claim.authority {
            Authority::Local { answer } => logic::local_result(&claim.question, answer, &claim.answer, claim.elapsed),
            Authority::Remote => match &self.remote {
                Some(remote) => match remote.submit(&self.learner_id, &claim.answer).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(target: "session", learner = %self.learner_id, error = %e, "Remote submit failed; recording unscored result");
                        logic::unscored_result(None, &claim.answer, claim.elapsed)
                    }
                },
                None => logic::unscored_result(None, &claim.answer, claim.elapsed),
            },
        };

        let mut inner = self.inner.lock().await;
        if !matches!(&inner.phase, Phase::Playing(round) if round.id == claim.round_id) {
            debug!(target: "session", learner = %self.learner_id, "Round left before its result arrived; dropping result");
            return Ok(render(&self.learner_id, &inner));
        }
        inner.stats.record_round(result.stars_earned);
        if let Err(e) = self.store.save(&self.learner_id, inner.stats) {
            warn!(target: "session", learner = %self.learner_id, error = %e, "Could not persist stats");
        }
        info!(
            target: "session",
            learner = %self.learner_id,
            game = claim.game.id(),
            authority = ?claim.authority.mode(),
            timed_out = matches!(trigger, Trigger::Timeout(_)),
            correct = result.correct,
            stars = result.stars_earned,
            elapsed = claim.elapsed,
            "Round finished"
        );
        inner.phase = Phase::Result {
            game: claim.game,
            level: claim.level,
            authority: claim.authority.mode(),
            result,
        };
        self.publish(&inner);
        Ok(render(&self.learner_id, &inner))
    }
}

/// A round the remote service knows about and that has not been submitted yet.
fn holds_server_round(phase: &Phase) -> bool {
    match phase {
        Phase::Loading { .. } => true,
        Phase::Playing(round) => matches!(round.authority, Authority::Remote) && !round.submitted,
        Phase::Menu | Phase::Result { .. } => false,
    }
}

fn claim_round(phase: &mut Phase, trigger: &Trigger, submission: Submission) -> Result<Claim, SessionError> {
    let Phase::Playing(round) = phase else { return Err(SessionError::NotPlaying) };
    if round.submitted {
        return Err(SessionError::NotPlaying);
    }
    if let Trigger::Timeout(id) = trigger {
        if *id != round.id {
            return Err(SessionError::NotPlaying);
        }
    }

    let answer = match submission {
        Submission::Held => round.answer.clone(),
        Submission::Typed(a) => a,
        Submission::Picked(option) => {
            if !round.question.game.submits_on_select() {
                return Err(SessionError::NoOptions);
            }
            let options = round.question.question.options().ok_or(SessionError::NoOptions)?;
            if !options.contains(&option) {
                return Err(SessionError::UnknownOption(option));
            }
            option
        }
    };
    let answer = if answer.trim().is_empty() { NO_ANSWER.to_string() } else { answer };

    round.submitted = true;
    round.answer = answer.clone();
    match trigger {
        Trigger::Learner => round.countdown.cancel(),
        Trigger::Timeout(_) => round.countdown.release(),
    }

    Ok(Claim {
        round_id: round.id,
        game: round.question.game,
        level: round.level,
        question: round.question.clone(),
        authority: round.authority.clone(),
        answer,
        elapsed: round.started_at.elapsed().as_secs_f64(),
    })
}

/// What an unmounted learner sees: the menu and their stored counters.
pub fn menu_view(learner: &str, stats: StatsRecord) -> SessionView {
    render(learner, &Inner { phase: Phase::Menu, stats })
}

fn render(learner: &str, inner: &Inner) -> SessionView {
    let mut view = SessionView {
        learner: learner.to_string(),
        phase: PhaseName::Menu,
        game: None,
        question: None,
        authority: None,
        remaining_seconds: None,
        answer: None,
        result: None,
        stats: inner.stats,
    };
    match &inner.phase {
        Phase::Menu => {}
        Phase::Loading { game, .. } => {
            view.phase = PhaseName::Loading;
            view.game = Some(*game);
        }
        Phase::Playing(round) => {
            view.phase = PhaseName::Playing;
            view.game = Some(round.question.game);
            view.question = Some(round.question.clone());
            view.authority = Some(round.authority.mode());
            view.remaining_seconds = Some(round.remaining);
            view.answer = Some(round.answer.clone());
        }
        Phase::Result { game, authority, result, .. } => {
            view.phase = PhaseName::Result;
            view.game = Some(*game);
            view.authority = Some(*authority);
            view.result = Some(result.clone());
        }
    }
    view
}
