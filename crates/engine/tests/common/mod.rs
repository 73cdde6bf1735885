//! Shared test doubles: a scripted generation session, pool builders, and
//! fast engine configurations.
//!
//! Every scripted session in a test shares one reply queue and one call
//! log, so a failover mid-scene simply hands the next reply to whichever
//! session is active.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use retake_core::attempt::Outcome;
use retake_core::retry::RetryPolicy;
use retake_core::scene::{Scene, ScenePrompt};
use retake_engine::EngineConfig;
use retake_session::{GenerationSession, SessionError, SessionPool, StudioApiError};

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

/// One scripted reply to a `submit` call, consumed in FIFO order.
pub enum ScriptedReply {
    /// Return this outcome.
    Reply(Outcome),
    /// Fail with a hard session error.
    HardError(String),
    /// Never resolve; exercises the attempt timeout.
    Hang,
}

/// One recorded `submit` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub scene: u32,
    pub session: String,
}

#[derive(Default)]
struct CallLog {
    opened: Vec<String>,
    closed: Vec<String>,
    submissions: Vec<Submission>,
}

/// Shared reply queue and call log handed to every scripted session.
#[derive(Clone, Default)]
pub struct ScriptHandle {
    script: Arc<Mutex<VecDeque<ScriptedReply>>>,
    log: Arc<Mutex<CallLog>>,
}

impl ScriptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, artifact: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Reply(Outcome::success(artifact)));
    }

    pub fn push_fail(&self, signal: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Reply(Outcome::failure(signal)));
    }

    pub fn push_hard_error(&self, detail: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedReply::HardError(detail.to_string()));
    }

    pub fn push_hang(&self) {
        self.script.lock().unwrap().push_back(ScriptedReply::Hang);
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.log.lock().unwrap().submissions.clone()
    }

    /// Session ids in submission order.
    pub fn sessions_used(&self) -> Vec<String> {
        self.submissions().into_iter().map(|s| s.session).collect()
    }

    /// Scene numbers in submission order.
    pub fn scenes_submitted(&self) -> Vec<u32> {
        self.submissions().into_iter().map(|s| s.scene).collect()
    }

    pub fn opened(&self) -> Vec<String> {
        self.log.lock().unwrap().opened.clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.log.lock().unwrap().closed.clone()
    }
}

// ---------------------------------------------------------------------------
// Scripted session
// ---------------------------------------------------------------------------

/// [`GenerationSession`] driven entirely by a [`ScriptHandle`].
pub struct ScriptedSession {
    id: String,
    handle: ScriptHandle,
    fail_open: bool,
}

impl ScriptedSession {
    pub fn boxed(id: &str, handle: &ScriptHandle) -> Box<dyn GenerationSession> {
        Box::new(Self {
            id: id.to_string(),
            handle: handle.clone(),
            fail_open: false,
        })
    }

    /// A session whose `open` always fails, for degrade and abort tests.
    pub fn failing_open(id: &str, handle: &ScriptHandle) -> Box<dyn GenerationSession> {
        Box::new(Self {
            id: id.to_string(),
            handle: handle.clone(),
            fail_open: true,
        })
    }
}

#[async_trait]
impl GenerationSession for ScriptedSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn open(&mut self) -> Result<(), SessionError> {
        if self.fail_open {
            return Err(SessionError::Auth {
                session_id: self.id.clone(),
                detail: "scripted credential rejection".to_string(),
            });
        }
        self.handle.log.lock().unwrap().opened.push(self.id.clone());
        Ok(())
    }

    async fn submit(&mut self, scene: &Scene) -> Result<Outcome, SessionError> {
        let reply = {
            self.handle.log.lock().unwrap().submissions.push(Submission {
                scene: scene.number,
                session: self.id.clone(),
            });
            self.handle.script.lock().unwrap().pop_front()
        };
        match reply {
            Some(ScriptedReply::Reply(outcome)) => Ok(outcome),
            Some(ScriptedReply::HardError(detail)) => Err(SessionError::Api(StudioApiError::Api {
                status: 500,
                body: detail,
            })),
            Some(ScriptedReply::Hang) => std::future::pending().await,
            None => panic!("script ran out of replies at scene {}", scene.number),
        }
    }

    async fn close(&mut self) {
        self.handle.log.lock().unwrap().closed.push(self.id.clone());
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn scene(number: u32) -> Scene {
    Scene {
        number,
        label: format!("Scene{number}"),
        prompt: ScenePrompt {
            prompt: format!("establishing shot {number}"),
            reference_images: Vec::new(),
        },
    }
}

/// Scenes numbered 1..=count.
pub fn scenes(count: u32) -> Vec<Scene> {
    (1..=count).map(scene).collect()
}

pub fn two_session_pool(handle: &ScriptHandle) -> SessionPool {
    SessionPool::new(vec![
        ScriptedSession::boxed("primary", handle),
        ScriptedSession::boxed("backup", handle),
    ])
}

pub fn single_session_pool(handle: &ScriptHandle) -> SessionPool {
    SessionPool::new(vec![ScriptedSession::boxed("solo", handle)])
}

/// Retry policy with no waits, so tests run in milliseconds.
pub fn fast_policy(max_retries: u32, switch_after: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries_per_scene: max_retries,
        switch_after_retries: switch_after,
        base_wait: Duration::ZERO,
        attempt_timeout: Duration::from_secs(30),
    }
}

/// Engine configuration with no waits.
pub fn fast_config(max_retries: u32, switch_after: u32, restart_after: u32) -> EngineConfig {
    EngineConfig {
        retry: fast_policy(max_retries, switch_after),
        restart_after,
        scene_wait: Duration::ZERO,
    }
}
