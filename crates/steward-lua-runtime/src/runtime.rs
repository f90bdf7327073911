//! The Lua state and the thread that owns it.
//!
//! A Lua state must never be entered from two threads at once, so it lives
//! on a dedicated OS thread and callers talk to it over channels.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use mlua::Lua;
use tokio::sync::oneshot;

use crate::error::RuntimeError;

/// Work shipped to the Lua thread.
type Work = Box<dyn FnOnce(&Lua) -> Result<serde_json::Value, RuntimeError> + Send>;

type Reply = Result<serde_json::Value, RuntimeError>;

enum Job {
    Run {
        work: Work,
        reply: oneshot::Sender<Reply>,
    },
    Stop,
}

/// Handle to a Lua state living on its own OS thread.
///
/// Dropping the handle stops the thread once queued jobs are done.
pub struct LuaRuntime {
    jobs: mpsc::Sender<Job>,
    _handle: JoinHandle<()>,
}

impl LuaRuntime {
    /// Move `lua` onto a new OS thread. Not a tokio task: the state must not
    /// migrate between workers.
    pub fn new(lua: Lua) -> Self {
        let (jobs, queue) = mpsc::channel();

        let handle = thread::spawn(move || {
            tracing::debug!("Lua thread up");

            while let Ok(job) = queue.recv() {
                match job {
                    Job::Run { work, reply } => {
                        let _ = reply.send(work(&lua));
                    }
                    Job::Stop => {
                        tracing::debug!("Lua thread stopping");
                        break;
                    }
                }
            }
        });

        Self {
            jobs,
            _handle: handle,
        }
    }

    /// Wrap a typed closure so its result crosses the thread as JSON.
    fn boxed<F, T>(f: F) -> Work
    where
        F: FnOnce(&Lua) -> mlua::Result<T> + Send + 'static,
        T: serde::Serialize + 'static,
    {
        Box::new(move |lua| {
            let result = f(lua)?;
            serde_json::to_value(result).map_err(|e| RuntimeError::Conversion(e.to_string()))
        })
    }

    fn decode<T: serde::de::DeserializeOwned>(reply: Reply) -> Result<T, RuntimeError> {
        serde_json::from_value(reply?).map_err(|e| RuntimeError::Conversion(e.to_string()))
    }

    /// Run `f` against the Lua state and await its result.
    pub async fn with_lua<F, T>(&self, f: F) -> Result<T, RuntimeError>
    where
        F: FnOnce(&Lua) -> mlua::Result<T> + Send + 'static,
        T: serde::de::DeserializeOwned + serde::Serialize + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit(f, reply_tx)?;

        let reply = reply_rx.await.map_err(|_| RuntimeError::Closed)?;
        Self::decode(reply)
    }

    /// [`with_lua`](Self::with_lua), giving up after `timeout`.
    ///
    /// The closure still runs to completion on the Lua thread; only the
    /// caller stops waiting.
    pub async fn with_lua_timeout<F, T>(&self, timeout: Duration, f: F) -> Result<T, RuntimeError>
    where
        F: FnOnce(&Lua) -> mlua::Result<T> + Send + 'static,
        T: serde::de::DeserializeOwned + serde::Serialize + 'static,
    {
        match tokio::time::timeout(timeout, self.with_lua(f)).await {
            Ok(result) => result,
            Err(_) => Err(RuntimeError::Timeout { duration: timeout }),
        }
    }

    fn submit<F, T>(&self, f: F, reply: oneshot::Sender<Reply>) -> Result<(), RuntimeError>
    where
        F: FnOnce(&Lua) -> mlua::Result<T> + Send + 'static,
        T: serde::Serialize + 'static,
    {
        self.jobs
            .send(Job::Run {
                work: Self::boxed(f),
                reply,
            })
            .map_err(|_| RuntimeError::Closed)
    }

    /// Ask the Lua thread to stop after the jobs already queued.
    pub fn shutdown(&self) {
        let _ = self.jobs.send(Job::Stop);
    }
}

impl Drop for LuaRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
