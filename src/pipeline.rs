//! One notifier run: fetch the check suite, resolve the actor, format, deliver.
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::delivery::deliver;
use crate::filter::filter_failed;
use crate::format::{build_attachments, Attachment};
use crate::github::SourceControl;
use crate::model::Invocation;
use crate::output;
use crate::resolver::{resolve_actor, resolve_chat_user, MatchBy, NameSplit};
use crate::retry::Sleeper;
use crate::slack::ChatPlatform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Start,
    Resolving,
    Formatting,
    Delivering,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub invocation: Invocation,
    pub match_by: MatchBy,
    pub name_split: NameSplit,
    pub github_output: Option<PathBuf>,
}

impl From<&Config> for Settings {
    fn from(cfg: &Config) -> Self {
        Settings {
            invocation: cfg.invocation.clone(),
            match_by: cfg.slack.match_by,
            name_split: cfg.slack.name_split,
            github_output: cfg.github_output.as_ref().map(PathBuf::from),
        }
    }
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub attachments: Vec<Attachment>,
    pub chat_user_id: Option<String>,
    pub delivered: bool,
}

pub struct Pipeline<'a> {
    scm: &'a dyn SourceControl,
    chat: &'a dyn ChatPlatform,
    sleeper: &'a dyn Sleeper,
    settings: Settings,
    state: State,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        scm: &'a dyn SourceControl,
        chat: &'a dyn ChatPlatform,
        sleeper: &'a dyn Sleeper,
        settings: Settings,
    ) -> Self {
        Self {
            scm,
            chat,
            sleeper,
            settings,
            state: State::Start,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    fn enter(&mut self, next: State) {
        debug!(from = ?self.state, to = ?next, "pipeline transition");
        self.state = next;
    }

    /// Run to `Done` or `Failed`. The first error ends the run.
    pub async fn run(&mut self) -> Result<Outcome> {
        let res = self.steps().await;
        self.enter(if res.is_ok() { State::Done } else { State::Failed });
        res
    }

    #[instrument(skip_all, fields(
        repository = %self.settings.invocation.repository,
        check_suite_id = self.settings.invocation.check_suite_id,
    ))]
    async fn steps(&mut self) -> Result<Outcome> {
        let inv = self.settings.invocation.clone();

        self.enter(State::Resolving);
        let suite = self
            .scm
            .get_check_suite(&inv.repository, inv.check_suite_id)
            .await
            .context("failed to fetch check suite")?;
        let failed = filter_failed(&suite.check_runs);
        info!(
            total = suite.check_runs.len(),
            failed = failed.len(),
            "filtered check runs"
        );

        let actor = resolve_actor(self.scm, inv.actor_id)
            .await
            .context("failed to resolve actor")?;
        let chat_user = resolve_chat_user(
            self.chat,
            self.sleeper,
            &actor,
            self.settings.match_by,
            self.settings.name_split,
        )
        .await
        .context("failed to look up Slack user")?;
        let chat_user_id = chat_user.map(|u| u.id);

        self.enter(State::Formatting);
        let attachments = build_attachments(&failed, &inv.repository, chat_user_id.as_deref());
        if let Some(path) = self.settings.github_output.as_deref() {
            if !attachments.is_empty() {
                output::append_attachments(path, &attachments).await?;
            }
        }

        self.enter(State::Delivering);
        let delivered = deliver(self.chat, self.sleeper, &inv.channel, &attachments)
            .await
            .context("failed to deliver Slack notification")?;

        Ok(Outcome {
            attachments,
            chat_user_id,
            delivered,
        })
    }
}

/// Process exit status for a finished run.
pub fn exit_code(res: &Result<Outcome>) -> i32 {
    match res {
        Ok(_) => 0,
        Err(_) => 1,
    }
}
