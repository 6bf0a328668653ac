//! Maps the GitHub actor behind a check suite to a Slack user.
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{info, instrument, warn};

use crate::error::ApiError;
use crate::github::SourceControl;
use crate::model::{Actor, ChatUser};
use crate::retry::{with_rate_limit_retry, Sleeper};
use crate::slack::ChatPlatform;

/// Which Slack profile field identifies the actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBy {
    /// First and last name derived from the GitHub display name.
    #[default]
    Name,
    /// The GitHub account's public email.
    Email,
}

impl FromStr for MatchBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(MatchBy::Name),
            "email" => Ok(MatchBy::Email),
            other => Err(format!("unknown match mode {other:?}, expected name or email")),
        }
    }
}

/// How a display name is cut into first and last name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameSplit {
    /// `"Mary Ann Lee"` -> (`"Mary"`, `"Ann Lee"`).
    #[default]
    FirstSpace,
    /// `"Mary Ann Lee"` -> (`"Mary Ann"`, `"Lee"`).
    LastSpace,
}

impl FromStr for NameSplit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first_space" => Ok(NameSplit::FirstSpace),
            "last_space" => Ok(NameSplit::LastSpace),
            other => Err(format!(
                "unknown name split {other:?}, expected first_space or last_space"
            )),
        }
    }
}

/// Split a display name into (first, last). Single-token names yield `None`.
pub fn split_display_name(name: &str, split: NameSplit) -> Option<(&str, &str)> {
    let name = name.trim();
    let (first, last) = match split {
        NameSplit::FirstSpace => name.split_once(' ')?,
        NameSplit::LastSpace => name.rsplit_once(' ')?,
    };
    let (first, last) = (first.trim(), last.trim());
    if first.is_empty() || last.is_empty() {
        return None;
    }
    Some((first, last))
}

pub fn find_by_name<'a>(users: &'a [ChatUser], first: &str, last: &str) -> Option<&'a ChatUser> {
    users
        .iter()
        .find(|u| u.profile.first_name == first && u.profile.last_name == last)
}

pub fn find_by_email<'a>(users: &'a [ChatUser], email: &str) -> Option<&'a ChatUser> {
    users.iter().find(|u| u.profile.email == email)
}

#[instrument(skip_all, fields(actor_id = actor_id))]
pub async fn resolve_actor(scm: &dyn SourceControl, actor_id: u64) -> Result<Actor, ApiError> {
    let actor = scm.get_actor(actor_id).await?;
    info!(login = %actor.login, has_name = actor.display_name.is_some(), "resolved actor");
    Ok(actor)
}

/// Find the Slack account for `actor`. An unmatched actor is `Ok(None)`.
#[instrument(skip_all, fields(actor = %actor.login))]
pub async fn resolve_chat_user(
    chat: &dyn ChatPlatform,
    sleeper: &dyn Sleeper,
    actor: &Actor,
    match_by: MatchBy,
    split: NameSplit,
) -> Result<Option<ChatUser>, ApiError> {
    let key = match match_by {
        MatchBy::Name => {
            let Some(display_name) = actor.display_name.as_deref() else {
                info!("actor has no display name; skipping Slack lookup");
                return Ok(None);
            };
            match split_display_name(display_name, split) {
                Some(parts) => LookupKey::Name(parts),
                None => {
                    warn!(display_name, "display name has no first/last split; skipping Slack lookup");
                    return Ok(None);
                }
            }
        }
        MatchBy::Email => match actor.email.as_deref().filter(|e| !e.trim().is_empty()) {
            Some(email) => LookupKey::Email(email),
            None => {
                info!("actor has no public email; skipping Slack lookup");
                return Ok(None);
            }
        },
    };

    let users = with_rate_limit_retry("slack users.list", sleeper, || chat.list_users()).await?;
    let found = match key {
        LookupKey::Name((first, last)) => find_by_name(&users, first, last),
        LookupKey::Email(email) => find_by_email(&users, email),
    };
    match found {
        Some(user) => info!(slack_user = %user.id, "matched Slack user"),
        None => warn!(directory_size = users.len(), "no Slack user matched actor"),
    }
    Ok(found.cloned())
}

enum LookupKey<'a> {
    Name((&'a str, &'a str)),
    Email(&'a str),
}
