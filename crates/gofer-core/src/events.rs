//! The closed set of webhook event names an extension can subscribe to.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_events {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Webhook event kinds recognised by the registry and the payload parsers.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum WebhookEvent {
            $(
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl WebhookEvent {
            /// Every recognised event, in declaration order.
            pub const ALL: &'static [WebhookEvent] = &[$(WebhookEvent::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(WebhookEvent::$variant => $name,)+
                }
            }
        }

        impl std::str::FromStr for WebhookEvent {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($name => Ok(WebhookEvent::$variant),)+
                    other => Err(Error::UnknownEvent(other.to_string())),
                }
            }
        }
    };
}

define_events! {
    BranchProtectionRule => "branch_protection_rule",
    CheckRun => "check_run",
    CheckSuite => "check_suite",
    Create => "create",
    Delete => "delete",
    Deployment => "deployment",
    DeploymentStatus => "deployment_status",
    Discussion => "discussion",
    DiscussionComment => "discussion_comment",
    Fork => "fork",
    Gollum => "gollum",
    IssueComment => "issue_comment",
    Issues => "issues",
    Label => "label",
    MergeGroup => "merge_group",
    Milestone => "milestone",
    PageBuild => "page_build",
    Project => "project",
    ProjectCard => "project_card",
    ProjectColumn => "project_column",
    Public => "public",
    PullRequest => "pull_request",
    PullRequestWithCheck => "pull_request_with_check",
    PullRequestComment => "pull_request_comment",
    PullRequestReview => "pull_request_review",
    PullRequestReviewComment => "pull_request_review_comment",
    PullRequestTarget => "pull_request_target",
    Push => "push",
    RegistryPackage => "registry_package",
    Release => "release",
    RepositoryDispatch => "repository_dispatch",
    Schedule => "schedule",
    Status => "status",
    Watch => "watch",
    WorkflowCall => "workflow_call",
    WorkflowDispatch => "workflow_dispatch",
    WorkflowRun => "workflow_run",
}

impl WebhookEvent {
    /// Subscriptions stored under this event owe a check report after the run finishes.
    pub fn reports_back(&self) -> bool {
        matches!(self, WebhookEvent::PullRequestWithCheck)
    }

    /// Registry keys an incoming event of this kind is matched against.
    ///
    /// `pull_request` also matches subscriptions stored under
    /// `pull_request_with_check`; the reverse does not hold.
    pub fn lookup_keys(&self) -> Vec<WebhookEvent> {
        match self {
            WebhookEvent::PullRequest => vec![
                WebhookEvent::PullRequest,
                WebhookEvent::PullRequestWithCheck,
            ],
            other => vec![*other],
        }
    }
}

impl fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
