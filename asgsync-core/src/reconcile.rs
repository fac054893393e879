//! Creates or updates the scaling group so it matches the desired state.
//!
//! Work is split in two steps so the caller can show the differences and
//! ask before anything changes: [`Reconciler::plan`] only reads, and
//! [`Reconciler::apply`] performs the mutations.

use tracing::{debug, info};

use crate::cloud::types::{Policy, PolicySpec, ScalingGroup, Webhook};
use crate::cloud::AutoscaleApi;
use crate::config::{ConfigFile, AUTOSCALE, RAX_AUTOSCALER};
use crate::desired::{DesiredGroup, SCALE_DOWN_WEBHOOK, SCALE_UP_WEBHOOK};
use crate::diff::{diff_group, find_policy, Difference, GroupDiff, PolicyDiff};
use crate::error::{Error, Result};

/// What `apply` is going to do.
#[derive(Debug, Clone)]
pub enum Plan {
    /// No group id is configured, so a new group is created.
    Create,
    Update {
        live: Box<ScalingGroup>,
        policies: Vec<Policy>,
        diff: GroupDiff,
    },
}

impl Plan {
    pub fn differences(&self) -> Vec<Difference> {
        match self {
            Plan::Create => Vec::new(),
            Plan::Update { diff, .. } => diff.differences(),
        }
    }

    /// True when `apply` would change something remotely.
    pub fn has_changes(&self) -> bool {
        match self {
            Plan::Create => true,
            Plan::Update { diff, .. } => !diff.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Created,
    Updated,
    Unchanged,
    /// Differences were found but the user chose not to apply them.
    Declined,
}

/// Identifiers to persist once the group has been reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub action: Action,
    pub group_id: String,
    pub scale_up_policy: Option<String>,
    pub scale_down_policy: Option<String>,
    pub scale_up_webhook: Option<String>,
    pub scale_down_webhook: Option<String>,
}

pub struct Reconciler<'a, A: AutoscaleApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: AutoscaleApi + ?Sized> Reconciler<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Reads the live group and works out what needs to change.
    ///
    /// # Errors
    ///
    /// A configured group id that does not exist surfaces as an API error
    /// with `is_not_found()`, so the caller can offer to create the group.
    pub async fn plan(&self, desired: &DesiredGroup) -> Result<Plan> {
        let Some(group_id) = &desired.id else {
            return Ok(Plan::Create);
        };

        let live = self.api.get_group(group_id).await?;
        let policies = self.api.list_policies(group_id).await?;
        let diff = diff_group(&live, &policies, desired);
        debug!(group_id, changes = diff.differences().len(), "planned");

        Ok(Plan::Update {
            live: Box::new(live),
            policies,
            diff,
        })
    }

    /// Carries out `plan`. With `approved` false nothing is changed and only
    /// existing policy ids and webhook URLs are collected.
    ///
    /// # Errors
    ///
    /// Returns the first API error. Changes made before it are not rolled back;
    /// running again picks up from the live state.
    pub async fn apply(&self, desired: &DesiredGroup, plan: Plan, approved: bool) -> Result<Outcome> {
        match plan {
            Plan::Create => self.create(desired).await,
            Plan::Update {
                live,
                policies,
                diff,
            } => self.update(desired, *live, policies, diff, approved).await,
        }
    }

    async fn create(&self, desired: &DesiredGroup) -> Result<Outcome> {
        let policies = [desired.scale_up.clone(), desired.scale_down.clone()];
        let group = self
            .api
            .create_group(&desired.config, &desired.launch, &policies)
            .await?;
        info!(group_id = %group.id, name = %desired.config.name, "created scaling group");

        let mut known = group.scaling_policies.clone();
        if known.is_empty() {
            known = self.api.list_policies(&group.id).await?;
        }

        let up = self.policy_id(&group.id, &known, &desired.scale_up).await?;
        let down = self.policy_id(&group.id, &known, &desired.scale_down).await?;
        self.outcome(Action::Created, group.id, Some(up), Some(down)).await
    }

    async fn update(
        &self,
        desired: &DesiredGroup,
        live: ScalingGroup,
        policies: Vec<Policy>,
        diff: GroupDiff,
        approved: bool,
    ) -> Result<Outcome> {
        let group_id = live.id.clone();

        if diff.is_empty() || !approved {
            let action = if diff.is_empty() {
                Action::Unchanged
            } else {
                Action::Declined
            };
            let up = find_policy(&policies, &desired.scale_up.name).map(|p| p.id.clone());
            let down = find_policy(&policies, &desired.scale_down.name).map(|p| p.id.clone());
            return self.outcome(action, group_id, up, down).await;
        }

        if !diff.scaling_group.is_empty() {
            let mut config = desired.config.clone();
            config.metadata = live.group_configuration.metadata.clone();
            self.api.update_group_config(&group_id, &config).await?;
            info!(group_id = %group_id, "updated group configuration");
        }

        if !diff.launch_config.is_empty() {
            self.api
                .update_launch_config(&group_id, &desired.launch)
                .await?;
            info!(group_id = %group_id, "updated launch configuration");
        }

        let up = self
            .reconcile_policy(&group_id, &policies, &desired.scale_up, &diff.scale_up_policy)
            .await?;
        let down = self
            .reconcile_policy(
                &group_id,
                &policies,
                &desired.scale_down,
                &diff.scale_down_policy,
            )
            .await?;

        self.outcome(Action::Updated, group_id, Some(up), Some(down)).await
    }

    async fn reconcile_policy(
        &self,
        group_id: &str,
        policies: &[Policy],
        spec: &PolicySpec,
        diff: &Option<PolicyDiff>,
    ) -> Result<String> {
        match (diff, find_policy(policies, &spec.name)) {
            (Some(PolicyDiff::Changed(_)), Some(live)) => {
                self.api.update_policy(group_id, &live.id, spec).await?;
                info!(group_id, policy = %spec.name, "updated policy");
                Ok(live.id.clone())
            }
            (None, Some(live)) => Ok(live.id.clone()),
            _ => self.policy_id(group_id, policies, spec).await,
        }
    }

    /// Id of the named policy, creating the policy if it does not exist.
    async fn policy_id(&self, group_id: &str, policies: &[Policy], spec: &PolicySpec) -> Result<String> {
        if let Some(policy) = find_policy(policies, &spec.name) {
            return Ok(policy.id.clone());
        }
        let policy = self.api.create_policy(group_id, spec).await?;
        info!(group_id, policy = %spec.name, policy_id = %policy.id, "created policy");
        Ok(policy.id)
    }

    async fn outcome(
        &self,
        action: Action,
        group_id: String,
        scale_up_policy: Option<String>,
        scale_down_policy: Option<String>,
    ) -> Result<Outcome> {
        let create = action != Action::Declined;

        let scale_up_webhook = match &scale_up_policy {
            Some(id) => self.webhook_url(&group_id, id, SCALE_UP_WEBHOOK, create).await?,
            None => None,
        };
        let scale_down_webhook = match &scale_down_policy {
            Some(id) => self.webhook_url(&group_id, id, SCALE_DOWN_WEBHOOK, create).await?,
            None => None,
        };

        Ok(Outcome {
            action,
            group_id,
            scale_up_policy,
            scale_down_policy,
            scale_up_webhook,
            scale_down_webhook,
        })
    }

    /// Capability URL of the policy's webhook.
    ///
    /// Prefers a webhook named `name`, falls back to the first one, and
    /// creates `name` when the policy has none and `create` is set.
    pub async fn webhook_url(
        &self,
        group_id: &str,
        policy_id: &str,
        name: &str,
        create: bool,
    ) -> Result<Option<String>> {
        let hooks = self.api.list_webhooks(group_id, policy_id).await?;
        let existing = hooks
            .iter()
            .find(|hook| hook.name == name)
            .or_else(|| hooks.first())
            .cloned();

        let hook = match existing {
            Some(hook) => hook,
            None if create => {
                let hook = self.api.create_webhook(group_id, policy_id, name).await?;
                info!(group_id, policy_id, webhook = name, "created webhook");
                hook
            }
            None => return Ok(None),
        };

        self.capability_url(group_id, policy_id, hook).await.map(Some)
    }

    async fn capability_url(&self, group_id: &str, policy_id: &str, hook: Webhook) -> Result<String> {
        if let Some(url) = hook.capability_url() {
            return Ok(url.to_string());
        }
        let full = self.api.get_webhook(group_id, policy_id, &hook.id).await?;
        full.capability_url()
            .map(str::to_string)
            .ok_or(Error::MissingCapability(hook.id))
    }
}

/// Persists the outcome: group id plus policy ids and webhook URLs.
pub fn write_back(config: &mut ConfigFile, outcome: &Outcome) -> Result<()> {
    let fields = [
        ("scale_up_webhook", &outcome.scale_up_webhook),
        ("scale_down_webhook", &outcome.scale_down_webhook),
        ("scale_up_policy", &outcome.scale_up_policy),
        ("scale_down_policy", &outcome.scale_down_policy),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            config.set_option(RAX_AUTOSCALER, key, value.as_str())?;
        }
    }
    config.set_option(AUTOSCALE, "id", outcome.group_id.as_str())
}
