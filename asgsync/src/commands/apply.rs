//! Creating or reconciling the scaling group described by a config file.

use std::path::PathBuf;

use anyhow::Result;
use asgsync_core::prompt::ask_yes_no;
use asgsync_core::reconcile::write_back;
use asgsync_core::{
    complete_config, Action, ConfigFile, Credentials, Plan, RackspaceClient, Reconciler,
};

use crate::console::StdinConsole;
use crate::formatting::{
    print_differences, print_section_header, print_success, print_summary_box, print_warning,
    SectionStyle,
};

pub async fn cmd_apply(config_file: PathBuf, no_create_config: bool, assume_yes: bool) -> Result<()> {
    // Credentials are needed before the rest of the file can be completed.
    let mut config = ConfigFile::load(&config_file)?;
    let credentials = Credentials::from_config(&config)?;
    let client = RackspaceClient::connect(&credentials).await?;
    let mut console = StdinConsole;

    let settings = if no_create_config {
        config.settings()?
    } else {
        complete_config(&mut config, &client, &mut console).await?
    };
    let mut desired = asgsync_core::desired::resolve(&settings)?;

    let reconciler = Reconciler::new(&client);
    let plan = loop {
        match reconciler.plan(&desired).await {
            Ok(plan) => break plan,
            Err(e) if e.is_not_found() => {
                let question = format!(
                    "You specified a scaling group with ID {}, which does not appear to exist \
                     on this account. Would you like to create it? (y/n): ",
                    desired.id.as_deref().unwrap_or_default()
                );
                if !assume_yes && !ask_yes_no(&mut console, &question)? {
                    return Ok(());
                }
                desired.id = None;
            }
            Err(e) => return Err(e.into()),
        }
    };

    print_section_header("Scaling group", Some(&desired.config.name), SectionStyle::Primary);
    let approved = match &plan {
        Plan::Create => true,
        plan if !plan.has_changes() => false,
        plan => {
            print_differences(&plan.differences());
            println!();
            assume_yes
                || ask_yes_no(
                    &mut console,
                    "Do you want to update the running config to match the config file? (y/n): ",
                )?
        }
    };

    let outcome = reconciler.apply(&desired, plan, approved).await?;
    write_back(&mut config, &outcome)?;

    match outcome.action {
        Action::Created => print_success("Created scaling group"),
        Action::Updated => print_success("Updated scaling group"),
        Action::Unchanged => print_success("Scaling group matches the config file"),
        Action::Declined => print_warning("Left the running config unchanged"),
    }
    println!();

    let none = "(none)";
    print_summary_box(
        "Written to config",
        &[
            ("Group", outcome.group_id.as_str()),
            ("Scale up policy", outcome.scale_up_policy.as_deref().unwrap_or(none)),
            ("Scale down policy", outcome.scale_down_policy.as_deref().unwrap_or(none)),
            ("Scale up webhook", outcome.scale_up_webhook.as_deref().unwrap_or(none)),
            ("Scale down webhook", outcome.scale_down_webhook.as_deref().unwrap_or(none)),
        ],
    );

    Ok(())
}
