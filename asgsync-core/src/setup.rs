//! Interactive completion of a partial config file.
//!
//! Every missing key is asked for and written to the file straight away,
//! so an interrupted session keeps the answers given so far.

use tracing::info;

use crate::cloud::{AutoscaleApi, ComputeApi, LoadBalancerApi};
use crate::config::{ConfigFile, Settings, AUTOSCALE, LAUNCH_CONFIGURATION, RAX_AUTOSCALER};
use crate::error::Result;
use crate::path_utils::{expand_tilde, is_readable};
use crate::prompt::{
    ask_choice, ask_file, ask_integer, ask_str, ask_yes_no, select, Console, Extra, Tone,
};

const CLOUD_INIT_HELP: &str = "When servers boot, the cloud-init script runs on them. \
This is how the software each server needs gets installed and configured.\n\
To use the default, input: templates/cloud-init.yml.j2";

const DEFAULT_NETWORKS_HELP: &str = "By default the launch configuration contains the \
default networks (PublicNet and ServiceNet). Some provider services do not work \
without them, and they are required on managed service levels.";

const PRIVATE_KEY_HELP: &str = "New servers log in to the admin server to download the \
playbook, or perform other tasks laid out in the cloud-init template.\n\
Supply a private key that can log in as the user 'autoscale' on the admin server.";

/// Prompts for every missing key, then re-parses and validates the file.
///
/// Each answer is written to the file as soon as it is given.
///
/// # Errors
///
/// Returns `Error::InputClosed` if input ends before the file is complete,
/// or any cloud lookup or validation error.
pub async fn complete_config<C>(
    config: &mut ConfigFile,
    cloud: &C,
    console: &mut dyn Console,
) -> Result<Settings>
where
    C: AutoscaleApi + LoadBalancerApi + ComputeApi + ?Sized,
{
    let sections = config.sections()?;
    if sections.autoscale.id.is_some() && sections.validate().is_ok() {
        console.show(
            Tone::Success,
            &format!(
                "Config defined in {} passes validation. Checking for missing optional keys..",
                config.path().display()
            ),
        );
    }

    complete_autoscale(config, cloud, console).await?;
    complete_launch(config, cloud, console).await?;
    complete_autoscaler(config, cloud, console).await?;

    config.reload()?;
    config.settings()
}

async fn complete_autoscale<C>(config: &mut ConfigFile, cloud: &C, console: &mut dyn Console) -> Result<()>
where
    C: AutoscaleApi + ?Sized,
{
    let section = config.sections()?.autoscale;

    if section.id.is_none() {
        let groups: Vec<(String, String)> = cloud
            .list_groups()
            .await?
            .into_iter()
            .map(|g| (g.state.name.unwrap_or_default(), g.id))
            .collect();
        if let Some(id) = select(console, "group", &groups, Some(Extra::CreateNew))? {
            config.set_option(AUTOSCALE, "id", id)?;
        }
    }

    if section.name.is_none() {
        let name = ask_str(console, "Name of autoscale group: ")?;
        config.set_option(AUTOSCALE, "name", name)?;
    }

    if section.scale_up.is_none() {
        let n = ask_integer(console, "Number of servers to scale up by when triggered: ", None)?;
        config.set_option(AUTOSCALE, "scale_up", n)?;
    }

    if section.scale_down.is_none() {
        let n = ask_integer(console, "Number of servers to scale down by when triggered: ", None)?;
        config.set_option(AUTOSCALE, "scale_down", n)?;
    }

    let max_entities = match section.max_entities {
        Some(max) => max,
        None => {
            let max = ask_integer(
                console,
                "Max number of servers to scale up to (max_entities): ",
                Some(0..=i64::MAX),
            )?;
            config.set_option(AUTOSCALE, "max_entities", max)?;
            max
        }
    };

    if section.min_entities.is_none() {
        let prompt = "Never scale down below this number of servers (min_entities): ";
        let mut min = ask_integer(console, prompt, Some(0..=i64::MAX))?;
        if min > max_entities {
            console.show(
                Tone::Failure,
                &format!(
                    "min_entities must be smaller than or equal to max_entities ({})",
                    max_entities
                ),
            );
            min = ask_integer(console, prompt, Some(0..=max_entities.max(0)))?;
        }
        config.set_option(AUTOSCALE, "min_entities", min)?;
    }

    if section.cooldown.is_none() {
        let cooldown = ask_integer(
            console,
            "Do not process scale events more frequently than this (cooldown, seconds): ",
            Some(0..=i64::MAX),
        )?;
        config.set_option(AUTOSCALE, "cooldown", cooldown)?;
    }

    Ok(())
}

async fn complete_launch<C>(config: &mut ConfigFile, cloud: &C, console: &mut dyn Console) -> Result<()>
where
    C: ComputeApi + ?Sized,
{
    let section = config.sections()?.launch;
    let s = LAUNCH_CONFIGURATION;

    if section.image.is_none() {
        let images: Vec<(String, String)> = cloud
            .list_images()
            .await?
            .into_iter()
            .map(|i| (i.name, i.id))
            .collect();
        if let Some(id) = select(console, "image", &images, None)? {
            config.set_option(s, "image", id)?;
        }
    }

    if section.flavor.is_none() {
        let flavors: Vec<(String, String)> = cloud
            .list_flavors()
            .await?
            .into_iter()
            .map(|f| (f.name, f.id))
            .collect();
        if let Some(id) = select(console, "flavor", &flavors, None)? {
            config.set_option(s, "flavor", id)?;
        }
    }

    if section.key_name.is_none() {
        let keys: Vec<(String, String)> = cloud
            .list_keypairs()
            .await?
            .into_iter()
            .map(|k| (k.name.clone(), k.name))
            .collect();
        let chosen = select(
            console,
            "ssh-key to add to /root/.ssh/authorized_keys on the servers",
            &keys,
            Some(Extra::CreateNew),
        )?;
        let key_name = match chosen {
            Some(name) => name,
            None => add_new_key(cloud, console).await?,
        };
        config.set_option(s, "key_name", key_name)?;
    }

    if section.name.is_none() {
        let name = ask_str(
            console,
            "Server name (note that an 11 character suffix will be added to this name): ",
        )?;
        config.set_option(s, "name", name)?;
    }

    if section.cloud_init.is_none() {
        console.show(Tone::Info, CLOUD_INIT_HELP);
        let path = ask_file(console, "Path to cloud-init script: ")?;
        config.set_option(s, "cloud_init", path)?;
    }

    if section.networks.is_none() {
        let available: Vec<(String, String)> = cloud
            .list_networks()
            .await?
            .into_iter()
            .map(|n| (n.name, n.id))
            .collect();
        console.show(
            Tone::Question,
            "Supply one or more networks you wish to attach the cloud servers to",
        );
        let mut networks: Vec<String> = Vec::new();
        while let Some(id) = select(console, "network", &available, Some(Extra::Done))? {
            if !networks.contains(&id) {
                networks.push(id);
            }
        }
        config.set_option(s, "networks", networks)?;
    }

    if section.skip_default_networks.is_none() {
        console.show(Tone::Info, DEFAULT_NETWORKS_HELP);
        let keep = ask_yes_no(console, "Keep default networks? (y/n): ")?;
        config.set_option(s, "skip_default_networks", !keep)?;
    }

    if section.disk_config.is_none() {
        let disk = ask_choice(
            console,
            "Disk config method (AUTO or MANUAL): ",
            &["AUTO", "MANUAL"],
        )?;
        config.set_option(s, "disk_config", disk)?;
    }

    Ok(())
}

/// Uploads a new public key, asking again on unreadable files and taken names.
async fn add_new_key<C>(cloud: &C, console: &mut dyn Console) -> Result<String>
where
    C: ComputeApi + ?Sized,
{
    loop {
        let path = ask_str(console, "Path to public key file: ")?;
        let name = ask_str(console, "Keypair name: ")?;

        let public_key = match std::fs::read_to_string(expand_tilde(&path)) {
            Ok(key) => key,
            Err(e) => {
                console.show(
                    Tone::Failure,
                    &format!("Unable to read file: {}  Please try again...", e),
                );
                continue;
            }
        };

        match cloud.create_keypair(&name, public_key.trim()).await {
            Ok(key) => {
                info!(name = %key.name, "uploaded keypair");
                return Ok(key.name);
            }
            Err(e) if e.is_conflict() => {
                console.show(Tone::Failure, "A key with that name already exists");
            }
            Err(e) => return Err(e),
        }
    }
}

async fn complete_autoscaler<C>(config: &mut ConfigFile, cloud: &C, console: &mut dyn Console) -> Result<()>
where
    C: LoadBalancerApi + ?Sized,
{
    let section = config.sections()?.autoscaler;
    let s = RAX_AUTOSCALER;

    if section.load_balancers.is_none() {
        let available: Vec<(String, String)> = cloud
            .list_load_balancers()
            .await?
            .into_iter()
            .map(|lb| (lb.name, lb.id.to_string()))
            .collect();
        console.show(
            Tone::Question,
            "Supply one or more load balancers you wish to attach the cloud servers to",
        );
        let mut chosen: Vec<i64> = Vec::new();
        while let Some(id) = select(console, "load balancer", &available, Some(Extra::Done))? {
            if let Ok(id) = id.parse::<i64>() {
                if !chosen.contains(&id) {
                    chosen.push(id);
                }
            }
        }
        config.set_option(s, "load_balancers", chosen)?;
    }

    let has_cloud_init = config
        .get(LAUNCH_CONFIGURATION, "cloud_init")
        .and_then(|v| v.as_str())
        .is_some_and(|v| !v.trim().is_empty());
    if !has_cloud_init {
        return Ok(());
    }

    let key_ok = section
        .private_key
        .as_deref()
        .is_some_and(|p| is_readable(&expand_tilde(p)));
    if !key_ok {
        console.show(Tone::Info, PRIVATE_KEY_HELP);
        let path = ask_file(console, "Private key to inject into /root/.ssh/id_rsa on servers: ")?;
        config.set_option(s, "private_key", path)?;
    }

    if section.admin_server.is_none() {
        let admin = ask_str(console, "IP or host-name of admin server to download playbook from: ")?;
        config.set_option(s, "admin_server", admin)?;
    }

    Ok(())
}
