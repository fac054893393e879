//! Turns validated settings into the exact remote shape the group should have.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::cloud::types::{
    GroupConfiguration, LaunchArgs, LaunchConfiguration, NetworkRef, PolicySpec, ServerTemplate,
};
use crate::config::{AutoscalerSpec, LaunchSpec, Settings};
use crate::error::{Error, Result};
use crate::template;

/// ServiceNet, the provider's internal network.
pub const SERVICENET: &str = "11111111-1111-1111-1111-111111111111";
/// PublicNet, the internet-facing network.
pub const PUBLICNET: &str = "00000000-0000-0000-0000-000000000000";

pub const SCALE_UP_POLICY: &str = "scale_up";
pub const SCALE_DOWN_POLICY: &str = "scale_down";
pub const SCALE_UP_WEBHOOK: &str = "scale_up_webhook";
pub const SCALE_DOWN_WEBHOOK: &str = "scale_down_webhook";

/// The desired remote state of the scaling group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredGroup {
    pub id: Option<String>,
    pub config: GroupConfiguration,
    pub launch: LaunchConfiguration,
    pub scale_up: PolicySpec,
    pub scale_down: PolicySpec,
}

/// Networks to attach: the default networks unless skipped, then the chosen ones.
pub fn network_refs(launch: &LaunchSpec) -> Vec<NetworkRef> {
    let defaults = if launch.skip_default_networks {
        Vec::new()
    } else {
        vec![SERVICENET, PUBLICNET]
    };

    defaults
        .into_iter()
        .chain(launch.networks.iter().map(String::as_str))
        .map(|uuid| NetworkRef {
            uuid: uuid.to_string(),
        })
        .collect()
}

/// Scaling down always removes servers, whatever sign the file uses.
pub fn scale_down_change(scale_down: i32) -> i32 {
    if scale_down > 0 {
        -scale_down
    } else {
        scale_down
    }
}

/// Renders the cloud-init template, if one is configured.
///
/// The template sees `private_key` (the base64 encoded private key file)
/// and `admin_server`.
pub fn render_user_data(launch: &LaunchSpec, autoscaler: &AutoscalerSpec) -> Result<Option<String>> {
    let Some(path) = &launch.cloud_init else {
        return Ok(None);
    };

    let template = std::fs::read_to_string(path).map_err(|e| {
        Error::Template(format!(
            "unable to read cloud-init template {}: {}",
            path.display(),
            e
        ))
    })?;

    let mut vars = HashMap::new();
    if let Some(key_path) = &autoscaler.private_key {
        let key = std::fs::read(key_path).map_err(|e| {
            Error::Template(format!(
                "unable to read private key {}: {}",
                key_path.display(),
                e
            ))
        })?;
        vars.insert("private_key", STANDARD.encode(key));
    }
    if let Some(admin_server) = &autoscaler.admin_server {
        vars.insert("admin_server", admin_server.clone());
    }

    Ok(Some(template::render(&template, &vars)))
}

/// Resolves settings into the desired remote state.
///
/// # Errors
///
/// Returns `Error::Template` if the cloud-init template or private key
/// cannot be read.
pub fn resolve(settings: &Settings) -> Result<DesiredGroup> {
    let group = &settings.group;
    let launch = &settings.launch;

    let user_data = render_user_data(launch, &settings.autoscaler)?.map(|data| STANDARD.encode(data));

    let server = ServerTemplate {
        name: launch.server_name.clone(),
        image_ref: launch.image.clone(),
        flavor_ref: launch.flavor.clone(),
        disk_config: Some(launch.disk_config.as_str().to_string()),
        metadata: launch.metadata.clone(),
        networks: network_refs(launch),
        key_name: Some(launch.key_name.clone()),
        user_data,
        config_drive: Some(launch.config_drive),
    };

    Ok(DesiredGroup {
        id: group.id.clone(),
        config: GroupConfiguration {
            name: group.name.clone(),
            cooldown: group.cooldown,
            min_entities: group.min_entities,
            max_entities: group.max_entities,
            metadata: Default::default(),
        },
        launch: LaunchConfiguration {
            kind: launch.kind.clone(),
            args: LaunchArgs {
                server,
                load_balancers: launch.load_balancers.clone(),
            },
        },
        scale_up: PolicySpec::webhook(SCALE_UP_POLICY, group.scale_up, group.cooldown),
        scale_down: PolicySpec::webhook(
            SCALE_DOWN_POLICY,
            scale_down_change(group.scale_down),
            group.cooldown,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiskConfig;
    use std::collections::BTreeMap;

    fn launch_spec() -> LaunchSpec {
        LaunchSpec {
            server_name: "web".to_string(),
            image: "img".to_string(),
            flavor: "general1-1".to_string(),
            disk_config: DiskConfig::Auto,
            metadata: BTreeMap::new(),
            key_name: "deploy".to_string(),
            networks: vec!["net-a".to_string()],
            skip_default_networks: false,
            cloud_init: None,
            config_drive: true,
            kind: "launch_server".to_string(),
            load_balancers: Vec::new(),
        }
    }

    #[test]
    fn test_network_refs_defaults_first() {
        let uuids: Vec<String> = network_refs(&launch_spec())
            .into_iter()
            .map(|n| n.uuid)
            .collect();
        assert_eq!(uuids, vec![SERVICENET, PUBLICNET, "net-a"]);
    }

    #[test]
    fn test_network_refs_skip_defaults() {
        let mut spec = launch_spec();
        spec.skip_default_networks = true;
        let uuids: Vec<String> = network_refs(&spec).into_iter().map(|n| n.uuid).collect();
        assert_eq!(uuids, vec!["net-a"]);
    }

    #[test]
    fn test_scale_down_is_negative() {
        assert_eq!(scale_down_change(2), -2);
        assert_eq!(scale_down_change(-3), -3);
        assert_eq!(scale_down_change(0), 0);
    }

    #[test]
    fn test_render_user_data() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("cloud-init.yml");
        std::fs::write(&template, "key: {{ private_key }}\nadmin: {{ admin_server }}\n").unwrap();
        let key = dir.path().join("id_rsa");
        std::fs::write(&key, "line one\nline two\n").unwrap();

        let mut spec = launch_spec();
        spec.cloud_init = Some(template);
        let autoscaler = AutoscalerSpec {
            private_key: Some(key),
            admin_server: Some("admin.example.com".to_string()),
            ..Default::default()
        };

        let rendered = render_user_data(&spec, &autoscaler).unwrap().unwrap();
        let encoded = STANDARD.encode("line one\nline two\n");
        assert_eq!(rendered, format!("key: {}\nadmin: admin.example.com\n", encoded));
        assert!(!encoded.contains('\n'));
    }
}
