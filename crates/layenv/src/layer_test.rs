// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

const WORKSPACE_YAML: &str = r#"
api: layenv/v0
name: dev
environment:
  Update: true
  Packages: [git, curl]
layers:
  - name: base
    digest: snap-base
    commands:
      - name: update
        envs: ["DEBIAN_FRONTEND=noninteractive"]
        args: ["{{if .Environment.Update}}", "apt-get", "update", "{{end}}"]
  - name: tools
    commands:
      - name: install
        args: [apt-get, install, -y, git]
"#;

#[rstest]
fn test_parse_minimal_workspace() {
    let yaml = r#"
api: layenv/v0
name: empty
"#;
    let workspace = Workspace::from_yaml(yaml).expect("Should parse minimal workspace");
    assert_eq!(workspace.api, ApiVersion::V0);
    assert_eq!(workspace.name, "empty");
    assert!(workspace.layers.is_empty());
    assert_eq!(workspace.environment, Value::new_struct());
}

#[rstest]
fn test_parse_full_workspace() {
    let workspace = Workspace::from_yaml(WORKSPACE_YAML).expect("Should parse workspace");

    assert_eq!(workspace.layers.len(), 2);
    assert_eq!(workspace.digests(), vec!["snap-base", ""]);
    assert_eq!(workspace.environment.field("Update"), Some(&Value::Bool(true)));

    let update = &workspace.layers[0].commands[0];
    assert_eq!(update.name, "update");
    assert_eq!(update.envs, vec!["DEBIAN_FRONTEND=noninteractive"]);
    assert_eq!(update.args[0], "{{if .Environment.Update}}");
}

#[rstest]
#[case::bad_api("api: layenv/v9\nname: x\n")]
#[case::not_yaml("api: [unclosed")]
#[case::missing_name("api: layenv/v0\n")]
fn test_parse_invalid(#[case] yaml: &str) {
    let err = Workspace::from_yaml(yaml).expect_err("should not parse");
    assert!(matches!(err, crate::Error::InvalidYaml { .. }), "{err:?}");
}

#[rstest]
fn test_duplicate_layer_names_rejected() {
    let yaml = r#"
api: layenv/v0
name: dev
layers:
  - name: base
  - name: base
"#;
    let err = Workspace::from_yaml(yaml).unwrap_err();
    assert!(matches!(err, crate::Error::ValidationFailed(_)), "{err:?}");
}

#[rstest]
fn test_save_and_load_keeps_digests() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("layenv.yaml");

    let mut workspace = Workspace::from_yaml(WORKSPACE_YAML).unwrap();
    workspace.layers[1].digest = "snap-tools".to_string();
    workspace.save(&path).unwrap();

    let loaded = Workspace::load(&path).unwrap();
    assert_eq!(loaded.digests(), vec!["snap-base", "snap-tools"]);
    assert_eq!(loaded.layers, workspace.layers);
    assert_eq!(loaded.source_path, Some(path));
}

#[rstest]
fn test_load_missing_file() {
    let tmp = TempDir::new().unwrap();
    let err = Workspace::load(tmp.path().join("missing.yaml")).unwrap_err();
    assert!(matches!(err, crate::Error::ReadFailed { .. }), "{err:?}");
}

#[rstest]
fn test_invalidate_from_clears_later_layers() {
    let mut workspace = Workspace::new("dev")
        .with_layer(Layer::new("a").with_digest("1"))
        .with_layer(Layer::new("b").with_digest("2"))
        .with_layer(Layer::new("c").with_digest("3"));

    workspace.invalidate_from(1);
    assert_eq!(workspace.digests(), vec!["1", "", ""]);
    assert_eq!(workspace.layer_index("c"), Some(2));
    assert_eq!(workspace.layer_index("d"), None);
}

#[rstest]
fn test_env_pairs() {
    let command = Command::new("build", ["make"])
        .with_env("CC", "clang")
        .with_env("FLAGS", "-O2 -DX=1");
    assert_eq!(
        command.env_pairs().unwrap(),
        vec![("CC", "clang"), ("FLAGS", "-O2 -DX=1")]
    );

    let broken = Command {
        envs: vec!["NOVALUE".to_string()],
        ..command
    };
    let err = broken.env_pairs().unwrap_err();
    assert!(matches!(err, crate::Error::Internal(_)), "{err:?}");
}
