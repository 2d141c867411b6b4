// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

const WORKSPACE: &str = "\
# keep me
api: layenv/v0
name: dev
layers:
  - name: base
    commands:
      - name: hello
        args: [echo, hello]
";

#[rstest]
fn test_save_digests_only_when_changed() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join(layenv::LAYENV_FILENAME);
    std::fs::write(&file, WORKSPACE).unwrap();

    let mut workspace = layenv::Workspace::load(&file).unwrap();
    let recorded: Vec<String> = workspace.digests().into_iter().map(String::from).collect();

    assert!(!save_digests(&workspace, &recorded, &file).unwrap());
    assert_eq!(std::fs::read_to_string(&file).unwrap(), WORKSPACE);

    workspace.layers[0].digest = "snap-1".to_string();
    assert!(save_digests(&workspace, &recorded, &file).unwrap());
    let saved = layenv::Workspace::load(&file).unwrap();
    assert_eq!(saved.digests(), vec!["snap-1"]);
}
