//! Exercises the extension hook runtime wired into `BumpOperation`: a script
//! subscribed to pre-bump and post-bump records each invocation's raw JSON
//! payload, and the test asserts both fired, in order, with the right
//! version values.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use sley_core::cancel::CancellationToken;
use sley_core::config::{Config, ExtensionConfig};
use sley_core::discovery::Module;
use sley_core::executor::{Executor, ExecutorConfig, ExecutorHooks};
use sley_core::extensions::resolve_extensions;
use sley_core::fs::{Filesystem, RealFilesystem};
use sley_core::operations::{BumpKind, BumpOperation};

#[test]
fn bump_operation_invokes_pre_and_post_bump_hooks_in_order() {
    let root = std::env::temp_dir().join("sley-hook-wiring-test");
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&root).unwrap();

    let module_dir = root.join("crate-a");
    fs::create_dir_all(&module_dir).unwrap();
    let version_path = module_dir.join(".version");
    fs::write(&version_path, "1.2.3\n").unwrap();

    let ext_dir = root.join("extensions").join("recorder");
    fs::create_dir_all(&ext_dir).unwrap();
    let evidence = ext_dir.join("evidence.log");

    fs::write(
        ext_dir.join("extension.yaml"),
        "name: recorder\n\
         version: \"1.0.0\"\n\
         description: records hook invocations\n\
         author: test\n\
         repository: https://example.invalid/recorder\n\
         entry: record.sh\n\
         hooks:\n  - pre-bump\n  - post-bump\n",
    )
    .unwrap();

    let script = ext_dir.join("record.sh");
    fs::write(&script, format!("#!/bin/sh\ncat >> '{}'\necho '{{\"success\":true}}'\n", evidence.display()))
        .unwrap();
    let mut perms = fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&script, perms).unwrap();

    let real_fs = RealFilesystem::new();
    let cancel = CancellationToken::new();
    let config = Config {
        extensions: vec![ExtensionConfig {
            name: "recorder".to_string(),
            path: PathBuf::from("extensions/recorder"),
            enabled: true,
        }],
        ..Default::default()
    };
    let extensions = resolve_extensions(&root, &config, &real_fs, &cancel).unwrap();
    assert_eq!(extensions.len(), 1);

    let hooks = ExecutorHooks::new(root.clone(), extensions);
    let executor = Executor::with_hooks(&real_fs, ExecutorConfig::default(), &hooks);

    let module = Module {
        name: "crate-a".to_string(),
        path: version_path.clone(),
        rel_path: PathBuf::from("crate-a"),
        dir: module_dir.clone(),
        current_version: "1.2.3".to_string(),
    };

    let outcome = executor.run(vec![module], &BumpOperation::new(BumpKind::Patch), &cancel);
    assert!(!outcome.is_err(), "run failed: {:?}", outcome.results()[0].error);
    assert_eq!(real_fs.read_file(&version_path, &cancel).unwrap(), "1.2.4\n");

    let recorded = fs::read_to_string(&evidence).unwrap();
    let lines: Vec<&str> = recorded.lines().collect();
    assert_eq!(lines.len(), 2, "expected exactly two hook invocations, got: {:?}", lines);
    assert!(lines[0].contains("\"hook\":\"pre-bump\""), "{}", lines[0]);
    assert!(lines[0].contains("\"version\":\"1.2.4\""), "{}", lines[0]);
    assert!(lines[0].contains("\"previous_version\":\"1.2.3\""), "{}", lines[0]);
    assert!(lines[1].contains("\"hook\":\"post-bump\""), "{}", lines[1]);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn disabled_extension_is_not_invoked() {
    let root = std::env::temp_dir().join("sley-hook-disabled-test");
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&root).unwrap();

    let real_fs = RealFilesystem::new();
    let cancel = CancellationToken::new();
    let config = Config {
        extensions: vec![ExtensionConfig {
            name: "recorder".to_string(),
            path: PathBuf::from("extensions/recorder"),
            enabled: false,
        }],
        ..Default::default()
    };
    let extensions = resolve_extensions(&root, &config, &real_fs, &cancel).unwrap();
    assert!(extensions.is_empty());

    let _ = fs::remove_dir_all(&root);
}
