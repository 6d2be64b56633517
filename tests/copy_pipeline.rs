//! End-to-end copies through the public API

use copyspec::config::{CopyConfig, FilterSpec};
use copyspec::copy::{CopyDetail, CopySpec, DuplicatesStrategy, Platform};
use copyspec::core::CopyEngine;
use copyspec::error::CopySpecError;
use copyspec::fs::{ScanConfig, Scanner};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn config(sources: &[&Path], destination: &Path) -> CopyConfig {
    CopyConfig {
        sources: sources.iter().map(|s| s.to_path_buf()).collect(),
        destination: destination.to_path_buf(),
        threads: 2,
        ..Default::default()
    }
}

#[test]
fn test_filters_then_expansion() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(src.path(), "conf/app.properties", "# generated\nversion=@version@\nhome=${home}\n");

    let mut config = config(&[src.path()], dst.path());
    config.filters = vec![
        "strip-line-comments={\"prefixes\":[\"#\"]}".parse::<FilterSpec>().unwrap(),
        "replace-tokens={\"tokens\":{\"version\":\"2.1\"}}".parse::<FilterSpec>().unwrap(),
    ];
    config.expand = BTreeMap::from([("home".to_string(), "/opt/app".to_string())]);

    let result = CopyEngine::new(config).unwrap().execute().unwrap();

    assert_eq!(result.files_copied, 1);
    assert_eq!(
        fs::read_to_string(dst.path().join("conf/app.properties")).unwrap(),
        "version=2.1\nhome=/opt/app\n"
    );
    assert_eq!(result.bytes_copied, "version=2.1\nhome=/opt/app\n".len() as u64);
}

#[test]
fn test_into_prefix() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(src.path(), "bin/run.sh", "echo hi\n");

    let mut config = config(&[src.path()], dst.path());
    config.into = Some("opt/tool".to_string());

    let result = CopyEngine::new(config).unwrap().execute().unwrap();

    assert_eq!(result.files_copied, 1);
    assert!(dst.path().join("opt/tool/bin/run.sh").exists());
    assert!(!dst.path().join("bin").exists());
}

#[cfg(unix)]
#[test]
fn test_file_mode_applied() {
    use std::os::unix::fs::PermissionsExt;

    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(src.path(), "secret.txt", "s3cr3t\n");
    fs::set_permissions(src.path().join("secret.txt"), fs::Permissions::from_mode(0o644)).unwrap();

    let mut config = config(&[src.path()], dst.path());
    config.file_mode = Some(0o600);

    CopyEngine::new(config).unwrap().execute().unwrap();

    let mode = fs::metadata(dst.path().join("secret.txt")).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[cfg(unix)]
#[test]
fn test_source_mode_preserved() {
    use std::os::unix::fs::PermissionsExt;

    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(src.path(), "run.sh", "#!/bin/sh\n");
    fs::set_permissions(src.path().join("run.sh"), fs::Permissions::from_mode(0o750)).unwrap();

    CopyEngine::new(config(&[src.path()], dst.path())).unwrap().execute().unwrap();

    let mode = fs::metadata(dst.path().join("run.sh")).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o750);
}

fn two_sources() -> (TempDir, TempDir) {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write(first.path(), "lib/shared.txt", "first\n");
    write(first.path(), "lib/only-first.txt", "a\n");
    write(second.path(), "lib/shared.txt", "second\n");
    (first, second)
}

#[test]
fn test_duplicates_need_a_strategy() {
    let (first, second) = two_sources();
    let dst = TempDir::new().unwrap();

    let engine = CopyEngine::new(config(&[first.path(), second.path()], dst.path())).unwrap();
    match engine.execute() {
        Err(CopySpecError::DuplicateEntry { path, .. }) => assert_eq!(path, "lib/shared.txt"),
        other => panic!("expected a duplicate error, got {:?}", other),
    }
}

#[test]
fn test_duplicates_exclude_keeps_first() {
    let (first, second) = two_sources();
    let dst = TempDir::new().unwrap();

    let mut config = config(&[first.path(), second.path()], dst.path());
    config.duplicates = Some(DuplicatesStrategy::Exclude);

    let result = CopyEngine::new(config).unwrap().execute().unwrap();

    assert_eq!(result.files_copied, 2);
    assert_eq!(result.skipped, 1);
    assert_eq!(fs::read_to_string(dst.path().join("lib/shared.txt")).unwrap(), "first\n");
}

#[test]
fn test_duplicates_fail() {
    let (first, second) = two_sources();
    let dst = TempDir::new().unwrap();

    let mut config = config(&[first.path(), second.path()], dst.path());
    config.duplicates = Some(DuplicatesStrategy::Fail);

    let err = CopyEngine::new(config).unwrap().execute().unwrap_err();
    assert!(matches!(err, CopySpecError::DuplicateEntry { .. }));
    assert!(err.is_user_error());
}

#[test]
fn test_duplicates_warn_copies_both() {
    let (first, second) = two_sources();
    let dst = TempDir::new().unwrap();

    let mut config = config(&[first.path(), second.path()], dst.path());
    config.duplicates = Some(DuplicatesStrategy::Warn);
    config.threads = 4;

    let result = CopyEngine::new(config).unwrap().execute().unwrap();

    assert_eq!(result.files_copied, 3);
    assert_eq!(result.skipped, 0);
    assert_eq!(fs::read_to_string(dst.path().join("lib/shared.txt")).unwrap(), "second\n");
}

#[test]
fn test_detail_pipeline_over_scanned_tree() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(src.path(), "docs/readme.txt", "abc\ndrop me\nxyz\n");

    let spec = Arc::new(CopySpec::new().with_prefix("share"));
    let scanner = Scanner::new(ScanConfig::default()).unwrap();
    let mut copied = Vec::new();

    scanner
        .visit(src.path(), |element| {
            let mut detail = CopyDetail::new(Box::new(element), spec.clone(), Platform::default());
            if detail.is_directory() {
                return Ok(());
            }
            detail
                .filter(|line| (!line.starts_with("drop")).then(|| line.to_string()))
                .filter(|line| Some(line.to_uppercase()))
                .filter(|line| Some(line.chars().rev().collect()));
            detail.set_name("README");

            let target = dst.path().join(detail.relative_path().to_path_buf());
            assert_eq!(detail.get_size()?, 8);
            detail.copy_to_file(&target)?;
            copied.push(detail.path());
            Ok(())
        })
        .unwrap();

    assert_eq!(copied, vec!["share/docs/README".to_string()]);
    assert_eq!(
        fs::read_to_string(dst.path().join("share/docs/README")).unwrap(),
        "CBA\nZYX\n"
    );
}

#[test]
fn test_dry_run_writes_nothing() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(src.path(), "a/b.txt", "hello\n");

    let mut config = config(&[src.path()], dst.path());
    config.dry_run = true;
    config.expand = BTreeMap::from([("unused".to_string(), "x".to_string())]);

    let result = CopyEngine::new(config).unwrap().execute().unwrap();

    assert!(result.dry_run);
    assert_eq!(result.files_copied, 1);
    assert_eq!(result.bytes_copied, 6);
    assert_eq!(result.dirs_created, 1);
    assert_eq!(fs::read_dir(dst.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_source() {
    let dst = TempDir::new().unwrap();
    let missing = dst.path().join("nope");

    let err = CopyEngine::new(config(&[missing.as_path()], dst.path()))
        .unwrap()
        .execute()
        .unwrap_err();
    assert!(matches!(err, CopySpecError::NotFound(_)));
}

#[test]
fn test_into_cannot_leave_destination() {
    let src = TempDir::new().unwrap();
    let outer = TempDir::new().unwrap();
    let dst = outer.path().join("out");
    write(src.path(), "a.txt", "a\n");

    let mut config = config(&[src.path()], &dst);
    config.into = Some("../../escaped".to_string());

    let result = CopyEngine::new(config).unwrap().execute().unwrap();

    assert_eq!(result.files_copied, 1);
    assert!(dst.join("escaped/a.txt").exists());
    assert!(!outer.path().join("escaped").exists());
}

#[test]
fn test_reader_stage_rewrites_line_endings() {
    use std::io::{Cursor, Read};

    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(src.path(), "notes.txt", "one\ntwo\n");

    let scanner = Scanner::new(ScanConfig::default()).unwrap();
    scanner
        .visit(src.path(), |element| {
            let mut detail =
                CopyDetail::new(Box::new(element), Arc::new(CopySpec::new()), Platform::default());
            if detail.is_directory() {
                return Ok(());
            }
            detail
                .filter(|line| Some(line.to_uppercase()))
                .filter_reader(|mut input| {
                    let mut text = String::new();
                    input.read_to_string(&mut text).unwrap();
                    Box::new(Cursor::new(text.replace('\n', "\r\n").into_bytes()))
                });

            assert_eq!(detail.get_size()?, 10);
            detail.copy_to_file(&dst.path().join(detail.relative_path().to_path_buf()))?;
            Ok(())
        })
        .unwrap();

    assert_eq!(fs::read(dst.path().join("notes.txt")).unwrap(), b"ONE\r\nTWO\r\n");
}
