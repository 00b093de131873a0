//! End-to-end install tests.
//!
//! Fixture tarballs are built in-process with `tar` + `flate2` using the
//! npm pack layout (`package/...`). Registry installs go through a fake
//! [`PackageFetcher`] that copies a prepared tarball, so no network is used.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use harbor_plugins::{
    DiagnosticLevel, DoctorSummary, InstallErrorKind, InstallLedger, InstallOutcome, Installer,
    LoadOutcome, NpmSpec, PackageFetcher, PluginCapabilities, PluginError, PluginResult,
    PluginSettings, PluginSource, PluginStatus, StatusRegistry,
};

const VOICE_CALL_MANIFEST: &str = r#"{
  "name": "@harbor/voice-call",
  "version": "0.0.1",
  "description": "Place and receive calls",
  "harbor": { "extensions": ["./dist/index.js"] }
}"#;

/// Build a gzip tarball at `path` from `(entry path, contents)` pairs.
fn write_tgz(path: &Path, entries: &[(&str, &[u8])]) {
    let mut builder = tar::Builder::new(Vec::new());
    for &(name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_path(name).unwrap();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, data).unwrap();
    }
    let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    gz.write_all(&builder.into_inner().unwrap()).unwrap();
    std::fs::write(path, gz.finish().unwrap()).unwrap();
}

fn voice_call_archive(dir: &Path) -> PathBuf {
    let archive = dir.join("voice-call-0.0.1.tgz");
    write_tgz(
        &archive,
        &[
            ("package/package.json", VOICE_CALL_MANIFEST.as_bytes()),
            ("package/dist/index.js", b"export default function register() {}\n"),
            ("package/dist/lib/util.js", b"export const x = 1;\n"),
            ("package/README.md", b"# voice-call\n"),
        ],
    );
    archive
}

/// Every regular file under `root`, relative, with contents.
fn snapshot_tree(root: &Path) -> HashMap<PathBuf, Vec<u8>> {
    let mut files = HashMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_path_buf();
                files.insert(rel, std::fs::read(&path).unwrap());
            }
        }
    }
    files
}

fn subdirs(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Serves a fixed tarball for every spec.
struct FakeFetcher {
    tarball: PathBuf,
    calls: AtomicUsize,
}

#[async_trait]
impl PackageFetcher for FakeFetcher {
    async fn fetch(&self, spec: &NpmSpec, dest: &Path) -> PluginResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let version = spec.version.as_deref().unwrap_or("0.0.1");
        let out = dest.join(spec.tarball_file_name(version));
        std::fs::copy(&self.tarball, &out)?;
        Ok(out)
    }
}

/// Always fails like an unreachable registry.
struct OfflineFetcher;

#[async_trait]
impl PackageFetcher for OfflineFetcher {
    async fn fetch(&self, _spec: &NpmSpec, _dest: &Path) -> PluginResult<PathBuf> {
        Err(PluginError::RegistryError {
            message: "connection refused".into(),
        })
    }
}

#[tokio::test]
async fn archive_install_places_package_verbatim() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = voice_call_archive(tmp.path());
    let ext = tmp.path().join("extensions");

    let outcome = Installer::new(&ext).install(archive.to_str().unwrap()).await;
    let InstallOutcome::Installed {
        plugin_id,
        target_dir,
    } = outcome
    else {
        panic!("expected Installed, got {outcome:?}");
    };
    assert_eq!(plugin_id.as_str(), "voice-call");
    assert_eq!(target_dir, ext.join("voice-call"));

    let installed = snapshot_tree(&target_dir);
    assert_eq!(installed.len(), 4);
    assert_eq!(
        installed[Path::new("package.json")],
        VOICE_CALL_MANIFEST.as_bytes()
    );
    assert_eq!(
        installed[Path::new("dist/lib/util.js")],
        b"export const x = 1;\n"
    );

    // Only the plugin remains; staging is gone.
    assert_eq!(subdirs(&ext), vec!["voice-call"]);
}

#[tokio::test]
async fn second_install_of_same_archive_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = voice_call_archive(tmp.path());
    let ext = tmp.path().join("extensions");
    let installer = Installer::new(&ext);

    let first = installer.install(archive.to_str().unwrap()).await;
    assert!(matches!(first, InstallOutcome::Installed { .. }));
    let before = snapshot_tree(&ext.join("voice-call"));

    let second = installer.install(archive.to_str().unwrap()).await;
    let InstallOutcome::Failed { kind, message } = second else {
        panic!("expected Failed, got {second:?}");
    };
    assert_eq!(kind, InstallErrorKind::AlreadyExists);
    assert!(message.contains("already exists"), "{message}");

    assert_eq!(before, snapshot_tree(&ext.join("voice-call")));
    assert_eq!(subdirs(&ext), vec!["voice-call"]);
}

#[tokio::test]
async fn archive_without_entry_points_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("plain.tgz");
    write_tgz(
        &archive,
        &[(
            "package/package.json",
            br#"{ "name": "plain-lib", "version": "1.0.0" }"#,
        )],
    );
    let ext = tmp.path().join("extensions");

    let outcome = Installer::new(&ext).install(archive.to_str().unwrap()).await;
    let InstallOutcome::Failed { kind, message } = outcome else {
        panic!("expected Failed, got {outcome:?}");
    };
    assert_eq!(kind, InstallErrorKind::ManifestInvalid);
    assert!(message.contains("harbor.extensions"), "{message}");
    assert!(subdirs(&ext).is_empty());
}

#[tokio::test]
async fn missing_sources_touch_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let ext = tmp.path().join("extensions");
    let installer = Installer::new(&ext);

    for raw in [
        "./does-not-exist",
        "/nowhere/plugin.tgz",
        "~/definitely-missing-harbor-plugin.tar.gz",
        "Not A Package!",
        "",
    ] {
        let outcome = installer.install(raw).await;
        assert_eq!(
            outcome.error_kind(),
            Some(InstallErrorKind::SourceNotFound),
            "{raw:?} → {outcome:?}"
        );
    }
    assert!(!ext.exists());
}

#[tokio::test]
async fn install_archive_on_missing_file_touches_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let ext = tmp.path().join("extensions");

    let outcome = Installer::new(&ext).install_archive(&tmp.path().join("missing.tgz"));
    assert_eq!(outcome.error_kind(), Some(InstallErrorKind::SourceNotFound));
    assert!(!ext.exists());
}

#[tokio::test]
async fn registry_install_uses_fetcher_and_records_source() {
    let tmp = tempfile::tempdir().unwrap();
    let fixtures = tmp.path().join("fixtures");
    std::fs::create_dir(&fixtures).unwrap();
    let fetcher = Arc::new(FakeFetcher {
        tarball: voice_call_archive(&fixtures),
        calls: AtomicUsize::new(0),
    });
    let ext = tmp.path().join("extensions");
    let installer = Installer::new(&ext).with_fetcher(fetcher.clone());

    let outcome = installer.install("@harbor/voice-call@0.0.1").await;
    assert!(matches!(outcome, InstallOutcome::Installed { .. }), "{outcome:?}");
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

    let ledger = InstallLedger::load_or_default(&InstallLedger::path_in(&ext)).unwrap();
    let record = ledger.get("voice-call").unwrap();
    assert!(record.source.is_registry());
    assert_eq!(record.source.to_string(), "registry:@harbor/voice-call@0.0.1");

    // Version-pinned respec of an installed id fails closed.
    let again = installer.install("@harbor/voice-call@0.0.2").await;
    assert_eq!(again.error_kind(), Some(InstallErrorKind::AlreadyExists));
    assert_eq!(subdirs(&ext), vec!["voice-call"]);
}

#[tokio::test]
async fn fetch_failures_keep_their_message() {
    let tmp = tempfile::tempdir().unwrap();
    let ext = tmp.path().join("extensions");
    let installer = Installer::new(&ext).with_fetcher(Arc::new(OfflineFetcher));

    let outcome = installer.install("voice-call").await;
    let InstallOutcome::Failed { kind, message } = outcome else {
        panic!("expected Failed, got {outcome:?}");
    };
    assert_eq!(kind, InstallErrorKind::FetchFailed);
    assert!(message.contains("connection refused"), "{message}");
    assert!(subdirs(&ext).is_empty());
}

#[tokio::test]
async fn registry_install_without_fetcher_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let outcome = Installer::new(tmp.path().join("extensions"))
        .install("voice-call")
        .await;
    assert_eq!(outcome.error_kind(), Some(InstallErrorKind::FetchFailed));
}

#[tokio::test]
async fn hostile_archive_is_rejected_without_placement() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("evil.tgz");

    // tar::Header::set_path refuses `..`, so write the name bytes directly.
    let mut header = tar::Header::new_gnu();
    let name = b"../escape/package.json";
    header.as_old_mut().name[..name.len()].copy_from_slice(name);
    header.set_size(2);
    header.set_mode(0o644);
    header.set_cksum();
    let mut builder = tar::Builder::new(Vec::new());
    builder.append(&header, &b"{}"[..]).unwrap();
    let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    gz.write_all(&builder.into_inner().unwrap()).unwrap();
    std::fs::write(&archive, gz.finish().unwrap()).unwrap();

    let ext = tmp.path().join("extensions");
    let outcome = Installer::new(&ext).install(archive.to_str().unwrap()).await;
    assert_eq!(outcome.error_kind(), Some(InstallErrorKind::ExtractionFailed));
    assert!(!tmp.path().join("escape").exists());
    assert!(subdirs(&ext).is_empty());
}

#[tokio::test]
async fn status_scan_reports_loaded_and_broken_plugins() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = voice_call_archive(tmp.path());
    let ext = tmp.path().join("extensions");
    let outcome = Installer::new(&ext).install(archive.to_str().unwrap()).await;
    assert!(matches!(outcome, InstallOutcome::Installed { .. }));

    std::fs::create_dir(ext.join("broken")).unwrap();
    std::fs::write(ext.join("broken/package.json"), "not json at all").unwrap();

    let loader = HashMap::from([(
        "voice-call".to_string(),
        LoadOutcome::loaded(PluginCapabilities {
            tool_names: vec!["voice_call".into()],
            ..PluginCapabilities::default()
        }),
    )]);
    let report = StatusRegistry::new(&ext, PluginSettings::default())
        .with_outcomes(&loader)
        .report();

    let loaded: Vec<_> = report
        .plugins
        .iter()
        .filter(|p| p.status == PluginStatus::Loaded)
        .collect();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, "voice-call");
    assert_eq!(loaded[0].source, PluginSource::ArchiveInstall);
    assert_eq!(loaded[0].version.as_deref(), Some("0.0.1"));
    assert_eq!(loaded[0].capabilities.tool_names, vec!["voice_call"]);

    let errored: Vec<_> = report
        .plugins
        .iter()
        .filter(|p| p.status == PluginStatus::Error)
        .collect();
    assert_eq!(errored.len(), 1);
    assert_eq!(errored[0].id, "broken");

    assert!(report.diagnostics.iter().any(|d| {
        d.level == DiagnosticLevel::Error && d.plugin_id.as_deref() == Some("broken")
    }));

    let summary = DoctorSummary::from_report(&report);
    assert_eq!(summary.errored.len(), 1);
    assert!(!summary.is_clean());
}

#[tokio::test]
async fn linked_path_is_not_copied() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("dev-plugin");
    std::fs::create_dir(&src).unwrap();
    std::fs::write(src.join("package.json"), VOICE_CALL_MANIFEST).unwrap();
    let ext = tmp.path().join("extensions");

    let outcome = Installer::new(&ext).install(src.to_str().unwrap()).await;
    let InstallOutcome::Linked { plugin_id, path } = outcome else {
        panic!("expected Linked, got {outcome:?}");
    };
    assert_eq!(plugin_id.unwrap().as_str(), "voice-call");
    assert_eq!(path, src.canonicalize().unwrap());
    assert!(!ext.exists());
}

#[cfg(unix)]
#[test]
fn concurrent_installs_of_one_id_have_one_winner() {
    const RACERS: usize = 6;

    let tmp = tempfile::tempdir().unwrap();
    let archive = voice_call_archive(tmp.path());
    let ext = tmp.path().join("extensions");
    std::fs::create_dir_all(&ext).unwrap();
    let installer = Installer::new(&ext);
    let barrier = std::sync::Barrier::new(RACERS);

    let outcomes: Vec<InstallOutcome> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    installer.install_archive(&archive)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let installed = outcomes
        .iter()
        .filter(|o| matches!(o, InstallOutcome::Installed { .. }))
        .count();
    assert_eq!(installed, 1, "{outcomes:?}");
    assert!(
        outcomes
            .iter()
            .filter(|o| o.is_failed())
            .all(|o| o.error_kind() == Some(InstallErrorKind::AlreadyExists)),
        "{outcomes:?}"
    );

    // Losers' staging directories are gone and only the winner is recorded.
    assert_eq!(subdirs(&ext), vec!["voice-call"]);
    let ledger = InstallLedger::load_or_default(&InstallLedger::path_in(&ext)).unwrap();
    assert_eq!(ledger.entries().len(), 1);
    assert!(ext.join("voice-call/dist/index.js").is_file());
}
