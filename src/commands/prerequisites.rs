use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

use super::generator::GeneratorKind;
use super::models::{ModelBundle, CATALOG};

#[derive(Serialize, Clone, Debug)]
pub struct PrerequisiteStatus {
    pub melody_rnn: CheckResult,
    pub improv_rnn: CheckResult,
    pub bundles: Vec<BundleCheck>,
}

#[derive(Serialize, Clone, Debug)]
pub struct CheckResult {
    pub status: CheckStatus,
    pub location: Option<String>,
    pub message: Option<String>,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Installed,
    NotInstalled,
}

#[derive(Serialize, Clone, Debug)]
pub struct BundleCheck {
    pub name: &'static str,
    pub present: bool,
}

/// Wait for `child`, draining its pipes so a chatty process cannot block.
///
/// Returns `Ok(None)` when the timeout expired; the child is killed first.
pub fn wait_with_timeout(mut child: Child, timeout: Option<Duration>) -> std::io::Result<Option<Output>> {
    let Some(timeout) = timeout else {
        return child.wait_with_output().map(Some);
    };

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let start = Instant::now();
    let status = loop {
        match child.try_wait()? {
            Some(status) => break Some(status),
            None if start.elapsed() > timeout => {
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
            None => std::thread::sleep(Duration::from_millis(50)),
        }
    };

    let stdout = stdout.map(|h| h.join().unwrap_or_default()).unwrap_or_default();
    let stderr = stderr.map(|h| h.join().unwrap_or_default()).unwrap_or_default();

    Ok(status.map(|status| Output {
        status,
        stdout,
        stderr,
    }))
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn run_command_with_timeout(cmd: &str, args: &[&str], timeout_secs: u64) -> Option<Output> {
    let child = Command::new(cmd)
        .args(args)
        .env("PATH", super::get_extended_path())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .ok()?;

    wait_with_timeout(child, Some(Duration::from_secs(timeout_secs)))
        .ok()
        .flatten()
}

fn locate_command() -> &'static str {
    if cfg!(target_os = "windows") {
        "where"
    } else {
        "which"
    }
}

fn check_generator(kind: GeneratorKind) -> CheckResult {
    match run_command_with_timeout(locate_command(), &[kind.cli_binary()], 3) {
        Some(output) if output.status.success() => {
            let location = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            CheckResult {
                status: CheckStatus::Installed,
                location: Some(location),
                message: None,
            }
        }
        _ => CheckResult {
            status: CheckStatus::NotInstalled,
            location: None,
            message: Some(format!("Run: {}", kind.install_command())),
        },
    }
}

fn check_bundles(models_dir: &Path) -> Vec<BundleCheck> {
    CATALOG
        .iter()
        .map(|bundle: &ModelBundle| BundleCheck {
            name: bundle.name,
            present: bundle.local_path(models_dir).exists(),
        })
        .collect()
}

/// Check the generator binaries and which bundles are on disk
pub fn check_prerequisites(models_dir: &Path) -> PrerequisiteStatus {
    PrerequisiteStatus {
        melody_rnn: check_generator(GeneratorKind::MelodyRnn),
        improv_rnn: check_generator(GeneratorKind::ImprovRnn),
        bundles: check_bundles(models_dir),
    }
}

/// Print a status report, returning whether a batch can run at all
pub fn print_prerequisites(status: &PrerequisiteStatus) -> bool {
    println!("Generators:");
    for (kind, check) in [
        (GeneratorKind::MelodyRnn, &status.melody_rnn),
        (GeneratorKind::ImprovRnn, &status.improv_rnn),
    ] {
        match check.status {
            CheckStatus::Installed => println!(
                "  ✓ {} ({})",
                kind.cli_binary(),
                check.location.as_deref().unwrap_or("on PATH")
            ),
            CheckStatus::NotInstalled => println!(
                "  ✗ {} not found. {}",
                kind.cli_binary(),
                check.message.as_deref().unwrap_or_default()
            ),
        }
    }

    println!("Bundles:");
    for bundle in &status.bundles {
        let mark = if bundle.present { "✓" } else { "-" };
        println!("  {} {}.mag", mark, bundle.name);
    }

    status.melody_rnn.status == CheckStatus::Installed
        || status.improv_rnn.status == CheckStatus::Installed
}
