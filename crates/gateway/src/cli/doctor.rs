use std::time::Duration;

use mb_domain::config::{Config, ConfigSeverity};

/// Run all diagnostic checks and print a summary.
///
/// Returns `Ok(true)` when every check passes, `Ok(false)` when at least
/// one check failed.
pub async fn run(config: &Config, config_path: &str) -> anyhow::Result<bool> {
    println!("msgbridge doctor");
    println!("================\n");

    let mut all_passed = true;

    // 1. Config file
    check_config_file(config_path);

    // 2. Config validation
    check_config_validation(config, &mut all_passed);

    // 3. Session store connectivity
    check_session_store(config, &mut all_passed).await;

    // 4. Sidecar reachability
    check_bridge(config, &mut all_passed).await;

    // Summary
    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    Ok(all_passed)
}

// ── Individual checks ─────────────────────────────────────────────────

/// Informational only: environment variables alone are a valid setup.
fn check_config_file(config_path: &str) {
    let exists = std::path::Path::new(config_path).exists();
    print_check(
        "Config file",
        true,
        if exists {
            config_path.to_owned()
        } else {
            format!("{config_path} not found (using defaults and environment)")
        },
    );
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();

    if issues.is_empty() {
        print_check("Config validation", true, "no issues".into());
    } else {
        print_check(
            "Config validation",
            error_count == 0,
            format!("{} issue(s) ({} error(s))", issues.len(), error_count),
        );
        for issue in &issues {
            println!("      {issue}");
        }
        if error_count > 0 {
            *all_passed = false;
        }
    }
}

async fn check_session_store(config: &Config, all_passed: &mut bool) {
    let id = &config.session.id;
    let outcome = match mb_store::connect(&config.store).await {
        Ok(store) => store.exists(id).await.map(|found| (store.backend(), found)),
        Err(e) => Err(e),
    };

    match outcome {
        Ok((backend, found)) => print_check(
            "Session store reachable",
            true,
            format!(
                "{} ({backend}); session \"{id}\" {}",
                config.store.uri,
                if found {
                    "stored, will restore"
                } else {
                    "not stored, pairing required"
                }
            ),
        ),
        Err(e) => {
            print_check("Session store reachable", false, format!("{} ({e})", config.store.uri));
            *all_passed = false;
        }
    }
}

async fn check_bridge(config: &Config, all_passed: &mut bool) {
    let url = &config.bridge.url;
    let target = reqwest::Url::parse(url).ok().and_then(|u| {
        let host = u.host_str()?.to_owned();
        let port = u.port_or_known_default()?;
        Some((host, port))
    });

    let reachable = match target {
        Some((host, port)) => matches!(
            tokio::time::timeout(
                Duration::from_secs(5),
                tokio::net::TcpStream::connect((host.as_str(), port)),
            )
            .await,
            Ok(Ok(_))
        ),
        None => false,
    };

    print_check(
        "Sidecar reachable",
        reachable,
        if reachable {
            url.clone()
        } else {
            format!("{url} (unreachable)")
        },
    );

    if !reachable {
        *all_passed = false;
    }
}

// ── Formatting helper ─────────────────────────────────────────────────

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
