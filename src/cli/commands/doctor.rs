//! Doctor command - verify configuration and upstream connectivity.

use crate::cli::Output;
use crate::config::{Service, Settings};
use crate::error::UltimarrError;
use crate::services::{Services, Upstream};
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Ultimarr Doctor");
    println!();
    Output::info("Checking configuration and upstream services...");
    println!();

    let mut checks = Vec::new();

    println!("{}", style("Configuration").bold());
    for service in Service::ALL {
        let check = check_url(settings, service);
        check.print();
        checks.push(check);
    }

    println!();

    println!("{}", style("Upstream Services").bold());
    let services = Services::connect(settings)?;
    for upstream in services.upstreams() {
        let spinner = Output::spinner(&format!("Contacting {}...", upstream.service()));
        let check = check_upstream(upstream).await;
        spinner.finish_and_clear();
        check.print();
        Output::kv("endpoint", upstream.base_url());
        checks.push(check);
    }

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Tools backed by failing services will return errors.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Ultimarr is ready to serve.");
    }

    Ok(())
}

/// Flag services still pointing at their default URL.
fn check_url(settings: &Settings, service: Service) -> CheckResult {
    let url = &settings.service(service).url;
    if url == service.default_url() {
        CheckResult::warning(
            service.url_var(),
            &format!("using default {}", url),
            &format!("Set {} if {} runs elsewhere", service.url_var(), service),
        )
    } else {
        CheckResult::ok(service.url_var(), url)
    }
}

/// Query one upstream's status endpoint.
async fn check_upstream(upstream: &dyn Upstream) -> CheckResult {
    let service = upstream.service();
    let name = service.name();

    match upstream.system_status().await {
        Ok(status) => CheckResult::ok(name, &format!("version {}", status.version)),
        Err(UltimarrError::UpstreamHttp { status, .. }) if status == 401 || status == 403 => {
            CheckResult::error(
                name,
                &format!("authentication failed (HTTP {})", status),
                &format!("Check {}", service.api_key_var()),
            )
        }
        Err(e @ UltimarrError::Transport(_)) => CheckResult::error(
            name,
            &format!("unreachable: {}", e),
            &format!("Is {} running? Check {}", service, service.url_var()),
        ),
        Err(e) => CheckResult::error(
            name,
            &e.to_string(),
            &format!("Check that {} points at {}", service.url_var(), service),
        ),
    }
}
