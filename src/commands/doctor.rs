use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use crate::config::Config;
use crate::provider::{ChainProvider, LocalProvider};

#[derive(Debug, Args)]
pub struct DoctorArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub config_path: Option<String>,
    pub trigger: String,
    pub timeout_secs: u64,
    pub sources: Vec<String>,
    pub local_pool: Option<usize>,
    pub issues: Vec<String>,
}

impl DoctorReport {
    pub fn build(config: &Config, config_path: Option<&Path>) -> Self {
        let mut issues = Vec::new();
        if let Err(e) = config.validate() {
            issues.push(format!("{e:#}"));
        }

        let local = LocalProvider::new(&config.idioms.image_dir);
        let local_pool = match local.pool() {
            Ok(pool) => {
                if pool.is_empty() {
                    issues.push(format!("{} has no .png/.jpg pictures", local.dir().display()));
                }
                Some(pool.len())
            }
            Err(e) => {
                issues.push(format!("{e:#}"));
                None
            }
        };
        if local_pool.unwrap_or(0) == 0 && config.idioms.remote_url.is_none() {
            issues.push("no usable puzzle source: local pool is empty and idioms.remote_url is unset".into());
        }

        let sources = ChainProvider::from_config(&config.idioms)
            .names()
            .into_iter()
            .map(String::from)
            .collect();

        Self {
            config_path: config_path.map(|p| p.display().to_string()),
            trigger: config.bot.trigger.clone(),
            timeout_secs: config.idioms.timeout_secs,
            sources,
            local_pool,
            issues,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

impl DoctorArgs {
    pub fn execute(&self, config: &Config, config_path: Option<&PathBuf>) -> anyhow::Result<()> {
        let report = DoctorReport::build(config, config_path.map(PathBuf::as_path));
        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!(
                "config:  {}",
                report.config_path.as_deref().unwrap_or("(defaults)")
            );
            println!("trigger: {}", report.trigger);
            println!("timeout: {}s", report.timeout_secs);
            println!("sources: {}", report.sources.join(" -> "));
            match report.local_pool {
                Some(n) => println!("local pool: {n} pictures"),
                None => println!("local pool: unreadable"),
            }
            for issue in &report.issues {
                println!("issue: {issue}");
            }
        }
        if !report.is_healthy() {
            anyhow::bail!("doctor found {} issue(s)", report.issues.len());
        }
        Ok(())
    }
}
