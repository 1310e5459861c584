//! CLI entry points that drive the acquisition pipeline.

use anyhow::Result;

use crate::config::Config;
use crate::pipeline::{Acquisition, GameOutcome, RefreshMode, RefreshReport};

/// `draws refresh [--force]`.
pub async fn run_refresh(config: &Config, force: bool) -> Result<()> {
    let acq = Acquisition::from_config(config).await?;
    let result = if force {
        acq.force_refresh().await
    } else {
        acq.refresh_all().await
    };

    match result {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            println!("provenance: {}", acq.state().provenance);
            anyhow::bail!(e)
        }
    }
}

fn print_report(report: &RefreshReport) {
    let mode = match report.mode {
        RefreshMode::Automatic => "automatic",
        RefreshMode::Manual => "manual",
    };
    println!("provenance: {}", report.provenance);
    println!("mode:       {}", mode);
    println!("fc3d:       {}", describe(&report.fc3d));
    println!("ssq:        {}", describe(&report.ssq));
}

fn describe(outcome: &GameOutcome) -> String {
    match outcome {
        GameOutcome::Live { records, rejected: 0 } => format!("{} records (live)", records),
        GameOutcome::Live { records, rejected } => {
            format!("{} records (live, {} rejected)", records, rejected)
        }
        GameOutcome::Cached { records } => format!("{} records (cached)", records),
        GameOutcome::Kept { records, reason } => {
            format!("{} records (kept: {})", records, reason)
        }
        GameOutcome::NoData { reason } => format!("no data ({})", reason),
    }
}

/// `draws network <on|off>`.
pub async fn run_network(config: &Config, enabled: bool) -> Result<()> {
    let acq = Acquisition::from_config(config).await?;
    acq.set_network_enabled(enabled).await;
    println!(
        "Network refresh {}.",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

/// `draws cache clear`.
pub async fn run_cache_clear(config: &Config) -> Result<()> {
    let acq = Acquisition::from_config(config).await?;
    acq.clear_cache().await;
    println!("Draw cache cleared.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_outcomes() {
        assert_eq!(
            describe(&GameOutcome::Live {
                records: 5,
                rejected: 0
            }),
            "5 records (live)"
        );
        assert_eq!(
            describe(&GameOutcome::Live {
                records: 5,
                rejected: 2
            }),
            "5 records (live, 2 rejected)"
        );
        assert_eq!(
            describe(&GameOutcome::NoData {
                reason: "empty response".into()
            }),
            "no data (empty response)"
        );
    }
}
