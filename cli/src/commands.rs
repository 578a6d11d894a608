use std::path::{Path, PathBuf};
use std::sync::Arc;

use parsecast_core::context::ServerConfigExt;
use parsecast_core::session::{self, BroadcastPublisher, ConfigKeyDirectory, ServerContext};
use parsecast_core::signal_processor::EncounterProcessor;
use parsecast_core::storage::EncounterArchive;
use parsecast_core::wire::CombatantRecord;
use parsecast_types::ServerConfig;
use tracing::{info, warn};

/// Viewer channel depth per owner.
const VIEWER_BUFFER: usize = 256;

/// Command-line values that win over the config file.
pub struct ServeOverrides {
    pub udp_port: Option<u16>,
    pub dev: bool,
    pub data_dir: Option<PathBuf>,
}

pub fn load_config(path: Option<&Path>, overrides: ServeOverrides) -> Result<ServerConfig, String> {
    let mut config = match path {
        Some(path) => ServerConfig::load_from(path).map_err(|e| e.to_string())?,
        None => ServerConfig::load(),
    };
    if let Some(port) = overrides.udp_port {
        config.udp_port = port;
    }
    if overrides.dev {
        config.dev_mode = true;
    }
    if let Some(dir) = overrides.data_dir {
        config.data_directory = dir.to_string_lossy().into_owned();
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

pub async fn serve(config: ServerConfig) -> Result<(), String> {
    if config.dev_mode {
        warn!("Dev mode: every upload key is accepted as its own owner");
    } else if config.upload_keys.is_empty() {
        warn!("No upload keys configured; every handshake will be rejected");
    }

    let archive = EncounterArchive::new(config.data_dir());
    info!(data_dir = %archive.root().display(), "Archiving finished encounters");

    let socket = session::bind(config.udp_port)
        .await
        .map_err(|e| e.to_string())?;
    let directory = Arc::new(ConfigKeyDirectory::from_config(&config));
    let publisher = Arc::new(BroadcastPublisher::new(VIEWER_BUFFER));
    let ctx = ServerContext::new(config, publisher, directory, Some(archive));

    session::serve(socket, ctx, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    })
    .await
    .map_err(|e| e.to_string())
}

pub fn replay(dir: &Path, config: &ServerConfig) -> Result<(), String> {
    let finished = EncounterArchive::load(dir).map_err(|e| e.to_string())?;
    let encounter = &finished.encounter;

    println!("Encounter {} in {}", encounter.id, encounter.zone);
    println!(
        "  {} -> {} ({}s), {}, {} damage",
        encounter.start_time.format("%Y-%m-%d %H:%M:%S"),
        encounter.end_time.format("%H:%M:%S"),
        (encounter.end_time - encounter.start_time).num_seconds(),
        encounter.outcome.label(),
        encounter.damage
    );

    println!("Combatants:");
    for row in latest_rows(&finished.combatants) {
        println!(
            "  {:<24} {:<4} dmg {:>9}  healed {:>9}  taken {:>9}  deaths {}",
            format!("{} ({})", row.name, row.world),
            row.job,
            row.damage,
            row.damage_healed,
            row.damage_taken,
            row.deaths
        );
    }

    println!("{} log lines", finished.log_lines.len());

    let replayed = EncounterProcessor::from_config(config).replay(&finished.log_lines);
    if replayed.is_empty() {
        println!("  replay: no encounter ended");
    }
    for encounter in replayed {
        println!(
            "  replay: encounter ended as {} after {}s",
            encounter.outcome.label(),
            encounter.duration().num_seconds()
        );
    }
    Ok(())
}

/// Last row per player, in order of first appearance.
fn latest_rows(rows: &[CombatantRecord]) -> Vec<&CombatantRecord> {
    let mut latest: Vec<&CombatantRecord> = Vec::new();
    for row in rows {
        match latest
            .iter_mut()
            .find(|seen| seen.player_id == row.player_id && seen.name == row.name)
        {
            Some(seen) if row.time >= seen.time => *seen = row,
            Some(_) => {}
            None => latest.push(row),
        }
    }
    latest
}
