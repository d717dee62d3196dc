/**
 * UNINET WATCH - Synchro console du parc de PCs
 *
 * ROLE : Loads the dashboard config, seeds the registry, starts the liveness and
 * roster pollers and logs the sectorized grid after every liveness period.
 *
 * USAGE : uninet-watch [all|online|offline|inUse|examMode] [pc-id]
 * With a pc-id, the detail panel follows that PC while the filter shows it.
 * Stops on Ctrl-C; the pollers are released with their handles.
 */

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uninet_core::{
    load_config, select, spawn_liveness_poller, spawn_roster_poller, FilterState, FleetStats, GridView,
    Machine, Registry, RegistryStore, SelectionState, StatusSource,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Ok si .env n'existe pas

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let filter: FilterState = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse()
            .map_err(anyhow::Error::msg)
            .context("invalid status filter")?,
        None => FilterState::All,
    };
    let focus = std::env::args().nth(2);

    let cfg = load_config().await;
    let selection = SelectionState::from_config(&cfg);
    let store = RegistryStore::new(Registry::from_machines(cfg.machines.clone()));
    info!("seeded registry with {} machines", store.len());

    let source = StatusSource::new(cfg.request_timeout());
    let liveness = spawn_liveness_poller(source.clone(), cfg.status_url.clone(), &store, cfg.liveness_interval());
    let roster = match cfg.roster_url.clone() {
        Some(url) => Some(spawn_roster_poller(
            source,
            url,
            cfg.carrera.clone(),
            &store,
            cfg.roster_interval(),
        )),
        None => {
            warn!("no roster endpoint configured, roster poller disabled");
            None
        }
    };

    let mut ticker = tokio::time::interval(cfg.liveness_interval());
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let shown = render(&store, filter, cfg.sector_size);
                follow(&selection, focus.as_deref(), shown);
            },
            res = tokio::signal::ctrl_c() => {
                res.context("failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    liveness.stop();
    if let Some(roster) = roster {
        roster.stop();
    }
    info!("bye");
    Ok(())
}

/// Logs the grid and returns the machines it shows.
fn render(store: &RegistryStore, filter: FilterState, sector_size: usize) -> Vec<Machine> {
    let registry = store.snapshot();
    let stats = FleetStats::from_machines(registry.machines());
    info!(
        total = stats.total,
        online = stats.online,
        offline = stats.offline,
        in_use = stats.in_use,
        exam_mode = stats.exam_mode,
        "fleet"
    );

    let view = select(registry.machines(), filter, sector_size);
    match &view {
        GridView::NoMachines => info!("no machines detected in the lab"),
        GridView::NoMatches(filter) => info!("no machines with status {filter}"),
        GridView::Sectors(sectors) => {
            for sector in sectors {
                let row: Vec<String> = sector
                    .machines
                    .iter()
                    .map(|m| match &m.user {
                        Some(user) => format!("{}={}({})", m.name, m.status, user),
                        None => format!("{}={}", m.name, m.status),
                    })
                    .collect();
                info!("{}: {}", sector.label, row.join(" "));
            }
        }
    }
    view.sectors()
        .iter()
        .flat_map(|s| s.machines.iter().map(|m| (*m).clone()))
        .collect()
}

/// Keeps the detail panel on `focus` while it is shown, closes it otherwise.
fn follow(selection: &SelectionState, focus: Option<&str>, shown: Vec<Machine>) {
    let Some(focus) = focus else { return };
    match shown.into_iter().find(|m| m.id == focus) {
        Some(machine) => {
            let opening = !selection.is_open();
            selection.select(machine);
            if let (true, Some(m)) = (opening, selection.current()) {
                info!(user = ?m.user, last_seen = ?m.last_seen, "detail {} ({}) {}", m.name, m.ip, m.status);
            }
        }
        None if selection.is_open() => {
            info!("{focus} left the view, closing detail");
            selection.request_close();
        }
        None => {}
    }
}
