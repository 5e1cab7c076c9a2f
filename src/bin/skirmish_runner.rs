//! Headless Skirmish Runner
//!
//! Loads a scenario (or builds a small default one), lets every unit engage
//! its nearest hostile until one side is eliminated, and prints a summary.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use hex_skirmish::battle::{HexCoord, Orientation, UnitClass, UnitSpawn};
use hex_skirmish::combat::CombatEvent;
use hex_skirmish::core::types::Side;
use hex_skirmish::scenario::{MapSpec, Scenario};
use hex_skirmish::{CombatConfig, CombatSession, Result};

/// Headless Skirmish Runner - hex-grid combat from a TOML scenario
#[derive(Parser, Debug)]
#[command(name = "skirmish_runner")]
#[command(about = "Run a hex-grid skirmish to completion and print the outcome")]
struct Args {
    /// Scenario file (TOML); a built-in 3v3 skirmish is used when omitted
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Combat config file (TOML), replacing the scenario's [combat] table
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Simulation milliseconds per tick
    #[arg(long, default_value_t = 100)]
    step_ms: u64,

    /// Give up after this many simulation milliseconds (draw)
    #[arg(long, default_value_t = 600_000)]
    max_ms: u64,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Print every combat event to stderr as it happens
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Serialize)]
struct Survivor {
    name: String,
    side: Side,
    position: HexCoord,
    health: i32,
    level: u32,
}

/// JSON output structure
#[derive(Serialize)]
struct SkirmishResult {
    winner: Option<Side>,
    elapsed_ms: u64,
    seed: u64,
    survivors: Vec<Survivor>,
    event_counts: BTreeMap<String, usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hex_skirmish=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => default_scenario(),
    };
    if let Some(path) = &args.config {
        scenario.combat = CombatConfig::load(path)?;
    }
    if let Some(seed) = args.seed {
        scenario.combat.seed = seed;
    }
    let seed = scenario.combat.seed;

    let mut session = CombatSession::from_scenario(&scenario)?;
    tracing::info!(units = session.units().count(), seed, "skirmish starting");

    // Count every event, including ones that fall out of the ring log
    let counts = std::rc::Rc::new(std::cell::RefCell::new(BTreeMap::<String, usize>::new()));
    let sink = std::rc::Rc::clone(&counts);
    let verbose = args.verbose;
    session.subscribe(move |event: &CombatEvent| {
        *sink
            .borrow_mut()
            .entry(format!("{:?}", event.kind))
            .or_default() += 1;
        if verbose {
            eprintln!("{}", event);
        }
    });

    let step = args.step_ms.max(1);
    let mut elapsed = 0;
    while !session.battle_over() && elapsed < args.max_ms {
        // Idle units pick the closest hostile
        let idle: Vec<_> = session
            .units()
            .filter(|u| !session.is_engaged(u.id))
            .map(|u| u.id)
            .collect();
        for id in idle {
            if let Err(e) = session.engage_nearest(id) {
                tracing::warn!(unit = %id, "could not engage: {}", e);
            }
        }

        session.tick(step);
        elapsed += step;
    }

    let result = SkirmishResult {
        winner: session.winner(),
        elapsed_ms: elapsed,
        seed,
        survivors: session
            .units()
            .map(|u| Survivor {
                name: u.name.clone(),
                side: u.side,
                position: u.position,
                health: u.health.current(),
                level: u.level,
            })
            .collect(),
        event_counts: counts.borrow().clone(),
    };

    match args.format.as_str() {
        "text" => print_text(&result),
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        other => {
            eprintln!("Unknown format '{}', defaulting to json", other);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

fn print_text(result: &SkirmishResult) {
    println!("Skirmish Result");
    println!("===============");
    match result.winner {
        Some(side) => println!("Winner: {:?}", side),
        None => println!("Winner: none (draw)"),
    }
    println!("Elapsed: {:.1}s", result.elapsed_ms as f64 / 1000.0);
    println!();
    println!("Survivors:");
    for s in &result.survivors {
        println!(
            "  {:<12} {:?} at ({},{}) hp={} lvl={}",
            s.name, s.side, s.position.col, s.position.row, s.health, s.level
        );
    }
    println!();
    println!("Events:");
    for (kind, count) in &result.event_counts {
        println!("  {:<18} {}", kind, count);
    }
    println!();
    println!("Seed: {}", result.seed);
}

/// Two infantry and an archer a side on an open 10x6 field
fn default_scenario() -> Scenario {
    let unit = |name: &str, side, class, col, row| {
        UnitSpawn::new(name, side, class, HexCoord::new(col, row))
    };

    Scenario {
        combat: CombatConfig::default(),
        map: MapSpec {
            width: 10,
            height: 6,
            orientation: Orientation::PointyTop,
            terrain: Vec::new(),
        },
        units: vec![
            unit("Sergeant", Side::Player, UnitClass::Infantry, 1, 2),
            unit("Pikeman", Side::Player, UnitClass::Infantry, 1, 3),
            unit("Archer", Side::Player, UnitClass::Ranged, 0, 2),
            unit("Raider", Side::Enemy, UnitClass::Infantry, 8, 2),
            unit("Brute", Side::Enemy, UnitClass::Infantry, 8, 3),
            unit("Lancer", Side::Enemy, UnitClass::Mounted, 9, 3),
        ],
    }
}
