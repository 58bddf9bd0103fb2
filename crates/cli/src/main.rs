use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gridstone_circuit::{Block, CircuitSim, Logic, SimMetrics};
use gridstone_core::{BlockKind, Direction, SolidKind};
use tracing::{info, Level};
use tracing_subscriber::fmt;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless driver for the gridstone circuit engine", long_about = None)]
struct Args {
    /// Built-in circuit to run
    #[arg(long, value_enum, default_value_t = Demo::Clock)]
    demo: Demo,

    /// Game ticks to simulate
    #[arg(long, default_value_t = 40)]
    ticks: u64,

    /// Dump an ASCII frame of the grid after every tick
    #[arg(long)]
    print_frames: bool,

    /// Write run metrics as JSON to this path
    #[arg(long)]
    metrics: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Demo {
    /// Torch clock toggling every two ticks
    Clock,
    /// Lever through a delay-3 repeater
    RepeaterLine,
    /// Sticky piston pushing and pulling a stone
    PistonRow,
    /// Comparator subtracting an attenuated side signal
    Comparator,
}

/// A demo circuit plus the lever flips its script performs.
struct DemoRun {
    sim: CircuitSim,
    /// `(tick, x, y)` interactions applied right before that tick runs.
    script: Vec<(u64, i32, i32)>,
}

fn main() -> Result<()> {
    let _ = fmt().with_max_level(Level::INFO).try_init();
    let args = Args::parse();

    info!(demo = ?args.demo, ticks = args.ticks, "starting circuit run");
    let DemoRun { mut sim, script } = build_demo(args.demo, args.ticks)?;

    for tick in 0..args.ticks {
        for &(at, x, y) in &script {
            if at == tick {
                sim.interact(x, y);
                info!(tick, x, y, "interacted");
            }
        }
        sim.tick();
        if args.print_frames {
            println!("tick {:>4}\n{}", sim.current_tick().0, render_frame(&sim));
        }
    }

    let metrics = sim.metrics();
    info!(
        tick = metrics.tick,
        blocks = metrics.blocks,
        neighbor_updates = metrics.neighbor_updates,
        scheduled_fired = metrics.scheduled_fired,
        "run finished"
    );

    if let Some(path) = args.metrics.as_deref() {
        write_metrics(path, &metrics)?;
        info!(path = %path.display(), "wrote run metrics");
    }
    Ok(())
}

fn build_demo(demo: Demo, ticks: u64) -> Result<DemoRun> {
    let mut sim = CircuitSim::default();
    let mut script = Vec::new();

    match demo {
        Demo::Clock => {
            // Torch attached to the wire east of it; two more wires loop
            // its output back around to that support.
            sim.create_block(BlockKind::Torch, 1, 1)
                .context("place clock torch")?;
            face(&mut sim, 1, 1, Direction::East);
            sim.create_block(BlockKind::Wire, 2, 1).context("place wire")?;
            sim.create_block(BlockKind::Wire, 1, 2).context("place wire")?;
            sim.create_block(BlockKind::Wire, 2, 2).context("place wire")?;
        }
        Demo::RepeaterLine => {
            sim.create_block(BlockKind::Lever, 1, 1).context("place lever")?;
            sim.create_block(BlockKind::Wire, 2, 1).context("place wire")?;
            sim.create_block(BlockKind::Repeater, 3, 1)
                .context("place repeater")?;
            face(&mut sim, 3, 1, Direction::East);
            // Delay 1 -> 3 redstone ticks.
            sim.configure_repeater_delay(3, 1);
            sim.configure_repeater_delay(3, 1);
            sim.create_block(BlockKind::Wire, 4, 1).context("place wire")?;
            script.push((0, 1, 1));
        }
        Demo::PistonRow => {
            sim.create_block(BlockKind::Lever, 1, 1).context("place lever")?;
            sim.create_block(BlockKind::StickyPiston, 2, 1)
                .context("place piston")?;
            face(&mut sim, 2, 1, Direction::East);
            sim.create_block(BlockKind::Solid(SolidKind::Stone), 3, 1)
                .context("place stone")?;
            script.push((0, 1, 1));
            script.push((ticks / 2, 1, 1));
        }
        Demo::Comparator => {
            // Rear source at full strength; the side input arrives through
            // a wire run that attenuates it to 12, so subtract mode reads 3.
            sim.create_block(BlockKind::PowerSource, 2, 5)
                .context("place source")?;
            sim.create_block(BlockKind::Comparator, 3, 5)
                .context("place comparator")?;
            face(&mut sim, 3, 5, Direction::East);
            sim.configure_comparator_mode(3, 5);
            sim.create_block(BlockKind::Wire, 4, 5).context("place wire")?;

            sim.create_block(BlockKind::PowerSource, 3, 0)
                .context("place source")?;
            for y in 1..=4 {
                sim.create_block(BlockKind::Wire, 3, y).context("place wire")?;
            }
        }
    }

    Ok(DemoRun { sim, script })
}

/// Step a block's rotation until it faces `facing`.
fn face(sim: &mut CircuitSim, x: i32, y: i32, facing: Direction) {
    for _ in 0..4 {
        if sim.query(x, y).map(|b| b.rotation) == Some(facing) {
            return;
        }
        sim.rotate_block(x, y);
    }
}

fn render_frame(sim: &CircuitSim) -> String {
    let grid = sim.grid();
    let (mut max_x, mut max_y) = (0, 0);
    for block in grid.blocks() {
        max_x = max_x.max(block.pos.x);
        max_y = max_y.max(block.pos.y);
    }

    let mut out = String::new();
    for y in 0..=max_y + 1 {
        for x in 0..=max_x + 1 {
            out.push(match sim.query(x, y) {
                Some(block) => glyph(block),
                None => '.',
            });
        }
        out.push('\n');
    }
    out
}

fn glyph(block: &Block) -> char {
    match (&block.kind, &block.logic) {
        (BlockKind::Wire, Logic::Wire { power }) => {
            char::from_digit(u32::from(*power), 16).unwrap_or('?')
        }
        (BlockKind::Torch, Logic::Torch { lit }) => {
            if *lit {
                '!'
            } else {
                'i'
            }
        }
        (BlockKind::Lever, Logic::Lever { on }) => {
            if *on {
                'L'
            } else {
                'l'
            }
        }
        (BlockKind::Button, Logic::Button { pressed }) => {
            if *pressed {
                'B'
            } else {
                'b'
            }
        }
        (BlockKind::Repeater, _) => match block.rotation {
            Direction::North => '^',
            Direction::East => '>',
            Direction::South => 'v',
            _ => '<',
        },
        (BlockKind::Comparator, Logic::Comparator { output, .. }) => {
            if *output > 0 {
                'C'
            } else {
                'c'
            }
        }
        (BlockKind::Observer, _) => {
            if block.visual.powered {
                'O'
            } else {
                'o'
            }
        }
        (BlockKind::Piston | BlockKind::StickyPiston, _) => {
            if block.visual.extended {
                'P'
            } else {
                'p'
            }
        }
        (BlockKind::PistonHead, _) => '=',
        (BlockKind::PowerSource, _) => '*',
        (BlockKind::Solid(SolidKind::Stone), _) => '#',
        (BlockKind::Solid(SolidKind::Obsidian), _) => '8',
        (BlockKind::Solid(SolidKind::Bedrock), _) => 'X',
        _ => '?',
    }
}

fn write_metrics(path: &Path, metrics: &SimMetrics) -> Result<()> {
    let payload = serde_json::to_string_pretty(metrics).context("serialize run metrics")?;
    fs::write(path, payload)
        .with_context(|| format!("failed to write metrics to {}", path.display()))?;
    Ok(())
}
