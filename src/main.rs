#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::collapsible_if)]

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use thermostasis::simulation::{
    diagnostics::{divergence_report, run_ensemble},
    params::DIVERGENCE_CEILING,
    AgentVariant, Simulation, SimulationConfig,
};
use thermostasis::ui::{
    build_panels, field::compute_vfe_field, render::draw_dashboard, vfe_rows, DashboardState,
};

/// Most chart points drawn per line.
const MAX_CHART_POINTS: usize = 400;

#[derive(Parser, Debug)]
#[command(name = "thermostasis")]
#[command(about = "Hierarchical free-energy agents keeping their body temperature viable")]
struct Args {
    /// Preset agent to run
    #[arg(short, long, value_enum, default_value_t = AgentVariant::Full)]
    variant: AgentVariant,

    /// JSON configuration file; replaces the preset
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the simulation horizon (time units)
    #[arg(long)]
    sim_time: Option<f64>,

    /// Override the noise seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Run to completion and print a summary instead of the live dashboard
    #[arg(long)]
    headless: bool,

    /// With --headless, run this many seeds in parallel and summarize each
    #[arg(long)]
    ensemble: Option<u64>,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Ticks simulated per rendered frame
    #[arg(long, default_value_t = 10)]
    ticks_per_frame: usize,
}

fn load_config(args: &Args) -> Result<SimulationConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => args.variant.config(),
    };
    if let Some(sim_time) = args.sim_time {
        config.sim_time = sim_time;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // The dashboard owns the terminal, so it only logs when asked to
    let default_filter = if args.headless { "info" } else { "off" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = load_config(&args)?;
    if args.dump_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    let label = match &args.config {
        Some(path) => path.display().to_string(),
        None => args.variant.name().to_string(),
    };

    if args.headless {
        return run_headless(&config, &label, args.ensemble);
    }

    // Setup Terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut sim = Simulation::new(&config)?;
    let tick_rate = Duration::from_millis(50);

    let res = run_app(
        &mut terminal,
        &mut sim,
        &label,
        config.dt,
        args.ticks_per_frame.max(1),
        tick_rate,
    );

    // Restore Terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_headless(
    config: &SimulationConfig,
    label: &str,
    ensemble: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(members) = ensemble {
        let seeds: Vec<u64> = (0..members).map(|k| config.seed.wrapping_add(k)).collect();
        println!("{label}: ensemble of {members}");
        for member in run_ensemble(config, &seeds)? {
            let outcome = member.divergence.map_or_else(
                || "stable".to_string(),
                |d| format!("diverged: {} @ {}", d.series, d.tick),
            );
            println!(
                "seed {:>4} | viable {:>5.1}% | worst {:>6.2} | final VFE {:>10.4} | {}",
                member.seed,
                member.viability.fraction() * 100.0,
                member.viability.worst_excursion,
                member.final_vfe,
                outcome,
            );
        }
        return Ok(());
    }

    let mut sim = Simulation::new(config)?;
    sim.run();

    let state = DashboardState::from_simulation(&sim, label);
    println!("{}", state.format_hud());

    let band = sim.viability_band();
    let viability = sim.viability();
    println!(
        "viable ticks: {}/{} within {:.1} ± {:.1} | worst excursion: {:.2}",
        viability.inside, viability.total, band.center, band.range, viability.worst_excursion
    );
    if let Some(report) = divergence_report(&sim, DIVERGENCE_CEILING) {
        println!(
            "diverged: {} at tick {} ({})",
            report.series, report.tick, report.value
        );
    }
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    sim: &mut Simulation,
    label: &str,
    dt: f64,
    ticks_per_frame: usize,
    tick_rate: Duration,
) -> io::Result<()> {
    let mut last_tick = Instant::now();
    let mut paused = false;
    loop {
        // 1. Update
        if !paused && last_tick.elapsed() >= tick_rate {
            for _ in 0..ticks_per_frame {
                if sim.step().is_none() {
                    break;
                }
            }
            last_tick = Instant::now();
        }

        // 2. Render
        let view: &Simulation = sim;
        terminal.draw(|f| {
            let state = DashboardState::from_simulation(view, label);
            let panels = build_panels(view, dt, MAX_CHART_POINTS);
            let rows = vfe_rows(view);
            let kinds: Vec<_> = rows.iter().map(|(kind, _)| *kind).collect();
            let series: Vec<&[f64]> = rows.iter().map(|(_, values)| *values).collect();
            // Half the terminal width, minus the border
            let cols = (f.area().width / 2).saturating_sub(2) as usize;
            let field = compute_vfe_field(&series, cols);
            draw_dashboard(f, &state, &panels, &kinds, field);
        })?;

        // 3. Input
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Char(' ') => paused = !paused,
                    _ => {}
                }
            }
        }
    }
}
