use neher::{
    epidemic::Compartment,
    error::Error,
    input::ScenarioInput,
    sim::{run_scenario, Diagnostic},
    utils::{render_hbars, render_vbars},
};
use simple_logger::SimpleLogger;
use std::{
    env,
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
    process,
};

fn main() {
    SimpleLogger::new().init().unwrap();

    let mut args = env::args().skip(1);
    let input = args.next().unwrap_or_else(|| "scenario.toml".to_string());
    let output = args.next().unwrap_or_else(|| "epicurve.csv".to_string());

    if let Err(err) = simulate(&input, &output) {
        eprintln!("{}: {}", input, err);
        process::exit(1);
    }
}

fn simulate(input: &str, output: &str) -> Result<(), Error> {
    let cfg = ScenarioInput::load(input)?;
    let scenario = cfg.scenario()?;
    let series = run_scenario(&scenario, cfg.simulation())?;

    series.write_csv(BufWriter::new(File::create(output)?))?;
    series.write_load_csv(BufWriter::new(File::create(load_path(output))?))?;

    println!("Infectious ({}):", scenario.name());
    print!("{}", render_vbars(&series.curve(Compartment::Infectious), 20, 100));

    let last = series.final_state().map(|s| s.totals()).unwrap_or_default();
    let bars = render_hbars(&last, 60);
    for (c, bar) in Compartment::ALL.iter().zip(bars.lines()) {
        println!("{} {:>10.0} {}", c, last[c.index()], bar);
    }
    let overflow = series
        .diagnostics()
        .iter()
        .filter(|d| !matches!(d, Diagnostic::NumericDrift(_)))
        .count();
    if overflow > 0 {
        println!("capacity exceeded at {} reported times", overflow);
    }
    for warning in series.drift_warnings() {
        println!(
            "drift at t={} in {}: {:.2e}",
            warning.time, warning.age, warning.relative
        );
    }
    Ok(())
}

/// `dir/out.csv` -> `dir/out-load.csv`, touching only the file name.
fn load_path(output: &str) -> PathBuf {
    let path = Path::new(output);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "epicurve".to_string());
    let name = match path.extension() {
        Some(ext) => format!("{}-load.{}", stem, ext.to_string_lossy()),
        None => format!("{}-load", stem),
    };
    path.with_file_name(name)
}
