use std::path::{Path, PathBuf};

use clap::Parser;
use cut_planner::solver::Solver;
use cut_planner::types::{CuttingParameters, DemandPart, FitStrategy, Rect, Solution};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "cut_planner",
    about = "Guillotine panel cutting planner for cabinet parts"
)]
struct Cli {
    /// JSON file with cutting parameters; flags below override it
    #[arg(long)]
    params: Option<PathBuf>,

    /// JSON file with an array of parts
    #[arg(long)]
    parts: Option<PathBuf>,

    /// Inline parts as REF:LxWxT:COLOR:QTY[:free] (e.g. R1:800x500x19:Chene:6)
    #[arg(long = "cuts", num_args = 1..)]
    cuts: Vec<String>,

    /// Stock panel dimensions (LxW, e.g. 2800x2070)
    #[arg(long)]
    stock: Option<String>,

    /// Blade kerf width in mm
    #[arg(long)]
    kerf: Option<f64>,

    /// Edge allowance added on each side of a part, in mm
    #[arg(long)]
    allowance: Option<f64>,

    /// Squaring strip removed from every fresh panel, in mm
    #[arg(long)]
    squaring: Option<f64>,

    /// Smallest offcut kept for further placement, in mm
    #[arg(long)]
    min_offcut: Option<f64>,

    /// Let grained parts rotate
    #[arg(long)]
    no_grain: bool,

    /// Fit strategy: short-side, long-side, or area
    #[arg(long)]
    strategy: Option<FitStrategy>,

    /// Print the solution as JSON
    #[arg(long)]
    json: bool,

    /// Log every group and panel
    #[arg(long, short)]
    verbose: bool,
}

fn parse_dimensions(s: &str) -> Result<Rect, String> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(format!("invalid dimensions '{}', expected LxW", s));
    }
    let length = parts[0]
        .parse::<f64>()
        .map_err(|_| format!("invalid length in '{}'", s))?;
    let width = parts[1]
        .parse::<f64>()
        .map_err(|_| format!("invalid width in '{}'", s))?;
    Ok(Rect::new(length, width))
}

fn parse_cut(s: &str) -> Result<DemandPart, String> {
    let fields: Vec<&str> = s.split(':').collect();
    if !(4..=5).contains(&fields.len()) {
        return Err(format!(
            "invalid cut '{}', expected REF:LxWxT:COLOR:QTY[:free]",
            s
        ));
    }
    let dims: Vec<f64> = fields[1]
        .split('x')
        .map(|d| d.parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("invalid dimensions in '{}'", s))?;
    if dims.len() != 3 {
        return Err(format!("invalid dimensions in '{}', expected LxWxT", s));
    }
    let quantity = fields[3]
        .parse::<u32>()
        .map_err(|_| format!("invalid quantity in '{}'", s))?;
    let part = DemandPart::new(
        fields[0], fields[0], dims[0], dims[1], dims[2], fields[2], quantity,
    );
    match fields.get(4) {
        None => Ok(part),
        Some(&"free") => Ok(part.without_grain()),
        Some(flag) => Err(format!("unknown flag '{}' in '{}'", flag, s)),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid JSON in {}: {}", path.display(), e))
}

fn build_params(cli: &Cli) -> Result<CuttingParameters, String> {
    let mut params = match &cli.params {
        Some(path) => read_json(path)?,
        None => CuttingParameters::default(),
    };
    if let Some(stock) = &cli.stock {
        let stock = parse_dimensions(stock)?;
        params.stock_length = stock.length;
        params.stock_width = stock.width;
    }
    if let Some(kerf) = cli.kerf {
        params.kerf = kerf;
    }
    if let Some(allowance) = cli.allowance {
        params.edge_allowance = allowance;
    }
    if let Some(squaring) = cli.squaring {
        params.squaring_cut = squaring;
    }
    if let Some(min_offcut) = cli.min_offcut {
        params.min_offcut = min_offcut;
    }
    if cli.no_grain {
        params.grain_enforced = false;
    }
    if let Some(strategy) = cli.strategy {
        params.fit_strategy = strategy;
    }
    Ok(params)
}

fn build_parts(cli: &Cli) -> Result<Vec<DemandPart>, String> {
    let mut parts: Vec<DemandPart> = match &cli.parts {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    for c in &cli.cuts {
        parts.push(parse_cut(c)?);
    }
    Ok(parts)
}

fn print_solution(solution: &Solution) {
    for (i, plan) in solution.plans.iter().enumerate() {
        println!(
            "Panel {}: {} {}mm ({}), {} pieces, {:.1}% waste",
            i + 1,
            plan.color,
            plan.thickness,
            plan.stock,
            plan.placements.len(),
            plan.waste_percent()
        );
        for p in &plan.placements {
            let rot = if p.rotated { " [rotated]" } else { "" };
            println!(
                "  {:>8} {:<20} {} @ ({}, {}){}",
                p.reference, p.name, p.cut, p.x, p.y, rot
            );
        }
        println!();
    }

    if !solution.rejected.is_empty() {
        println!("Rejected:");
        for r in &solution.rejected {
            println!(
                "  {:>8} {:<20} {}x{} x{} ({})",
                r.part.reference, r.part.name, r.part.length, r.part.width, r.part.quantity, r.reason
            );
        }
        println!();
    }

    println!("Panels to order:");
    for count in solution.panel_counts() {
        println!(
            "  {} x {} {}mm ({})",
            count.quantity, count.color, count.thickness, solution.stock
        );
    }

    println!(
        "Summary: {} panel{} used, {:.2} m² of stock, {:.2} m² of parts, {:.1}% waste",
        solution.plan_count(),
        if solution.plan_count() == 1 { "" } else { "s" },
        solution.total_stock_area_m2(),
        solution.total_parts_area_m2(),
        solution.total_waste_percent(),
    );
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let params = build_params(&cli).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    let parts = build_parts(&cli).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let solver = Solver::new(params).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    let solution = solver.solve(&parts).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    if cli.json {
        match serde_json::to_string_pretty(&solution) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        print_solution(&solution);
    }
}
