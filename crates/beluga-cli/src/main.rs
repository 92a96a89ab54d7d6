use beluga::{CoordinateOptions, EdgeStyle, HierarchyModel, Orientation, RankedGraph};
use serde::Serialize;
use std::io::Read;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Layout(beluga::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Layout(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<beluga::Error> for CliError {
    fn from(value: beluga::Error) -> Self {
        Self::Layout(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Layout,
    Ranks,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
    orientation: Option<Orientation>,
    edge_style: Option<EdgeStyle>,
    iterations: Option<usize>,
}

#[derive(Serialize)]
struct RankOut {
    rank: usize,
    y: f64,
    cells: Vec<String>,
}

fn usage() -> &'static str {
    "beluga-cli\n\
\n\
USAGE:\n\
  beluga-cli [layout] [--pretty] [--orientation north|south|east|west] [--edge-style orthogonal|polyline|curve] [--iterations <n>] [<path>|-]\n\
  beluga-cli ranks [--pretty] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - Input is a ranked graph as JSON ({\"vertices\", \"edges\", \"rankOrder\", \"options\"}).\n\
  - layout prints {\"result\", \"report\"}; flags override the embedded options.\n\
  - ranks prints the rank occupants after building the hierarchy.\n\
  - Set RUST_LOG (e.g. RUST_LOG=beluga=debug) to see warnings and sweep progress on stderr.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "layout" => args.command = Command::Layout,
            "ranks" => args.command = Command::Ranks,
            "--pretty" => args.pretty = true,
            "--orientation" => {
                let Some(value) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.orientation = Some(
                    value
                        .parse::<Orientation>()
                        .map_err(|_| CliError::Usage(usage()))?,
                );
            }
            "--edge-style" => {
                let Some(value) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.edge_style = Some(
                    value
                        .parse::<EdgeStyle>()
                        .map_err(|_| CliError::Usage(usage()))?,
                );
            }
            "--iterations" => {
                let Some(value) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.iterations =
                    Some(value.parse::<usize>().map_err(|_| CliError::Usage(usage()))?);
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Splits the input document into the ranked graph and the optional `options` object next to it.
fn parse_request(text: &str) -> Result<(RankedGraph, CoordinateOptions), CliError> {
    let mut document: serde_json::Value = serde_json::from_str(text)?;
    let options = match document.as_object_mut().and_then(|o| o.remove("options")) {
        Some(value) => serde_json::from_value(value)?,
        None => CoordinateOptions::default(),
    };
    Ok((serde_json::from_value(document)?, options))
}

fn rank_listing(model: &HierarchyModel) -> Vec<RankOut> {
    model
        .ranks()
        .iter()
        .enumerate()
        .map(|(rank, ids)| RankOut {
            rank,
            y: model.rank_coordinate(rank),
            cells: ids
                .iter()
                .map(|&id| {
                    let cell = model.cell(id);
                    match (cell.vertex_id(), cell.edge()) {
                        (Some(vertex), _) => vertex.to_string(),
                        (None, Some(edge)) => {
                            let names: Vec<&str> =
                                edge.real_edges().iter().map(|e| e.id.as_str()).collect();
                            format!("edge:{}", names.join(","))
                        }
                        (None, None) => String::new(),
                    }
                })
                .collect(),
        })
        .collect()
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let (graph, mut options) = parse_request(&text)?;
    if let Some(orientation) = args.orientation {
        options.orientation = orientation;
    }
    if let Some(edge_style) = args.edge_style {
        options.edge_style = edge_style;
    }
    if let Some(iterations) = args.iterations {
        options.max_iterations = iterations;
    }
    tracing::debug!(
        vertices = graph.vertices.len(),
        edges = graph.edges.len(),
        "read ranked graph"
    );

    match args.command {
        Command::Layout => {
            let output = beluga::layout_ranked_graph(&graph, &options)?;
            write_json(&output, args.pretty)
        }
        Command::Ranks => {
            let mut model = graph.to_model()?;
            let mut recorder = graph.recorder();
            beluga::assign_coordinates(&mut model, &options, &mut recorder);
            write_json(&rank_listing(&model), args.pretty)
        }
    }
}

fn main() {
    init_tracing();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
