use stsim::base::{Config, Domain, HandlerKind};
use stsim::fem::{AnalysisModel, ConstraintHandler, PlainNumberer};
use stsim::StrError;
use structopt::StructOpt;

/// Command line options
#[derive(StructOpt, Debug)]
#[structopt(
    name = "stsim_dof_report",
    about = "Prints the DOF numbering report of a domain file"
)]
struct Options {
    /// Path to the domain JSON file
    domain_file: String,

    /// Constraint handler: lagrange, penalty, auto, or transformation
    #[structopt(long, default_value = "lagrange")]
    handler: String,
}

fn main() -> Result<(), StrError> {
    // parse options
    let options = Options::from_args();
    let kind = match options.handler.as_str() {
        "lagrange" => HandlerKind::Lagrange,
        "penalty" => HandlerKind::Penalty,
        "auto" => HandlerKind::AutoPenalty,
        "transformation" => HandlerKind::Transformation,
        _ => return Err("handler must be lagrange, penalty, auto, or transformation"),
    };

    // load the domain
    let mut domain = Domain::read_json(&options.domain_file)?;

    // convert the constraints and number the DOFs
    let mut config = Config::new();
    config.set_handler(kind);
    let mut handler = ConstraintHandler::new(&config)?;
    let mut model = AnalysisModel::new();
    let summary = handler.handle(&mut domain, &mut model, None)?;
    let numberer = PlainNumberer::new();
    numberer.number(&mut model)?;
    handler.done_numbering(&domain, &mut model)?;

    // report
    println!("{}", model);
    if !summary.is_clean() {
        println!("WARNING: {} elements were skipped: {:?}", summary.n_skipped, summary.skipped_elements);
    }
    Ok(())
}
