use ted_join::error::Error;
use ted_join::histogram::Dimension;
use ted_join::join::{self, HistoJoin, JoinConfig};
use ted_join::parser::BracketNotationParser;
use ted_join::verification::ZhangShasha;

use log::{error, info};
use std::time::Instant;

use clap::Parser;
#[derive(Parser, Debug)] #[command(author, version, about, long_about = None)]
struct Args {

    //YAML join configuration, the flags below override its values
    #[arg(short, long)]
    config: Option<String>,

    //Tree collection in bracket notation, one tree per line
    #[arg(short, long)]
    input_filename: Option<String>,

    //Where to write the join result (.json for JSON, YAML otherwise)
    #[arg(short, long)]
    output_filename: Option<String>,

    //Maximum tree edit distance of a result pair
    #[arg(short, long)]
    threshold: Option<f64>,

    //Comma separated histogram filters, e.g. label,degree,leaf_distance
    #[arg(short, long)]
    filter_order: Option<String>,

    //Show a progress bar while verifying candidates
    #[arg(short, long)]
    progress: bool,
}

fn main() {

    env_logger::init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn build_config(args: Args) -> Result<JoinConfig, Error> {

    let mut config = match &args.config {
        Some(filename) => JoinConfig::from_file(filename)?,
        None => JoinConfig::default(),
    };

    if let Some(input) = args.input_filename {
        config.input = input;
    }

    if let Some(output) = args.output_filename {
        config.output = Some(output);
    }

    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }

    if let Some(filter_order) = args.filter_order {
        config.filter_order = filter_order
            .split(',')
            .map(|x| x.parse::<Dimension>())
            .collect::<Result<Vec<Dimension>, Error>>()?;
    }

    config.progress = config.progress || args.progress;

    config.validate()?;

    return Ok(config);
}

fn run(args: Args) -> Result<(), Error> {

    let config = build_config(args)?;
    info!("{:?}", &config);

    let start = Instant::now();
    let trees = BracketNotationParser::parse_collection(&config.input)?;
    info!("parsed {} trees from {} in {:.3}s", trees.len(), &config.input, start.elapsed().as_secs_f64());

    let mut hjoin = HistoJoin::from_config(ZhangShasha::unit_cost(), &config);

    let start = Instant::now();
    let join_result = hjoin.execute_join(&trees, config.threshold);
    let duration = start.elapsed();

    for (dimension, candidates) in hjoin.get_stage_candidates() {
        info!("candidates after {} filter: {}", dimension, candidates);
    }
    info!("pre-candidates: {}", hjoin.get_number_of_pre_candidates());
    info!("il lookups: {}", hjoin.get_number_of_il_lookups());
    info!("subproblems: {}", hjoin.get_subproblem_count());
    info!("result pairs: {}", join_result.len());
    info!("join time: {:.3}s", duration.as_secs_f64());

    match &config.output {
        Some(filename) => {
            join::write_join_result(&join_result, filename)?;
            info!("wrote {} result pairs to {}", join_result.len(), filename);
        },
        None => {
            for element in join_result.iter() {
                println!("{},{},{}", element.tree_id_1, element.tree_id_2, element.ted_value);
            }
        },
    }

    return Ok(());
}
