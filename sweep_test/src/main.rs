use ted_join::join::HistoJoin;
use ted_join::parser::BracketNotationParser;
use ted_join::verification::ZhangShasha;

use glob::glob;
use kdam::tqdm;
use log::{error, info, warn};
use std::time::Instant;

use clap::Parser;
#[derive(Parser, Debug)] #[command(author, version, about, long_about = None)]
struct Args {

    //Glob of tree collection files to sweep
    #[arg(short, long)]
    pattern: String,

    //First threshold of the sweep
    #[arg(long, default_value_t = 1)]
    min_threshold: u32,

    //Last threshold of the sweep
    #[arg(long, default_value_t = 15)]
    max_threshold: u32,
}

fn main() {

    env_logger::init();

    let args = Args::parse();

    let paths = match glob(&args.pattern) {
        Ok(paths) => paths,
        Err(e) => {
            error!("bad pattern {}: {}", &args.pattern, e);
            std::process::exit(1);
        }
    };

    for path in paths {

        let path = match path {
            Ok(path) => path,
            Err(e) => {
                warn!("skipping unreadable path: {}", e);
                continue;
            }
        };

        let trees = match BracketNotationParser::parse_collection(&path) {
            Ok(trees) => trees,
            Err(e) => {
                warn!("skipping {}: {}", path.display(), e);
                continue;
            }
        };

        info!("{}: {} trees", path.display(), trees.len());

        let mut last_result_size = 0;

        for threshold in tqdm!(args.min_threshold..=args.max_threshold) {

            let mut hjoin = HistoJoin::new(ZhangShasha::unit_cost());

            let start = Instant::now();
            let join_result = hjoin.execute_join(&trees, threshold as f64);
            let duration = start.elapsed();

            info!("{} threshold={}: cand={}, result={}, pre-cand={}, il-lookups={}, subproblems={}, {:.3}s",
                  path.display(),
                  threshold,
                  hjoin.get_number_of_candidates(),
                  join_result.len(),
                  hjoin.get_number_of_pre_candidates(),
                  hjoin.get_number_of_il_lookups(),
                  hjoin.get_subproblem_count(),
                  duration.as_secs_f64());

            if join_result.len() < last_result_size {
                warn!("{} threshold={}: result shrank from {} to {}",
                      path.display(), threshold, last_result_size, join_result.len());
            }
            last_result_size = join_result.len();
        }
    }
}
