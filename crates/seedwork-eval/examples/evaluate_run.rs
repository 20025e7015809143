use std::env;
use std::path::PathBuf;

use seedwork_eval::{EvaluateOptions, EvaluationEngine};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let mut run_dir: Option<PathBuf> = None;
    let mut options = EvaluateOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--run" => run_dir = args.next().map(PathBuf::from),
            "--out" => options.out_dir = args.next().map(PathBuf::from),
            "--strict" => options.strict = true,
            _ => {
                if run_dir.is_none() {
                    run_dir = Some(PathBuf::from(arg));
                } else {
                    return Err("unexpected argument".into());
                }
            }
        }
    }

    let run_dir = run_dir.ok_or("missing --run directory")?;
    let engine = EvaluationEngine::new(options);
    let result = engine.run(&run_dir)?;

    println!("passed={}", result.summary.passed);
    println!("errors={}", result.summary.error_count);
    println!("warnings={}", result.summary.warning_count);
    println!("validation_path={}", result.validation_path.display());
    println!("report_path={}", result.report_path.display());
    Ok(())
}
