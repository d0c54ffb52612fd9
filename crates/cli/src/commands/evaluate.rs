use restock_core::evaluation::{evaluate, EvaluationReport};

use crate::commands::{
    application_failure, build_runtime, load_config, open_store, parse_as_of, CommandResult,
    Failure,
};

pub fn run(
    top_n: Option<usize>,
    alpha: Option<f64>,
    as_of: Option<String>,
    json: bool,
) -> CommandResult {
    let config = match load_config("evaluate") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("evaluate") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };
    let settings = config.recommender.settings();
    let top_n = top_n.unwrap_or(settings.top_n);
    let alpha = alpha.unwrap_or(settings.alpha);

    let result = runtime.block_on(async {
        let as_of = parse_as_of(as_of.as_deref())?;
        let store = open_store(&config).await?;
        let report =
            evaluate(&store, &settings, top_n, alpha, as_of).await.map_err(application_failure)?;
        store.pool().close().await;
        Ok::<Option<EvaluationReport>, Failure>(report)
    });

    match result {
        Ok(None) => CommandResult::failure(
            "evaluate",
            "insufficient_data",
            "no requester has acquisitions to evaluate against; run `restock seed` first",
            9,
        ),
        Ok(Some(report)) if json => {
            let message = format!(
                "evaluated {} requester(s): mean F1 {:.3}",
                report.evaluated_requesters, report.f1.mean
            );
            CommandResult::success_with_data("evaluate", message, report)
        }
        Ok(Some(report)) => CommandResult::text(render_human(&report)),
        Err(failure) => CommandResult::from_failure("evaluate", failure),
    }
}

fn render_human(report: &EvaluationReport) -> String {
    let mut lines = vec![format!(
        "offline evaluation (top_n = {}, alpha = {}) over {} requester(s):",
        report.top_n, report.alpha, report.evaluated_requesters
    )];
    for (label, summary) in
        [("precision", &report.precision), ("recall", &report.recall), ("f1", &report.f1)]
    {
        lines.push(format!(
            "  {label:<9} mean={:.3} min={:.3} max={:.3} median={:.3}",
            summary.mean, summary.min, summary.max, summary.median
        ));
    }
    lines.push(format!("  grade: {:?}, bias: {:?}", report.grade, report.bias));
    lines.join("\n")
}
