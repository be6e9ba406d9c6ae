use tallyq::core::write_csv;
use tallyq::prelude::*;

#[tokio::main]
async fn main() -> QueueResult<()> {
    let config = TallyConfig::development();
    tallyq::logging::init(&config.logging)?;

    let configs: Vec<PipelineConfig> = [(1, 1), (2, 2), (4, 1), (1, 4)]
        .into_iter()
        .map(|(producers, consumers)| {
            PipelineConfig::new(producers, consumers)
                .with_name(format!("{}p{}c", producers, consumers))
                .with_total_tasks(10_000)
        })
        .collect();

    let reports = run_sweep(&configs, &[0, 1, 10, 100]).await?;

    if let Some(report) = reports.last() {
        println!("{}", report.to_json()?);
    }
    write_csv(&reports, std::io::stdout())?;
    Ok(())
}
