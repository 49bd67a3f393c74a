use carbon_matrix_model::*;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: portfolio_report <matrix.csv> [rate] [price_factor]");
        std::process::exit(2);
    };
    let rate: Option<f64> = args.next().map(|s| s.parse()).transpose()?;
    let factor: f64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(1.0);
    let params = ScenarioParams::new(rate.unwrap_or(DEFAULT_DISCOUNT_RATE), factor).clamped();

    let table = Table::from_csv_path(&path)?;
    let model = parse_matrix(&table)?;

    println!("📊 Portfolio report for {}", path);
    println!(
        "Periods: {} | fallback rate {:.2} | price factor {:.2}\n",
        model.period_columns.len(),
        params.discount_rate,
        params.price_factor
    );

    for project in &model.projects {
        let project_params = match rate {
            Some(_) => params,
            None => ScenarioParams::new(initial_rate(project), params.price_factor).clamped(),
        };
        let m = evaluate_project(project, &project_params);
        println!(
            "{:<8} {:<30} rate {:>5.2}%  NPV {:>16.0}  CO2 {:>14.0} t  horizon {:>2} years",
            m.project_id,
            m.title,
            m.rate_used * 100.0,
            m.present_value,
            m.carbon_total,
            m.effective_horizon
        );

        for c in evaluate_components(project, &params, None) {
            println!(
                "    - {:<26} NPV {:>16.0}  CO2 {:>14.0} t",
                c.title, c.present_value, c.carbon_total
            );
        }
    }

    if !model.diagnostics.is_empty() {
        println!("\nData-quality notes:");
        for issue in &model.diagnostics {
            println!(" - {}", issue);
        }
    }

    Ok(())
}
