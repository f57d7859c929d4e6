use rnpd_curves::app::pipeline::{predict_panel, run_panel, train};
use rnpd_curves::data::{SyntheticConfig, generate_panel};
use rnpd_curves::domain::{FitterConfig, Month, MonthState, StoreConfig};
use rnpd_curves::error::ModelError;
use rnpd_curves::io::{curve_file, read_panel};
use rnpd_curves::registry::ModelRegistry;
use rnpd_curves::report::prediction_stats;

const TOL: f64 = 1e-6;

fn synthetic(months: usize, groups: u32) -> SyntheticConfig {
    SyntheticConfig {
        months,
        groups,
        securities_per_group: 30,
        noise: 0.05,
        ..SyntheticConfig::new(Month::new(2022, 1).unwrap())
    }
}

#[test]
fn synthetic_panel_end_to_end() {
    let panel = generate_panel(&synthetic(4, 5)).unwrap();
    let out = run_panel(&panel, StoreConfig::default(), FitterConfig::default()).unwrap();

    assert_eq!(out.train.fitted(), 4);
    for model in out.registry.models() {
        assert_eq!(model.groups(), vec![1, 2, 3, 4, 5]);
        assert!(model.max_constraint_violation().unwrap() <= TOL);
    }

    // Base curves sit at least 4 points apart and noise is small, so most rows
    // land in their own group or a neighbour.
    let stats = prediction_stats(&out.predictions.predictions);
    assert_eq!(stats.overall.rows, 3 * 5 * 30);
    assert!(stats.overall.near_rate() > 0.8, "near rate {}", stats.overall.near_rate());
}

#[test]
fn registry_errors_surface_by_kind() {
    let panel = generate_panel(&synthetic(2, 3)).unwrap();
    let mut registry = ModelRegistry::new(StoreConfig::default(), FitterConfig::default()).unwrap();
    let jan = Month::new(2022, 1).unwrap();

    assert!(matches!(
        registry.classify(2.0, 0.1, jan),
        Err(ModelError::ModelNotFound(_))
    ));

    train(&mut registry, &panel).unwrap();
    assert_eq!(registry.month_state(jan), MonthState::Fitted);
    assert_eq!(registry.month_state(jan.next().next()), MonthState::Empty);
    assert!(matches!(
        registry.fit_month(Month::new(2030, 1).unwrap()),
        Err(ModelError::EmptySummary(_))
    ));

    let run = predict_panel(&registry, &panel).unwrap();
    assert_eq!(run.skipped, vec![jan]);
}

#[test]
fn csv_panel_trains_and_exports_curves() {
    let mut csv = String::from("month,rank_group,rnpd,duration_bucket,security_id\n");
    for (m, shift) in [("2021-05-31", 0.0), ("2021-06-30", 0.005)] {
        for d in 1..=8 {
            let x = d as f64;
            csv.push_str(&format!("{m},1,{},{d},A{d}\n", 0.02 + 0.002 * x + shift));
            csv.push_str(&format!("{m},2,{},{d},B{d}\n", 0.08 + 0.004 * x + shift));
        }
    }
    let panel = read_panel(csv.as_bytes()).unwrap();
    assert_eq!(panel.rows.len(), 32);

    let out = run_panel(&panel, StoreConfig::default(), FitterConfig::default()).unwrap();
    assert_eq!(out.train.fitted(), 2);
    assert_eq!(out.predictions.predictions.len(), 16);
    assert!(
        out.predictions
            .predictions
            .iter()
            .all(|p| p.predicted_group == p.row.rank_group)
    );

    let file = curve_file(out.registry.models()).unwrap();
    assert_eq!(file.months.len(), 2);
    assert_eq!(file.latest().unwrap().month, Month::new(2021, 6).unwrap());
}
